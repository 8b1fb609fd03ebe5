//! Signup, login and logout.

use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::server::api::{ApiError, ApiJson, ApiResponse, ApiResult};
use crate::server::metrics::record_login_attempt;
use crate::server::session::Session;
use crate::server::state::{GuardedAuthenticator, GuardedUserManager, ServerState};
use crate::user::AuthError;

#[derive(Deserialize)]
pub struct SignupBody {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginBody {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct LoginSuccessResponse {
    pub token: String,
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::Rejected(format!(
            "Bad Request, Reason: {} missing",
            field
        ))),
    }
}

async fn signup(
    State(user_manager): State<GuardedUserManager>,
    ApiJson(body): ApiJson<SignupBody>,
) -> ApiResult<()> {
    let email = body.email.unwrap_or_default();
    let password = body.password.unwrap_or_default();
    let user =
        tokio::task::spawn_blocking(move || user_manager.signup(&email, &password)).await??;
    info!("User {} signed up with role {}", user.id, user.role);
    Ok(ApiResponse::created("User created successfully."))
}

async fn login(
    State(authenticator): State<GuardedAuthenticator>,
    ApiJson(body): ApiJson<LoginBody>,
) -> ApiResult<LoginSuccessResponse> {
    let email = required(body.email, "email")?;
    let password = required(body.password, "password")?;

    let start = Instant::now();
    let result =
        tokio::task::spawn_blocking(move || authenticator.login(&email, &password)).await?;
    match result {
        Ok((user, token)) => {
            record_login_attempt("success", start.elapsed());
            debug!("User {} logged in", user.id);
            Ok(ApiResponse::ok(
                LoginSuccessResponse { token },
                "Login successful",
            ))
        }
        Err(err) => {
            let status = match err {
                AuthError::Internal(_) => "error",
                _ => "failure",
            };
            record_login_attempt(status, start.elapsed());
            Err(err.into())
        }
    }
}

/// Tokens are stateless, so there is nothing to revoke.
async fn logout(session: Session) -> ApiResult<()> {
    debug!("User {} logged out", session.user_id());
    Ok(ApiResponse::message(
        StatusCode::OK,
        "User logged out successfully.",
    ))
}

pub fn auth_routes() -> Router<ServerState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", get(logout))
}
