//! Account administration routes, plus the owner-only password change.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use tracing::info;

use crate::catalog_store::PageRequest;
use crate::server::api::{parse_json, ApiError, ApiJson, ApiQuery, ApiResponse, ApiResult};
use crate::server::session::{AdminSession, Session};
use crate::server::state::{GuardedUserManager, ServerState};
use crate::user::{User, UserRole};

#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct AddUserBody {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdatePasswordBody {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserBody {
    pub email: Option<String>,
    pub role: Option<String>,
}

fn parse_role(raw: Option<&str>) -> Result<Option<UserRole>, ApiError> {
    match raw {
        None => Ok(None),
        Some(raw) => UserRole::from_str(raw).map(Some).ok_or_else(|| {
            ApiError::bad_request(format!(
                "Field 'role' must be one of: admin, editor, viewer, got '{}'",
                raw
            ))
        }),
    }
}

async fn list_users(
    _admin: AdminSession,
    State(user_manager): State<GuardedUserManager>,
    ApiQuery(query): ApiQuery<UsersQuery>,
) -> ApiResult<Vec<User>> {
    let role = parse_role(query.role.as_deref())?;
    let page = PageRequest::new(query.limit, query.offset);
    let users = user_manager.list_users(role, page)?;
    Ok(ApiResponse::ok(users, "Users fetched successfully."))
}

async fn add_user(
    AdminSession(session): AdminSession,
    State(user_manager): State<GuardedUserManager>,
    ApiJson(body): ApiJson<AddUserBody>,
) -> ApiResult<User> {
    let role = parse_role(body.role.as_deref())?.unwrap_or(UserRole::Viewer);
    let email = body.email.unwrap_or_default();
    let password = body.password.unwrap_or_default();

    let user = tokio::task::spawn_blocking(move || user_manager.add_user(&email, &password, role))
        .await??;
    info!(
        "Admin {} created user {} with role {}",
        session.user_id(),
        user.id,
        user.role
    );
    Ok(ApiResponse::created_with(user, "User created successfully."))
}

/// Ownership is checked before the body is parsed.
async fn update_password(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(id): Path<String>,
    raw_body: Bytes,
) -> ApiResult<()> {
    if session.user_id() != id {
        info!(
            "User {} denied password change for user {}",
            session.user_id(),
            id
        );
        return Err(ApiError::Forbidden);
    }
    let body: UpdatePasswordBody = parse_json(&raw_body)?;
    let old_password = body.old_password.unwrap_or_default();
    let new_password = body.new_password.unwrap_or_default();
    let caller = session.user;

    tokio::task::spawn_blocking(move || {
        user_manager.update_own_password(&caller, &id, &old_password, &new_password)
    })
    .await??;
    Ok(ApiResponse::no_content())
}

async fn update_user(
    _admin: AdminSession,
    State(user_manager): State<GuardedUserManager>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateUserBody>,
) -> ApiResult<()> {
    let role = parse_role(body.role.as_deref())?;
    user_manager.update_user(&id, body.email.as_deref(), role)?;
    Ok(ApiResponse::no_content())
}

async fn delete_user(
    _admin: AdminSession,
    State(user_manager): State<GuardedUserManager>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    user_manager.delete_user(&id)?;
    Ok(ApiResponse::message(
        StatusCode::OK,
        "User deleted successfully.",
    ))
}

pub fn user_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(list_users))
        .route("/add-user", post(add_user))
        .route("/update-password/{id}", put(update_password))
        .route("/{id}", put(update_user).delete(delete_user))
}
