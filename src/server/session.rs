use super::api::ApiError;
use super::state::ServerState;
use crate::user::permissions::{ADMINS_ONLY, CATALOG_EDITORS};
use crate::user::{authorize, AuthError, User, UserRole};

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};
use tracing::debug;

/// The authenticated caller of a request.
#[derive(Debug)]
pub struct Session {
    pub user: User,
}

impl Session {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    /// Fails with 403 unless the caller has one of `allowed`.
    pub fn require_role(&self, allowed: &[UserRole]) -> Result<(), ApiError> {
        authorize(self.user.role, allowed).map_err(|_| {
            debug!(
                "User {} with role {} denied, allowed: {:?}",
                self.user.id, self.user.role, allowed
            );
            ApiError::Forbidden
        })
    }
}

pub const HEADER_SESSION_TOKEN_KEY: &str = "Authorization";
const BEARER_PREFIX: &str = "Bearer ";

fn extract_bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(HEADER_SESSION_TOKEN_KEY)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

async fn extract_session_from_request_parts(
    parts: &mut Parts,
    ctx: &ServerState,
) -> Result<Option<Session>, ApiError> {
    let token = match extract_bearer_token(parts) {
        None => {
            debug!("No bearer token in headers.");
            return Ok(None);
        }
        Some(x) => x,
    };

    match ctx.authenticator.resolve(&token) {
        Ok(user) => {
            debug!("Resolved session for user_id={}", user.id);
            Ok(Some(Session { user }))
        }
        Err(AuthError::Internal(e)) => {
            debug!("Failed to resolve session: {}", e);
            Err(ApiError::Internal(e))
        }
        Err(e) => {
            debug!("Rejected bearer token: {}", e);
            Ok(None)
        }
    }
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_session_from_request_parts(parts, ctx)
            .await?
            .ok_or(ApiError::Unauthenticated)
    }
}

/// A session allowed to create and edit catalog entries and favorites.
///
/// Rejects before the request body is read, so a forbidden caller gets 403
/// whatever the payload looks like.
pub struct EditorSession(pub Session);

/// A session with the admin role, rejected before the body is read.
pub struct AdminSession(pub Session);

async fn gated_session(
    parts: &mut Parts,
    ctx: &ServerState,
    allowed: &[UserRole],
) -> Result<Session, ApiError> {
    let session = extract_session_from_request_parts(parts, ctx)
        .await?
        .ok_or(ApiError::Unauthenticated)?;
    session.require_role(allowed)?;
    Ok(session)
}

impl FromRequestParts<ServerState> for EditorSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        gated_session(parts, ctx, CATALOG_EDITORS).await.map(EditorSession)
    }
}

impl FromRequestParts<ServerState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        gated_session(parts, ctx, ADMINS_ONLY).await.map(AdminSession)
    }
}

impl OptionalFromRequestParts<ServerState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Option<Self>, Self::Rejection> {
        extract_session_from_request_parts(parts, ctx).await
    }
}
