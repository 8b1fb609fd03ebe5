//! Response envelope and error mapping shared by every route.
//!
//! Every JSON body has the shape `{status, data, message, error}`. Errors
//! never carry internal details, only a message and, for malformed input,
//! the reason the input was rejected.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query, Request,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::error;

use crate::catalog_store::CatalogError;
use crate::user::{AuthError, UserError};

#[derive(Serialize)]
struct Envelope<T> {
    status: u16,
    data: Option<T>,
    message: String,
    error: Option<String>,
}

/// A successful response. 204 responses are sent without a body.
#[derive(Debug)]
pub struct ApiResponse<T = ()> {
    status: StatusCode,
    data: Option<T>,
    message: String,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        ApiResponse {
            status: StatusCode::OK,
            data: Some(data),
            message: message.into(),
        }
    }

    pub fn created_with(data: T, message: impl Into<String>) -> Self {
        ApiResponse {
            status: StatusCode::CREATED,
            data: Some(data),
            message: message.into(),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        ApiResponse {
            status,
            data: None,
            message: message.into(),
        }
    }

    pub fn created(message: impl Into<String>) -> Self {
        Self::message(StatusCode::CREATED, message)
    }

    pub fn no_content() -> Self {
        Self::message(StatusCode::NO_CONTENT, "")
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        if self.status == StatusCode::NO_CONTENT {
            return StatusCode::NO_CONTENT.into_response();
        }
        let body = Envelope {
            status: self.status.as_u16(),
            data: self.data,
            message: self.message,
            error: None,
        };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized Access")]
    Unauthenticated,

    #[error("Forbidden Access")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    /// Malformed or invalid input. `reason` is reported in the `error` field.
    #[error("Bad Request")]
    BadRequest { reason: Option<String> },

    /// A well-formed request the domain refused, e.g. a missing referent.
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

impl ApiError {
    pub fn bad_request(reason: impl Into<String>) -> Self {
        ApiError::BadRequest {
            reason: Some(reason.into()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest { .. } | ApiError::Rejected(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let reason = match &self {
            ApiError::Internal(e) => {
                error!("Internal error: {:#}", e);
                None
            }
            ApiError::BadRequest { reason } => reason.clone(),
            _ => None,
        };
        let body = Envelope::<()> {
            status: status.as_u16(),
            data: None,
            message: self.to_string(),
            error: reason,
        };
        (status, Json(body)).into_response()
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(_) => ApiError::NotFound(err.to_string()),
            CatalogError::Validation(e) => ApiError::bad_request(e.to_string()),
            CatalogError::Integrity { .. } => ApiError::Rejected(err.to_string()),
            CatalogError::Sqlite(e) => ApiError::Internal(e.into()),
            CatalogError::Store(e) => ApiError::Internal(e),
        }
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound | UserError::FavoriteNotFound => {
                ApiError::NotFound(err.to_string())
            }
            UserError::DuplicateEmail | UserError::DuplicateFavorite => {
                ApiError::Conflict(err.to_string())
            }
            UserError::Invalid(_) | UserError::WrongPassword | UserError::MissingReferent { .. } => {
                ApiError::Rejected(err.to_string())
            }
            UserError::NotOwner => ApiError::Forbidden,
            UserError::Catalog(e) => e.into(),
            UserError::Store(e) => ApiError::Internal(e),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated => ApiError::Unauthenticated,
            AuthError::NotFound | AuthError::InvalidCredential => {
                ApiError::NotFound(err.to_string())
            }
            AuthError::Internal(e) => ApiError::Internal(e),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(anyhow::anyhow!("Blocking task failed: {}", err))
    }
}

/// `Json` whose rejection is rendered as a 400 envelope.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request(rejection.body_text())
}

/// Parses a body the handler read as raw bytes, with the same 400 mapping
/// as `ApiJson`.
pub fn parse_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    Json::<T>::from_bytes(bytes)
        .map(|Json(value)| value)
        .map_err(json_rejection)
}

/// `Query` whose rejection is rendered as a 400 envelope.
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(query_rejection(rejection)),
        }
    }
}

fn query_rejection(rejection: QueryRejection) -> ApiError {
    ApiError::bad_request(rejection.body_text())
}
