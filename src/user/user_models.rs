//! User data models

use super::permissions::UserRole;
use serde::Serialize;

/// A registered account as returned to callers. Never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    #[serde(rename = "user_id")]
    pub id: String,
    pub email: String,
    pub role: UserRole,
    /// Unix seconds.
    #[serde(rename = "created_at")]
    pub created: i64,
}

/// Normalized form used for storage and lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Result of an admin edit of another account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserUpdateOutcome {
    Updated,
    NotFound,
    EmailTaken,
}
