use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Editor,
    Viewer,
}

/// Roles allowed to create and edit catalog entries.
pub const CATALOG_EDITORS: &[UserRole] = &[UserRole::Admin, UserRole::Editor];

/// Roles allowed to delete artists and albums and to manage users.
pub const ADMINS_ONLY: &[UserRole] = &[UserRole::Admin];

pub const ALL_ROLES: &[UserRole] = &[UserRole::Admin, UserRole::Editor, UserRole::Viewer];

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Editor => "editor",
            UserRole::Viewer => "viewer",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "editor" => Some(UserRole::Editor),
            "viewer" => Some(UserRole::Viewer),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Forbidden;

/// Checks the caller's role against the roles an operation allows.
pub fn authorize(role: UserRole, allowed: &[UserRole]) -> Result<(), Forbidden> {
    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(Forbidden)
    }
}
