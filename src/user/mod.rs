pub mod auth;
mod authenticator;
mod error;
pub mod favorites;
pub mod permissions;
mod sqlite_user_store;
mod user_manager;
pub mod user_models;
mod user_store;

pub use auth::{AuthError, Claims, PasswordCredentials, PasswordHasher, TokenIssuer};
pub use authenticator::Authenticator;
pub use error::UserError;
pub use favorites::{Favorite, FavoriteCategory, FavoriteTarget, FavoritesLedger};
pub use permissions::{authorize, Forbidden, UserRole};
pub use sqlite_user_store::{SqliteUserStore, USER_VERSIONED_SCHEMAS};
pub use user_manager::{UserManager, MIN_PASSWORD_LENGTH};
pub use user_models::{User, UserUpdateOutcome};
pub use user_store::{FavoritesStore, UserCredentialsStore, UserStore};
