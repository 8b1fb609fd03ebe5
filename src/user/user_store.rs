use super::auth::PasswordCredentials;
use super::favorites::{Favorite, FavoriteCategory, FavoriteTarget};
use super::permissions::UserRole;
use super::user_models::{User, UserUpdateOutcome};
use crate::catalog_store::PageRequest;
use anyhow::Result;

pub trait UserCredentialsStore: Send + Sync {
    /// Returns the user's password credentials given the user id.
    /// Returns Ok(None) if the user does not exist.
    /// Returns Err if there is a database error.
    fn get_password_credentials(&self, user_id: &str) -> Result<Option<PasswordCredentials>>;

    /// Replaces the user's password credentials.
    /// Returns Ok(false) if the user does not exist.
    fn update_password_credentials(
        &self,
        user_id: &str,
        credentials: &PasswordCredentials,
    ) -> Result<bool>;
}

pub trait FavoritesStore: Send + Sync {
    /// Adds a favorite with an already resolved referent name.
    /// Returns Ok(None) if the user already has this target among favorites.
    fn add_favorite(
        &self,
        user_id: &str,
        target: &FavoriteTarget,
        name: &str,
    ) -> Result<Option<Favorite>>;

    fn get_favorite(&self, favorite_id: &str) -> Result<Option<Favorite>>;

    /// Returns Ok(false) if the favorite does not exist.
    fn remove_favorite(&self, favorite_id: &str) -> Result<bool>;

    /// Newest first.
    fn list_favorites(
        &self,
        user_id: &str,
        category: FavoriteCategory,
        page: PageRequest,
    ) -> Result<Vec<Favorite>>;
}

pub trait UserStore: UserCredentialsStore + FavoritesStore + Send + Sync {
    /// Creates a user with the given (normalized) email and credentials.
    ///
    /// With `role` unset, the very first user becomes admin and everyone
    /// after is a viewer. The count and the insert happen in one transaction.
    /// Returns Ok(None) if the email is already registered.
    fn create_user(
        &self,
        email: &str,
        credentials: &PasswordCredentials,
        role: Option<UserRole>,
    ) -> Result<Option<User>>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    /// Lookup is case-insensitive.
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Changes the fields that are set.
    fn update_user(
        &self,
        user_id: &str,
        email: Option<&str>,
        role: Option<UserRole>,
    ) -> Result<UserUpdateOutcome>;

    /// Deletes the user and, with it, credentials and favorites.
    /// Returns Ok(false) if the user does not exist.
    fn delete_user(&self, user_id: &str) -> Result<bool>;

    /// Oldest first, optionally only users with `role`.
    fn list_users(&self, role: Option<UserRole>, page: PageRequest) -> Result<Vec<User>>;

    fn count_users(&self) -> Result<usize>;
}
