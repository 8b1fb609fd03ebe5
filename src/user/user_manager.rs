use super::auth::{PasswordCredentials, PasswordHasher};
use super::error::UserError;
use super::permissions::UserRole;
use super::user_models::{normalize_email, User, UserUpdateOutcome};
use super::user_store::UserStore;
use crate::catalog_store::PageRequest;
use std::sync::Arc;
use tracing::info;

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Account lifecycle on top of a [`UserStore`].
///
/// Methods that hash passwords are CPU bound, async callers should run them
/// on the blocking pool.
pub struct UserManager {
    user_store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
}

fn validate_email(email: &str) -> Result<String, UserError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(UserError::Invalid("Bad Request, Reason: Missing email".into()));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(UserError::Invalid(format!("'{}' is not a valid email", email))),
    }
}

fn validate_password(field: &str, password: &str) -> Result<(), UserError> {
    if password.is_empty() {
        return Err(UserError::Invalid(format!(
            "Bad Request, Reason: Missing {}",
            field
        )));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(UserError::Invalid(format!(
            "Field '{}' must be at least {} characters",
            field, MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

impl UserManager {
    pub fn new(user_store: Arc<dyn UserStore>) -> Self {
        Self::with_hasher(user_store, PasswordHasher::default())
    }

    pub fn with_hasher(user_store: Arc<dyn UserStore>, hasher: PasswordHasher) -> Self {
        UserManager { user_store, hasher }
    }

    fn create(&self, email: &str, password: &str, role: Option<UserRole>) -> Result<User, UserError> {
        let email = validate_email(email)?;
        validate_password("password", password)?;

        let credentials = PasswordCredentials::create(password, self.hasher)?;
        self.user_store
            .create_user(&email, &credentials, role)?
            .ok_or(UserError::DuplicateEmail)
    }

    /// Self-registration. The first account ever created becomes admin.
    pub fn signup(&self, email: &str, password: &str) -> Result<User, UserError> {
        self.create(email, password, None)
    }

    /// Account creation by an administrator, with an explicit role.
    pub fn add_user(&self, email: &str, password: &str, role: UserRole) -> Result<User, UserError> {
        self.create(email, password, Some(role))
    }

    pub fn get_user(&self, user_id: &str) -> Result<User, UserError> {
        self.user_store
            .get_user(user_id)?
            .ok_or(UserError::NotFound)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<User, UserError> {
        self.user_store
            .get_user_by_email(email)?
            .ok_or(UserError::NotFound)
    }

    pub fn list_users(
        &self,
        role: Option<UserRole>,
        page: PageRequest,
    ) -> Result<Vec<User>, UserError> {
        Ok(self.user_store.list_users(role, page)?)
    }

    pub fn update_user(
        &self,
        user_id: &str,
        email: Option<&str>,
        role: Option<UserRole>,
    ) -> Result<(), UserError> {
        let email = email.map(validate_email).transpose()?;
        match self
            .user_store
            .update_user(user_id, email.as_deref(), role)?
        {
            UserUpdateOutcome::Updated => {
                info!("Updated user {}", user_id);
                Ok(())
            }
            UserUpdateOutcome::NotFound => Err(UserError::NotFound),
            UserUpdateOutcome::EmailTaken => Err(UserError::DuplicateEmail),
        }
    }

    pub fn delete_user(&self, user_id: &str) -> Result<(), UserError> {
        if self.user_store.delete_user(user_id)? {
            info!("Deleted user {}", user_id);
            Ok(())
        } else {
            Err(UserError::NotFound)
        }
    }

    /// Changes `target_id`'s password. Only the account owner may do this and
    /// must present the current password.
    pub fn update_own_password(
        &self,
        caller: &User,
        target_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), UserError> {
        if caller.id != target_id {
            return Err(UserError::NotOwner);
        }
        if old_password.is_empty() {
            return Err(UserError::Invalid(
                "Bad Request, Reason: Missing old_password".into(),
            ));
        }
        validate_password("new_password", new_password)?;

        let current = self
            .user_store
            .get_password_credentials(target_id)?
            .ok_or(UserError::NotFound)?;
        if !current.verify(old_password)? {
            return Err(UserError::WrongPassword);
        }
        self.set_password(target_id, new_password)
    }

    /// Replaces a password without checking the old one.
    pub fn set_password(&self, user_id: &str, password: &str) -> Result<(), UserError> {
        validate_password("password", password)?;
        let credentials = PasswordCredentials::create(password, self.hasher)?;
        if self
            .user_store
            .update_password_credentials(user_id, &credentials)?
        {
            Ok(())
        } else {
            Err(UserError::NotFound)
        }
    }

    pub fn check_password(&self, email: &str, password: &str) -> Result<bool, UserError> {
        let user = self.get_user_by_email(email)?;
        let credentials = self
            .user_store
            .get_password_credentials(&user.id)?
            .ok_or(UserError::NotFound)?;
        Ok(credentials.verify(password)?)
    }
}
