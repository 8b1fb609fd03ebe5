//! Login and bearer token resolution.

use super::auth::{AuthError, PasswordCredentials, PasswordHasher, TokenIssuer};
use super::user_models::User;
use super::user_store::UserStore;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Credentials verified when the email is unknown, so both failure paths
/// spend the same time hashing.
fn dummy_credentials(hasher: PasswordHasher) -> Option<&'static PasswordCredentials> {
    static DUMMY: OnceLock<Option<PasswordCredentials>> = OnceLock::new();
    DUMMY
        .get_or_init(|| match PasswordCredentials::create("dummy-password", hasher) {
            Ok(credentials) => Some(credentials),
            Err(e) => {
                warn!("Could not prepare dummy credentials: {}", e);
                None
            }
        })
        .as_ref()
}

pub struct Authenticator {
    user_store: Arc<dyn UserStore>,
    tokens: TokenIssuer,
    hasher: PasswordHasher,
}

impl Authenticator {
    pub fn new(user_store: Arc<dyn UserStore>, tokens: TokenIssuer) -> Self {
        Authenticator {
            user_store,
            tokens,
            hasher: PasswordHasher::default(),
        }
    }

    /// Checks the password and issues a token. CPU bound.
    pub fn login(&self, email: &str, password: &str) -> Result<(User, String), AuthError> {
        let Some(user) = self.user_store.get_user_by_email(email)? else {
            if let Some(dummy) = dummy_credentials(self.hasher) {
                let _ = dummy.verify(password);
            }
            debug!("Login attempt for unknown email");
            return Err(AuthError::NotFound);
        };

        let credentials = self
            .user_store
            .get_password_credentials(&user.id)?
            .ok_or(AuthError::InvalidCredential)?;
        if !credentials.verify(password)? {
            debug!("Wrong password for user {}", user.id);
            return Err(AuthError::InvalidCredential);
        }

        let token = self.tokens.issue(&user)?;
        Ok((user, token))
    }

    /// Maps a bearer token to the current user record.
    pub fn resolve(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.tokens.verify(token)?;
        self.user_store
            .get_user(&claims.sub)?
            .ok_or(AuthError::Unauthenticated)
    }
}
