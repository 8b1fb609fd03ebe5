//! Password hashing and bearer tokens.

use super::permissions::UserRole;
use super::user_models::User;
use anyhow::{bail, Result};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use rand_distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_TOKEN_TTL_HOURS: u64 = 24;

/// A random A-z0-9 string
pub fn random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

mod catalog_argon2 {
    use anyhow::{anyhow, Result};
    use argon2::{
        password_hash::{
            rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        },
        Argon2,
    };

    pub fn generate_b64_salt() -> String {
        SaltString::generate(&mut OsRng).to_string()
    }

    pub fn hash<T: AsRef<str>>(plain: &[u8], b64_salt: T) -> Result<String> {
        let argon2 = Argon2::default();
        let salt = SaltString::from_b64(b64_salt.as_ref()).map_err(|err| anyhow!("{}", err))?;
        let hash_string = argon2
            .hash_password(plain, &salt)
            .map_err(|err| anyhow!("{}", err))?
            .to_string();
        Ok(hash_string)
    }

    pub fn verify<T: AsRef<str>>(plain_pw: &[u8], target_hash: T) -> Result<bool> {
        let argon2 = Argon2::default();
        let password_hash =
            PasswordHash::new(target_hash.as_ref()).map_err(|err| anyhow!("{}", err))?;
        Ok(argon2.verify_password(plain_pw, &password_hash).is_ok())
    }
}

#[cfg(feature = "test-fast-hasher")]
mod test_fast {
    use std::hash::{DefaultHasher, Hash, Hasher};

    pub const PREFIX: &str = "$testfast$";

    pub fn generate_b64_salt() -> String {
        super::random_string(16)
    }

    pub fn hash(plain: &[u8], salt: &str) -> String {
        let mut hasher = DefaultHasher::new();
        salt.hash(&mut hasher);
        plain.hash(&mut hasher);
        format!("{}{}${:016x}", PREFIX, salt, hasher.finish())
    }

    pub fn verify(plain: &[u8], target_hash: &str) -> bool {
        let Some(rest) = target_hash.strip_prefix(PREFIX) else {
            return false;
        };
        let Some((salt, _)) = rest.split_once('$') else {
            return false;
        };
        hash(plain, salt) == target_hash
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PasswordHasher {
    Argon2,
    /// Cheap non-cryptographic hasher for development builds only.
    #[cfg(feature = "test-fast-hasher")]
    TestFast,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        #[cfg(feature = "test-fast-hasher")]
        {
            PasswordHasher::TestFast
        }
        #[cfg(not(feature = "test-fast-hasher"))]
        {
            PasswordHasher::Argon2
        }
    }
}

impl FromStr for PasswordHasher {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "argon2" => Ok(PasswordHasher::Argon2),
            #[cfg(feature = "test-fast-hasher")]
            "test_fast" => Ok(PasswordHasher::TestFast),
            _ => bail!("Unknown hasher {}", s),
        }
    }
}

impl fmt::Display for PasswordHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordHasher::Argon2 => write!(f, "argon2"),
            #[cfg(feature = "test-fast-hasher")]
            PasswordHasher::TestFast => write!(f, "test_fast"),
        }
    }
}

impl PasswordHasher {
    pub fn generate_b64_salt(&self) -> String {
        match self {
            PasswordHasher::Argon2 => catalog_argon2::generate_b64_salt(),
            #[cfg(feature = "test-fast-hasher")]
            PasswordHasher::TestFast => test_fast::generate_b64_salt(),
        }
    }

    pub fn hash<T: AsRef<str>>(&self, plain: &[u8], b64_salt: T) -> Result<String> {
        match self {
            PasswordHasher::Argon2 => catalog_argon2::hash(plain, b64_salt),
            #[cfg(feature = "test-fast-hasher")]
            PasswordHasher::TestFast => Ok(test_fast::hash(plain, b64_salt.as_ref())),
        }
    }

    pub fn verify<T: AsRef<str>>(&self, plain_pw: T, target_hash: T) -> Result<bool> {
        match self {
            PasswordHasher::Argon2 => {
                catalog_argon2::verify(plain_pw.as_ref().as_bytes(), target_hash)
            }
            #[cfg(feature = "test-fast-hasher")]
            PasswordHasher::TestFast => Ok(test_fast::verify(
                plain_pw.as_ref().as_bytes(),
                target_hash.as_ref(),
            )),
        }
    }
}

/// Stored password material for one user.
#[derive(Clone, Debug)]
pub struct PasswordCredentials {
    pub salt: String,
    pub hash: String,
    pub hasher: PasswordHasher,
}

impl PasswordCredentials {
    /// Hashes `password` with a fresh salt. CPU heavy, keep off the async path.
    pub fn create(password: &str, hasher: PasswordHasher) -> Result<Self> {
        let salt = hasher.generate_b64_salt();
        let hash = hasher.hash(password.as_bytes(), &salt)?;
        Ok(PasswordCredentials {
            salt,
            hash,
            hasher,
        })
    }

    pub fn verify(&self, password: &str) -> Result<bool> {
        self.hasher.verify(password, self.hash.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Unauthorized Access")]
    Unauthenticated,

    #[error("User not found.")]
    NotFound,

    #[error("User not found.")]
    InvalidCredential,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Token payload: the user id and the role the user had when the token was issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: chrono::Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_hours: u64) -> Self {
        TokenIssuer {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            ttl: chrono::Duration::hours(ttl_hours as i64),
        }
    }

    pub fn issue(&self, user: &User) -> Result<String> {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Checks signature and expiry. Any failure means the caller is not authenticated.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::Unauthenticated)
    }
}
