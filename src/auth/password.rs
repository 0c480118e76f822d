//! Password hashing and password-reset tokens.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::db::format_timestamp;
use crate::errors::AppError;

/// Minutes a reset token stays valid.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Hash a password with Argon2id and a random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Internal(format!("Failed to encode salt: {}", e)))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored hash. Unparseable hashes never match.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}

/// A freshly minted reset token.
///
/// `token` goes to the user, only `digest` and `expires_at` are stored.
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub token: String,
    pub digest: String,
    pub expires_at: String,
}

impl ResetToken {
    pub fn generate(user_id: &str, now: DateTime<Utc>) -> Self {
        let mut bytes = [0u8; 32];
        rand::rng().fill(&mut bytes);
        let secret = URL_SAFE_NO_PAD.encode(bytes);

        Self {
            token: format!("{}.{}", user_id, secret),
            digest: reset_digest(&secret),
            expires_at: format_timestamp(now + Duration::minutes(RESET_TOKEN_TTL_MINUTES)),
        }
    }
}

/// Split a presented token into `(user_id, secret)`.
pub fn split_reset_token(token: &str) -> Option<(&str, &str)> {
    let (user_id, secret) = token.trim().split_once('.')?;
    if user_id.is_empty() || secret.is_empty() {
        return None;
    }
    Some((user_id, secret))
}

pub fn reset_digest(secret: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(secret.as_bytes()))
}

/// Constant-time check of a presented secret against a stored digest.
pub fn reset_secret_matches(secret: &str, stored_digest: &str) -> bool {
    constant_time_compare(&reset_digest(secret), stored_digest)
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
