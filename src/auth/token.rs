//! Bearer token issuance and validation.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Issuer claim stamped on every token.
const TOKEN_ISSUER: &str = "recipe-hub";

/// JWT claims for Recipe Hub access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
    /// Issuer.
    pub iss: String,
}

impl Claims {
    pub fn new(user_id: &str, ttl_hours: u64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(ttl_hours as i64);

        Self {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: TOKEN_ISSUER.to_string(),
        }
    }
}

/// Signs and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_hours: u64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl_hours", &self.ttl_hours)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_hours: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_hours,
        }
    }

    /// Issue an access token for a user.
    pub fn issue(&self, user_id: &str) -> Result<String, AppError> {
        self.issue_claims(&Claims::new(user_id, self.ttl_hours))
    }

    fn issue_claims(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Validate a token and return its claims.
    ///
    /// Expired tokens fail with `TOKEN_EXPIRED`, anything else with `INVALID_TOKEN`.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[TOKEN_ISSUER]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let issuer = TokenIssuer::new("test-secret", 24);
        let token = issuer.issue("user-1").unwrap();

        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = TokenIssuer::new("secret-a", 24).issue("user-1").unwrap();
        let err = TokenIssuer::new("secret-b", 24).verify(&token).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_TOKEN");
    }

    #[test]
    fn test_expired_token() {
        let issuer = TokenIssuer::new("test-secret", 24);
        let mut claims = Claims::new("user-1", 24);
        claims.iat -= 3 * 24 * 3600;
        claims.exp = claims.iat + 3600;
        let token = issuer.issue_claims(&claims).unwrap();

        let err = issuer.verify(&token).unwrap_err();
        assert_eq!(err.error_code(), "TOKEN_EXPIRED");
    }

    #[test]
    fn test_garbage_token() {
        let issuer = TokenIssuer::new("test-secret", 24);
        assert_eq!(
            issuer.verify("not-a-jwt").unwrap_err().error_code(),
            "INVALID_TOKEN"
        );
    }

    #[test]
    fn test_debug_hides_keys() {
        let issuer = TokenIssuer::new("super-secret", 1);
        let debug = format!("{:?}", issuer);
        assert!(!debug.contains("super-secret"));
    }
}
