//! Authentication module for the Recipe Hub backend.
//!
//! Requests carry `Authorization: Bearer <jwt>`. Handlers that need an actor
//! take an [`AuthUser`], which rejects the request when the token is missing
//! or invalid. Public handlers that only personalize their response take a
//! [`MaybeAuthUser`] instead, which never rejects.

mod password;
mod token;

pub use password::{
    hash_password, reset_secret_matches, split_reset_token, verify_password, ResetToken,
    MIN_PASSWORD_LEN, RESET_TOKEN_TTL_MINUTES,
};
pub use token::{Claims, TokenIssuer};

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use crate::errors::{codes, AppError};
use crate::AppState;

/// The authenticated actor of a request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
}

/// The actor of a public request, if it presented a valid token.
#[derive(Debug, Clone, Default)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    pub fn id(&self) -> Option<&str> {
        self.0.as_ref().map(|user| user.id.as_str())
    }
}

/// Extract the token from the Authorization header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Verify a token and load the account it names.
async fn authenticate(state: &AppState, token: &str) -> Result<AuthUser, AppError> {
    let claims = state.tokens.verify(token)?;
    let user = state
        .repo
        .get_user_summary(&claims.sub)
        .await?
        .ok_or_else(|| AppError::unauthenticated(codes::INVALID_TOKEN, "Account no longer exists"))?;

    Ok(AuthUser {
        id: user.id,
        username: user.username,
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(|| {
            AppError::unauthenticated(codes::NO_TOKEN, "No token, authorization denied")
        })?;

        authenticate(state, token).await.inspect_err(|e| {
            tracing::debug!(code = e.error_code(), "Rejected bearer token");
        })
    }
}

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            return Ok(MaybeAuthUser(None));
        };

        match authenticate(state, token).await {
            Ok(user) => Ok(MaybeAuthUser(Some(user))),
            Err(e) => {
                tracing::debug!(code = e.error_code(), "Ignoring bearer token on public route");
                Ok(MaybeAuthUser(None))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def")), Some("abc.def"));
    }

    #[test]
    fn test_other_schemes_ignored() {
        assert_eq!(bearer_token(&headers_with("Basic Zm9vOmJhcg==")), None);
        assert_eq!(bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_maybe_auth_user_id() {
        assert_eq!(MaybeAuthUser::default().id(), None);
        let actor = MaybeAuthUser(Some(AuthUser {
            id: "u1".into(),
            username: "cook".into(),
        }));
        assert_eq!(actor.id(), Some("u1"));
    }
}
