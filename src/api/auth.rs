//! Account API endpoints: registration, login, password management and
//! account deletion.

use axum::extract::{Path, State};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{created, success, ApiResult, MessageBody, ValidJson};
use crate::auth::{
    hash_password, reset_secret_matches, split_reset_token, verify_password, AuthUser, ResetToken,
    MIN_PASSWORD_LEN,
};
use crate::db::{format_timestamp, NewUser};
use crate::errors::{codes, AppError};
use crate::models::User;
use crate::notify::NotificationEvent;
use crate::services::OutgoingEmail;
use crate::AppState;

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=30;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

/// Answer to a reset token check.
#[derive(Debug, Serialize)]
pub struct ResetTokenStatus {
    pub valid: bool,
    pub email: String,
}

/// A signed-in session.
#[derive(Debug, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Argon2 is CPU-bound, so hashing runs off the async workers.
async fn hash_off_thread(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
}

async fn verify_off_thread(password: String, stored_hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))
}

fn invalid_credentials() -> AppError {
    AppError::unauthenticated(codes::INVALID_CREDENTIALS, "Invalid email or password")
}

fn invalid_reset_token() -> AppError {
    AppError::validation_code(codes::INVALID_RESET_TOKEN, "Invalid or expired reset token")
}

/// POST /api/auth/register - Create an account and sign in.
pub async fn register(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<RegisterRequest>,
) -> ApiResult<AuthSession> {
    let name = request.name.trim();
    let username = request.username.trim();
    let email = normalize_email(&request.email);

    let mut missing = Vec::new();
    for (field, value) in [
        ("name", name),
        ("username", username),
        ("email", email.as_str()),
        ("password", request.password.as_str()),
    ] {
        if value.is_empty() {
            missing.push(field);
        }
    }
    if !missing.is_empty() {
        return Err(AppError::validation_code(
            codes::MISSING_FIELDS,
            format!("Missing required fields: {}", missing.join(", ")),
        ));
    }

    if !USERNAME_LEN.contains(&username.chars().count()) {
        return Err(AppError::validation(
            "Username must be between 3 and 30 characters",
        ));
    }
    if !email.contains('@') {
        return Err(AppError::validation("Please provide a valid email"));
    }
    validate_password(&request.password)?;

    let password_hash = hash_off_thread(request.password).await?;
    let user = state
        .repo
        .create_user(&NewUser {
            name: name.to_string(),
            username: username.to_string(),
            email,
            password_hash,
        })
        .await?;
    tracing::info!(user_id = %user.id(), username = %user.username(), "User registered");

    state
        .notifier
        .dispatch(NotificationEvent::welcome(user.id()))
        .await;

    let token = state.tokens.issue(user.id())?;
    created(AuthSession { token, user })
}

/// POST /api/auth/login - Exchange credentials for a token.
pub async fn login(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<LoginRequest>,
) -> ApiResult<AuthSession> {
    let email = normalize_email(&request.email);
    if email.is_empty() || request.password.is_empty() {
        return Err(AppError::validation_code(
            codes::MISSING_FIELDS,
            "Missing required fields: email, password",
        ));
    }

    let credentials = state
        .repo
        .get_credentials(&email)
        .await?
        .ok_or_else(invalid_credentials)?;
    if !verify_off_thread(request.password, credentials.password_hash).await? {
        tracing::info!(user_id = %credentials.user_id, "Login rejected");
        return Err(invalid_credentials());
    }

    if let Err(e) = state.repo.touch_last_active(&credentials.user_id).await {
        tracing::warn!(user_id = %credentials.user_id, error = %e, "Failed to update last active");
    }
    state
        .notifier
        .dispatch(NotificationEvent::login(&credentials.user_id))
        .await;

    let user = state
        .repo
        .get_user(&credentials.user_id)
        .await?
        .ok_or_else(|| AppError::user_not_found(&credentials.user_id))?;
    tracing::info!(user_id = %user.id(), "User logged in");

    let token = state.tokens.issue(user.id())?;
    success(AuthSession { token, user })
}

/// GET /api/auth/me - The signed-in account.
pub async fn current_user(State(state): State<AppState>, actor: AuthUser) -> ApiResult<User> {
    let user = state
        .repo
        .get_user(&actor.id)
        .await?
        .ok_or_else(|| AppError::user_not_found(&actor.id))?;
    success(user)
}

/// POST /api/auth/forgot-password - Mail a reset link.
///
/// Answers the same way whether or not the address is registered.
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<ForgotPasswordRequest>,
) -> ApiResult<MessageBody> {
    let email = normalize_email(&request.email);
    if email.is_empty() {
        return Err(AppError::validation_code(
            codes::MISSING_FIELDS,
            "Missing required fields: email",
        ));
    }

    if let Some(user) = state.repo.find_user_by_email(&email).await? {
        let reset = ResetToken::generate(user.id(), Utc::now());
        state
            .repo
            .store_reset_token(user.id(), &reset.digest, &reset.expires_at)
            .await?;

        let link = reset_link(&state.config.public_url, &reset.token)?;
        let mail = OutgoingEmail {
            to: email,
            subject: "Reset your Recipe Hub password".to_string(),
            body: format!(
                "Hi {},\n\nUse the link below to choose a new password. It expires in {} minutes.\n\n{}\n",
                user.profile.name,
                crate::auth::RESET_TOKEN_TTL_MINUTES,
                link
            ),
        };

        let mailer = state.mailer.clone();
        let user_id = user.id().to_string();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(mail).await {
                tracing::error!(user_id = %user_id, error = %e, "Failed to send reset email");
            }
        });
        tracing::info!(user_id = %user.id(), "Password reset requested");
    }

    success(MessageBody::new(
        "If that email is registered, a reset link has been sent",
    ))
}

fn reset_link(public_url: &str, token: &str) -> Result<String, AppError> {
    let mut url = url::Url::parse(public_url)
        .and_then(|base| base.join("reset-password"))
        .map_err(|e| AppError::Internal(format!("Invalid public URL: {}", e)))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url.to_string())
}

/// The account a reset token was issued for, while the token is unused and unexpired.
async fn redeemable_reset<'t>(state: &AppState, token: &'t str) -> Result<&'t str, AppError> {
    let (user_id, secret) = split_reset_token(token).ok_or_else(invalid_reset_token)?;
    let ticket = state
        .repo
        .get_reset_ticket(user_id)
        .await?
        .ok_or_else(invalid_reset_token)?;

    if ticket.expires_at < format_timestamp(Utc::now())
        || !reset_secret_matches(secret, &ticket.token_hash)
    {
        tracing::info!(user_id, "Reset token rejected");
        return Err(invalid_reset_token());
    }
    Ok(user_id)
}

/// GET /api/auth/verify-reset-token/{token} - Check a reset link before showing the form.
pub async fn verify_reset_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<ResetTokenStatus> {
    let user_id = redeemable_reset(&state, &token).await?;
    let user = state
        .repo
        .get_user(user_id)
        .await?
        .ok_or_else(invalid_reset_token)?;

    success(ResetTokenStatus {
        valid: true,
        email: user.profile.email.unwrap_or_default(),
    })
}

/// POST /api/auth/reset-password - Set a new password with a reset token.
pub async fn reset_password(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<ResetPasswordRequest>,
) -> ApiResult<MessageBody> {
    validate_password(&request.password)?;
    let user_id = redeemable_reset(&state, &request.token).await?;

    let password_hash = hash_off_thread(request.password).await?;
    state.repo.set_password(user_id, &password_hash).await?;
    tracing::info!(user_id, "Password reset");

    success(MessageBody::new("Password has been reset"))
}

/// POST /api/auth/change-password - Replace the password, proving the current one.
pub async fn change_password(
    State(state): State<AppState>,
    actor: AuthUser,
    ValidJson(request): ValidJson<ChangePasswordRequest>,
) -> ApiResult<MessageBody> {
    if request.current_password.is_empty() || request.new_password.is_empty() {
        return Err(AppError::validation_code(
            codes::MISSING_FIELDS,
            "Missing required fields: currentPassword, newPassword",
        ));
    }
    validate_password(&request.new_password)?;

    let credentials = state
        .repo
        .get_credentials_by_id(&actor.id)
        .await?
        .ok_or_else(|| AppError::user_not_found(&actor.id))?;
    if !verify_off_thread(request.current_password, credentials.password_hash).await? {
        tracing::info!(user_id = %actor.id, "Password change rejected");
        return Err(AppError::validation_code(
            codes::INCORRECT_PASSWORD,
            "Current password is incorrect",
        ));
    }

    let password_hash = hash_off_thread(request.new_password).await?;
    state.repo.set_password(&actor.id, &password_hash).await?;
    tracing::info!(user_id = %actor.id, "Password changed");

    success(MessageBody::new("Password changed successfully"))
}

/// DELETE /api/auth/account - Delete the caller's account and everything it owns.
pub async fn delete_account(
    State(state): State<AppState>,
    actor: AuthUser,
) -> ApiResult<MessageBody> {
    state.social.delete_account(&actor).await?;
    success(MessageBody::new("Account deleted successfully"))
}
