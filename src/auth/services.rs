use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::dto::{
    ForgotPasswordRequest, LoginRequest, ResetPasswordRequest, SignupRequest, VerifyEmailRequest,
};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo_types::User;
use crate::auth::token::{new_reset_token, new_verification_code};
use crate::error::AuthError;
use crate::mailer::Email;
use crate::state::AppState;

const VERIFICATION_CODE_TTL: Duration = Duration::hours(24);
const RESET_TOKEN_TTL: Duration = Duration::hours(1);
const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn check_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AuthError::Validation("Password too short".into()));
    }
    Ok(())
}

/// Create an unverified account, mail out the verification code and return
/// the fresh record. The store's unique constraint on email is the final
/// arbiter when two signups race.
pub async fn signup(state: &AppState, mut input: SignupRequest) -> Result<User, AuthError> {
    input.email = input.email.trim().to_lowercase();
    input.name = input.name.trim().to_string();

    if input.email.is_empty() || input.password.is_empty() || input.name.is_empty() {
        return Err(AuthError::Validation("All fields are required".into()));
    }
    if !is_valid_email(&input.email) {
        warn!(email = %input.email, "invalid email");
        return Err(AuthError::Validation("Invalid email".into()));
    }
    check_password(&input.password)?;

    // Friendly pre-check; the insert below still catches the race.
    if User::find_by_email(&state.db, &input.email).await?.is_some() {
        warn!(email = %input.email, "email already registered");
        return Err(AuthError::Conflict);
    }

    let hash = hash_password(&input.password)?;
    let code = new_verification_code();
    let expires_at = OffsetDateTime::now_utc() + VERIFICATION_CODE_TTL;

    let user = User::create(&state.db, &input.email, &hash, &input.name, &code, expires_at).await?;

    state
        .mailer
        .send(&user.email, Email::verification(&code))
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Consume a verification code, flagging the account verified.
pub async fn verify_email(state: &AppState, input: VerifyEmailRequest) -> Result<User, AuthError> {
    let user = User::find_by_valid_verification_code(&state.db, &input.code)
        .await?
        .ok_or(AuthError::InvalidOrExpiredCode)?;

    let user = User::mark_verified(&state.db, user.id).await?;

    state
        .mailer
        .send(&user.email, Email::welcome(&user.name))
        .await?;

    info!(user_id = %user.id, "email verified");
    Ok(user)
}

/// Check credentials and record the login time. Unknown email and wrong
/// password are indistinguishable to the caller.
pub async fn login(state: &AppState, mut input: LoginRequest) -> Result<User, AuthError> {
    input.email = input.email.trim().to_lowercase();

    if !is_valid_email(&input.email) {
        warn!(email = %input.email, "invalid email");
        return Err(AuthError::Validation("Invalid email".into()));
    }

    let user = match User::find_by_email(&state.db, &input.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %input.email, "login unknown email");
            return Err(AuthError::InvalidCredentials);
        }
    };

    if !verify_password(&input.password, &user.password_hash)? {
        warn!(email = %input.email, user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    let user = User::touch_last_login(&state.db, user.id).await?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(user)
}

/// Issue a password reset token and mail out the reset link.
pub async fn forgot_password(
    state: &AppState,
    mut input: ForgotPasswordRequest,
) -> Result<(), AuthError> {
    input.email = input.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &input.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %input.email, "forgot password for unknown email");
            AuthError::NotFound
        })?;

    let token = new_reset_token();
    let expires_at = OffsetDateTime::now_utc() + RESET_TOKEN_TTL;
    let user = User::set_reset_token(&state.db, user.id, &token, expires_at).await?;

    let reset_url = format!("{}/reset-password/{}", state.config.client_url, token);
    state
        .mailer
        .send(&user.email, Email::password_reset(&reset_url))
        .await?;

    info!(user_id = %user.id, "password reset link issued");
    Ok(())
}

/// Consume a reset token, replacing the stored password hash.
pub async fn reset_password(
    state: &AppState,
    token: &str,
    input: ResetPasswordRequest,
) -> Result<(), AuthError> {
    if input.password.is_empty() {
        return Err(AuthError::Validation("All fields are required".into()));
    }
    check_password(&input.password)?;

    let user = User::find_by_valid_reset_token(&state.db, token)
        .await?
        .ok_or(AuthError::InvalidOrExpiredResetToken)?;

    let hash = hash_password(&input.password)?;
    let user = User::update_password(&state.db, user.id, &hash).await?;

    state
        .mailer
        .send(&user.email, Email::password_reset_success())
        .await?;

    info!(user_id = %user.id, "password reset");
    Ok(())
}

/// Load the caller's account after the session middleware validated it.
pub async fn check_auth(state: &AppState, user_id: Uuid) -> Result<User, AuthError> {
    User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(AuthError::NotFound)
}
