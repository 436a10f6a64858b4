use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse,
            ResetPasswordRequest, SignupRequest, VerifyEmailRequest,
        },
        extractors::{AuthUser, SESSION_COOKIE},
        services,
        token::JwtKeys,
    },
    error::AuthError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/verify-email", post(verify_email))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password/:token", post(reset_password))
        .route("/check-auth", get(check_auth))
}

/// Session cookie as set on signup/login: http-only, strict same-site,
/// secure only in production, lifetime matching the token's expiry.
fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let keys = JwtKeys::from_ref(state);
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .secure(state.config.production)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(keys.session_ttl.as_secs() as i64))
        .path("/")
        .build()
}

#[instrument(skip(state, jar, payload))]
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), AuthError> {
    let user = services::signup(&state, payload).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_session(user.id)?;
    let jar = jar.add(session_cookie(&state, token));

    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            success: true,
            message: "User created successfully".into(),
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    let user = services::verify_email(&state, payload).await?;
    Ok(Json(AuthResponse {
        success: true,
        message: "Email verified successfully".into(),
        user: user.into(),
    }))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AuthError> {
    let user = services::login(&state, payload).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_session(user.id)?;
    let jar = jar.add(session_cookie(&state, token));

    Ok((
        jar,
        Json(AuthResponse {
            success: true,
            message: "Logged in successfully".into(),
            user: user.into(),
        }),
    ))
}

/// Clears the session cookie. Sessions are stateless, so there is nothing
/// to revoke server-side; this never fails.
#[instrument(skip(jar))]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/").build());
    (
        jar,
        Json(MessageResponse {
            success: true,
            message: "Logged out successfully".into(),
        }),
    )
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    services::forgot_password(&state, payload).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Password reset link sent to your email".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    services::reset_password(&state, &token, payload).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Password reset successful".into(),
    }))
}

#[instrument(skip(state))]
pub async fn check_auth(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<AuthResponse>, AuthError> {
    let user = services::check_auth(&state, user_id).await?;
    Ok(Json(AuthResponse {
        success: true,
        message: "Authenticated".into(),
        user: user.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn session_cookie_attributes() {
        let state = AppState::fake();
        let cookie = session_cookie(&state, "abc".into());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));
        // fake state is non-production
        assert_ne!(cookie.secure(), Some(true));
        assert_eq!(
            cookie.max_age(),
            Some(time::Duration::days(7))
        );
    }
}
