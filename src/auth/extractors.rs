use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::auth::token::{JwtKeys, SessionTokenError};
use crate::error::AuthError;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "token";

/// Extracts the session cookie, verifies it and yields the user id.
/// Requests without a valid session are rejected with 401 before the
/// handler runs.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        let cookie = jar.get(SESSION_COOKIE).ok_or(AuthError::NoToken)?;

        match keys.verify_session(cookie.value()) {
            Ok(user_id) => Ok(AuthUser(user_id)),
            Err(SessionTokenError::Expired) | Err(SessionTokenError::Invalid) => {
                tracing::warn!("invalid or expired session token");
                Err(AuthError::InvalidSession)
            }
            Err(SessionTokenError::Other(e)) => Err(AuthError::Internal(e)),
        }
    }
}
