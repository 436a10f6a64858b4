use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, Rng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::state::AppState;

/// 6-digit code mailed out for email verification, valid for 24 hours.
pub fn new_verification_code() -> String {
    OsRng.gen_range(100_000..=999_999).to_string()
}

/// Bearer token for password reset: 20 random bytes, hex encoded.
pub fn new_reset_token() -> String {
    let mut bytes = [0u8; 20];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub aud: String,
}

#[derive(Debug, Error)]
pub enum SessionTokenError {
    #[error("session token expired")]
    Expired,
    #[error("invalid session token")]
    Invalid,
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub session_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            session_ttl_days,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            session_ttl: Duration::from_secs((session_ttl_days as u64) * 24 * 60 * 60),
        }
    }
}

impl JwtKeys {
    fn sign_with_ttl(&self, user_id: Uuid, ttl: TimeDuration) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + ttl;
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "session token signed");
        Ok(token)
    }

    /// Sign a stateless session token for this user, expiring after the
    /// configured session TTL.
    pub fn sign_session(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_with_ttl(
            user_id,
            TimeDuration::seconds(self.session_ttl.as_secs() as i64),
        )
    }

    /// Verify a session token and extract the user id it was issued for.
    pub fn verify_session(&self, token: &str) -> Result<Uuid, SessionTokenError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => SessionTokenError::Expired,
                ErrorKind::InvalidToken
                | ErrorKind::InvalidSignature
                | ErrorKind::InvalidIssuer
                | ErrorKind::InvalidAudience
                | ErrorKind::ImmatureSignature
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => SessionTokenError::Invalid,
                _ => SessionTokenError::Other(e.into()),
            }
        })?;
        debug!(user_id = %data.claims.sub, "session token verified");
        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        let state = AppState::fake();
        JwtKeys::from_ref(&state)
    }

    #[test]
    fn verification_code_is_six_digits_in_range() {
        for _ in 0..100 {
            let code = new_verification_code();
            assert_eq!(code.len(), 6);
            let n: u32 = code.parse().expect("numeric code");
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn reset_token_is_forty_hex_chars() {
        let token = new_reset_token();
        assert_eq!(token.len(), 40);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn reset_tokens_are_unique() {
        assert_ne!(new_reset_token(), new_reset_token());
    }

    #[tokio::test]
    async fn sign_and_verify_session() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign_session(user_id).expect("sign session");
        let decoded = keys.verify_session(&token).expect("verify session");
        assert_eq!(decoded, user_id);
    }

    #[tokio::test]
    async fn verify_rejects_tampered_token() {
        let keys = make_keys();
        let token = keys.sign_session(Uuid::new_v4()).expect("sign session");
        let mut tampered = token.clone();
        tampered.push('x');
        let err = keys.verify_session(&tampered).unwrap_err();
        assert!(matches!(err, SessionTokenError::Invalid));
    }

    #[tokio::test]
    async fn verify_rejects_garbage_token() {
        let keys = make_keys();
        let err = keys.verify_session("not-a-jwt").unwrap_err();
        assert!(matches!(err, SessionTokenError::Invalid));
    }

    #[tokio::test]
    async fn verify_rejects_token_signed_with_other_secret() {
        let keys = make_keys();
        let other = JwtKeys {
            encoding: EncodingKey::from_secret(b"other-secret"),
            decoding: DecodingKey::from_secret(b"other-secret"),
            issuer: keys.issuer.clone(),
            audience: keys.audience.clone(),
            session_ttl: keys.session_ttl,
        };
        let token = other.sign_session(Uuid::new_v4()).expect("sign session");
        let err = keys.verify_session(&token).unwrap_err();
        assert!(matches!(err, SessionTokenError::Invalid));
    }

    #[tokio::test]
    async fn verify_reports_expired_token() {
        let keys = make_keys();
        let token = keys
            .sign_with_ttl(Uuid::new_v4(), TimeDuration::hours(-1))
            .expect("sign expired");
        let err = keys.verify_session(&token).unwrap_err();
        assert!(matches!(err, SessionTokenError::Expired));
    }
}
