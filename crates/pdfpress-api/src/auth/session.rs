//! JWT session token creation and verification.

use axum::http::{header, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use pdfpress_core::AppError;
use serde::{Deserialize, Serialize};

pub const SESSION_COOKIE_NAME: &str = "pdfpress_session";

/// Subject of every session; there is a single shared password, not user accounts
const SESSION_SUBJECT: &str = "pdfpress";

/// JWT session claims
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

impl SessionClaims {
    pub fn new(ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: SESSION_SUBJECT.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// HS256 signing and verification keys derived from one secret
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SessionKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Keys from a fresh random secret, valid for this process only
    pub fn random() -> Self {
        let bytes: [u8; 32] = rand::random();
        Self::from_secret(hex::encode(bytes).as_bytes())
    }
}

/// Create a JWT token for a new session
pub fn create_session_token(keys: &SessionKeys, ttl: Duration) -> Result<String, AppError> {
    let claims = SessionClaims::new(ttl);
    encode(&Header::default(), &claims, &keys.encoding)
        .map_err(|e| AppError::Internal(format!("create JWT: {e}")))
}

/// Verify and decode a JWT session token
pub fn verify_session_token(token: &str, keys: &SessionKeys) -> Result<SessionClaims, AppError> {
    let token_data = decode::<SessionClaims>(token, &keys.decoding, &Validation::default())
        .map_err(|e| AppError::Unauthorized(format!("invalid session: {e}")))?;

    if token_data.claims.sub != SESSION_SUBJECT {
        return Err(AppError::Unauthorized("unexpected session subject".to_string()));
    }
    Ok(token_data.claims)
}

/// `Set-Cookie` value carrying a session token
pub fn create_session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE_NAME, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie(secure: bool) -> String {
    create_session_cookie("", 0, secure)
}

/// Session token from the request's `Cookie` headers, if any
pub fn extract_session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE_NAME && !value.is_empty())
        .map(|(_, value)| value)
}
