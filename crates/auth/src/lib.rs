//! Capability tokens and operator credentials.
//!
//! Guests receive a signed token at RSVP time that stands in for the bare
//! guest id as the session marker; the operator receives a session-bound
//! token at sign-in. Both are HS256 JWTs distinguished by audience.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::domain::GuestId;
use thiserror::Error;
use uuid::Uuid;

pub const GUEST_AUDIENCE: &str = "guest";
pub const ADMIN_AUDIENCE: &str = "admin";

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub issuer: String,
    pub secret: String,
    pub guest_ttl_seconds: i64,
    pub admin_ttl_seconds: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token rejected: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("token subject '{0}' is malformed")]
    MalformedSubject(String),
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct GuestClaims {
    iss: String,
    aud: String,
    sub: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub sid: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl AdminClaims {
    pub fn email(&self) -> &str {
        &self.sub
    }

    pub fn session_id(&self) -> Uuid {
        self.sid
    }
}

#[derive(Debug, Clone)]
pub struct IssuedAdminToken {
    pub token: String,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

pub fn guest_subject(guest_id: GuestId) -> String {
    format!("guest:{}", guest_id.0)
}

pub fn mint_guest_token(cfg: &TokenConfig, guest_id: GuestId) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(cfg.guest_ttl_seconds);
    let claims = GuestClaims {
        iss: cfg.issuer.clone(),
        aud: GUEST_AUDIENCE.to_string(),
        sub: guest_subject(guest_id),
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(cfg.secret.as_bytes()),
    )?)
}

/// Returns the guest the token was issued to.
pub fn verify_guest_token(cfg: &TokenConfig, token: &str) -> Result<GuestId, AuthError> {
    let claims = decode::<GuestClaims>(
        token,
        &DecodingKey::from_secret(cfg.secret.as_bytes()),
        &validation(cfg, GUEST_AUDIENCE),
    )?
    .claims;

    let guest_id = claims
        .sub
        .strip_prefix("guest:")
        .and_then(|id| id.parse::<i64>().ok())
        .map(GuestId);
    guest_id.ok_or(AuthError::MalformedSubject(claims.sub))
}

pub fn mint_admin_token(cfg: &TokenConfig, email: &str) -> Result<IssuedAdminToken, AuthError> {
    let now = Utc::now();
    let expires_at = now + Duration::seconds(cfg.admin_ttl_seconds);
    let session_id = Uuid::new_v4();
    let claims = AdminClaims {
        iss: cfg.issuer.clone(),
        aud: ADMIN_AUDIENCE.to_string(),
        sub: email.to_string(),
        sid: session_id,
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(cfg.secret.as_bytes()),
    )?;
    Ok(IssuedAdminToken {
        token,
        session_id,
        expires_at,
    })
}

pub fn verify_admin_token(cfg: &TokenConfig, token: &str) -> Result<AdminClaims, AuthError> {
    Ok(decode::<AdminClaims>(
        token,
        &DecodingKey::from_secret(cfg.secret.as_bytes()),
        &validation(cfg, ADMIN_AUDIENCE),
    )?
    .claims)
}

fn validation(cfg: &TokenConfig, audience: &str) -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[audience]);
    validation.set_issuer(&[cfg.issuer.as_str()]);
    validation.leeway = 0;
    validation
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
