// Authentication primitives: password hashing, JWT tokens, and the bearer extractor.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::AppState;
use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

// ── Passwords ────────────────────────────────────────────────────────

/// One-way password hashing and verification.
pub trait PasswordScheme: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AuthError>;
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

/// Argon2id with a random salt per hash (PHC string format).
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2Scheme;

impl PasswordScheme for Argon2Scheme {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::Hash(e.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Hash(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

// ── Tokens ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: i64, // user id
    pub exp: usize,
}

/// Issues opaque access tokens keyed by user id.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user_id: i64) -> Result<String, AuthError>;
    fn verify(&self, token: &str) -> Result<Claims, AuthError>;
}

/// HS256 JWTs with a fixed lifetime.
pub struct JwtIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_hours: i64,
}

impl JwtIssuer {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_hours,
        }
    }
}

impl TokenIssuer for JwtIssuer {
    fn issue(&self, user_id: i64) -> Result<String, AuthError> {
        let exp = (chrono::Utc::now() + chrono::Duration::hours(self.ttl_hours)).timestamp();
        let claims = Claims {
            sub: user_id,
            exp: exp as usize,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

// ── Axum extractor: AuthUser ─────────────────────────────────────────

/// Extracts the authenticated user from the `Authorization: Bearer` header.
/// Usage: `AuthUser(claims)` in handler parameters.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.0.sub
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header format"))?;

        state
            .tokens
            .verify(token)
            .map(AuthUser)
            .map_err(|_| ApiError::unauthorized("Invalid token"))
    }
}
