//! Authentication.
//!
//! A login issues an HS256 JWT and stores it as the user's only session.
//! A request is authenticated when the token verifies **and** its session
//! row is still live, so logout and re-login revoke older tokens before
//! they expire.
//!
//! ```text
//! Authorization: Bearer <jwt>
//!        │
//!        ├─► JwtManager::validate_token   signature, exp
//!        ├─► sessions().find_valid        purge expired, look up row
//!        ▼
//! CurrentUser { username, operator }
//! ```

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use bookstore_core::{Operator, User};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,

    /// Employee id the user acts under
    pub employee_id: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID, makes every login's token distinct
    pub jti: String,
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// JWT token manager.
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: &str, lifetime_secs: i64) -> Self {
        JwtManager {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime_secs,
        }
    }

    /// Signs a token for the user.
    pub fn issue(&self, user: &User) -> Result<IssuedToken, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: user.username.clone(),
            employee_id: user.employee_id.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ApiError::internal(format!("Failed to generate token: {}", e)))?;

        // Session expiry matches the claim, at whole-second precision
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .unwrap_or(exp);

        Ok(IssuedToken { token, expires_at })
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| ApiError::unauthorized(format!("Invalid token: {}", e)))
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Hashes a password into an Argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))
}

/// Checks a password against a stored PHC string.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}

// =============================================================================
// Extractor
// =============================================================================

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub username: String,
    pub operator: Operator,
    pub token: String,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                warn!(uri = %parts.uri, "Missing authorization header");
                ApiError::unauthorized("Missing authorization header")
            })?;

        let token = extract_bearer_token(header)
            .ok_or_else(|| ApiError::unauthorized("Invalid authorization header"))?;

        let claims = state.jwt.validate_token(token).inspect_err(|e| {
            warn!(uri = %parts.uri, error = %e, "Token rejected");
        })?;

        let session = state
            .db
            .sessions()
            .find_valid(token, Utc::now())
            .await?
            .filter(|session| session.username == claims.sub)
            .ok_or_else(|| {
                warn!(username = %claims.sub, "No live session for token");
                ApiError::unauthorized("Session expired or logged out")
            })?;

        let user = CurrentUser {
            operator: session.operator(),
            username: session.username,
            token: token.to_string(),
        };

        parts.extensions.insert(user.clone());
        Ok(user)
    }
}
