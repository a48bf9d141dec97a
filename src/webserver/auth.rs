//! Access gate: token issuance/verification and admin password checks.
//!
//! Tokens are HS256 JWTs carrying `{sub, name, iat, exp}`. Passwords are
//! stored as argon2 PHC strings.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::errors::DeviceError;

/// Legacy header still sent by older dashboards
pub const LEGACY_TOKEN_HEADER: &str = "x-auth-token";

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the login that was authenticated
    pub sub: String,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated caller, stored in request extensions by the middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub login: String,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self { login: claims.sub }
    }
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: jsonwebtoken::EncodingKey,
    decoding_key: jsonwebtoken::DecodingKey,
    validation: jsonwebtoken::Validation,
    expire_secs: i64,
}

impl JwtService {
    pub fn new(secret: &str, expire_secs: i64) -> Self {
        Self {
            encoding_key: jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: jsonwebtoken::DecodingKey::from_secret(secret.as_bytes()),
            validation: jsonwebtoken::Validation::default(),
            expire_secs,
        }
    }

    pub fn expire_secs(&self) -> i64 {
        self.expire_secs
    }

    pub fn issue(&self, login: &str, display_name: &str) -> Result<String, DeviceError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: login.to_string(),
            name: display_name.to_string(),
            iat: now,
            exp: now + self.expire_secs,
        };
        jsonwebtoken::encode(&jsonwebtoken::Header::default(), &claims, &self.encoding_key)
            .map_err(|e| DeviceError::Internal(format!("jwt encode: {}", e)))
    }

    /// Rejects invalid, expired or tampered tokens
    pub fn verify(&self, token: &str) -> Result<Claims, DeviceError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| DeviceError::Unauthorized(format!("invalid token: {}", e)))
    }
}

/// Hash a plain password into an argon2 PHC string
pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
        .map_err(|e| format!("Failed to generate salt: {}", e))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| format!("Failed to hash password: {}", e))
}

/// Verify against a stored PHC string; an empty or malformed hash never matches
pub fn verify_password(password: &str, hash: &str) -> bool {
    if hash.is_empty() {
        return false;
    }
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Pull a credential from `Authorization: Bearer`, then `x-auth-token`,
/// then (when allowed) the `token` query parameter.
pub fn extract_token(headers: &HeaderMap, query: Option<&str>, allow_query: bool) -> Option<String> {
    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    let legacy = headers
        .get(LEGACY_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = legacy {
        return Some(token.to_string());
    }

    if !allow_query {
        return None;
    }
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "token")
        .map(|(_, value)| value.to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_issue_and_verify() {
        let svc = JwtService::new("test-secret", 3600);
        let token = svc.issue("admin", "admin").unwrap();
        let claims = svc.verify(&token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_wrong_secret_and_expired_rejected() {
        let issuer = JwtService::new("secret-a", 3600);
        let verifier = JwtService::new("secret-b", 3600);
        let token = issuer.issue("admin", "admin").unwrap();
        assert!(matches!(
            verifier.verify(&token),
            Err(DeviceError::Unauthorized(_))
        ));

        // past the default 60s leeway
        let expired = JwtService::new("secret-a", -120);
        let token = expired.issue("admin", "admin").unwrap();
        assert!(expired.verify(&token).is_err());
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", ""));
        assert!(!verify_password("hunter2", "not-a-phc-string"));
    }

    #[test]
    fn test_extract_token_sources() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers, Some("token=abc"), false), None);
        assert_eq!(
            extract_token(&headers, Some("x=1&token=abc"), true).as_deref(),
            Some("abc")
        );

        headers.insert(LEGACY_TOKEN_HEADER, HeaderValue::from_static("legacy"));
        assert_eq!(
            extract_token(&headers, None, false).as_deref(),
            Some("legacy")
        );

        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer primary"),
        );
        assert_eq!(
            extract_token(&headers, None, false).as_deref(),
            Some("primary")
        );
    }
}
