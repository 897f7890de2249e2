//! Teacher authentication: credential lookup and bearer tokens.
//!
//! Passwords are never held in plaintext once the store is built; only their
//! SHA-256 digests are kept and compared in constant time. Tokens are HS256
//! JWTs whose subject is the teacher id.

use crate::config::{TeacherCredentials, MAX_TOKEN_TTL_HOURS};
use crate::error::SmartMarksError;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// An authenticated teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Teacher {
    pub id: String,
    pub email: String,
}

/// Source of teacher identities.
pub trait CredentialStore: Send + Sync {
    /// Find a teacher by login email.
    fn lookup(&self, email: &str) -> Option<Teacher>;

    /// Find a teacher by id (the token subject).
    fn find_by_id(&self, id: &str) -> Option<Teacher>;

    /// Return the teacher if `password` matches the one on record for `email`.
    fn verify(&self, email: &str, password: &str) -> Option<Teacher>;
}

/// Holds at most one teacher, typically taken from the environment.
#[derive(Debug, Default)]
pub struct StaticCredentialStore {
    entry: Option<(Teacher, String)>,
}

impl StaticCredentialStore {
    pub fn new(credentials: Option<&TeacherCredentials>) -> Self {
        let entry = credentials.map(|c| {
            (
                Teacher {
                    id: c.id.clone(),
                    email: c.email.clone(),
                },
                hash_password(&c.password),
            )
        });
        Self { entry }
    }
}

impl CredentialStore for StaticCredentialStore {
    fn lookup(&self, email: &str) -> Option<Teacher> {
        self.entry
            .as_ref()
            .filter(|(t, _)| t.email == email)
            .map(|(t, _)| t.clone())
    }

    fn find_by_id(&self, id: &str) -> Option<Teacher> {
        self.entry
            .as_ref()
            .filter(|(t, _)| t.id == id)
            .map(|(t, _)| t.clone())
    }

    fn verify(&self, email: &str, password: &str) -> Option<Teacher> {
        if email.is_empty() || password.is_empty() {
            return None;
        }
        let Some((teacher, expected)) = self.entry.as_ref().filter(|(t, _)| t.email == email)
        else {
            warn!("Login attempt for unknown email");
            return None;
        };
        if constant_time_compare(&hash_password(password), expected) {
            Some(teacher.clone())
        } else {
            warn!("Wrong password for teacher {}", teacher.id);
            None
        }
    }
}

fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Why a bearer token was rejected. The display text is sent to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Token is missing!")]
    Missing,

    #[error("Token has expired!")]
    Expired,

    #[error("Token is invalid!")]
    Invalid,
}

/// JWT payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 tokens with a fixed lifetime.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            ttl: Duration::hours(ttl_hours.clamp(1, MAX_TOKEN_TTL_HOURS)),
        }
    }

    /// Issue a token for `subject`, valid from now.
    pub fn issue(&self, subject: &str) -> Result<String, SmartMarksError> {
        self.issue_at(subject, Utc::now())
    }

    /// Issue a token as if it had been minted at `issued_at`.
    pub fn issue_at(&self, subject: &str, issued_at: DateTime<Utc>) -> Result<String, SmartMarksError> {
        let claims = Claims {
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| SmartMarksError::Internal(format!("token signing failed: {}", e)))
    }

    /// Check signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Missing);
        }
        match jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => Err(AuthError::Expired),
            Err(e) => {
                debug!("Token rejected: {}", e);
                Err(AuthError::Invalid)
            }
        }
    }
}
