//! Session token codec.
//!
//! A session token is an HS256-signed JWT carrying `sub`, `iat` and `exp`.
//! Nothing about issued tokens is stored server-side: a token is valid while
//! its signature checks out under the process secret and `exp` is in the
//! future.

use chrono::{DateTime, Duration, SubsecRound, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{AppError, AuthError};

/// Lifetime of every session issued at login.
pub const SESSION_TTL_HOURS: i64 = 24;

pub fn session_ttl() -> Duration {
    Duration::hours(SESSION_TTL_HOURS)
}

/// What a session token asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClaim {
    pub subject_id: i64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionClaim {
    /// Claim for `subject_id` starting at `now` and lasting `ttl`.
    /// Timestamps are truncated to whole seconds, the token's resolution.
    pub fn new(subject_id: i64, now: DateTime<Utc>, ttl: Duration) -> Self {
        let issued_at = now.trunc_subsecs(0);
        Self {
            subject_id,
            issued_at,
            expires_at: issued_at + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Wire form of [`SessionClaim`].
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // User ID
    iat: i64,
    exp: i64,
}

impl From<&SessionClaim> for Claims {
    fn from(claim: &SessionClaim) -> Self {
        Self {
            sub: claim.subject_id.to_string(),
            iat: claim.issued_at.timestamp(),
            exp: claim.expires_at.timestamp(),
        }
    }
}

impl TryFrom<Claims> for SessionClaim {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let subject_id = claims
            .sub
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or(AuthError::MalformedToken)?;
        let issued_at = timestamp(claims.iat)?;
        let expires_at = timestamp(claims.exp)?;

        Ok(Self {
            subject_id,
            issued_at,
            expires_at,
        })
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, AuthError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or(AuthError::MalformedToken)
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::InvalidSignature,
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::MalformedToken,
    }
}

/// Signs and validates session tokens with a single process-wide secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Result<Self, AppError> {
        if secret.is_empty() {
            return Err(AppError::ConfigError("Signing secret must not be empty".into()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256];
        // Expiry is checked in `validate_at` against an explicit clock.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims = ["sub", "iat", "exp"]
            .into_iter()
            .map(String::from)
            .collect::<HashSet<_>>();

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        })
    }

    /// Serialize and sign a claim.
    pub fn issue(&self, claim: &SessionClaim) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            &Claims::from(claim),
            &self.encoding_key,
        )
        .map_err(|e| AuthError::Signing(e.to_string()))
    }

    pub fn validate(&self, token: &str) -> Result<SessionClaim, AuthError> {
        self.validate_at(token, Utc::now())
    }

    /// Verify the signature, then the expiry as of `now`.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaim, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(map_jwt_error)?;
        let claim = SessionClaim::try_from(data.claims)?;

        if claim.is_expired_at(now) {
            return Err(AuthError::TokenExpired);
        }

        Ok(claim)
    }
}
