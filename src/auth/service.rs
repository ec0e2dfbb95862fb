use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::auth::password::PasswordHasher;
use crate::auth::token::{session_ttl, SessionClaim, TokenCodec};
use crate::config::AuthConfig;
use crate::db::{normalize_email, Credentials, NewUser, RegisterRequest, UserDirectory, UserProfile};
use crate::error::{AppError, AuthError, DatabaseError};

/// A freshly signed session token together with what it asserts.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub claim: SessionClaim,
}

/// Registration, login and identity resolution over a [`UserDirectory`].
///
/// Holds no per-user state: everything a session needs is inside its token,
/// and every lookup goes to the directory.
pub struct AuthService {
    directory: Arc<dyn UserDirectory>,
    hasher: PasswordHasher,
    codec: TokenCodec,
}

fn validate_email(email: &str) -> Result<(), AppError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AppError::ValidationError("A valid email address is required".into())),
    }
}

fn require(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::ValidationError(format!("{} must not be empty", field)));
    }
    Ok(())
}

impl AuthService {
    pub fn new(directory: Arc<dyn UserDirectory>, hasher: PasswordHasher, codec: TokenCodec) -> Self {
        Self {
            directory,
            hasher,
            codec,
        }
    }

    pub fn from_config(directory: Arc<dyn UserDirectory>, config: &AuthConfig) -> Result<Self, AppError> {
        let hasher = PasswordHasher::from_config(config)?;
        let codec = TokenCodec::new(config.jwt_secret.as_bytes())?;
        Ok(Self::new(directory, hasher, codec))
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    // Argon2 is deliberately slow; keep it off the async workers.
    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<UserProfile, AppError> {
        require(&request.name, "name")?;
        require(&request.password, "password")?;
        let email = normalize_email(&request.email);
        validate_email(&email)?;

        if self.directory.find_by_email(&email).await?.is_some() {
            return Err(AuthError::DuplicateEmail.into());
        }

        let password_hash = self.hash_password(request.password).await?;
        let new_user = NewUser {
            name: request.name.trim().to_string(),
            email,
            password_hash,
        };

        let user = match self.directory.insert(new_user).await {
            Ok(user) => user,
            // Lost a race with a concurrent registration for the same email.
            Err(DatabaseError::Duplicate) => return Err(AuthError::DuplicateEmail.into()),
            Err(e) => return Err(e.into()),
        };

        info!("Registered user {} ({})", user.id, user.email);
        Ok(user.into())
    }

    /// Check credentials and sign a 24 hour session token.
    ///
    /// Unknown email and wrong password both yield
    /// `AuthError::InvalidCredentials`.
    pub async fn login(&self, credentials: Credentials) -> Result<IssuedSession, AppError> {
        require(&credentials.email, "email")?;
        require(&credentials.password, "password")?;
        let email = normalize_email(&credentials.email);

        let user = match self.directory.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                // Spend the same hashing effort as a real check so response
                // time does not reveal whether the account exists.
                let _ = self.hash_password(credentials.password).await;
                warn!("Failed login for {}", email);
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        if !self.verify_password(credentials.password, user.password_hash).await? {
            warn!("Failed login for {}", email);
            return Err(AuthError::InvalidCredentials.into());
        }

        let claim = SessionClaim::new(user.id, Utc::now(), session_ttl());
        let token = self.codec.issue(&claim)?;

        info!("User {} logged in, session expires at {}", user.id, claim.expires_at);
        Ok(IssuedSession { token, claim })
    }

    /// Validate a session token and load the current record of its subject.
    pub async fn resolve_identity(&self, token: &str) -> Result<UserProfile, AppError> {
        let claim = self.codec.validate(token).map_err(|e| {
            debug!("Rejected session token: {}", e);
            e
        })?;

        let user = self
            .directory
            .find_by_id(claim.subject_id)
            .await?
            .ok_or(AuthError::IdentityNotFound)?;

        Ok(user.into())
    }

    /// Sessions are stateless, so there is nothing to revoke here. The caller
    /// clears the client's cookie; a copy of the token kept elsewhere stays
    /// valid until it expires.
    pub async fn logout(&self, token: Option<&str>) {
        match token.map(|t| self.codec.validate(t)) {
            Some(Ok(claim)) => info!(
                "User {} logged out; token remains valid until {}",
                claim.subject_id, claim.expires_at
            ),
            Some(Err(e)) => debug!("Logout with unusable token: {}", e),
            None => debug!("Logout without a session token"),
        }
    }
}
