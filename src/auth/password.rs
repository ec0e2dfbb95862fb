//! Password hashing and verification using Argon2id.
//!
//! Hashes are PHC strings (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`) that carry
//! their own salt and cost parameters, so the configured cost can be raised
//! without invalidating hashes that are already stored.

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

use crate::config::AuthConfig;
use crate::error::AuthError;

#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl PasswordHasher {
    /// Build a hasher with an explicit cost factor.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Hashing` if Argon2 rejects the parameters.
    pub fn with_params(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, AuthError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| AuthError::Hashing(format!("Invalid parameters: {e}")))?;

        Ok(Self { params })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        Self::with_params(
            config.hash_memory_kib,
            config.hash_iterations,
            config.hash_parallelism,
        )
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hashing(format!("Hashing failed: {e}")))
    }

    /// Check a candidate password against a stored hash.
    ///
    /// Returns `Ok(false)` for a mismatch. Only a stored hash that does not
    /// parse is an error. The cost parameters come from the stored hash, not
    /// from this hasher.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AuthError::Hashing(format!("Invalid password hash format: {e}")))?;

        match self.argon2().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Hashing(format!("Verification failed: {e}"))),
        }
    }
}
