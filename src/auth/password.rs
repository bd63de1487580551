/// Password Hashing and Verification
///
/// bcrypt with a fixed work factor. The cost is part of every stored hash,
/// so changing it only affects newly written hashes.

use crate::error::{AppError, ConfigError, ValidationError};

/// Work factor used for stored password and refresh-token hashes.
pub const BCRYPT_COST: u32 = 12;

const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;

pub(crate) const MIN_PASSWORD_LENGTH: usize = 8;
// bcrypt only reads the first 72 bytes
const MAX_PASSWORD_LENGTH: usize = 72;

/// One-way hashing and constant-time comparison of secrets.
#[derive(Debug, Clone, Copy)]
pub struct PasswordVerifier {
    cost: u32,
}

impl Default for PasswordVerifier {
    fn default() -> Self {
        Self { cost: BCRYPT_COST }
    }
}

impl PasswordVerifier {
    /// Build a verifier with an explicit bcrypt cost (4..=31).
    pub fn new(cost: u32) -> Result<Self, AppError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(AppError::Config(ConfigError::InvalidValue(format!(
                "bcrypt cost must be between {} and {}",
                MIN_COST, MAX_COST
            ))));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password.
    ///
    /// # Errors
    /// - `ValidationError::TooShort` for passwords under 8 characters,
    ///   checked before the hash function runs
    /// - `ValidationError::TooLong` past the bcrypt input limit
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AppError::Validation(ValidationError::TooShort(
                "password".to_string(),
                MIN_PASSWORD_LENGTH,
            )));
        }

        if password.len() > MAX_PASSWORD_LENGTH {
            return Err(AppError::Validation(ValidationError::TooLong(
                "password".to_string(),
                MAX_PASSWORD_LENGTH,
            )));
        }

        self.hash_secret(password)
    }

    /// Hash an arbitrary secret without the password length policy.
    pub(crate) fn hash_secret(&self, secret: &str) -> Result<String, AppError> {
        bcrypt::hash(secret, self.cost)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Compare a plaintext password with a stored hash.
    ///
    /// A mismatch is `Ok(false)`. A malformed hash is an error, never a
    /// silent `false`.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        bcrypt::verify(password, hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
    }
}
