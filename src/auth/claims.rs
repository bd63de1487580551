/// JWT Claims structure
///
/// Access tokens carry exactly two claims: the subject (account id) and the
/// expiry. The subject is a JSON number, so it is read back as `f64` and
/// narrowed to an integer id.

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject (account id)
    pub sub: f64,
    /// Expiration time (Unix timestamp, seconds)
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: i32, expires_at: i64) -> Self {
        Self {
            sub: f64::from(user_id),
            exp: expires_at,
        }
    }

    /// Convert the numeric subject claim back to an account id.
    ///
    /// # Errors
    /// `AuthError::TokenInvalid` if the claim is not a whole, positive number
    /// that fits an account id.
    pub fn subject_id(&self) -> Result<i32, AuthError> {
        let sub = self.sub;
        if !sub.is_finite() || sub.fract() != 0.0 || sub < 1.0 || sub > f64::from(i32::MAX) {
            return Err(AuthError::TokenInvalid);
        }
        Ok(sub as i32)
    }

    /// Expired once `now` reaches `exp`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}
