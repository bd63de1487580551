/// Credential Check
///
/// Unknown e-mail and wrong password fail the same way so the login
/// endpoint does not reveal which accounts exist.

use sqlx::PgPool;

use crate::auth::password::PasswordVerifier;
use crate::error::{AppError, AuthError};
use crate::users::{find_by_email, UserAccount};

/// Verify an e-mail/password pair and return the owning account.
///
/// # Errors
/// - `AuthError::InvalidCredentials` for an unknown e-mail or wrong password
/// - `AuthError::AccountInactive` for a deactivated account, reported only
///   after the password matched
pub async fn verify_credentials(
    pool: &PgPool,
    verifier: &PasswordVerifier,
    email: &str,
    password: &str,
) -> Result<UserAccount, AppError> {
    let user = find_by_email(pool, email)
        .await?
        .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

    check_password(verifier, &user, password)?;

    Ok(user)
}

pub(crate) fn check_password(
    verifier: &PasswordVerifier,
    user: &UserAccount,
    password: &str,
) -> Result<(), AppError> {
    if !verifier.verify(password, &user.password_hash)? {
        return Err(AppError::Auth(AuthError::InvalidCredentials));
    }

    if !user.active {
        return Err(AppError::Auth(AuthError::AccountInactive));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn account(verifier: &PasswordVerifier, password: &str, active: bool) -> UserAccount {
        let now = Utc::now();
        UserAccount {
            id: 1,
            email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            password_hash: verifier.hash(password).unwrap(),
            active,
            score: 0,
            referral_code: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_matching_password() {
        let verifier = PasswordVerifier::new(4).unwrap();
        let user = account(&verifier, "correct horse", true);

        assert!(check_password(&verifier, &user, "correct horse").is_ok());
    }

    #[test]
    fn test_wrong_password_is_invalid_credentials() {
        let verifier = PasswordVerifier::new(4).unwrap();
        let user = account(&verifier, "correct horse", true);

        assert!(matches!(
            check_password(&verifier, &user, "battery staple"),
            Err(AppError::Auth(AuthError::InvalidCredentials))
        ));
    }

    #[test]
    fn test_inactive_account_only_after_password_matches() {
        let verifier = PasswordVerifier::new(4).unwrap();
        let user = account(&verifier, "correct horse", false);

        assert!(matches!(
            check_password(&verifier, &user, "battery staple"),
            Err(AppError::Auth(AuthError::InvalidCredentials))
        ));
        assert!(matches!(
            check_password(&verifier, &user, "correct horse"),
            Err(AppError::Auth(AuthError::AccountInactive))
        ));
    }
}
