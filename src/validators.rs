/// Input validators for registration and referral requests
///
/// Each validator trims its input, enforces length bounds first (cheap,
/// and caps regex work on hostile input) and returns the normalised value.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const EMAIL_BOUNDS: (usize, usize) = (5, 254);
const EMAIL_LOCAL_PART_MAX: usize = 64;
const NAME_BOUNDS: (usize, usize) = (1, 100);
const REFERRAL_CODE_BOUNDS: (usize, usize) = (3, 32);

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[A-Za-z0-9._%+'-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$"
    )
    .unwrap();
    static ref REFERRAL_CODE_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

fn check_length(field: &str, value: &str, (min, max): (usize, usize)) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len == 0 {
        return Err(ValidationError::EmptyField(field.to_string()));
    }
    if len < min {
        return Err(ValidationError::TooShort(field.to_string(), min));
    }
    if len > max {
        return Err(ValidationError::TooLong(field.to_string(), max));
    }
    Ok(())
}

/// Returns the address trimmed and lowercased.
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim();
    check_length("email", email, EMAIL_BOUNDS)?;

    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    let local_part_len = email.split('@').next().map_or(0, str::len);
    if local_part_len > EMAIL_LOCAL_PART_MAX {
        return Err(ValidationError::TooLong("email".to_string(), EMAIL_LOCAL_PART_MAX));
    }

    Ok(email.to_lowercase())
}

/// First or last name; `field` names the input in the error.
pub fn is_valid_name(field: &str, name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    check_length(field, name, NAME_BOUNDS)?;

    if name.chars().any(char::is_control) {
        return Err(ValidationError::SuspiciousContent(field.to_string()));
    }

    Ok(name.to_string())
}

/// A referral code chosen at registration.
pub fn is_valid_referral_code(code: &str) -> Result<String, ValidationError> {
    let code = code.trim();
    check_length("referral_code", code, REFERRAL_CODE_BOUNDS)?;

    if !REFERRAL_CODE_REGEX.is_match(code) {
        return Err(ValidationError::InvalidFormat("referral_code".to_string()));
    }

    Ok(code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emails_are_normalised() {
        assert_eq!(is_valid_email("  Ada@Example.COM ").unwrap(), "ada@example.com");
        assert_eq!(is_valid_email("o'neil+tag@mail.co.uk").unwrap(), "o'neil+tag@mail.co.uk");
    }

    #[test]
    fn test_rejected_emails() {
        for bad in ["", "   ", "a@b", "no-at-sign.com", "ada@", "@example.com", "ada@@example.com", "ada@localhost"] {
            assert!(is_valid_email(bad).is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_email_length_limits() {
        let long_local = format!("{}@example.com", "a".repeat(65));
        assert_eq!(
            is_valid_email(&long_local),
            Err(ValidationError::TooLong("email".to_string(), 64))
        );

        let long_domain = format!("ada@{}.com", "a".repeat(250));
        assert_eq!(
            is_valid_email(&long_domain),
            Err(ValidationError::TooLong("email".to_string(), 254))
        );
    }

    #[test]
    fn test_names() {
        assert_eq!(is_valid_name("first_name", " Jean-Pierre ").unwrap(), "Jean-Pierre");
        assert_eq!(is_valid_name("last_name", "Łukasiewicz").unwrap(), "Łukasiewicz");

        assert_eq!(
            is_valid_name("first_name", "  "),
            Err(ValidationError::EmptyField("first_name".to_string()))
        );
        assert!(is_valid_name("last_name", &"é".repeat(101)).is_err());
        assert_eq!(
            is_valid_name("last_name", "Bob\u{0}"),
            Err(ValidationError::SuspiciousContent("last_name".to_string()))
        );
    }

    #[test]
    fn test_referral_codes() {
        assert_eq!(is_valid_referral_code(" ref-A ").unwrap(), "ref-A");
        assert!(is_valid_referral_code("abc_123").is_ok());

        assert_eq!(
            is_valid_referral_code("ab"),
            Err(ValidationError::TooShort("referral_code".to_string(), 3))
        );
        assert!(is_valid_referral_code(&"a".repeat(33)).is_err());
        assert!(is_valid_referral_code("ref A").is_err());
        assert!(is_valid_referral_code("ref';--").is_err());
    }
}
