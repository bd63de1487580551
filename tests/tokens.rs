//! Token lifecycle through the public API. No database needed.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;

use reward_service::auth::{
    generate_access_token, validate_access_token, validate_access_token_at, validate_refresh_token,
    PasswordVerifier, TokenIssuer, REFRESH_TOKEN_BYTES,
};
use reward_service::error::{AppError, AuthError, ValidationError};

const SECRET: &str = "integration-test-secret";
const MINUTE: i64 = 60;

fn issuer() -> TokenIssuer {
    TokenIssuer::new(PasswordVerifier::new(4).expect("cost 4 is valid"))
}

#[test]
fn issued_access_token_lives_fifteen_minutes() {
    let now = Utc::now().timestamp();
    let tokens = issuer().issue_at(7, SECRET, now).expect("issue");

    assert_eq!(
        validate_access_token_at(&tokens.access_token, SECRET, now + 14 * MINUTE).unwrap(),
        7
    );
    assert!(matches!(
        validate_access_token_at(&tokens.access_token, SECRET, now + 16 * MINUTE),
        Err(AppError::Auth(AuthError::TokenExpired))
    ));
}

#[test]
fn fresh_token_validates_against_the_wall_clock() {
    let tokens = issuer().issue(42, SECRET).expect("issue");

    assert_eq!(validate_access_token(&tokens.access_token, SECRET).unwrap(), 42);
}

#[test]
fn token_from_another_secret_is_rejected() {
    let now = Utc::now().timestamp();
    let token = generate_access_token(1, "some-other-secret", now).unwrap();

    assert!(matches!(
        validate_access_token_at(&token, SECRET, now),
        Err(AppError::Auth(AuthError::TokenInvalid))
    ));
}

#[test]
fn refresh_token_matches_only_its_own_hash() {
    let issuer = issuer();
    let first = issuer.issue(1, SECRET).unwrap();
    let second = issuer.issue(1, SECRET).unwrap();

    assert_ne!(first.refresh_token, second.refresh_token);
    assert!(validate_refresh_token(&first.hashed_refresh_token, &first.refresh_token).is_ok());
    assert!(matches!(
        validate_refresh_token(&first.hashed_refresh_token, &second.refresh_token),
        Err(AppError::Auth(AuthError::InvalidRefreshToken))
    ));
}

#[test]
fn refresh_token_is_base64_of_32_random_bytes() {
    let tokens = issuer().issue(1, SECRET).unwrap();

    let raw = STANDARD.decode(&tokens.refresh_token).unwrap();
    assert_eq!(raw.len(), REFRESH_TOKEN_BYTES);
    assert!(!tokens.hashed_refresh_token.contains(&tokens.refresh_token));
}

#[test]
fn empty_secret_never_signs() {
    let result = issuer().issue(1, "");

    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn short_password_is_rejected_before_hashing() {
    let verifier = PasswordVerifier::new(4).unwrap();

    match verifier.hash("1234567") {
        Err(AppError::Validation(ValidationError::TooShort(field, min))) => {
            assert_eq!(field, "password");
            assert_eq!(min, 8);
        }
        other => panic!("expected TooShort, got {:?}", other),
    }

    let hash = verifier.hash("12345678").unwrap();
    assert!(verifier.verify("12345678", &hash).unwrap());
    assert!(!verifier.verify("12345679", &hash).unwrap());
}
