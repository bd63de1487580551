/// Access Token Issuance and Validation
///
/// Access tokens are HS512-signed JWTs with `{sub, exp}` claims and a fixed
/// 15 minute lifetime. They are stateless: validity is signature + expiry.
/// The signing secret is always passed in by the caller.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::auth::claims::Claims;
use crate::auth::password::PasswordVerifier;
use crate::auth::refresh_token::generate_refresh_token;
use crate::error::{AppError, AuthError, ConfigError};

/// The only accepted signing algorithm.
pub const ACCESS_TOKEN_ALGORITHM: Algorithm = Algorithm::HS512;

/// Access token lifetime: 15 minutes.
pub const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;

/// Output of a successful issue call.
///
/// `refresh_token` goes to the client once; only `hashed_refresh_token` may
/// be persisted.
#[derive(Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub hashed_refresh_token: String,
}

impl std::fmt::Debug for IssuedTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedTokens")
            .field("access_token", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .field("hashed_refresh_token", &self.hashed_refresh_token)
            .finish()
    }
}

/// Produces an access token plus a refresh token and its hash.
///
/// Has no side effects: persisting the hash and delivering the tokens is
/// up to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenIssuer {
    verifier: PasswordVerifier,
}

impl TokenIssuer {
    pub fn new(verifier: PasswordVerifier) -> Self {
        Self { verifier }
    }

    pub fn issue(&self, user_id: i32, secret: &str) -> Result<IssuedTokens, AppError> {
        self.issue_at(user_id, secret, Utc::now().timestamp())
    }

    /// Issue tokens as if the current time were `now` (Unix seconds).
    pub fn issue_at(&self, user_id: i32, secret: &str, now: i64) -> Result<IssuedTokens, AppError> {
        self.issue_with_rng(&mut OsRng, user_id, secret, now)
    }

    pub(crate) fn issue_with_rng<R: RngCore + ?Sized>(
        &self,
        rng: &mut R,
        user_id: i32,
        secret: &str,
        now: i64,
    ) -> Result<IssuedTokens, AppError> {
        let access_token = generate_access_token(user_id, secret, now)?;
        let (refresh_token, hashed_refresh_token) = generate_refresh_token(rng, &self.verifier)?;

        Ok(IssuedTokens {
            access_token,
            refresh_token,
            hashed_refresh_token,
        })
    }
}

/// Sign an access token for `user_id` expiring 15 minutes after `now`.
///
/// # Errors
/// `ConfigError::MissingRequired` when the secret is empty.
pub fn generate_access_token(user_id: i32, secret: &str, now: i64) -> Result<String, AppError> {
    if secret.is_empty() {
        return Err(AppError::Config(ConfigError::MissingRequired(
            "jwt.secret".to_string(),
        )));
    }

    let claims = Claims::new(user_id, now + ACCESS_TOKEN_TTL_SECS);

    encode(
        &Header::new(ACCESS_TOKEN_ALGORITHM),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate an access token and return its subject id.
pub fn validate_access_token(token: &str, secret: &str) -> Result<i32, AppError> {
    validate_access_token_at(token, secret, Utc::now().timestamp())
}

/// Validate an access token against the clock value `now`.
///
/// Parsing, algorithm pinning and signature checks are delegated to
/// `jsonwebtoken`; expiry is checked here with no leeway. Library
/// diagnostics are logged at debug level and never returned.
pub fn validate_access_token_at(token: &str, secret: &str, now: i64) -> Result<i32, AppError> {
    if secret.is_empty() {
        return Err(AppError::Config(ConfigError::MissingRequired(
            "jwt.secret".to_string(),
        )));
    }

    let mut validation = Validation::new(ACCESS_TOKEN_ALGORITHM);
    validation.validate_exp = false;
    validation.set_required_spec_claims(&["exp"]);

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!(error = %e, "Access token rejected");
        AppError::Auth(AuthError::TokenInvalid)
    })?;

    if claims.is_expired_at(now) {
        return Err(AppError::Auth(AuthError::TokenExpired));
    }

    Ok(claims.subject_id()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(PasswordVerifier::new(4).unwrap())
    }

    fn assert_auth_error(result: Result<i32, AppError>, expected: AuthError) {
        match result {
            Err(AppError::Auth(e)) => assert_eq!(e, expected),
            other => panic!("expected {:?}, got {:?}", expected, other),
        }
    }

    struct FailingRng;

    impl RngCore for FailingRng {
        fn next_u32(&mut self) -> u32 {
            unreachable!()
        }
        fn next_u64(&mut self) -> u64 {
            unreachable!()
        }
        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            unreachable!()
        }
        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new("entropy source exhausted"))
        }
    }

    #[test]
    fn test_generate_and_validate_token() {
        let now = Utc::now().timestamp();
        let tokens = issuer().issue_at(42, SECRET, now).expect("Failed to issue tokens");

        let subject = validate_access_token_at(&tokens.access_token, SECRET, now).unwrap();
        assert_eq!(subject, 42);
    }

    #[test]
    fn test_validate_against_wall_clock() {
        let tokens = issuer().issue(7, SECRET).unwrap();
        assert_eq!(validate_access_token(&tokens.access_token, SECRET).unwrap(), 7);
    }

    #[test]
    fn test_token_header_is_hs512() {
        let token = generate_access_token(1, SECRET, 0).unwrap();
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS512);
    }

    #[test]
    fn test_valid_at_fourteen_minutes_expired_at_sixteen() {
        let now = 1_700_000_000;
        let token = generate_access_token(5, SECRET, now).unwrap();

        assert_eq!(validate_access_token_at(&token, SECRET, now + 14 * 60).unwrap(), 5);
        assert_auth_error(
            validate_access_token_at(&token, SECRET, now + 16 * 60),
            AuthError::TokenExpired,
        );
    }

    #[test]
    fn test_expired_exactly_at_exp() {
        let now = 1_700_000_000;
        let token = generate_access_token(5, SECRET, now).unwrap();

        assert_auth_error(
            validate_access_token_at(&token, SECRET, now + ACCESS_TOKEN_TTL_SECS),
            AuthError::TokenExpired,
        );
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let now = Utc::now().timestamp();
        let token = generate_access_token(5, SECRET, now).unwrap();

        assert_auth_error(
            validate_access_token_at(&token, "another-secret-of-reasonable-length", now),
            AuthError::TokenInvalid,
        );
    }

    #[test]
    fn test_other_hmac_algorithm_is_rejected() {
        let now = Utc::now().timestamp();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Claims::new(5, now + 600),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_auth_error(validate_access_token_at(&token, SECRET, now), AuthError::TokenInvalid);
    }

    #[test]
    fn test_alg_none_is_rejected() {
        let now = Utc::now().timestamp();
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":5,"exp":{}}}"#, now + 600));

        for token in [format!("{}.{}.", header, payload), format!("{}.{}", header, payload)] {
            assert_auth_error(validate_access_token_at(&token, SECRET, now), AuthError::TokenInvalid);
        }
    }

    #[test]
    fn test_tampered_token() {
        let now = Utc::now().timestamp();
        let token = generate_access_token(5, SECRET, now).unwrap();

        let forged_payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":6,"exp":{}}}"#, now + 600));
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = &forged_payload;
        let forged = parts.join(".");

        assert_auth_error(validate_access_token_at(&forged, SECRET, now), AuthError::TokenInvalid);
    }

    #[test]
    fn test_forged_token_is_rejected_even_when_expired() {
        let now = 1_700_000_000;
        let token = generate_access_token(5, "some-other-secret-value-here", now).unwrap();

        assert_auth_error(
            validate_access_token_at(&token, SECRET, now + 3600),
            AuthError::TokenInvalid,
        );
    }

    #[test]
    fn test_garbage_token() {
        assert_auth_error(
            validate_access_token_at("invalid.token.here", SECRET, 0),
            AuthError::TokenInvalid,
        );
    }

    #[test]
    fn test_empty_secret_is_refused() {
        assert!(matches!(
            issuer().issue_at(1, "", 0),
            Err(AppError::Config(ConfigError::MissingRequired(_)))
        ));
        assert!(matches!(
            validate_access_token_at("a.b.c", "", 0),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_random_source_failure_is_transient() {
        let result = issuer().issue_with_rng(&mut FailingRng, 1, SECRET, 0);

        match result {
            Err(e) => assert!(e.is_transient(), "unexpected error {:?}", e),
            Ok(_) => panic!("issue must fail when the random source fails"),
        }
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let tokens = issuer().issue_at(1, SECRET, 0).unwrap();
        let printed = format!("{:?}", tokens);

        assert!(!printed.contains(&tokens.refresh_token));
        assert!(!printed.contains(&tokens.access_token));
    }
}
