/// Refresh Token Management
///
/// Refresh tokens are:
/// - 32 bytes from the OS random source, base64-encoded for transport
/// - Hashed with bcrypt (same comparator as passwords); the bcrypt string is
///   itself base64-encoded as the stored `hashed_refresh_token`
/// - Stored one per account; login replaces the old one, refresh swaps it
///   only if the presented token's hash is still current (rotation)
/// - Never stored or logged in plaintext

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{Duration, Utc};
use rand::RngCore;
use sqlx::PgPool;

use crate::auth::password::PasswordVerifier;
use crate::database::with_timeout;
use crate::error::{AppError, AuthError};

/// Number of random bytes in a refresh token.
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Generate a refresh token and its storable hash.
///
/// A random source failure aborts the whole call with a transient error;
/// nothing partial is returned.
pub fn generate_refresh_token<R: RngCore + ?Sized>(
    rng: &mut R,
    verifier: &PasswordVerifier,
) -> Result<(String, String), AppError> {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rng.try_fill_bytes(&mut bytes)
        .map_err(|e| AppError::Transient(format!("random source unavailable: {}", e)))?;

    let token = STANDARD.encode(bytes);
    let hashed = verifier.hash_secret(&token)?;

    Ok((token, STANDARD.encode(hashed)))
}

/// Compare a presented refresh token with its stored hash.
///
/// # Errors
/// `AuthError::InvalidRefreshToken` for a mismatch or an undecodable hash.
pub fn validate_refresh_token(hashed_refresh_token: &str, presented: &str) -> Result<(), AppError> {
    let decoded = STANDARD
        .decode(hashed_refresh_token)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or(AppError::Auth(AuthError::InvalidRefreshToken))?;

    match bcrypt::verify(presented, &decoded) {
        Ok(true) => Ok(()),
        Ok(false) => Err(AppError::Auth(AuthError::InvalidRefreshToken)),
        Err(e) => {
            tracing::warn!(error = %e, "Stored refresh token hash is malformed");
            Err(AppError::Auth(AuthError::InvalidRefreshToken))
        }
    }
}

/// Store the hash of a user's refresh token, replacing any previous one.
pub async fn save_refresh_token(
    pool: &PgPool,
    user_id: i32,
    hashed_refresh_token: &str,
    expiry_seconds: i64,
) -> Result<(), AppError> {
    let now = Utc::now();
    let expires_at = now + Duration::seconds(expiry_seconds);

    with_timeout(
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id)
            DO UPDATE SET token_hash = EXCLUDED.token_hash,
                          expires_at = EXCLUDED.expires_at,
                          created_at = EXCLUDED.created_at
            "#,
        )
        .bind(user_id)
        .bind(hashed_refresh_token)
        .bind(expires_at)
        .bind(now)
        .execute(pool),
    )
    .await?;

    Ok(())
}

/// Replace a user's refresh-token hash only if `current_hash` is still the
/// live one.
///
/// Returns `false` when the hash was already rotated, revoked or expired;
/// of two concurrent refreshes presenting the same token, at most one swaps.
pub async fn rotate_refresh_token(
    pool: &PgPool,
    user_id: i32,
    current_hash: &str,
    new_hash: &str,
    expiry_seconds: i64,
) -> Result<bool, AppError> {
    let now = Utc::now();
    let expires_at = now + Duration::seconds(expiry_seconds);

    let result = with_timeout(
        sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET token_hash = $1, expires_at = $2, created_at = $3
            WHERE user_id = $4 AND token_hash = $5 AND expires_at > $3
            "#,
        )
        .bind(new_hash)
        .bind(expires_at)
        .bind(now)
        .bind(user_id)
        .bind(current_hash)
        .execute(pool),
    )
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Fetch the stored, unexpired refresh-token hash for a user.
pub async fn find_refresh_token_hash(pool: &PgPool, user_id: i32) -> Result<Option<String>, AppError> {
    let hash = with_timeout(
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT token_hash
            FROM refresh_tokens
            WHERE user_id = $1 AND expires_at > $2
            "#,
        )
        .bind(user_id)
        .bind(Utc::now())
        .fetch_optional(pool),
    )
    .await?;

    Ok(hash)
}

/// Forget a user's refresh token (logout).
pub async fn revoke_refresh_token(pool: &PgPool, user_id: i32) -> Result<(), AppError> {
    with_timeout(
        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(pool),
    )
    .await?;

    tracing::info!(user_id = user_id, "Refresh token revoked");
    Ok(())
}
