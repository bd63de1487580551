//! Account rows and the plain queries over them.
//!
//! Points are never written from here; balances only change through
//! [`crate::ledger`].

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::Serialize;
use sqlx::PgPool;

use crate::database::with_timeout;
use crate::error::{AppError, LedgerError};

const REFERRAL_CODE_LENGTH: usize = 8;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserAccount {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub active: bool,
    pub score: i64,
    pub referral_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated registration data; `password_hash` is already hashed.
#[derive(Debug)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub referral_code: String,
}

/// Leaderboard row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LeaderboardEntry {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub score: i64,
    pub referral_code: Option<String>,
}

const USER_COLUMNS: &str = "id, email, first_name, last_name, password_hash, active, score, \
                            referral_code, created_at, updated_at";

/// Random referral code for accounts that did not choose one.
pub fn generate_referral_code() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFERRAL_CODE_LENGTH)
        .map(char::from)
        .collect()
}

/// Insert a new account with a zero balance, returning its id.
pub async fn insert_user(pool: &PgPool, user: &NewUser) -> Result<i32, AppError> {
    let now = Utc::now();
    let id = with_timeout(
        sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO users
                (email, first_name, last_name, password_hash, active, score, referral_code, created_at, updated_at)
            VALUES ($1, $2, $3, $4, TRUE, 0, $5, $6, $6)
            RETURNING id
            "#,
        )
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(&user.referral_code)
        .bind(now)
        .fetch_one(pool),
    )
    .await?;

    Ok(id)
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<UserAccount>, AppError> {
    let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
    let user = with_timeout(
        sqlx::query_as::<_, UserAccount>(&query)
            .bind(email)
            .fetch_optional(pool),
    )
    .await?;

    Ok(user)
}

/// # Errors
/// `LedgerError::UserNotFound` when no account has this id.
pub async fn get_user(pool: &PgPool, id: i32) -> Result<UserAccount, AppError> {
    let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
    with_timeout(
        sqlx::query_as::<_, UserAccount>(&query)
            .bind(id)
            .fetch_optional(pool),
    )
    .await?
    .ok_or(AppError::Ledger(LedgerError::UserNotFound))
}

/// All accounts, highest score first.
pub async fn leaderboard(pool: &PgPool) -> Result<Vec<LeaderboardEntry>, AppError> {
    let entries = with_timeout(
        sqlx::query_as::<_, LeaderboardEntry>(
            r#"
            SELECT id, first_name, last_name, score, referral_code
            FROM users
            ORDER BY score DESC, id ASC
            "#,
        )
        .fetch_all(pool),
    )
    .await?;

    Ok(entries)
}

/// # Errors
/// `LedgerError::UserNotFound` when no account has this id.
pub async fn delete_user(pool: &PgPool, id: i32) -> Result<(), AppError> {
    let result = with_timeout(
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool),
    )
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Ledger(LedgerError::UserNotFound));
    }

    Ok(())
}
