//! Postgres-backed ledger store.
//!
//! Every balance change is a relative `score = score + $n` update, so
//! concurrent credits to one row serialize on the row lock instead of
//! overwriting each other. Redemptions lock both accounts up front in
//! ascending id order before touching either.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};

use super::store::{LedgerStore, LedgerTransaction};
use crate::database::with_timeout;
use crate::error::AppError;

#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, AppError> {
        let tx = with_timeout(self.pool.begin()).await?;
        Ok(Box::new(PgLedgerTransaction { tx }))
    }
}

struct PgLedgerTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTransaction for PgLedgerTransaction {
    async fn user_exists(&mut self, user_id: i32) -> Result<bool, AppError> {
        with_timeout(
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(user_id)
                .fetch_one(&mut *self.tx),
        )
        .await
    }

    async fn referral_code_exists(&mut self, referral_code: &str) -> Result<bool, AppError> {
        with_timeout(
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM users WHERE referral_code = $1)",
            )
            .bind(referral_code)
            .fetch_one(&mut *self.tx),
        )
        .await
    }

    async fn lock_accounts(&mut self, user_id: i32, referral_code: &str) -> Result<(), AppError> {
        with_timeout(
            sqlx::query_scalar::<_, i32>(
                r#"
                SELECT id FROM users
                WHERE id = $1 OR referral_code = $2
                ORDER BY id
                FOR UPDATE
                "#,
            )
            .bind(user_id)
            .bind(referral_code)
            .fetch_all(&mut *self.tx),
        )
        .await?;

        Ok(())
    }

    async fn referral_code_of(&mut self, user_id: i32) -> Result<Option<String>, AppError> {
        let code = with_timeout(
            sqlx::query_scalar::<_, Option<String>>("SELECT referral_code FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&mut *self.tx),
        )
        .await?;

        Ok(code.flatten())
    }

    async fn record_redemption(&mut self, user_id: i32, referral_code: &str) -> Result<bool, AppError> {
        let result = with_timeout(
            sqlx::query(
                r#"
                INSERT INTO referral_redemptions (user_id, referral_code, redeemed_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_id, referral_code) DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(referral_code)
            .bind(Utc::now())
            .execute(&mut *self.tx),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn credit_user(&mut self, user_id: i32, points: u32) -> Result<u64, AppError> {
        let result = with_timeout(
            sqlx::query("UPDATE users SET score = score + $1, updated_at = $2 WHERE id = $3")
                .bind(i64::from(points))
                .bind(Utc::now())
                .bind(user_id)
                .execute(&mut *self.tx),
        )
        .await?;

        Ok(result.rows_affected())
    }

    async fn credit_referral_owners(&mut self, referral_code: &str, points: u32) -> Result<u64, AppError> {
        let result = with_timeout(
            sqlx::query(
                "UPDATE users SET score = score + $1, updated_at = $2 WHERE referral_code = $3",
            )
            .bind(i64::from(points))
            .bind(Utc::now())
            .bind(referral_code)
            .execute(&mut *self.tx),
        )
        .await?;

        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let PgLedgerTransaction { tx } = *self;
        with_timeout(tx.commit()).await
    }
}
