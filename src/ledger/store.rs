//! Storage capability the ledger is built on.

use async_trait::async_trait;

use crate::error::AppError;

/// Opens ledger transactions.
///
/// Implementations are injected into [`RewardLedger`](super::RewardLedger)
/// and [`ReferralRedeemer`](super::ReferralRedeemer) at construction.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, AppError>;
}

/// One unit of ledger work.
///
/// Nothing is visible to other transactions until [`commit`] succeeds;
/// dropping the transaction discards every change made through it.
///
/// [`commit`]: LedgerTransaction::commit
#[async_trait]
pub trait LedgerTransaction: Send {
    async fn user_exists(&mut self, user_id: i32) -> Result<bool, AppError>;

    async fn referral_code_exists(&mut self, referral_code: &str) -> Result<bool, AppError>;

    /// Lock, until commit, the account `user_id` and every account holding
    /// `referral_code`, in ascending account id order.
    ///
    /// Must run before any other call that reads or writes those rows, so
    /// crossed redemptions (A redeems B's code while B redeems A's) queue
    /// instead of deadlocking.
    async fn lock_accounts(&mut self, user_id: i32, referral_code: &str) -> Result<(), AppError>;

    /// The account's own referral code. `None` if it has none or does not
    /// exist.
    async fn referral_code_of(&mut self, user_id: i32) -> Result<Option<String>, AppError>;

    /// Record that `user_id` redeemed `referral_code`. Returns `false` when
    /// that pair was already recorded.
    async fn record_redemption(&mut self, user_id: i32, referral_code: &str) -> Result<bool, AppError>;

    /// `score = score + points` for one account. Returns rows touched.
    async fn credit_user(&mut self, user_id: i32, points: u32) -> Result<u64, AppError>;

    /// `score = score + points` for every account holding `referral_code`.
    /// Returns rows touched.
    async fn credit_referral_owners(&mut self, referral_code: &str, points: u32) -> Result<u64, AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}
