/// Points Ledger
///
/// The only write path for account balances. Every credit checks that the
/// account exists and applies a relative increment inside a store
/// transaction.

mod memory;
mod postgres;
mod referral;
mod store;

use std::sync::Arc;

pub use memory::InMemoryLedgerStore;
pub use postgres::PgLedgerStore;
pub use referral::{ReferralRedeemer, REDEEMER_REWARD, REFERRER_REWARD};
pub use store::{LedgerStore, LedgerTransaction};

use crate::error::{AppError, LedgerError};

#[derive(Clone)]
pub struct RewardLedger {
    store: Arc<dyn LedgerStore>,
}

impl RewardLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Add `points` to an account's balance.
    ///
    /// # Errors
    /// `LedgerError::UserNotFound` if the account does not exist; no row is
    /// ever created implicitly.
    pub async fn add_points(&self, user_id: i32, points: u32) -> Result<(), AppError> {
        let mut tx = self.store.begin().await?;

        if !tx.user_exists(user_id).await? {
            tracing::warn!(user_id = user_id, "Cannot add points, user does not exist");
            return Err(AppError::Ledger(LedgerError::UserNotFound));
        }

        credit(tx.as_mut(), user_id, points).await?;
        tx.commit().await?;

        tracing::info!(user_id = user_id, points = points, "Points added");
        Ok(())
    }

    pub(crate) fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }
}

/// Relative increment of one account; zero rows touched means it vanished.
pub(crate) async fn credit(
    tx: &mut dyn LedgerTransaction,
    user_id: i32,
    points: u32,
) -> Result<(), AppError> {
    if tx.credit_user(user_id, points).await? == 0 {
        return Err(AppError::Ledger(LedgerError::UserNotFound));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::memory::FailingCreditStore;

    async fn ledger_with(accounts: &[(i32, Option<&str>, i64)]) -> (RewardLedger, InMemoryLedgerStore) {
        let store = InMemoryLedgerStore::new();
        for (id, code, score) in accounts {
            store.insert_account(*id, *code, *score).await;
        }
        (RewardLedger::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_add_points() {
        let (ledger, store) = ledger_with(&[(1, None, 10)]).await;

        ledger.add_points(1, 50).await.unwrap();
        ledger.add_points(1, 75).await.unwrap();

        assert_eq!(store.balance(1).await, Some(135));
    }

    #[tokio::test]
    async fn test_add_zero_points_still_requires_user() {
        let (ledger, store) = ledger_with(&[(1, None, 0)]).await;

        ledger.add_points(1, 0).await.unwrap();
        assert_eq!(store.balance(1).await, Some(0));

        assert!(matches!(
            ledger.add_points(2, 0).await,
            Err(AppError::Ledger(LedgerError::UserNotFound))
        ));
    }

    #[tokio::test]
    async fn test_missing_user_is_not_created() {
        let (ledger, store) = ledger_with(&[]).await;

        let result = ledger.add_points(99, 100).await;

        assert!(matches!(result, Err(AppError::Ledger(LedgerError::UserNotFound))));
        assert_eq!(store.balance(99).await, None);
    }

    #[tokio::test]
    async fn test_failed_credit_leaves_balance_untouched() {
        let (_, store) = ledger_with(&[(1, None, 40)]).await;
        let failing = RewardLedger::new(Arc::new(FailingCreditStore(store.clone())));

        assert!(failing.add_points(1, 10).await.is_err());
        assert_eq!(store.balance(1).await, Some(40));
    }
}
