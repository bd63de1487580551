//! In-process ledger store.
//!
//! Holds accounts behind one async mutex. A transaction keeps the lock and
//! works on a staged copy that replaces the shared state on commit, so an
//! abandoned transaction leaves no trace.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::store::{LedgerStore, LedgerTransaction};
use crate::error::AppError;

#[derive(Debug, Clone, Default)]
struct Account {
    referral_code: Option<String>,
    score: i64,
}

#[derive(Debug, Clone, Default)]
struct LedgerState {
    accounts: HashMap<i32, Account>,
    redemptions: HashSet<(i32, String)>,
}

#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_account(&self, user_id: i32, referral_code: Option<&str>, score: i64) {
        self.state.lock().await.accounts.insert(
            user_id,
            Account {
                referral_code: referral_code.map(str::to_string),
                score,
            },
        );
    }

    pub async fn balance(&self, user_id: i32) -> Option<i64> {
        self.state
            .lock()
            .await
            .accounts
            .get(&user_id)
            .map(|account| account.score)
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, AppError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, staged }))
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<LedgerState>,
    staged: LedgerState,
}

#[async_trait]
impl LedgerTransaction for MemoryTransaction {
    async fn user_exists(&mut self, user_id: i32) -> Result<bool, AppError> {
        Ok(self.staged.accounts.contains_key(&user_id))
    }

    async fn referral_code_exists(&mut self, referral_code: &str) -> Result<bool, AppError> {
        Ok(self
            .staged
            .accounts
            .values()
            .any(|account| account.referral_code.as_deref() == Some(referral_code)))
    }

    async fn lock_accounts(&mut self, _user_id: i32, _referral_code: &str) -> Result<(), AppError> {
        // The transaction already holds the whole store
        Ok(())
    }

    async fn referral_code_of(&mut self, user_id: i32) -> Result<Option<String>, AppError> {
        Ok(self
            .staged
            .accounts
            .get(&user_id)
            .and_then(|account| account.referral_code.clone()))
    }

    async fn record_redemption(&mut self, user_id: i32, referral_code: &str) -> Result<bool, AppError> {
        Ok(self
            .staged
            .redemptions
            .insert((user_id, referral_code.to_string())))
    }

    async fn credit_user(&mut self, user_id: i32, points: u32) -> Result<u64, AppError> {
        match self.staged.accounts.get_mut(&user_id) {
            Some(account) => {
                account.score += i64::from(points);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn credit_referral_owners(&mut self, referral_code: &str, points: u32) -> Result<u64, AppError> {
        let mut touched = 0;
        for account in self.staged.accounts.values_mut() {
            if account.referral_code.as_deref() == Some(referral_code) {
                account.score += i64::from(points);
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let MemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

/// Store wrapper whose transactions fail every `credit_user` call, for
/// exercising rollback paths.
#[cfg(test)]
pub(crate) struct FailingCreditStore<S>(pub S);

#[cfg(test)]
#[async_trait]
impl<S: LedgerStore> LedgerStore for FailingCreditStore<S> {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, AppError> {
        let inner = self.0.begin().await?;
        Ok(Box::new(FailingCreditTransaction { inner }))
    }
}

#[cfg(test)]
struct FailingCreditTransaction {
    inner: Box<dyn LedgerTransaction>,
}

#[cfg(test)]
#[async_trait]
impl LedgerTransaction for FailingCreditTransaction {
    async fn user_exists(&mut self, user_id: i32) -> Result<bool, AppError> {
        self.inner.user_exists(user_id).await
    }

    async fn referral_code_exists(&mut self, referral_code: &str) -> Result<bool, AppError> {
        self.inner.referral_code_exists(referral_code).await
    }

    async fn lock_accounts(&mut self, user_id: i32, referral_code: &str) -> Result<(), AppError> {
        self.inner.lock_accounts(user_id, referral_code).await
    }

    async fn referral_code_of(&mut self, user_id: i32) -> Result<Option<String>, AppError> {
        self.inner.referral_code_of(user_id).await
    }

    async fn record_redemption(&mut self, user_id: i32, referral_code: &str) -> Result<bool, AppError> {
        self.inner.record_redemption(user_id, referral_code).await
    }

    async fn credit_user(&mut self, _user_id: i32, _points: u32) -> Result<u64, AppError> {
        Err(AppError::Database(crate::error::DatabaseError::QueryExecution(
            "credit rejected".to_string(),
        )))
    }

    async fn credit_referral_owners(&mut self, referral_code: &str, points: u32) -> Result<u64, AppError> {
        self.inner.credit_referral_owners(referral_code, points).await
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.inner.commit().await
    }
}
