/// Referral Redemption
///
/// Pays the owner of a referral code and the account redeeming it, once per
/// (account, code) pair. All checks and both credits share one store
/// transaction: either both parties are paid or neither is.

use super::{credit, RewardLedger};
use crate::error::{AppError, LedgerError};

/// Paid to every account holding the redeemed code.
pub const REFERRER_REWARD: u32 = 100;
/// Paid to the account redeeming the code.
pub const REDEEMER_REWARD: u32 = 25;

#[derive(Clone)]
pub struct ReferralRedeemer {
    ledger: RewardLedger,
}

impl ReferralRedeemer {
    pub fn new(ledger: RewardLedger) -> Self {
        Self { ledger }
    }

    /// Redeem `referral_code` on behalf of `user_id`.
    ///
    /// Checks run in order and stop at the first failure:
    /// 1. the code belongs to some account (`ReferrerNotFound`)
    /// 2. the redeeming account exists (`UserNotFound`)
    /// 3. the code is not the account's own (`SelfRedemption`)
    /// 4. the account has not redeemed this code before (`AlreadyRedeemed`)
    ///
    /// Then the code's owners get [`REFERRER_REWARD`] and the redeeming
    /// account gets [`REDEEMER_REWARD`].
    pub async fn redeem(&self, user_id: i32, referral_code: &str) -> Result<(), AppError> {
        let mut tx = self.ledger.store().begin().await?;
        tx.lock_accounts(user_id, referral_code).await?;

        if !tx.referral_code_exists(referral_code).await? {
            tracing::warn!(user_id = user_id, referral_code = referral_code, "Referral code does not exist");
            return Err(AppError::Ledger(LedgerError::ReferrerNotFound));
        }

        if !tx.user_exists(user_id).await? {
            tracing::warn!(user_id = user_id, "Redeeming user does not exist");
            return Err(AppError::Ledger(LedgerError::UserNotFound));
        }

        if tx.referral_code_of(user_id).await?.as_deref() == Some(referral_code) {
            tracing::warn!(user_id = user_id, "User tried to redeem their own referral code");
            return Err(AppError::Ledger(LedgerError::SelfRedemption));
        }

        if !tx.record_redemption(user_id, referral_code).await? {
            tracing::warn!(user_id = user_id, referral_code = referral_code, "Referral code already redeemed");
            return Err(AppError::Ledger(LedgerError::AlreadyRedeemed));
        }

        if tx.credit_referral_owners(referral_code, REFERRER_REWARD).await? == 0 {
            return Err(AppError::Ledger(LedgerError::ReferrerNotFound));
        }
        credit(tx.as_mut(), user_id, REDEEMER_REWARD).await?;

        tx.commit().await?;

        tracing::info!(user_id = user_id, referral_code = referral_code, "Referral code redeemed");
        Ok(())
    }
}
