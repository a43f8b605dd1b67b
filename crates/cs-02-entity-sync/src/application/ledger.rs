//! Ledger entry points for collaborators.
//!
//! Every balance change is one appended transaction; the balance and the
//! transaction are persisted by the same write.

use shared_types::{Ledger, LedgerPatch, SyncError, ValidationError};

use super::synchronizer::EntitySynchronizer;
use crate::ports::EntitySyncApi;

pub type LedgerSynchronizer = EntitySynchronizer<Ledger>;

impl EntitySynchronizer<Ledger> {
    /// Credit `amount` coins.
    pub async fn earn(&self, amount: i64, reason: &str) -> Result<Ledger, SyncError> {
        if amount <= 0 {
            return Err(ValidationError::NonPositiveAmount(amount).into());
        }
        let reason = reason.to_string();
        self.mutate_with("earn", move |ledger| {
            if ledger.balance_after(amount).is_none() {
                return Err(ValidationError::AmountOutOfRange {
                    balance: ledger.balance,
                    amount,
                }
                .into());
            }
            Ok(LedgerPatch::single(amount, reason))
        })
        .await
    }

    /// Debit `amount` coins. Rejected before the store when the balance
    /// does not cover it.
    pub async fn spend(&self, amount: i64, reason: &str) -> Result<Ledger, SyncError> {
        if amount <= 0 {
            return Err(ValidationError::NonPositiveAmount(amount).into());
        }
        let reason = reason.to_string();
        self.mutate_with("spend", move |ledger| {
            if ledger.balance < amount {
                return Err(ValidationError::InsufficientFunds {
                    balance: ledger.balance,
                    requested: amount,
                }
                .into());
            }
            Ok(LedgerPatch::single(-amount, reason))
        })
        .await
    }

    /// Balance of the loaded ledger.
    #[must_use]
    pub fn balance(&self) -> Option<i64> {
        self.view().value.map(|ledger| ledger.balance)
    }
}
