//! Coin ledger: an append-only transaction log with a derived balance.
//!
//! The balance is never written on its own. Appending a transaction updates
//! the balance in the same operation, so `balance == Σ amount` holds for
//! every persisted row.

use serde::{Deserialize, Serialize};

use crate::entities::{Entity, EntityKind, EntityPatch, EntityRecord, OwnerId, ServerTimestamp};
use crate::errors::ValidationError;

/// One signed balance change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Positive for income, negative for spending.
    pub amount: i64,
    /// Free-form reason (`"minigame"`, `"shop:food"`...).
    pub category: String,
    /// Server timestamp assigned when the transaction was appended.
    pub timestamp: ServerTimestamp,
}

/// A transaction to append. The timestamp is assigned on append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub amount: i64,
    pub category: String,
}

impl NewTransaction {
    #[must_use]
    pub fn new(amount: i64, category: impl Into<String>) -> Self {
        Self {
            amount,
            category: category.into(),
        }
    }
}

/// The only ledger mutation: append transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerPatch {
    pub append: Vec<NewTransaction>,
}

impl LedgerPatch {
    /// Patch appending a single transaction.
    #[must_use]
    pub fn single(amount: i64, category: impl Into<String>) -> Self {
        Self {
            append: vec![NewTransaction::new(amount, category)],
        }
    }
}

/// The identity's coin ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub owner_id: OwnerId,
    pub balance: i64,
    pub transactions: Vec<LedgerTransaction>,
    pub updated_at: ServerTimestamp,
}

impl Ledger {
    /// Empty ledger with a zero balance.
    #[must_use]
    pub fn empty(owner_id: OwnerId) -> Self {
        Self {
            owner_id,
            balance: 0,
            transactions: Vec::new(),
            updated_at: 0,
        }
    }

    /// Ledger opened with a single starting grant.
    #[must_use]
    pub fn opening(owner_id: OwnerId, grant: i64, category: impl Into<String>) -> Self {
        let mut ledger = Self::empty(owner_id);
        ledger.apply_patch(&LedgerPatch::single(grant, category), 0);
        ledger
    }

    /// Signed sum of every transaction, `None` when it leaves `i64`.
    #[must_use]
    pub fn transaction_sum(&self) -> Option<i64> {
        self.transactions
            .iter()
            .try_fold(0i64, |sum, t| sum.checked_add(t.amount))
    }

    /// Balance after adding `amount`, `None` on overflow.
    #[must_use]
    pub fn balance_after(&self, amount: i64) -> Option<i64> {
        self.balance.checked_add(amount)
    }

    /// `balance` equals the signed sum of the log.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.transaction_sum() == Some(self.balance)
    }
}

impl Entity for Ledger {
    const KIND: EntityKind = EntityKind::Ledger;
    type Patch = LedgerPatch;

    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }

    fn updated_at(&self) -> ServerTimestamp {
        self.updated_at
    }

    fn apply_patch(&mut self, patch: &LedgerPatch, at: ServerTimestamp) {
        for tx in &patch.append {
            self.transactions.push(LedgerTransaction {
                amount: tx.amount,
                category: tx.category.clone(),
                timestamp: at,
            });
            // Saturates; an overflowing log fails `validate`.
            self.balance = self.balance.saturating_add(tx.amount);
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let Some(sum) = self.transaction_sum() else {
            return Err(ValidationError::AmountOutOfRange {
                balance: self.balance,
                amount: self.transactions.last().map_or(0, |t| t.amount),
            });
        };
        if sum != self.balance {
            return Err(ValidationError::InconsistentLedger {
                balance: self.balance,
                sum,
            });
        }
        if self.balance < 0 {
            let last = self.transactions.last().map_or(0, |t| t.amount);
            return Err(ValidationError::InsufficientFunds {
                balance: self.balance.saturating_sub(last),
                requested: last.saturating_neg(),
            });
        }
        if let Some(tx) = self.transactions.iter().find(|t| t.category.trim().is_empty()) {
            return Err(ValidationError::field(
                "category",
                format!("transaction of {} has a blank category", tx.amount),
            ));
        }
        Ok(())
    }

    fn into_record(self) -> EntityRecord {
        EntityRecord::Ledger(self)
    }

    fn from_record(record: EntityRecord) -> Option<Self> {
        match record {
            EntityRecord::Ledger(ledger) => Some(ledger),
            _ => None,
        }
    }

    fn wrap_patch(patch: LedgerPatch) -> EntityPatch {
        EntityPatch::Ledger(patch)
    }
}
