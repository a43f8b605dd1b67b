//! # Error Types
//!
//! Error taxonomy shared by the store port, the synchronizers and the
//! session manager.
//!
//! | Kind | Handling |
//! |------|----------|
//! | `TransientNetwork` | retried with backoff |
//! | `NotFound` | normal absent outcome, never surfaced |
//! | `Unauthorized` | fatal for the operation, triggers sign-out |
//! | `Conflict` | surfaced for manual resolution |
//! | `Validation` | rejected before reaching the store |

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::{EntityKind, OwnerId};

/// Errors returned by the persistent store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No row for this (kind, owner).
    #[error("Not found: {kind} for owner {owner}")]
    NotFound { kind: EntityKind, owner: OwnerId },

    /// Row-level authorization rejected the call.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Write collided with existing state (e.g. duplicate insert).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Network failure or timeout. Safe to retry.
    #[error("Transient network failure: {0}")]
    TransientNetwork(String),
}

impl StoreError {
    /// Whether a retry may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::TransientNetwork(_))
    }
}

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    TransientNetwork,
    NotFound,
    Unauthorized,
    Conflict,
    Validation,
    /// The owning identity changed or the synchronizer was detached while
    /// the operation was in flight.
    Cancelled,
}

impl ErrorKind {
    /// Whether the UI may retry automatically.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::TransientNetwork)
    }

    /// Metric label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TransientNetwork => "transient_network",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Validation => "validation",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

/// Field-level validation failures. Never reach the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid {field}: {reason}")]
    Field { field: &'static str, reason: String },

    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: i64, requested: i64 },

    #[error("Ledger inconsistent: balance {balance} != transaction sum {sum}")]
    InconsistentLedger { balance: i64, sum: i64 },

    #[error("Amount {amount} is out of range for balance {balance}")]
    AmountOutOfRange { balance: i64, amount: i64 },

    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(i64),

    #[error("Patch for {actual} applied to {expected}")]
    KindMismatch {
        expected: EntityKind,
        actual: EntityKind,
    },

    #[error("No {0} loaded")]
    NothingLoaded(EntityKind),

    #[error("Owner mismatch: record belongs to {record}, session is {session}")]
    OwnerMismatch { record: OwnerId, session: OwnerId },
}

impl ValidationError {
    /// Shorthand for a field error.
    pub fn field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Field {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by synchronizer and session operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("{operation}: transient network failure ({detail})")]
    TransientNetwork { operation: String, detail: String },

    #[error("{operation}: unauthorized ({detail})")]
    Unauthorized { operation: String, detail: String },

    #[error("{operation}: conflict ({detail})")]
    Conflict { operation: String, detail: String },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{operation}: cancelled because the owning identity changed")]
    Cancelled { operation: String },
}

impl SyncError {
    /// Translate a store error for a named operation.
    ///
    /// `NotFound` on a write means the row vanished underneath us, which is
    /// a conflict from the caller's point of view.
    pub fn from_store(operation: &str, err: StoreError) -> Self {
        let operation = operation.to_string();
        match err {
            StoreError::TransientNetwork(detail) => SyncError::TransientNetwork { operation, detail },
            StoreError::Unauthorized(detail) => SyncError::Unauthorized { operation, detail },
            StoreError::Conflict(detail) => SyncError::Conflict { operation, detail },
            StoreError::NotFound { kind, owner } => SyncError::Conflict {
                operation,
                detail: format!("{kind} for {owner} no longer exists"),
            },
        }
    }

    /// Cancellation for a named operation.
    pub fn cancelled(operation: &str) -> Self {
        SyncError::Cancelled {
            operation: operation.to_string(),
        }
    }

    /// Machine-readable category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::TransientNetwork { .. } => ErrorKind::TransientNetwork,
            SyncError::Unauthorized { .. } => ErrorKind::Unauthorized,
            SyncError::Conflict { .. } => ErrorKind::Conflict,
            SyncError::Validation(_) => ErrorKind::Validation,
            SyncError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            SyncError::TransientNetwork { .. } => {
                "We couldn't reach the server. Your change was undone; please try again.".into()
            }
            SyncError::Unauthorized { .. } => {
                "Your session has expired. Please sign in again.".into()
            }
            SyncError::Conflict { .. } => {
                "This was changed somewhere else. Review the latest version and try again.".into()
            }
            SyncError::Validation(inner) => match inner {
                ValidationError::InsufficientFunds { balance, requested } => {
                    format!("Not enough coins: you have {balance}, this costs {requested}.")
                }
                ValidationError::AmountOutOfRange { amount, .. } => {
                    format!("{amount} coins is more than a wallet can hold.")
                }
                ValidationError::Field { field, reason } => format!("Please check {field}: {reason}."),
                other => format!("That change isn't allowed: {other}."),
            },
            SyncError::Cancelled { .. } => "You signed out before this finished.".into(),
        }
    }
}
