//! The module contains the errors the ledger engines can return.
//!
//! The taxonomy follows three families:
//!
//! - programming errors surfaced immediately and never retried
//!   ([`MissingId`], [`RuleNotLoaded`]);
//! - storage/transport failures ([`Database`], [`Remote`]) after which the
//!   offline engine has rolled back its transaction and the online engine has
//!   restored its in-memory snapshot;
//! - retryable staleness ([`SyncTimeout`]) and guarded business rules
//!   ([`NoEarlierOccurrence`]).
//!
//! [`MissingId`]: LedgerError::MissingId
//! [`RuleNotLoaded`]: LedgerError::RuleNotLoaded
//! [`Database`]: LedgerError::Database
//! [`Remote`]: LedgerError::Remote
//! [`SyncTimeout`]: LedgerError::SyncTimeout
//! [`NoEarlierOccurrence`]: LedgerError::NoEarlierOccurrence
use sea_orm::DbErr;
use thiserror::Error;

/// Ledger custom errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// An entity expected to be persisted carries no id.
    #[error("missing id: {0}")]
    MissingId(String),
    /// A mutation referenced a rule id absent from the loaded rule cache.
    #[error("rule not loaded: {0}")]
    RuleNotLoaded(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    /// TO-delete requested while no occurrence exists before the date.
    #[error("no occurrence before {0}")]
    NoEarlierOccurrence(String),
    /// A frequency/interval combination outside the closed interval table.
    #[error("unknown recurrence: {0}")]
    UnknownRecurrence(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    /// A restore handle was replayed against the wrong engine.
    #[error("invalid restore: {0}")]
    InvalidRestore(String),
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
    /// The rule cache did not reach `Loaded` within its bound. Retryable.
    #[error("sync timeout: {0}")]
    SyncTimeout(String),
    /// The remote row store rejected or failed an operation.
    #[error("remote store: {0}")]
    Remote(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::MissingId(a), Self::MissingId(b)) => a == b,
            (Self::RuleNotLoaded(a), Self::RuleNotLoaded(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::NoEarlierOccurrence(a), Self::NoEarlierOccurrence(b)) => a == b,
            (Self::UnknownRecurrence(a), Self::UnknownRecurrence(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidRestore(a), Self::InvalidRestore(b)) => a == b,
            (Self::InvalidCursor(a), Self::InvalidCursor(b)) => a == b,
            (Self::SyncTimeout(a), Self::SyncTimeout(b)) => a == b,
            (Self::Remote(a), Self::Remote(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
