//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so both engines enforce consistent
//! invariants.

use uuid::Uuid;

use crate::{LedgerError, ResultLedger};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultLedger<Uuid> {
    Uuid::parse_str(value).map_err(|_| LedgerError::KeyNotFound(format!("{label} not exists")))
}

/// Reject empty titles before they reach storage.
pub(crate) fn normalize_required_title(value: &str) -> ResultLedger<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidAmount(
            "title must not be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}
