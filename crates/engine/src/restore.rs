//! Reversible handles for destructive mutations.
//!
//! Every destructive mutation returns a [`RestoreAction`]: an explicit value
//! command carrying full entity snapshots plus the operation that produced
//! it, never a captured closure, so it stays serializable and its
//! at-most-once contract is auditable. The action is consumed by value by
//! `LedgerStore::restore`; replaying it re-creates the removed entities with
//! their original ids.

use serde::{Deserialize, Serialize};

use crate::{LedgerEntry, RecurrenceRule, recurrence::StoredRule};

/// Which mutation produced the action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoredOperation {
    DeleteOne,
    DeleteAfter,
    DeleteBefore,
    DeleteAll,
}

/// The state snapshot the action replays.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestorePayload {
    /// Deleted entry rows, ids included.
    Entries(Vec<LedgerEntry>),
    /// A deleted rule together with every row it had materialized.
    RuleWithEntries {
        rule: RecurrenceRule,
        entries: Vec<LedgerEntry>,
    },
    /// The online engine's pre-mutation serialized rule state.
    RuleSnapshot(StoredRule),
}

/// Single-use reversible command returned by destructive mutations.
///
/// Deliberately not `Clone`: restoring consumes the action, making a second
/// replay a compile-time error rather than a runtime surprise.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct RestoreAction {
    operation: RestoredOperation,
    payload: RestorePayload,
}

impl RestoreAction {
    pub(crate) fn new(operation: RestoredOperation, payload: RestorePayload) -> Self {
        Self { operation, payload }
    }

    #[must_use]
    pub fn operation(&self) -> RestoredOperation {
        self.operation
    }

    #[must_use]
    pub fn payload(&self) -> &RestorePayload {
        &self.payload
    }

    pub(crate) fn into_payload(self) -> RestorePayload {
        self.payload
    }
}
