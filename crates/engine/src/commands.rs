//! Command structs for ledger operations.
//!
//! These types group parameters for write operations, keeping call sites
//! readable and avoiding long argument lists.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{IntervalType, Money};

/// Rewrite a rule's tail from a pivot date forward.
///
/// Everything the rule materializes (or evaluates) on or after `pivot` is
/// replaced by occurrences of the updated fields; occurrences before the
/// pivot are untouched. The new anchor defaults to the pivot itself.
#[derive(Clone, Debug)]
pub struct TailUpdate {
    pub rule_id: Uuid,
    pub pivot: NaiveDate,
    pub title: String,
    pub amount: Money,
    pub interval: IntervalType,
    pub anchor_date: NaiveDate,
}

impl TailUpdate {
    #[must_use]
    pub fn new(
        rule_id: Uuid,
        pivot: NaiveDate,
        title: impl Into<String>,
        amount: Money,
        interval: IntervalType,
    ) -> Self {
        Self {
            rule_id,
            pivot,
            title: title.into(),
            amount,
            interval,
            anchor_date: pivot,
        }
    }

    /// Overrides the regeneration anchor (defaults to the pivot).
    #[must_use]
    pub fn anchor_date(mut self, anchor_date: NaiveDate) -> Self {
        self.anchor_date = anchor_date;
        self
    }
}
