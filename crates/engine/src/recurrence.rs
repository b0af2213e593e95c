//! Serialized recurrence definitions and per-occurrence exceptions.
//!
//! The online engine stores one [`StoredRule`] per recurring expense: the
//! rule fields, a [`RecurrenceDef`] equivalent to a row of the interval
//! table, and a sparse exception map keyed by original occurrence date. The
//! definition and the exception map travel as JSON blobs inside remote rows.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Frequency, IntervalType, LedgerEntry, LedgerError, Money, RecurrenceLink, RecurrenceRule,
    ResultLedger,
};

/// RFC-5545-flavored recurrence definition: frequency, interval and the
/// effective date bounds.
///
/// `since`/`until` are inclusive occurrence-date bounds. They start unset and
/// only tighten when delete scopes truncate the rule (TO-delete advances
/// `since`, FROM-delete caps `until`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceDef {
    pub frequency: Frequency,
    pub interval: u32,
    pub anchor: NaiveDate,
    #[serde(default)]
    pub since: Option<NaiveDate>,
    #[serde(default)]
    pub until: Option<NaiveDate>,
}

impl RecurrenceDef {
    #[must_use]
    pub fn from_interval(interval: IntervalType, anchor: NaiveDate) -> Self {
        let step = interval.step();
        Self {
            frequency: step.frequency,
            interval: step.multiplier,
            anchor,
            since: None,
            until: None,
        }
    }

    /// Maps the definition back to the closed interval table.
    ///
    /// Fails with `UnknownRecurrence` for combinations the table does not
    /// carry, e.g. rules written by a newer client.
    pub fn interval_type(&self) -> ResultLedger<IntervalType> {
        IntervalType::classify(self.frequency, self.interval)
    }

    /// True when the effective range still admits the given occurrence date.
    #[must_use]
    pub fn admits(&self, date: NaiveDate) -> bool {
        self.since.is_none_or(|since| date >= since)
            && self.until.is_none_or(|until| date <= until)
    }

    /// Occurrence dates within `[from, to]`, bounded by the table horizon.
    pub fn occurrence_dates(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultLedger<Vec<NaiveDate>> {
        let interval = self.interval_type()?;
        let mut dates = Vec::new();
        for k in 0..interval.occurrence_horizon() {
            let date = interval.advance(self.anchor, k as u32);
            if date > to || self.until.is_some_and(|until| date > until) {
                break;
            }
            if date < from || !self.admits(date) {
                continue;
            }
            dates.push(date);
        }
        Ok(dates)
    }
}

/// Per-occurrence override, keyed by the occurrence's original date.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Exception {
    /// The occurrence is suppressed.
    Tombstone,
    /// The occurrence is replaced wholesale; `date` may move it to another
    /// day while the map key keeps the original date.
    Replacement {
        title: String,
        amount: Money,
        date: NaiveDate,
        checked: bool,
    },
}

/// A recurring rule as the online engine stores and caches it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredRule {
    pub id: Uuid,
    pub title: String,
    pub amount: Money,
    pub recurrence: RecurrenceDef,
    pub exceptions: BTreeMap<NaiveDate, Exception>,
}

impl StoredRule {
    /// Builds the stored form of a freshly persisted rule.
    pub fn from_rule(rule: &RecurrenceRule) -> ResultLedger<Self> {
        Ok(Self {
            id: rule.require_id()?,
            title: rule.title.clone(),
            amount: rule.amount,
            recurrence: RecurrenceDef::from_interval(rule.interval, rule.anchor_date),
            exceptions: BTreeMap::new(),
        })
    }

    /// Lazily expands the rule into entries for `[from, to]`.
    ///
    /// Generated dates hit the exception map first: a tombstone omits the
    /// occurrence, a replacement emits its override fields (with the
    /// generation date preserved as `original_date`). Replacements are
    /// matched on their **effective** date, so an occurrence moved into the
    /// range from outside is returned and one moved out is not.
    pub fn generate_occurrences(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultLedger<Vec<LedgerEntry>> {
        let mut entries = Vec::new();

        for date in self.recurrence.occurrence_dates(from, to)? {
            match self.exceptions.get(&date) {
                Some(_) => {}
                None => entries.push(LedgerEntry {
                    id: None,
                    title: self.title.clone(),
                    amount: self.amount,
                    date,
                    checked: false,
                    recurrence: Some(RecurrenceLink {
                        rule_id: self.id,
                        original_date: date,
                    }),
                }),
            }
        }

        for (original_date, exception) in &self.exceptions {
            if !self.recurrence.admits(*original_date) {
                continue;
            }
            if let Exception::Replacement {
                title,
                amount,
                date,
                checked,
            } = exception
                && *date >= from
                && *date <= to
            {
                entries.push(LedgerEntry {
                    id: None,
                    title: title.clone(),
                    amount: *amount,
                    date: *date,
                    checked: *checked,
                    recurrence: Some(RecurrenceLink {
                        rule_id: self.id,
                        original_date: *original_date,
                    }),
                });
            }
        }

        Ok(entries)
    }

    /// Drops exceptions the effective range no longer reaches.
    pub fn prune_orphan_exceptions(&mut self) {
        let recurrence = self.recurrence.clone();
        self.exceptions
            .retain(|original_date, _| recurrence.admits(*original_date));
    }

    pub fn definition_blob(&self) -> ResultLedger<String> {
        serde_json::to_string(&self.recurrence)
            .map_err(|err| LedgerError::Remote(format!("serialize recurrence: {err}")))
    }

    pub fn exceptions_blob(&self) -> ResultLedger<String> {
        serde_json::to_string(&self.exceptions)
            .map_err(|err| LedgerError::Remote(format!("serialize exceptions: {err}")))
    }

    pub fn parse_blobs(
        id: Uuid,
        title: String,
        amount: Money,
        definition: &str,
        exceptions: &str,
    ) -> ResultLedger<Self> {
        let recurrence: RecurrenceDef = serde_json::from_str(definition)
            .map_err(|err| LedgerError::Remote(format!("parse recurrence: {err}")))?;
        let exceptions: BTreeMap<NaiveDate, Exception> = serde_json::from_str(exceptions)
            .map_err(|err| LedgerError::Remote(format!("parse exceptions: {err}")))?;
        Ok(Self {
            id,
            title,
            amount,
            recurrence,
            exceptions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monthly_rule() -> StoredRule {
        StoredRule {
            id: Uuid::new_v4(),
            title: "Rent".to_string(),
            amount: Money::new(-1000),
            recurrence: RecurrenceDef::from_interval(IntervalType::Monthly, date(2024, 1, 1)),
            exceptions: BTreeMap::new(),
        }
    }

    #[test]
    fn generates_synthetic_occurrences_in_range() {
        let rule = monthly_rule();
        let entries = rule
            .generate_occurrences(date(2024, 2, 1), date(2024, 4, 30))
            .unwrap();
        let dates: Vec<NaiveDate> = entries.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![date(2024, 2, 1), date(2024, 3, 1), date(2024, 4, 1)]);
        assert!(entries.iter().all(|e| e.id.is_none() && !e.checked));
    }

    #[test]
    fn tombstone_suppresses_an_occurrence() {
        let mut rule = monthly_rule();
        rule.exceptions.insert(date(2024, 2, 1), Exception::Tombstone);
        let entries = rule
            .generate_occurrences(date(2024, 1, 1), date(2024, 3, 31))
            .unwrap();
        let dates: Vec<NaiveDate> = entries.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 3, 1)]);
    }

    #[test]
    fn replacement_wins_over_the_synthetic_entry() {
        let mut rule = monthly_rule();
        rule.exceptions.insert(
            date(2024, 2, 1),
            Exception::Replacement {
                title: "Rent (reduced)".to_string(),
                amount: Money::new(-800),
                date: date(2024, 2, 1),
                checked: true,
            },
        );
        let entries = rule
            .generate_occurrences(date(2024, 2, 1), date(2024, 2, 29))
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount, Money::new(-800));
        assert!(entries[0].checked);
        assert_eq!(
            entries[0].recurrence.unwrap().original_date,
            date(2024, 2, 1)
        );
    }

    #[test]
    fn replacement_is_matched_on_its_effective_date() {
        let mut rule = monthly_rule();
        rule.exceptions.insert(
            date(2024, 2, 1),
            Exception::Replacement {
                title: "Rent".to_string(),
                amount: Money::new(-1000),
                date: date(2024, 3, 15),
                checked: false,
            },
        );

        // Moved out of February…
        let feb = rule
            .generate_occurrences(date(2024, 2, 1), date(2024, 2, 29))
            .unwrap();
        assert!(feb.is_empty());

        // …and into March, keeping the original date as the exception key.
        let mar = rule
            .generate_occurrences(date(2024, 3, 1), date(2024, 3, 31))
            .unwrap();
        assert_eq!(mar.len(), 2);
        assert!(mar.iter().any(|e| e.date == date(2024, 3, 15)
            && e.recurrence.unwrap().original_date == date(2024, 2, 1)));
    }

    #[test]
    fn bounds_truncate_and_prune() {
        let mut rule = monthly_rule();
        rule.exceptions.insert(date(2024, 5, 1), Exception::Tombstone);
        rule.recurrence.until = Some(date(2024, 3, 31));
        rule.prune_orphan_exceptions();
        assert!(rule.exceptions.is_empty());

        let entries = rule
            .generate_occurrences(date(2024, 1, 1), date(2024, 12, 31))
            .unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn unknown_recurrence_is_rejected() {
        let mut rule = monthly_rule();
        rule.recurrence.interval = 5;
        assert!(matches!(
            rule.generate_occurrences(date(2024, 1, 1), date(2024, 12, 31)),
            Err(LedgerError::UnknownRecurrence(_))
        ));
    }

    #[test]
    fn blobs_round_trip() {
        let mut rule = monthly_rule();
        rule.exceptions.insert(date(2024, 2, 1), Exception::Tombstone);
        let parsed = StoredRule::parse_blobs(
            rule.id,
            rule.title.clone(),
            rule.amount,
            &rule.definition_blob().unwrap(),
            &rule.exceptions_blob().unwrap(),
        )
        .unwrap();
        assert_eq!(parsed, rule);
    }
}
