//! Day and month aggregation over ledger entries.
//!
//! The month walk is the main read path for calendar views: one balance
//! query seeds the running totals, then each day folds its own entries in
//! with O(1) work instead of re-summing from the epoch.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, Months, NaiveDate};

use crate::{LedgerEntry, Money, entry::sort_entries};

/// Extra days fetched before and after a month so calendar grids can render
/// the cells of adjacent months.
pub const LEEWAY_DAYS: u64 = 6;

/// One day of the ledger: its entries and the running balances up to and
/// including that day.
#[derive(Clone, Debug, PartialEq)]
pub struct DayView {
    pub day: NaiveDate,
    pub entries: Vec<LedgerEntry>,
    pub balance: Money,
    pub checked_balance: Money,
}

/// A month plus its leeway window, one [`DayView`] per day.
#[derive(Clone, Debug, PartialEq)]
pub struct MonthView {
    /// First day of the month proper (leeway days lie outside it).
    pub month: NaiveDate,
    pub days: BTreeMap<NaiveDate, DayView>,
}

impl MonthView {
    /// The view for one day of the window, if covered.
    #[must_use]
    pub fn day(&self, day: NaiveDate) -> Option<&DayView> {
        self.days.get(&day)
    }
}

pub(crate) fn first_of_month(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

pub(crate) fn last_of_month(day: NaiveDate) -> NaiveDate {
    first_of_month(day) + Months::new(1) - Days::new(1)
}

/// Folds entries into a [`MonthView`].
///
/// `seed_balance`/`seed_checked` are the balances of the day before `start`;
/// the walk accumulates from there, so callers provide exactly one balance
/// query regardless of the window size.
pub(crate) fn build_month_view(
    month: NaiveDate,
    start: NaiveDate,
    end: NaiveDate,
    entries: Vec<LedgerEntry>,
    seed_balance: Money,
    seed_checked: Money,
) -> MonthView {
    let mut by_day: BTreeMap<NaiveDate, Vec<LedgerEntry>> = BTreeMap::new();
    for entry in entries {
        by_day.entry(entry.date).or_default().push(entry);
    }

    let mut days = BTreeMap::new();
    let mut balance = seed_balance;
    let mut checked_balance = seed_checked;
    let mut day = start;
    while day <= end {
        let mut day_entries = by_day.remove(&day).unwrap_or_default();
        sort_entries(&mut day_entries);
        for entry in &day_entries {
            balance += entry.amount;
            if entry.checked {
                checked_balance += entry.amount;
            }
        }
        days.insert(
            day,
            DayView {
                day,
                entries: day_entries,
                balance,
                checked_balance,
            },
        );
        day = day + Days::new(1);
    }

    MonthView {
        month: first_of_month(month),
        days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(title: &str, minor: i64, day: NaiveDate, checked: bool) -> LedgerEntry {
        let mut entry = LedgerEntry::new(title, Money::new(minor), day);
        entry.checked = checked;
        entry
    }

    #[test]
    fn month_bounds() {
        assert_eq!(first_of_month(date(2024, 2, 15)), date(2024, 2, 1));
        assert_eq!(last_of_month(date(2024, 2, 15)), date(2024, 2, 29));
        assert_eq!(last_of_month(date(2023, 12, 1)), date(2023, 12, 31));
    }

    #[test]
    fn running_balances_accumulate_per_day() {
        let entries = vec![
            entry("Groceries", -500, date(2024, 3, 2), true),
            entry("Salary", 10_000, date(2024, 3, 2), false),
            entry("Coffee", -150, date(2024, 3, 4), false),
        ];
        let view = build_month_view(
            date(2024, 3, 1),
            date(2024, 3, 1),
            date(2024, 3, 5),
            entries,
            Money::new(2000),
            Money::new(1000),
        );

        assert_eq!(view.day(date(2024, 3, 1)).unwrap().balance, Money::new(2000));
        let second = view.day(date(2024, 3, 2)).unwrap();
        assert_eq!(second.balance, Money::new(11_500));
        assert_eq!(second.checked_balance, Money::new(500));
        assert_eq!(second.entries.len(), 2);
        // Untouched by the empty third day.
        assert_eq!(view.day(date(2024, 3, 3)).unwrap().balance, Money::new(11_500));
        assert_eq!(view.day(date(2024, 3, 5)).unwrap().balance, Money::new(11_350));
    }

    #[test]
    fn entries_within_a_day_are_ordered() {
        let entries = vec![
            entry("b", -1, date(2024, 3, 2), false),
            entry("a", -1, date(2024, 3, 2), false),
        ];
        let view = build_month_view(
            date(2024, 3, 1),
            date(2024, 3, 1),
            date(2024, 3, 3),
            entries,
            Money::ZERO,
            Money::ZERO,
        );
        let titles: Vec<&str> = view
            .day(date(2024, 3, 2))
            .unwrap()
            .entries
            .iter()
            .map(|e| e.title.as_str())
            .collect();
        assert_eq!(titles, vec!["a", "b"]);
    }
}
