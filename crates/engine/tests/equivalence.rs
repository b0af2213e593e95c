//! Both engines must produce identical observable results for the same
//! inputs: same `(date, amount, title)` tuples per range, same balances,
//! same month views.

use chrono::NaiveDate;
use engine::{IntervalType, LedgerEntry, LedgerStore, Money, RecurrenceRule};

mod common;

use common::{date, offline_ledger, online_ledger};

type Observed = Vec<(NaiveDate, i64, String, bool)>;

async fn observe(store: &impl LedgerStore, from: NaiveDate, to: NaiveDate) -> Observed {
    store
        .entries_for_range(from, to)
        .await
        .unwrap()
        .into_iter()
        .map(|e| (e.date, e.amount.minor_units(), e.title, e.checked))
        .collect()
}

async fn observe_month(store: &impl LedgerStore, month: NaiveDate) -> Vec<(NaiveDate, i64, i64)> {
    store
        .month_view(month)
        .await
        .unwrap()
        .days
        .values()
        .map(|d| {
            (
                d.day,
                d.balance.minor_units(),
                d.checked_balance.minor_units(),
            )
        })
        .collect()
}

#[tokio::test]
async fn engines_agree_on_untouched_rules() {
    let cases = [
        (IntervalType::Daily, date(2024, 1, 15)),
        (IntervalType::BiWeekly, date(2024, 1, 2)),
        (IntervalType::Monthly, date(2024, 1, 31)),
        (IntervalType::SixMonthly, date(2024, 2, 29)),
        (IntervalType::Yearly, date(2024, 6, 1)),
    ];

    for (interval, anchor) in cases {
        let offline = offline_ledger().await;
        let (online, _remote) = online_ledger();

        let rule = RecurrenceRule::new("Insurance", Money::new(-4750), anchor, interval);
        offline.persist_rule(rule.clone()).await.unwrap();
        online.persist_rule(rule).await.unwrap();

        let from = date(2023, 12, 1);
        let to = date(2026, 12, 31);
        assert_eq!(
            observe(&offline, from, to).await,
            observe(&online, from, to).await,
            "range mismatch for {interval:?}"
        );

        for day in [anchor, date(2025, 3, 1), date(2026, 12, 31)] {
            assert_eq!(
                offline.balance(day).await.unwrap(),
                online.balance(day).await.unwrap(),
                "balance mismatch for {interval:?} at {day}"
            );
        }
    }
}

#[tokio::test]
async fn engines_agree_beyond_the_horizon() {
    let offline = offline_ledger().await;
    let (online, _remote) = online_ledger();

    let rule = RecurrenceRule::new(
        "Rent",
        Money::new(-1000),
        date(2024, 1, 1),
        IntervalType::Monthly,
    );
    offline.persist_rule(rule.clone()).await.unwrap();
    online.persist_rule(rule).await.unwrap();

    // The monthly horizon ends after 120 occurrences; both engines stop there.
    let from = date(2024, 1, 1);
    let to = date(2060, 1, 1);
    let offline_seen = observe(&offline, from, to).await;
    let online_seen = observe(&online, from, to).await;
    assert_eq!(
        offline_seen.len(),
        IntervalType::Monthly.occurrence_horizon()
    );
    assert_eq!(offline_seen, online_seen);
}

#[tokio::test]
async fn engines_agree_on_mixed_ledgers() {
    let offline = offline_ledger().await;
    let (online, _remote) = online_ledger();

    let rule = RecurrenceRule::new(
        "Rent",
        Money::new(-1000),
        date(2024, 1, 1),
        IntervalType::Monthly,
    );
    offline.persist_rule(rule.clone()).await.unwrap();
    online.persist_rule(rule).await.unwrap();

    for (title, minor, day, checked) in [
        ("Salary", 250_000i64, date(2024, 1, 25), true),
        ("Groceries", -2350, date(2024, 2, 3), false),
        ("Refund", 1999, date(2024, 2, 3), true),
    ] {
        let mut entry = LedgerEntry::new(title, Money::new(minor), day);
        entry.checked = checked;
        offline.persist_entry(entry.clone()).await.unwrap();
        online.persist_entry(entry).await.unwrap();
    }

    let from = date(2024, 1, 1);
    let to = date(2024, 6, 30);
    assert_eq!(
        observe(&offline, from, to).await,
        observe(&online, from, to).await
    );
    assert_eq!(
        observe_month(&offline, date(2024, 2, 1)).await,
        observe_month(&online, date(2024, 2, 1)).await
    );
    assert_eq!(
        offline.checked_balance(date(2024, 3, 1)).await.unwrap(),
        online.checked_balance(date(2024, 3, 1)).await.unwrap()
    );
}

#[tokio::test]
async fn engines_agree_after_scope_deletes() {
    let offline = offline_ledger().await;
    let (online, _remote) = online_ledger();

    let rule = RecurrenceRule::new(
        "Rent",
        Money::new(-1000),
        date(2024, 1, 1),
        IntervalType::Monthly,
    );
    let offline_rule = offline.persist_rule(rule.clone()).await.unwrap();
    let online_rule = online.persist_rule(rule).await.unwrap();

    offline
        .delete_rule_entries_after(offline_rule.require_id().unwrap(), date(2024, 6, 1))
        .await
        .unwrap();
    online
        .delete_rule_entries_after(online_rule.require_id().unwrap(), date(2024, 6, 1))
        .await
        .unwrap();

    offline
        .delete_rule_entries_before(offline_rule.require_id().unwrap(), date(2024, 3, 1))
        .await
        .unwrap();
    online
        .delete_rule_entries_before(online_rule.require_id().unwrap(), date(2024, 3, 1))
        .await
        .unwrap();

    let from = date(2023, 1, 1);
    let to = date(2030, 1, 1);
    let offline_seen = observe(&offline, from, to).await;
    assert_eq!(
        offline_seen.iter().map(|(d, ..)| *d).collect::<Vec<_>>(),
        vec![date(2024, 3, 1), date(2024, 4, 1), date(2024, 5, 1), date(2024, 6, 1)]
    );
    assert_eq!(offline_seen, observe(&online, from, to).await);
}
