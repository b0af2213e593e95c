use chrono::NaiveDate;
use engine::{
    IntervalType, LedgerChange, LedgerEntry, LedgerError, LedgerStore, Money, OfflineLedger,
    RecurrenceRule, TailUpdate,
};
use migration::MigratorTrait;
use sea_orm::Database;

async fn ledger_with_db() -> OfflineLedger {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    OfflineLedger::builder().database(db).build().await.unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn rent_rule() -> RecurrenceRule {
    RecurrenceRule::new(
        "Rent",
        Money::new(-1000),
        date(2024, 1, 1),
        IntervalType::Monthly,
    )
}

#[tokio::test]
async fn persist_entry_round_trips() {
    let ledger = ledger_with_db().await;

    let entry = ledger
        .persist_entry(LedgerEntry::new(
            "Groceries",
            Money::new(-2350),
            date(2024, 3, 2),
        ))
        .await
        .unwrap();
    assert!(entry.id.is_some());

    let found = ledger.entries_for_day(date(2024, 3, 2)).await.unwrap();
    assert_eq!(found, vec![entry]);
}

#[tokio::test]
async fn persist_entry_updates_in_place() {
    let ledger = ledger_with_db().await;

    let mut entry = ledger
        .persist_entry(LedgerEntry::new("Gym", Money::new(-500), date(2024, 3, 2)))
        .await
        .unwrap();
    entry.checked = true;
    entry.amount = Money::new(-550);
    ledger.persist_entry(entry.clone()).await.unwrap();

    let found = ledger.entries_for_day(date(2024, 3, 2)).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].amount, Money::new(-550));
    assert!(found[0].checked);
    assert_eq!(found[0].id, entry.id);
}

#[tokio::test]
async fn rule_flattens_its_whole_horizon() {
    let ledger = ledger_with_db().await;
    let rule = ledger.persist_rule(rent_rule()).await.unwrap();
    let rule_id = rule.require_id().unwrap();

    let entries = ledger
        .entries_for_range(date(2024, 1, 1), date(2040, 1, 1))
        .await
        .unwrap();
    assert_eq!(entries.len(), IntervalType::Monthly.occurrence_horizon());

    for (k, entry) in entries.iter().enumerate() {
        assert_eq!(
            entry.date,
            IntervalType::Monthly.advance(date(2024, 1, 1), k as u32)
        );
        let link = entry.recurrence.unwrap();
        assert_eq!(link.rule_id, rule_id);
        assert_eq!(link.original_date, entry.date);
        assert_eq!(entry.amount, Money::new(-1000));
        assert!(!entry.checked);
    }
}

#[tokio::test]
async fn rent_scenario_balance() {
    let ledger = ledger_with_db().await;
    ledger.persist_rule(rent_rule()).await.unwrap();

    // Jan 1, Feb 1 and Mar 1 occurrences are due by Mar 1.
    assert_eq!(
        ledger.balance(date(2024, 3, 1)).await.unwrap(),
        Money::new(-3000)
    );
    assert_eq!(
        ledger.checked_balance(date(2024, 3, 1)).await.unwrap(),
        Money::ZERO
    );
}

#[tokio::test]
async fn balance_is_additive_per_day() {
    let ledger = ledger_with_db().await;
    ledger.persist_rule(rent_rule()).await.unwrap();
    ledger
        .persist_entry(LedgerEntry::new(
            "Salary",
            Money::new(20_000),
            date(2024, 2, 1),
        ))
        .await
        .unwrap();

    let day = date(2024, 2, 1);
    let before = ledger.balance(day.pred_opt().unwrap()).await.unwrap();
    let on_day: Money = ledger
        .entries_for_day(day)
        .await
        .unwrap()
        .iter()
        .fold(Money::ZERO, |sum, e| sum + e.amount);
    assert_eq!(ledger.balance(day).await.unwrap(), before + on_day);
}

#[tokio::test]
async fn tail_update_preserves_edited_head() {
    let ledger = ledger_with_db().await;
    let rule = ledger.persist_rule(rent_rule()).await.unwrap();
    let rule_id = rule.require_id().unwrap();

    // Check off the February occurrence before touching the tail.
    let mut february = ledger
        .entries_for_day(date(2024, 2, 1))
        .await
        .unwrap()
        .remove(0);
    february.checked = true;
    ledger.persist_entry(february.clone()).await.unwrap();

    ledger
        .update_rule_after_date(TailUpdate::new(
            rule_id,
            date(2024, 3, 1),
            "Rent (new lease)",
            Money::new(-1200),
            IntervalType::Monthly,
        ))
        .await
        .unwrap();

    // Head untouched, edits preserved.
    let head = ledger.entries_for_day(date(2024, 2, 1)).await.unwrap();
    assert_eq!(head.len(), 1);
    assert_eq!(head[0].title, "Rent");
    assert_eq!(head[0].amount, Money::new(-1000));
    assert!(head[0].checked);
    assert_eq!(head[0].id, february.id);

    // The pivot day itself belongs to the tail (inclusive boundary).
    let pivot_day = ledger.entries_for_day(date(2024, 3, 1)).await.unwrap();
    assert_eq!(pivot_day.len(), 1);
    assert_eq!(pivot_day[0].title, "Rent (new lease)");
    assert_eq!(pivot_day[0].amount, Money::new(-1200));
    assert!(!pivot_day[0].checked);

    let tail = ledger
        .entries_for_range(date(2024, 3, 1), date(2040, 1, 1))
        .await
        .unwrap();
    assert_eq!(tail.len(), IntervalType::Monthly.occurrence_horizon());
}

#[tokio::test]
async fn delete_entry_and_restore_is_exact() {
    let ledger = ledger_with_db().await;
    let entry = ledger
        .persist_entry(LedgerEntry::new("Coffee", Money::new(-150), date(2024, 3, 4)))
        .await
        .unwrap();

    let action = ledger.delete_entry(&entry).await.unwrap();
    assert!(ledger.entries_for_day(date(2024, 3, 4)).await.unwrap().is_empty());

    ledger.restore(action).await.unwrap();
    let restored = ledger.entries_for_day(date(2024, 3, 4)).await.unwrap();
    assert_eq!(restored, vec![entry]);
}

#[tokio::test]
async fn delete_after_and_restore_round_trips() {
    let ledger = ledger_with_db().await;
    let rule = ledger.persist_rule(rent_rule()).await.unwrap();
    let rule_id = rule.require_id().unwrap();

    let snapshot = |entries: &[LedgerEntry]| -> Vec<_> {
        entries
            .iter()
            .map(|e| (e.id, e.date, e.amount, e.title.clone()))
            .collect()
    };

    let before = ledger
        .entries_for_range(date(2024, 1, 1), date(2040, 1, 1))
        .await
        .unwrap();

    let action = ledger
        .delete_rule_entries_after(rule_id, date(2024, 2, 1))
        .await
        .unwrap();

    // Strictly-after semantics: Jan 1 and Feb 1 survive.
    let kept = ledger
        .entries_for_range(date(2024, 1, 1), date(2040, 1, 1))
        .await
        .unwrap();
    assert_eq!(
        kept.iter().map(|e| e.date).collect::<Vec<_>>(),
        vec![date(2024, 1, 1), date(2024, 2, 1)]
    );

    ledger.restore(action).await.unwrap();
    let after = ledger
        .entries_for_range(date(2024, 1, 1), date(2040, 1, 1))
        .await
        .unwrap();
    assert_eq!(snapshot(&after), snapshot(&before));
}

#[tokio::test]
async fn delete_before_first_occurrence_is_guarded() {
    let ledger = ledger_with_db().await;
    let rule = ledger.persist_rule(rent_rule()).await.unwrap();
    let rule_id = rule.require_id().unwrap();

    assert!(!ledger
        .has_entries_before(rule_id, date(2024, 1, 1))
        .await
        .unwrap());

    let err = ledger
        .delete_rule_entries_before(rule_id, date(2024, 1, 1))
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::NoEarlierOccurrence("2024-01-01".to_string()));

    // Nothing mutated.
    let entries = ledger
        .entries_for_range(date(2024, 1, 1), date(2040, 1, 1))
        .await
        .unwrap();
    assert_eq!(entries.len(), IntervalType::Monthly.occurrence_horizon());
}

#[tokio::test]
async fn delete_before_removes_the_head() {
    let ledger = ledger_with_db().await;
    let rule = ledger.persist_rule(rent_rule()).await.unwrap();
    let rule_id = rule.require_id().unwrap();

    assert!(ledger
        .has_entries_before(rule_id, date(2024, 3, 1))
        .await
        .unwrap());
    ledger
        .delete_rule_entries_before(rule_id, date(2024, 3, 1))
        .await
        .unwrap();

    let entries = ledger
        .entries_for_range(date(2024, 1, 1), date(2024, 12, 31))
        .await
        .unwrap();
    // Mar 1 itself survives (strictly-before semantics).
    assert_eq!(entries.first().unwrap().date, date(2024, 3, 1));
}

#[tokio::test]
async fn delete_rule_cascades_and_restores() {
    let ledger = ledger_with_db().await;
    let rule = ledger.persist_rule(rent_rule()).await.unwrap();
    let rule_id = rule.require_id().unwrap();

    let before = ledger
        .entries_for_range(date(2024, 1, 1), date(2040, 1, 1))
        .await
        .unwrap();

    let action = ledger.delete_rule(rule_id).await.unwrap();
    assert!(ledger
        .entries_for_range(date(2024, 1, 1), date(2040, 1, 1))
        .await
        .unwrap()
        .is_empty());

    // The cascade removed the rule row too: the tail delete now misses.
    assert_eq!(
        ledger
            .update_rule_after_date(TailUpdate::new(
                rule_id,
                date(2024, 3, 1),
                "Rent",
                Money::new(-1000),
                IntervalType::Monthly,
            ))
            .await
            .unwrap_err(),
        LedgerError::KeyNotFound("rule not exists".to_string())
    );

    ledger.restore(action).await.unwrap();
    let after = ledger
        .entries_for_range(date(2024, 1, 1), date(2040, 1, 1))
        .await
        .unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn deleting_a_never_persisted_entry_is_a_precondition_error() {
    let ledger = ledger_with_db().await;
    let entry = LedgerEntry::new("Ghost", Money::new(-1), date(2024, 1, 1));
    assert!(matches!(
        ledger.delete_entry(&entry).await.unwrap_err(),
        LedgerError::MissingId(_)
    ));
}

#[tokio::test]
async fn mutations_notify_subscribers() {
    let ledger = ledger_with_db().await;
    let mut stream = ledger.subscribe();

    let entry = ledger
        .persist_entry(LedgerEntry::new("Coffee", Money::new(-150), date(2024, 3, 4)))
        .await
        .unwrap();
    let id = entry.require_id().unwrap();
    assert_eq!(stream.recv().await, Some(LedgerChange::EntryPersisted { id }));

    let action = ledger.delete_entry(&entry).await.unwrap();
    assert_eq!(stream.recv().await, Some(LedgerChange::EntryDeleted { id }));

    ledger.restore(action).await.unwrap();
    assert_eq!(stream.recv().await, Some(LedgerChange::Restored));
}

#[tokio::test]
async fn month_view_walks_the_leeway_window() {
    let ledger = ledger_with_db().await;
    ledger.persist_rule(rent_rule()).await.unwrap();
    ledger
        .persist_entry(LedgerEntry::new(
            "Salary",
            Money::new(20_000),
            date(2024, 2, 26),
        ))
        .await
        .unwrap();

    let view = ledger.month_view(date(2024, 3, 15)).await.unwrap();
    assert_eq!(view.month, date(2024, 3, 1));
    // 6 leeway days on both sides of March.
    assert!(view.day(date(2024, 2, 24)).is_some());
    assert!(view.day(date(2024, 4, 6)).is_some());
    assert!(view.day(date(2024, 2, 23)).is_none());

    // Seeded with the January and February occurrences, then accumulating
    // through the window.
    assert_eq!(
        view.day(date(2024, 2, 24)).unwrap().balance,
        Money::new(-2000)
    );
    assert_eq!(
        view.day(date(2024, 2, 26)).unwrap().balance,
        Money::new(18_000)
    );
    assert_eq!(
        view.day(date(2024, 3, 1)).unwrap().balance,
        Money::new(17_000)
    );
    let march_first = view.day(date(2024, 3, 1)).unwrap();
    assert_eq!(march_first.entries.len(), 1);
    assert_eq!(march_first.entries[0].title, "Rent");
}

#[tokio::test]
async fn entries_page_paginates_newest_first() {
    let ledger = ledger_with_db().await;
    for (title, day) in [("a", 1), ("b", 2), ("c", 3)] {
        ledger
            .persist_entry(LedgerEntry::new(title, Money::new(-100), date(2024, 3, day)))
            .await
            .unwrap();
    }

    let first = ledger
        .entries_page(date(2024, 3, 1), date(2024, 3, 31), None, 2)
        .await
        .unwrap();
    assert_eq!(
        first.entries.iter().map(|e| e.date).collect::<Vec<_>>(),
        vec![date(2024, 3, 3), date(2024, 3, 2)]
    );
    let cursor = first.next.expect("second page expected");

    let second = ledger
        .entries_page(date(2024, 3, 1), date(2024, 3, 31), Some(&cursor), 2)
        .await
        .unwrap();
    assert_eq!(
        second.entries.iter().map(|e| e.date).collect::<Vec<_>>(),
        vec![date(2024, 3, 1)]
    );
    assert!(second.next.is_none());
}
