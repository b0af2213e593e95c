use uuid::Uuid;

use crate::{
    LedgerChange, LedgerEntry, LedgerError, RecurrenceRule, RestoreAction, RestorePayload,
    RestoredOperation, ResultLedger,
    recurrence::{Exception, RecurrenceDef, StoredRule},
    util::normalize_required_title,
};

use super::{
    OnlineLedger,
    transport::{EntryRow, RemoteStore, RuleRow},
};

impl<R: RemoteStore> OnlineLedger<R> {
    /// Inserts or updates an entry.
    ///
    /// A plain entry maps to a remote row. An entry carrying a recurrence
    /// link is an occurrence edit: it becomes a replacement exception filed
    /// under the occurrence's original date, leaving row storage untouched.
    pub(crate) async fn persist_entry(&self, mut entry: LedgerEntry) -> ResultLedger<LedgerEntry> {
        entry.title = normalize_required_title(&entry.title)?;
        self.ensure_loaded().await?;

        match entry.recurrence {
            Some(link) => {
                self.mutate_rule(link.rule_id, |rule| {
                    rule.exceptions.insert(
                        link.original_date,
                        Exception::Replacement {
                            title: entry.title.clone(),
                            amount: entry.amount,
                            date: entry.date,
                            checked: entry.checked,
                        },
                    );
                    Ok(())
                })
                .await?;
                self.changes().publish(LedgerChange::RuleUpdated {
                    id: link.rule_id,
                    pivot: None,
                });
                Ok(entry)
            }
            None => {
                let update = entry.id.is_some();
                if entry.id.is_none() {
                    entry.id = Some(Uuid::new_v4());
                }
                let row = EntryRow::from_entry(&entry)?;
                self.remote.upsert_entry(&self.account, row).await?;

                let id = entry.require_id()?;
                self.changes().publish(if update {
                    LedgerChange::EntryUpdated { id }
                } else {
                    LedgerChange::EntryPersisted { id }
                });
                Ok(entry)
            }
        }
    }

    /// Stores the rule once; occurrences stay virtual until queried.
    pub(crate) async fn persist_rule(&self, mut rule: RecurrenceRule) -> ResultLedger<RecurrenceRule> {
        rule.title = normalize_required_title(&rule.title)?;
        self.ensure_loaded().await?;

        if rule.id.is_none() {
            rule.id = Some(Uuid::new_v4());
        }
        let id = rule.require_id()?;

        let stored = StoredRule::from_rule(&rule)?;
        let row = RuleRow::from_stored(&stored)?;
        self.remote.upsert_rule(&self.account, row).await?;
        self.cache.rules().await.insert(id, stored);

        self.changes().publish(LedgerChange::RulePersisted { id });
        Ok(rule)
    }

    /// Rewrites the rule in place from the pivot (inclusive) forward.
    ///
    /// The definition is re-anchored, exceptions keyed on or after the pivot
    /// are dropped, and prior exceptions remain valid.
    pub(crate) async fn update_rule_after_date(
        &self,
        update: crate::TailUpdate,
    ) -> ResultLedger<()> {
        let title = normalize_required_title(&update.title)?;
        self.ensure_loaded().await?;

        self.mutate_rule(update.rule_id, |rule| {
            rule.title = title.clone();
            rule.amount = update.amount;

            let mut recurrence = RecurrenceDef::from_interval(update.interval, update.anchor_date);
            recurrence.since = rule.recurrence.since;
            recurrence.until = rule.recurrence.until;
            rule.recurrence = recurrence;

            rule.exceptions.retain(|date, _| *date < update.pivot);
            rule.prune_orphan_exceptions();
            Ok(())
        })
        .await?;

        self.changes().publish(LedgerChange::RuleUpdated {
            id: update.rule_id,
            pivot: Some(update.pivot),
        });
        Ok(())
    }

    /// Deletes one entry: a remote row for plain entries, a tombstone
    /// exception for rule occurrences.
    pub(crate) async fn delete_entry(&self, entry: &LedgerEntry) -> ResultLedger<RestoreAction> {
        self.ensure_loaded().await?;

        match entry.recurrence {
            Some(link) => {
                let snapshot = self
                    .mutate_rule(link.rule_id, |rule| {
                        rule.exceptions.insert(link.original_date, Exception::Tombstone);
                        Ok(())
                    })
                    .await?;
                self.changes().publish(LedgerChange::RuleUpdated {
                    id: link.rule_id,
                    pivot: None,
                });
                Ok(RestoreAction::new(
                    RestoredOperation::DeleteOne,
                    RestorePayload::RuleSnapshot(snapshot),
                ))
            }
            None => {
                let id = entry.require_id()?;
                self.remote
                    .delete_entry(&self.account, &id.to_string())
                    .await?;
                self.changes().publish(LedgerChange::EntryDeleted { id });
                Ok(RestoreAction::new(
                    RestoredOperation::DeleteOne,
                    RestorePayload::Entries(vec![entry.clone()]),
                ))
            }
        }
    }

    /// Deletes the rule row outright; every occurrence disappears with it.
    pub(crate) async fn delete_rule(&self, rule_id: Uuid) -> ResultLedger<RestoreAction> {
        self.ensure_loaded().await?;

        let mut rules = self.cache.rules().await;
        let snapshot = rules
            .remove(&rule_id)
            .ok_or_else(|| LedgerError::RuleNotLoaded(rule_id.to_string()))?;

        if let Err(err) = self
            .remote
            .delete_rule(&self.account, &rule_id.to_string())
            .await
        {
            rules.insert(rule_id, snapshot);
            return Err(err);
        }
        drop(rules);

        self.changes().publish(LedgerChange::RuleDeleted { id: rule_id });
        Ok(RestoreAction::new(
            RestoredOperation::DeleteAll,
            RestorePayload::RuleSnapshot(snapshot),
        ))
    }

    /// Caps the rule's effective range at `date` (occurrences strictly after
    /// it disappear) and prunes orphaned exceptions.
    pub(crate) async fn delete_rule_entries_after(
        &self,
        rule_id: Uuid,
        date: chrono::NaiveDate,
    ) -> ResultLedger<RestoreAction> {
        self.ensure_loaded().await?;

        let snapshot = self
            .mutate_rule(rule_id, |rule| {
                let until = rule.recurrence.until.map_or(date, |until| until.min(date));
                rule.recurrence.until = Some(until);
                rule.prune_orphan_exceptions();
                Ok(())
            })
            .await?;

        self.changes()
            .publish(LedgerChange::RuleEntriesDeleted { id: rule_id });
        Ok(RestoreAction::new(
            RestoredOperation::DeleteAfter,
            RestorePayload::RuleSnapshot(snapshot),
        ))
    }

    /// Advances the rule's effective start to `date` (occurrences strictly
    /// before it disappear), guarded by the first-occurrence check.
    pub(crate) async fn delete_rule_entries_before(
        &self,
        rule_id: Uuid,
        date: chrono::NaiveDate,
    ) -> ResultLedger<RestoreAction> {
        self.ensure_loaded().await?;

        if !self.has_entries_before(rule_id, date).await? {
            return Err(LedgerError::NoEarlierOccurrence(date.to_string()));
        }

        let snapshot = self
            .mutate_rule(rule_id, |rule| {
                let since = rule.recurrence.since.map_or(date, |since| since.max(date));
                rule.recurrence.since = Some(since);
                rule.prune_orphan_exceptions();
                Ok(())
            })
            .await?;

        self.changes()
            .publish(LedgerChange::RuleEntriesDeleted { id: rule_id });
        Ok(RestoreAction::new(
            RestoredOperation::DeleteBefore,
            RestorePayload::RuleSnapshot(snapshot),
        ))
    }

    /// Replays a restore handle by re-applying the captured state.
    ///
    /// A partially failed replay of multiple entry rows is not rolled back;
    /// the error surfaces and the rows applied so far remain.
    pub(crate) async fn restore(&self, action: RestoreAction) -> ResultLedger<()> {
        self.ensure_loaded().await?;

        match action.into_payload() {
            RestorePayload::RuleSnapshot(snapshot) => {
                let row = RuleRow::from_stored(&snapshot)?;
                self.remote.upsert_rule(&self.account, row).await?;
                self.cache.rules().await.insert(snapshot.id, snapshot);
            }
            RestorePayload::Entries(entries) => {
                for entry in &entries {
                    let row = EntryRow::from_entry(entry)?;
                    self.remote.upsert_entry(&self.account, row).await?;
                }
            }
            RestorePayload::RuleWithEntries { .. } => {
                return Err(LedgerError::InvalidRestore(
                    "materialized rule replayed against the online ledger".to_string(),
                ));
            }
        }

        self.changes().publish(LedgerChange::Restored);
        Ok(())
    }

    /// Applies `mutate` to the cached rule, pushes the result to the remote
    /// store, and rolls the cache back to the pre-mutation snapshot if the
    /// write fails. Returns the snapshot for restore handles.
    async fn mutate_rule(
        &self,
        rule_id: Uuid,
        mutate: impl FnOnce(&mut StoredRule) -> ResultLedger<()>,
    ) -> ResultLedger<StoredRule> {
        let mut rules = self.cache.rules().await;
        let rule = rules
            .get_mut(&rule_id)
            .ok_or_else(|| LedgerError::RuleNotLoaded(rule_id.to_string()))?;

        let snapshot = rule.clone();
        if let Err(err) = mutate(rule) {
            *rule = snapshot;
            return Err(err);
        }
        let row = match RuleRow::from_stored(rule) {
            Ok(row) => row,
            Err(err) => {
                *rule = snapshot;
                return Err(err);
            }
        };

        if let Err(err) = self.remote.upsert_rule(&self.account, row).await {
            tracing::warn!(%rule_id, %err, "rule write failed, rolling back cache");
            *rule = snapshot;
            return Err(err);
        }
        Ok(snapshot)
    }

    pub(crate) fn changes(&self) -> &crate::ChangeHub {
        &self.changes
    }
}
