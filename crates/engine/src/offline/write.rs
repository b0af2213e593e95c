use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, TransactionTrait};
use uuid::Uuid;

use crate::{
    LedgerChange, LedgerEntry, RecurrenceRule, ResultLedger, TailUpdate, entry, recurring,
    util::normalize_required_title,
};

use super::{OfflineLedger, with_tx};

/// Rows per INSERT while flattening a rule.
const FLATTEN_CHUNK: usize = 500;

impl OfflineLedger {
    /// Inserts the entry (no id yet) or updates its persisted row.
    pub(crate) async fn persist_entry(&self, mut entry: LedgerEntry) -> ResultLedger<LedgerEntry> {
        entry.title = normalize_required_title(&entry.title)?;

        let update = entry.id.is_some();
        if entry.id.is_none() {
            entry.id = Some(Uuid::new_v4());
        }
        let model = entry::ActiveModel::try_from(&entry)?;
        if update {
            model.update(&self.database).await?;
        } else {
            model.insert(&self.database).await?;
        }

        let id = entry.require_id()?;
        tracing::debug!(%id, update, "persisted entry");
        self.changes().publish(if update {
            LedgerChange::EntryUpdated { id }
        } else {
            LedgerChange::EntryPersisted { id }
        });
        Ok(entry)
    }

    /// Persists a rule and flattens its whole horizon into entry rows.
    ///
    /// Runs in one transaction: either the rule and every occurrence land,
    /// or nothing does.
    pub(crate) async fn persist_rule(&self, mut rule: RecurrenceRule) -> ResultLedger<RecurrenceRule> {
        rule.title = normalize_required_title(&rule.title)?;
        if rule.id.is_none() {
            rule.id = Some(Uuid::new_v4());
        }
        let id = rule.require_id()?;

        with_tx!(self, |db_tx| {
            recurring::ActiveModel::try_from(&rule)?
                .insert(&db_tx)
                .await?;
            self.flatten_rule(&db_tx, &rule, None).await?;
            Ok(())
        })?;

        tracing::debug!(%id, interval = rule.interval.as_str(), "flattened rule");
        self.changes().publish(LedgerChange::RulePersisted { id });
        Ok(rule)
    }

    /// Rewrites the rule's tail from `update.pivot` (inclusive) forward.
    ///
    /// Within one transaction: deletes every materialized entry dated on or
    /// after the pivot, updates the rule row, and regenerates from the new
    /// anchor. Rows before the pivot are untouched, so per-entry edits made
    /// there survive.
    pub(crate) async fn update_rule_after_date(&self, update: TailUpdate) -> ResultLedger<()> {
        let title = normalize_required_title(&update.title)?;
        let rule_id = update.rule_id;

        with_tx!(self, |db_tx| {
            let model = recurring::Entity::find_by_id(rule_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| crate::LedgerError::KeyNotFound("rule not exists".to_string()))?;
            let mut rule = RecurrenceRule::try_from(model)?;

            entry::Entity::delete_many()
                .filter(entry::Column::RuleId.eq(rule_id.to_string()))
                .filter(entry::Column::Date.gte(update.pivot))
                .exec(&db_tx)
                .await?;

            rule.title = title.clone();
            rule.amount = update.amount;
            rule.anchor_date = update.anchor_date;
            rule.interval = update.interval;
            rule.modified = true;

            recurring::ActiveModel::try_from(&rule)?
                .update(&db_tx)
                .await?;
            self.flatten_rule(&db_tx, &rule, Some(update.pivot)).await?;
            Ok(())
        })?;

        tracing::debug!(%rule_id, pivot = %update.pivot, "rewrote rule tail");
        self.changes().publish(LedgerChange::RuleUpdated {
            id: rule_id,
            pivot: Some(update.pivot),
        });
        Ok(())
    }

    /// Writes the rule's occurrences, skipping dates before `not_before`.
    async fn flatten_rule(
        &self,
        db_tx: &sea_orm::DatabaseTransaction,
        rule: &RecurrenceRule,
        not_before: Option<chrono::NaiveDate>,
    ) -> ResultLedger<()> {
        let mut models = Vec::new();
        for k in 0..rule.interval.occurrence_horizon() {
            let mut occurrence = rule.occurrence(k as u32)?;
            if let Some(bound) = not_before
                && occurrence.date < bound
            {
                continue;
            }
            occurrence.id = Some(Uuid::new_v4());
            models.push(entry::ActiveModel::try_from(&occurrence)?);
        }

        for chunk in models.chunks(FLATTEN_CHUNK) {
            entry::Entity::insert_many(chunk.to_vec()).exec(db_tx).await?;
        }
        Ok(())
    }
}
