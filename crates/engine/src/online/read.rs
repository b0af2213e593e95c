use chrono::NaiveDate;
use uuid::Uuid;

use crate::{LedgerEntry, LedgerError, Money, ResultLedger, entry::sort_entries};

use super::{OnlineLedger, transport::RemoteStore};

impl<R: RemoteStore> OnlineLedger<R> {
    pub(crate) async fn entries_for_day(&self, day: NaiveDate) -> ResultLedger<Vec<LedgerEntry>> {
        self.entries_for_range(day, day).await
    }

    /// Plain remote rows plus every rule evaluated over the range.
    pub(crate) async fn entries_for_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultLedger<Vec<LedgerEntry>> {
        self.ensure_loaded().await?;

        let rows = self.remote.fetch_entries(&self.account, from, to).await?;
        let mut entries = rows
            .into_iter()
            .map(|row| row.into_entry())
            .collect::<ResultLedger<Vec<_>>>()?;

        let rules = self.cache.rules().await;
        for rule in rules.values() {
            entries.extend(rule.generate_occurrences(from, to)?);
        }
        drop(rules);

        sort_entries(&mut entries);
        Ok(entries)
    }

    /// Raw signed sum of every entry dated on or before `day`.
    pub(crate) async fn balance(&self, day: NaiveDate) -> ResultLedger<Money> {
        self.sum_until(day, false).await
    }

    /// Same sum restricted to checked entries.
    ///
    /// Evaluated occurrences are unchecked unless a replacement exception
    /// marked them, so only rows and replacements contribute here.
    pub(crate) async fn checked_balance(&self, day: NaiveDate) -> ResultLedger<Money> {
        self.sum_until(day, true).await
    }

    async fn sum_until(&self, day: NaiveDate, checked_only: bool) -> ResultLedger<Money> {
        self.ensure_loaded().await?;

        let mut sum = Money::ZERO;
        for row in self.remote.entries_until(&self.account, day).await? {
            let entry = row.into_entry()?;
            if !checked_only || entry.checked {
                sum += entry.amount;
            }
        }

        let rules = self.cache.rules().await;
        for rule in rules.values() {
            for occurrence in rule.generate_occurrences(NaiveDate::MIN, day)? {
                if !checked_only || occurrence.checked {
                    sum += occurrence.amount;
                }
            }
        }
        Ok(sum)
    }

    /// True when the rule still evaluates at least one occurrence strictly
    /// before `date`.
    pub(crate) async fn has_entries_before(
        &self,
        rule_id: Uuid,
        date: NaiveDate,
    ) -> ResultLedger<bool> {
        self.ensure_loaded().await?;

        let rules = self.cache.rules().await;
        let rule = rules
            .get(&rule_id)
            .ok_or_else(|| LedgerError::RuleNotLoaded(rule_id.to_string()))?;

        let Some(day_before) = date.pred_opt() else {
            return Ok(false);
        };
        Ok(!rule.generate_occurrences(NaiveDate::MIN, day_before)?.is_empty())
    }
}
