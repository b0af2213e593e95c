use base64::Engine as _;
use chrono::NaiveDate;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Statement,
};
use serde::{Deserialize, Serialize};

use crate::{LedgerEntry, LedgerError, Money, ResultLedger, entry, entry::sort_entries};

use super::OfflineLedger;

/// One page of entries, newest first, with an opaque continuation cursor.
#[derive(Clone, Debug)]
pub struct EntriesPage {
    pub entries: Vec<LedgerEntry>,
    pub next: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct EntriesCursor {
    date: NaiveDate,
    entry_id: String,
}

impl EntriesCursor {
    fn encode(&self) -> ResultLedger<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| LedgerError::InvalidCursor("invalid entries cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultLedger<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| LedgerError::InvalidCursor("invalid entries cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| LedgerError::InvalidCursor("invalid entries cursor".to_string()))
    }
}

impl OfflineLedger {
    pub(crate) async fn entries_for_day(&self, day: NaiveDate) -> ResultLedger<Vec<LedgerEntry>> {
        self.entries_for_range(day, day).await
    }

    pub(crate) async fn entries_for_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultLedger<Vec<LedgerEntry>> {
        let models = entry::Entity::find()
            .filter(entry::Column::Date.gte(from))
            .filter(entry::Column::Date.lte(to))
            .all(self.database())
            .await?;

        let mut entries = models
            .into_iter()
            .map(LedgerEntry::try_from)
            .collect::<ResultLedger<Vec<_>>>()?;
        sort_entries(&mut entries);
        Ok(entries)
    }

    /// Raw signed sum of all entries dated on or before `day`.
    pub(crate) async fn balance(&self, day: NaiveDate) -> ResultLedger<Money> {
        self.sum_until(day, false).await
    }

    /// Same sum restricted to checked entries.
    pub(crate) async fn checked_balance(&self, day: NaiveDate) -> ResultLedger<Money> {
        self.sum_until(day, true).await
    }

    async fn sum_until(&self, day: NaiveDate, checked_only: bool) -> ResultLedger<Money> {
        let backend = self.database().get_database_backend();
        let checked_cond = if checked_only { " AND checked = ?" } else { "" };

        let stmt = Statement::from_sql_and_values(
            backend,
            format!(
                "SELECT COALESCE(SUM(amount_minor), 0) AS sum \
                 FROM entries \
                 WHERE date <= ?{checked_cond}"
            ),
            {
                let mut values = vec![day.into()];
                if checked_only {
                    values.push(true.into());
                }
                values
            },
        );
        let row = self.database().query_one(stmt).await?;
        let sum: i64 = row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0);
        Ok(Money::new(sum))
    }

    /// Lists entries in `[from, to]` newest → oldest with cursor-based
    /// pagination by `(date DESC, id DESC)`.
    pub async fn entries_page(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        cursor: Option<&str>,
        limit: u64,
    ) -> ResultLedger<EntriesPage> {
        let mut query = entry::Entity::find()
            .filter(entry::Column::Date.gte(from))
            .filter(entry::Column::Date.lte(to))
            .order_by_desc(entry::Column::Date)
            .order_by_desc(entry::Column::Id)
            .limit(limit + 1);

        if let Some(cursor) = cursor {
            let cursor = EntriesCursor::decode(cursor)?;
            query = query.filter(
                Condition::any()
                    .add(entry::Column::Date.lt(cursor.date))
                    .add(
                        Condition::all()
                            .add(entry::Column::Date.eq(cursor.date))
                            .add(entry::Column::Id.lt(cursor.entry_id)),
                    ),
            );
        }

        let mut models = query.all(self.database()).await?;
        let next = if models.len() as u64 > limit {
            models.truncate(limit as usize);
            match models.last() {
                Some(last) => Some(
                    EntriesCursor {
                        date: last.date,
                        entry_id: last.id.clone(),
                    }
                    .encode()?,
                ),
                None => None,
            }
        } else {
            None
        };

        let entries = models
            .into_iter()
            .map(LedgerEntry::try_from)
            .collect::<ResultLedger<Vec<_>>>()?;
        Ok(EntriesPage { entries, next })
    }
}
