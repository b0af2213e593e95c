//! The module contains the `LedgerEntry` type, one dated movement of money.
//!
//! Both one-off entries and generated occurrences of a recurring rule are
//! represented by `LedgerEntry`; the latter carry a [`RecurrenceLink`] back
//! to the rule that produced them.
use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, Money, ResultLedger, util::parse_uuid};

/// Link from a generated entry back to its recurring rule.
///
/// `original_date` is the date the occurrence would fall on before any
/// per-occurrence edit. It never changes and is the only stable key
/// exceptions can be filed under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceLink {
    pub rule_id: Uuid,
    pub original_date: NaiveDate,
}

/// A dated monetary entry.
///
/// The amount sign follows the ledger convention: negative = outgoing
/// expense, positive = incoming revenue. `id` is absent until the entry has
/// been persisted; occurrences synthesized by the online evaluator never get
/// one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Option<Uuid>,
    pub title: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub checked: bool,
    pub recurrence: Option<RecurrenceLink>,
}

impl LedgerEntry {
    pub fn new(title: impl Into<String>, amount: Money, date: NaiveDate) -> Self {
        Self {
            id: None,
            title: title.into(),
            amount,
            date,
            checked: false,
            recurrence: None,
        }
    }

    /// Returns the persisted id, or a precondition error when absent.
    pub fn require_id(&self) -> ResultLedger<Uuid> {
        self.id
            .ok_or_else(|| LedgerError::MissingId(format!("entry \"{}\"", self.title)))
    }
}

/// Deterministic ordering used by day views and the equivalence contract:
/// `(date, title, id)`.
pub(crate) fn sort_entries(entries: &mut [LedgerEntry]) {
    entries.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub amount_minor: i64,
    pub date: Date,
    pub checked: bool,
    pub rule_id: Option<String>,
    pub original_date: Option<Date>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::recurring::Entity",
        from = "Column::RuleId",
        to = "super::recurring::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Rules,
}

impl Related<super::recurring::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rules.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<&LedgerEntry> for ActiveModel {
    type Error = LedgerError;

    fn try_from(entry: &LedgerEntry) -> Result<Self, Self::Error> {
        let id = entry.require_id()?;
        Ok(Self {
            id: ActiveValue::Set(id.to_string()),
            title: ActiveValue::Set(entry.title.clone()),
            amount_minor: ActiveValue::Set(entry.amount.minor_units()),
            date: ActiveValue::Set(entry.date),
            checked: ActiveValue::Set(entry.checked),
            rule_id: ActiveValue::Set(entry.recurrence.map(|link| link.rule_id.to_string())),
            original_date: ActiveValue::Set(entry.recurrence.map(|link| link.original_date)),
        })
    }
}

impl TryFrom<Model> for LedgerEntry {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let recurrence = match (model.rule_id, model.original_date) {
            (Some(rule_id), Some(original_date)) => Some(RecurrenceLink {
                rule_id: parse_uuid(&rule_id, "rule")?,
                original_date,
            }),
            (None, None) => None,
            _ => {
                return Err(LedgerError::KeyNotFound(format!(
                    "entry {} has a partial recurrence link",
                    model.id
                )));
            }
        };

        Ok(Self {
            id: Some(parse_uuid(&model.id, "entry")?),
            title: model.title,
            amount: Money::new(model.amount_minor),
            date: model.date,
            checked: model.checked,
            recurrence,
        })
    }
}
