//! Recurring rule primitives.
//!
//! A `RecurrenceRule` is the declarative form of a recurring expense: title,
//! amount, anchor date and an [`IntervalType`]. The offline engine flattens
//! it into concrete rows at persist time; the online engine stores it once
//! and evaluates occurrences lazily.
//!
//! [`IntervalType`]: crate::IntervalType

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{IntervalType, LedgerEntry, LedgerError, Money, RecurrenceLink, ResultLedger,
    util::parse_uuid};

/// A recurring expense rule.
///
/// `modified` is set once the rule's tail has been rewritten after creation,
/// so collaborators can tell an untouched rule from an edited one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub id: Option<Uuid>,
    pub title: String,
    pub amount: Money,
    pub anchor_date: NaiveDate,
    pub modified: bool,
    pub interval: IntervalType,
}

impl RecurrenceRule {
    pub fn new(
        title: impl Into<String>,
        amount: Money,
        anchor_date: NaiveDate,
        interval: IntervalType,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            amount,
            anchor_date,
            modified: false,
            interval,
        }
    }

    /// Returns the persisted id, or a precondition error when absent.
    pub fn require_id(&self) -> ResultLedger<Uuid> {
        self.id
            .ok_or_else(|| LedgerError::MissingId(format!("rule \"{}\"", self.title)))
    }

    /// Materializes the k-th occurrence of this rule as an unchecked entry.
    ///
    /// The entry inherits title and amount and links back through the
    /// occurrence date, which doubles as the stable `original_date`.
    pub fn occurrence(&self, k: u32) -> ResultLedger<LedgerEntry> {
        let rule_id = self.require_id()?;
        let date = self.interval.advance(self.anchor_date, k);
        Ok(LedgerEntry {
            id: None,
            title: self.title.clone(),
            amount: self.amount,
            date,
            checked: false,
            recurrence: Some(RecurrenceLink {
                rule_id,
                original_date: date,
            }),
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "rules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub amount_minor: i64,
    pub anchor_date: Date,
    pub modified: bool,
    pub interval_type: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::entry::Entity")]
    Entries,
}

impl Related<super::entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<&RecurrenceRule> for ActiveModel {
    type Error = LedgerError;

    fn try_from(rule: &RecurrenceRule) -> Result<Self, Self::Error> {
        let id = rule.require_id()?;
        Ok(Self {
            id: ActiveValue::Set(id.to_string()),
            title: ActiveValue::Set(rule.title.clone()),
            amount_minor: ActiveValue::Set(rule.amount.minor_units()),
            anchor_date: ActiveValue::Set(rule.anchor_date),
            modified: ActiveValue::Set(rule.modified),
            interval_type: ActiveValue::Set(rule.interval.as_str().to_string()),
        })
    }
}

impl TryFrom<Model> for RecurrenceRule {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Some(parse_uuid(&model.id, "rule")?),
            title: model.title,
            amount: Money::new(model.amount_minor),
            anchor_date: model.anchor_date,
            modified: model.modified,
            interval: IntervalType::try_from(model.interval_type.as_str())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occurrence_links_back_through_its_date() {
        let mut rule = RecurrenceRule::new(
            "Rent",
            Money::new(-1000),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            IntervalType::Monthly,
        );
        rule.id = Some(Uuid::new_v4());

        let third = rule.occurrence(1).unwrap();
        assert_eq!(third.date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        let link = third.recurrence.unwrap();
        assert_eq!(link.original_date, third.date);
        assert_eq!(link.rule_id, rule.id.unwrap());
        assert!(!third.checked);
        assert!(third.id.is_none());
    }

    #[test]
    fn occurrence_requires_persisted_rule() {
        let rule = RecurrenceRule::new(
            "Rent",
            Money::new(-1000),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            IntervalType::Monthly,
        );
        assert!(matches!(
            rule.occurrence(0),
            Err(LedgerError::MissingId(_))
        ));
    }
}
