//! Initial schema migration - creates all tables from scratch.
//!
//! The offline engine's relational layout:
//!
//! - `rules`: one row per recurring expense rule
//! - `entries`: every ledger entry, materialized occurrences included
//!   (`rule_id`/`original_date` link them back to their rule)

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub enum Rules {
    Table,
    Id,
    Title,
    AmountMinor,
    AnchorDate,
    Modified,
    IntervalType,
}

#[derive(Iden)]
pub enum Entries {
    Table,
    Id,
    Title,
    AmountMinor,
    Date,
    Checked,
    RuleId,
    OriginalDate,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Rules::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Rules::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Rules::Title).string().not_null())
                    .col(ColumnDef::new(Rules::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Rules::AnchorDate).date().not_null())
                    .col(ColumnDef::new(Rules::Modified).boolean().not_null())
                    .col(ColumnDef::new(Rules::IntervalType).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Entries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Entries::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Entries::Title).string().not_null())
                    .col(
                        ColumnDef::new(Entries::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Entries::Date).date().not_null())
                    .col(ColumnDef::new(Entries::Checked).boolean().not_null())
                    .col(ColumnDef::new(Entries::RuleId).string())
                    .col(ColumnDef::new(Entries::OriginalDate).date())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-entries-rule_id")
                            .from(Entries::Table, Entries::RuleId)
                            .to(Rules::Table, Rules::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-entries-date")
                    .table(Entries::Table)
                    .col(Entries::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-entries-rule_id-date")
                    .table(Entries::Table)
                    .col(Entries::RuleId)
                    .col(Entries::Date)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Entries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Rules::Table).to_owned())
            .await?;
        Ok(())
    }
}
