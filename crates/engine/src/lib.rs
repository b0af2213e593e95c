//! Scadenza ledger engine.
//!
//! Turns declarative recurring-expense rules into a consistent, queryable
//! ledger of dated monetary entries, under two interchangeable storage
//! strategies with equivalent observable results:
//!
//! - [`OfflineLedger`] eagerly materializes every occurrence as a concrete
//!   row in relational storage, bounded by a type-dependent horizon;
//! - [`OnlineLedger`] stores one rule plus a sparse exception set per
//!   recurring expense and evaluates occurrences lazily per date range.
//!
//! Both implement [`LedgerStore`]; collaborators never depend on which
//! engine backs the ledger. Amounts are integer minor units end to end
//! ([`Money`]); destructive mutations hand back a replayable
//! [`RestoreAction`]; every mutation is announced on the change stream.

pub use aggregate::{DayView, LEEWAY_DAYS, MonthView};
pub use commands::TailUpdate;
pub use currency::Currency;
pub use entry::{LedgerEntry, RecurrenceLink};
pub use error::LedgerError;
pub use events::{ChangeStream, LedgerChange};
pub use interval::{Frequency, IntervalType, RecurrenceStep};
pub use money::{Money, decode_from_minor_units, encode_to_minor_units, two_decimal_string};
pub use offline::{EntriesPage, OfflineLedger, OfflineLedgerBuilder};
pub use online::{Account, EntryRow, OnlineLedger, OnlineLedgerBuilder, RemoteStore, RuleRow};
pub use recurrence::{Exception, RecurrenceDef, StoredRule};
pub use recurring::RecurrenceRule;
pub use restore::{RestoreAction, RestorePayload, RestoredOperation};
pub use store::LedgerStore;

pub(crate) use events::ChangeHub;

mod aggregate;
mod commands;
mod currency;
mod entry;
mod error;
mod events;
mod interval;
mod money;
mod offline;
mod online;
mod recurrence;
mod recurring;
mod restore;
mod store;
mod util;

pub type ResultLedger<T> = Result<T, LedgerError>;
