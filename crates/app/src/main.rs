use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use engine::{
    Currency, IntervalType, LedgerEntry, LedgerStore, Money, OfflineLedger, RecurrenceRule,
    TailUpdate,
};
use migration::{Migrator, MigratorTrait};
use settings::Database;
use uuid::Uuid;

mod settings;

#[derive(Parser, Debug)]
#[command(name = "scadenza")]
#[command(about = "Recurring-expense ledger (offline engine) over sqlite")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`,
    /// otherwise from `settings.toml`).
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Entry(Entry),
    Rule(Rule),
    /// Print a month view (entries and running balances, leeway included).
    Month(MonthArgs),
    /// Print the balance at a date.
    Balance(BalanceArgs),
}

#[derive(Args, Debug)]
struct Entry {
    #[command(subcommand)]
    command: EntryCommand,
}

#[derive(Subcommand, Debug)]
enum EntryCommand {
    /// Add a one-off entry (negative amount = expense).
    Add(EntryAddArgs),
    /// List entries in a range, newest first.
    List(EntryListArgs),
}

#[derive(Args, Debug)]
struct EntryAddArgs {
    #[arg(long)]
    title: String,
    /// Signed decimal amount, e.g. "-10.50".
    #[arg(long, value_parser = parse_money)]
    amount: Money,
    #[arg(long)]
    date: NaiveDate,
    #[arg(long)]
    checked: bool,
}

#[derive(Args, Debug)]
struct EntryListArgs {
    #[arg(long)]
    from: NaiveDate,
    #[arg(long)]
    to: NaiveDate,
    #[arg(long, default_value_t = 20)]
    limit: u64,
    /// Continuation cursor from a previous page.
    #[arg(long)]
    cursor: Option<String>,
}

#[derive(Args, Debug)]
struct Rule {
    #[command(subcommand)]
    command: RuleCommand,
}

#[derive(Subcommand, Debug)]
enum RuleCommand {
    /// Add a recurring rule and flatten its occurrences.
    Add(RuleAddArgs),
    /// Rewrite a rule's tail from a pivot date forward.
    Update(RuleUpdateArgs),
    /// Delete a rule (whole, or only its tail/head).
    Delete(RuleDeleteArgs),
}

#[derive(Args, Debug)]
struct RuleAddArgs {
    #[arg(long)]
    title: String,
    #[arg(long, value_parser = parse_money)]
    amount: Money,
    #[arg(long)]
    anchor: NaiveDate,
    /// One of: daily, weekly, bi_weekly, ter_weekly, four_weekly, monthly,
    /// bi_monthly, ter_monthly, six_monthly, yearly.
    #[arg(long, value_parser = parse_interval)]
    interval: IntervalType,
}

#[derive(Args, Debug)]
struct RuleUpdateArgs {
    #[arg(long, value_parser = parse_rule_id)]
    id: Uuid,
    #[arg(long)]
    pivot: NaiveDate,
    #[arg(long)]
    title: String,
    #[arg(long, value_parser = parse_money)]
    amount: Money,
    #[arg(long, value_parser = parse_interval)]
    interval: IntervalType,
}

#[derive(Args, Debug)]
struct RuleDeleteArgs {
    #[arg(long, value_parser = parse_rule_id)]
    id: Uuid,
    /// Delete only occurrences strictly after this date.
    #[arg(long, conflicts_with = "before")]
    after: Option<NaiveDate>,
    /// Delete only occurrences strictly before this date.
    #[arg(long)]
    before: Option<NaiveDate>,
}

#[derive(Args, Debug)]
struct MonthArgs {
    /// Month as `YYYY-MM`.
    #[arg(long, value_parser = parse_month)]
    month: NaiveDate,
}

#[derive(Args, Debug)]
struct BalanceArgs {
    #[arg(long)]
    date: NaiveDate,
}

fn parse_money(raw: &str) -> Result<Money, String> {
    raw.parse::<Money>().map_err(|err| err.to_string())
}

fn parse_interval(raw: &str) -> Result<IntervalType, String> {
    IntervalType::try_from(raw).map_err(|err| err.to_string())
}

fn parse_month(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d")
        .map_err(|_| format!("invalid month: {raw}"))
}

fn parse_rule_id(raw: &str) -> Result<Uuid, String> {
    Uuid::parse_str(raw).map_err(|_| format!("invalid rule id: {raw}"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "scadenza={level},engine={level},migration={level}",
            level = settings.app.level
        ))
        .init();

    let currency = Currency::try_from(settings.app.currency.as_str())?;
    let url = match cli.database_url {
        Some(url) => url,
        None => match &settings.database {
            Database::Memory => "sqlite::memory:".to_string(),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        },
    };

    let db = sea_orm::Database::connect(&url).await?;
    Migrator::up(&db, None).await?;
    tracing::info!("database ready at {url}");

    let ledger = OfflineLedger::builder()
        .database(db)
        .currency(currency)
        .build()
        .await?;

    match cli.command {
        Command::Entry(entry) => match entry.command {
            EntryCommand::Add(args) => {
                let mut draft = LedgerEntry::new(args.title, args.amount, args.date);
                draft.checked = args.checked;
                let entry = ledger.persist_entry(draft).await?;
                println!(
                    "added entry {} ({} on {})",
                    entry.require_id()?,
                    entry.amount.display_in(currency),
                    entry.date
                );
            }
            EntryCommand::List(args) => {
                let page = ledger
                    .entries_page(args.from, args.to, args.cursor.as_deref(), args.limit)
                    .await?;
                for entry in &page.entries {
                    let marker = if entry.checked { "x" } else { " " };
                    let kind = if entry.recurrence.is_some() { "R" } else { " " };
                    println!(
                        "[{marker}]{kind} {}  {:>12}  {}",
                        entry.date,
                        entry.amount.display_in(currency),
                        entry.title
                    );
                }
                if let Some(next) = page.next {
                    println!("next: --cursor {next}");
                }
            }
        },
        Command::Rule(rule) => match rule.command {
            RuleCommand::Add(args) => {
                let rule = ledger
                    .persist_rule(RecurrenceRule::new(
                        args.title,
                        args.amount,
                        args.anchor,
                        args.interval,
                    ))
                    .await?;
                println!(
                    "added rule {} ({} occurrences)",
                    rule.require_id()?,
                    rule.interval.occurrence_horizon()
                );
            }
            RuleCommand::Update(args) => {
                ledger
                    .update_rule_after_date(TailUpdate::new(
                        args.id,
                        args.pivot,
                        args.title,
                        args.amount,
                        args.interval,
                    ))
                    .await?;
                println!("rewrote rule {} from {}", args.id, args.pivot);
            }
            RuleCommand::Delete(args) => {
                let action = if let Some(after) = args.after {
                    ledger.delete_rule_entries_after(args.id, after).await?
                } else if let Some(before) = args.before {
                    if !ledger.has_entries_before(args.id, before).await? {
                        return Err(format!("no occurrence before {before}").into());
                    }
                    ledger.delete_rule_entries_before(args.id, before).await?
                } else {
                    ledger.delete_rule(args.id).await?
                };
                println!("deleted ({:?}); restore handle discarded", action.operation());
            }
        },
        Command::Month(args) => {
            let view = ledger.month_view(args.month).await?;
            for day in view.days.values() {
                if day.entries.is_empty() {
                    continue;
                }
                println!("{}  balance {}", day.day, day.balance.display_in(currency));
                for entry in &day.entries {
                    println!("    {:>12}  {}", entry.amount.display_in(currency), entry.title);
                }
            }
        }
        Command::Balance(args) => {
            let balance = ledger.balance(args.date).await?;
            let checked = ledger.checked_balance(args.date).await?;
            println!(
                "balance {}  checked {}",
                balance.display_in(currency),
                checked.display_in(currency)
            );
        }
    }

    Ok(())
}
