//! These structs provide the CLI interface for the finman CLI.

use crate::model::{Amount, ExpenseBreakdown, IncomeSources, Month, RecordKind};
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// finman: A command-line tool for recording monthly expenses and income.
///
/// Records are kept in a local SQLite database. Each record belongs to a calendar month and
/// holds one amount per category. The `series` command lines expenses and income up month by
/// month over a rolling window, 12 months by default.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory, the configuration file and the database.
    ///
    /// This is the first command you should run. By default the data directory is $HOME/finman;
    /// pass --finman-home or set FINMAN_HOME to put it somewhere else.
    Init,
    /// Record an expense or an income for a month.
    Insert(InsertArgs),
    /// List every expense or income record, most recent first.
    Records(RecordsArgs),
    /// List the most recent records up to and including a month.
    Window(WindowArgs),
    /// Show monthly expense and income totals over a window of months.
    Series(SeriesArgs),
    /// List the months that can be chosen as the end of a window.
    Periods(PeriodsArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG. See the tracing-subscriber crate for instructions.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where finman data and configuration is held. Defaults to ~/finman
    #[arg(long, env = "FINMAN_HOME", default_value_t = default_finman_home())]
    finman_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, finman_home: PathBuf) -> Self {
        Self {
            log_level,
            finman_home: finman_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn finman_home(&self) -> &DisplayPath {
        &self.finman_home
    }
}

/// Args for the `finman insert` command.
#[derive(Debug, Parser, Clone)]
pub struct InsertArgs {
    #[command(subcommand)]
    record: InsertSubcommand,
}

impl InsertArgs {
    pub fn new(record: InsertSubcommand) -> Self {
        Self { record }
    }

    pub fn record(&self) -> &InsertSubcommand {
        &self.record
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum InsertSubcommand {
    /// Record the expenses of a month. Categories that are left out are zero.
    Expense(ExpenseArgs),
    /// Record the income of a month. Sources that are left out are zero.
    Income(IncomeArgs),
}

/// Args for `finman insert expense`.
#[derive(Debug, Parser, Clone)]
pub struct ExpenseArgs {
    /// The month of the expense, as yyyy-MM or yyyy-MM-dd. The day is ignored.
    #[arg(long)]
    date: Month,
    #[arg(long, default_value = "0")]
    housing: Amount,
    #[arg(long, default_value = "0")]
    food: Amount,
    #[arg(long, default_value = "0")]
    going_out: Amount,
    #[arg(long, default_value = "0")]
    transportation: Amount,
    #[arg(long, default_value = "0")]
    travel: Amount,
    #[arg(long, default_value = "0")]
    tax: Amount,
    #[arg(long, default_value = "0")]
    other: Amount,
}

impl ExpenseArgs {
    pub fn new(date: Month, breakdown: ExpenseBreakdown) -> Self {
        Self {
            date,
            housing: breakdown.housing,
            food: breakdown.food,
            going_out: breakdown.going_out,
            transportation: breakdown.transportation,
            travel: breakdown.travel,
            tax: breakdown.tax,
            other: breakdown.other,
        }
    }

    pub fn date(&self) -> Month {
        self.date
    }

    pub fn breakdown(&self) -> ExpenseBreakdown {
        ExpenseBreakdown {
            housing: self.housing,
            food: self.food,
            going_out: self.going_out,
            transportation: self.transportation,
            travel: self.travel,
            tax: self.tax,
            other: self.other,
        }
    }
}

/// Args for `finman insert income`.
#[derive(Debug, Parser, Clone)]
pub struct IncomeArgs {
    /// The month of the income, as yyyy-MM or yyyy-MM-dd. The day is ignored.
    #[arg(long)]
    date: Month,
    #[arg(long, default_value = "0")]
    salary: Amount,
    /// Help received from family or others. Spelled `--help-amount` to stay clear of `--help`.
    #[arg(id = "help_amount", long = "help-amount", default_value = "0")]
    help: Amount,
    #[arg(long, default_value = "0")]
    entrepreneur: Amount,
    #[arg(long, default_value = "0")]
    passive: Amount,
    #[arg(long, default_value = "0")]
    other: Amount,
}

impl IncomeArgs {
    pub fn new(date: Month, sources: IncomeSources) -> Self {
        Self {
            date,
            salary: sources.salary,
            help: sources.help,
            entrepreneur: sources.entrepreneur,
            passive: sources.passive,
            other: sources.other,
        }
    }

    pub fn date(&self) -> Month {
        self.date
    }

    pub fn sources(&self) -> IncomeSources {
        IncomeSources {
            salary: self.salary,
            help: self.help,
            entrepreneur: self.entrepreneur,
            passive: self.passive,
            other: self.other,
        }
    }
}

/// Args for the `finman records` command.
#[derive(Debug, Parser, Clone)]
pub struct RecordsArgs {
    /// Either expense or income.
    kind: RecordKind,
}

impl RecordsArgs {
    pub fn new(kind: RecordKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }
}

/// Args for the `finman window` command.
#[derive(Debug, Parser, Clone)]
pub struct WindowArgs {
    /// Either expense or income.
    kind: RecordKind,

    /// The last month to include, as yyyy-MM. Defaults to the current month.
    #[arg(long)]
    anchor: Option<Month>,

    /// The maximum number of records to list. Defaults to `window_months` from the config file.
    #[arg(long)]
    months: Option<u32>,
}

impl WindowArgs {
    pub fn new(kind: RecordKind, anchor: Option<Month>, months: Option<u32>) -> Self {
        Self {
            kind,
            anchor,
            months,
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn anchor(&self) -> Option<Month> {
        self.anchor
    }

    pub fn months(&self) -> Option<u32> {
        self.months
    }
}

/// Args for the `finman series` command.
#[derive(Debug, Parser, Clone)]
pub struct SeriesArgs {
    /// The last month of the window, as yyyy-MM. Defaults to the current month.
    #[arg(long)]
    anchor: Option<Month>,

    /// The number of months in the window. Defaults to `window_months` from the config file.
    #[arg(long, allow_negative_numbers = true)]
    months: Option<i64>,
}

impl SeriesArgs {
    pub fn new(anchor: Option<Month>, months: Option<i64>) -> Self {
        Self { anchor, months }
    }

    pub fn anchor(&self) -> Option<Month> {
        self.anchor
    }

    pub fn months(&self) -> Option<i64> {
        self.months
    }
}

/// Args for the `finman periods` command.
#[derive(Debug, Parser, Clone)]
pub struct PeriodsArgs {
    /// The most recent month to offer, as yyyy-MM. Defaults to the current month.
    #[arg(long)]
    anchor: Option<Month>,

    /// How many months to list.
    #[arg(long, default_value_t = 12)]
    count: u32,
}

impl PeriodsArgs {
    pub fn new(anchor: Option<Month>, count: u32) -> Self {
        Self { anchor, count }
    }

    pub fn anchor(&self) -> Option<Month> {
        self.anchor
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

fn default_finman_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("finman"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --finman-home or FINMAN_HOME instead of relying on the default \
                finman home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("finman")
        }
    })
}

/// A `PathBuf` that implements `Display` so that clap can show it as a default value.
#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
