use clap::Parser;
use finance_manager::args::{Args, Command, InsertSubcommand};
use finance_manager::{commands, Config, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// The tracing target of everything logged by the library.
const LIB_CRATE_NAME: &str = "finance_manager";

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().finman_home().path();

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Init => commands::init(home).await?.print(),

        Command::Insert(insert_args) => {
            let config = Config::load(home).await?;
            match insert_args.record() {
                InsertSubcommand::Expense(args) => {
                    commands::insert_expense(config, args.clone())
                        .await?
                        .print()
                }
                InsertSubcommand::Income(args) => commands::insert_income(config, args.clone())
                    .await?
                    .print(),
            }
        }

        Command::Records(records_args) => {
            let config = Config::load(home).await?;
            commands::records(config, records_args.clone())
                .await?
                .print()
        }

        Command::Window(window_args) => {
            let config = Config::load(home).await?;
            commands::window(config, window_args.clone()).await?.print()
        }

        Command::Series(series_args) => {
            let config = Config::load(home).await?;
            commands::series(config, series_args.clone()).await?.print()
        }

        Command::Periods(periods_args) => commands::periods(periods_args.clone()).await?.print(),
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for the library and this binary only.
            EnvFilter::new(format!(
                "{}={level},{}={level}",
                LIB_CRATE_NAME,
                env!("CARGO_BIN_NAME"),
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
