use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use daybook::cli::calendar::CalendarArgs;
use daybook::cli::data::ExportTarget;
use daybook::cli::expense::ExpenseAction;
use daybook::cli::todo::TodoAction;
use daybook::core::log::init_logging;
use daybook::core::report::ReportPeriod;
use daybook::core::settings::Theme;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for daybook::AppCommand {
    fn from(cmd: Commands) -> daybook::AppCommand {
        match cmd {
            Commands::Todos { action } => daybook::AppCommand::Todos(action),
            Commands::Calendar(args) => daybook::AppCommand::Calendar(args),
            Commands::Expenses { action } => daybook::AppCommand::Expenses(action),
            Commands::Dashboard => daybook::AppCommand::Dashboard,
            Commands::Rates { refresh } => daybook::AppCommand::Rates { refresh },
            Commands::Convert { amount, from, to } => {
                daybook::AppCommand::Convert { amount, from, to }
            }
            Commands::Report { period, output } => daybook::AppCommand::Report { period, output },
            Commands::Export { target, output } => daybook::AppCommand::Export { target, output },
            Commands::BaseCurrency { code } => daybook::AppCommand::BaseCurrency { code },
            Commands::Settings {
                theme,
                auto_update_rates,
            } => daybook::AppCommand::Settings {
                theme,
                auto_update_rates,
            },
            Commands::ClearData { yes } => daybook::AppCommand::ClearData { yes },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Manage calendar todos
    Todos {
        #[command(subcommand)]
        action: TodoAction,
    },
    /// Show a month with its todos or daily spending
    Calendar(CalendarArgs),
    /// Manage expenses
    Expenses {
        #[command(subcommand)]
        action: ExpenseAction,
    },
    /// Display spending totals and recent expenses
    Dashboard,
    /// Display exchange rates for the base currency
    Rates {
        /// Fetch new rates even if the cached ones are recent
        #[arg(short, long)]
        refresh: bool,
    },
    /// Convert an amount between currencies
    Convert {
        amount: f64,
        from: String,
        to: String,
    },
    /// Display a spending report, optionally saving it as CSV
    Report {
        /// week, month, quarter or year
        #[arg(short, long, default_value = "month")]
        period: ReportPeriod,
        /// CSV file or directory to write the report to
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export todos or expenses as JSON
    Export {
        #[arg(value_enum)]
        target: ExportTarget,
        /// File or directory to write to, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show or change the base currency
    BaseCurrency { code: Option<String> },
    /// Show or change settings
    Settings {
        /// light or dark
        #[arg(long)]
        theme: Option<Theme>,
        /// Refresh exchange rates automatically
        #[arg(long)]
        auto_update_rates: Option<bool>,
    },
    /// Delete all expenses and reset settings
    ClearData {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => daybook::cli::setup::setup(),
        Some(cmd) => daybook::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
