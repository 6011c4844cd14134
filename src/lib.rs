pub mod app;
pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::app::{ExpenseTracker, Planner};
use crate::cli::calendar::CalendarArgs;
use crate::cli::data::ExportTarget;
use crate::cli::expense::ExpenseAction;
use crate::cli::todo::TodoAction;
use crate::core::Storage;
use crate::core::config::AppConfig;
use crate::core::report::ReportPeriod;
use crate::core::settings::{Settings, Theme};
use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum AppCommand {
    Todos(TodoAction),
    Calendar(CalendarArgs),
    Expenses(ExpenseAction),
    Dashboard,
    Rates {
        refresh: bool,
    },
    Convert {
        amount: f64,
        from: String,
        to: String,
    },
    Report {
        period: ReportPeriod,
        output: Option<PathBuf>,
    },
    Export {
        target: ExportTarget,
        output: Option<PathBuf>,
    },
    BaseCurrency {
        code: Option<String>,
    },
    Settings {
        theme: Option<Theme>,
        auto_update_rates: Option<bool>,
    },
    ClearData {
        yes: bool,
    },
}

/// Wall-clock instant a command runs at, plus the local calendar day.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    pub now: DateTime<Utc>,
    pub today: NaiveDate,
}

impl Clock {
    pub fn system() -> Self {
        Clock {
            now: Utc::now(),
            today: Local::now().date_naive(),
        }
    }
}

async fn open_tracker(config: &AppConfig, storage: Arc<dyn Storage>) -> Result<ExpenseTracker> {
    let provider =
        providers::ExchangeRateApiProvider::new(config.providers.exchange_rate_url())?;
    let defaults = Settings {
        base_currency: config.currency.to_uppercase(),
        auto_update_rates: config.auto_update_rates,
        ..Settings::default()
    };
    Ok(ExpenseTracker::load(storage, Arc::new(provider), defaults).await)
}

pub async fn run_command(cmd: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let data_path = config.data_path()?;
    let storage: Arc<dyn Storage> = Arc::new(store::DiskStorage::open(&data_path)?);
    execute(cmd, &config, storage, Clock::system()).await
}

/// Runs a command against an already opened store.
pub async fn execute(
    cmd: AppCommand,
    config: &AppConfig,
    storage: Arc<dyn Storage>,
    clock: Clock,
) -> Result<()> {
    let Clock { now, today } = clock;
    info!("Running {:?}", cmd);

    match cmd {
        AppCommand::Todos(action) => {
            let mut planner = Planner::load(storage).await;
            cli::todo::run(&mut planner, action, today, now).await
        }
        AppCommand::Calendar(args) => {
            let (year, month) = args.resolve(today)?;
            if args.spending {
                let mut tracker = open_tracker(config, storage).await?;
                cli::rates::refresh(&mut tracker, now, false).await;
                let (grid, days) = tracker.spending_calendar(year, month, today)?;
                println!(
                    "{}",
                    cli::calendar::display_spending_month(&grid, &days, tracker.base_currency())
                );
                cli::ui::print_notifications(tracker.drain_notifications());
            } else {
                let planner = Planner::load(storage).await;
                let (grid, days) = planner.month_view(year, month, today)?;
                println!("{}", cli::calendar::display_todo_month(&grid, &days));
            }
            Ok(())
        }
        AppCommand::Export {
            target: ExportTarget::Todos,
            output,
        } => {
            let mut planner = Planner::load(storage).await;
            cli::data::export_todos(&mut planner, output.as_deref(), today, now)
        }
        cmd => {
            let mut tracker = open_tracker(config, storage).await?;
            run_tracker_command(&mut tracker, cmd, today, now).await
        }
    }
}

async fn run_tracker_command(
    tracker: &mut ExpenseTracker,
    cmd: AppCommand,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<()> {
    match cmd {
        AppCommand::Expenses(action) => {
            cli::rates::refresh(tracker, now, false).await;
            cli::expense::run(tracker, action, today, now).await
        }
        AppCommand::Dashboard => {
            cli::rates::refresh(tracker, now, false).await;
            cli::ui::print_notifications(tracker.drain_notifications());
            cli::expense::display_dashboard(tracker, today);
            Ok(())
        }
        AppCommand::Rates { refresh } => {
            cli::rates::refresh(tracker, now, refresh).await;
            cli::ui::print_notifications(tracker.drain_notifications());
            println!("{}", cli::rates::display_rates(tracker));
            Ok(())
        }
        AppCommand::Convert { amount, from, to } => {
            cli::rates::refresh(tracker, now, false).await;
            cli::ui::print_notifications(tracker.drain_notifications());
            println!(
                "{}",
                cli::rates::display_conversion(
                    tracker,
                    amount,
                    &from.to_uppercase(),
                    &to.to_uppercase()
                )
            );
            Ok(())
        }
        AppCommand::Report { period, output } => {
            cli::rates::refresh(tracker, now, false).await;
            cli::report::run(tracker, period, output.as_deref(), today, now)
        }
        AppCommand::Export { output, .. } => {
            cli::data::export_expenses(tracker, output.as_deref(), today, now)
        }
        AppCommand::BaseCurrency { code } => cli::rates::base_currency(tracker, code, now).await,
        AppCommand::Settings {
            theme,
            auto_update_rates,
        } => cli::data::settings(tracker, theme, auto_update_rates).await,
        AppCommand::ClearData { yes } => cli::data::clear_data(tracker, yes).await,
        AppCommand::Todos(_) | AppCommand::Calendar(_) => {
            unreachable!("Planner commands are handled before the tracker is opened")
        }
    }
}
