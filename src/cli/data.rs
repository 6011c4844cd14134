use super::ui;
use crate::app::{ExpenseTracker, Planner};
use crate::core::settings::Theme;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use comfy_table::Cell;
use std::path::Path;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportTarget {
    /// Todos as `{ todos, exportDate, version }`
    Todos,
    /// Expenses and settings as `{ expenses, settings, exportDate }`
    Expenses,
}

/// Writes `json` to `output`, or stdout when no path is given. Directories
/// get the default file name.
fn write_export(json: &str, output: Option<&Path>, file_name: &str) -> Result<()> {
    let Some(output) = output else {
        println!("{json}");
        return Ok(());
    };
    let path = if output.is_dir() {
        output.join(file_name)
    } else {
        output.to_path_buf()
    };
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write export to {}", path.display()))?;
    eprintln!("Saved {}", path.display());
    Ok(())
}

pub fn export_todos(
    planner: &mut Planner,
    output: Option<&Path>,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<()> {
    let json = planner.export(now)?;
    write_export(&json, output, &crate::core::todo::export_file_name(today))?;
    if output.is_some() {
        ui::print_notifications(planner.drain_notifications());
    }
    Ok(())
}

pub fn export_expenses(
    tracker: &ExpenseTracker,
    output: Option<&Path>,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<()> {
    let json = tracker.export(now)?;
    write_export(
        &json,
        output,
        &crate::core::expense::export_file_name(today),
    )
}

/// Shows the settings, applying any requested changes first.
pub async fn settings(
    tracker: &mut ExpenseTracker,
    theme: Option<Theme>,
    auto_update_rates: Option<bool>,
) -> Result<()> {
    if let Some(theme) = theme
        && tracker.settings().theme != theme
    {
        tracker.toggle_theme().await;
    }
    if let Some(enabled) = auto_update_rates {
        tracker.set_auto_update_rates(enabled).await;
    }
    ui::print_notifications(tracker.drain_notifications());

    let settings = tracker.settings();
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Setting"), ui::header_cell("Value")]);
    table.add_row(vec![
        Cell::new("Base currency"),
        Cell::new(&settings.base_currency),
    ]);
    table.add_row(vec![
        Cell::new("Update rates automatically"),
        Cell::new(if settings.auto_update_rates { "yes" } else { "no" }),
    ]);
    table.add_row(vec![Cell::new("Theme"), Cell::new(settings.theme)]);
    println!("{table}");
    Ok(())
}

pub async fn clear_data(tracker: &mut ExpenseTracker, confirmed: bool) -> Result<()> {
    if !confirmed {
        bail!("This deletes all expenses and resets settings; pass --yes to confirm");
    }
    let result = tracker.clear_data().await;
    ui::print_notifications(tracker.drain_notifications());
    result?;
    println!("All expense data cleared.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_export_to_directory() -> Result<()> {
        let dir = TempDir::new()?;
        write_export("{}", Some(dir.path()), "calender-todos-2024-01-01.json")?;
        let written = std::fs::read_to_string(dir.path().join("calender-todos-2024-01-01.json"))?;
        assert_eq!(written, "{}");

        let file = dir.path().join("custom.json");
        write_export("[]", Some(&file), "ignored.json")?;
        assert_eq!(std::fs::read_to_string(file)?, "[]");
        Ok(())
    }
}
