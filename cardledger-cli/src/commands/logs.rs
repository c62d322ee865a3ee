//! Logs command - view and manage application logs

use anyhow::{anyhow, Result};
use chrono::{TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use comfy_table::Cell;
use dialoguer::Confirm;
use serde_json::json;

use cardledger_core::services::logging::now_ms;
use cardledger_core::services::{EntryPoint, LogEntry, LogFilter, LoggingService};
use cardledger_core::UserId;

use super::get_data_dir;
use crate::output;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries (only the acting user's when --user is set)
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only errors
        #[arg(long, conflicts_with = "event")]
        errors: bool,
        /// Show only entries of this event, e.g. card_issued
        #[arg(long)]
        event: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear old log entries
    Clear {
        /// Delete logs older than N days
        #[arg(long, default_value = "30")]
        older_than_days: i64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show log statistics and database path
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn open_log_store() -> Result<LoggingService> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|at| output::format_time(&at))
        .unwrap_or_else(|| timestamp_ms.to_string())
}

fn list_filter(user: Option<i64>, errors: bool, event: Option<String>) -> Result<LogFilter> {
    if let Some(id) = user {
        let id = UserId::new(id).map_err(|e| anyhow!("{}", e))?;
        return Ok(LogFilter::User(id));
    }
    Ok(match (errors, event) {
        (true, _) => LogFilter::Errors,
        (false, Some(event)) => LogFilter::Event(event),
        (false, None) => LogFilter::All,
    })
}

fn print_entries(entries: &[LogEntry]) {
    let mut table = output::create_table();
    table.set_header(vec!["Time", "Entry", "Event", "Operation", "User", "Card", ""]);

    for entry in entries {
        let flag = if entry.error_message.is_some() {
            Cell::new("!").fg(comfy_table::Color::Red)
        } else {
            Cell::new("")
        };
        table.add_row(vec![
            Cell::new(format_timestamp(entry.timestamp)),
            Cell::new(&entry.entry_point),
            Cell::new(&entry.event),
            Cell::new(entry.operation.as_deref().unwrap_or("")),
            Cell::new(entry.user_id.map(|id| id.to_string()).unwrap_or_default()),
            Cell::new(entry.card_number.as_deref().unwrap_or("")),
            flag,
        ]);
    }
    println!("{}", table);

    let failures: Vec<_> = entries
        .iter()
        .filter(|e| e.error_message.is_some())
        .take(3)
        .collect();
    if !failures.is_empty() {
        println!();
        println!("{}", "Recent Errors:".red().bold());
        for entry in failures {
            let cause = entry
                .error_details
                .as_deref()
                .or(entry.error_message.as_deref())
                .unwrap_or("Unknown error");
            println!(
                "  {} [{}]: {}",
                format_timestamp(entry.timestamp).dimmed(),
                entry.event,
                cause
            );
        }
    }
}

pub fn run(user: Option<i64>, command: LogsCommands) -> Result<()> {
    let service = open_log_store()?;

    match command {
        LogsCommands::List {
            limit,
            errors,
            event,
            json,
        } => {
            let filter = list_filter(user, errors, event)?;
            let entries = service.query(&filter, limit)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No log entries found.");
            } else {
                print_entries(&entries);
            }
        }
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => {
            const DAY_MS: i64 = 24 * 60 * 60 * 1000;
            let cutoff_ms = now_ms() - older_than_days.max(0).saturating_mul(DAY_MS);

            if !force && !json {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Delete logs older than {} days?", older_than_days))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let deleted = service.delete_before(cutoff_ms)?;
            if json {
                println!("{}", json!({ "deleted": deleted }));
            } else {
                output::success(&format!("Deleted {} log entries", deleted));
            }
        }
        LogsCommands::Stats { json } => {
            let total = service.count(&LogFilter::All)?;
            let errors = service.count(&LogFilter::Errors)?;
            let db_path = service.db_path().map(|p| p.to_path_buf()).unwrap_or_default();
            let size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

            if json {
                println!(
                    "{}",
                    json!({
                        "total_entries": total,
                        "error_count": errors,
                        "database_path": db_path.to_string_lossy(),
                        "database_size_bytes": size_bytes
                    })
                );
            } else {
                println!("{}", "Log Statistics".bold());
                println!("  Total entries: {}", total);
                println!("  Errors: {}", errors);
                println!("  Database: {}", db_path.display());
                println!("  Size: {}", output::format_size(size_bytes));
            }
        }
    }

    Ok(())
}
