//! CLI command implementations

pub mod balance;
pub mod card;
pub mod logs;
pub mod transfer;
pub mod user;

use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;

use cardledger_core::services::EntryPoint;
use cardledger_core::BankContext;

use crate::notifier::ConsoleNotifier;

/// Get the data directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("CARDLEDGER_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".cardledger"))
        .ok_or_else(|| anyhow!("Could not find home directory; set CARDLEDGER_DIR"))
}

/// Open the ledger for a CLI command
pub fn get_context() -> Result<BankContext> {
    let data_dir = get_data_dir()?;
    BankContext::with_fallback_notifier(&data_dir, EntryPoint::Cli, Arc::new(ConsoleNotifier))
        .with_context(|| format!("Failed to open ledger in {}", data_dir.display()))
}

/// The acting user, which every card and money command needs
pub fn require_user(user: Option<i64>) -> Result<i64> {
    user.ok_or_else(|| anyhow!("No user selected. Pass --user <ID> or set CARDLEDGER_USER."))
}

/// Log the command, pass the result through the boundary guard and print it.
///
/// With `json` the whole operation result is printed and a failure exits
/// with status 1. Otherwise `render` prints the data and a failure becomes
/// the command error.
pub fn report<T, F>(
    ctx: &BankContext,
    operation: &str,
    result: cardledger_core::domain::result::Result<T>,
    json: bool,
    render: F,
) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&T),
{
    let _ = ctx.logger.log_command(operation);
    let outcome = ctx.guard(operation, result);

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        if !outcome.success {
            exit(1);
        }
        return Ok(());
    }

    match &outcome.data {
        Some(data) => {
            render(data);
            Ok(())
        }
        None => bail!(
            "{}",
            outcome.error_message().unwrap_or("Operation failed")
        ),
    }
}
