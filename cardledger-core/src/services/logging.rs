//! Logging service - structured event logging to DuckDB
//!
//! Events are stored in logs.duckdb, separate from the ledger database.
//! PINs and verification codes are never logged, and card numbers only
//! ever appear masked.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::Utc;
use duckdb::types::Value;
use duckdb::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};

use crate::domain::card_number;
use crate::domain::UserId;
use crate::migrations::LOG_MIGRATIONS;
use crate::services::MigrationService;

/// Per-process sequence mixed into entry ids
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Millisecond timestamp in the upper 48 bits, sequence in the lower 16
fn next_entry_id(timestamp_ms: i64) -> u64 {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    ((timestamp_ms.max(0) as u64) << 16) | seq
}

/// Current unix time in milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Where an event was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Cli,
    Service,
}

impl EntryPoint {
    fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
            EntryPoint::Service => "service",
        }
    }
}

/// A log event to be recorded
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    /// Always masked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl LogEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            ..Self::default()
        }
    }

    /// Set the business operation the event belongs to
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id.get());
        self
    }

    /// Attach a card number; only the masked form is kept
    pub fn with_card(mut self, number: &str) -> Self {
        self.card_number = Some(card_number::mask(number));
        self
    }

    /// Message shown to whoever triggered the failure
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Underlying cause, kept for operators only
    pub fn with_error_details(mut self, details: impl Into<String>) -> Self {
        self.error_details = Some(details.into());
        self
    }
}

/// A log entry as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub operation: Option<String>,
    pub user_id: Option<i64>,
    pub card_number: Option<String>,
    pub error_message: Option<String>,
    pub error_details: Option<String>,
}

/// Which entries a query returns
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogFilter {
    #[default]
    All,
    /// Entries carrying an error message
    Errors,
    User(UserId),
    Event(String),
}

impl LogFilter {
    fn where_clause(&self) -> (&'static str, Vec<Value>) {
        match self {
            LogFilter::All => ("", vec![]),
            LogFilter::Errors => ("WHERE error_message IS NOT NULL", vec![]),
            LogFilter::User(id) => ("WHERE user_id = ?", vec![Value::BigInt(id.get())]),
            LogFilter::Event(name) => ("WHERE event = ?", vec![Value::Text(name.clone())]),
        }
    }
}

const ENTRY_COLUMNS: &str = "id, timestamp, entry_point, app_version, platform,
    event, operation, user_id, card_number, error_message, error_details";

fn read_entry(row: &duckdb::Row) -> duckdb::Result<LogEntry> {
    Ok(LogEntry {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        entry_point: row.get(2)?,
        app_version: row.get(3)?,
        platform: row.get(4)?,
        event: row.get(5)?,
        operation: row.get(6)?,
        user_id: row.get(7)?,
        card_number: row.get(8)?,
        error_message: row.get(9)?,
        error_details: row.get(10)?,
    })
}

/// Service for structured event logging
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
    entry_point: EntryPoint,
    app_version: String,
}

impl LoggingService {
    /// Open or create logs.duckdb in the data directory and run any
    /// pending log migrations
    pub fn new(
        data_dir: &Path,
        entry_point: EntryPoint,
        app_version: impl Into<String>,
    ) -> Result<Self> {
        let db_path = data_dir.join("logs.duckdb");
        let conn = Connection::open(&db_path)?;
        Self::with_connection(conn, Some(db_path), entry_point, app_version.into())
    }

    /// Log store that lives only as long as the service
    pub fn in_memory(entry_point: EntryPoint, app_version: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, None, entry_point, app_version.into())
    }

    fn with_connection(
        conn: Connection,
        db_path: Option<PathBuf>,
        entry_point: EntryPoint,
        app_version: String,
    ) -> Result<Self> {
        MigrationService::with_migrations(&conn, LOG_MIGRATIONS).run_pending()?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            entry_point,
            app_version,
        })
    }

    fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow!("Log store lock poisoned: {}", e))
    }

    /// Record an event, stamped with this service's entry point, version
    /// and the host platform
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let timestamp = now_ms();
        let conn = self.connection()?;
        conn.execute(
            r#"
            INSERT INTO sys_logs (
                id, timestamp, entry_point, app_version, platform,
                event, operation, user_id, card_number, error_message, error_details
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            duckdb::params![
                next_entry_id(timestamp),
                timestamp,
                self.entry_point.as_str(),
                &self.app_version,
                std::env::consts::OS,
                &event.event,
                &event.operation,
                &event.user_id,
                &event.card_number,
                &event.error_message,
                &event.error_details,
            ],
        )?;
        Ok(())
    }

    /// Record that a CLI command ran
    pub fn log_command(&self, command: &str) -> Result<()> {
        self.log(LogEvent::new("command_executed").with_operation(command))
    }

    /// Matching entries, newest first
    pub fn query(&self, filter: &LogFilter, limit: usize) -> Result<Vec<LogEntry>> {
        let (clause, mut values) = filter.where_clause();
        values.push(Value::BigInt(limit as i64));
        let sql = format!(
            "SELECT {} FROM sys_logs {} ORDER BY timestamp DESC, id DESC LIMIT ?",
            ENTRY_COLUMNS, clause
        );

        let conn = self.connection()?;
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params_from_iter(values), read_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn get_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query(&LogFilter::All, limit)
    }

    pub fn get_errors(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query(&LogFilter::Errors, limit)
    }

    /// Number of matching entries
    pub fn count(&self, filter: &LogFilter) -> Result<u64> {
        let (clause, values) = filter.where_clause();
        let sql = format!("SELECT COUNT(*) FROM sys_logs {}", clause);
        let conn = self.connection()?;
        let count: u64 = conn.query_row(&sql, params_from_iter(values), |row| row.get(0))?;
        Ok(count)
    }

    /// Delete entries older than `timestamp_ms` (unix ms), returning how
    /// many went
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.connection()?;
        let deleted = conn.execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    /// Path to the logs database, `None` when in memory
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn user(id: i64) -> UserId {
        UserId::new(id).unwrap()
    }

    #[test]
    fn test_log_store_file_is_created() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();
        assert!(service.db_path().unwrap().exists());
    }

    #[test]
    fn test_entries_are_stamped() {
        let service = LoggingService::in_memory(EntryPoint::Cli, "1.0.0").unwrap();
        service.log_command("card_issue").unwrap();

        let entries = service.get_recent(10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event, "command_executed");
        assert_eq!(entries[0].operation.as_deref(), Some("card_issue"));
        assert_eq!(entries[0].entry_point, "cli");
        assert_eq!(entries[0].app_version, "1.0.0");
        assert_eq!(entries[0].platform, std::env::consts::OS);
    }

    #[test]
    fn test_card_numbers_are_masked() {
        let service = LoggingService::in_memory(EntryPoint::Service, "2.0.0").unwrap();
        service
            .log(
                LogEvent::new("card_issued")
                    .with_operation("issue_card")
                    .with_user(user(42))
                    .with_card("253510000000421"),
            )
            .unwrap();

        let entries = service.get_recent(10).unwrap();
        assert_eq!(entries[0].user_id, Some(42));
        assert_eq!(entries[0].card_number.as_deref(), Some("25••••••••••421"));
        assert_eq!(entries[0].entry_point, "service");
    }

    #[test]
    fn test_filters() {
        let service = LoggingService::in_memory(EntryPoint::Service, "1.0.0").unwrap();
        service.log(LogEvent::new("card_issued").with_user(user(1))).unwrap();
        service.log(LogEvent::new("card_issued").with_user(user(2))).unwrap();
        service
            .log(
                LogEvent::new("operation_failed")
                    .with_user(user(2))
                    .with_error("Internal server error has occurred.")
                    .with_error_details("disk full"),
            )
            .unwrap();

        assert_eq!(service.count(&LogFilter::All).unwrap(), 3);
        assert_eq!(service.count(&LogFilter::Errors).unwrap(), 1);
        assert_eq!(service.count(&LogFilter::User(user(2))).unwrap(), 2);

        let issued = service
            .query(&LogFilter::Event("card_issued".to_string()), 10)
            .unwrap();
        assert_eq!(issued.len(), 2);

        let errors = service.get_errors(10).unwrap();
        assert_eq!(errors[0].error_details.as_deref(), Some("disk full"));
    }

    #[test]
    fn test_newest_first_and_limit() {
        let service = LoggingService::in_memory(EntryPoint::Cli, "1.0.0").unwrap();
        for name in ["first", "second", "third"] {
            service.log(LogEvent::new(name)).unwrap();
        }
        let entries = service.get_recent(2).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event, "third");
    }

    #[test]
    fn test_delete_before() {
        let service = LoggingService::in_memory(EntryPoint::Cli, "1.0.0").unwrap();
        service.log(LogEvent::new("old")).unwrap();
        service.log(LogEvent::new("older")).unwrap();

        assert_eq!(service.delete_before(0).unwrap(), 0);
        let deleted = service.delete_before(now_ms() + 1000).unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(service.count(&LogFilter::All).unwrap(), 0);
    }
}
