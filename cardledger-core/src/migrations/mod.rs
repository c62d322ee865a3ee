//! Embedded SQL migrations for the ledger and the log store
//!
//! Each set is applied in order by [`MigrationService`](crate::services::MigrationService)
//! and recorded in `sys_migrations` of its own database. Both sets share the
//! bookkeeping table definition.

const BOOKKEEPING: (&str, &str) = ("000_migrations.sql", include_str!("000_migrations.sql"));

/// Ledger database (`cardledger.duckdb`). Append new files as NNN_description.sql.
pub const MIGRATIONS: &[(&str, &str)] = &[
    BOOKKEEPING,
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];

/// Log database (`logs.duckdb`)
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    BOOKKEEPING,
    (
        "001_initial_schema.sql",
        include_str!("logs/001_initial_schema.sql"),
    ),
];
