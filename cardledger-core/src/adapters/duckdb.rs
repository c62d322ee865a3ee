//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use duckdb::{params, Connection};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Card, CardBalance, CardStatus, CardType, Currency, Transaction, User, UserId};
use crate::ports::{Change, Repository};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

const CARD_COLUMNS: &str = "card_id, card_number, card_type, status, verification_code,
    expire_date::VARCHAR, withdrawn_today::VARCHAR, withdrawal_limit::VARCHAR,
    transacted_today::VARCHAR, transaction_limit::VARCHAR, last_transaction_at::VARCHAR,
    user_id, created_at::VARCHAR";

const BALANCE_COLUMNS: &str = "balance_id, currency, amount::VARCHAR, card_id";

const TRANSACTION_COLUMNS: &str = "transaction_id, kind, amount::VARCHAR, sender_currency,
    receiver_currency, occurred_at::VARCHAR, description, sender_card_id, receiver_card_id,
    sender_balance_id, receiver_balance_id";

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) a database file
    ///
    /// Retries with exponential backoff while another process holds the
    /// file lock.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[cardledger] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; nothing here needs an extension
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Path of the database file, `None` when in memory
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    fn query_cards(&self, where_clause: &str, args: &[&dyn duckdb::ToSql]) -> Result<Vec<Card>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM sys_cards {}", CARD_COLUMNS, where_clause);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(args, CardRow::read)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(CardRow::into_card).collect()
    }

    fn query_balances(&self, where_clause: &str, args: &[&dyn duckdb::ToSql]) -> Result<Vec<CardBalance>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM sys_card_balances {}", BALANCE_COLUMNS, where_clause);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(args, BalanceRow::read)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(BalanceRow::into_balance).collect()
    }
}

impl Repository for DuckDbRepository {
    // === Users ===

    fn find_user(&self, id: UserId) -> Result<Option<User>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, email, pin_hash, created_at::VARCHAR FROM sys_users WHERE user_id = ?",
        )?;
        let rows = stmt
            .query_map([id.get()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        match rows.into_iter().next() {
            Some((user_id, email, pin_hash, created_at)) => Ok(Some(User {
                id: UserId::new(user_id)?,
                email,
                pin_hash,
                created_at: parse_timestamp(&created_at)?,
            })),
            None => Ok(None),
        }
    }

    fn create_user(&self, email: &str) -> Result<User> {
        let conn = self.lock()?;
        let next: i64 = conn.query_row("SELECT nextval('users_id_seq')", [], |row| row.get(0))?;
        let id = UserId::new(next)?;
        let created_at = Utc::now();

        conn.execute(
            "INSERT INTO sys_users (user_id, email, pin_hash, created_at)
             VALUES (?, ?, NULL, CAST(? AS TIMESTAMP))",
            params![id.get(), email, format_timestamp(&created_at)],
        )
        .map_err(|e| {
            let err = Error::from(e);
            if err.is_unique_violation() {
                Error::validation(format!("email already registered: {}", email))
            } else {
                err
            }
        })?;

        Ok(User {
            id,
            email: email.to_string(),
            pin_hash: None,
            created_at,
        })
    }

    // === Cards ===

    fn find_card(&self, number: &str, owner: UserId) -> Result<Option<Card>> {
        let cards = self.query_cards(
            "WHERE card_number = ? AND user_id = ?",
            &[&number.to_string(), &owner.get()],
        )?;
        Ok(cards.into_iter().next())
    }

    fn find_card_owner(&self, number: &str) -> Result<Option<UserId>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT user_id FROM sys_cards WHERE card_number = ?")?;
        let ids = stmt
            .query_map([number], |row| row.get::<_, i64>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        ids.into_iter().next().map(UserId::new).transpose()
    }

    fn card_number_exists(&self, number: &str) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sys_cards WHERE card_number = ?",
            [number],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn count_active_cards(&self, owner: UserId) -> Result<u32> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sys_cards WHERE user_id = ? AND status <> 'Expired'",
            [owner.get()],
            |row| row.get(0),
        )?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    fn list_cards(&self, owner: UserId) -> Result<Vec<Card>> {
        self.query_cards("WHERE user_id = ? ORDER BY created_at", &[&owner.get()])
    }

    fn cards_expiring_before(&self, date: NaiveDate) -> Result<Vec<Card>> {
        self.query_cards(
            "WHERE status <> 'Expired' AND expire_date < CAST(? AS DATE) ORDER BY expire_date",
            &[&date.to_string()],
        )
    }

    // === Balances ===

    fn find_balance(&self, card_id: Uuid, currency: Currency) -> Result<Option<CardBalance>> {
        let balances = self.query_balances(
            "WHERE card_id = ? AND currency = ?",
            &[&card_id.to_string(), &currency.code().to_string()],
        )?;
        Ok(balances.into_iter().next())
    }

    fn list_balances(&self, card_id: Uuid) -> Result<Vec<CardBalance>> {
        self.query_balances("WHERE card_id = ? ORDER BY currency", &[&card_id.to_string()])
    }

    // === Transactions ===

    fn list_transactions_for_card(&self, card_id: Uuid) -> Result<Vec<Transaction>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM sys_transactions
             WHERE sender_card_id = ? OR receiver_card_id = ?
             ORDER BY occurred_at DESC",
            TRANSACTION_COLUMNS
        );
        let id = card_id.to_string();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![id, id], TransactionRow::read)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(TransactionRow::into_transaction).collect()
    }

    // === Writes ===

    fn apply(&self, changes: &[Change]) -> Result<()> {
        let mut conn = self.lock()?;
        // Rolled back on drop unless committed
        let tx = conn.transaction()?;
        for change in changes {
            apply_change(&tx, change)?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn apply_change(conn: &Connection, change: &Change) -> Result<()> {
    match change {
        Change::InsertCard(card) => {
            conn.execute(
                "INSERT INTO sys_cards (
                    card_id, card_number, card_type, status, verification_code, expire_date,
                    withdrawn_today, withdrawal_limit, transacted_today, transaction_limit,
                    last_transaction_at, user_id, created_at
                 ) VALUES (?, ?, ?, ?, ?, CAST(? AS DATE),
                    CAST(? AS DECIMAL(15,2)), CAST(? AS DECIMAL(15,2)),
                    CAST(? AS DECIMAL(15,2)), CAST(? AS DECIMAL(15,2)),
                    CAST(? AS TIMESTAMP), ?, CAST(? AS TIMESTAMP))",
                params![
                    card.id.to_string(),
                    card.number,
                    card.card_type.as_str(),
                    card.status.as_str(),
                    card.verification_code,
                    card.expire_date.to_string(),
                    card.withdrawn_today.map(|d| d.to_string()),
                    card.withdrawal_limit.map(|d| d.to_string()),
                    card.transacted_today.map(|d| d.to_string()),
                    card.transaction_limit.map(|d| d.to_string()),
                    card.last_transaction_at.as_ref().map(format_timestamp),
                    card.user_id.get(),
                    format_timestamp(&card.created_at),
                ],
            )?;
        }
        Change::SetCardStatus { card_id, status } => {
            let n = conn.execute(
                "UPDATE sys_cards SET status = ? WHERE card_id = ?",
                params![status.as_str(), card_id.to_string()],
            )?;
            expect_one_row(n, "card", card_id)?;
        }
        Change::SetUserPin { user_id, pin_hash } => {
            let n = conn.execute(
                "UPDATE sys_users SET pin_hash = ? WHERE user_id = ?",
                params![pin_hash, user_id.get()],
            )?;
            expect_one_row(n, "user", user_id)?;
        }
        Change::InsertBalance(balance) => {
            conn.execute(
                "INSERT INTO sys_card_balances (balance_id, currency, amount, card_id)
                 VALUES (?, ?, CAST(? AS DECIMAL(15,2)), ?)",
                params![
                    balance.id.to_string(),
                    balance.currency.code(),
                    balance.amount.to_string(),
                    balance.card_id.to_string(),
                ],
            )?;
        }
        Change::SetBalanceAmount { balance_id, amount } => {
            let n = conn.execute(
                "UPDATE sys_card_balances SET amount = CAST(? AS DECIMAL(15,2)) WHERE balance_id = ?",
                params![amount.to_string(), balance_id.to_string()],
            )?;
            expect_one_row(n, "balance", balance_id)?;
        }
        Change::DeleteBalance { balance_id } => {
            let n = conn.execute(
                "DELETE FROM sys_card_balances WHERE balance_id = ?",
                [balance_id.to_string()],
            )?;
            expect_one_row(n, "balance", balance_id)?;
        }
        Change::AppendTransaction(tx) => {
            conn.execute(
                "INSERT INTO sys_transactions (
                    transaction_id, kind, amount, sender_currency, receiver_currency,
                    occurred_at, description, sender_card_id, receiver_card_id,
                    sender_balance_id, receiver_balance_id
                 ) VALUES (?, ?, CAST(? AS DECIMAL(15,2)), ?, ?, CAST(? AS TIMESTAMP), ?, ?, ?, ?, ?)",
                params![
                    tx.id.to_string(),
                    tx.kind,
                    tx.amount.to_string(),
                    tx.sender_currency.code(),
                    tx.receiver_currency.code(),
                    format_timestamp(&tx.occurred_at),
                    tx.description,
                    tx.sender_card_id.to_string(),
                    tx.receiver_card_id.to_string(),
                    tx.sender_balance_id.to_string(),
                    tx.receiver_balance_id.to_string(),
                ],
            )?;
        }
    }
    Ok(())
}

fn expect_one_row(affected: usize, what: &str, id: &dyn std::fmt::Display) -> Result<()> {
    if affected != 1 {
        return Err(Error::database(format!(
            "expected to change exactly one {} row for {}, changed {}",
            what, id, affected
        )));
    }
    Ok(())
}

// Raw rows as read from DuckDB. Converted to domain types outside the
// query closure so conversion failures surface as crate errors.

struct CardRow {
    id: String,
    number: String,
    card_type: String,
    status: String,
    verification_code: String,
    expire_date: String,
    withdrawn_today: Option<String>,
    withdrawal_limit: Option<String>,
    transacted_today: Option<String>,
    transaction_limit: Option<String>,
    last_transaction_at: Option<String>,
    user_id: i64,
    created_at: String,
}

impl CardRow {
    fn read(row: &duckdb::Row) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            number: row.get(1)?,
            card_type: row.get(2)?,
            status: row.get(3)?,
            verification_code: row.get(4)?,
            expire_date: row.get(5)?,
            withdrawn_today: row.get(6)?,
            withdrawal_limit: row.get(7)?,
            transacted_today: row.get(8)?,
            transaction_limit: row.get(9)?,
            last_transaction_at: row.get(10)?,
            user_id: row.get(11)?,
            created_at: row.get(12)?,
        })
    }

    fn into_card(self) -> Result<Card> {
        Ok(Card {
            id: parse_uuid(&self.id)?,
            number: self.number,
            card_type: CardType::from_str(&self.card_type)?,
            status: CardStatus::from_str(&self.status)?,
            verification_code: self.verification_code,
            expire_date: parse_date(&self.expire_date)?,
            withdrawn_today: self.withdrawn_today.as_deref().map(parse_decimal).transpose()?,
            withdrawal_limit: self.withdrawal_limit.as_deref().map(parse_decimal).transpose()?,
            transacted_today: self.transacted_today.as_deref().map(parse_decimal).transpose()?,
            transaction_limit: self.transaction_limit.as_deref().map(parse_decimal).transpose()?,
            last_transaction_at: self
                .last_transaction_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
            user_id: UserId::new(self.user_id)?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

struct BalanceRow {
    id: String,
    currency: String,
    amount: String,
    card_id: String,
}

impl BalanceRow {
    fn read(row: &duckdb::Row) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            currency: row.get(1)?,
            amount: row.get(2)?,
            card_id: row.get(3)?,
        })
    }

    fn into_balance(self) -> Result<CardBalance> {
        Ok(CardBalance {
            id: parse_uuid(&self.id)?,
            currency: Currency::from_str(&self.currency)?,
            amount: parse_decimal(&self.amount)?,
            card_id: parse_uuid(&self.card_id)?,
        })
    }
}

struct TransactionRow {
    id: String,
    kind: String,
    amount: String,
    sender_currency: String,
    receiver_currency: String,
    occurred_at: String,
    description: String,
    sender_card_id: String,
    receiver_card_id: String,
    sender_balance_id: String,
    receiver_balance_id: String,
}

impl TransactionRow {
    fn read(row: &duckdb::Row) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            amount: row.get(2)?,
            sender_currency: row.get(3)?,
            receiver_currency: row.get(4)?,
            occurred_at: row.get(5)?,
            description: row.get(6)?,
            sender_card_id: row.get(7)?,
            receiver_card_id: row.get(8)?,
            sender_balance_id: row.get(9)?,
            receiver_balance_id: row.get(10)?,
        })
    }

    fn into_transaction(self) -> Result<Transaction> {
        Ok(Transaction {
            id: parse_uuid(&self.id)?,
            kind: self.kind,
            amount: parse_decimal(&self.amount)?,
            sender_currency: Currency::from_str(&self.sender_currency)?,
            receiver_currency: Currency::from_str(&self.receiver_currency)?,
            occurred_at: parse_timestamp(&self.occurred_at)?,
            description: self.description,
            sender_card_id: parse_uuid(&self.sender_card_id)?,
            receiver_card_id: parse_uuid(&self.receiver_card_id)?,
            sender_balance_id: parse_uuid(&self.sender_balance_id)?,
            receiver_balance_id: parse_uuid(&self.receiver_balance_id)?,
        })
    }
}

// Helper functions

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::database(format!("invalid timestamp '{}': {}", s, e)))
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| Error::database(format!("invalid date '{}': {}", s, e)))
}

fn parse_decimal(s: &str) -> Result<Decimal> {
    Decimal::from_str(s).map_err(|e| Error::database(format!("invalid decimal '{}': {}", s, e)))
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::database(format!("invalid id '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DEFAULT_VALIDITY_MONTHS;
    use crate::ports::UnitOfWork;

    fn repo() -> DuckDbRepository {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        repo
    }

    fn card_for(user: UserId, number: &str) -> Card {
        Card::issue(
            number.to_string(),
            CardType::Debit,
            "042".to_string(),
            user,
            Utc::now(),
            DEFAULT_VALIDITY_MONTHS,
        )
    }

    #[test]
    fn test_is_retryable_error() {
        assert!(is_retryable_error("IO Error: Could not set lock on file: database is locked"));
        assert!(is_retryable_error("The process cannot access the file because it is being used by another process"));
        assert!(!is_retryable_error("Catalog Error: Table does not exist"));
    }

    #[test]
    fn test_timestamp_round_trip_formats() {
        assert!(parse_timestamp("2024-03-01 10:20:30").is_ok());
        assert!(parse_timestamp("2024-03-01 10:20:30.123456").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_user_ids_are_sequential() {
        let repo = repo();
        let a = repo.create_user("a@example.com").unwrap();
        let b = repo.create_user("b@example.com").unwrap();
        assert_eq!(a.id.get(), 1);
        assert_eq!(b.id.get(), 2);
        assert!(repo.create_user("a@example.com").is_err());
        assert_eq!(repo.find_user(a.id).unwrap().unwrap().email, "a@example.com");
    }

    #[test]
    fn test_card_and_balance_persist_through_unit_of_work() {
        let repo = repo();
        let user = repo.create_user("owner@example.com").unwrap();
        let card = card_for(user.id, "253510000000014");
        let mut balance = CardBalance::open(card.id, Currency::UAH);

        let mut uow = UnitOfWork::begin(&repo);
        uow.insert_card(&card);
        uow.insert_balance(&balance);
        uow.commit().unwrap();

        let stored = repo.find_card(&card.number, user.id).unwrap().unwrap();
        assert_eq!(stored, card_with_micros(&card));
        assert!(repo.card_number_exists(&card.number).unwrap());
        assert_eq!(repo.find_card_owner(&card.number).unwrap(), Some(user.id));
        assert_eq!(repo.count_active_cards(user.id).unwrap(), 1);

        balance.deposit(Decimal::new(12345, 2));
        let mut uow = UnitOfWork::begin(&repo);
        uow.update_balance(&balance);
        uow.commit().unwrap();

        let stored = repo.find_balance(card.id, Currency::UAH).unwrap().unwrap();
        assert_eq!(stored.amount, Decimal::new(12345, 2));
    }

    #[test]
    fn test_card_lookup_is_owner_scoped() {
        let repo = repo();
        let owner = repo.create_user("owner@example.com").unwrap();
        let other = repo.create_user("other@example.com").unwrap();
        let card = card_for(owner.id, "253510000000014");

        let mut uow = UnitOfWork::begin(&repo);
        uow.insert_card(&card);
        uow.commit().unwrap();

        assert!(repo.find_card(&card.number, other.id).unwrap().is_none());
    }

    #[test]
    fn test_failed_change_rolls_back_whole_batch() {
        let repo = repo();
        let user = repo.create_user("owner@example.com").unwrap();
        let card = card_for(user.id, "253510000000014");

        let mut uow = UnitOfWork::begin(&repo);
        uow.insert_card(&card);
        // no such balance: the update hits zero rows
        uow.update_balance(&CardBalance::open(card.id, Currency::USD));
        assert!(uow.commit().is_err());

        assert!(!repo.card_number_exists(&card.number).unwrap());
    }

    #[test]
    fn test_duplicate_number_is_a_unique_violation() {
        let repo = repo();
        let user = repo.create_user("owner@example.com").unwrap();

        let mut uow = UnitOfWork::begin(&repo);
        uow.insert_card(&card_for(user.id, "253510000000014"));
        uow.commit().unwrap();

        let mut uow = UnitOfWork::begin(&repo);
        uow.insert_card(&card_for(user.id, "253510000000014"));
        let err = uow.commit().unwrap_err();
        assert!(err.is_unique_violation(), "unexpected error: {}", err);
    }

    #[test]
    fn test_negative_amount_refused_by_storage() {
        let repo = repo();
        let user = repo.create_user("owner@example.com").unwrap();
        let card = card_for(user.id, "253510000000014");
        let balance = CardBalance::open(card.id, Currency::PLN);

        let mut uow = UnitOfWork::begin(&repo);
        uow.insert_card(&card);
        uow.insert_balance(&balance);
        uow.commit().unwrap();

        let mut uow = UnitOfWork::begin(&repo);
        let mut negative = balance.clone();
        negative.amount = Decimal::new(-100, 2);
        uow.update_balance(&negative);
        assert!(uow.commit().is_err());
        assert_eq!(
            repo.find_balance(card.id, Currency::PLN).unwrap().unwrap().amount,
            Decimal::ZERO
        );
    }

    #[test]
    fn test_discarded_unit_of_work_writes_nothing() {
        let repo = repo();
        let user = repo.create_user("owner@example.com").unwrap();

        let mut uow = UnitOfWork::begin(&repo);
        uow.insert_card(&card_for(user.id, "253510000000014"));
        uow.discard();

        assert!(repo.list_cards(user.id).unwrap().is_empty());
    }

    /// Timestamps are stored with microsecond precision
    fn card_with_micros(card: &Card) -> Card {
        let mut expected = card.clone();
        let micros = expected.created_at.timestamp_micros();
        expected.created_at = DateTime::from_timestamp_micros(micros).unwrap();
        expected
    }
}
