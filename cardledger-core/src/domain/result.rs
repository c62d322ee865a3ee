//! Result and error types for the core library

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::money::MoneyError;

/// Generic message shown to callers when an infrastructure failure occurs.
/// The real cause only goes to the log store.
pub const GENERIC_FAILURE_MESSAGE: &str = "Internal server error has occurred.";

/// Classification of a failure, independent of the specific variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input (amount, status, identifiers)
    Validation,
    /// Duplicate currency, issuance limit, non-empty balance removal
    Conflict,
    /// Card, balance or receiver absent
    NotFound,
    /// Card blocked/expired, insufficient funds
    State,
    /// Caller identity could not be resolved
    Unauthorized,
    /// Storage or other collaborator failed
    Infrastructure,
}

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    // === Validation ===
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] MoneyError),

    #[error("Cards cannot be expired by their owner")]
    InvalidTargetStatus,

    #[error("Cannot transfer money to the same card")]
    SameCard,

    #[error("Validation error: {0}")]
    Validation(String),

    // === Not found ===
    #[error("Requested card does not exist or is not owned by user")]
    CardNotOwnedOrInvalid,

    #[error("Card has not been found")]
    CardNotFound,

    #[error("Card balance does not exist")]
    BalanceNotFound,

    #[error("Could not find receiver card")]
    ReceiverNotFound,

    // === Unauthorized ===
    #[error("User does not exist")]
    UserNotFound,

    // === Conflict ===
    #[error("Maximum amount of cards ({0}) has been reached")]
    IssuanceLimitReached(u32),

    #[error("Unable to create two balances with the same currency")]
    DuplicateCurrency,

    #[error("Cannot remove non-empty balance")]
    NonZeroBalance,

    #[error("Could not allocate a unique card number after {0} attempts")]
    CardNumberSpaceExhausted(u32),

    // === State ===
    #[error("Card is blocked")]
    CardBlocked,

    #[error("Card has expired")]
    CardExpired,

    #[error("Insufficient funds for this operation on chosen card balance")]
    InsufficientFunds,

    // === Infrastructure ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidAmount(_)
            | Error::InvalidTargetStatus
            | Error::SameCard
            | Error::Validation(_) => ErrorKind::Validation,
            Error::CardNotOwnedOrInvalid
            | Error::CardNotFound
            | Error::BalanceNotFound
            | Error::ReceiverNotFound => ErrorKind::NotFound,
            Error::UserNotFound => ErrorKind::Unauthorized,
            Error::IssuanceLimitReached(_)
            | Error::DuplicateCurrency
            | Error::NonZeroBalance
            | Error::CardNumberSpaceExhausted(_) => ErrorKind::Conflict,
            Error::CardBlocked | Error::CardExpired | Error::InsufficientFunds => ErrorKind::State,
            Error::Database(_)
            | Error::Config(_)
            | Error::Notification(_)
            | Error::Io(_)
            | Error::Json(_) => ErrorKind::Infrastructure,
        }
    }

    /// HTTP status the API surface answers with for this failure
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidAmount(_)
            | Error::InvalidTargetStatus
            | Error::SameCard
            | Error::Validation(_)
            | Error::CardNotOwnedOrInvalid
            | Error::BalanceNotFound
            | Error::ReceiverNotFound => 400,
            Error::UserNotFound => 401,
            Error::DuplicateCurrency | Error::NonZeroBalance | Error::CardBlocked => 403,
            Error::CardNotFound => 404,
            Error::CardExpired | Error::InsufficientFunds => 406,
            Error::IssuanceLimitReached(_) | Error::CardNumberSpaceExhausted(_) => 409,
            Error::Database(_)
            | Error::Config(_)
            | Error::Notification(_)
            | Error::Io(_)
            | Error::Json(_) => 500,
        }
    }

    pub fn is_infrastructure(&self) -> bool {
        self.kind() == ErrorKind::Infrastructure
    }

    /// Storage refused a write because a unique key already exists
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Database(msg) => {
                let lower = msg.to_lowercase();
                lower.contains("duplicate key") || lower.contains("unique constraint")
            }
            _ => false,
        }
    }
}

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        Error::Database(e.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Failure description carried by an [`OperationResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub status: u16,
    pub message: String,
}

/// Serializable outcome of an operation at the API/CLI boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<Failure>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create a failed result
    pub fn fail(kind: ErrorKind, status: u16, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(Failure {
                kind,
                status,
                message: message.into(),
            }),
        }
    }

    /// Human readable failure message, if any
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|f| f.message.as_str())
    }
}

/// Infrastructure failures never leak their cause through this conversion;
/// use `services::guarded` to also record the cause.
impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) if e.is_infrastructure() => {
                Self::fail(e.kind(), e.status_code(), GENERIC_FAILURE_MESSAGE)
            }
            Err(e) => Self::fail(e.kind(), e.status_code(), e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_result_ok() {
        let result: OperationResult<i32> = OperationResult::ok(42);
        assert!(result.success);
        assert_eq!(result.data, Some(42));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_business_failure_keeps_message() {
        let err: Result<i32> = Err(Error::InsufficientFunds);
        let result: OperationResult<i32> = err.into();
        assert!(!result.success);
        let failure = result.error.unwrap();
        assert_eq!(failure.kind, ErrorKind::State);
        assert_eq!(failure.status, 406);
        assert!(failure.message.contains("Insufficient funds"));
    }

    #[test]
    fn test_infrastructure_failure_is_generic() {
        let err: Result<i32> = Err(Error::database("connection refused on 10.0.0.3:5432"));
        let result: OperationResult<i32> = err.into();
        assert_eq!(result.error_message(), Some(GENERIC_FAILURE_MESSAGE));
        assert_eq!(result.error.unwrap().status, 500);
    }

    #[test]
    fn test_unique_violation_detection() {
        let dup = Error::database(
            "Constraint Error: Duplicate key \"card_number: 253510000000014\" violates unique constraint.",
        );
        assert!(dup.is_unique_violation());
        assert!(!Error::database("Constraint Error: CHECK constraint failed").is_unique_violation());
        assert!(!Error::DuplicateCurrency.is_unique_violation());
    }

    #[test]
    fn test_status_codes_follow_surface_contract() {
        assert_eq!(Error::IssuanceLimitReached(15).status_code(), 409);
        assert_eq!(Error::DuplicateCurrency.status_code(), 403);
        assert_eq!(Error::NonZeroBalance.status_code(), 403);
        assert_eq!(Error::BalanceNotFound.status_code(), 400);
        assert_eq!(Error::SameCard.status_code(), 400);
        assert_eq!(Error::CardExpired.status_code(), 406);
        assert_eq!(Error::InvalidAmount(MoneyError::NotPositive).status_code(), 400);
    }
}
