//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

pub mod balance;
mod card;
pub mod card_number;
pub mod money;
pub mod result;
mod transaction;
mod user;

pub use balance::{CardBalance, Currency};
pub use card::{Card, CardStatus, CardType, DEFAULT_VALIDITY_MONTHS};
pub use money::{validate_amount, MoneyError};
pub use transaction::{Transaction, CARD_TO_CARD};
pub use user::{User, UserId, MAX_USER_ID};
