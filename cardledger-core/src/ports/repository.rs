//! Repository port - storage abstraction
//!
//! Reads go straight through the repository. Writes are never issued one at
//! a time: services buffer them in a [`UnitOfWork`](super::UnitOfWork) and
//! the repository applies the whole batch through [`Repository::apply`].

use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Card, CardBalance, Currency, Transaction, User, UserId};

use super::unit_of_work::Change;

/// Storage abstraction for users, cards, balances and transactions
pub trait Repository: Send + Sync {
    // === Users ===

    fn find_user(&self, id: UserId) -> Result<Option<User>>;

    /// Register a user and assign the next id
    fn create_user(&self, email: &str) -> Result<User>;

    // === Cards ===

    /// Look a card up by number, scoped to its owner
    fn find_card(&self, number: &str, owner: UserId) -> Result<Option<Card>>;

    /// Resolve who owns a card number, across all users
    fn find_card_owner(&self, number: &str) -> Result<Option<UserId>>;

    fn card_number_exists(&self, number: &str) -> Result<bool>;

    /// Number of cards of a user whose status is not Expired
    fn count_active_cards(&self, owner: UserId) -> Result<u32>;

    fn list_cards(&self, owner: UserId) -> Result<Vec<Card>>;

    /// Non-expired cards whose expire date is strictly before `date`
    fn cards_expiring_before(&self, date: NaiveDate) -> Result<Vec<Card>>;

    // === Balances ===

    fn find_balance(&self, card_id: Uuid, currency: Currency) -> Result<Option<CardBalance>>;

    fn list_balances(&self, card_id: Uuid) -> Result<Vec<CardBalance>>;

    // === Transactions ===

    /// Transactions where the card is sender or receiver, newest first
    fn list_transactions_for_card(&self, card_id: Uuid) -> Result<Vec<Transaction>>;

    // === Writes ===

    /// Apply a batch of changes atomically. Either every change lands or
    /// none does; an update or delete that does not hit exactly one row
    /// fails the whole batch.
    fn apply(&self, changes: &[Change]) -> Result<()>;
}
