//! Unit of work - buffered mutations committed as one storage transaction

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Card, CardBalance, CardStatus, Transaction, UserId};

use super::Repository;

/// A single buffered row mutation
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    InsertCard(Card),
    SetCardStatus { card_id: Uuid, status: CardStatus },
    SetUserPin { user_id: UserId, pin_hash: String },
    InsertBalance(CardBalance),
    SetBalanceAmount { balance_id: Uuid, amount: Decimal },
    DeleteBalance { balance_id: Uuid },
    AppendTransaction(Transaction),
}

/// Buffers the mutations of one business operation.
///
/// Nothing reaches storage until [`commit`](UnitOfWork::commit). Dropping
/// the unit of work without committing discards everything it holds.
pub struct UnitOfWork<'a> {
    repository: &'a dyn Repository,
    pending: Vec<Change>,
}

impl<'a> UnitOfWork<'a> {
    pub fn begin(repository: &'a dyn Repository) -> Self {
        Self {
            repository,
            pending: Vec::new(),
        }
    }

    pub fn insert_card(&mut self, card: &Card) {
        self.pending.push(Change::InsertCard(card.clone()));
    }

    pub fn set_card_status(&mut self, card_id: Uuid, status: CardStatus) {
        self.pending.push(Change::SetCardStatus { card_id, status });
    }

    pub fn set_user_pin(&mut self, user_id: UserId, pin_hash: impl Into<String>) {
        self.pending.push(Change::SetUserPin {
            user_id,
            pin_hash: pin_hash.into(),
        });
    }

    pub fn insert_balance(&mut self, balance: &CardBalance) {
        self.pending.push(Change::InsertBalance(balance.clone()));
    }

    /// Persist the current in-memory amount of a balance
    pub fn update_balance(&mut self, balance: &CardBalance) {
        self.pending.push(Change::SetBalanceAmount {
            balance_id: balance.id,
            amount: balance.amount,
        });
    }

    pub fn delete_balance(&mut self, balance_id: Uuid) {
        self.pending.push(Change::DeleteBalance { balance_id });
    }

    pub fn append_transaction(&mut self, transaction: &Transaction) {
        self.pending.push(Change::AppendTransaction(transaction.clone()));
    }

    /// Apply every buffered change in one storage transaction
    pub fn commit(self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.repository.apply(&self.pending)
    }

    /// Throw the buffered changes away
    pub fn discard(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbRepository;

    fn repository_with_user() -> (DuckDbRepository, UserId) {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        let user = repo.create_user("owner@example.com").unwrap();
        (repo, user.id)
    }

    fn stored_pin(repo: &DuckDbRepository, id: UserId) -> Option<String> {
        repo.find_user(id).unwrap().unwrap().pin_hash
    }

    #[test]
    fn test_dropped_or_discarded_changes_never_land() {
        let (repo, id) = repository_with_user();

        let mut uow = UnitOfWork::begin(&repo);
        uow.set_user_pin(id, "first");
        uow.discard();

        {
            let mut uow = UnitOfWork::begin(&repo);
            uow.set_user_pin(id, "second");
        }
        assert_eq!(stored_pin(&repo, id), None);

        let mut uow = UnitOfWork::begin(&repo);
        uow.set_user_pin(id, "third");
        uow.commit().unwrap();
        assert_eq!(stored_pin(&repo, id).as_deref(), Some("third"));
    }

    #[test]
    fn test_failed_change_rolls_back_the_batch() {
        let (repo, id) = repository_with_user();

        let mut uow = UnitOfWork::begin(&repo);
        uow.set_user_pin(id, "hash");
        uow.set_card_status(Uuid::new_v4(), CardStatus::Blocked);
        assert!(uow.commit().is_err());

        assert_eq!(stored_pin(&repo, id), None);
    }

    #[test]
    fn test_empty_commit_is_a_no_op() {
        let (repo, _) = repository_with_user();
        assert!(UnitOfWork::begin(&repo).commit().is_ok());
    }
}
