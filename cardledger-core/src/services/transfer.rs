//! Transfer service - moves money between two card balances
//!
//! The sender withdrawal, the receiver deposit and the transaction record
//! are buffered in one unit of work and committed together. Any failure
//! before the commit leaves storage untouched.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::{Currency, Transaction};
use crate::ports::{Repository, UnitOfWork};
use crate::services::availability::AvailabilityService;
use crate::services::balance::credit;
use crate::services::identity::Caller;
use crate::services::logging::{LogEvent, LoggingService};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub sender: String,
    pub receiver: String,
    pub currency: Currency,
    pub amount: Decimal,
}

pub struct TransferService {
    repository: Arc<dyn Repository>,
    availability: Arc<AvailabilityService>,
    logger: Arc<LoggingService>,
}

impl TransferService {
    pub fn new(
        repository: Arc<dyn Repository>,
        availability: Arc<AvailabilityService>,
        logger: Arc<LoggingService>,
    ) -> Self {
        Self {
            repository,
            availability,
            logger,
        }
    }

    /// Move `amount` from one of the caller's cards to any other card
    /// holding a balance in the same currency
    pub fn transfer(&self, caller: &Caller, request: &TransferRequest) -> Result<Transaction> {
        if request.sender == request.receiver {
            return Err(Error::SameCard);
        }

        let mut uow = UnitOfWork::begin(self.repository.as_ref());

        let mut sender = self.availability.check_balance(
            &request.sender,
            caller.id(),
            request.currency,
            Some(request.amount),
        )?;
        sender.balance.withdraw(request.amount);
        uow.update_balance(&sender.balance);

        let receiver_owner = self
            .repository
            .find_card_owner(&request.receiver)?
            .ok_or(Error::ReceiverNotFound)?;
        let mut receiver = self.availability.check_balance(
            &request.receiver,
            receiver_owner,
            request.currency,
            None,
        )?;
        credit(&mut receiver.balance, request.amount)?;
        uow.update_balance(&receiver.balance);

        let transaction = Transaction::card_to_card(
            &sender.card,
            &sender.balance,
            &receiver.card,
            &receiver.balance,
            request.amount,
            Utc::now(),
        );
        uow.append_transaction(&transaction);

        uow.commit()?;

        let _ = self.logger.log(
            LogEvent::new("transfer_completed")
                .with_operation("transfer")
                .with_user(caller.id())
                .with_card(&request.sender),
        );
        Ok(transaction)
    }

    /// Transactions touching one of the caller's cards, newest first
    pub fn history(&self, caller: &Caller, number: &str) -> Result<Vec<Transaction>> {
        let card = self
            .repository
            .find_card(number, caller.id())?
            .ok_or(Error::CardNotOwnedOrInvalid)?;
        self.repository.list_transactions_for_card(card.id)
    }
}
