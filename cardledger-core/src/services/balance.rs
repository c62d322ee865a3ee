//! Balance service - per-card, per-currency balances
//!
//! One balance per currency per card, never negative, removable only at
//! exactly zero. Single-card deposits and withdrawals commit on their own;
//! transfers go through [`TransferService`](super::TransferService).

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::money::MAX_AMOUNT;
use crate::domain::result::{Error, Result};
use crate::domain::{validate_amount, Card, CardBalance, Currency, MoneyError, UserId};
use crate::ports::{Repository, UnitOfWork};
use crate::services::availability::AvailabilityService;
use crate::services::identity::Caller;
use crate::services::logging::{LogEvent, LoggingService};

/// Deposit into an already checked balance, refusing to exceed storage range
pub(crate) fn credit(balance: &mut CardBalance, amount: Decimal) -> Result<()> {
    match balance.amount.checked_add(amount) {
        Some(total) if total <= MAX_AMOUNT => {
            balance.deposit(amount);
            Ok(())
        }
        _ => Err(Error::InvalidAmount(MoneyError::TooLarge)),
    }
}

pub struct BalanceService {
    repository: Arc<dyn Repository>,
    availability: Arc<AvailabilityService>,
    logger: Arc<LoggingService>,
}

impl BalanceService {
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

    fn owned_card(&self, number: &str, owner: UserId) -> Result<Card> {
        self.repository
            .find_card(number, owner)?
            .ok_or(Error::CardNotOwnedOrInvalid)
    }

    /// Open an empty balance in `currency` on one of the caller's cards
    pub fn open_balance(&self, caller: &Caller, number: &str, currency: Currency) -> Result<CardBalance> {
        let card = self.owned_card(number, caller.id())?;
        if self.repository.find_balance(card.id, currency)?.is_some() {
            return Err(Error::DuplicateCurrency);
        }

        let balance = CardBalance::open(card.id, currency);
        let mut uow = UnitOfWork::begin(self.repository.as_ref());
        uow.insert_balance(&balance);
        uow.commit().map_err(|e| {
            // lost a race with a concurrent open of the same currency
            if e.is_unique_violation() {
                Error::DuplicateCurrency
            } else {
                e
            }
        })?;

        let _ = self.logger.log(
            LogEvent::new("balance_opened")
                .with_operation(format!("open_balance:{}", currency))
                .with_user(caller.id())
                .with_card(number),
        );
        Ok(balance)
    }

    pub fn list_balances(&self, caller: &Caller, number: &str) -> Result<Vec<CardBalance>> {
        let card = self.owned_card(number, caller.id())?;
        self.repository.list_balances(card.id)
    }

    /// Remove a balance. Only an empty balance on a usable card can go.
    pub fn close_balance(&self, caller: &Caller, number: &str, currency: Currency) -> Result<()> {
        let card = self.availability.check_card(number, caller.id())?;
        let balance = self
            .repository
            .find_balance(card.id, currency)?
            .ok_or(Error::BalanceNotFound)?;
        if !balance.is_empty() {
            return Err(Error::NonZeroBalance);
        }

        let mut uow = UnitOfWork::begin(self.repository.as_ref());
        uow.delete_balance(balance.id);
        uow.commit()?;

        let _ = self.logger.log(
            LogEvent::new("balance_closed")
                .with_operation(format!("close_balance:{}", currency))
                .with_user(caller.id())
                .with_card(number),
        );
        Ok(())
    }

    /// Put money onto one of the caller's balances
    pub fn deposit(
        &self,
        caller: &Caller,
        number: &str,
        currency: Currency,
        amount: Decimal,
    ) -> Result<CardBalance> {
        validate_amount(amount)?;
        let mut available = self.availability.check_balance(number, caller.id(), currency, None)?;
        credit(&mut available.balance, amount)?;

        let mut uow = UnitOfWork::begin(self.repository.as_ref());
        uow.update_balance(&available.balance);
        uow.commit()?;

        let _ = self.logger.log(
            LogEvent::new("deposit_completed")
                .with_operation("deposit")
                .with_user(caller.id())
                .with_card(number),
        );
        Ok(available.balance)
    }

    /// Take money off one of the caller's balances
    pub fn withdraw(
        &self,
        caller: &Caller,
        number: &str,
        currency: Currency,
        amount: Decimal,
    ) -> Result<CardBalance> {
        let mut available = self
            .availability
            .check_balance(number, caller.id(), currency, Some(amount))?;
        available.balance.withdraw(amount);

        let mut uow = UnitOfWork::begin(self.repository.as_ref());
        uow.update_balance(&available.balance);
        uow.commit()?;

        let _ = self.logger.log(
            LogEvent::new("withdrawal_completed")
                .with_operation("withdraw")
                .with_user(caller.id())
                .with_card(number),
        );
        Ok(available.balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    use chrono::Utc;

    use crate::adapters::duckdb::DuckDbRepository;
    use crate::domain::{CardStatus, CardType, DEFAULT_VALIDITY_MONTHS};
    use crate::services::identity::IdentityService;
    use crate::services::logging::EntryPoint;

    const NUMBER: &str = "253510000000014";

    struct Fixture {
        repo: Arc<DuckDbRepository>,
        service: BalanceService,
        caller: Caller,
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(DuckDbRepository::open_in_memory().unwrap());
        repo.ensure_schema().unwrap();
        let identity = IdentityService::new(repo.clone());
        let user = identity.register("owner@example.com").unwrap();
        let caller = identity.resolve(user.id.get()).unwrap();

        let card = Card::issue(
            NUMBER.to_string(),
            CardType::Debit,
            "321".to_string(),
            caller.id(),
            Utc::now(),
            DEFAULT_VALIDITY_MONTHS,
        );
        let mut uow = UnitOfWork::begin(repo.as_ref());
        uow.insert_card(&card);
        uow.commit().unwrap();

        let logger = Arc::new(LoggingService::in_memory(EntryPoint::Service, "test").unwrap());
        let availability = Arc::new(AvailabilityService::new(repo.clone()));
        let service = BalanceService::new(repo.clone(), availability, logger);
        Fixture { repo, service, caller }
    }

    #[test]
    fn test_open_balance_starts_at_zero() {
        let f = fixture();
        let balance = f.service.open_balance(&f.caller, NUMBER, Currency::UAH).unwrap();
        assert_eq!(balance.amount, Decimal::ZERO);

        let listed = f.service.list_balances(&f.caller, NUMBER).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].currency, Currency::UAH);
    }

    #[test]
    fn test_duplicate_currency_rejected() {
        let f = fixture();
        f.service.open_balance(&f.caller, NUMBER, Currency::USD).unwrap();
        let err = f.service.open_balance(&f.caller, NUMBER, Currency::USD).unwrap_err();
        assert!(matches!(err, Error::DuplicateCurrency));
        assert_eq!(err.status_code(), 403);
        assert_eq!(f.service.list_balances(&f.caller, NUMBER).unwrap().len(), 1);
    }

    #[test]
    fn test_foreign_card_rejected() {
        let f = fixture();
        let err = f.service.open_balance(&f.caller, "253599999999999", Currency::USD).unwrap_err();
        assert!(matches!(err, Error::CardNotOwnedOrInvalid));
        assert_eq!(err.status_code(), 400);
        assert!(f.service.list_balances(&f.caller, "253599999999999").is_err());
    }

    #[test]
    fn test_deposit_and_withdraw() {
        let f = fixture();
        f.service.open_balance(&f.caller, NUMBER, Currency::PLN).unwrap();

        let after = f.service.deposit(&f.caller, NUMBER, Currency::PLN, dec("100.00")).unwrap();
        assert_eq!(after.amount, dec("100"));
        let after = f.service.withdraw(&f.caller, NUMBER, Currency::PLN, dec("30.50")).unwrap();
        assert_eq!(after.amount, dec("69.50"));

        let err = f.service.withdraw(&f.caller, NUMBER, Currency::PLN, dec("69.51")).unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds));
        assert_eq!(err.status_code(), 406);

        let stored = f.repo.find_balance(after.card_id, Currency::PLN).unwrap().unwrap();
        assert_eq!(stored.amount, dec("69.50"));
    }

    #[test]
    fn test_deposit_amount_rules() {
        let f = fixture();
        f.service.open_balance(&f.caller, NUMBER, Currency::USD).unwrap();

        for bad in ["0", "-1.00", "10.005"] {
            let err = f.service.deposit(&f.caller, NUMBER, Currency::USD, dec(bad)).unwrap_err();
            assert!(matches!(err, Error::InvalidAmount(_)), "{} accepted", bad);
        }

        f.service.deposit(&f.caller, NUMBER, Currency::USD, MAX_AMOUNT).unwrap();
        let err = f.service.deposit(&f.caller, NUMBER, Currency::USD, dec("0.01")).unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(MoneyError::TooLarge)));
    }

    #[test]
    fn test_deposit_into_missing_balance() {
        let f = fixture();
        let err = f.service.deposit(&f.caller, NUMBER, Currency::UAH, dec("1.00")).unwrap_err();
        assert!(matches!(err, Error::BalanceNotFound));
    }

    #[test]
    fn test_close_balance_rules() {
        let f = fixture();
        f.service.open_balance(&f.caller, NUMBER, Currency::USD).unwrap();
        f.service.deposit(&f.caller, NUMBER, Currency::USD, dec("5.00")).unwrap();

        let err = f.service.close_balance(&f.caller, NUMBER, Currency::USD).unwrap_err();
        assert!(matches!(err, Error::NonZeroBalance));
        assert_eq!(err.status_code(), 403);

        let err = f.service.close_balance(&f.caller, NUMBER, Currency::PLN).unwrap_err();
        assert!(matches!(err, Error::BalanceNotFound));

        f.service.withdraw(&f.caller, NUMBER, Currency::USD, dec("5.00")).unwrap();
        f.service.close_balance(&f.caller, NUMBER, Currency::USD).unwrap();
        assert!(f.service.list_balances(&f.caller, NUMBER).unwrap().is_empty());
    }

    #[test]
    fn test_blocked_card_cannot_move_money() {
        let f = fixture();
        f.service.open_balance(&f.caller, NUMBER, Currency::USD).unwrap();
        f.service.deposit(&f.caller, NUMBER, Currency::USD, dec("5.00")).unwrap();

        let card = f.repo.find_card(NUMBER, f.caller.id()).unwrap().unwrap();
        let mut uow = UnitOfWork::begin(f.repo.as_ref());
        uow.set_card_status(card.id, CardStatus::Blocked);
        uow.commit().unwrap();

        assert!(matches!(
            f.service.withdraw(&f.caller, NUMBER, Currency::USD, dec("1.00")),
            Err(Error::CardBlocked)
        ));
        assert!(matches!(
            f.service.deposit(&f.caller, NUMBER, Currency::USD, dec("1.00")),
            Err(Error::CardBlocked)
        ));
        assert!(matches!(
            f.service.close_balance(&f.caller, NUMBER, Currency::USD),
            Err(Error::CardBlocked)
        ));
    }
}
