//! Availability service - card and balance preconditions
//!
//! Every money path asks here before touching a balance. Lookups are
//! scoped by (card number, owner); a card owned by someone else is
//! indistinguishable from a missing one.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::{validate_amount, Card, CardBalance, Currency, UserId};
use crate::ports::Repository;

/// A usable card together with its balance in the requested currency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceAvailability {
    pub card: Card,
    pub balance: CardBalance,
}

pub struct AvailabilityService {
    repository: Arc<dyn Repository>,
}

impl AvailabilityService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Card exists for this owner, is not blocked and has not expired
    pub fn check_card(&self, number: &str, user_id: UserId) -> Result<Card> {
        self.check_card_on(number, user_id, Utc::now().date_naive())
    }

    /// [`check_card`](Self::check_card) against a given calendar day
    pub fn check_card_on(&self, number: &str, user_id: UserId, today: NaiveDate) -> Result<Card> {
        let card = self
            .repository
            .find_card(number, user_id)?
            .ok_or(Error::CardNotFound)?;

        if card.is_blocked() {
            return Err(Error::CardBlocked);
        }
        if card.is_expired(today) {
            return Err(Error::CardExpired);
        }
        Ok(card)
    }

    /// Card check plus balance existence and, when `required` is given,
    /// sufficiency. A supplied amount is validated before any lookup.
    pub fn check_balance(
        &self,
        number: &str,
        user_id: UserId,
        currency: Currency,
        required: Option<Decimal>,
    ) -> Result<BalanceAvailability> {
        if let Some(amount) = required {
            validate_amount(amount)?;
        }

        let card = self.check_card(number, user_id)?;
        let balance = self
            .repository
            .find_balance(card.id, currency)?
            .ok_or(Error::BalanceNotFound)?;

        if let Some(amount) = required {
            if !balance.covers(amount) {
                return Err(Error::InsufficientFunds);
            }
        }

        Ok(BalanceAvailability { card, balance })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbRepository;
    use crate::domain::{CardStatus, CardType, MoneyError, DEFAULT_VALIDITY_MONTHS};
    use crate::ports::UnitOfWork;
    use chrono::Duration;

    struct Fixture {
        repo: Arc<DuckDbRepository>,
        service: AvailabilityService,
        owner: UserId,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(DuckDbRepository::open_in_memory().unwrap());
        repo.ensure_schema().unwrap();
        let owner = repo.create_user("owner@example.com").unwrap().id;
        let service = AvailabilityService::new(repo.clone());
        Fixture { repo, service, owner }
    }

    fn add_card(f: &Fixture, number: &str, status: CardStatus, funds: Option<Decimal>) -> Card {
        let mut card = Card::issue(
            number.to_string(),
            CardType::Debit,
            "001".to_string(),
            f.owner,
            Utc::now(),
            DEFAULT_VALIDITY_MONTHS,
        );
        card.status = status;
        let mut uow = UnitOfWork::begin(f.repo.as_ref());
        uow.insert_card(&card);
        if let Some(amount) = funds {
            let mut balance = CardBalance::open(card.id, Currency::USD);
            balance.deposit(amount);
            uow.insert_balance(&balance);
        }
        uow.commit().unwrap();
        card
    }

    #[test]
    fn test_card_checks_in_order() {
        let f = fixture();
        add_card(&f, "253510000000014", CardStatus::Active, None);
        add_card(&f, "253520000000013", CardStatus::Blocked, None);
        add_card(&f, "253530000000012", CardStatus::Expired, None);
        add_card(&f, "253540000000011", CardStatus::Limited, None);

        assert!(f.service.check_card("253510000000014", f.owner).is_ok());
        assert!(f.service.check_card("253540000000011", f.owner).is_ok());
        assert!(matches!(f.service.check_card("253550000000010", f.owner), Err(Error::CardNotFound)));
        assert!(matches!(f.service.check_card("253520000000013", f.owner), Err(Error::CardBlocked)));
        assert!(matches!(f.service.check_card("253530000000012", f.owner), Err(Error::CardExpired)));
    }

    #[test]
    fn test_past_expire_date_counts_as_expired() {
        let f = fixture();
        let card = add_card(&f, "253510000000014", CardStatus::Active, None);
        let later = card.expire_date + Duration::days(1);

        assert!(f.service.check_card_on(&card.number, f.owner, card.expire_date).is_ok());
        assert!(matches!(
            f.service.check_card_on(&card.number, f.owner, later),
            Err(Error::CardExpired)
        ));
    }

    #[test]
    fn test_other_owner_sees_not_found() {
        let f = fixture();
        let card = add_card(&f, "253510000000014", CardStatus::Active, None);
        let stranger = f.repo.create_user("stranger@example.com").unwrap().id;

        assert!(matches!(f.service.check_card(&card.number, stranger), Err(Error::CardNotFound)));
    }

    #[test]
    fn test_balance_existence_and_sufficiency() {
        let f = fixture();
        let card = add_card(&f, "253510000000014", CardStatus::Active, Some(Decimal::new(5000, 2)));

        let ok = f
            .service
            .check_balance(&card.number, f.owner, Currency::USD, Some(Decimal::new(5000, 2)))
            .unwrap();
        assert_eq!(ok.balance.amount, Decimal::new(5000, 2));
        assert_eq!(ok.card.id, card.id);

        assert!(matches!(
            f.service.check_balance(&card.number, f.owner, Currency::USD, Some(Decimal::new(5001, 2))),
            Err(Error::InsufficientFunds)
        ));
        assert!(matches!(
            f.service.check_balance(&card.number, f.owner, Currency::PLN, None),
            Err(Error::BalanceNotFound)
        ));
    }

    #[test]
    fn test_amount_validated_before_lookup() {
        let f = fixture();
        // no such card: the amount error still wins
        let err = f
            .service
            .check_balance("253599999999999", f.owner, Currency::USD, Some(Decimal::new(10005, 3)))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(MoneyError::TooManyDecimals)));

        let err = f
            .service
            .check_balance("253599999999999", f.owner, Currency::USD, Some(Decimal::ZERO))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(MoneyError::NotPositive)));
    }
}
