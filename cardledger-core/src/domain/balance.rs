//! Card balance domain model

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::Error;

/// Currencies a card balance can be held in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    UAH,
    USD,
    PLN,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::UAH, Currency::USD, Currency::PLN];

    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::UAH => "UAH",
            Currency::USD => "USD",
            Currency::PLN => "PLN",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_uppercase();
        Currency::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or_else(|| Error::validation(format!("unsupported currency: {}", s)))
    }
}

/// Money held by one card in one currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardBalance {
    pub id: Uuid,
    pub currency: Currency,
    pub amount: Decimal,
    /// Internal link; absent from the wire form and nil when read back
    #[serde(skip)]
    pub card_id: Uuid,
}

impl CardBalance {
    /// Open an empty balance on a card
    pub fn open(card_id: Uuid, currency: Currency) -> Self {
        Self {
            id: Uuid::new_v4(),
            currency,
            amount: Decimal::ZERO,
            card_id,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn covers(&self, amount: Decimal) -> bool {
        self.amount >= amount
    }

    /// Add money in memory. The amount must already be validated and the
    /// balance must have passed the availability check.
    pub fn deposit(&mut self, amount: Decimal) {
        self.amount += amount;
    }

    /// Take money out in memory. Callers confirm sufficiency through the
    /// availability check first; this never checks on its own.
    pub fn withdraw(&mut self, amount: Decimal) {
        debug_assert!(self.covers(amount), "withdraw called without a sufficiency check");
        self.amount -= amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_parsing() {
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::USD);
        assert_eq!(" PLN ".parse::<Currency>().unwrap(), Currency::PLN);
        assert!("EUR".parse::<Currency>().is_err());
    }

    #[test]
    fn test_open_balance_is_empty() {
        let balance = CardBalance::open(Uuid::new_v4(), Currency::UAH);
        assert!(balance.is_empty());
        assert_eq!(balance.currency.code(), "UAH");
    }

    #[test]
    fn test_wire_form_reads_back_without_card_link() {
        let mut balance = CardBalance::open(Uuid::new_v4(), Currency::PLN);
        balance.deposit(Decimal::new(1250, 2));

        let json = serde_json::to_value(&balance).unwrap();
        assert!(json.get("card_id").is_none());

        let read: CardBalance = serde_json::from_value(json).unwrap();
        assert_eq!(read.id, balance.id);
        assert_eq!(read.amount, balance.amount);
        assert!(read.card_id.is_nil());
    }

    #[test]
    fn test_deposit_and_withdraw_primitives() {
        let mut balance = CardBalance::open(Uuid::new_v4(), Currency::USD);
        balance.deposit(Decimal::new(10000, 2));
        balance.withdraw(Decimal::new(3000, 2));
        assert_eq!(balance.amount, Decimal::new(7000, 2));
        assert!(balance.covers(Decimal::new(7000, 2)));
        assert!(!balance.covers(Decimal::new(7001, 2)));
    }
}
