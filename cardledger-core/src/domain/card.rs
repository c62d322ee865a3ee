//! Card domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::Error;
use super::user::UserId;

/// Default validity of a new card: 6 years 6 months
pub const DEFAULT_VALIDITY_MONTHS: u32 = 78;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardType {
    Debit,
    Credit,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Debit => "Debit",
            CardType::Credit => "Credit",
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debit" => Ok(CardType::Debit),
            "credit" => Ok(CardType::Credit),
            other => Err(Error::validation(format!("unknown card type: {}", other))),
        }
    }
}

/// Card status. `Expired` is only ever set by the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardStatus {
    Active,
    Limited,
    Blocked,
    Expired,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Active => "Active",
            CardStatus::Limited => "Limited",
            CardStatus::Blocked => "Blocked",
            CardStatus::Expired => "Expired",
        }
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(CardStatus::Active),
            "limited" => Ok(CardStatus::Limited),
            "blocked" => Ok(CardStatus::Blocked),
            "expired" => Ok(CardStatus::Expired),
            other => Err(Error::validation(format!("unknown card status: {}", other))),
        }
    }
}

/// A payment card owned by a single user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    pub number: String,
    pub card_type: CardType,
    pub status: CardStatus,
    pub verification_code: String,
    pub expire_date: NaiveDate,

    // Spending limits are recorded but not enforced
    pub withdrawn_today: Option<Decimal>,
    pub withdrawal_limit: Option<Decimal>,
    pub transacted_today: Option<Decimal>,
    pub transaction_limit: Option<Decimal>,
    pub last_transaction_at: Option<DateTime<Utc>>,

    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Card {
    /// Build a freshly issued, active card
    pub fn issue(
        number: String,
        card_type: CardType,
        verification_code: String,
        user_id: UserId,
        issued_at: DateTime<Utc>,
        validity_months: u32,
    ) -> Self {
        let issued_on = issued_at.date_naive();
        let expire_date = issued_on
            .checked_add_months(Months::new(validity_months))
            .unwrap_or(NaiveDate::MAX);
        Self {
            id: Uuid::new_v4(),
            number,
            card_type,
            status: CardStatus::Active,
            verification_code,
            expire_date,
            withdrawn_today: None,
            withdrawal_limit: None,
            transacted_today: None,
            transaction_limit: None,
            last_transaction_at: None,
            user_id,
            created_at: issued_at,
        }
    }

    /// Expired either by status or because the expire date has passed
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.status == CardStatus::Expired || self.expire_date < today
    }

    pub fn is_blocked(&self) -> bool {
        self.status == CardStatus::Blocked
    }
}
