//! Transaction domain model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::balance::{CardBalance, Currency};
use super::card::Card;

/// Kind recorded for balance-to-balance moves between two cards
pub const CARD_TO_CARD: &str = "CardToCard";

/// Append-only record of a completed transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub kind: String,
    pub amount: Decimal,
    pub sender_currency: Currency,
    pub receiver_currency: Currency,
    pub occurred_at: DateTime<Utc>,
    pub description: String,

    pub sender_card_id: Uuid,
    pub receiver_card_id: Uuid,
    pub sender_balance_id: Uuid,
    pub receiver_balance_id: Uuid,
}

impl Transaction {
    /// Record a card-to-card transfer between two balances
    pub fn card_to_card(
        sender: &Card,
        sender_balance: &CardBalance,
        receiver: &Card,
        receiver_balance: &CardBalance,
        amount: Decimal,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: CARD_TO_CARD.to_string(),
            amount,
            sender_currency: sender_balance.currency,
            receiver_currency: receiver_balance.currency,
            occurred_at,
            description: format!(
                "{} - {} (Card-To-Card) Transaction",
                sender.number, receiver.number
            ),
            sender_card_id: sender.id,
            receiver_card_id: receiver.id,
            sender_balance_id: sender_balance.id,
            receiver_balance_id: receiver_balance.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::card::{CardType, DEFAULT_VALIDITY_MONTHS};
    use crate::domain::user::UserId;

    #[test]
    fn test_card_to_card_record() {
        let now = Utc::now();
        let a = Card::issue("253510000000011".into(), CardType::Debit, "111".into(),
            UserId::new(1).unwrap(), now, DEFAULT_VALIDITY_MONTHS);
        let b = Card::issue("253600000000025".into(), CardType::Credit, "222".into(),
            UserId::new(2).unwrap(), now, DEFAULT_VALIDITY_MONTHS);
        let a_bal = CardBalance::open(a.id, Currency::USD);
        let b_bal = CardBalance::open(b.id, Currency::USD);

        let tx = Transaction::card_to_card(&a, &a_bal, &b, &b_bal, Decimal::new(3000, 2), now);
        assert_eq!(tx.kind, "CardToCard");
        assert_eq!(
            tx.description,
            "253510000000011 - 253600000000025 (Card-To-Card) Transaction"
        );
        assert_eq!(tx.sender_balance_id, a_bal.id);
        assert_eq!(tx.receiver_card_id, b.id);
    }
}
