//! Monetary amount rules
//!
//! Every amount that enters a debit or credit path goes through
//! [`validate_amount`] before any card or balance is looked up.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of decimal places money is kept with
pub const MONEY_SCALE: u32 = 2;

/// Largest amount a `DECIMAL(15,2)` column holds: 9 999 999 999 999.99
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_319, 232_830, 0, false, 2);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoneyError {
    #[error("amount of money must be rounded to 2 decimals")]
    TooManyDecimals,

    #[error("amount of money cannot be negative nor zero")]
    NotPositive,

    #[error("amount of money exceeds the supported maximum")]
    TooLarge,
}

/// Validate an amount for a debit or credit operation
pub fn validate_amount(amount: Decimal) -> Result<(), MoneyError> {
    if amount != amount.round_dp(MONEY_SCALE) {
        return Err(MoneyError::TooManyDecimals);
    }
    if amount <= Decimal::ZERO {
        return Err(MoneyError::NotPositive);
    }
    if amount > MAX_AMOUNT {
        return Err(MoneyError::TooLarge);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_max_amount_constant() {
        assert_eq!(MAX_AMOUNT, dec("9999999999999.99"));
    }

    #[test]
    fn test_valid_amounts() {
        assert!(validate_amount(dec("0.01")).is_ok());
        assert!(validate_amount(dec("30")).is_ok());
        assert!(validate_amount(dec("30.10")).is_ok());
        // trailing zeros beyond the scale are still a 2dp value
        assert!(validate_amount(dec("12.5000")).is_ok());
        assert!(validate_amount(MAX_AMOUNT).is_ok());
    }

    #[test]
    fn test_too_many_decimals() {
        assert_eq!(validate_amount(dec("10.005")), Err(MoneyError::TooManyDecimals));
        assert_eq!(validate_amount(dec("0.001")), Err(MoneyError::TooManyDecimals));
    }

    #[test]
    fn test_scale_is_checked_before_sign() {
        assert_eq!(validate_amount(dec("-1.005")), Err(MoneyError::TooManyDecimals));
    }

    #[test]
    fn test_non_positive() {
        assert_eq!(validate_amount(Decimal::ZERO), Err(MoneyError::NotPositive));
        assert_eq!(validate_amount(dec("-5.00")), Err(MoneyError::NotPositive));
    }

    #[test]
    fn test_too_large() {
        assert_eq!(validate_amount(dec("10000000000000.00")), Err(MoneyError::TooLarge));
    }
}
