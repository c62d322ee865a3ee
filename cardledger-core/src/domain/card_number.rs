//! Card number layout and Luhn checksum
//!
//! A generated number is the issuer prefix, a random 4-digit suffix, the
//! owner's id zero-padded to 8 digits, and one Luhn check digit:
//!
//! ```text
//! 25 | 3510..3940 | 00000042 | c
//! ```

use super::user::UserId;

/// Issuer identification prefix
pub const ISSUER_PREFIX: &str = "25";

/// Lower bound (inclusive) of the random suffix
pub const SUFFIX_MIN: u32 = 3510;

/// Upper bound (exclusive) of the random suffix
pub const SUFFIX_MAX: u32 = 3941;

/// Width of the zero-padded user id field
pub const USER_ID_WIDTH: usize = 8;

/// Length of every generated number
pub const GENERATED_LENGTH: usize = 15;

/// Width of the stored card number column
pub const NUMBER_COLUMN_WIDTH: usize = 19;

/// Number of distinct suffixes, and so of distinct numbers per user
pub const SUFFIX_SPACE: u32 = SUFFIX_MAX - SUFFIX_MIN;

/// Compute the Luhn check digit for a string of digits.
///
/// Walks right to left doubling every second digit, starting with the
/// rightmost one; doubled values above 9 have 9 subtracted.
/// Returns `None` if the input is empty or contains a non-digit.
pub fn luhn_check_digit(digits: &str) -> Option<u8> {
    if digits.is_empty() {
        return None;
    }
    let mut sum: u32 = 0;
    for (i, ch) in digits.chars().rev().enumerate() {
        let mut d = ch.to_digit(10)?;
        if i % 2 == 0 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    Some(((10 - sum % 10) % 10) as u8)
}

/// Whether a full number (payload plus trailing check digit) passes Luhn
pub fn luhn_is_valid(number: &str) -> bool {
    let Some((at, check)) = number.char_indices().last() else {
        return false;
    };
    let payload = &number[..at];
    if payload.is_empty() {
        return false;
    }
    match (luhn_check_digit(payload), check.to_digit(10)) {
        (Some(expected), Some(actual)) => u32::from(expected) == actual,
        _ => false,
    }
}

/// Assemble the number for a given suffix and owner
pub fn compose(suffix: u32, user_id: UserId) -> String {
    debug_assert!((SUFFIX_MIN..SUFFIX_MAX).contains(&suffix));
    let payload = format!(
        "{}{}{:0width$}",
        ISSUER_PREFIX,
        suffix,
        user_id.get(),
        width = USER_ID_WIDTH
    );
    // payload is all digits by construction
    let check = luhn_check_digit(&payload).unwrap_or(0);
    format!("{}{}", payload, check)
}

/// Mask a card number for logs and listings: `25••••••••••123`
pub fn mask(number: &str) -> String {
    let chars: Vec<char> = number.chars().collect();
    if chars.len() <= 5 {
        return "•".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 3..].iter().collect();
    format!("{}{}{}", head, "•".repeat(chars.len() - 5), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_luhn_values() {
        assert_eq!(luhn_check_digit("7992739871"), Some(3));
        assert!(luhn_is_valid("79927398713"));
        assert!(!luhn_is_valid("79927398710"));
        assert!(luhn_is_valid("4539578763621486"));
    }

    #[test]
    fn test_luhn_rejects_garbage() {
        assert_eq!(luhn_check_digit(""), None);
        assert_eq!(luhn_check_digit("12a4"), None);
        assert!(!luhn_is_valid("7"));
        assert!(!luhn_is_valid("7992739871x"));
        assert!(!luhn_is_valid(""));
        assert!(!luhn_is_valid("1é"));
        assert!(!luhn_is_valid("é7"));
        assert!(!luhn_is_valid("799273987١"));
    }

    #[test]
    fn test_compose_layout() {
        let number = compose(3510, UserId::new(42).unwrap());
        assert_eq!(number.len(), GENERATED_LENGTH);
        assert!(number.starts_with("253510"));
        assert_eq!(&number[6..14], "00000042");
        assert!(luhn_is_valid(&number));
        assert!(number.len() <= NUMBER_COLUMN_WIDTH);
    }

    #[test]
    fn test_every_suffix_gives_valid_number() {
        let user = UserId::new(99_999_999).unwrap();
        for suffix in SUFFIX_MIN..SUFFIX_MAX {
            let number = compose(suffix, user);
            assert!(luhn_is_valid(&number), "{} failed Luhn", number);
        }
    }

    #[test]
    fn test_single_digit_change_breaks_checksum() {
        let number = compose(3777, UserId::new(1234).unwrap());
        let mut digits: Vec<u8> = number.bytes().map(|b| b - b'0').collect();
        digits[5] = (digits[5] + 1) % 10;
        let altered: String = digits.iter().map(|d| char::from(b'0' + d)).collect();
        assert!(!luhn_is_valid(&altered));
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("253510000000421"), "25••••••••••421");
        assert_eq!(mask("123"), "•••");
    }
}
