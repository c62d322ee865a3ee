//! Operating system randomness

use rand::rngs::OsRng;
use rand::{Rng, RngCore};

use crate::ports::SecureRandom;

/// [`SecureRandom`] backed by the operating system CSPRNG
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl SecureRandom for OsRandom {
    fn next_below(&self, bound: u32) -> u32 {
        OsRng.gen_range(0..bound)
    }

    fn fill_bytes(&self, buf: &mut [u8]) {
        OsRng.fill_bytes(buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_stay_in_range() {
        let rng = OsRandom;
        for _ in 0..1000 {
            assert!(rng.in_range(3510, 3941) >= 3510);
            assert!(rng.in_range(3510, 3941) < 3941);
        }
    }

    #[test]
    fn test_digits() {
        let pin = OsRandom.digits(4);
        assert_eq!(pin.len(), 4);
        assert!(pin.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_fill_bytes_is_not_constant() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        OsRandom.fill_bytes(&mut a);
        OsRandom.fill_bytes(&mut b);
        assert_ne!(a, b);
    }
}
