//! Random source port

/// Cryptographically strong randomness used for card numbers,
/// verification codes, PINs and hash salts
pub trait SecureRandom: Send + Sync {
    /// Uniform integer in `[0, bound)`. `bound` is never zero.
    fn next_below(&self, bound: u32) -> u32;

    fn fill_bytes(&self, buf: &mut [u8]);

    /// Uniform integer in `[low, high)`
    fn in_range(&self, low: u32, high: u32) -> u32 {
        low + self.next_below(high - low)
    }

    /// String of `len` random decimal digits, leading zeros allowed
    fn digits(&self, len: usize) -> String {
        (0..len)
            .map(|_| char::from(b'0' + self.next_below(10) as u8))
            .collect()
    }
}
