//! Seed hashing
//!
//! A 31-multiplier rolling hash over UTF-16 code units with wrapping 32-bit
//! arithmetic. Only stability matters: the same seed must land on the same
//! question on every device and every run. Not a security primitive.

/// Hash a seed string to a non-negative 32-bit value
pub fn seed_hash(seed: &str) -> u32 {
    let mut hash: i32 = 0;
    for unit in seed.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(unit as i32);
    }
    hash.unsigned_abs()
}
