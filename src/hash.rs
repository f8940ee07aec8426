//! Key hashing
//!
//! The fixed 32-bit hash the table builder applies to every key before it
//! reaches a filter. Fast and non-cryptographic; the output must stay stable
//! across releases because it is baked into every trained filter on disk.

/// A key's 32-bit hash
pub type KeyHash = u32;

const SEED: u32 = 0xbc9f_1d34;
const MULTIPLIER: u32 = 0xc6a4_a793;

/// Hash raw key bytes
pub fn key_hash(key: &[u8]) -> KeyHash {
    let mut h = SEED ^ (key.len() as u32).wrapping_mul(MULTIPLIER);

    let mut words = key.chunks_exact(4);
    for word in &mut words {
        h = h.wrapping_add(u32::from_le_bytes([word[0], word[1], word[2], word[3]]));
        h = h.wrapping_mul(MULTIPLIER);
        h ^= h >> 16;
    }

    let tail = words.remainder();
    if !tail.is_empty() {
        if tail.len() == 3 {
            h = h.wrapping_add((tail[2] as u32) << 16);
        }
        if tail.len() >= 2 {
            h = h.wrapping_add((tail[1] as u32) << 8);
        }
        h = h.wrapping_add(tail[0] as u32);
        h = h.wrapping_mul(MULTIPLIER);
        h ^= h >> 24;
    }

    h
}
