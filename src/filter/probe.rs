//! Hash probing
//!
//! Derives `k` bit positions from a single 32-bit hash by double hashing with
//! a fixed additive delta, so the key is hashed once no matter how many
//! probes the filter uses. Insertion and lookup walk the same sequence.

use crate::hash::KeyHash;

/// Iterator over the probe positions of one key hash
#[derive(Debug, Clone)]
pub struct HashProbe {
    h: u32,
    delta: u32,
    remaining: u8,
    num_bits: u32,
}

impl HashProbe {
    /// Probe sequence of `probes` positions in `[0, num_bits)`
    ///
    /// A zero-bit filter has no positions; the sequence is empty.
    pub fn new(seed: KeyHash, probes: u8, num_bits: u32) -> Self {
        Self {
            h: seed,
            delta: (seed >> 17) | (seed << 15),
            remaining: if num_bits == 0 { 0 } else { probes },
            num_bits,
        }
    }
}

impl Iterator for HashProbe {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<u32> {
        if self.remaining == 0 {
            return None;
        }
        let position = self.h % self.num_bits;
        self.h = self.h.wrapping_add(self.delta);
        self.remaining -= 1;
        Some(position)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for HashProbe {}
