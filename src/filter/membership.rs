//! Membership filter
//!
//! A bloom-style bit array trained once by probing. Answers "definitely
//! absent" or "possibly present"; never produces a false negative for a
//! trained hash.

use bytes::{Buf, BufMut};

use super::probe::HashProbe;
use crate::config::MIN_BLOOM_SIZE_BYTES;
use crate::hash::KeyHash;

/// Upper bound on probes per key
pub const MAX_PROBES: u8 = 30;

/// Fixed-size bit array plus probe count
///
/// The zero value has no storage and reports every hash as possibly present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipFilter {
    bits: Vec<u8>,
    probes: u8,
}

impl MembershipFilter {
    /// Train a filter with a fixed overall size
    ///
    /// `k = round(bits / keys · ln2)`, clamped to [1, 30]. Sizes below the
    /// 64-bit floor are raised to it. An empty input leaves every bit unset
    /// with `k = 1`.
    pub fn train_with_size(hashes: &[KeyHash], size_bytes: usize) -> Self {
        let size_bytes = size_bytes.max(MIN_BLOOM_SIZE_BYTES);
        let probes = if hashes.is_empty() {
            1
        } else {
            probes_for(size_bytes as f64 * 8.0 / hashes.len() as f64)
        };
        Self::populate(hashes, vec![0; size_bytes], probes)
    }

    /// Train a filter sized by a bits-per-key budget
    ///
    /// `bits = max(keys · bits_per_key, 64)` rounded up to a whole byte and
    /// `k = round(bits_per_key · ln2)`, clamped to [1, 30].
    pub fn train_with_bits_per_key(hashes: &[KeyHash], bits_per_key: usize) -> Self {
        let bits_per_key = bits_per_key.max(1);
        let num_bits = hashes
            .len()
            .saturating_mul(bits_per_key)
            .max(MIN_BLOOM_SIZE_BYTES * 8);
        let probes = if hashes.is_empty() {
            1
        } else {
            probes_for(bits_per_key as f64)
        };
        Self::populate(hashes, vec![0; num_bits.div_ceil(8)], probes)
    }

    fn populate(hashes: &[KeyHash], bits: Vec<u8>, probes: u8) -> Self {
        let mut filter = Self { bits, probes };
        let num_bits = filter.num_bits();
        for &hash in hashes {
            for position in HashProbe::new(hash, probes, num_bits) {
                filter.bits[(position / 8) as usize] |= 1 << (position % 8);
            }
        }
        filter
    }

    /// False only if the hash was definitely never trained
    #[inline]
    pub fn may_contain(&self, hash: KeyHash) -> bool {
        if self.bits.is_empty() {
            return true;
        }
        HashProbe::new(hash, self.probes, self.num_bits())
            .all(|position| self.bits[(position / 8) as usize] & (1 << (position % 8)) != 0)
    }

    /// Probes per key
    pub fn probes(&self) -> u8 {
        self.probes
    }

    /// Size of the bit array in bytes
    pub fn size_bytes(&self) -> usize {
        self.bits.len()
    }

    /// Number of addressable bits
    pub fn num_bits(&self) -> u32 {
        u32::try_from(self.bits.len() as u64 * 8).unwrap_or(u32::MAX)
    }

    /// Raw bit array
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// `(1 - e^(-k·n/m))^k` for `key_count` trained keys
    pub fn estimated_fp_rate(&self, key_count: u32) -> f64 {
        if key_count == 0 || self.bits.is_empty() {
            return 0.0;
        }
        let k = self.probes as f64;
        let fill = 1.0 - (-k * key_count as f64 / self.num_bits() as f64).exp();
        fill.powf(k)
    }

    /// Append `[bits][k]`
    pub(crate) fn write_to<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&self.bits);
        buf.put_u8(self.probes);
    }

    /// Read `[bits][k]`; the caller guarantees `size_bytes + 1` bytes remain
    pub(crate) fn read_from<B: Buf>(buf: &mut B, size_bytes: usize) -> Self {
        let mut bits = vec![0; size_bytes];
        buf.copy_to_slice(&mut bits);
        let probes = buf.get_u8();
        Self { bits, probes }
    }
}

fn probes_for(bits_per_key: f64) -> u8 {
    (bits_per_key * std::f64::consts::LN_2)
        .round()
        .clamp(1.0, MAX_PROBES as f64) as u8
}
