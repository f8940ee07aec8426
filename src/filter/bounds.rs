//! Bounds filter
//!
//! Bits-per-key membership filter plus the smallest and largest key hash of
//! the table. A hash outside that span is absent without touching the bits.
//! Hash order says nothing about block order, so the scan range is always
//! the whole table.

use bytes::{Buf, BufMut};

use super::{max_block_ordinal, FilterStats, MembershipFilter, QueryResult};
use crate::error::{FilterError, Result};
use crate::hash::KeyHash;

/// Bytes after the bloom bit array: probe count, min/max hash, blocks, keys
pub const BOUNDS_TRAILER_BYTES: usize = 1 + 4 + 4 + 4 + 4;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundsFilter {
    filter: MembershipFilter,
    min_hash: u32,
    max_hash: u32,
    num_blocks: u32,
    key_count: u32,
}

impl BoundsFilter {
    /// Train over the table's key hashes; block indices play no part
    pub fn train(key_hashes: &[KeyHash], total_blocks: usize, bits_per_key: usize) -> Result<Self> {
        if key_hashes.is_empty() {
            return Ok(Self {
                filter: MembershipFilter::train_with_bits_per_key(&[], bits_per_key),
                min_hash: 0,
                max_hash: u32::MAX,
                num_blocks: u32::try_from(total_blocks).unwrap_or(u32::MAX),
                key_count: 0,
            });
        }
        if total_blocks == 0 {
            return Err(FilterError::InvalidTrainingSet(format!(
                "{} keys in a table with no blocks",
                key_hashes.len()
            )));
        }

        let min_hash = key_hashes.iter().copied().min().unwrap_or(0);
        let max_hash = key_hashes.iter().copied().max().unwrap_or(u32::MAX);
        let filter = MembershipFilter::train_with_bits_per_key(key_hashes, bits_per_key);

        tracing::debug!(
            "Trained bounds filter: {} keys, hash span [{:#010x}, {:#010x}], k={}",
            key_hashes.len(),
            min_hash,
            max_hash,
            filter.probes()
        );

        Ok(Self {
            filter,
            min_hash,
            max_hash,
            num_blocks: u32::try_from(total_blocks).unwrap_or(u32::MAX),
            key_count: u32::try_from(key_hashes.len()).unwrap_or(u32::MAX),
        })
    }

    pub fn may_contain(&self, hash: KeyHash) -> bool {
        if self.key_count == 0 {
            return true;
        }
        if hash < self.min_hash || hash > self.max_hash {
            return false;
        }
        self.filter.may_contain(hash)
    }

    /// Rough block guess by interpolating the hash inside the hash span
    pub fn estimate_position(&self, hash: KeyHash) -> u32 {
        if self.num_blocks == 0 {
            return 0;
        }
        if self.max_hash <= self.min_hash {
            return self.num_blocks / 2;
        }
        let span = (self.max_hash - self.min_hash) as f64;
        let offset = hash.saturating_sub(self.min_hash) as f64;
        let ratio = (offset / span).clamp(0.0, 1.0);
        (ratio * (self.num_blocks - 1) as f64) as u32
    }

    pub fn query(&self, hash: KeyHash) -> QueryResult {
        if !self.may_contain(hash) {
            return QueryResult::absent();
        }
        QueryResult::present(0, self.max_pos())
    }

    pub fn max_pos(&self) -> u32 {
        max_block_ordinal(self.num_blocks as usize)
    }

    pub fn min_hash(&self) -> u32 {
        self.min_hash
    }

    pub fn max_hash(&self) -> u32 {
        self.max_hash
    }

    pub fn key_count(&self) -> u32 {
        self.key_count
    }

    pub fn filter(&self) -> &MembershipFilter {
        &self.filter
    }

    pub fn size_bytes(&self) -> usize {
        self.filter.size_bytes() + BOUNDS_TRAILER_BYTES
    }

    /// Encode as `[bits][k][min_hash][max_hash][num_blocks][key_count]`
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.size_bytes());
        self.write_to(&mut buf);
        buf
    }

    pub(crate) fn write_to<B: BufMut>(&self, buf: &mut B) {
        self.filter.write_to(buf);
        buf.put_u32_le(self.min_hash);
        buf.put_u32_le(self.max_hash);
        buf.put_u32_le(self.num_blocks);
        buf.put_u32_le(self.key_count);
    }

    /// Decode the fixed layout; `bloom_size_bytes` comes from table metadata
    pub fn deserialize(data: &[u8], bloom_size_bytes: usize) -> Result<Self> {
        let expected = bloom_size_bytes
            .checked_add(BOUNDS_TRAILER_BYTES)
            .ok_or_else(|| {
                FilterError::Corrupted(format!("bloom size {} overflows", bloom_size_bytes))
            })?;
        if data.len() < expected {
            return Err(FilterError::Truncated {
                expected,
                actual: data.len(),
            });
        }

        let mut buf = data;
        let filter = MembershipFilter::read_from(&mut buf, bloom_size_bytes);
        Ok(Self {
            filter,
            min_hash: buf.get_u32_le(),
            max_hash: buf.get_u32_le(),
            num_blocks: buf.get_u32_le(),
            key_count: buf.get_u32_le(),
        })
    }

    pub fn stats(&self) -> FilterStats {
        FilterStats {
            total_size_bytes: self.size_bytes(),
            bloom_size_bytes: self.filter.size_bytes(),
            model_size_bytes: BOUNDS_TRAILER_BYTES,
            bloom_bits: self.filter.size_bytes() * 8,
            probe_count: self.filter.probes(),
            error_range: self.max_pos(),
            key_count: self.key_count,
            estimated_fp_rate: self.filter.estimated_fp_rate(self.key_count),
        }
    }
}
