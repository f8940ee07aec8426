//! Table Module
//!
//! The table-facing side of the filters: the per-key accumulator the SSTable
//! builder feeds, the filter variant it attaches to a finished table, and the
//! footer block the reader loads back.
//!
//! ## Footer Block Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                           │
//! │   Magic: "AKVF" (4) | Version: u16 (2)                      │
//! │   MetaLen: u32 (4)  | PayloadLen: u32 (4)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Meta (bincode): kind, bloom size, position input            │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Payload: the variant's fixed layout                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Footer (4 bytes)                                            │
//! │   CRC32 over Meta + Payload                                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod codec;
mod training;

use std::fs;
use std::path::Path;

use bytes::{BufMut, Bytes};

pub use codec::{FilterMeta, FOOTER_SIZE, HEADER_SIZE, MAGIC, VERSION};
pub use training::TrainingSet;

use crate::config::{FilterConfig, FilterKind, PositionInput};
use crate::error::Result;
use crate::filter::{
    check_training_set, max_block_ordinal, BoundsFilter, FilterStats, HybridIndex,
    MembershipFilter, QueryResult,
};
use crate::hash::KeyHash;

/// Bytes after the bloom bit array of the bloom variant: k, max_pos, key_count
pub const BLOOM_TRAILER_BYTES: usize = 1 + 4 + 4;

/// The filter attached to one table
///
/// Every variant answers the same question: may the key be here, and if so
/// which blocks must be scanned.
#[derive(Debug, Clone, PartialEq)]
pub enum TableFilter {
    /// Membership only; the range is always the whole table
    Bloom {
        filter: MembershipFilter,
        max_pos: u32,
        key_count: u32,
    },

    /// Membership plus learned block position
    Hybrid {
        index: HybridIndex,
        position_input: PositionInput,
    },

    /// Membership plus key hash span
    Bounds(BoundsFilter),
}

impl TableFilter {
    /// Train the variant selected by `config.kind`
    pub fn train(
        key_hashes: &[KeyHash],
        block_indices: &[u32],
        total_blocks: usize,
        config: &FilterConfig,
    ) -> Result<Self> {
        config.validate()?;
        check_training_set(key_hashes, block_indices, total_blocks)?;

        match config.kind {
            FilterKind::Bloom => {
                let filter = MembershipFilter::train_with_bits_per_key(
                    key_hashes,
                    config.effective_bits_per_key(),
                );
                tracing::debug!(
                    "Trained bloom filter: {} keys, {} bytes, k={}",
                    key_hashes.len(),
                    filter.size_bytes(),
                    filter.probes()
                );
                Ok(TableFilter::Bloom {
                    filter,
                    max_pos: max_block_ordinal(total_blocks),
                    key_count: u32::try_from(key_hashes.len()).unwrap_or(u32::MAX),
                })
            }
            FilterKind::Hybrid => Ok(TableFilter::Hybrid {
                index: HybridIndex::train(key_hashes, block_indices, total_blocks, config)?,
                position_input: config.position_input,
            }),
            FilterKind::Bounds => Ok(TableFilter::Bounds(BoundsFilter::train(
                key_hashes,
                total_blocks,
                config.effective_bits_per_key(),
            )?)),
        }
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            TableFilter::Bloom { .. } => FilterKind::Bloom,
            TableFilter::Hybrid { .. } => FilterKind::Hybrid,
            TableFilter::Bounds(_) => FilterKind::Bounds,
        }
    }

    pub fn may_contain(&self, hash: KeyHash) -> bool {
        match self {
            TableFilter::Bloom {
                filter, key_count, ..
            } => *key_count == 0 || filter.may_contain(hash),
            TableFilter::Hybrid { index, .. } => index.may_contain(hash),
            TableFilter::Bounds(bounds) => bounds.may_contain(hash),
        }
    }

    /// Lookup by hash alone
    ///
    /// An ordinal-trained hybrid has no ordinal here, so it answers with the
    /// whole table; use [`TableFilter::query_at`] to narrow it.
    pub fn query(&self, hash: KeyHash) -> QueryResult {
        match self {
            TableFilter::Hybrid {
                index,
                position_input: PositionInput::KeyHash,
            } => index.query(hash),
            _ => self.full_range_query(hash),
        }
    }

    /// Lookup with an explicit position model input
    ///
    /// Only the hybrid variant uses `model_input`.
    pub fn query_at(&self, hash: KeyHash, model_input: u32) -> QueryResult {
        match self {
            TableFilter::Hybrid { index, .. } => index.query_at(hash, model_input),
            _ => self.full_range_query(hash),
        }
    }

    fn full_range_query(&self, hash: KeyHash) -> QueryResult {
        if !self.may_contain(hash) {
            return QueryResult::absent();
        }
        QueryResult::present(0, self.max_pos())
    }

    /// Largest valid block ordinal
    pub fn max_pos(&self) -> u32 {
        match self {
            TableFilter::Bloom { max_pos, .. } => *max_pos,
            TableFilter::Hybrid { index, .. } => index.model().max_pos(),
            TableFilter::Bounds(bounds) => bounds.max_pos(),
        }
    }

    pub fn key_count(&self) -> u32 {
        match self {
            TableFilter::Bloom { key_count, .. } => *key_count,
            TableFilter::Hybrid { index, .. } => index.key_count(),
            TableFilter::Bounds(bounds) => bounds.key_count(),
        }
    }

    /// Size of the bloom bit array, recorded in the footer metadata
    pub fn bloom_size_bytes(&self) -> usize {
        match self {
            TableFilter::Bloom { filter, .. } => filter.size_bytes(),
            TableFilter::Hybrid { index, .. } => index.filter().size_bytes(),
            TableFilter::Bounds(bounds) => bounds.filter().size_bytes(),
        }
    }

    /// Size of the variant payload, without the footer envelope
    pub fn size_bytes(&self) -> usize {
        match self {
            TableFilter::Bloom { filter, .. } => filter.size_bytes() + BLOOM_TRAILER_BYTES,
            TableFilter::Hybrid { index, .. } => index.size_bytes(),
            TableFilter::Bounds(bounds) => bounds.size_bytes(),
        }
    }

    pub fn stats(&self) -> FilterStats {
        match self {
            TableFilter::Bloom {
                filter,
                max_pos,
                key_count,
            } => FilterStats {
                total_size_bytes: self.size_bytes(),
                bloom_size_bytes: filter.size_bytes(),
                model_size_bytes: BLOOM_TRAILER_BYTES,
                bloom_bits: filter.size_bytes() * 8,
                probe_count: filter.probes(),
                error_range: *max_pos,
                key_count: *key_count,
                estimated_fp_rate: filter.estimated_fp_rate(*key_count),
            },
            TableFilter::Hybrid { index, .. } => index.stats(),
            TableFilter::Bounds(bounds) => bounds.stats(),
        }
    }

    /// Variant payload in its fixed little-endian layout
    pub(crate) fn payload(&self) -> Vec<u8> {
        match self {
            TableFilter::Bloom {
                filter,
                max_pos,
                key_count,
            } => {
                let mut buf = Vec::with_capacity(self.size_bytes());
                filter.write_to(&mut buf);
                buf.put_u32_le(*max_pos);
                buf.put_u32_le(*key_count);
                buf
            }
            TableFilter::Hybrid { index, .. } => index.serialize(),
            TableFilter::Bounds(bounds) => bounds.serialize(),
        }
    }

    /// Encode as a self-describing footer block
    pub fn encode(&self) -> Result<Bytes> {
        codec::encode(self)
    }

    /// Decode a footer block produced by [`TableFilter::encode`]
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        codec::decode(bytes)
    }

    /// Write the footer block to its own file
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.encode()?)?;
        Ok(())
    }

    /// Read a footer block file written by [`TableFilter::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::decode(&bytes)
    }
}
