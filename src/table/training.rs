//! Training accumulator
//!
//! Collects one (key hash, block index) pair per key while the SSTable builder
//! appends keys in sorted order, then is consumed once at finalization.

use crate::config::FilterConfig;
use crate::error::{FilterError, Result};
use crate::filter::HybridIndex;
use crate::hash::{key_hash, KeyHash};

use super::TableFilter;

/// Exclusively-owned training data for one table build
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    key_hashes: Vec<KeyHash>,
    block_indices: Vec<u32>,
}

impl TrainingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size for an expected key count
    pub fn with_capacity(keys: usize) -> Self {
        Self {
            key_hashes: Vec::with_capacity(keys),
            block_indices: Vec::with_capacity(keys),
        }
    }

    /// Record a key by its hash (must be called in sorted key order)
    ///
    /// Block indices never decrease; a smaller block than the previous one
    /// is rejected and leaves the set unchanged.
    pub fn push(&mut self, hash: KeyHash, block_index: u32) -> Result<()> {
        if let Some(&previous) = self.block_indices.last() {
            if block_index < previous {
                return Err(FilterError::OutOfOrder {
                    previous,
                    next: block_index,
                });
            }
        }
        self.key_hashes.push(hash);
        self.block_indices.push(block_index);
        Ok(())
    }

    /// Record raw key bytes (must be called in sorted key order)
    pub fn push_key(&mut self, key: &[u8], block_index: u32) -> Result<()> {
        self.push(key_hash(key), block_index)
    }

    pub fn len(&self) -> usize {
        self.key_hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_hashes.is_empty()
    }

    pub fn key_hashes(&self) -> &[KeyHash] {
        &self.key_hashes
    }

    pub fn block_indices(&self) -> &[u32] {
        &self.block_indices
    }

    /// Blocks spanned so far (last block index + 1)
    pub fn block_count(&self) -> usize {
        self.block_indices.last().map_or(0, |&b| b as usize + 1)
    }

    /// Train the configured variant and discard the accumulated pairs
    pub fn train(self, total_blocks: usize, config: &FilterConfig) -> Result<TableFilter> {
        TableFilter::train(&self.key_hashes, &self.block_indices, total_blocks, config)
    }

    /// Train a hybrid index regardless of `config.kind`
    ///
    /// With `PositionInput::Ordinal` the returned index knows nothing about
    /// its model input; look keys up with `HybridIndex::query_at(hash, ordinal)`,
    /// never `HybridIndex::query`.
    pub fn train_hybrid(self, total_blocks: usize, config: &FilterConfig) -> Result<HybridIndex> {
        HybridIndex::train(&self.key_hashes, &self.block_indices, total_blocks, config)
    }
}
