//! Hybrid index
//!
//! One fixed-size membership filter and one position model, trained over the
//! same table. The filter decides whether to search the table at all, the
//! model decides where.

use bytes::BufMut;

use super::{
    check_training_set, FilterStats, MembershipFilter, PositionModel, Prediction, QueryResult,
    MODEL_SIZE_BYTES,
};
use crate::config::{FilterConfig, PositionInput};
use crate::error::{FilterError, Result};
use crate::hash::KeyHash;

/// Bytes after the bloom bit array: probe count plus the model
pub const MODEL_OVERHEAD_BYTES: usize = 1 + MODEL_SIZE_BYTES;

/// Membership filter plus position model for one table
///
/// Immutable once trained and safe to share across threads. The zero value
/// behaves like a table without an index: every key may be present and the
/// range is the whole table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HybridIndex {
    filter: MembershipFilter,
    model: PositionModel,
}

impl HybridIndex {
    /// Train both components over one table
    ///
    /// `key_hashes[i]` and `block_indices[i]` describe the i-th key in sorted
    /// order. The filter always trains on hashes; the model trains on hashes
    /// or ordinals depending on `config.position_input`.
    pub fn train(
        key_hashes: &[KeyHash],
        block_indices: &[u32],
        total_blocks: usize,
        config: &FilterConfig,
    ) -> Result<Self> {
        config.validate()?;
        check_training_set(key_hashes, block_indices, total_blocks)?;

        let filter = MembershipFilter::train_with_size(key_hashes, config.bloom_size_bytes);
        let model = match config.position_input {
            PositionInput::KeyHash => PositionModel::train(key_hashes, block_indices, total_blocks),
            PositionInput::Ordinal => {
                let ordinals: Vec<u32> = (0..key_hashes.len() as u32).collect();
                PositionModel::train(&ordinals, block_indices, total_blocks)
            }
        };

        let index = Self { filter, model };
        let fp_rate = index.estimated_fp_rate();

        tracing::debug!(
            "Trained hybrid filter: {} keys, {} blocks, k={}, error range {}",
            key_hashes.len(),
            total_blocks,
            index.filter.probes(),
            index.model.error_range()
        );
        if fp_rate > config.target_fp_rate {
            tracing::warn!(
                "Hybrid filter of {} bytes over {} keys estimates {:.2}% false positives (target {:.2}%)",
                config.bloom_size_bytes,
                key_hashes.len(),
                fp_rate * 100.0,
                config.target_fp_rate * 100.0
            );
        }

        Ok(index)
    }

    /// Membership check; an index trained on no keys fails open
    #[inline]
    pub fn may_contain(&self, hash: KeyHash) -> bool {
        self.model.key_count() == 0 || self.filter.may_contain(hash)
    }

    /// Predicted block and scan range for a model input
    pub fn predict(&self, input: u32) -> Prediction {
        self.model.predict(input)
    }

    /// Inclusive block range for a model input
    pub fn predict_range(&self, input: u32) -> (u32, u32) {
        let prediction = self.model.predict(input);
        (prediction.min_block, prediction.max_block)
    }

    /// Two-stage lookup using the hash as the model input
    ///
    /// Only sound for an index trained with [`PositionInput::KeyHash`]. An
    /// ordinal-trained index must be queried through [`HybridIndex::query_at`];
    /// feeding it a hash yields ranges that miss the true block.
    pub fn query(&self, hash: KeyHash) -> QueryResult {
        self.query_at(hash, hash)
    }

    /// Two-stage lookup with an explicit model input (e.g. the key's ordinal)
    pub fn query_at(&self, hash: KeyHash, model_input: u32) -> QueryResult {
        if !self.may_contain(hash) {
            return QueryResult::absent();
        }
        let (min_block, max_block) = self.predict_range(model_input);
        QueryResult::present(min_block, max_block)
    }

    /// Encode into the fixed layout: `[bits][k][model]`
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.size_bytes());
        self.write_to(&mut buf);
        buf
    }

    pub(crate) fn write_to<B: BufMut>(&self, buf: &mut B) {
        self.filter.write_to(buf);
        self.model.write_to(buf);
    }

    /// Decode the fixed layout; `bloom_size_bytes` comes from table metadata
    pub fn deserialize(data: &[u8], bloom_size_bytes: usize) -> Result<Self> {
        let expected = bloom_size_bytes
            .checked_add(MODEL_OVERHEAD_BYTES)
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
        let model = PositionModel::read_from(&mut buf);
        Ok(Self { filter, model })
    }

    /// Serialized size in bytes
    pub fn size_bytes(&self) -> usize {
        self.filter.size_bytes() + MODEL_OVERHEAD_BYTES
    }

    pub fn key_count(&self) -> u32 {
        self.model.key_count()
    }

    pub fn estimated_fp_rate(&self) -> f64 {
        self.filter.estimated_fp_rate(self.model.key_count())
    }

    pub fn filter(&self) -> &MembershipFilter {
        &self.filter
    }

    pub fn model(&self) -> &PositionModel {
        &self.model
    }

    pub fn stats(&self) -> FilterStats {
        FilterStats {
            total_size_bytes: self.size_bytes(),
            bloom_size_bytes: self.filter.size_bytes(),
            model_size_bytes: MODEL_OVERHEAD_BYTES,
            bloom_bits: self.filter.size_bytes() * 8,
            probe_count: self.filter.probes(),
            error_range: self.model.error_range(),
            key_count: self.model.key_count(),
            estimated_fp_rate: self.estimated_fp_rate(),
        }
    }
}
