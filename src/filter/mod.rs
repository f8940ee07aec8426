//! Filter Module
//!
//! Per-table auxiliary indexes consulted before any data block is read.
//!
//! ## Responsibilities
//! - Rule tables out: "is this key definitely absent?" (membership filter)
//! - Narrow the scan: "which blocks can hold this key?" (position model)
//! - Fixed little-endian layouts that survive process restarts
//!
//! ## Lookup Flow
//! ```text
//! query(hash)
//!   │
//!   ▼
//! ┌──────────────────────┐   no
//! │ MembershipFilter     ├──────► (false, 0, 0)  skip the whole table
//! │ may_contain(hash)?   │
//! └──────────┬───────────┘
//!            │ maybe
//!            ▼
//! ┌──────────────────────┐
//! │ PositionModel        ├──────► (true, min_block, max_block)
//! │ predict(input)       │
//! └──────────────────────┘
//! ```
//!
//! ## Hybrid Layout (little-endian)
//! ```text
//! ┌──────────────────────┬──────────┬────────────┬────────────────┐
//! │ Bloom bits (N bytes) │ K (1)    │ Slope f64  │ Intercept f64  │
//! ├──────────┬───────────┼──────────┴─┬──────────┴────────────────┤
//! │ MinErr i32│ MaxErr i32│ MaxPos u32 │ KeyCount u32              │
//! └──────────┴───────────┴────────────┴───────────────────────────┘
//!   total = N + 33
//! ```

mod bounds;
mod hybrid;
mod membership;
mod position;
mod probe;

use std::fmt;
use std::ops::RangeInclusive;

pub use bounds::{BoundsFilter, BOUNDS_TRAILER_BYTES};
pub use hybrid::{HybridIndex, MODEL_OVERHEAD_BYTES};
pub use membership::{MembershipFilter, MAX_PROBES};
pub use position::{PositionModel, Prediction, MODEL_SIZE_BYTES};
pub use probe::HashProbe;

use crate::error::{FilterError, Result};
use crate::hash::KeyHash;

/// Bits per key needed for a target false positive rate
///
/// `ceil(-ln(fp) / ln(2)^2)`, at least 1.
pub fn bits_per_key_for_rate(fp_rate: f64) -> usize {
    let ln2 = std::f64::consts::LN_2;
    let bits = (-fp_rate.ln() / (ln2 * ln2)).ceil();
    if bits.is_finite() && bits >= 1.0 {
        bits as usize
    } else {
        1
    }
}

/// Largest valid block ordinal for a table with `total_blocks` blocks
pub(crate) fn max_block_ordinal(total_blocks: usize) -> u32 {
    u32::try_from(total_blocks.saturating_sub(1)).unwrap_or(u32::MAX)
}

/// Reject training sets the models cannot represent soundly
pub(crate) fn check_training_set(
    key_hashes: &[KeyHash],
    block_indices: &[u32],
    total_blocks: usize,
) -> Result<()> {
    if key_hashes.len() != block_indices.len() {
        return Err(FilterError::InvalidTrainingSet(format!(
            "{} key hashes but {} block indices",
            key_hashes.len(),
            block_indices.len()
        )));
    }

    if let Some(&block) = block_indices.iter().find(|&&b| b as usize >= total_blocks) {
        return Err(FilterError::InvalidTrainingSet(format!(
            "block index {} outside table of {} blocks",
            block, total_blocks
        )));
    }

    Ok(())
}

// =============================================================================
// Query Result
// =============================================================================

/// Outcome of a filter lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryResult {
    /// False means the key is definitely not in the table
    pub maybe_present: bool,
    /// First block to scan (inclusive)
    pub min_block: u32,
    /// Last block to scan (inclusive)
    pub max_block: u32,
}

impl QueryResult {
    /// The key is definitely absent; no block range applies
    pub fn absent() -> Self {
        Self {
            maybe_present: false,
            min_block: 0,
            max_block: 0,
        }
    }

    /// The key may be present somewhere in `[min_block, max_block]`
    pub fn present(min_block: u32, max_block: u32) -> Self {
        Self {
            maybe_present: true,
            min_block,
            max_block,
        }
    }

    /// Blocks to scan, or None when the table can be skipped
    pub fn block_range(&self) -> Option<RangeInclusive<u32>> {
        self.maybe_present.then(|| self.min_block..=self.max_block)
    }

    /// Number of blocks the caller has to scan
    ///
    /// Up to 2^32 for a range over the whole `u32` space.
    pub fn blocks_to_scan(&self) -> u64 {
        if self.maybe_present {
            u64::from(self.max_block.saturating_sub(self.min_block)) + 1
        } else {
            0
        }
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Observational statistics for a trained filter
#[derive(Debug, Clone, PartialEq)]
pub struct FilterStats {
    /// Serialized size of the whole filter
    pub total_size_bytes: usize,
    /// Size of the bloom bit array
    pub bloom_size_bytes: usize,
    /// Size of everything after the bit array
    pub model_size_bytes: usize,
    /// Number of bits in the bloom bit array
    pub bloom_bits: usize,
    /// Probes per key
    pub probe_count: u8,
    /// Width of the widest block range a training key can get
    pub error_range: u32,
    /// Keys the filter was trained on
    pub key_count: u32,
    /// `(1 - e^(-k·n/m))^k`
    pub estimated_fp_rate: f64,
}

impl fmt::Display for FilterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "total size:      {} bytes", self.total_size_bytes)?;
        writeln!(
            f,
            "bloom:           {} bytes ({} bits, k={})",
            self.bloom_size_bytes, self.bloom_bits, self.probe_count
        )?;
        writeln!(f, "model:           {} bytes", self.model_size_bytes)?;
        writeln!(f, "keys:            {}", self.key_count)?;
        writeln!(f, "error range:     {} blocks", self.error_range)?;
        write!(f, "estimated FP:    {:.2}%", self.estimated_fp_rate * 100.0)
    }
}
