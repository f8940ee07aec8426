//! Configuration for AtlasKV filters
//!
//! Centralized configuration with sensible defaults. Only the membership
//! filter is tunable; the position model has no knobs.

use serde::{Deserialize, Serialize};

use crate::error::{FilterError, Result};

/// Smallest bloom section accepted (64 bits)
pub const MIN_BLOOM_SIZE_BYTES: usize = 8;

/// Upper limit for an explicit bits-per-key budget
pub const MAX_BITS_PER_KEY: usize = 64;

/// Which filter variant a table carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
    /// Membership only, sized by bits per key
    Bloom,

    /// Fixed-size membership filter plus learned position model
    Hybrid,

    /// Membership sized by bits per key plus min/max key hash bounds
    Bounds,
}

/// Numeric input the position model is trained on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionInput {
    /// The key's 32-bit hash. Queries need nothing but the hash, but the
    /// hash carries no ordering, so ranges for unseen keys are wide.
    KeyHash,

    /// The key's 0-based ordinal in sorted order. Near-exact predictions,
    /// but the reader must supply the ordinal at query time.
    Ordinal,
}

/// Filter configuration for one table
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    // -------------------------------------------------------------------------
    // Variant Selection
    // -------------------------------------------------------------------------
    /// Which filter variant to train
    pub kind: FilterKind,

    // -------------------------------------------------------------------------
    // Membership Filter
    // -------------------------------------------------------------------------
    /// Fixed bloom size for the hybrid variant (512 bits by default)
    pub bloom_size_bytes: usize,

    /// Target false positive rate. Sizes the bits-per-key variants and is
    /// checked against the estimate of a trained hybrid filter.
    pub target_fp_rate: f64,

    /// Explicit bits-per-key budget, overriding `target_fp_rate` for the
    /// bloom and bounds variants
    pub bits_per_key: Option<usize>,

    // -------------------------------------------------------------------------
    // Position Model
    // -------------------------------------------------------------------------
    /// Input fed to the position model of the hybrid variant
    pub position_input: PositionInput,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            kind: FilterKind::Hybrid,
            bloom_size_bytes: 64,
            target_fp_rate: 0.05,
            bits_per_key: None,
            position_input: PositionInput::KeyHash,
        }
    }
}

impl FilterConfig {
    /// Create a new config builder
    pub fn builder() -> FilterConfigBuilder {
        FilterConfigBuilder::default()
    }

    /// Check every field against its accepted range
    pub fn validate(&self) -> Result<()> {
        if self.bloom_size_bytes < MIN_BLOOM_SIZE_BYTES {
            return Err(FilterError::Config(format!(
                "bloom_size_bytes must be at least {}, got {}",
                MIN_BLOOM_SIZE_BYTES, self.bloom_size_bytes
            )));
        }

        if !(self.target_fp_rate > 0.0 && self.target_fp_rate < 1.0) {
            return Err(FilterError::Config(format!(
                "target_fp_rate must be in (0, 1), got {}",
                self.target_fp_rate
            )));
        }

        if let Some(bpk) = self.bits_per_key {
            if bpk == 0 || bpk > MAX_BITS_PER_KEY {
                return Err(FilterError::Config(format!(
                    "bits_per_key must be in 1..={}, got {}",
                    MAX_BITS_PER_KEY, bpk
                )));
            }
        }

        Ok(())
    }

    /// Bits per key used by the bloom and bounds variants
    pub fn effective_bits_per_key(&self) -> usize {
        self.bits_per_key
            .unwrap_or_else(|| crate::filter::bits_per_key_for_rate(self.target_fp_rate))
    }
}

/// Builder for FilterConfig
#[derive(Default)]
pub struct FilterConfigBuilder {
    config: FilterConfig,
}

impl FilterConfigBuilder {
    /// Set the filter variant
    pub fn kind(mut self, kind: FilterKind) -> Self {
        self.config.kind = kind;
        self
    }

    /// Set the fixed bloom size (in bytes)
    pub fn bloom_size_bytes(mut self, size: usize) -> Self {
        self.config.bloom_size_bytes = size;
        self
    }

    /// Set the target false positive rate
    pub fn target_fp_rate(mut self, rate: f64) -> Self {
        self.config.target_fp_rate = rate;
        self
    }

    /// Set an explicit bits-per-key budget
    pub fn bits_per_key(mut self, bits: usize) -> Self {
        self.config.bits_per_key = Some(bits);
        self
    }

    /// Set the position model input
    pub fn position_input(mut self, input: PositionInput) -> Self {
        self.config.position_input = input;
        self
    }

    pub fn build(self) -> Result<FilterConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
