//! Position model
//!
//! Least-squares line `block ≈ slope·x + intercept` with the worst signed
//! error seen on the training set. For every training pair the true block
//! lies inside the predicted range; unseen inputs only get a hint.

use bytes::{Buf, BufMut};

use super::max_block_ordinal;

/// Serialized size: slope, intercept, min/max error, max position, key count
pub const MODEL_SIZE_BYTES: usize = 8 + 8 + 4 + 4 + 4 + 4;

/// Below this the regression denominator is treated as zero
const DEGENERATE_DENOMINATOR: f64 = 1e-10;

/// Predicted block and the inclusive range to scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prediction {
    pub block: u32,
    pub min_block: u32,
    pub max_block: u32,
}

/// Linear regression over (input, block) pairs with tracked error bounds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PositionModel {
    slope: f64,
    intercept: f64,
    /// Inclusive lower error bound, one-block margin included
    min_err: i32,
    /// Inclusive upper error bound, one-block margin included
    max_err: i32,
    max_pos: u32,
    key_count: u32,
}

impl PositionModel {
    /// A model with no keys; predicts the whole table
    pub fn untrained(total_blocks: usize) -> Self {
        Self {
            max_pos: max_block_ordinal(total_blocks),
            ..Self::default()
        }
    }

    /// Fit the model to parallel `inputs` / `block_indices`
    pub fn train(inputs: &[u32], block_indices: &[u32], total_blocks: usize) -> Self {
        debug_assert_eq!(inputs.len(), block_indices.len());
        let n = inputs.len().min(block_indices.len());
        let (inputs, block_indices) = (&inputs[..n], &block_indices[..n]);

        match n {
            0 => Self::untrained(total_blocks),
            1 => Self {
                slope: 0.0,
                intercept: block_indices[0] as f64,
                min_err: -1,
                max_err: 1,
                max_pos: max_block_ordinal(total_blocks),
                key_count: 1,
            },
            _ => Self::fit(inputs, block_indices, total_blocks),
        }
    }

    fn fit(inputs: &[u32], block_indices: &[u32], total_blocks: usize) -> Self {
        let n = inputs.len() as f64;
        let mean_x = inputs.iter().map(|&x| x as f64).sum::<f64>() / n;
        let mean_y = block_indices.iter().map(|&y| y as f64).sum::<f64>() / n;

        // Centered sums; n·sxx equals n·Σx² − (Σx)².
        let mut sxx = 0.0;
        let mut sxy = 0.0;
        for (&x, &y) in inputs.iter().zip(block_indices) {
            let dx = x as f64 - mean_x;
            sxx += dx * dx;
            sxy += dx * (y as f64 - mean_y);
        }

        let (slope, intercept) = if (n * sxx).abs() < DEGENERATE_DENOMINATOR {
            (0.0, mean_y)
        } else {
            let slope = sxy / sxx;
            (slope, mean_y - slope * mean_x)
        };

        let mut model = Self {
            slope,
            intercept,
            min_err: 0,
            max_err: 0,
            max_pos: max_block_ordinal(total_blocks),
            key_count: u32::try_from(inputs.len()).unwrap_or(u32::MAX),
        };

        let (lowest, highest) = inputs
            .iter()
            .zip(block_indices)
            .map(|(&x, &y)| (y as i64).saturating_sub(model.rounded(x)))
            .fold((i64::MAX, i64::MIN), |(lo, hi), err| (lo.min(err), hi.max(err)));

        model.min_err = saturate(lowest.saturating_sub(1));
        model.max_err = saturate(highest.saturating_add(1));
        model
    }

    /// `round(slope·x + intercept)`, saturating at the i64 limits
    #[inline]
    fn rounded(&self, input: u32) -> i64 {
        (self.slope * input as f64 + self.intercept).round() as i64
    }

    /// Predict the block of `input` and the range that must be scanned
    ///
    /// Every returned block lies in `[0, max_pos]` and `min_block <= max_block`.
    pub fn predict(&self, input: u32) -> Prediction {
        if self.key_count == 0 {
            return Prediction {
                block: 0,
                min_block: 0,
                max_block: self.max_pos,
            };
        }

        let predicted = self.rounded(input);
        let clamp = |block: i64| block.clamp(0, self.max_pos as i64) as u32;

        let max_block = clamp(predicted.saturating_add(self.max_err as i64));
        let min_block = clamp(predicted.saturating_add(self.min_err as i64)).min(max_block);

        Prediction {
            block: clamp(predicted),
            min_block,
            max_block,
        }
    }

    /// Regression slope
    pub fn slope(&self) -> f64 {
        self.slope
    }

    /// Regression intercept
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Lower error bound, margin included
    pub fn min_err(&self) -> i32 {
        self.min_err
    }

    /// Upper error bound, margin included
    pub fn max_err(&self) -> i32 {
        self.max_err
    }

    /// Largest valid block ordinal
    pub fn max_pos(&self) -> u32 {
        self.max_pos
    }

    /// Keys the model was trained on
    pub fn key_count(&self) -> u32 {
        self.key_count
    }

    /// `max_err - min_err`, zero if the bounds are inverted
    pub fn error_range(&self) -> u32 {
        (self.max_err as i64 - self.min_err as i64).max(0) as u32
    }

    pub(crate) fn write_to<B: BufMut>(&self, buf: &mut B) {
        buf.put_f64_le(self.slope);
        buf.put_f64_le(self.intercept);
        buf.put_i32_le(self.min_err);
        buf.put_i32_le(self.max_err);
        buf.put_u32_le(self.max_pos);
        buf.put_u32_le(self.key_count);
    }

    /// The caller guarantees `MODEL_SIZE_BYTES` remain
    pub(crate) fn read_from<B: Buf>(buf: &mut B) -> Self {
        Self {
            slope: buf.get_f64_le(),
            intercept: buf.get_f64_le(),
            min_err: buf.get_i32_le(),
            max_err: buf.get_i32_le(),
            max_pos: buf.get_u32_le(),
            key_count: buf.get_u32_le(),
        }
    }
}

fn saturate(err: i64) -> i32 {
    err.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}
