//! # AtlasKV Filter
//!
//! Per-SSTable auxiliary indexes for AtlasKV:
//! - Compact Bloom-style membership filter ("definitely not here")
//! - Learned position model with tracked error bounds ("scan blocks X..Y")
//! - Fixed little-endian layouts that round-trip across restarts
//! - Capability-tagged variants behind one query contract
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SSTable Builder                           │
//! │          push_key(key, block) per sorted key                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ TrainingSet (consumed once)
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     TableFilter                              │
//! │            Bloom  |  Hybrid  |  Bounds                       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ encode / decode (footer block)
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ Membership  │          │  Position   │
//!   │   Filter    │          │   Model     │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod hash;
pub mod filter;
pub mod table;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{FilterError, Result};
pub use config::{FilterConfig, FilterKind, PositionInput};
pub use filter::{FilterStats, HybridIndex, QueryResult};
pub use hash::{key_hash, KeyHash};
pub use table::{TableFilter, TrainingSet};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the AtlasKV filter crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
