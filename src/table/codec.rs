//! Footer block codec
//!
//! Wraps a variant payload with a header, bincode metadata and a CRC32, so a
//! reader can load the filter without knowing its kind or bloom size.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use super::{TableFilter, BLOOM_TRAILER_BYTES};
use crate::config::{FilterKind, PositionInput};
use crate::error::{FilterError, Result};
use crate::filter::{BoundsFilter, HybridIndex, MembershipFilter};

/// Magic bytes identifying an AtlasKV filter block
pub const MAGIC: &[u8; 4] = b"AKVF";

/// Current filter block format version
pub const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + MetaLen (4) + PayloadLen (4) = 14 bytes
pub const HEADER_SIZE: usize = 14;

/// Footer size: CRC32 (4)
pub const FOOTER_SIZE: usize = 4;

/// What the reader needs to interpret the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterMeta {
    pub kind: FilterKind,
    pub bloom_size_bytes: u32,
    pub position_input: PositionInput,
}

impl FilterMeta {
    fn of(filter: &TableFilter) -> Result<Self> {
        let bloom_size_bytes = u32::try_from(filter.bloom_size_bytes()).map_err(|_| {
            FilterError::Serialization(format!(
                "bloom of {} bytes does not fit the footer block",
                filter.bloom_size_bytes()
            ))
        })?;
        let position_input = match filter {
            TableFilter::Hybrid { position_input, .. } => *position_input,
            _ => PositionInput::KeyHash,
        };
        Ok(Self {
            kind: filter.kind(),
            bloom_size_bytes,
            position_input,
        })
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode a filter as a footer block
///
/// Format: header (14) + meta + payload + crc (4)
pub fn encode(filter: &TableFilter) -> Result<Bytes> {
    let meta = bincode::serialize(&FilterMeta::of(filter)?)?;
    let payload = filter.payload();

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&meta);
    hasher.update(&payload);

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + meta.len() + payload.len() + FOOTER_SIZE);
    buf.put_slice(MAGIC);
    buf.put_u16_le(VERSION);
    buf.put_u32_le(meta.len() as u32);
    buf.put_u32_le(payload.len() as u32);
    buf.put_slice(&meta);
    buf.put_slice(&payload);
    buf.put_u32_le(hasher.finalize());

    Ok(buf.freeze())
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a footer block
pub fn decode(bytes: &[u8]) -> Result<TableFilter> {
    if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
        return Err(FilterError::Truncated {
            expected: HEADER_SIZE + FOOTER_SIZE,
            actual: bytes.len(),
        });
    }

    if &bytes[0..4] != MAGIC {
        return Err(corrupted(format!(
            "invalid magic: expected AKVF, got {:?}",
            &bytes[0..4]
        )));
    }

    let mut header = &bytes[4..HEADER_SIZE];
    let version = header.get_u16_le();
    if version != VERSION {
        return Err(corrupted(format!("unsupported version: {}", version)));
    }
    let meta_len = header.get_u32_le() as usize;
    let payload_len = header.get_u32_le() as usize;

    let body_end = HEADER_SIZE
        .checked_add(meta_len)
        .and_then(|n| n.checked_add(payload_len))
        .ok_or_else(|| corrupted("section lengths overflow".to_string()))?;
    let expected = body_end + FOOTER_SIZE;
    if bytes.len() < expected {
        return Err(FilterError::Truncated {
            expected,
            actual: bytes.len(),
        });
    }

    let body = &bytes[HEADER_SIZE..body_end];
    let stored_crc = (&bytes[body_end..expected]).get_u32_le();
    let actual_crc = crc32fast::hash(body);
    if stored_crc != actual_crc {
        return Err(corrupted(format!(
            "CRC mismatch: stored {:#010x}, computed {:#010x}",
            stored_crc, actual_crc
        )));
    }

    let (meta, payload) = body.split_at(meta_len);
    let meta: FilterMeta = bincode::deserialize(meta)?;
    decode_payload(&meta, payload)
}

fn decode_payload(meta: &FilterMeta, payload: &[u8]) -> Result<TableFilter> {
    let bloom_size = meta.bloom_size_bytes as usize;

    match meta.kind {
        FilterKind::Bloom => {
            let expected = bloom_size
                .checked_add(BLOOM_TRAILER_BYTES)
                .ok_or_else(|| corrupted(format!("bloom size {} overflows", bloom_size)))?;
            if payload.len() < expected {
                return Err(FilterError::Truncated {
                    expected,
                    actual: payload.len(),
                });
            }
            let mut buf = payload;
            let filter = MembershipFilter::read_from(&mut buf, bloom_size);
            Ok(TableFilter::Bloom {
                filter,
                max_pos: buf.get_u32_le(),
                key_count: buf.get_u32_le(),
            })
        }
        FilterKind::Hybrid => Ok(TableFilter::Hybrid {
            index: HybridIndex::deserialize(payload, bloom_size)?,
            position_input: meta.position_input,
        }),
        FilterKind::Bounds => Ok(TableFilter::Bounds(BoundsFilter::deserialize(
            payload, bloom_size,
        )?)),
    }
}

fn corrupted(reason: String) -> FilterError {
    tracing::debug!("Rejected filter block: {}", reason);
    FilterError::Corrupted(reason)
}
