//! Tests for the hybrid index
//!
//! These tests verify:
//! - Two-stage query: membership first, then block range
//! - No false negatives and sound ranges for every trained key
//! - Fixed binary layout and exact round-trip
//! - Degenerate and untrained indexes fail open
//! - Concurrent read-only use

use atlaskv_filter::filter::{HybridIndex, Prediction, MODEL_OVERHEAD_BYTES};
use atlaskv_filter::{key_hash, FilterConfig, FilterError, PositionInput, QueryResult};

// =============================================================================
// Helper Functions
// =============================================================================

fn key_hashes(count: usize) -> Vec<u32> {
    (0..count)
        .map(|i| key_hash(format!("key_{:010}", i).as_bytes()))
        .collect()
}

fn missing_hashes(count: usize) -> Vec<u32> {
    (0..count)
        .map(|i| key_hash(format!("missing_{:010}", i).as_bytes()))
        .collect()
}

/// 10 keys per block
fn blocks_for(count: usize) -> Vec<u32> {
    (0..count).map(|i| (i / 10) as u32).collect()
}

fn config_with_bloom(bytes: usize) -> FilterConfig {
    FilterConfig::builder().bloom_size_bytes(bytes).build().unwrap()
}

// =============================================================================
// Query Tests
// =============================================================================

#[test]
fn test_hundred_keys_ten_blocks() {
    let hashes = key_hashes(100);
    let blocks = blocks_for(100);
    // 800 bits for 100 keys
    let index = HybridIndex::train(&hashes, &blocks, 10, &config_with_bloom(100)).unwrap();

    let (min_block, max_block) = index.predict_range(hashes[5]);
    assert_eq!(min_block, 0);
    assert!(max_block <= 9);

    let excluded = missing_hashes(1000)
        .into_iter()
        .filter(|&h| !index.query(h).maybe_present)
        .count();
    assert!(excluded > 500, "only {} of 1000 excluded", excluded);
}

#[test]
fn test_no_false_negatives_and_sound_ranges() {
    let hashes = key_hashes(2000);
    let blocks = blocks_for(2000);
    let index = HybridIndex::train(&hashes, &blocks, 200, &FilterConfig::default()).unwrap();

    for (&h, &block) in hashes.iter().zip(&blocks) {
        let result = index.query(h);
        assert!(result.maybe_present);
        assert!(result.min_block <= block && block <= result.max_block);
        assert!(result.max_block <= 199);
    }
}

#[test]
fn test_absent_result_has_no_range() {
    let hashes = key_hashes(100);
    let index = HybridIndex::train(&hashes, &blocks_for(100), 10, &config_with_bloom(100)).unwrap();

    let absent = missing_hashes(1000)
        .into_iter()
        .map(|h| index.query(h))
        .find(|r| !r.maybe_present)
        .expect("some hash should be excluded");

    assert_eq!(absent, QueryResult::absent());
    assert_eq!(absent.block_range(), None);
    assert_eq!(absent.blocks_to_scan(), 0);
}

#[test]
fn test_ordinal_input_narrows_range() {
    let hashes = key_hashes(1000);
    let blocks = blocks_for(1000);
    let config = FilterConfig::builder()
        .bloom_size_bytes(1024)
        .position_input(PositionInput::Ordinal)
        .build()
        .unwrap();
    let index = HybridIndex::train(&hashes, &blocks, 100, &config).unwrap();

    assert!(index.model().error_range() <= 4);
    for (ordinal, (&h, &block)) in hashes.iter().zip(&blocks).enumerate() {
        let result = index.query_at(h, ordinal as u32);
        assert!(result.maybe_present);
        assert!(result.min_block <= block && block <= result.max_block);
        assert!(result.blocks_to_scan() <= 5);
    }
}

// =============================================================================
// Degenerate and Untrained Indexes
// =============================================================================

#[test]
fn test_zero_keys() {
    let index = HybridIndex::train(&[], &[], 5, &FilterConfig::default()).unwrap();

    assert_eq!(index.stats().key_count, 0);
    assert_eq!(index.filter().probes(), 1);
    for h in [0, 1, 0xffff, u32::MAX] {
        assert!(index.may_contain(h));
        assert_eq!(
            index.predict(h),
            Prediction {
                block: 0,
                min_block: 0,
                max_block: 4
            }
        );
    }
}

#[test]
fn test_single_key() {
    let h = key_hash(b"only");
    let index = HybridIndex::train(&[h], &[7], 10, &FilterConfig::default()).unwrap();

    assert_eq!(index.query(h), QueryResult::present(6, 8));
    assert_eq!(index.predict_range(12345), (6, 8));
    assert_eq!(index.stats().error_range, 2);
}

#[test]
fn test_untrained_fails_open() {
    let index = HybridIndex::default();

    for h in [0, 42, u32::MAX] {
        assert!(index.may_contain(h));
        assert_eq!(index.query(h), QueryResult::present(0, 0));
    }
}

// =============================================================================
// Serialization Tests
// =============================================================================

#[test]
fn test_serialized_size() {
    let hashes = key_hashes(300);
    for bloom in [8, 64, 100, 4096] {
        let index = HybridIndex::train(&hashes, &blocks_for(300), 30, &config_with_bloom(bloom))
            .unwrap();

        assert_eq!(index.serialize().len(), bloom + 33);
        assert_eq!(index.stats().total_size_bytes, bloom + 33);
        assert_eq!(index.stats().model_size_bytes, MODEL_OVERHEAD_BYTES);
        assert_eq!(index.stats().bloom_bits, bloom * 8);
    }
}

#[test]
fn test_round_trip() {
    let hashes = key_hashes(500);
    let index = HybridIndex::train(&hashes, &blocks_for(500), 50, &FilterConfig::default()).unwrap();

    let bytes = index.serialize();
    let restored = HybridIndex::deserialize(&bytes, 64).unwrap();

    assert_eq!(restored, index);
    for &h in hashes.iter().chain(&missing_hashes(200)) {
        assert_eq!(restored.query(h), index.query(h));
    }
}

#[test]
fn test_layout_offsets() {
    let hashes = key_hashes(100);
    let index = HybridIndex::train(&hashes, &blocks_for(100), 10, &FilterConfig::default()).unwrap();
    let bytes = index.serialize();
    let model = index.model();

    assert_eq!(&bytes[..64], index.filter().as_bytes());
    assert_eq!(bytes[64], index.filter().probes());
    assert_eq!(f64::from_le_bytes(bytes[65..73].try_into().unwrap()), model.slope());
    assert_eq!(f64::from_le_bytes(bytes[73..81].try_into().unwrap()), model.intercept());
    assert_eq!(i32::from_le_bytes(bytes[81..85].try_into().unwrap()), model.min_err());
    assert_eq!(i32::from_le_bytes(bytes[85..89].try_into().unwrap()), model.max_err());
    assert_eq!(u32::from_le_bytes(bytes[89..93].try_into().unwrap()), 9);
    assert_eq!(u32::from_le_bytes(bytes[93..97].try_into().unwrap()), 100);
}

#[test]
fn test_deserialize_truncated() {
    let index = HybridIndex::train(&key_hashes(10), &blocks_for(10), 1, &FilterConfig::default())
        .unwrap();
    let bytes = index.serialize();

    match HybridIndex::deserialize(&bytes[..bytes.len() - 1], 64) {
        Err(FilterError::Truncated { expected, actual }) => {
            assert_eq!(expected, 97);
            assert_eq!(actual, 96);
        }
        other => panic!("expected Truncated, got {:?}", other),
    }

    assert!(HybridIndex::deserialize(&[], 64).is_err());
}

#[test]
fn test_deserialize_ignores_trailing_bytes() {
    let index = HybridIndex::train(&key_hashes(10), &blocks_for(10), 1, &FilterConfig::default())
        .unwrap();
    let mut bytes = index.serialize();
    bytes.extend_from_slice(&[0xAA; 16]);

    assert_eq!(HybridIndex::deserialize(&bytes, 64).unwrap(), index);
}

#[test]
fn test_deserialize_empty_bloom_fails_open() {
    let index = HybridIndex::train(&key_hashes(10), &blocks_for(10), 1, &FilterConfig::default())
        .unwrap();
    // Reading only the model section with a zero-sized bloom
    let bytes = index.serialize();
    let restored = HybridIndex::deserialize(&bytes[64..], 0).unwrap();

    assert!(restored.may_contain(key_hash(b"anything")));
}

#[test]
fn test_deserialize_oversized_bloom_size() {
    let result = HybridIndex::deserialize(&[0u8; 40], usize::MAX);
    assert!(matches!(result, Err(FilterError::Corrupted(_))));
}

#[test]
fn test_deserialize_full_u32_block_range() {
    // 8-byte empty bloom, k=1, flat model, max_pos = u32::MAX, no keys
    let mut bytes = vec![0u8; 8];
    bytes.push(1);
    bytes.extend_from_slice(&0f64.to_le_bytes());
    bytes.extend_from_slice(&0f64.to_le_bytes());
    bytes.extend_from_slice(&0i32.to_le_bytes());
    bytes.extend_from_slice(&0i32.to_le_bytes());
    bytes.extend_from_slice(&u32::MAX.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    assert_eq!(bytes.len(), 8 + MODEL_OVERHEAD_BYTES);

    let index = HybridIndex::deserialize(&bytes, 8).unwrap();
    let result = index.query(7);

    assert_eq!(result, QueryResult::present(0, u32::MAX));
    assert_eq!(result.blocks_to_scan(), 1u64 << 32);
}

// =============================================================================
// Training Errors
// =============================================================================

#[test]
fn test_mismatched_lengths_rejected() {
    let result = HybridIndex::train(&key_hashes(10), &blocks_for(9), 1, &FilterConfig::default());
    assert!(matches!(result, Err(FilterError::InvalidTrainingSet(_))));
}

#[test]
fn test_block_outside_table_rejected() {
    let result = HybridIndex::train(&key_hashes(20), &blocks_for(20), 1, &FilterConfig::default());
    assert!(matches!(result, Err(FilterError::InvalidTrainingSet(_))));
}

#[test]
fn test_invalid_config_rejected() {
    let config = FilterConfig {
        bloom_size_bytes: 4,
        ..FilterConfig::default()
    };
    let result = HybridIndex::train(&key_hashes(10), &blocks_for(10), 1, &config);
    assert!(matches!(result, Err(FilterError::Config(_))));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_queries() {
    let hashes = key_hashes(1000);
    let blocks = blocks_for(1000);
    let index = HybridIndex::train(&hashes, &blocks, 100, &FilterConfig::default()).unwrap();
    let expected: Vec<QueryResult> = hashes.iter().map(|&h| index.query(h)).collect();

    crossbeam::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|_| {
                for (&h, want) in hashes.iter().zip(&expected) {
                    assert_eq!(index.query(h), *want);
                }
            });
        }
    })
    .unwrap();
}
