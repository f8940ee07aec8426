//! Tests for hash probing
//!
//! These tests verify:
//! - Probe sequences are deterministic and in range
//! - The additive delta is derived from the seed by bit rotation
//! - Degenerate inputs (zero bits, zero probes) yield nothing

use atlaskv_filter::filter::HashProbe;

// =============================================================================
// Sequence Tests
// =============================================================================

#[test]
fn test_probe_is_deterministic() {
    let first: Vec<u32> = HashProbe::new(0xdead_beef, 7, 512).collect();
    let second: Vec<u32> = HashProbe::new(0xdead_beef, 7, 512).collect();

    assert_eq!(first, second);
}

#[test]
fn test_probe_count_and_range() {
    for seed in [0u32, 1, 42, 0x8000_0000, u32::MAX] {
        let positions: Vec<u32> = HashProbe::new(seed, 30, 1000).collect();
        assert_eq!(positions.len(), 30);
        assert!(positions.iter().all(|&p| p < 1000));
    }
}

#[test]
fn test_probe_follows_rotated_delta() {
    let seed: u32 = 0x1234_5678;
    let delta = seed.rotate_right(17);
    let num_bits = 4099;

    let positions: Vec<u32> = HashProbe::new(seed, 4, num_bits).collect();

    let mut h = seed;
    for &position in &positions {
        assert_eq!(position, h % num_bits);
        h = h.wrapping_add(delta);
    }
}

#[test]
fn test_probe_wraps_without_overflow() {
    let positions: Vec<u32> = HashProbe::new(u32::MAX, 30, 64).collect();
    assert_eq!(positions.len(), 30);
}

#[test]
fn test_exact_size() {
    let probe = HashProbe::new(99, 5, 128);
    assert_eq!(probe.len(), 5);
}

// =============================================================================
// Degenerate Inputs
// =============================================================================

#[test]
fn test_zero_bits_yields_nothing() {
    assert_eq!(HashProbe::new(12345, 7, 0).count(), 0);
}

#[test]
fn test_zero_probes_yields_nothing() {
    assert_eq!(HashProbe::new(12345, 0, 512).count(), 0);
}
