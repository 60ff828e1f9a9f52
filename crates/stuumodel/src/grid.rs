//! Musical grid math and numeric ranges.
//!
//! Everything on the timeline snaps to one grid: 1/16 of a beat. All
//! clamping ranges for project numerics live here so the normalizer,
//! validator, and mutation code agree on a single source of truth.

/// One grid step, in beats (1/16 beat).
pub const GRID_STEP: f64 = 1.0 / 16.0;

pub const BPM_MIN: f64 = 20.0;
pub const BPM_MAX: f64 = 300.0;

pub const VOLUME_MIN: f64 = 0.0;
pub const VOLUME_MAX: f64 = 1.2;

pub const PAN_MIN: f64 = -1.0;
pub const PAN_MAX: f64 = 1.0;

pub const VIEW_BARS_MIN: u32 = 8;
pub const VIEW_BARS_MAX: u32 = 4096;

pub const BAR_WIDTH_MIN: f64 = 36.0;
pub const BAR_WIDTH_MAX: f64 = 220.0;

pub const PATTERN_STEPS_MIN: u32 = 1;
pub const PATTERN_STEPS_MAX: u32 = 128;

pub const SWING_MAX: f64 = 0.95;

pub const PITCH_MAX: u8 = 127;

pub const TRACK_NAME_MAX: usize = 25;

pub const MAX_PEAKS: usize = 2048;

/// Round to 6 decimal places, the precision beat values are emitted at.
pub fn round6(v: f64) -> f64 {
    (v * 1e6).round() / 1e6
}

/// Snap to the nearest grid step.
pub fn quantize(beats: f64) -> f64 {
    round6((beats / GRID_STEP).round() * GRID_STEP)
}

/// Snap up to the next grid step.
pub fn ceil_to_grid(beats: f64) -> f64 {
    round6((beats / GRID_STEP).ceil() * GRID_STEP)
}

/// True when `v` is an integer multiple of the grid step to within
/// 6-decimal rounding.
pub fn is_grid_aligned(v: f64) -> bool {
    v.is_finite() && ((v / GRID_STEP).round() * GRID_STEP - v).abs() < 5e-7
}

/// Clamp into `[lo, hi]`, substituting `fallback` for non-finite input.
pub fn clamp_finite(v: f64, lo: f64, hi: f64, fallback: f64) -> f64 {
    if v.is_finite() {
        v.clamp(lo, hi)
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantize_snaps_to_sixteenths() {
        // 0.37 / 0.0625 = 5.92 -> 6 steps -> 0.375
        assert_eq!(quantize(0.37), 0.375);
        assert_eq!(quantize(0.0), 0.0);
        assert_eq!(quantize(1.0), 1.0);
        assert_eq!(quantize(0.031), 0.0625);
        assert_eq!(quantize(0.03), 0.0625);
        assert_eq!(quantize(0.02), 0.0);
    }

    #[test]
    fn ceil_snaps_upward() {
        assert_eq!(ceil_to_grid(0.01), 0.0625);
        assert_eq!(ceil_to_grid(4.0), 4.0);
        assert_eq!(ceil_to_grid(4.0001), 4.0625);
    }

    #[test]
    fn grid_alignment_tolerates_rounding() {
        assert!(is_grid_aligned(0.375));
        assert!(is_grid_aligned(0.375000001));
        assert!(!is_grid_aligned(0.37));
        assert!(!is_grid_aligned(f64::NAN));
    }

    #[test]
    fn clamp_finite_handles_nan() {
        assert_eq!(clamp_finite(f64::NAN, 20.0, 300.0, 128.0), 128.0);
        assert_eq!(clamp_finite(f64::INFINITY, 20.0, 300.0, 128.0), 128.0);
        assert_eq!(clamp_finite(500.0, 20.0, 300.0, 128.0), 300.0);
        assert_eq!(clamp_finite(60.0, 20.0, 300.0, 128.0), 60.0);
    }

    #[test]
    fn round6_trims_noise() {
        assert_eq!(round6(0.1 + 0.2), 0.3);
        assert_eq!(round6(1.0000004), 1.0);
    }
}
