//! Sweep-value rounding.
//!
//! Values bound into stimulus programs are cut to a fixed number of decimal
//! digits so that floating-point jitter never produces two programs that
//! differ only in the 15th digit.

/// Default number of decimal digits kept for sweep values.
pub const DEFAULT_DIGITS: u32 = 3;

/// Tolerance (in grid steps) for treating a scaled value as already integral.
const SNAP_ABS: f64 = 1e-9;
const SNAP_REL: f64 = 1e-13;

/// Round `value` toward zero at `digits` decimal places.
///
/// A value that already sits on the grid (up to accumulated floating-point
/// error, e.g. `-0.5 + 24 * 0.02`) is kept on its grid point rather than
/// being pushed one step toward zero. Non-finite values pass through.
pub fn round_down(value: f64, digits: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(digits as i32);
    let scaled = value * scale;
    let nearest = scaled.round();
    let tolerance = SNAP_ABS.max(SNAP_REL * nearest.abs());
    let steps = if (scaled - nearest).abs() <= tolerance {
        nearest
    } else {
        scaled.trunc()
    };
    let rounded = steps / scale;
    // normalise -0.0
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// [`round_down`] at [`DEFAULT_DIGITS`].
pub fn format_param(value: f64) -> f64 {
    round_down(value, DEFAULT_DIGITS)
}

/// `num` evenly spaced values over `[start, stop]`, both ends included.
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            (0..num).map(|i| start + step * i as f64).collect()
        }
    }
}
