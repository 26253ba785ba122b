//! Initial-guess helpers for curve models.

use std::f64::consts::PI;

/// Largest absolute value.
pub fn max_height(y: &[f64]) -> f64 {
    y.iter().fold(0.0, |acc, v| acc.max(v.abs()))
}

/// Peak-to-peak range.
pub fn ptp(v: &[f64]) -> f64 {
    let min = v.iter().copied().fold(f64::INFINITY, f64::min);
    let max = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min.is_finite() && max.is_finite() {
        max - min
    } else {
        0.0
    }
}

/// Moving average with a centered window, shrinking at the edges.
pub fn smooth(y: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    (0..y.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(y.len());
            y[lo..hi].iter().sum::<f64>() / (hi - lo) as f64
        })
        .collect()
}

/// Baseline of a spectrum with a few narrow peaks.
///
/// The smoothed curve is flat away from the resonances, so the points with
/// the smallest local slope are averaged. Falls back to the minimum if
/// there are too few points.
pub fn constant_spectral_offset(y: &[f64]) -> f64 {
    if y.len() < 5 {
        return y.iter().copied().fold(f64::INFINITY, f64::min);
    }
    let window = (y.len() / 10).clamp(3, 11);
    let s = smooth(y, window);
    let diffs: Vec<f64> = s.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    let cutoff = 0.05 * ptp(&s).max(f64::EPSILON);

    let flat: Vec<f64> = diffs
        .iter()
        .enumerate()
        .filter(|(_, d)| **d <= cutoff)
        .map(|(i, _)| s[i])
        .collect();
    if flat.is_empty() {
        return y.iter().copied().fold(f64::INFINITY, f64::min);
    }
    flat.iter().sum::<f64>() / flat.len() as f64
}

/// Full width at half maximum of the (offset-removed) peak.
///
/// Returns the x distance between the half-height crossings either side
/// of the maximum, or a quarter of the scan range if no crossing exists.
pub fn fwhm(x: &[f64], y: &[f64]) -> f64 {
    let Some(peak) = argmax(y) else {
        return 0.0;
    };
    let half = y[peak] / 2.0;
    let left = (0..peak).rev().find(|&i| y[i] < half);
    let right = (peak + 1..y.len()).find(|&i| y[i] < half);
    match (left, right) {
        (Some(l), Some(r)) => (x[r] - x[l]).abs(),
        (Some(l), None) => 2.0 * (x[peak] - x[l]).abs(),
        (None, Some(r)) => 2.0 * (x[r] - x[peak]).abs(),
        (None, None) => ptp(x) / 4.0,
    }
}

/// Index of the largest element.
pub fn argmax(y: &[f64]) -> Option<usize> {
    (0..y.len()).max_by(|&a, &b| y[a].total_cmp(&y[b]))
}

/// A local maximum found by [`find_peaks`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    /// Sample index of the maximum.
    pub index: usize,
    /// Height above zero.
    pub height: f64,
    /// Height above the higher of the two surrounding minima.
    pub prominence: f64,
    /// Width in samples at half prominence.
    pub width: f64,
}

/// Local maxima with at least `min_height` and a width of `min_width`
/// samples at half prominence, ordered by index.
pub fn find_peaks(y: &[f64], min_height: f64, min_width: f64) -> Vec<Peak> {
    let n = y.len();
    let mut peaks = Vec::new();
    let mut i = 1;
    while i + 1 < n {
        if y[i] > y[i - 1] {
            // extend over flat tops
            let mut j = i;
            while j + 1 < n && y[j + 1] == y[i] {
                j += 1;
            }
            if j + 1 < n && y[j + 1] < y[i] {
                let index = (i + j) / 2;
                if let Some(peak) = describe_peak(y, index) {
                    if peak.height >= min_height && peak.width >= min_width {
                        peaks.push(peak);
                    }
                }
            }
            i = j + 1;
        } else {
            i += 1;
        }
    }
    peaks
}

fn describe_peak(y: &[f64], index: usize) -> Option<Peak> {
    let height = y[index];

    // walk out until a higher point, tracking the minimum on each side
    let mut left_min = height;
    for &v in y[..index].iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }
    let mut right_min = height;
    for &v in &y[index + 1..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }
    let base = left_min.max(right_min);
    let prominence = height - base;
    if prominence <= 0.0 {
        return None;
    }

    let level = height - prominence / 2.0;
    let left = crossing(y, index, level, -1);
    let right = crossing(y, index, level, 1);
    Some(Peak {
        index,
        height,
        prominence,
        width: right - left,
    })
}

/// Interpolated position where `y` drops below `level`, walking from `from`.
fn crossing(y: &[f64], from: usize, level: f64, dir: isize) -> f64 {
    let mut i = from as isize;
    loop {
        let next = i + dir;
        if next < 0 || next >= y.len() as isize {
            return i as f64;
        }
        let (a, b) = (y[i as usize], y[next as usize]);
        if b < level {
            let frac = (a - level) / (a - b);
            return i as f64 + dir as f64 * frac;
        }
        i = next;
    }
}

/// Dominant frequency (cycles per unit x) of evenly spaced data, from the
/// peak of a zero-padded discrete Fourier transform.
pub fn frequency(x: &[f64], y: &[f64]) -> f64 {
    let n = y.len();
    if n < 3 {
        return 0.0;
    }
    let dx = (x[n - 1] - x[0]) / (n - 1) as f64;
    if dx == 0.0 {
        return 0.0;
    }
    let mean = y.iter().sum::<f64>() / n as f64;
    let padded = 8 * n;

    let power = |k: usize| {
        let (mut re, mut im) = (0.0, 0.0);
        for (j, v) in y.iter().enumerate() {
            let arg = -2.0 * PI * (k * j) as f64 / padded as f64;
            re += (v - mean) * arg.cos();
            im += (v - mean) * arg.sin();
        }
        re * re + im * im
    };
    let best = (1..padded / 2)
        .max_by(|&a, &b| power(a).total_cmp(&power(b)))
        .unwrap_or(0);
    best as f64 / (padded as f64 * dx.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lorentz(x: f64, x0: f64, kappa: f64) -> f64 {
        kappa / (kappa * kappa + 4.0 * (x - x0).powi(2)).sqrt()
    }

    #[test]
    fn test_offset_of_flat_spectrum_with_peak() {
        let x: Vec<f64> = (0..101).map(|i| f64::from(i) - 50.0).collect();
        let y: Vec<f64> = x.iter().map(|&x| 0.1 + 0.8 * lorentz(x, 5.0, 2.0).powi(2)).collect();
        let b = constant_spectral_offset(&y);
        assert!((b - 0.1).abs() < 0.02, "offset {b}");
    }

    #[test]
    fn test_fwhm_of_lorentzian() {
        let x: Vec<f64> = (0..401).map(|i| f64::from(i) * 0.1 - 20.0).collect();
        // squared form has FWHM = kappa
        let y: Vec<f64> = x.iter().map(|&x| lorentz(x, 0.0, 4.0).powi(2)).collect();
        let w = fwhm(&x, &y);
        assert!((w - 4.0).abs() < 0.3, "width {w}");
    }

    #[test]
    fn test_find_two_peaks() {
        let y: Vec<f64> = (0..200)
            .map(|i| {
                let x = f64::from(i);
                lorentz(x, 60.0, 8.0).powi(2) + 0.7 * lorentz(x, 140.0, 8.0).powi(2)
            })
            .collect();
        let peaks = find_peaks(&y, 0.5, 3.0);
        assert_eq!(peaks.len(), 2);
        assert_eq!(peaks[0].index, 60);
        assert_eq!(peaks[1].index, 140);
        assert!(peaks[0].width > 5.0);
    }

    #[test]
    fn test_narrow_spikes_are_rejected() {
        let mut y = vec![0.0; 50];
        y[10] = 1.0;
        y[30] = 1.0;
        assert!(find_peaks(&y, 0.5, 3.0).is_empty());
        assert_eq!(find_peaks(&y, 0.5, 0.5).len(), 2);
    }

    #[test]
    fn test_frequency() {
        let x: Vec<f64> = (0..51).map(|i| -0.5 + f64::from(i) * 0.02).collect();
        let y: Vec<f64> = x.iter().map(|&x| (2.0 * PI * 2.5 * x).cos()).collect();
        let f = frequency(&x, &y);
        assert!((f - 2.5).abs() < 0.1, "frequency {f}");
    }
}
