//! Robust energy map.
//!
//! Statistics are global rather than per channel so that an event saturating
//! one channel for a long time still stands out against the whole array.

use crate::matrix::Matrix;
use crate::smoothing::moving_average_time;
use crate::stats::{median_absolute_deviation, median_in_place};

/// Keeps the normalization finite when more than half the cells are equal
const MAD_EPSILON: f64 = 1e-6;

/// `(|X| smoothed − median) / (MAD + ε)` over the whole matrix.
///
/// Smoothing is a centred moving average along time of
/// `round(smooth_window_sec · fs)` samples; lengths ≤ 1 skip it.
pub fn energy_map(x: &Matrix<f64>, fs: f64, smooth_window_sec: f64) -> Matrix<f64> {
    let magnitude = x.map(f64::abs);

    let smoothed = if smooth_window_sec > 0.0 {
        let window = (smooth_window_sec * fs).round() as usize;
        moving_average_time(&magnitude, window)
    } else {
        magnitude
    };

    let mut scratch = smoothed.as_slice().to_vec();
    let med = median_in_place(&mut scratch);
    let mad = median_absolute_deviation(smoothed.as_slice(), med);
    log::debug!("Energy statistics: median {:.6}, MAD {:.6}", med, mad);

    let scale = 1.0 / (mad + MAD_EPSILON);
    smoothed.map(|e| (e - med) * scale)
}
