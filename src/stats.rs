//! Robust order statistics over flat buffers.
//!
//! All functions take a mutable scratch slice and reorder it in place using
//! selection rather than a full sort.

/// Linearly interpolated percentile (`q` in 0..=100) of `values`.
///
/// Matches the usual "linear" definition: position `q/100 · (n-1)` between the
/// two neighbouring order statistics. Returns 0.0 for an empty slice.
pub fn percentile_in_place(values: &mut [f64], q: f64) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }

    let pos = (q / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
    let lower = pos.floor() as usize;
    let frac = pos - lower as f64;

    let (_, lower_val, upper) = values.select_nth_unstable_by(lower, f64::total_cmp);
    let lower_val = *lower_val;
    if frac == 0.0 || upper.is_empty() {
        return lower_val;
    }

    let upper_val = upper.iter().copied().fold(f64::INFINITY, f64::min);
    lower_val + (upper_val - lower_val) * frac
}

/// Median; even lengths average the two middle values.
pub fn median_in_place(values: &mut [f64]) -> f64 {
    percentile_in_place(values, 50.0)
}

/// Median of a borrowed slice (copies into scratch).
pub fn median(values: &[f64]) -> f64 {
    let mut scratch = values.to_vec();
    median_in_place(&mut scratch)
}

/// Median absolute deviation around `center`.
pub fn median_absolute_deviation(values: &[f64], center: f64) -> f64 {
    let mut deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median_in_place(&mut deviations)
}

/// Arithmetic mean, 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
