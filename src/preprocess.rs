//! Preprocessing Pipeline
//!
//! Orchestrates the spatial-temporal conditioning of a raw strain matrix:
//! 1. Common-mode removal (per-sample median across sensors)
//! 2. Zero-phase Butterworth band-pass (per channel, mean removed first)
//! 3. 2D Gaussian smoothing over time and sensors
//! 4. Robust percentile clipping and mapping to [-1, 1]

use crate::config::SamplingContext;
use crate::filters::{ButterworthFilter, SosFilter};
use crate::matrix::Matrix;
use crate::smoothing::gaussian_filter_2d;
use crate::stats::{mean, median_in_place, percentile_in_place};
use crate::types::DetectionWarning;
use std::time::Instant;

/// Lowest normalized cutoff handed to the filter designer
const MIN_NORMALIZED_CUTOFF: f64 = 1e-4;
/// Highest normalized cutoff handed to the filter designer
const MAX_NORMALIZED_CUTOFF: f64 = 0.9999;
/// Guards the range normalization against a zero-width clip range
const RANGE_EPSILON: f64 = 1e-12;

/// Result of preprocessing one matrix
#[derive(Debug, Clone)]
pub struct PreprocessingResult {
    pub matrix: Matrix<f64>,
    pub warnings: Vec<DetectionWarning>,
    /// Processing time in milliseconds
    pub processing_time_ms: f64,
}

/// Preprocessing pipeline; the band-pass cascade is designed once and
/// reused for every channel and every call.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    bandpass: SosFilter,
    band_clamped: bool,
    sigma_2d: f64,
    clip_percentile: f64,
}

impl Preprocessor {
    /// Design the band-pass for `ctx`. The context must already be validated.
    pub fn new(ctx: &SamplingContext) -> Self {
        let nyquist = ctx.nyquist();
        let low = (ctx.fmin / nyquist).max(MIN_NORMALIZED_CUTOFF);
        let requested_high = ctx.fmax / nyquist;
        let high = requested_high.min(MAX_NORMALIZED_CUTOFF);
        let band_clamped = requested_high > MAX_NORMALIZED_CUTOFF;

        if band_clamped {
            log::warn!(
                "High cutoff ({} Hz) is not below Nyquist ({} Hz); clamping to {:.4} Hz",
                ctx.fmax,
                nyquist,
                high * nyquist
            );
        }

        let bandpass = ButterworthFilter::bandpass(low, high, ctx.filter_order);
        log::debug!(
            "Band-pass design: order {}, normalized band [{:.6}, {:.6}], {} sections",
            ctx.filter_order,
            low,
            high,
            bandpass.num_sections()
        );

        Self {
            bandpass,
            band_clamped,
            sigma_2d: ctx.sigma_2d,
            clip_percentile: ctx.clip_percentile,
        }
    }

    pub fn bandpass(&self) -> &SosFilter {
        &self.bandpass
    }

    /// Run all four stages; the input is left untouched.
    pub fn run(&self, x: &Matrix<f64>) -> PreprocessingResult {
        let start = Instant::now();
        let mut warnings = Vec::new();
        if self.band_clamped {
            warnings.push(DetectionWarning::BandClamped);
        }

        let x = remove_common_mode(x);
        let x = bandpass_filter(&x, &self.bandpass);
        let x = gaussian_filter_2d(&x, self.sigma_2d);
        let (x, degenerate) = robust_scale(&x, self.clip_percentile);

        if degenerate {
            log::warn!("Clip percentiles coincide (constant input); normalized matrix is all zeros");
            warnings.push(DetectionWarning::DegenerateInput);
        }

        PreprocessingResult {
            matrix: x,
            warnings,
            processing_time_ms: start.elapsed().as_secs_f64() * 1000.0,
        }
    }
}

/// Stateless one-shot preprocessing
pub fn preprocess(x: &Matrix<f64>, ctx: &SamplingContext) -> Matrix<f64> {
    Preprocessor::new(ctx).run(x).matrix
}

/// Subtract, at every time step, the median across all sensors.
pub fn remove_common_mode(x: &Matrix<f64>) -> Matrix<f64> {
    x.map_rows(|row| {
        let mut scratch = row.to_vec();
        let med = median_in_place(&mut scratch);
        row.iter().map(|v| v - med).collect()
    })
}

/// Remove each channel's temporal mean, then filter it forward-backward.
pub fn bandpass_filter(x: &Matrix<f64>, filter: &SosFilter) -> Matrix<f64> {
    x.map_columns(|channel| {
        let m = mean(channel);
        let centered: Vec<f64> = channel.iter().map(|v| v - m).collect();
        filter.filtfilt(&centered)
    })
}

/// Clip to the `[p, 100 - p]` percentile range of the whole matrix and map
/// affinely to [-1, 1]. Returns the scaled matrix and whether the clip range
/// was degenerate (zero width).
pub fn robust_scale(x: &Matrix<f64>, clip_percentile: f64) -> (Matrix<f64>, bool) {
    let mut scratch = x.as_slice().to_vec();
    let p_low = percentile_in_place(&mut scratch, clip_percentile);
    let p_high = percentile_in_place(&mut scratch, 100.0 - clip_percentile);
    let range = p_high - p_low;

    if range <= 0.0 {
        return (x.map(|_| 0.0), true);
    }

    let denom = range + RANGE_EPSILON;
    let scaled = x.map(|v| 2.0 * (v.clamp(p_low, p_high) - p_low) / denom - 1.0);
    (scaled, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_common_mode_identical_channels_zeroed() {
        // every channel carries the same drift
        let rows: Vec<Vec<f64>> = (0..50)
            .map(|t| vec![(t as f64 * 0.3).sin() * 7.0 + 2.0; 8])
            .collect();
        let x = Matrix::from_rows(&rows).unwrap();
        let y = remove_common_mode(&x);
        for &v in y.as_slice() {
            assert!(v.abs() < 1e-12);
        }
    }

    #[test]
    fn test_common_mode_keeps_local_signal() {
        let mut x = Matrix::filled(4, 5, 1.0);
        x.set(2, 3, 9.0);
        let y = remove_common_mode(&x);
        assert!((y.get(2, 3) - 8.0).abs() < 1e-12);
        assert!(y.get(2, 0).abs() < 1e-12);
    }

    #[test]
    fn test_robust_scale_bounds() {
        let data: Vec<f64> = (0..400).map(|i| ((i * 37) % 101) as f64 - 50.0).collect();
        let x = Matrix::from_vec(40, 10, data).unwrap();
        let (y, degenerate) = robust_scale(&x, 2.0);
        assert!(!degenerate);
        for &v in y.as_slice() {
            assert!((-1.0..=1.0).contains(&v));
        }
        let min = y.as_slice().iter().copied().fold(f64::INFINITY, f64::min);
        let max = y.as_slice().iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert!((min + 1.0).abs() < 1e-9);
        assert!((max - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_robust_scale_constant_input_is_zero() {
        let x = Matrix::filled(10, 3, 4.2);
        let (y, degenerate) = robust_scale(&x, 2.0);
        assert!(degenerate);
        assert!(y.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_bandpass_removes_channel_offset() {
        let fs = 500.0;
        let rows: Vec<Vec<f64>> = (0..1000)
            .map(|t| {
                let s = (2.0 * PI * 20.0 * t as f64 / fs).sin();
                vec![s + 100.0, s - 40.0]
            })
            .collect();
        let x = Matrix::from_rows(&rows).unwrap();
        let filter = ButterworthFilter::bandpass(5.0 / 250.0, 50.0 / 250.0, 2);
        let y = bandpass_filter(&x, &filter);

        assert_eq!(y.shape(), x.shape());
        for c in 0..2 {
            let col = y.column(c);
            assert!(mean(&col[100..900]).abs() < 0.05);
        }
    }

    #[test]
    fn test_preprocess_shape_and_range() {
        let ctx = SamplingContext {
            sigma_2d: 1.0,
            ..SamplingContext::new(200.0, 2.0, 40.0)
        };
        let data: Vec<f64> = (0..(300 * 12))
            .map(|i| {
                let t = (i / 12) as f64;
                let s = (i % 12) as f64;
                (t * 0.41 + s * 1.3).sin() + 0.01 * s
            })
            .collect();
        let x = Matrix::from_vec(300, 12, data).unwrap();
        let y = preprocess(&x, &ctx);
        assert_eq!(y.shape(), (300, 12));
        assert!(y.as_slice().iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn test_preprocessor_flags_clamped_band() {
        let ctx = SamplingContext::new(100.0, 1.0, 80.0);
        let pre = Preprocessor::new(&ctx);
        assert!(pre.bandpass().is_stable());
        let result = pre.run(&Matrix::filled(20, 3, 0.0));
        assert!(result.warnings.contains(&DetectionWarning::BandClamped));
        assert!(result.warnings.contains(&DetectionWarning::DegenerateInput));
    }
}
