//! Detector configuration.
//!
//! [`DetectorConfig`] is the on-disk document (JSON, every field defaulted);
//! [`SamplingContext`] is the validated, immutable bundle the pipeline runs on
//! once the recording's sampling rate is known.

use crate::error::{DetectError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Highest supported band-pass order (sections in the cascade).
pub const MAX_FILTER_ORDER: usize = 10;

/// Immutable parameters for one detector instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingContext {
    /// Sampling frequency in Hz
    pub fs: f64,
    /// Lower band edge in Hz
    pub fmin: f64,
    /// Upper band edge in Hz (clamped below Nyquist, see `preprocess`)
    pub fmax: f64,
    /// Energy smoothing window in seconds (0 disables)
    pub smooth_window_sec: f64,
    /// Robust z-score cutoff
    pub threshold: f64,
    /// Minimum event duration in seconds
    pub min_duration_sec: f64,
    /// Minimum number of spanned sensor channels
    pub min_sensors: usize,
    /// Gaussian smoothing sigma in cells (0 disables)
    pub sigma_2d: f64,
    /// Percentile clipped at each tail before range normalization
    pub clip_percentile: f64,
    /// Butterworth band-pass order
    #[serde(default = "default_filter_order")]
    pub filter_order: usize,
}

impl SamplingContext {
    /// Context with the documented defaults for the given rate and band
    pub fn new(fs: f64, fmin: f64, fmax: f64) -> Self {
        Self {
            fs,
            fmin,
            fmax,
            smooth_window_sec: default_smooth_sec(),
            threshold: default_threshold(),
            min_duration_sec: default_min_duration_sec(),
            min_sensors: default_min_sensors(),
            sigma_2d: default_sigma_2d(),
            clip_percentile: default_clip_percentile(),
            filter_order: default_filter_order(),
        }
    }

    pub fn nyquist(&self) -> f64 {
        0.5 * self.fs
    }

    /// Window length in samples for the energy smoother
    pub fn smooth_window_samples(&self) -> usize {
        (self.smooth_window_sec * self.fs).round() as usize
    }

    /// Minimum event duration in samples
    pub fn min_duration_samples(&self) -> usize {
        (self.min_duration_sec * self.fs).round() as usize
    }

    /// Reject contexts the pipeline cannot run on. Called before any array work.
    pub fn validate(&self) -> Result<()> {
        if !self.fs.is_finite() || self.fs <= 0.0 {
            return Err(DetectError::Configuration(format!(
                "Sampling frequency must be positive, got {} Hz",
                self.fs
            )));
        }
        self.validate_parameters()?;
        // fmax above Nyquist is tolerated (clamped), fmin is not.
        if self.fmin / self.nyquist() >= 0.9999 {
            return Err(DetectError::Configuration(format!(
                "Low cutoff ({} Hz) must be less than Nyquist ({} Hz)",
                self.fmin,
                self.nyquist()
            )));
        }
        Ok(())
    }

    /// Checks that hold whatever the sampling rate turns out to be
    pub fn validate_parameters(&self) -> Result<()> {
        let finite = [
            ("fmin", self.fmin),
            ("fmax", self.fmax),
            ("smooth_window_sec", self.smooth_window_sec),
            ("threshold", self.threshold),
            ("min_duration_sec", self.min_duration_sec),
            ("sigma_2d", self.sigma_2d),
            ("clip_percentile", self.clip_percentile),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(DetectError::Configuration(format!(
                    "{} must be finite, got {}",
                    name, value
                )));
            }
        }

        if self.fmin <= 0.0 {
            return Err(DetectError::Configuration(format!(
                "Low cutoff must be positive, got {} Hz",
                self.fmin
            )));
        }
        if self.fmin >= self.fmax {
            return Err(DetectError::Configuration(format!(
                "Low cutoff ({} Hz) must be less than high cutoff ({} Hz)",
                self.fmin, self.fmax
            )));
        }

        let non_negative = [
            ("smooth_window_sec", self.smooth_window_sec),
            ("threshold", self.threshold),
            ("min_duration_sec", self.min_duration_sec),
            ("sigma_2d", self.sigma_2d),
        ];
        for (name, value) in non_negative {
            if value < 0.0 {
                return Err(DetectError::Configuration(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }

        if self.min_sensors == 0 {
            return Err(DetectError::Configuration(
                "min_sensors must be at least 1".to_string(),
            ));
        }
        if !(0.0..50.0).contains(&self.clip_percentile) {
            return Err(DetectError::Configuration(format!(
                "clip_percentile must be in [0, 50), got {}",
                self.clip_percentile
            )));
        }
        if self.filter_order == 0 || self.filter_order > MAX_FILTER_ORDER {
            return Err(DetectError::Configuration(format!(
                "filter_order must be 1-{}, got {}",
                MAX_FILTER_ORDER, self.filter_order
            )));
        }

        Ok(())
    }
}

/// Signal-conditioning section of the configuration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    #[serde(default = "default_fmin")]
    pub fmin: f64,

    #[serde(default = "default_fmax")]
    pub fmax: f64,

    /// Recordings sampled faster than this are decimated first
    #[serde(default = "default_target_fs")]
    pub target_fs: f64,

    #[serde(default = "default_sigma_2d")]
    pub sigma_2d: f64,

    #[serde(default = "default_filter_order")]
    pub filter_order: usize,
}

/// Detection section of the configuration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_smooth_sec")]
    pub smooth_sec: f64,

    #[serde(default = "default_threshold")]
    pub threshold: f64,

    #[serde(default = "default_min_duration_sec")]
    pub min_duration_sec: f64,

    #[serde(default = "default_min_sensors")]
    pub min_sensors: usize,

    #[serde(default = "default_clip_percentile")]
    pub clip_percentile: f64,
}

/// Complete configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default)]
    pub signal: SignalConfig,

    #[serde(default)]
    pub detection: DetectionConfig,
}

fn default_fmin() -> f64 {
    1.0
}
fn default_fmax() -> f64 {
    100.0
}
fn default_target_fs() -> f64 {
    1000.0
}
fn default_sigma_2d() -> f64 {
    1.2
}
fn default_filter_order() -> usize {
    2
}
fn default_smooth_sec() -> f64 {
    0.5
}
fn default_threshold() -> f64 {
    3.0
}
fn default_min_duration_sec() -> f64 {
    1.0
}
fn default_min_sensors() -> usize {
    5
}
fn default_clip_percentile() -> f64 {
    2.0
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            fmin: default_fmin(),
            fmax: default_fmax(),
            target_fs: default_target_fs(),
            sigma_2d: default_sigma_2d(),
            filter_order: default_filter_order(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            smooth_sec: default_smooth_sec(),
            threshold: default_threshold(),
            min_duration_sec: default_min_duration_sec(),
            min_sensors: default_min_sensors(),
            clip_percentile: default_clip_percentile(),
        }
    }
}

impl DetectorConfig {
    /// Read a JSON configuration file; absent fields take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        log::debug!("Loaded configuration from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Validate everything that does not depend on a recording's rate.
    ///
    /// The rate is only known per file after decimation, so Nyquist limits
    /// are left to [`sampling_context`](Self::sampling_context).
    pub fn validate(&self) -> Result<()> {
        self.context_at(f64::NAN).validate_parameters()
    }

    /// Build and validate the pipeline context for a recording sampled at `fs`.
    pub fn sampling_context(&self, fs: f64) -> Result<SamplingContext> {
        let ctx = self.context_at(fs);
        ctx.validate()?;
        Ok(ctx)
    }

    fn context_at(&self, fs: f64) -> SamplingContext {
        SamplingContext {
            fs,
            fmin: self.signal.fmin,
            fmax: self.signal.fmax,
            smooth_window_sec: self.detection.smooth_sec,
            threshold: self.detection.threshold,
            min_duration_sec: self.detection.min_duration_sec,
            min_sensors: self.detection.min_sensors,
            sigma_2d: self.signal.sigma_2d,
            clip_percentile: self.detection.clip_percentile,
            filter_order: self.signal.filter_order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_context_is_valid() {
        let ctx = SamplingContext::new(1000.0, 1.0, 100.0);
        assert!(ctx.validate().is_ok());
        assert_eq!(ctx.smooth_window_samples(), 500);
        assert_eq!(ctx.min_duration_samples(), 1000);
    }

    #[test]
    fn test_invalid_contexts() {
        let base = SamplingContext::new(1000.0, 1.0, 100.0);

        let cases = vec![
            SamplingContext { fs: 0.0, ..base.clone() },
            SamplingContext { fmin: 100.0, ..base.clone() },
            SamplingContext { fmin: -1.0, ..base.clone() },
            SamplingContext { fmin: 600.0, fmax: 700.0, ..base.clone() },
            SamplingContext { threshold: -1.0, ..base.clone() },
            SamplingContext { smooth_window_sec: -0.1, ..base.clone() },
            SamplingContext { min_sensors: 0, ..base.clone() },
            SamplingContext { clip_percentile: 50.0, ..base.clone() },
            SamplingContext { sigma_2d: f64::NAN, ..base.clone() },
            SamplingContext { filter_order: 0, ..base.clone() },
        ];

        for ctx in cases {
            assert!(
                matches!(ctx.validate(), Err(DetectError::Configuration(_))),
                "expected configuration error for {:?}",
                ctx
            );
        }
    }

    #[test]
    fn test_fmax_above_nyquist_is_tolerated() {
        let ctx = SamplingContext::new(200.0, 1.0, 150.0);
        assert!(ctx.validate().is_ok());
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config: DetectorConfig =
            serde_json::from_str(r#"{ "signal": { "fmin": 2.0, "fmax": 40.0 } }"#).unwrap();
        assert_eq!(config.signal.fmin, 2.0);
        assert_eq!(config.signal.sigma_2d, 1.2);
        assert_eq!(config.detection, DetectionConfig::default());

        let ctx = config.sampling_context(500.0).unwrap();
        assert_eq!(ctx.fs, 500.0);
        assert_eq!(ctx.fmax, 40.0);
        assert_eq!(ctx.min_sensors, 5);
    }

    #[test]
    fn test_document_validation_ignores_rate() {
        let mut config = DetectorConfig::default();
        config.signal.fmin = 30.0;
        config.signal.fmax = 40.0;
        config.signal.target_fs = 50.0;
        // 30 Hz is above Nyquist at 50 Hz, but decimation never takes a
        // recording below target_fs, so only the per-file rate decides
        assert!(config.validate().is_ok());
        assert!(config.sampling_context(200.0).is_ok());
        assert!(config.sampling_context(50.0).is_err());

        config.detection.min_sensors = 0;
        assert!(matches!(config.validate(), Err(DetectError::Configuration(_))));
        config.detection.min_sensors = 1;
        config.signal.fmax = 20.0;
        assert!(matches!(config.validate(), Err(DetectError::Configuration(_))));
    }

    #[test]
    fn test_empty_document() {
        let config: DetectorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, DetectorConfig::default());
    }
}
