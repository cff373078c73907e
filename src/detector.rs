use crate::config::SamplingContext;
use crate::energy::energy_map;
use crate::error::{DetectError, Result};
use crate::events::parameterize;
use crate::matrix::Matrix;
use crate::preprocess::Preprocessor;
use crate::profile_scope;
use crate::segmentation::{label_regions, threshold_mask};
use crate::types::Detection;

/// DAS Event Detector
///
/// Holds only the validated, immutable [`SamplingContext`] and the band-pass
/// designed from it, so one detector can serve concurrent `detect` calls on
/// independent matrices.
#[derive(Debug, Clone)]
pub struct EventDetector {
    ctx: SamplingContext,
    preprocessor: Preprocessor,
}

impl EventDetector {
    /// Create a detector, rejecting invalid configuration up front
    ///
    /// # Arguments
    /// * `ctx` - Sampling rate, band and detection parameters
    ///
    /// # Returns
    /// The detector, or `DetectError::Configuration`
    pub fn new(ctx: SamplingContext) -> Result<Self> {
        ctx.validate()?;
        let preprocessor = Preprocessor::new(&ctx);
        Ok(Self { ctx, preprocessor })
    }

    pub fn context(&self) -> &SamplingContext {
        &self.ctx
    }

    /// Run the full pipeline on a raw `T × S` strain matrix
    ///
    /// # Arguments
    /// * `x_raw` - Raw strain matrix, rows are time steps, columns sensors
    ///
    /// # Returns
    /// Events plus the energy map, mask and preprocessed matrix, all shaped
    /// like `x_raw`
    pub fn detect(&self, x_raw: &Matrix<f64>) -> Result<Detection> {
        validate_shape(x_raw)?;
        let (rows, cols) = x_raw.shape();
        log::info!("Detecting events in {} samples × {} sensors", rows, cols);

        let preprocessed = {
            profile_scope!("preprocess", (rows, cols));
            self.preprocessor.run(x_raw)
        };
        log::info!(
            "Preprocessing completed in {:.2}ms",
            preprocessed.processing_time_ms
        );

        let energy = {
            profile_scope!("energy_map", (rows, cols));
            energy_map(&preprocessed.matrix, self.ctx.fs, self.ctx.smooth_window_sec)
        };

        let mask = threshold_mask(&energy, self.ctx.threshold);
        log::info!(
            "{} of {} cells above threshold {}",
            mask.count_true(),
            mask.len(),
            self.ctx.threshold
        );

        let regions = {
            profile_scope!("label_regions", (rows, cols));
            label_regions(&mask)
        };

        let events = parameterize(
            &regions,
            &energy,
            self.ctx.fs,
            self.ctx.min_duration_sec,
            self.ctx.min_sensors,
        );
        log::info!(
            "{} candidate regions, {} events after duration/span filtering",
            regions.len(),
            events.len()
        );

        Ok(Detection {
            events,
            energy_map: energy,
            mask,
            preprocessed: preprocessed.matrix,
            warnings: preprocessed.warnings,
        })
    }
}

/// Reject empty matrices before any processing
fn validate_shape(x: &Matrix<f64>) -> Result<()> {
    let (rows, cols) = x.shape();
    if rows == 0 || cols == 0 {
        return Err(DetectError::Shape(format!(
            "strain matrix must be non-empty, got {}×{}",
            rows, cols
        )));
    }
    Ok(())
}
