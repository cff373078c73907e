use crate::matrix::Matrix;
use serde::{Deserialize, Serialize};

/// A detected space-time event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Start time in seconds
    pub t_start: f64,
    /// End time in seconds (time of the last active sample)
    pub t_end: f64,
    pub t_start_idx: usize,
    pub t_end_idx: usize,
    pub sensor_start: usize,
    pub sensor_end: usize,
    /// Midpoint of the sensor range, rounded down
    pub sensor_center: usize,
    pub duration_sec: f64,
    /// Channels spanned by the bounding box
    pub n_sensors: usize,
    /// Mean energy over the region's member cells
    pub mean_energy: f64,
    /// Peak energy over the region's member cells
    pub max_energy: f64,
}

/// Event tagged with the recording it came from (cross-file aggregation)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedEvent {
    pub file: String,
    #[serde(flatten)]
    pub event: Event,
}

impl TaggedEvent {
    pub fn new(file: impl Into<String>, event: Event) -> Self {
        Self {
            file: file.into(),
            event,
        }
    }
}

/// Non-fatal conditions noticed while running the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionWarning {
    /// Clip percentiles coincided (constant input); normalized output is all zeros
    DegenerateInput,
    /// Upper band edge was at or above Nyquist and has been clamped
    BandClamped,
}

/// Output of one `detect` call
#[derive(Debug, Clone)]
pub struct Detection {
    pub events: Vec<Event>,
    pub energy_map: Matrix<f64>,
    pub mask: Matrix<bool>,
    pub preprocessed: Matrix<f64>,
    pub warnings: Vec<DetectionWarning>,
}

impl Detection {
    /// Number of active cells in the mask
    pub fn active_cells(&self) -> usize {
        self.mask.count_true()
    }
}
