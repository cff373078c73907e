pub mod profiling;

pub mod batch;
pub mod config;
pub mod detector;
pub mod downsample;
pub mod energy;
pub mod error;
pub mod events;
pub mod filters;
pub mod format;
pub mod loader;
pub mod matrix;
pub mod preprocess;
pub mod segmentation;
pub mod sink;
pub mod smoothing;
pub mod stats;
pub mod types;

pub use config::{DetectorConfig, SamplingContext};
pub use detector::EventDetector;
pub use error::{DetectError, Result};
pub use loader::{load_recording, RawRecording};
pub use matrix::Matrix;
pub use types::*;
