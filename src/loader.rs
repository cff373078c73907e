//! Recording loader.
//!
//! Accepts JSON documents and `.dasm` containers and hands the detector a
//! validated [`RawRecording`].

use crate::error::{DetectError, Result};
use crate::format;
use crate::matrix::Matrix;
use serde::Deserialize;
use std::path::Path;

/// One DAS recording: strain samples plus acquisition metadata
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecording {
    /// `T × S` strain matrix
    pub strain_data: Matrix<f64>,
    /// Timestamp of each row in seconds
    pub t: Vec<f64>,
    pub sampling_freq: f64,
    /// Total fibre length in metres, when the source records it
    pub d_total: Option<f64>,
}

impl RawRecording {
    /// Build a recording, synthesizing `t = i / fs` when no axis is given
    pub fn new(strain_data: Matrix<f64>, sampling_freq: f64, t: Option<Vec<f64>>) -> Result<Self> {
        if !(sampling_freq.is_finite() && sampling_freq > 0.0) {
            return Err(DetectError::Parse(format!(
                "sampling_freq must be positive, got {}",
                sampling_freq
            )));
        }

        let t = match t {
            Some(t) => {
                if t.len() != strain_data.rows() {
                    return Err(DetectError::Shape(format!(
                        "time axis has {} entries but strain data has {} rows",
                        t.len(),
                        strain_data.rows()
                    )));
                }
                t
            }
            None => synthesize_time_axis(strain_data.rows(), sampling_freq),
        };

        Ok(Self {
            strain_data,
            t,
            sampling_freq,
            d_total: None,
        })
    }

    pub fn num_samples(&self) -> usize {
        self.strain_data.rows()
    }

    pub fn num_sensors(&self) -> usize {
        self.strain_data.cols()
    }

    pub fn duration_sec(&self) -> f64 {
        self.num_samples() as f64 / self.sampling_freq
    }
}

pub fn synthesize_time_axis(samples: usize, fs: f64) -> Vec<f64> {
    (0..samples).map(|i| i as f64 / fs).collect()
}

#[derive(Debug, Deserialize)]
struct JsonRecording {
    strain_data: Vec<Vec<f64>>,
    #[serde(default)]
    t: Option<Vec<f64>>,
    sampling_freq: f64,
    #[serde(default)]
    d_total: Option<f64>,
}

/// Load a recording, dispatching on the file extension
pub fn load_recording(path: &Path) -> Result<RawRecording> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let recording = match extension.as_str() {
        "json" => load_json(path)?,
        "dasm" => load_dasm(path)?,
        other => {
            return Err(DetectError::UnsupportedFileType(format!(
                "{} (extension '{}'); expected .json or .dasm",
                path.display(),
                other
            )))
        }
    };

    ensure_finite(&recording.strain_data)?;
    log::info!(
        "Loaded {}: {} samples × {} sensors at {} Hz",
        path.display(),
        recording.num_samples(),
        recording.num_sensors(),
        recording.sampling_freq
    );
    Ok(recording)
}

fn load_json(path: &Path) -> Result<RawRecording> {
    let content = std::fs::read_to_string(path)?;
    let doc: JsonRecording = serde_json::from_str(&content)?;
    let strain = Matrix::from_rows(&doc.strain_data)?;
    let mut recording = RawRecording::new(strain, doc.sampling_freq, doc.t)?;
    recording.d_total = doc.d_total;
    Ok(recording)
}

fn load_dasm(path: &Path) -> Result<RawRecording> {
    let (strain, fs) = format::read_f64_matrix(path)?;
    RawRecording::new(strain, fs, None)
}

fn ensure_finite(x: &Matrix<f64>) -> Result<()> {
    let cols = x.cols().max(1);
    if let Some(idx) = x.as_slice().iter().position(|v| !v.is_finite()) {
        return Err(DetectError::Parse(format!(
            "non-finite sample at row {}, sensor {}",
            idx / cols,
            idx % cols
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_json_synthesizes_time() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rec.json");
        std::fs::write(
            &path,
            r#"{ "strain_data": [[1, 2, 3], [4, 5, 6]], "sampling_freq": 4.0, "d_total": 120.0 }"#,
        )
        .unwrap();

        let rec = load_recording(&path).unwrap();
        assert_eq!(rec.strain_data.shape(), (2, 3));
        assert_eq!(rec.t, vec![0.0, 0.25]);
        assert_eq!(rec.d_total, Some(120.0));
        assert_eq!(rec.strain_data.get(1, 2), 6.0);
    }

    #[test]
    fn test_load_json_keeps_time_axis() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rec.json");
        std::fs::write(
            &path,
            r#"{ "strain_data": [[1], [2]], "t": [10.0, 10.5], "sampling_freq": 2.0 }"#,
        )
        .unwrap();
        assert_eq!(load_recording(&path).unwrap().t, vec![10.0, 10.5]);
    }

    #[test]
    fn test_ragged_json_is_shape_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rec.json");
        std::fs::write(&path, r#"{ "strain_data": [[1, 2], [3]], "sampling_freq": 1.0 }"#).unwrap();
        assert!(matches!(load_recording(&path), Err(DetectError::Shape(_))));
    }

    #[test]
    fn test_load_dasm_rejects_nan() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rec.dasm");
        let mut m = Matrix::filled(3, 2, 0.5);
        format::write_f64_matrix(&path, &m, 100.0).unwrap();
        let rec = load_recording(&path).unwrap();
        assert_eq!(rec.sampling_freq, 100.0);
        assert_eq!(rec.t.len(), 3);

        m.set(2, 1, f64::NAN);
        format::write_f64_matrix(&path, &m, 100.0).unwrap();
        assert!(matches!(load_recording(&path), Err(DetectError::Parse(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rec.npz");
        std::fs::write(&path, b"data").unwrap();
        assert!(matches!(
            load_recording(&path),
            Err(DetectError::UnsupportedFileType(_))
        ));
    }
}
