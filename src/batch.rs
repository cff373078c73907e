//! Recording and batch orchestration.
//!
//! load → downsample → context → detect → sink, for one file or many.
//! Files are independent and run in parallel; each gets its own detector
//! because the sampling rate (and so the band-pass design) is per recording.

use crate::config::DetectorConfig;
use crate::detector::EventDetector;
use crate::downsample::downsample;
use crate::error::{DetectError, Result};
use crate::loader::{load_recording, RawRecording};
use crate::sink::{self, RecordingOutputs};
use crate::types::{Detection, DetectionWarning, TaggedEvent};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const SUMMARY_FILE: &str = "batch_summary.json";

/// Everything produced for one recording
#[derive(Debug, Clone)]
pub struct RecordingAnalysis {
    /// Recording after decimation
    pub recording: RawRecording,
    pub downsample_factor: usize,
    pub detection: Detection,
}

/// Load, decimate and run detection on one file
pub fn analyze_recording(path: &Path, config: &DetectorConfig) -> Result<RecordingAnalysis> {
    let raw = load_recording(path)?;
    let (downsample_factor, recording) = downsample(&raw, config.signal.target_fs);

    let ctx = config.sampling_context(recording.sampling_freq)?;
    let detector = EventDetector::new(ctx)?;
    let detection = detector.detect(&recording.strain_data)?;

    Ok(RecordingAnalysis {
        recording,
        downsample_factor,
        detection,
    })
}

/// Options for [`run_batch`]
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Keep going after a failed file instead of aborting the batch
    pub continue_on_error: bool,
    /// Also write `preprocessed.dasm` per recording
    pub write_preprocessed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Succeeded,
    Failed,
}

/// Outcome of one file in a batch
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    pub status: FileStatus,
    pub n_events: usize,
    pub downsample_factor: Option<usize>,
    pub sampling_freq: Option<f64>,
    pub warnings: Vec<DetectionWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<RecordingOutputs>,
    pub elapsed_ms: f64,
}

/// Written to `<out>/batch_summary.json` after every batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config: DetectorConfig,
    pub succeeded: usize,
    pub failed: usize,
    pub total_events: usize,
    pub all_events: Option<PathBuf>,
    pub files: Vec<FileReport>,
}

struct FileResult {
    report: FileReport,
    events: Vec<TaggedEvent>,
}

fn process_file(
    path: &Path,
    out_dir: &Path,
    config: &DetectorConfig,
    options: &BatchOptions,
) -> FileResult {
    let start = Instant::now();
    let file = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let outcome = analyze_recording(path, config).and_then(|analysis| {
        let outputs = sink::write_recording(
            out_dir,
            &sink::recording_stem(path),
            &analysis.detection,
            analysis.recording.sampling_freq,
            options.write_preprocessed,
        )?;
        Ok((analysis, outputs))
    });

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    match outcome {
        Ok((analysis, outputs)) => {
            let events = sink::tag_events(&file, &analysis.detection.events);
            FileResult {
                report: FileReport {
                    file,
                    status: FileStatus::Succeeded,
                    n_events: events.len(),
                    downsample_factor: Some(analysis.downsample_factor),
                    sampling_freq: Some(analysis.recording.sampling_freq),
                    warnings: analysis.detection.warnings,
                    error: None,
                    outputs: Some(outputs),
                    elapsed_ms,
                },
                events,
            }
        }
        Err(e) => {
            log::error!("Processing {} failed: {}", path.display(), e);
            FileResult {
                report: FileReport {
                    file,
                    status: FileStatus::Failed,
                    n_events: 0,
                    downsample_factor: None,
                    sampling_freq: None,
                    warnings: Vec::new(),
                    error: Some(e.to_string()),
                    outputs: None,
                    elapsed_ms,
                },
                events: Vec::new(),
            }
        }
    }
}

/// Fail when two inputs would share `<out>/<stem>/` (e.g. `rec.json` and
/// `rec.dasm`), since they run concurrently and would overwrite each other.
fn check_output_dirs(files: &[PathBuf]) -> Result<()> {
    let mut seen: HashMap<String, &Path> = HashMap::new();
    for path in files {
        let stem = sink::recording_stem(path);
        if let Some(previous) = seen.insert(stem.clone(), path) {
            return Err(DetectError::Batch(format!(
                "{} and {} would both write to output directory '{}'",
                previous.display(),
                path.display(),
                stem
            )));
        }
    }
    Ok(())
}

/// Process every file and write per-recording outputs, `all_events.json`
/// and `batch_summary.json` under `out_dir`.
///
/// Without `continue_on_error` the first failure (in input order) aborts the
/// batch before the aggregated files are written.
pub fn run_batch(
    files: &[PathBuf],
    out_dir: &Path,
    config: &DetectorConfig,
    options: &BatchOptions,
) -> Result<BatchSummary> {
    check_output_dirs(files)?;

    let run_id = uuid::Uuid::new_v4().to_string();
    let started_at = Utc::now();
    std::fs::create_dir_all(out_dir)?;
    log::info!("Batch {}: {} files -> {}", run_id, files.len(), out_dir.display());

    let results: Vec<FileResult> = files
        .par_iter()
        .map(|path| process_file(path, out_dir, config, options))
        .collect();

    if !options.continue_on_error {
        if let Some(failed) = results
            .iter()
            .find(|r| r.report.status == FileStatus::Failed)
        {
            return Err(DetectError::Batch(format!(
                "{}: {}",
                failed.report.file,
                failed.report.error.as_deref().unwrap_or("unknown error")
            )));
        }
    }

    let mut all_events = Vec::new();
    let mut reports = Vec::with_capacity(results.len());
    for result in results {
        all_events.extend(result.events);
        reports.push(result.report);
    }

    let succeeded = reports
        .iter()
        .filter(|r| r.status == FileStatus::Succeeded)
        .count();
    let all_events_path = if succeeded > 0 {
        Some(sink::write_all_events(out_dir, &all_events)?)
    } else {
        None
    };

    let summary = BatchSummary {
        run_id,
        started_at,
        finished_at: Utc::now(),
        config: config.clone(),
        succeeded,
        failed: reports.len() - succeeded,
        total_events: all_events.len(),
        all_events: all_events_path,
        files: reports,
    };
    sink::write_json(&out_dir.join(SUMMARY_FILE), &summary)?;

    log::info!(
        "Batch {} complete: {}/{} succeeded, {} events",
        summary.run_id,
        summary.succeeded,
        files.len(),
        summary.total_events
    );
    Ok(summary)
}
