//! Result sink: per-recording artefacts plus the cross-file event list.
//!
//! ```text
//! <out>/<stem>/energy.dasm
//! <out>/<stem>/mask.dasm
//! <out>/<stem>/preprocessed.dasm   (optional)
//! <out>/<stem>/events.json
//! <out>/all_events.json
//! ```

use crate::error::Result;
use crate::format;
use crate::types::{Detection, Event, TaggedEvent};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENERGY_FILE: &str = "energy.dasm";
pub const MASK_FILE: &str = "mask.dasm";
pub const PREPROCESSED_FILE: &str = "preprocessed.dasm";
pub const EVENTS_FILE: &str = "events.json";
pub const ALL_EVENTS_FILE: &str = "all_events.json";

/// Paths written for one recording
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingOutputs {
    pub dir: PathBuf,
    pub energy: PathBuf,
    pub mask: PathBuf,
    pub preprocessed: Option<PathBuf>,
    pub events: PathBuf,
}

/// File stem used to name a recording's output directory
pub fn recording_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("recording")
        .to_string()
}

/// Write the energy map, mask, events and (optionally) the preprocessed
/// matrix of one recording under `<out_dir>/<stem>/`.
pub fn write_recording(
    out_dir: &Path,
    stem: &str,
    detection: &Detection,
    sampling_freq: f64,
    include_preprocessed: bool,
) -> Result<RecordingOutputs> {
    let dir = out_dir.join(stem);
    fs::create_dir_all(&dir)?;

    let energy = dir.join(ENERGY_FILE);
    format::write_f64_matrix(&energy, &detection.energy_map, sampling_freq)?;

    let mask = dir.join(MASK_FILE);
    format::write_mask(&mask, &detection.mask)?;

    let preprocessed = if include_preprocessed {
        let path = dir.join(PREPROCESSED_FILE);
        format::write_f64_matrix(&path, &detection.preprocessed, sampling_freq)?;
        Some(path)
    } else {
        None
    };

    let events = dir.join(EVENTS_FILE);
    write_json(&events, &detection.events)?;

    log::info!(
        "Wrote {} events and maps for '{}' to {}",
        detection.events.len(),
        stem,
        dir.display()
    );

    Ok(RecordingOutputs {
        dir,
        energy,
        mask,
        preprocessed,
        events,
    })
}

/// Write the aggregated event list to `<out_dir>/all_events.json`
pub fn write_all_events(out_dir: &Path, events: &[TaggedEvent]) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(ALL_EVENTS_FILE);
    write_json(&path, events)?;
    log::info!("Wrote {} aggregated events to {}", events.len(), path.display());
    Ok(path)
}

/// Tag every event of one recording with its file name
pub fn tag_events(file: &str, events: &[Event]) -> Vec<TaggedEvent> {
    events
        .iter()
        .cloned()
        .map(|event| TaggedEvent::new(file, event))
        .collect()
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}
