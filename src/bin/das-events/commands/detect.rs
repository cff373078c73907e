use crate::cli::DetectArgs;
use crate::commands::{exit_code_for, resolve_config};
use crate::exit_codes;
use crate::output;
use das_events::batch::analyze_recording;
use das_events::sink;
use das_events::{DetectionWarning, Event};
use serde::Serialize;
use std::path::Path;

/// JSON document printed by `detect`
#[derive(Serialize)]
struct DetectReport<'a> {
    file: &'a str,
    sampling_freq: f64,
    downsample_factor: usize,
    n_samples: usize,
    n_sensors: usize,
    n_events: usize,
    warnings: &'a [DetectionWarning],
    events: &'a [Event],
}

pub fn execute(args: DetectArgs) -> i32 {
    let path = Path::new(&args.file);
    if !path.is_file() {
        eprintln!("Error: File not found: {}", args.file);
        return exit_codes::INPUT_ERROR;
    }

    let config = match resolve_config(args.config.as_deref(), &args.overrides) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if !args.quiet {
        eprintln!("Detecting events in {}...", args.file);
        eprintln!(
            "  Band: {}-{} Hz, threshold: {}, min duration: {} s, min sensors: {}",
            config.signal.fmin,
            config.signal.fmax,
            config.detection.threshold,
            config.detection.min_duration_sec,
            config.detection.min_sensors
        );
    }

    let analysis = match analyze_recording(path, &config) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_code_for(&e);
        }
    };
    let detection = &analysis.detection;

    if let Some(ref dir) = args.output_dir {
        if let Err(e) = sink::write_recording(
            Path::new(dir),
            &sink::recording_stem(path),
            detection,
            analysis.recording.sampling_freq,
            args.save_preprocessed,
        ) {
            eprintln!("Error writing outputs: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(args.file.as_str());
    let report = DetectReport {
        file: file_name,
        sampling_freq: analysis.recording.sampling_freq,
        downsample_factor: analysis.downsample_factor,
        n_samples: analysis.recording.num_samples(),
        n_sensors: analysis.recording.num_sensors(),
        n_events: detection.events.len(),
        warnings: &detection.warnings,
        events: &detection.events,
    };

    if let Err(e) = output::emit_json(&report, args.compact, args.output.as_deref()) {
        eprintln!("Error: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }

    if !args.quiet {
        eprintln!("Found {} event(s)", detection.events.len());
        if let Some(ref path) = args.output {
            eprintln!("Results written to {}", path);
        }
    }
    exit_codes::SUCCESS
}
