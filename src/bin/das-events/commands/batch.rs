use crate::cli::BatchArgs;
use crate::commands::{exit_code_for, resolve_config};
use crate::exit_codes;
use crate::output;
use das_events::batch::{run_batch, BatchOptions};
use std::path::{Path, PathBuf};

const SUPPORTED_EXTENSIONS: &[&str] = &["json", "dasm"];

pub fn execute(args: BatchArgs) -> i32 {
    let files = match resolve_files(&args.input_dir, &args.pattern) {
        Ok(f) => f,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if files.is_empty() {
        eprintln!("Error: No matching recordings found");
        return exit_codes::INPUT_ERROR;
    }

    if args.dry_run {
        for f in &files {
            println!("{}", f.display());
        }
        if !args.quiet {
            eprintln!("Found {} file(s)", files.len());
        }
        return exit_codes::SUCCESS;
    }

    let config = match resolve_config(args.config.as_deref(), &args.overrides) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };
    // Rate-dependent limits are checked per file once its rate is known
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return exit_codes::INPUT_ERROR;
    }

    if !args.quiet {
        eprintln!("Processing {} file(s) into {}...", files.len(), args.output_dir);
    }

    let options = BatchOptions {
        continue_on_error: args.continue_on_error,
        write_preprocessed: args.save_preprocessed,
    };
    let summary = match run_batch(&files, Path::new(&args.output_dir), &config, &options) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_code_for(&e);
        }
    };

    if let Err(e) = output::emit_json(&summary, args.compact, None) {
        eprintln!("Error: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }

    if !args.quiet {
        for report in summary.files.iter().filter(|r| r.error.is_some()) {
            eprintln!(
                "  {} failed: {}",
                report.file,
                report.error.as_deref().unwrap_or_default()
            );
        }
        eprintln!(
            "Batch complete: {}/{} succeeded, {} event(s)",
            summary.succeeded,
            files.len(),
            summary.total_events
        );
    }

    if summary.failed == 0 {
        exit_codes::SUCCESS
    } else if summary.succeeded > 0 {
        exit_codes::PARTIAL_FAILURE
    } else {
        exit_codes::EXECUTION_ERROR
    }
}

/// Recordings in `dir` matching `pattern`, sorted, supported extensions only
fn resolve_files(dir: &str, pattern: &str) -> Result<Vec<PathBuf>, String> {
    let root = Path::new(dir);
    if !root.is_dir() {
        return Err(format!("Input directory not found: {}", dir));
    }

    let full_pattern = root.join(pattern);
    let full_pattern = full_pattern
        .to_str()
        .ok_or_else(|| format!("Input path is not valid UTF-8: {}", dir))?;
    let paths = glob::glob(full_pattern)
        .map_err(|e| format!("Invalid glob pattern '{}': {}", pattern, e))?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                let supported = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                    .unwrap_or(false);
                if path.is_file() && supported {
                    files.push(path);
                }
            }
            Err(e) => {
                eprintln!("Warning: glob error: {}", e);
            }
        }
    }
    files.sort();
    Ok(files)
}
