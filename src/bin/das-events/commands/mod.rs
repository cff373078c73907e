pub mod batch;
pub mod defaults;
pub mod detect;

use crate::cli::OverrideArgs;
use crate::exit_codes;
use das_events::{DetectError, DetectorConfig};

/// Read the configuration document (or defaults) and apply flag overrides.
pub fn resolve_config(path: Option<&str>, overrides: &OverrideArgs) -> Result<DetectorConfig, String> {
    let mut config = match path {
        Some(p) => DetectorConfig::from_file(p)
            .map_err(|e| format!("Failed to load configuration '{}': {}", p, e))?,
        None => DetectorConfig::default(),
    };
    overrides.apply(&mut config);
    Ok(config)
}

/// Exit code for a library error: bad input versus failed execution
pub fn exit_code_for(error: &DetectError) -> i32 {
    match error {
        DetectError::Configuration(_)
        | DetectError::Shape(_)
        | DetectError::UnsupportedFileType(_)
        | DetectError::Parse(_)
        | DetectError::Serialization(_) => exit_codes::INPUT_ERROR,
        DetectError::Batch(_) | DetectError::Io(_) => exit_codes::EXECUTION_ERROR,
    }
}
