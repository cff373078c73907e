//! JSON documents the subcommands print.

use serde::Serialize;
use std::io::Write;

/// Serialize `value` and write it to `path`, or to stdout with a trailing
/// newline. Errors are formatted for the `Error: ...` line on stderr.
pub fn emit_json<T: Serialize>(value: &T, compact: bool, path: Option<&str>) -> Result<(), String> {
    let json = render(value, compact).map_err(|e| format!("JSON serialization failed: {}", e))?;
    match path {
        Some(path) => std::fs::write(path, json)
            .map_err(|e| format!("Failed to write output file '{}': {}", path, e)),
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json).map_err(|e| format!("Failed to write to stdout: {}", e))
        }
    }
}

fn render<T: Serialize>(value: &T, compact: bool) -> serde_json::Result<String> {
    if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let doc = serde_json::json!({ "n_events": 2 });

        emit_json(&doc, true, path.to_str()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"n_events":2}"#);

        emit_json(&doc, false, path.to_str()).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains('\n'));
    }

    #[test]
    fn test_emit_to_missing_dir() {
        let err = emit_json(&1, true, Some("/nonexistent_dir_12345/out.json")).unwrap_err();
        assert!(err.contains("Failed to write output file"));
    }
}
