use crate::cli::DefaultsArgs;
use crate::exit_codes;
use crate::output;
use das_events::DetectorConfig;

pub fn execute(args: DefaultsArgs) -> i32 {
    match output::emit_json(&DetectorConfig::default(), args.compact, None) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_codes::EXECUTION_ERROR
        }
    }
}
