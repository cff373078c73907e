use clap::Parser;

mod cli;
mod commands;
mod exit_codes;
mod output;

use cli::Cli;

/// Overrides `-v` with a full env_logger filter, e.g. `das_events=debug`
const LOG_FILTER_ENV: &str = "DAS_EVENTS_LOG";

/// No flag keeps warnings only: degenerate input and band clamping
fn log_level(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose))
        .parse_env(env_logger::Env::new().filter(LOG_FILTER_ENV))
        .format_timestamp_millis()
        .format_target(false)
        .init();

    let exit_code = match cli.command {
        cli::Command::Detect(args) => commands::detect::execute(args),
        cli::Command::Batch(args) => commands::batch::execute(args),
        cli::Command::Defaults(args) => commands::defaults::execute(args),
    };

    std::process::exit(exit_code);
}
