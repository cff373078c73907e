use clap::{Args, Parser, Subcommand};
use das_events::DetectorConfig;

#[derive(Parser)]
#[command(
    name = "das-events",
    version,
    about = "Detect space-time events in DAS strain recordings",
    long_about = "Detect localized space-time events in distributed acoustic sensing \
                  recordings (.json or .dasm).\n\
                  Configuration comes from a JSON document (--config or $DAS_EVENTS_CONFIG) \
                  with per-flag overrides."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Detect events in a single recording
    Detect(DetectArgs),
    /// Detect events in every recording of a directory
    Batch(BatchArgs),
    /// Print the default configuration document
    Defaults(DefaultsArgs),
}

/// Per-parameter overrides applied on top of the configuration document
#[derive(Args, Debug, Clone, Default)]
pub struct OverrideArgs {
    /// Band-pass low cutoff in Hz
    #[arg(long)]
    pub fmin: Option<f64>,

    /// Band-pass high cutoff in Hz
    #[arg(long)]
    pub fmax: Option<f64>,

    /// Decimate recordings sampled above this rate (Hz)
    #[arg(long)]
    pub target_fs: Option<f64>,

    /// Energy smoothing window in seconds
    #[arg(long)]
    pub smooth_sec: Option<f64>,

    /// Robust z-score threshold
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Minimum event duration in seconds
    #[arg(long)]
    pub min_duration_sec: Option<f64>,

    /// Minimum number of spanned sensors
    #[arg(long)]
    pub min_sensors: Option<usize>,

    /// Gaussian smoothing sigma in cells
    #[arg(long = "sigma-2d")]
    pub sigma_2d: Option<f64>,

    /// Percentile clipped at each tail
    #[arg(long)]
    pub clip_percentile: Option<f64>,

    /// Butterworth band-pass order
    #[arg(long)]
    pub filter_order: Option<usize>,
}

impl OverrideArgs {
    pub fn apply(&self, config: &mut DetectorConfig) {
        let signal = &mut config.signal;
        if let Some(v) = self.fmin {
            signal.fmin = v;
        }
        if let Some(v) = self.fmax {
            signal.fmax = v;
        }
        if let Some(v) = self.target_fs {
            signal.target_fs = v;
        }
        if let Some(v) = self.sigma_2d {
            signal.sigma_2d = v;
        }
        if let Some(v) = self.filter_order {
            signal.filter_order = v;
        }

        let detection = &mut config.detection;
        if let Some(v) = self.smooth_sec {
            detection.smooth_sec = v;
        }
        if let Some(v) = self.threshold {
            detection.threshold = v;
        }
        if let Some(v) = self.min_duration_sec {
            detection.min_duration_sec = v;
        }
        if let Some(v) = self.min_sensors {
            detection.min_sensors = v;
        }
        if let Some(v) = self.clip_percentile {
            detection.clip_percentile = v;
        }
    }
}

#[derive(Args)]
pub struct DetectArgs {
    /// Input recording (.json or .dasm)
    #[arg(long)]
    pub file: String,

    /// JSON configuration document
    #[arg(long, env = "DAS_EVENTS_CONFIG")]
    pub config: Option<String>,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// Also write energy map, mask and events under <DIR>/<stem>/
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Include the preprocessed matrix in --output-dir
    #[arg(long, default_value_t = false)]
    pub save_preprocessed: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct BatchArgs {
    /// Directory containing recordings
    #[arg(long)]
    pub input_dir: String,

    /// Directory receiving per-recording outputs and all_events.json
    #[arg(long)]
    pub output_dir: String,

    /// File name pattern inside the input directory
    #[arg(long, default_value = "*")]
    pub pattern: String,

    /// JSON configuration document
    #[arg(long, env = "DAS_EVENTS_CONFIG")]
    pub config: Option<String>,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// Include the preprocessed matrix for each recording
    #[arg(long, default_value_t = false)]
    pub save_preprocessed: bool,

    /// Continue processing remaining files if one fails
    #[arg(long, default_value_t = false)]
    pub continue_on_error: bool,

    /// List matching files without processing them
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Compact JSON summary (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct DefaultsArgs {
    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides_apply_to_both_sections() {
        let overrides = OverrideArgs {
            fmax: Some(40.0),
            min_sensors: Some(2),
            filter_order: Some(4),
            ..Default::default()
        };
        let mut config = DetectorConfig::default();
        overrides.apply(&mut config);

        assert_eq!(config.signal.fmax, 40.0);
        assert_eq!(config.signal.fmin, 1.0);
        assert_eq!(config.signal.filter_order, 4);
        assert_eq!(config.detection.min_sensors, 2);
        assert_eq!(config.detection.threshold, 3.0);
    }

    #[test]
    fn test_parse_detect_flags() {
        let cli = Cli::try_parse_from([
            "das-events",
            "detect",
            "--file",
            "rec.json",
            "--sigma-2d",
            "0",
            "--threshold",
            "2.5",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Detect(args) => {
                assert_eq!(args.file, "rec.json");
                assert_eq!(args.overrides.sigma_2d, Some(0.0));
                assert_eq!(args.overrides.threshold, Some(2.5));
            }
            _ => panic!("expected detect"),
        }
    }
}
