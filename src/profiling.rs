//! Pipeline stage timing.
//!
//! Every stage logs its wall time (and cell throughput when the matrix size
//! is known) at debug level. When [`PROFILE_LOG_ENV`] is set, each record is
//! also appended to a tab-separated log: the variable's value is the file to
//! use, or an empty value selects `<data dir>/das-events/stage_timings.tsv`.

use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

pub const PROFILE_LOG_ENV: &str = "DAS_EVENTS_PROFILE_LOG";

const DEFAULT_LOG_NAME: &str = "stage_timings.tsv";

/// One finished stage
#[derive(Debug, Clone, PartialEq)]
pub struct StageTiming {
    pub stage: &'static str,
    pub elapsed_ms: f64,
    /// Matrix cells the stage touched, if known
    pub cells: Option<usize>,
}

impl StageTiming {
    /// Million cells per second
    pub fn throughput(&self) -> Option<f64> {
        let cells = self.cells?;
        (self.elapsed_ms > 0.0).then(|| cells as f64 / (self.elapsed_ms * 1000.0))
    }

    fn to_record(&self, timestamp: &str) -> String {
        let cells = self.cells.map(|c| c.to_string()).unwrap_or_default();
        let rate = self
            .throughput()
            .map(|r| format!("{:.2}", r))
            .unwrap_or_default();
        format!(
            "{}\t{}\t{:.3}\t{}\t{}",
            timestamp, self.stage, self.elapsed_ms, cells, rate
        )
    }
}

/// Stage timer, reported when dropped
pub struct ProfileScope {
    stage: &'static str,
    cells: Option<usize>,
    start: Instant,
}

impl ProfileScope {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            cells: None,
            start: Instant::now(),
        }
    }

    /// Attach the `rows × cols` size of the matrix being processed
    pub fn with_shape(mut self, (rows, cols): (usize, usize)) -> Self {
        self.cells = Some(rows * cols);
        self
    }

    fn timing(&self) -> StageTiming {
        StageTiming {
            stage: self.stage,
            elapsed_ms: self.start.elapsed().as_secs_f64() * 1000.0,
            cells: self.cells,
        }
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        let timing = self.timing();
        match timing.throughput() {
            Some(rate) => log::debug!(
                "stage {} took {:.3}ms ({:.2} Mcells/s)",
                timing.stage,
                timing.elapsed_ms,
                rate
            ),
            None => log::debug!("stage {} took {:.3}ms", timing.stage, timing.elapsed_ms),
        }

        if let Some(path) = profile_log_path(std::env::var_os(PROFILE_LOG_ENV)) {
            if let Err(e) = append_record(&path, &timing) {
                log::warn!("Failed to append stage timing to {}: {}", path.display(), e);
            }
        }
    }
}

/// Where stage timings go for a given value of [`PROFILE_LOG_ENV`]
pub fn profile_log_path(setting: Option<OsString>) -> Option<PathBuf> {
    let setting = setting?;
    if !setting.is_empty() {
        return Some(PathBuf::from(setting));
    }
    let dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("das-events");
    Some(dir.join(DEFAULT_LOG_NAME))
}

fn append_record(path: &std::path::Path, timing: &StageTiming) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", timing.to_record(&chrono::Utc::now().to_rfc3339()))
}

/// Time the rest of the enclosing block as pipeline stage `$stage`,
/// optionally over a matrix of the given shape.
#[macro_export]
macro_rules! profile_scope {
    ($stage:expr) => {
        let _profile_scope = $crate::profiling::ProfileScope::new($stage);
    };
    ($stage:expr, $shape:expr) => {
        let _profile_scope = $crate::profiling::ProfileScope::new($stage).with_shape($shape);
    };
}
