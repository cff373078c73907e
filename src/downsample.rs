//! Integer-factor decimation of recordings sampled above the target rate.

use crate::filters::ChebyshevFilter;
use crate::loader::RawRecording;
use crate::profile_scope;

/// Anti-aliasing design: Chebyshev type I, order 8, 0.05 dB ripple
const ANTI_ALIAS_ORDER: usize = 8;
const ANTI_ALIAS_RIPPLE_DB: f64 = 0.05;

/// Integer decimation factor bringing `fs` to (roughly) `target_fs`. Returns 1
/// when no decimation is needed.
pub fn decimation_factor(fs: f64, target_fs: f64) -> usize {
    if target_fs.is_nan() || target_fs <= 0.0 || target_fs >= fs {
        return 1;
    }
    ((fs / target_fs).floor() as usize).max(1)
}

/// Decimate a recording towards `target_fs`.
///
/// Each channel is low-passed zero-phase at `0.8 / factor` of Nyquist before
/// every `factor`-th row (and timestamp) is kept, starting at row 0.
///
/// # Returns
/// The factor applied and the decimated recording; factor 1 is a plain copy.
pub fn downsample(recording: &RawRecording, target_fs: f64) -> (usize, RawRecording) {
    let factor = decimation_factor(recording.sampling_freq, target_fs);
    if factor == 1 {
        return (1, recording.clone());
    }

    profile_scope!("downsample", recording.strain_data.shape());
    let cutoff = 0.8 / factor as f64;
    let anti_alias = ChebyshevFilter::lowpass(ANTI_ALIAS_ORDER, ANTI_ALIAS_RIPPLE_DB, cutoff);

    let filtered = recording
        .strain_data
        .map_columns(|column| anti_alias.filtfilt(column));
    let strain_data = filtered.take_every_row(factor);
    let t: Vec<f64> = recording.t.iter().step_by(factor).copied().collect();
    let sampling_freq = recording.sampling_freq / factor as f64;

    log::info!(
        "Downsampled by {}: {} Hz -> {} Hz, {} -> {} samples",
        factor,
        recording.sampling_freq,
        sampling_freq,
        recording.num_samples(),
        strain_data.rows()
    );

    (
        factor,
        RawRecording {
            strain_data,
            t,
            sampling_freq,
            d_total: recording.d_total,
        },
    )
}
