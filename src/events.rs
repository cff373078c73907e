//! Turns labeled regions into physical event records.

use crate::matrix::Matrix;
use crate::segmentation::Region;
use crate::types::Event;

/// Filter regions by duration and sensor span and describe the survivors.
///
/// Regions are visited in label order. A region is dropped when its bounding
/// box spans fewer than `round(min_duration_sec · fs)` samples or fewer than
/// `min_sensors` channels. Energy statistics cover member cells only, never
/// the rest of the bounding box.
pub fn parameterize(
    regions: &[Region],
    energy: &Matrix<f64>,
    fs: f64,
    min_duration_sec: f64,
    min_sensors: usize,
) -> Vec<Event> {
    let min_duration = (min_duration_sec * fs).round() as usize;

    let mut events = Vec::new();
    for region in regions {
        debug_assert!(!region.cells.is_empty(), "regions always hold their seed cell");

        let duration = region.duration_samples();
        let spatial_extent = region.spatial_extent();

        if duration < min_duration {
            log::trace!(
                "Region {} rejected: {} samples < {}",
                region.label,
                duration,
                min_duration
            );
            continue;
        }
        if spatial_extent < min_sensors {
            log::trace!(
                "Region {} rejected: {} sensors < {}",
                region.label,
                spatial_extent,
                min_sensors
            );
            continue;
        }

        let mut sum = 0.0;
        let mut max = f64::NEG_INFINITY;
        for &(t, s) in &region.cells {
            let e = energy.get(t, s);
            sum += e;
            max = max.max(e);
        }

        events.push(Event {
            t_start: region.t_min as f64 / fs,
            t_end: region.t_max as f64 / fs,
            t_start_idx: region.t_min,
            t_end_idx: region.t_max,
            sensor_start: region.s_min,
            sensor_end: region.s_max,
            sensor_center: (region.s_min + region.s_max) / 2,
            duration_sec: duration as f64 / fs,
            n_sensors: spatial_extent,
            mean_energy: sum / region.cells.len() as f64,
            max_energy: max,
        });
    }

    events
}
