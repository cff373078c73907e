//! Thresholding and connected-component labeling over the (time, sensor) grid.

use crate::matrix::Matrix;
use std::collections::VecDeque;

/// Neighbourhood used to decide whether two active cells touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// Horizontal and vertical neighbours only
    Four,
    /// Horizontal, vertical and diagonal neighbours
    Eight,
}

impl Connectivity {
    fn offsets(self) -> &'static [(isize, isize)] {
        const FOUR: [(isize, isize); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];
        const EIGHT: [(isize, isize); 8] = [
            (-1, -1), (-1, 0), (-1, 1),
            (0, -1),           (0, 1),
            (1, -1),  (1, 0),  (1, 1),
        ];
        match self {
            Connectivity::Four => &FOUR,
            Connectivity::Eight => &EIGHT,
        }
    }
}

/// A maximal connected set of active cells
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// 1-based label, assigned in row-major order of each region's first cell
    pub label: usize,
    /// Member cells as `(time, sensor)`, in discovery order
    pub cells: Vec<(usize, usize)>,
    pub t_min: usize,
    pub t_max: usize,
    pub s_min: usize,
    pub s_max: usize,
}

impl Region {
    fn new(label: usize, seed: (usize, usize)) -> Self {
        Self {
            label,
            cells: Vec::new(),
            t_min: seed.0,
            t_max: seed.0,
            s_min: seed.1,
            s_max: seed.1,
        }
    }

    fn push(&mut self, (t, s): (usize, usize)) {
        self.cells.push((t, s));
        self.t_min = self.t_min.min(t);
        self.t_max = self.t_max.max(t);
        self.s_min = self.s_min.min(s);
        self.s_max = self.s_max.max(s);
    }

    pub fn area(&self) -> usize {
        self.cells.len()
    }

    /// Samples covered by the bounding box along time
    pub fn duration_samples(&self) -> usize {
        self.t_max - self.t_min + 1
    }

    /// Channels covered by the bounding box
    pub fn spatial_extent(&self) -> usize {
        self.s_max - self.s_min + 1
    }
}

/// `mask[t, s] = energy[t, s] > threshold`. No hysteresis.
pub fn threshold_mask(energy: &Matrix<f64>, threshold: f64) -> Matrix<bool> {
    energy.map(|e| e > threshold)
}

/// Label 8-connected regions of `mask`.
pub fn label_regions(mask: &Matrix<bool>) -> Vec<Region> {
    label_regions_with(mask, Connectivity::Eight)
}

/// Breadth-first flood fill seeded by a row-major scan. Labels are
/// deterministic: region `k` is the `k`-th region met by the scan.
pub fn label_regions_with(mask: &Matrix<bool>, connectivity: Connectivity) -> Vec<Region> {
    let (rows, cols) = mask.shape();
    let mut visited = vec![false; rows * cols];
    let mut regions = Vec::new();
    let mut queue = VecDeque::new();

    for t in 0..rows {
        for s in 0..cols {
            let idx = t * cols + s;
            if !mask.get(t, s) || visited[idx] {
                continue;
            }

            let mut region = Region::new(regions.len() + 1, (t, s));
            visited[idx] = true;
            queue.push_back((t, s));

            while let Some((ct, cs)) = queue.pop_front() {
                region.push((ct, cs));

                for &(dt, ds) in connectivity.offsets() {
                    let nt = ct as isize + dt;
                    let ns = cs as isize + ds;
                    if nt < 0 || ns < 0 || nt >= rows as isize || ns >= cols as isize {
                        continue;
                    }
                    let (nt, ns) = (nt as usize, ns as usize);
                    let n_idx = nt * cols + ns;
                    if mask.get(nt, ns) && !visited[n_idx] {
                        visited[n_idx] = true;
                        queue.push_back((nt, ns));
                    }
                }
            }

            regions.push(region);
        }
    }

    log::debug!("Labeled {} regions ({:?}-connectivity)", regions.len(), connectivity);
    regions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from(cells: &[(usize, usize)], rows: usize, cols: usize) -> Matrix<bool> {
        let mut m = Matrix::filled(rows, cols, false);
        for &(t, s) in cells {
            m.set(t, s, true);
        }
        m
    }

    #[test]
    fn test_threshold_is_strict() {
        let e = Matrix::from_rows(&[vec![2.9, 3.0, 3.1]]).unwrap();
        let m = threshold_mask(&e, 3.0);
        assert_eq!(m.as_slice(), &[false, false, true]);
    }

    #[test]
    fn test_diagonal_cells_merge_under_eight_connectivity() {
        let m = mask_from(&[(0, 0), (1, 1)], 3, 3);

        let eight = label_regions(&m);
        assert_eq!(eight.len(), 1);
        assert_eq!(eight[0].area(), 2);

        let four = label_regions_with(&m, Connectivity::Four);
        assert_eq!(four.len(), 2);
    }

    #[test]
    fn test_block_bounding_box() {
        let cells: Vec<(usize, usize)> = (0..5)
            .flat_map(|t| (0..10).map(move |s| (t, s)))
            .collect();
        let m = mask_from(&cells, 20, 30);
        let regions = label_regions(&m);
        assert_eq!(regions.len(), 1);

        let r = &regions[0];
        assert_eq!(r.label, 1);
        assert_eq!(r.area(), 50);
        assert_eq!((r.t_min, r.t_max, r.s_min, r.s_max), (0, 4, 0, 9));
        assert_eq!(r.duration_samples(), 5);
        assert_eq!(r.spatial_extent(), 10);
    }

    #[test]
    fn test_labels_follow_scan_order() {
        // region B starts on row 0 further right, region A on row 0 at col 0
        let m = mask_from(&[(0, 0), (1, 0), (0, 5), (3, 2)], 5, 7);
        let regions = label_regions(&m);
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[0].cells[0], (0, 0));
        assert_eq!(regions[1].cells[0], (0, 5));
        assert_eq!(regions[2].cells[0], (3, 2));
        let labels: Vec<usize> = regions.iter().map(|r| r.label).collect();
        assert_eq!(labels, vec![1, 2, 3]);
    }

    #[test]
    fn test_u_shape_is_one_region() {
        // U shape: both arms connect through the bottom row
        let m = mask_from(
            &[(0, 0), (1, 0), (2, 0), (2, 1), (2, 2), (1, 2), (0, 2)],
            3,
            3,
        );
        let regions = label_regions(&m);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area(), 7);
    }

    #[test]
    fn test_empty_mask_has_no_regions() {
        let m = Matrix::filled(4, 4, false);
        assert!(label_regions(&m).is_empty());
    }
}
