//! Owned row-major 2D buffer used for every stage of the pipeline.
//!
//! Rows are time steps, columns are sensor channels. Stages never resize a
//! matrix; they either return a fresh matrix of the same shape or mutate in
//! place.

use crate::error::{DetectError, Result};
use rayon::prelude::*;
use std::ops::{Index, IndexMut};

/// Dense `rows × cols` matrix stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Copy> Matrix<T> {
    /// Matrix of the given shape with every cell set to `value`
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Wrap a row-major buffer. Fails if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(DetectError::Shape(format!(
                "buffer holds {} values but shape {}×{} needs {}",
                data.len(),
                rows,
                cols,
                rows * cols
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from nested rows. Ragged input is a shape error.
    pub fn from_rows(rows: &[Vec<T>]) -> Result<Self> {
        let num_rows = rows.len();
        let num_cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(num_rows * num_cols);

        for (idx, row) in rows.iter().enumerate() {
            if row.len() != num_cols {
                return Err(DetectError::Shape(format!(
                    "row {} has {} columns, expected {}",
                    idx,
                    row.len(),
                    num_cols
                )));
            }
            data.extend_from_slice(row);
        }

        Ok(Self {
            rows: num_rows,
            cols: num_cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[T] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Copy of one column (strided read)
    pub fn column(&self, col: usize) -> Vec<T> {
        (0..self.rows).map(|r| self.get(r, col)).collect()
    }

    pub fn set_column(&mut self, col: usize, values: &[T]) {
        for (r, &v) in values.iter().enumerate().take(self.rows) {
            self.set(r, col, v);
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Elementwise map into a new matrix of the same shape
    pub fn map<U: Copy>(&self, f: impl Fn(T) -> U) -> Matrix<U> {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Keep every `step`-th row starting at row 0
    pub fn take_every_row(&self, step: usize) -> Self {
        let step = step.max(1);
        let mut data = Vec::with_capacity(self.rows.div_ceil(step) * self.cols);
        let mut rows = 0;
        for r in (0..self.rows).step_by(step) {
            data.extend_from_slice(self.row(r));
            rows += 1;
        }
        Self {
            rows,
            cols: self.cols,
            data,
        }
    }
}

impl<T: Copy + Send + Sync> Matrix<T> {
    /// Apply `f` to every column independently (in parallel) and reassemble.
    ///
    /// `f` must return a vector of the same length as its input.
    pub fn map_columns<F>(&self, f: F) -> Self
    where
        F: Fn(&[T]) -> Vec<T> + Sync + Send,
    {
        let columns: Vec<Vec<T>> = (0..self.cols)
            .into_par_iter()
            .map(|c| {
                let column = self.column(c);
                f(&column)
            })
            .collect();

        let mut out = self.clone();
        for (c, column) in columns.iter().enumerate() {
            debug_assert_eq!(column.len(), self.rows);
            out.set_column(c, column);
        }
        out
    }

    /// Apply `f` to every row independently (in parallel) and reassemble.
    pub fn map_rows<F>(&self, f: F) -> Self
    where
        F: Fn(&[T]) -> Vec<T> + Sync + Send,
    {
        let mut out = self.clone();
        if self.cols == 0 {
            return out;
        }
        out.data
            .par_chunks_mut(self.cols)
            .zip(self.data.par_chunks(self.cols))
            .for_each(|(dst, src)| {
                let mapped = f(src);
                debug_assert_eq!(mapped.len(), src.len());
                dst.copy_from_slice(&mapped);
            });
        out
    }
}

impl Matrix<bool> {
    /// Number of `true` cells
    pub fn count_true(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }
}

impl<T> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    fn index(&self, (row, col): (usize, usize)) -> &T {
        &self.data[row * self.cols + col]
    }
}

impl<T> IndexMut<(usize, usize)> for Matrix<T> {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        &mut self.data[row * self.cols + col]
    }
}
