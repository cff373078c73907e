//! Separable smoothing kernels over the time and sensor axes.
//!
//! Boundaries use half-sample symmetric reflection (`d c b a | a b c d | d c b a`),
//! so no energy from outside the matrix enters the result.

use crate::matrix::Matrix;

/// Map an out-of-range index back into `0..n` by symmetric reflection.
#[inline]
pub(crate) fn reflect_index(i: isize, n: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    let n = n as isize;
    let period = 2 * n;
    let m = i.rem_euclid(period);
    (if m < n { m } else { period - 1 - m }) as usize
}

/// Normalized Gaussian weights with radius `floor(4·sigma + 0.5)`.
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (4.0 * sigma + 0.5) as isize;
    let denom = 2.0 * sigma * sigma;
    let mut weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-((x * x) as f64) / denom).exp())
        .collect();
    let sum: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// Correlate a line with a symmetric odd-length kernel centred on each sample.
fn convolve_reflect(line: &[f64], kernel: &[f64]) -> Vec<f64> {
    let n = line.len();
    let radius = (kernel.len() / 2) as isize;
    (0..n)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, w)| w * line[reflect_index(i as isize + k as isize - radius, n)])
                .sum()
        })
        .collect()
}

/// Centered moving average of length `size`. For even sizes the window spans
/// `size/2` samples before and `size - 1 - size/2` after the centre.
pub fn moving_average(line: &[f64], size: usize) -> Vec<f64> {
    let n = line.len();
    if size <= 1 || n == 0 {
        return line.to_vec();
    }

    let before = (size / 2) as isize;
    let mut prefix = Vec::with_capacity(n + size);
    prefix.push(0.0);
    let mut acc = 0.0;
    for j in 0..(n + size - 1) as isize {
        acc += line[reflect_index(j - before, n)];
        prefix.push(acc);
    }

    let scale = 1.0 / size as f64;
    (0..n).map(|i| (prefix[i + size] - prefix[i]) * scale).collect()
}

/// 2D Gaussian smoothing with the same `sigma` on both axes.
/// `sigma <= 0` returns an unchanged copy.
pub fn gaussian_filter_2d(x: &Matrix<f64>, sigma: f64) -> Matrix<f64> {
    if sigma <= 0.0 {
        return x.clone();
    }
    let kernel = gaussian_kernel(sigma);
    let along_time = x.map_columns(|col| convolve_reflect(col, &kernel));
    along_time.map_rows(|row| convolve_reflect(row, &kernel))
}

/// Moving average along the time axis of every channel.
pub fn moving_average_time(x: &Matrix<f64>, size: usize) -> Matrix<f64> {
    if size <= 1 {
        return x.clone();
    }
    x.map_columns(|col| moving_average(col, size))
}
