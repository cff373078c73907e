//! Digital Filter Implementations
//!
//! IIR filters are designed in zeros/poles/gain form (analog prototype,
//! frequency transform, bilinear transform) and run as cascaded second-order
//! sections (biquads) for numerical stability. Zero-phase application runs the
//! cascade forward and backward over an odd-extended signal with steady-state
//! initial conditions, so the output has the input's length and no net delay.
//!
//! Cutoffs are normalized to Nyquist (1.0 = fs/2).

use num_complex::Complex64;
use std::f64::consts::PI;

/// Sample rate of the normalized frequency axis (Nyquist = 1.0).
const NORMALIZED_FS: f64 = 2.0;

/// Imaginary parts below this are treated as real poles/zeros.
const REAL_TOLERANCE: f64 = 1e-12;

/// Second-order section (biquad) coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Both poles strictly inside the unit circle (stability triangle)
    pub fn is_stable(&self) -> bool {
        self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }

    /// DC gain of this section
    fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }

    /// Transposed direct-form state reached after a long run of unit input.
    fn unit_step_state(&self) -> [f64; 2] {
        let c0 = self.b1 - self.a1 * self.b0;
        let c1 = self.b2 - self.a2 * self.b0;
        let z0 = (c0 + c1) / (1.0 + self.a1 + self.a2);
        [z0, c1 - self.a2 * z0]
    }

    /// Complex response at `z = e^{jω}`
    fn response(&self, omega: f64) -> Complex64 {
        let z1 = Complex64::from_polar(1.0, -omega);
        let z2 = z1 * z1;
        let num = z1 * self.b1 + z2 * self.b2 + self.b0;
        let den = z1 * self.a1 + z2 * self.a2 + 1.0;
        num / den
    }
}

/// State for a single biquad section (Direct Form II Transposed)
#[derive(Debug, Clone, Default)]
pub struct BiquadState {
    z1: f64,
    z2: f64,
}

/// Single biquad filter section
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    coeffs: BiquadCoeffs,
    state: BiquadState,
}

impl BiquadFilter {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            state: BiquadState::default(),
        }
    }

    /// Process a single sample using Direct Form II Transposed
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.coeffs.b0 * input + self.state.z1;
        self.state.z1 = self.coeffs.b1 * input - self.coeffs.a1 * output + self.state.z2;
        self.state.z2 = self.coeffs.b2 * input - self.coeffs.a2 * output;
        output
    }

    pub fn reset(&mut self) {
        self.state = BiquadState::default();
    }

    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }
}

/// Cascaded second-order sections filter. Overall gain is folded into the
/// first section's numerator.
#[derive(Debug, Clone)]
pub struct SosFilter {
    sections: Vec<BiquadFilter>,
}

impl SosFilter {
    pub fn new(sections: Vec<BiquadCoeffs>) -> Self {
        Self {
            sections: sections.into_iter().map(BiquadFilter::new).collect(),
        }
    }

    pub fn num_sections(&self) -> usize {
        self.sections.len()
    }

    pub fn coefficients(&self) -> Vec<BiquadCoeffs> {
        self.sections.iter().map(|s| s.coeffs).collect()
    }

    pub fn is_stable(&self) -> bool {
        self.sections.iter().all(|s| s.coeffs.is_stable())
    }

    /// Process a single sample through all sections
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let mut output = input;
        for section in &mut self.sections {
            output = section.process(output);
        }
        output
    }

    /// Process an entire signal array in-place
    pub fn process_signal(&mut self, signal: &mut [f64]) {
        for sample in signal.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Reset all section states
    pub fn reset(&mut self) {
        for section in &mut self.sections {
            section.reset();
        }
    }

    /// Set every section to the steady state of a constant input `level`, so
    /// a signal starting at `level` produces no start-up transient.
    pub fn prime(&mut self, level: f64) {
        let mut scale = level;
        for section in &mut self.sections {
            let [z1, z2] = section.coeffs.unit_step_state();
            section.state = BiquadState {
                z1: z1 * scale,
                z2: z2 * scale,
            };
            scale *= section.coeffs.dc_gain();
        }
    }

    /// Magnitude response at a frequency normalized to Nyquist
    pub fn magnitude_response(&self, normalized_freq: f64) -> f64 {
        let omega = PI * normalized_freq;
        self.sections
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, s| acc * s.coeffs.response(omega))
            .norm()
    }

    /// Edge padding used by [`SosFilter::filtfilt`]: three times the
    /// effective tap count of the cascade.
    pub fn padding_length(&self) -> usize {
        let n = self.sections.len();
        let zero_b2 = self.sections.iter().filter(|s| s.coeffs.b2 == 0.0).count();
        let zero_a2 = self.sections.iter().filter(|s| s.coeffs.a2 == 0.0).count();
        3 * (2 * n + 1 - zero_b2.min(zero_a2))
    }

    /// Zero-phase filtering: forward pass, time reversal, second pass,
    /// reversal. Output length always equals input length.
    pub fn filtfilt(&self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        if n == 0 {
            return Vec::new();
        }

        let padlen = self.padding_length().min(n - 1);
        let mut buffer = odd_extension(signal, padlen);
        let mut filter = self.clone();

        filter.prime(buffer[0]);
        filter.process_signal(&mut buffer);

        buffer.reverse();
        filter.prime(buffer[0]);
        filter.process_signal(&mut buffer);
        buffer.reverse();

        buffer[padlen..padlen + n].to_vec()
    }
}

/// Extend both ends by point reflection about the edge samples.
fn odd_extension(signal: &[f64], padlen: usize) -> Vec<f64> {
    let n = signal.len();
    let first = signal[0];
    let last = signal[n - 1];

    let mut out = Vec::with_capacity(n + 2 * padlen);
    out.extend((1..=padlen).rev().map(|i| 2.0 * first - signal[i]));
    out.extend_from_slice(signal);
    out.extend((1..=padlen).map(|i| 2.0 * last - signal[n - 1 - i]));
    out
}

/// Zeros, poles and gain of a filter (analog or digital)
#[derive(Debug, Clone)]
struct Zpk {
    zeros: Vec<Complex64>,
    poles: Vec<Complex64>,
    gain: f64,
}

impl Zpk {
    fn relative_degree(&self) -> usize {
        self.poles.len().saturating_sub(self.zeros.len())
    }

    /// Analog low-pass prototype → low-pass with cutoff `wo` (rad/s)
    fn lowpass_to_lowpass(self, wo: f64) -> Self {
        let degree = self.relative_degree();
        Self {
            zeros: self.zeros.iter().map(|&z| z * wo).collect(),
            poles: self.poles.iter().map(|&p| p * wo).collect(),
            gain: self.gain * wo.powi(degree as i32),
        }
    }

    /// Analog low-pass prototype → band-pass centred on `wo` with width `bw`
    fn lowpass_to_bandpass(self, wo: f64, bw: f64) -> Self {
        let degree = self.relative_degree();
        let split = |roots: &[Complex64]| -> Vec<Complex64> {
            let scaled: Vec<Complex64> = roots.iter().map(|&r| r * (bw / 2.0)).collect();
            let mut out = Vec::with_capacity(2 * roots.len());
            out.extend(scaled.iter().map(|&r| r + (r * r - wo * wo).sqrt()));
            out.extend(scaled.iter().map(|&r| r - (r * r - wo * wo).sqrt()));
            out
        };

        let mut zeros = split(&self.zeros);
        zeros.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(degree));

        Self {
            zeros,
            poles: split(&self.poles),
            gain: self.gain * bw.powi(degree as i32),
        }
    }

    /// Bilinear transform (s → z) at sample rate `fs`
    fn bilinear(self, fs: f64) -> Self {
        let degree = self.relative_degree();
        let fs2 = Complex64::new(2.0 * fs, 0.0);

        let num = self.zeros.iter().fold(Complex64::new(1.0, 0.0), |acc, &z| acc * (fs2 - z));
        let den = self.poles.iter().fold(Complex64::new(1.0, 0.0), |acc, &p| acc * (fs2 - p));

        let mut zeros: Vec<Complex64> = self.zeros.iter().map(|&z| (fs2 + z) / (fs2 - z)).collect();
        zeros.extend(std::iter::repeat(Complex64::new(-1.0, 0.0)).take(degree));

        Self {
            zeros,
            poles: self.poles.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect(),
            gain: self.gain * (num / den).re,
        }
    }

    /// Group conjugate pairs into second-order sections; poles closest to the
    /// unit circle end up in the last section.
    fn into_sections(self) -> Vec<BiquadCoeffs> {
        let mut pole_factors = factor_roots(&self.poles);
        pole_factors.sort_by(|a, b| a.radius.total_cmp(&b.radius));
        let zero_factors = factor_roots(&self.zeros);

        // Quadratic zero factors go with quadratic pole factors, linear ones last.
        let (mut quad_zeros, lin_zeros): (Vec<_>, Vec<_>) =
            zero_factors.into_iter().partition(|f| !f.linear);
        quad_zeros.extend(lin_zeros);

        let mut sections = Vec::with_capacity(pole_factors.len());
        for (i, pole) in pole_factors.iter().enumerate() {
            let zero = quad_zeros
                .get(i)
                .map(|f| f.coeffs)
                .unwrap_or([1.0, 0.0, 0.0]);
            sections.push(BiquadCoeffs {
                b0: zero[0],
                b1: zero[1],
                b2: zero[2],
                a1: pole.coeffs[1],
                a2: pole.coeffs[2],
            });
        }

        if let Some(first) = sections.first_mut() {
            first.b0 *= self.gain;
            first.b1 *= self.gain;
            first.b2 *= self.gain;
        }
        sections
    }
}

/// Monic polynomial factor `[1, c1, c2]` built from one or two roots
#[derive(Debug, Clone, Copy)]
struct RootFactor {
    coeffs: [f64; 3],
    radius: f64,
    linear: bool,
}

/// Split roots into conjugate-pair quadratics and paired real roots. Real
/// roots are paired lowest with highest; an odd one out becomes linear.
fn factor_roots(roots: &[Complex64]) -> Vec<RootFactor> {
    let mut factors = Vec::new();
    let mut reals: Vec<f64> = Vec::new();

    for r in roots {
        if r.im.abs() <= REAL_TOLERANCE {
            reals.push(r.re);
        } else if r.im > 0.0 {
            factors.push(RootFactor {
                coeffs: [1.0, -2.0 * r.re, r.norm_sqr()],
                radius: r.norm(),
                linear: false,
            });
        }
    }

    reals.sort_by(f64::total_cmp);
    let (mut lo, mut hi) = (0usize, reals.len());
    while hi >= lo + 2 {
        let (a, b) = (reals[lo], reals[hi - 1]);
        factors.push(RootFactor {
            coeffs: [1.0, -(a + b), a * b],
            radius: a.abs().max(b.abs()),
            linear: false,
        });
        lo += 1;
        hi -= 1;
    }
    if hi > lo {
        let r = reals[lo];
        factors.push(RootFactor {
            coeffs: [1.0, -r, 0.0],
            radius: r.abs(),
            linear: true,
        });
    }

    factors
}

/// Pre-warp a Nyquist-normalized frequency for the bilinear transform.
fn prewarp(normalized_freq: f64) -> f64 {
    2.0 * NORMALIZED_FS * (PI * normalized_freq / NORMALIZED_FS).tan()
}

/// Exponents `-N+1, -N+3, …, N-1` used by the analog prototypes
fn prototype_angles(order: usize) -> impl Iterator<Item = f64> {
    let n = order as i64;
    (0..n).map(move |k| (-n + 1 + 2 * k) as f64 * PI / (2.0 * n as f64))
}

/// Butterworth filter designer
pub struct ButterworthFilter;

impl ButterworthFilter {
    fn prototype(order: usize) -> Zpk {
        Zpk {
            zeros: Vec::new(),
            poles: prototype_angles(order)
                .map(|theta| -Complex64::new(0.0, theta).exp())
                .collect(),
            gain: 1.0,
        }
    }

    /// Band-pass between Nyquist-normalized `low` and `high`. The cascade
    /// has `order` sections (total order `2·order`).
    pub fn bandpass(low: f64, high: f64, order: usize) -> SosFilter {
        let wl = prewarp(low);
        let wh = prewarp(high);
        let zpk = Self::prototype(order)
            .lowpass_to_bandpass((wl * wh).sqrt(), wh - wl)
            .bilinear(NORMALIZED_FS);
        SosFilter::new(zpk.into_sections())
    }

    /// Low-pass at Nyquist-normalized `cutoff`
    pub fn lowpass(cutoff: f64, order: usize) -> SosFilter {
        let zpk = Self::prototype(order)
            .lowpass_to_lowpass(prewarp(cutoff))
            .bilinear(NORMALIZED_FS);
        SosFilter::new(zpk.into_sections())
    }
}

/// Chebyshev type I filter designer (equiripple passband)
pub struct ChebyshevFilter;

impl ChebyshevFilter {
    fn prototype(order: usize, ripple_db: f64) -> Zpk {
        let eps = (10f64.powf(0.1 * ripple_db) - 1.0).sqrt();
        let mu = (1.0 / eps).asinh() / order as f64;

        let poles: Vec<Complex64> = prototype_angles(order)
            .map(|theta| -Complex64::new(mu, theta).sinh())
            .collect();

        let mut gain = poles
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, p| acc * (-*p))
            .re;
        if order % 2 == 0 {
            gain /= (1.0 + eps * eps).sqrt();
        }

        Zpk {
            zeros: Vec::new(),
            poles,
            gain,
        }
    }

    /// Low-pass at Nyquist-normalized `cutoff` with `ripple_db` passband ripple
    pub fn lowpass(order: usize, ripple_db: f64, cutoff: f64) -> SosFilter {
        let zpk = Self::prototype(order, ripple_db)
            .lowpass_to_lowpass(prewarp(cutoff))
            .bilinear(NORMALIZED_FS);
        SosFilter::new(zpk.into_sections())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq_hz: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq_hz * i as f64 / fs).sin())
            .collect()
    }

    fn rms(x: &[f64]) -> f64 {
        (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt()
    }

    #[test]
    fn test_bandpass_section_count_and_stability() {
        for order in 1..=6 {
            let filter = ButterworthFilter::bandpass(0.02, 0.2, order);
            assert_eq!(filter.num_sections(), order);
            assert!(filter.is_stable(), "order {} unstable", order);
        }
    }

    #[test]
    fn test_bandpass_unity_gain_at_center() {
        let (low, high) = (0.01, 0.3);
        let filter = ButterworthFilter::bandpass(low, high, 2);

        let warped = ((PI * low / 2.0).tan() * (PI * high / 2.0).tan()).sqrt();
        let center = 2.0 * warped.atan() / PI;
        assert!((filter.magnitude_response(center) - 1.0).abs() < 1e-9);

        // -3 dB at the band edges
        let edge = std::f64::consts::FRAC_1_SQRT_2;
        assert!((filter.magnitude_response(low) - edge).abs() < 1e-6);
        assert!((filter.magnitude_response(high) - edge).abs() < 1e-6);
    }

    #[test]
    fn test_bandpass_blocks_dc() {
        let filter = ButterworthFilter::bandpass(0.05, 0.5, 2);
        assert!(filter.magnitude_response(0.0) < 1e-9);
    }

    #[test]
    fn test_filtfilt_attenuates_out_of_band() {
        let fs = 1000.0;
        let filter = ButterworthFilter::bandpass(10.0 / 500.0, 50.0 / 500.0, 2);

        let in_band = filter.filtfilt(&sine(25.0, fs, 4000));
        let out_band = filter.filtfilt(&sine(300.0, fs, 4000));

        assert!(rms(&in_band[500..3500]) > 0.6);
        assert!(rms(&out_band[500..3500]) < 0.01);
    }

    #[test]
    fn test_filtfilt_preserves_length_and_peak_position() {
        let filter = ButterworthFilter::lowpass(0.1, 4);
        let mut pulse = vec![0.0; 201];
        pulse[100] = 1.0;

        let out = filter.filtfilt(&pulse);
        assert_eq!(out.len(), pulse.len());

        let peak = out
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 100);
    }

    #[test]
    fn test_filtfilt_short_signals() {
        let filter = ButterworthFilter::bandpass(0.1, 0.4, 2);
        assert!(filter.filtfilt(&[]).is_empty());
        assert_eq!(filter.filtfilt(&[1.0]).len(), 1);
        assert_eq!(filter.filtfilt(&[1.0, 2.0, 3.0]).len(), 3);
    }

    #[test]
    fn test_prime_removes_step_transient() {
        let mut filter = ButterworthFilter::lowpass(0.2, 2);
        filter.prime(5.0);
        let mut signal = vec![5.0; 50];
        filter.process_signal(&mut signal);
        for v in signal {
            assert!((v - 5.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_chebyshev_lowpass_passband() {
        let filter = ChebyshevFilter::lowpass(8, 0.05, 0.4);
        assert_eq!(filter.num_sections(), 4);
        assert!(filter.is_stable());

        // Even order: DC sits at the bottom of the ripple band
        let ripple = 10f64.powf(-0.05 / 20.0);
        assert!((filter.magnitude_response(0.0) - ripple).abs() < 1e-6);
        assert!(filter.magnitude_response(0.8) < 1e-3);
    }

    #[test]
    fn test_odd_extension() {
        let ext = odd_extension(&[1.0, 2.0, 4.0], 2);
        assert_eq!(ext, vec![-2.0, 0.0, 1.0, 2.0, 4.0, 6.0, 7.0]);
    }
}
