//! 1D FFT wrappers around rustfft for real-valued signals.
//!
//! Convention matches numpy:
//! - Forward FFT: unnormalized
//! - Inverse FFT: normalized by 1/len
//!
//! Plans are expensive, so a [`SpectralTransform`] creates them once for a
//! fixed length and reuses the scratch buffer across calls.

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Cached forward/inverse FFT plans for one transform length.
pub struct SpectralTransform {
    len: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    scratch: Vec<Complex64>,
}

impl SpectralTransform {
    pub fn new(len: usize) -> Self {
        assert!(len > 0, "transform length must be > 0");
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(len);
        let inverse = planner.plan_fft_inverse(len);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        SpectralTransform {
            len,
            forward,
            inverse,
            scratch: vec![Complex64::new(0.0, 0.0); scratch_len],
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Forward FFT of a real signal. The signal may be shorter than the
    /// transform length; the remainder is zero-padded.
    pub fn forward(&mut self, signal: &[f64]) -> Vec<Complex64> {
        assert!(
            signal.len() <= self.len,
            "signal length {} exceeds transform length {}",
            signal.len(),
            self.len
        );
        let mut data = vec![Complex64::new(0.0, 0.0); self.len];
        for (d, &s) in data.iter_mut().zip(signal.iter()) {
            d.re = s;
        }
        self.forward.process_with_scratch(&mut data, &mut self.scratch);
        data
    }

    /// Inverse FFT with 1/len normalization, returning the real part and
    /// the largest imaginary residue.
    ///
    /// For a hermitian spectrum the residue is pure rounding noise; a
    /// large residue indicates a non-hermitian spectrum upstream.
    pub fn inverse_real(&mut self, spectrum: &[Complex64]) -> (Vec<f64>, f64) {
        assert_eq!(
            spectrum.len(),
            self.len,
            "spectrum length must equal transform length"
        );
        let norm = 1.0 / self.len as f64;
        let mut data = spectrum.to_vec();
        self.inverse.process_with_scratch(&mut data, &mut self.scratch);

        let mut max_imag = 0.0f64;
        let mut out = Vec::with_capacity(self.len);
        for c in &data {
            max_imag = max_imag.max((c.im * norm).abs());
            out.push(c.re * norm);
        }
        (out, max_imag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let n = 64;
        let signal: Vec<f64> = (0..n).map(|i| ((i * 7 + 3) as f64).sin()).collect();
        let mut t = SpectralTransform::new(n);
        let spectrum = t.forward(&signal);
        let (recovered, max_imag) = t.inverse_real(&spectrum);

        for (i, (&a, &b)) in signal.iter().zip(recovered.iter()).enumerate() {
            assert!((a - b).abs() < 1e-12, "roundtrip failed at {i}: {a} vs {b}");
        }
        assert!(max_imag < 1e-12, "imaginary residue {max_imag}");
    }

    #[test]
    fn test_dc_component() {
        let n = 32;
        let val = 2.5;
        let signal = vec![val; n];
        let mut t = SpectralTransform::new(n);
        let spectrum = t.forward(&signal);

        assert!((spectrum[0].re - n as f64 * val).abs() < 1e-10);
        assert!(spectrum[0].im.abs() < 1e-12);
        for k in 1..n {
            assert!(spectrum[k].norm() < 1e-9, "bin {k} should vanish");
        }
    }

    #[test]
    fn test_zero_padding() {
        // padded transform of a short signal keeps the total (DC bin)
        let signal = vec![1.0; 16];
        let mut t = SpectralTransform::new(64);
        let spectrum = t.forward(&signal);
        assert!((spectrum[0].re - 16.0).abs() < 1e-10);
    }

    #[test]
    fn test_linearity() {
        let n = 48;
        let s1: Vec<f64> = (0..n).map(|i| (i as f64 * 0.3).cos()).collect();
        let s2: Vec<f64> = (0..n).map(|i| (i as f64 * 0.7).sin()).collect();
        let combo: Vec<f64> = s1.iter().zip(&s2).map(|(a, b)| 2.0 * a - 3.0 * b).collect();

        let mut t = SpectralTransform::new(n);
        let f1 = t.forward(&s1);
        let f2 = t.forward(&s2);
        let fc = t.forward(&combo);

        for k in 0..n {
            let expect = 2.0 * f1[k] - 3.0 * f2[k];
            assert!((fc[k] - expect).norm() < 1e-9, "linearity broken at bin {k}");
        }
    }
}
