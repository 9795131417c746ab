// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov Core — Property-Based Tests (proptest) for vlasov-math
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for vlasov-math using proptest.
//!
//! Covers: FFT round-trip and linearity, Lagrange kernel normalisation,
//! interpolation clamping, Airy Wronskian.

use proptest::prelude::*;
use vlasov_math::airy::{airy_ai, airy_aip, airy_bi, airy_bip};
use vlasov_math::fft::SpectralTransform;
use vlasov_math::interp::{interp1d, lagrange_kernel};

// ── FFT Properties ───────────────────────────────────────────────────

proptest! {
    /// IFFT(FFT(x)) = x for arbitrary real signals of arbitrary length.
    #[test]
    fn fft_roundtrip(len in 2usize..256, seed in 0u64..1000) {
        let signal: Vec<f64> = (0..len)
            .map(|i| (((i as u64 + 1) * (seed + 7)) % 97) as f64 / 97.0 - 0.5)
            .collect();
        let mut t = SpectralTransform::new(len);
        let spectrum = t.forward(&signal);
        let (back, max_imag) = t.inverse_real(&spectrum);

        prop_assert!(max_imag < 1e-10, "imaginary residue {}", max_imag);
        for i in 0..len {
            prop_assert!((back[i] - signal[i]).abs() < 1e-10,
                "roundtrip mismatch at {}: {} vs {}", i, back[i], signal[i]);
        }
    }

    /// The spectrum of a real signal is hermitian: X[len-k] = conj(X[k]).
    #[test]
    fn fft_hermitian_spectrum(len in 4usize..128) {
        let signal: Vec<f64> = (0..len).map(|i| ((i * i) as f64 * 0.01).sin()).collect();
        let mut t = SpectralTransform::new(len);
        let spectrum = t.forward(&signal);

        for k in 1..len {
            let a = spectrum[k];
            let b = spectrum[len - k].conj();
            prop_assert!((a - b).norm() < 1e-9 * (1.0 + a.norm()),
                "bin {} not hermitian", k);
        }
    }

    /// Parseval: Σ|x|² = (1/N)·Σ|X|².
    #[test]
    fn fft_parseval(len in 2usize..128) {
        let signal: Vec<f64> = (0..len).map(|i| ((i * 13 + 5) % 31) as f64 / 31.0).collect();
        let mut t = SpectralTransform::new(len);
        let spectrum = t.forward(&signal);

        let time_energy: f64 = signal.iter().map(|v| v * v).sum();
        let freq_energy: f64 = spectrum.iter().map(|c| c.norm_sqr()).sum::<f64>() / len as f64;
        prop_assert!((time_energy - freq_energy).abs() < 1e-9 * time_energy.max(1.0),
            "Parseval violated: {} vs {}", time_energy, freq_energy);
    }
}

// ── Interpolation Properties ─────────────────────────────────────────

proptest! {
    /// Kernel weights sum to 1 for every order and fractional position.
    #[test]
    fn kernel_weights_normalised(points in 1usize..=4, x in -100.0f64..100.0) {
        let k = lagrange_kernel(points, x);
        let sum: f64 = k.weights[..k.points].iter().sum();
        prop_assert!((sum - 1.0).abs() < 1e-9,
            "K={} x={}: weight sum {}", points, x, sum);
    }

    /// Interpolation of a constant array returns that constant.
    #[test]
    fn interp_constant(points in 1usize..=4, val in -50.0f64..50.0, x in 2.0f64..13.0) {
        let samples = vec![val; 16];
        let got = interp1d(&samples, x, points, false);
        prop_assert!((got - val).abs() < 1e-9,
            "constant field: got {} expected {}", got, val);
    }

    /// Clamped interpolation never leaves the range of the samples.
    #[test]
    fn interp_clamped_in_range(points in 1usize..=4, x in 1.5f64..14.5, seed in 0u64..500) {
        let samples: Vec<f64> = (0..16)
            .map(|i| (((i as u64 + seed) * 2654435761) % 1000) as f64 / 1000.0)
            .collect();
        let got = interp1d(&samples, x, points, true);
        let lo = samples.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(got >= lo - 1e-12 && got <= hi + 1e-12,
            "clamped value {} outside [{}, {}]", got, lo, hi);
    }
}

// ── Airy Properties ──────────────────────────────────────────────────

proptest! {
    /// Wronskian identity Ai·Bi' - Ai'·Bi = 1/pi on the whole range the
    /// impedance sum evaluates.
    #[test]
    fn airy_wronskian(x in 0.0f64..30.0) {
        let w = airy_ai(x) * airy_bip(x) - airy_aip(x) * airy_bi(x);
        let expected = std::f64::consts::FRAC_1_PI;
        prop_assert!((w - expected).abs() < 1e-8,
            "Wronskian at {}: {}", x, w);
    }

    /// Ai stays positive and Ai' negative for x > 0.
    #[test]
    fn airy_signs(x in 0.01f64..40.0) {
        prop_assert!(airy_ai(x) > 0.0);
        prop_assert!(airy_aip(x) < 0.0);
    }
}
