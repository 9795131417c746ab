// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov Core — Electric Field
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Self-consistent wake potential and CSR spectrum.
//!
//! The charge projection is zero-padded, transformed, multiplied by the
//! impedance (hermitian-extended so the inverse transform is real) and
//! transformed back. FFT plans live for the whole run.
//!
//! `wake_scaling` is the single factor converting the raw convolution
//! into a kick in energy-spread units per step:
//! `I_scaled · Δq · revolutionpart / ΔE`, where `I_scaled·Δq·ρ̂` is the
//! spectral line current, `Z·Î` the voltage per turn, `revolutionpart`
//! the fraction of a turn per step, and `ΔE` the absolute energy spread
//! in eV. The 1/M inverse-FFT normalisation is part of the transform.

use num_complex::Complex64;
use vlasov_math::fft::SpectralTransform;
use vlasov_types::constants;
use vlasov_types::error::{VlasovError, VlasovResult};

use crate::impedance::Impedance;
use crate::mesh::{Axis, PhaseSpace};

/// Largest tolerated imaginary residue of the wake, relative to its
/// peak. Anything above it means the spectrum lost hermitian symmetry.
const REALNESS_TOL: f64 = 1e-6;

pub struct ElectricField {
    n: usize,
    padded: usize,
    transform: SpectralTransform,
    impedance: Impedance,
    wake_scaling: f64,
    line_current_scale: f64,
    delta_f: f64,
    charge_spectrum: Vec<Complex64>,
    wake_potential: Vec<f64>,
    csr_spectrum: Vec<f64>,
    csr_power: f64,
}

impl ElectricField {
    /// `current` is the scaled bunch current, `revolution_part` the
    /// fraction of a revolution per step, `delta_e` the absolute energy
    /// spread in eV.
    pub fn new(
        mesh: &PhaseSpace,
        impedance: Impedance,
        pad: usize,
        current: f64,
        revolution_part: f64,
        delta_e: f64,
    ) -> VlasovResult<Self> {
        if pad == 0 {
            return Err(VlasovError::ConfigInvalid(
                "padding factor must be >= 1".to_string(),
            ));
        }
        let n = mesh.n();
        let padded = n * pad;
        let dq = mesh.axis(Axis::Q).delta();
        let line_current_scale = current * dq;
        let wake_scaling = line_current_scale * revolution_part / delta_e;

        // seconds per q sample fixes the frequency resolution
        let dt_sample = dq * mesh.scalars().length / constants::C;
        let delta_f = 1.0 / (padded as f64 * dt_sample);

        Ok(ElectricField {
            n,
            padded,
            transform: SpectralTransform::new(padded),
            impedance,
            wake_scaling,
            line_current_scale,
            delta_f,
            charge_spectrum: vec![Complex64::ZERO; padded],
            wake_potential: vec![0.0; n],
            csr_spectrum: vec![0.0; padded / 2 + 1],
            csr_power: 0.0,
        })
    }

    pub fn impedance(&self) -> &Impedance {
        &self.impedance
    }

    /// Frequency resolution of the padded transform (Hz per bin).
    pub fn delta_f(&self) -> f64 {
        self.delta_f
    }

    /// Recompute the wake potential from the mesh's x-projection.
    /// The projection must be fresh; the result is cached.
    pub fn update_wake(&mut self, mesh: &PhaseSpace) -> VlasovResult<()> {
        let proj = mesh
            .x_projection()
            .as_slice()
            .expect("projection must be contiguous");
        let spectrum = self.transform.forward(proj);

        let m = self.padded;
        let half = m / 2;
        let mut wake_spec = vec![Complex64::ZERO; m];
        for k in 0..=half {
            wake_spec[k] = spectrum[k] * self.impedance.at(k);
        }
        // negative-frequency bins mirror conjugate so V(q) is real
        for k in half + 1..m {
            wake_spec[k] = wake_spec[m - k].conj();
        }
        if m % 2 == 0 {
            wake_spec[half] = Complex64::new(wake_spec[half].re, 0.0);
        }

        let (v, max_imag) = self.transform.inverse_real(&wake_spec);
        let peak = v.iter().fold(0.0f64, |a, &b| a.max(b.abs()));
        if max_imag > REALNESS_TOL * peak.max(1e-300) {
            return Err(VlasovError::NumericalDivergence {
                step: 0,
                message: format!(
                    "wake potential lost realness: residue {max_imag}, peak {peak}"
                ),
            });
        }

        for (dst, &src) in self.wake_potential.iter_mut().zip(v.iter()) {
            *dst = src * self.wake_scaling;
        }
        self.charge_spectrum = spectrum;
        Ok(())
    }

    /// Wake potential on the first `n` q-cells, in energy-spread units
    /// per step.
    pub fn wake_potential(&self) -> &[f64] {
        &self.wake_potential
    }

    pub fn charge_spectrum(&self) -> &[Complex64] {
        &self.charge_spectrum
    }

    /// Rebuild the CSR power spectrum `|ρ̂|²·Re Z`, truncated above the
    /// cutoff frequency. Returns the integrated power.
    pub fn update_csr(&mut self, cutoff: f64) -> f64 {
        let half = self.padded / 2;
        let cutoff_bin = if cutoff > 0.0 {
            ((cutoff / self.delta_f) as usize).min(half)
        } else {
            half
        };
        let amp2 = self.line_current_scale * self.line_current_scale;
        for (k, out) in self.csr_spectrum.iter_mut().enumerate() {
            *out = if k <= cutoff_bin {
                amp2 * self.charge_spectrum[k].norm_sqr() * self.impedance.at(k).re
            } else {
                0.0
            };
        }
        // both frequency signs, DC excluded
        self.csr_power = 2.0
            * self.csr_spectrum[1..=cutoff_bin]
                .iter()
                .sum::<f64>()
            * self.delta_f;
        self.csr_power
    }

    pub fn csr_power(&self) -> f64 {
        self.csr_power
    }

    pub fn csr_spectrum(&self) -> &[f64] {
        &self.csr_spectrum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::BunchScalars;

    const F0: f64 = 8.58e6;

    fn scalars() -> BunchScalars {
        BunchScalars {
            charge: 1e-10,
            current: 1e-3,
            length: 1e-3,
            energy_spread: 6e5,
        }
    }

    fn mesh(n: usize) -> PhaseSpace {
        let mut ps = PhaseSpace::new(n, -5.0, 5.0, -5.0, 5.0, scalars());
        ps.update_x_projection();
        ps
    }

    fn flat_impedance(padded: usize, value: f64) -> Impedance {
        Impedance::new(
            vec![Complex64::new(value, 0.0); padded],
            1e12,
        )
    }

    #[test]
    fn test_flat_real_impedance_reproduces_profile() {
        // a frequency-independent real impedance turns the convolution
        // into a pure scaling of the charge profile
        let n = 64;
        let pad = 2;
        let ps = mesh(n);
        let z_val = 100.0;
        let mut field = ElectricField::new(
            &ps,
            flat_impedance(n * pad, z_val),
            pad,
            1e-3,
            1e-4,
            6e5,
        )
        .unwrap();
        field.update_wake(&ps).unwrap();

        let dq = ps.axis(Axis::Q).delta();
        let scaling = 1e-3 * dq * 1e-4 / 6e5 * z_val;
        for x in 0..n {
            let expect = ps.x_projection()[x] * scaling;
            let got = field.wake_potential()[x];
            assert!(
                (got - expect).abs() < 1e-12 + 1e-9 * expect.abs(),
                "x={x}: {got} vs {expect}"
            );
        }
    }

    #[test]
    fn test_convolution_linearity() {
        let n = 64;
        let pad = 2;
        let mut ps = mesh(n);
        let imp = Impedance::free_space_csr(n * pad, F0, 1e12);
        let mut field =
            ElectricField::new(&ps, imp, pad, 1e-3, 1e-4, 6e5).unwrap();

        let rho1: Vec<f64> = (0..n).map(|i| (-((i as f64 - 20.0) / 5.0).powi(2)).exp()).collect();
        let rho2: Vec<f64> = (0..n).map(|i| (-((i as f64 - 40.0) / 7.0).powi(2)).exp()).collect();
        let (a, b) = (2.0, -0.5);

        ps.set_x_projection(&rho1);
        field.update_wake(&ps).unwrap();
        let w1 = field.wake_potential().to_vec();

        ps.set_x_projection(&rho2);
        field.update_wake(&ps).unwrap();
        let w2 = field.wake_potential().to_vec();

        let combo: Vec<f64> = rho1.iter().zip(&rho2).map(|(x, y)| a * x + b * y).collect();
        ps.set_x_projection(&combo);
        field.update_wake(&ps).unwrap();

        let scale = w1.iter().fold(0.0f64, |m, &v| m.max(v.abs()));
        for x in 0..n {
            let expect = a * w1[x] + b * w2[x];
            let got = field.wake_potential()[x];
            assert!(
                (got - expect).abs() < 1e-4 * scale.max(1e-30),
                "linearity broken at {x}: {got} vs {expect}"
            );
        }
    }

    #[test]
    fn test_zero_charge_zero_wake() {
        let n = 32;
        let mut ps = mesh(n);
        ps.set_x_projection(&vec![0.0; n]);
        let imp = Impedance::free_space_csr(n * 2, F0, 1e12);
        let mut field =
            ElectricField::new(&ps, imp, 2, 1e-3, 1e-4, 6e5).unwrap();
        field.update_wake(&ps).unwrap();
        for &v in field.wake_potential() {
            assert_eq!(v, 0.0);
        }
    }

    #[test]
    fn test_csr_power_positive_and_cutoff_monotone() {
        let n = 64;
        let pad = 2;
        let ps = mesh(n);
        let imp = Impedance::free_space_csr(n * pad, F0, 1e12);
        let mut field =
            ElectricField::new(&ps, imp, pad, 1e-3, 1e-4, 6e5).unwrap();
        field.update_wake(&ps).unwrap();

        let full = field.update_csr(0.0);
        assert!(full > 0.0, "CSR power must be positive, got {full}");
        let partial = field.update_csr(field.delta_f() * 10.0);
        assert!(partial <= full, "cutoff must not add power");
        assert!(partial > 0.0);
    }

    #[test]
    fn test_csr_power_scales_with_current_squared() {
        let n = 64;
        let pad = 2;
        let ps = mesh(n);
        let imp = Impedance::free_space_csr(n * pad, F0, 1e12);

        let mut weak =
            ElectricField::new(&ps, imp.clone(), pad, 1e-3, 1e-4, 6e5).unwrap();
        weak.update_wake(&ps).unwrap();
        let p_weak = weak.update_csr(0.0);

        let mut strong =
            ElectricField::new(&ps, imp, pad, 2e-3, 1e-4, 6e5).unwrap();
        strong.update_wake(&ps).unwrap();
        let p_strong = strong.update_csr(0.0);

        let ratio = p_strong / p_weak;
        assert!((ratio - 4.0).abs() < 1e-9, "ratio {ratio}");
    }
}
