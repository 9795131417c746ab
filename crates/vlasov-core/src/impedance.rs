// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov Core — Impedance
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Frequency-domain coupling impedance of the ring.
//!
//! All constructors sample onto a uniform grid of `M` complex values on
//! `[0, f_max)`, bin `i` at `i·f_max/M`, so impedances compose by plain
//! componentwise addition and the field can index them bin-for-bin
//! against its charge spectrum.

use num_complex::Complex64;
use std::f64::consts::PI;
use std::ops::AddAssign;
use vlasov_math::airy::airy_products;
use vlasov_types::constants;
use vlasov_types::error::{VlasovError, VlasovResult};

/// Relative tolerance terminating the image-mode sum.
const MODE_SUM_TOL: f64 = 1e-8;
/// Hard ceiling on image modes per frequency bin.
const MODE_SUM_MAX: usize = 20_000;

#[derive(Debug, Clone)]
pub struct Impedance {
    data: Vec<Complex64>,
    f_max: f64,
}

impl Impedance {
    pub fn new(data: Vec<Complex64>, f_max: f64) -> Self {
        Impedance { data, f_max }
    }

    pub fn n_freqs(&self) -> usize {
        self.data.len()
    }

    pub fn f_max(&self) -> f64 {
        self.f_max
    }

    /// Frequency of bin `i`.
    pub fn frequency(&self, i: usize) -> f64 {
        i as f64 * self.f_max / self.data.len() as f64
    }

    pub fn data(&self) -> &[Complex64] {
        &self.data
    }

    /// Impedance at bin `i`; bins past the sampled grid contribute
    /// nothing.
    #[inline]
    pub fn at(&self, i: usize) -> Complex64 {
        self.data.get(i).copied().unwrap_or(Complex64::ZERO)
    }

    /// Free-space steady-state CSR impedance, ∝ (f/f0)^(1/3) with phase
    /// π/6.
    pub fn free_space_csr(n: usize, f0: f64, f_max: f64) -> Self {
        let phase = Complex64::new((PI / 6.0).cos(), (PI / 6.0).sin());
        let prefactor =
            constants::Z0_VACUUM * constants::GAMMA_TWO_THIRDS / 3f64.powf(1.0 / 3.0);
        let data = (0..n)
            .map(|i| {
                let n_h = (i as f64 * f_max / n as f64) / f0;
                prefactor * n_h.powf(1.0 / 3.0) * phase
            })
            .collect();
        Impedance { data, f_max }
    }

    /// CSR impedance shielded by parallel plates at full gap `g`
    /// (Murphy, Krinsky, Gluckstern image-mode sum).
    ///
    /// Each odd vertical image mode contributes
    /// `F(u) = Ai'(u²)·[Ai'(u²) − i·Bi'(u²)] + u²·Ai(u²)·[Ai(u²) − i·Bi(u²)]`;
    /// the sum is truncated once a mode falls below a relative
    /// tolerance. The mode count grows with frequency.
    pub fn parallel_plates_csr(n: usize, f0: f64, f_max: f64, gap: f64) -> Self {
        let r_bend = constants::C / (2.0 * PI * f0);
        let prefactor = constants::Z0_VACUUM * 4.0 * PI * PI / gap * r_bend.powf(2.0 / 3.0);
        let mut data = vec![Complex64::ZERO; n];
        for (i, z) in data.iter_mut().enumerate().skip(1) {
            let f = i as f64 * f_max / n as f64;
            let k = 2.0 * PI * f / constants::C;
            let lambda = (PI / gap) * (r_bend / (2.0 * k * k)).powf(1.0 / 3.0);
            let mut sum = Complex64::ZERO;
            for p in 0..MODE_SUM_MAX {
                let u = (2 * p + 1) as f64 * lambda;
                let prod = airy_products(u * u);
                let term = Complex64::new(
                    prod.aip2 + u * u * prod.ai2,
                    -(prod.aipbip + u * u * prod.aibi),
                );
                sum += term;
                if term.norm() < MODE_SUM_TOL * sum.norm() {
                    break;
                }
            }
            *z = prefactor * (2.0 / k).powf(1.0 / 3.0) * sum;
        }
        Impedance { data, f_max }
    }

    /// Thick-wall resistive impedance of a chamber with half-gap `b`,
    /// conductivity `sigma` and susceptibility `chi`, spread over one
    /// circumference.
    pub fn resistive_wall(
        n: usize,
        f0: f64,
        f_max: f64,
        sigma: f64,
        chi: f64,
        b: f64,
    ) -> Self {
        let circumference = constants::C / f0;
        let geometry = circumference / (2.0 * PI * b);
        let data = (0..n)
            .map(|i| {
                let f = i as f64 * f_max / n as f64;
                let surface = (PI * f * constants::MU0 * (1.0 + chi) / sigma).sqrt();
                Complex64::new(1.0, 1.0) * surface * geometry
            })
            .collect();
        Impedance { data, f_max }
    }

    /// Geometric step impedance of a collimator of radius `r` in a
    /// chamber of half-gap `b`. Purely real and frequency independent.
    pub fn collimator(n: usize, f_max: f64, b: f64, r: f64) -> Self {
        let z = Complex64::new(constants::Z0_VACUUM / PI * (b / r).ln(), 0.0);
        Impedance {
            data: vec![z; n],
            f_max,
        }
    }

    /// Two-column (Re, Im) file on a uniform grid. Rejected when it
    /// carries fewer than `min_samples` rows.
    pub fn from_file(path: &str, f_max: f64, min_samples: usize) -> VlasovResult<Self> {
        let rows = read_two_column(path)?;
        if rows.len() < min_samples {
            return Err(VlasovError::ConfigInvalid(format!(
                "impedance file {path} has {} samples, need at least {min_samples}",
                rows.len()
            )));
        }
        let data = rows
            .into_iter()
            .map(|(re, im)| Complex64::new(re, im))
            .collect();
        Ok(Impedance { data, f_max })
    }
}

impl AddAssign<&Impedance> for Impedance {
    fn add_assign(&mut self, other: &Impedance) {
        assert_eq!(
            self.data.len(),
            other.data.len(),
            "impedances must share the frequency grid"
        );
        assert!(
            (self.f_max - other.f_max).abs() <= 1e-9 * self.f_max.abs(),
            "impedances must share f_max"
        );
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += b;
        }
    }
}

/// Parse a whitespace-separated two-column text file. Lines that are
/// empty or start with '#' are skipped.
pub(crate) fn read_two_column(path: &str) -> VlasovResult<Vec<(f64, f64)>> {
    let contents = std::fs::read_to_string(path)?;
    let mut rows = Vec::new();
    for (lineno, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let a = fields.next();
        let b = fields.next();
        match (a, b) {
            (Some(a), Some(b)) => {
                let a = a.parse::<f64>().map_err(|_| {
                    VlasovError::ConfigInvalid(format!(
                        "{path}:{}: malformed value {a:?}",
                        lineno + 1
                    ))
                })?;
                let b = b.parse::<f64>().map_err(|_| {
                    VlasovError::ConfigInvalid(format!(
                        "{path}:{}: malformed value {b:?}",
                        lineno + 1
                    ))
                })?;
                rows.push((a, b));
            }
            _ => {
                return Err(VlasovError::ConfigInvalid(format!(
                    "{path}:{}: expected two columns",
                    lineno + 1
                )))
            }
        }
    }
    Ok(rows)
}
