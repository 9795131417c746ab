// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov Core — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::constants;
use crate::error::{VlasovError, VlasovResult};

/// Frozen parameter record handed to the evolution engine.
///
/// Command-line and config-file parsing live outside the core; whatever
/// produced this record is expected not to mutate it afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Mesh cells per axis. May be 0 only when a start-distribution file
    /// fixes the size.
    pub grid_size: usize,
    /// Full phase-space extent in natural units (both axes).
    pub phase_space_size: f64,
    /// Grid shift in cells, horizontal (q) direction.
    pub ps_shift_x: f64,
    /// Grid shift in cells, vertical (p) direction.
    pub ps_shift_y: f64,

    /// Bunch current (A).
    pub bunch_current: f64,
    /// Reference particle energy (eV).
    pub beam_energy: f64,
    /// Relative RMS energy spread.
    pub energy_spread: f64,
    /// Revolution frequency (Hz).
    pub revolution_frequency: f64,
    /// Synchrotron frequency (Hz); a non-positive value means
    /// "derive from alpha0" instead.
    pub synchrotron_frequency: f64,
    /// Linear momentum compaction.
    pub alpha0: f64,
    /// First-order chromatic momentum compaction.
    pub alpha1: f64,
    /// Second-order chromatic momentum compaction.
    pub alpha2: f64,
    /// RF harmonic number.
    pub harmonic_number: f64,
    /// RF peak voltage (V).
    pub rf_voltage: f64,
    /// Longitudinal damping time (s); non-positive disables damping.
    pub damping_time: f64,
    /// Bending radius (m); non-positive means isomagnetic ring derived
    /// from the revolution frequency.
    pub bending_radius: f64,

    /// Full vacuum chamber gap (m); 0 selects free-space CSR.
    pub vacuum_chamber_gap: f64,
    /// Wall conductivity (S/m); non-positive disables the resistive wall.
    pub wall_conductivity: f64,
    /// Wall magnetic susceptibility.
    pub wall_susceptibility: f64,
    /// Collimator aperture radius (m); non-positive disables it.
    pub collimator_radius: f64,
    /// CSR spectrum cutoff frequency (Hz).
    pub cutoff_frequency: f64,

    /// 0/1: precomputed rotation map; 2: RF kick followed by drift.
    pub rotation_type: u8,
    /// Interpolation points per axis (1 nearest, 2 linear, 3 quadratic,
    /// 4 cubic).
    pub interpolation_points: usize,
    /// Clip interpolated values to the range of the contributing cells.
    pub interpolation_clamped: bool,
    /// Simulation steps per synchrotron period.
    pub steps: usize,
    /// Number of synchrotron periods to simulate.
    pub rotations: f64,
    /// Snapshot stride in steps; 0 disables periodic output.
    pub outstep: usize,
    /// Zero-padding factor for the wake convolution (>= 1).
    pub padding: usize,
    /// Renormalisation stride in steps; 0 disables renormalisation.
    pub renormalize: usize,
    /// Haissinski seed iterations before the main loop.
    pub haissinski_iterations: usize,
    /// RF kick position scale; non-positive selects 1/angle, which makes
    /// the small-amplitude limit match the rotation's linear focusing.
    #[serde(default)]
    pub rf_q_scale: f64,

    #[serde(default)]
    pub start_dist_file: Option<String>,
    #[serde(default)]
    pub wake_file: Option<String>,
    #[serde(default)]
    pub impedance_file: Option<String>,
    #[serde(default)]
    pub output_file: Option<String>,
    #[serde(default)]
    pub tracking_file: Option<String>,

    /// Accelerator selector: 0 = host path, n > 0 = adapter n-1.
    #[serde(default)]
    pub gpu_device: i32,
}

impl SimulationConfig {
    /// Load a frozen parameter record from a JSON file.
    pub fn from_file(path: &str) -> VlasovResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }
}

/// Scaled physical quantities derived from a [`SimulationConfig`].
///
/// This is the unit-conversion preamble: everything the engine consumes
/// downstream is expressed in mesh-natural units (q in bunch lengths,
/// p in energy spreads) or plain SI.
#[derive(Debug, Clone)]
pub struct ScaledParams {
    pub n: usize,
    pub q_min: f64,
    pub q_max: f64,
    pub p_min: f64,
    pub p_max: f64,

    /// Absolute energy spread (eV).
    pub delta_e: f64,
    /// Bending radius (m).
    pub r_bend: f64,
    /// Revolution frequency of the isomagnetic ring (Hz).
    pub f0: f64,
    /// f_rev / f0, the isomagnetic scaling (<= 1).
    pub isoscale: f64,
    /// Synchrotron frequency of the isomagnetic ring (Hz).
    pub f_s: f64,
    /// Synchrotron frequency of the real ring (Hz).
    pub f_s_unscaled: f64,
    pub alpha0: f64,
    pub alpha1: f64,
    pub alpha2: f64,
    /// Isomagnetically scaled harmonic number.
    pub harmonic: f64,
    /// Natural RMS bunch length (m).
    pub bunch_length: f64,
    /// Charge of the bunch (C).
    pub bunch_charge: f64,
    /// Isomagnetically scaled bunch current (A).
    pub current_scaled: f64,
    /// Scaled damping time (s); 0 when damping is off.
    pub damping_time: f64,

    /// Wall-clock seconds per simulation step.
    pub dt: f64,
    /// Fraction of one revolution per simulation step.
    pub revolution_part: f64,
    /// Rotation angle per step (rad); 2π is one synchrotron period.
    pub angle: f64,
    /// Fokker–Planck strength e = 2/(f_s·t_d·steps); 0 without damping.
    pub fp_beta: f64,

    /// Upper edge of the impedance frequency grid (Hz).
    pub f_max: f64,
    /// Shielding parameter (0 in free space).
    pub shielding: f64,
    /// Bursting (scaling-law) threshold current (A); 0 in free space.
    pub bbt_threshold: f64,
    /// CSR strength S = I_scaled / I_norm; 0 in free space.
    pub csr_strength: f64,
}

impl ScaledParams {
    /// Derive the scaled quantities, validating cross-field consistency.
    pub fn derive(cfg: &SimulationConfig) -> VlasovResult<Self> {
        if cfg.grid_size == 0 && cfg.start_dist_file.is_none() {
            return Err(VlasovError::ConfigInvalid(
                "grid_size is 0 and no start-distribution file is given".to_string(),
            ));
        }
        if !(1..=4).contains(&cfg.interpolation_points) {
            return Err(VlasovError::ConfigInvalid(format!(
                "interpolation_points must be 1..=4, got {}",
                cfg.interpolation_points
            )));
        }
        if cfg.steps == 0 {
            return Err(VlasovError::ConfigInvalid(
                "steps per synchrotron period must be >= 1".to_string(),
            ));
        }
        if cfg.padding == 0 {
            return Err(VlasovError::ConfigInvalid(
                "padding factor must be >= 1".to_string(),
            ));
        }
        if cfg.phase_space_size <= 0.0 {
            return Err(VlasovError::ConfigInvalid(format!(
                "phase_space_size must be positive, got {}",
                cfg.phase_space_size
            )));
        }
        for (name, v) in [
            ("beam_energy", cfg.beam_energy),
            ("energy_spread", cfg.energy_spread),
            ("revolution_frequency", cfg.revolution_frequency),
            ("harmonic_number", cfg.harmonic_number),
            ("rf_voltage", cfg.rf_voltage),
        ] {
            if v <= 0.0 {
                return Err(VlasovError::ConfigInvalid(format!(
                    "{name} must be positive, got {v}"
                )));
            }
        }
        if cfg.synchrotron_frequency <= 0.0 && cfg.alpha0 <= 0.0 {
            return Err(VlasovError::ConfigInvalid(
                "either synchrotron_frequency or alpha0 must be positive".to_string(),
            ));
        }

        let n = cfg.grid_size;
        let pq = cfg.phase_space_size;
        let cells = (n.max(2) - 1) as f64;
        let q_center = -cfg.ps_shift_x * pq / cells;
        let p_center = -cfg.ps_shift_y * pq / cells;
        let half = pq / 2.0;
        let q_min = q_center - half;
        let q_max = q_center + half;
        let p_min = p_center - half;
        let p_max = p_center + half;
        if q_max <= 0.0 {
            return Err(VlasovError::ConfigInvalid(
                "phase-space shift pushes q_max below zero".to_string(),
            ));
        }

        let delta_e = cfg.energy_spread * cfg.beam_energy;

        let r_bend = if cfg.bending_radius > 0.0 {
            cfg.bending_radius
        } else {
            constants::C / (2.0 * PI * cfg.revolution_frequency)
        };
        let f0 = if cfg.bending_radius > 0.0 {
            constants::C / (2.0 * PI * r_bend)
        } else {
            cfg.revolution_frequency
        };
        // isomagnetic scaling, defined to be <= 1
        let isoscale = cfg.revolution_frequency / f0;

        // positive f_s wins, negative implies usage of alpha0
        let (f_s_unscaled, alpha0) = if cfg.synchrotron_frequency > 0.0 {
            let alpha0 = 2.0 * PI * cfg.beam_energy / (cfg.harmonic_number * cfg.rf_voltage)
                * (cfg.synchrotron_frequency / cfg.revolution_frequency).powi(2);
            (cfg.synchrotron_frequency, alpha0)
        } else {
            let f_s = cfg.revolution_frequency
                * (cfg.alpha0 * cfg.harmonic_number * cfg.rf_voltage
                    / (2.0 * PI * cfg.beam_energy))
                    .sqrt();
            (f_s, cfg.alpha0)
        };
        let f_s = f_s_unscaled / isoscale;
        let harmonic = isoscale * cfg.harmonic_number;

        let bunch_length = constants::C * delta_e / harmonic / f0.powi(2) / cfg.rf_voltage * f_s;
        let bunch_charge = cfg.bunch_current / cfg.revolution_frequency;
        let current_scaled = cfg.bunch_current / isoscale;
        let damping_time = if cfg.damping_time > 0.0 {
            isoscale * cfg.damping_time
        } else {
            0.0
        };

        let dt = 1.0 / (f_s * cfg.steps as f64);
        let revolution_part = f0 * dt;
        let angle = 2.0 * PI / cfg.steps as f64;
        let fp_beta = if damping_time > 0.0 {
            2.0 / (f_s * damping_time * cfg.steps as f64)
        } else {
            0.0
        };

        let f_max = n.max(1) as f64 * constants::C / (2.0 * q_max * bunch_length);

        let gap = cfg.vacuum_chamber_gap;
        let (shielding, bbt_threshold, csr_strength) = if gap > 0.0 {
            let shield = bunch_length * r_bend.sqrt() * gap.powf(-1.5);
            let i_norm = constants::I_ALFVEN / constants::E_REST_ELECTRON_EV
                * 2.0
                * PI
                * (delta_e * f_s / f0).powi(2)
                / cfg.rf_voltage
                / harmonic
                * (bunch_length / r_bend).powf(1.0 / 3.0);
            let i_th = i_norm * (0.5 + 0.34 * shield);
            (shield, i_th, current_scaled / i_norm)
        } else {
            (0.0, 0.0, 0.0)
        };

        Ok(ScaledParams {
            n,
            q_min,
            q_max,
            p_min,
            p_max,
            delta_e,
            r_bend,
            f0,
            isoscale,
            f_s,
            f_s_unscaled,
            alpha0,
            alpha1: cfg.alpha1,
            alpha2: cfg.alpha2,
            harmonic,
            bunch_length,
            bunch_charge,
            current_scaled,
            damping_time,
            dt,
            revolution_part,
            angle,
            fp_beta,
            f_max,
            shielding,
            bbt_threshold,
            csr_strength,
        })
    }

    /// RF kick position scale; falls back to 1/angle (see SimulationConfig).
    pub fn rf_q_scale(&self, cfg: &SimulationConfig) -> f64 {
        if cfg.rf_q_scale > 0.0 {
            cfg.rf_q_scale
        } else {
            1.0 / self.angle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn ring_config() -> SimulationConfig {
        SimulationConfig {
            grid_size: 256,
            phase_space_size: 10.0,
            ps_shift_x: 0.0,
            ps_shift_y: 0.0,
            bunch_current: 1e-3,
            beam_energy: 1.3e9,
            energy_spread: 4.7e-4,
            revolution_frequency: 2.7e6,
            synchrotron_frequency: 8.0e3,
            alpha0: 0.0,
            alpha1: 0.0,
            alpha2: 0.0,
            harmonic_number: 184.0,
            rf_voltage: 1.4e6,
            damping_time: 5e-3,
            bending_radius: 5.559,
            vacuum_chamber_gap: 32e-3,
            wall_conductivity: 0.0,
            wall_susceptibility: 0.0,
            collimator_radius: 0.0,
            cutoff_frequency: 5e12,
            rotation_type: 1,
            interpolation_points: 4,
            interpolation_clamped: true,
            steps: 1000,
            rotations: 1.0,
            outstep: 100,
            padding: 2,
            renormalize: 0,
            haissinski_iterations: 0,
            rf_q_scale: 0.0,
            start_dist_file: None,
            wake_file: None,
            impedance_file: None,
            output_file: None,
            tracking_file: None,
            gpu_device: 0,
        }
    }

    #[test]
    fn test_derive_basic_relations() {
        let cfg = ring_config();
        let sp = ScaledParams::derive(&cfg).unwrap();

        assert_eq!(sp.n, 256);
        assert!((sp.q_max - 5.0).abs() < 1e-12);
        assert!((sp.q_min + 5.0).abs() < 1e-12);
        assert!((sp.delta_e - 4.7e-4 * 1.3e9).abs() < 1e-3);
        assert!(sp.isoscale <= 1.0 + 1e-12);
        assert!((sp.angle - 2.0 * PI / 1000.0).abs() < 1e-15);
        assert!((sp.dt * sp.f_s * 1000.0 - 1.0).abs() < 1e-12);
        assert!(sp.bunch_length > 0.0);
        assert!(sp.fp_beta > 0.0);
    }

    #[test]
    fn test_fs_alpha0_roundtrip() {
        // alpha0 derived from f_s reproduces f_s when used as input
        let cfg = ring_config();
        let sp = ScaledParams::derive(&cfg).unwrap();

        let mut cfg2 = cfg.clone();
        cfg2.synchrotron_frequency = -1.0;
        cfg2.alpha0 = sp.alpha0;
        let sp2 = ScaledParams::derive(&cfg2).unwrap();

        let rel = (sp2.f_s_unscaled - sp.f_s_unscaled).abs() / sp.f_s_unscaled;
        assert!(rel < 1e-12, "f_s roundtrip error {rel}");
    }

    #[test]
    fn test_shielding_scaling() {
        // halving the gap raises the shielding parameter by 2^(3/2)
        let cfg = ring_config();
        let sp = ScaledParams::derive(&cfg).unwrap();

        let mut cfg2 = cfg.clone();
        cfg2.vacuum_chamber_gap = cfg.vacuum_chamber_gap / 2.0;
        let sp2 = ScaledParams::derive(&cfg2).unwrap();

        let ratio = sp2.shielding / sp.shielding;
        assert!((ratio - 2f64.powf(1.5)).abs() < 1e-9, "ratio = {ratio}");
        assert!(sp2.bbt_threshold > sp.bbt_threshold);
    }

    #[test]
    fn test_zero_grid_without_file_rejected() {
        let mut cfg = ring_config();
        cfg.grid_size = 0;
        assert!(matches!(
            ScaledParams::derive(&cfg),
            Err(VlasovError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_bad_interpolation_rejected() {
        let mut cfg = ring_config();
        cfg.interpolation_points = 5;
        assert!(ScaledParams::derive(&cfg).is_err());
    }

    #[test]
    fn test_roundtrip_serialization() {
        let cfg = ring_config();
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let cfg2: SimulationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.grid_size, cfg2.grid_size);
        assert_eq!(cfg.rotation_type, cfg2.rotation_type);
        assert!((cfg.rf_voltage - cfg2.rf_voltage).abs() < 1e-9);
    }
}
