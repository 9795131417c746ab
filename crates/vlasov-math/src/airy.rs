// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov Core — Airy
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Airy functions Ai, Bi and their derivatives for non-negative argument.
//!
//! Maclaurin series (A&S 10.4.2–10.4.5) below the crossover, asymptotic
//! expansions (A&S 10.4.59ff) above it. The shielded-CSR image-mode sum
//! only ever needs x >= 0, so the oscillatory branch is not implemented.
//!
//! Bi and Bi' grow like exp(2/3 x^(3/2)) and overflow near x ≈ 104; the
//! product accessors in [`airy_products`] cancel the exponentials
//! analytically and stay finite for any x.

/// Ai(0) = 3^(-2/3) / Γ(2/3)
const AI_ZERO: f64 = 0.355_028_053_887_817_24;
/// -Ai'(0) = 3^(-1/3) / Γ(1/3)
const AIP_ZERO_NEG: f64 = 0.258_819_403_792_806_8;
/// Switch between Maclaurin series and asymptotic expansion.
const SERIES_CUTOFF: f64 = 8.0;
const SQRT_3: f64 = 1.732_050_807_568_877_2;
const SQRT_PI: f64 = 1.772_453_850_905_516;

/// The four auxiliary Maclaurin sums (f, g, f', g').
fn maclaurin_sums(x: f64) -> (f64, f64, f64, f64) {
    let x3 = x * x * x;

    let mut f: f64 = 1.0;
    let mut term: f64 = 1.0;
    let mut k = 0usize;
    while term.abs() > 1e-18 * f.abs() && k < 80 {
        term *= x3 / (((3 * k + 2) * (3 * k + 3)) as f64);
        f += term;
        k += 1;
    }

    let mut g = x;
    term = x;
    k = 0;
    while term.abs() > 1e-18 * g.abs().max(1e-300) && k < 80 {
        term *= x3 / (((3 * k + 3) * (3 * k + 4)) as f64);
        g += term;
        k += 1;
    }

    let mut fp = 0.5 * x * x;
    term = fp;
    k = 1;
    while term.abs() > 1e-18 * fp.abs().max(1e-300) && k < 80 {
        term *= x3 / ((3 * k * (3 * k + 2)) as f64);
        fp += term;
        k += 1;
    }

    let mut gp: f64 = 1.0;
    term = 1.0;
    k = 0;
    while term.abs() > 1e-18 * gp.abs() && k < 80 {
        term *= x3 / (((3 * k + 1) * (3 * k + 3)) as f64);
        gp += term;
        k += 1;
    }

    (f, g, fp, gp)
}

/// Asymptotic sums Σ(±1)^k u_k ζ^-k and Σ(±1)^k v_k ζ^-k.
///
/// Returns (s, big_s, t, big_t): alternating/plain u-series, then
/// alternating/plain v-series. The series are divergent; summation stops
/// at the smallest term.
fn asymptotic_sums(zeta: f64) -> (f64, f64, f64, f64) {
    let mut s = 1.0;
    let mut big_s = 1.0;
    let mut t = 1.0;
    let mut big_t = 1.0;

    let mut u = 1.0;
    let mut prev = f64::INFINITY;
    for k in 1..=16 {
        let kf = k as f64;
        u *= (6.0 * kf - 5.0) * (6.0 * kf - 3.0) * (6.0 * kf - 1.0)
            / (216.0 * kf * (2.0 * kf - 1.0));
        let v = u * (6.0 * kf + 1.0) / (1.0 - 6.0 * kf);
        let term_u = u / zeta.powi(k as i32);
        if term_u.abs() > prev {
            break;
        }
        prev = term_u.abs();
        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
        s += sign * term_u;
        big_s += term_u;
        let term_v = v / zeta.powi(k as i32);
        t += sign * term_v;
        big_t += term_v;
    }
    (s, big_s, t, big_t)
}

/// Airy function Ai(x), x >= 0.
pub fn airy_ai(x: f64) -> f64 {
    debug_assert!(x >= 0.0, "airy_ai requires x >= 0, got {x}");
    if x < SERIES_CUTOFF {
        let (f, g, _, _) = maclaurin_sums(x);
        AI_ZERO * f - AIP_ZERO_NEG * g
    } else {
        let zeta = 2.0 / 3.0 * x.powf(1.5);
        let (s, _, _, _) = asymptotic_sums(zeta);
        (-zeta).exp() * s / (2.0 * SQRT_PI * x.powf(0.25))
    }
}

/// Airy function Bi(x), x >= 0. Overflows to +inf near x ≈ 104.
pub fn airy_bi(x: f64) -> f64 {
    debug_assert!(x >= 0.0, "airy_bi requires x >= 0, got {x}");
    if x < SERIES_CUTOFF {
        let (f, g, _, _) = maclaurin_sums(x);
        SQRT_3 * (AI_ZERO * f + AIP_ZERO_NEG * g)
    } else {
        let zeta = 2.0 / 3.0 * x.powf(1.5);
        let (_, big_s, _, _) = asymptotic_sums(zeta);
        zeta.exp() * big_s / (SQRT_PI * x.powf(0.25))
    }
}

/// Derivative Ai'(x), x >= 0.
pub fn airy_aip(x: f64) -> f64 {
    debug_assert!(x >= 0.0, "airy_aip requires x >= 0, got {x}");
    if x < SERIES_CUTOFF {
        let (_, _, fp, gp) = maclaurin_sums(x);
        AI_ZERO * fp - AIP_ZERO_NEG * gp
    } else {
        let zeta = 2.0 / 3.0 * x.powf(1.5);
        let (_, _, t, _) = asymptotic_sums(zeta);
        -x.powf(0.25) * (-zeta).exp() * t / (2.0 * SQRT_PI)
    }
}

/// Derivative Bi'(x), x >= 0. Overflows to +inf near x ≈ 104.
pub fn airy_bip(x: f64) -> f64 {
    debug_assert!(x >= 0.0, "airy_bip requires x >= 0, got {x}");
    if x < SERIES_CUTOFF {
        let (_, _, fp, gp) = maclaurin_sums(x);
        SQRT_3 * (AI_ZERO * fp + AIP_ZERO_NEG * gp)
    } else {
        let zeta = 2.0 / 3.0 * x.powf(1.5);
        let (_, _, _, big_t) = asymptotic_sums(zeta);
        x.powf(0.25) * zeta.exp() * big_t / SQRT_PI
    }
}

/// Overflow-free Airy products, as consumed by the shielded-CSR sum.
#[derive(Debug, Clone, Copy)]
pub struct AiryProducts {
    /// Ai(x)²
    pub ai2: f64,
    /// Ai'(x)²
    pub aip2: f64,
    /// Ai(x)·Bi(x)
    pub aibi: f64,
    /// Ai'(x)·Bi'(x)
    pub aipbip: f64,
}

/// Products of Airy functions with the exponentials cancelled analytically,
/// finite for every x >= 0.
pub fn airy_products(x: f64) -> AiryProducts {
    debug_assert!(x >= 0.0, "airy_products requires x >= 0, got {x}");
    if x < SERIES_CUTOFF {
        let ai = airy_ai(x);
        let bi = airy_bi(x);
        let aip = airy_aip(x);
        let bip = airy_bip(x);
        AiryProducts {
            ai2: ai * ai,
            aip2: aip * aip,
            aibi: ai * bi,
            aipbip: aip * bip,
        }
    } else {
        let zeta = 2.0 / 3.0 * x.powf(1.5);
        let (s, big_s, t, big_t) = asymptotic_sums(zeta);
        let sqrt_x = x.sqrt();
        let e2 = (-2.0 * zeta).exp();
        AiryProducts {
            ai2: e2 * s * s / (4.0 * std::f64::consts::PI * sqrt_x),
            aip2: sqrt_x * e2 * t * t / (4.0 * std::f64::consts::PI),
            aibi: s * big_s / (2.0 * std::f64::consts::PI * sqrt_x),
            aipbip: -sqrt_x * t * big_t / (2.0 * std::f64::consts::PI),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_values_at_zero() {
        assert!((airy_ai(0.0) - 0.3550280538878172).abs() < 1e-14);
        assert!((airy_aip(0.0) + 0.2588194037928068).abs() < 1e-14);
        assert!((airy_bi(0.0) - 0.6149266274460007).abs() < 1e-14);
        assert!((airy_bip(0.0) - 0.4482883573538264).abs() < 1e-13);
    }

    // Reference values from scipy.special.airy
    #[test]
    fn test_reference_values_at_one() {
        assert!((airy_ai(1.0) - 0.1352924163128814).abs() < 1e-12);
        assert!((airy_aip(1.0) + 0.1591474412967932).abs() < 1e-12);
        assert!((airy_bi(1.0) - 1.2074235949528713).abs() < 1e-11);
    }

    #[test]
    fn test_reference_value_ai_5() {
        let got = airy_ai(5.0);
        let expected = 1.0834442813607441e-4;
        assert!(
            (got - expected).abs() / expected < 1e-8,
            "Ai(5) = {got}, expected {expected}"
        );
    }

    #[test]
    fn test_wronskian() {
        // Ai(x) Bi'(x) - Ai'(x) Bi(x) = 1/pi for all x
        for &x in &[0.0, 0.3, 1.0, 2.5, 4.0, 7.0, 9.0, 12.0, 20.0] {
            let w = airy_ai(x) * airy_bip(x) - airy_aip(x) * airy_bi(x);
            let rel = (w - 1.0 / PI).abs() * PI;
            assert!(rel < 1e-9, "Wronskian at x={x}: {w}, rel err {rel}");
        }
    }

    #[test]
    fn test_products_match_plain_functions() {
        // both sides of the series/asymptotic crossover
        for &x in &[0.5, 3.0, 7.9, 8.1, 10.0, 15.0] {
            let p = airy_products(x);
            let ai = airy_ai(x);
            let aip = airy_aip(x);
            let bi = airy_bi(x);
            let bip = airy_bip(x);
            assert!((p.ai2 - ai * ai).abs() <= 1e-9 * ai.abs().max(1e-30), "ai2 at {x}");
            assert!(
                (p.aibi - ai * bi).abs() <= 1e-8 * (ai * bi).abs().max(1e-30),
                "aibi at {x}: {} vs {}",
                p.aibi,
                ai * bi
            );
            assert!(
                (p.aipbip - aip * bip).abs() <= 1e-8 * (aip * bip).abs().max(1e-30),
                "aipbip at {x}"
            );
        }
    }

    #[test]
    fn test_products_finite_beyond_overflow() {
        // Bi(200) overflows f64; the products must not
        let p = airy_products(200.0);
        assert!(p.aibi.is_finite());
        assert!(p.aipbip.is_finite());
        assert!(p.ai2 >= 0.0);
        // asymptotic limits: Ai·Bi -> 1/(2 pi sqrt(x)), Ai'·Bi' -> -sqrt(x)/(2 pi)
        let expect_aibi = 1.0 / (2.0 * PI * 200.0f64.sqrt());
        assert!((p.aibi - expect_aibi).abs() / expect_aibi < 1e-2);
    }

    #[test]
    fn test_ai_monotone_decay() {
        let mut prev = airy_ai(0.0);
        for i in 1..40 {
            let x = i as f64 * 0.5;
            let v = airy_ai(x);
            assert!(v < prev, "Ai must decay: Ai({x}) = {v} >= {prev}");
            assert!(v > 0.0);
            prev = v;
        }
    }
}
