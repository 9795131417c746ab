//! Lagrange interpolation coefficients for stencil construction.
//!
//! Order is selected by the number of interpolation points per axis:
//! 1 = nearest neighbour, 2 = linear, 3 = quadratic, 4 = cubic.
//! Weights of each kernel sum to 1 identically, which is what makes the
//! precomputed transport stencils mass-conserving.

/// Maximum interpolation points per axis.
pub const MAX_POINTS: usize = 4;

/// Interpolation kernel for one continuous source coordinate.
///
/// `first` is the index of the first contributing sample; entries
/// `first..first + points` carry the weights. `first` may be negative or
/// reach past the grid: callers decide how to treat out-of-range samples.
#[derive(Debug, Clone, Copy)]
pub struct InterpKernel {
    pub first: isize,
    pub weights: [f64; MAX_POINTS],
    pub points: usize,
}

/// Lagrange kernel of `points` samples around the continuous coordinate
/// `x` (in index units).
pub fn lagrange_kernel(points: usize, x: f64) -> InterpKernel {
    debug_assert!(
        (1..=MAX_POINTS).contains(&points),
        "interpolation points must be 1..=4, got {points}"
    );
    let mut w = [0.0; MAX_POINTS];
    let first;
    match points {
        1 => {
            first = x.round() as isize;
            w[0] = 1.0;
        }
        2 => {
            let base = x.floor();
            let f = x - base;
            first = base as isize;
            w[0] = 1.0 - f;
            w[1] = f;
        }
        3 => {
            // centered on the nearest sample, f in [-1/2, 1/2]
            let base = x.round();
            let f = x - base;
            first = base as isize - 1;
            w[0] = 0.5 * f * (f - 1.0);
            w[1] = 1.0 - f * f;
            w[2] = 0.5 * f * (f + 1.0);
        }
        _ => {
            // nodes at -1, 0, 1, 2 relative to floor(x), f in [0, 1)
            let base = x.floor();
            let f = x - base;
            first = base as isize - 1;
            w[0] = -f * (f - 1.0) * (f - 2.0) / 6.0;
            w[1] = (f + 1.0) * (f - 1.0) * (f - 2.0) / 2.0;
            w[2] = -(f + 1.0) * f * (f - 2.0) / 2.0;
            w[3] = (f + 1.0) * f * (f - 1.0) / 6.0;
        }
    }
    InterpKernel {
        first,
        weights: w,
        points,
    }
}

/// Interpolate a 1-D sample array at continuous coordinate `x`.
///
/// Out-of-range contributions are treated as zero. With `clamped` the
/// result is clipped to the range of the in-bounds contributing samples.
pub fn interp1d(samples: &[f64], x: f64, points: usize, clamped: bool) -> f64 {
    let kernel = lagrange_kernel(points, x);
    let n = samples.len() as isize;
    let mut acc = 0.0;
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for (k, &w) in kernel.weights[..kernel.points].iter().enumerate() {
        let idx = kernel.first + k as isize;
        if idx >= 0 && idx < n {
            let s = samples[idx as usize];
            acc += w * s;
            lo = lo.min(s);
            hi = hi.max(s);
        }
    }
    if clamped && lo <= hi {
        acc.clamp(lo, hi)
    } else {
        acc
    }
}
