//! Bessel function of the first kind, order zero, for complex arguments.

use std::f64::consts::{FRAC_PI_4, PI};

use num_complex::Complex64;

const MAX_SERIES_TERMS: usize = 400;
const MAX_ASYMPTOTIC_TERMS: usize = 60;
/// Above this modulus the power series loses too many digits to cancellation.
const SERIES_LIMIT: f64 = 12.0;

pub fn j0(z: Complex64) -> Complex64 {
    if z.norm() <= SERIES_LIMIT {
        j0_series(z)
    } else {
        j0_asymptotic(z)
    }
}

/// `J0(z) = Σ (−z²/4)^k / (k!)²`
fn j0_series(z: Complex64) -> Complex64 {
    let q = -z * z / 4.0;
    let mut term = Complex64::new(1.0, 0.0);
    let mut sum = term;
    for k in 1..MAX_SERIES_TERMS {
        term *= q / (k * k) as f64;
        sum += term;
        if term.norm() <= f64::EPSILON * 1e-2 * sum.norm() {
            break;
        }
    }
    sum
}

/// Hankel expansion `sqrt(2/πz) (P cos(z − π/4) − Q sin(z − π/4))`, summed
/// until the terms stop shrinking.
fn j0_asymptotic(z: Complex64) -> Complex64 {
    let zinv = 1.0 / z;
    let mut term = Complex64::new(1.0, 0.0);
    let mut p = Complex64::new(0.0, 0.0);
    let mut q = Complex64::new(0.0, 0.0);
    let mut prev = f64::INFINITY;
    for k in 0..MAX_ASYMPTOTIC_TERMS {
        let mag = term.norm();
        if mag > prev {
            break;
        }
        let sign = if (k / 2) % 2 == 0 { 1.0 } else { -1.0 };
        if k % 2 == 0 {
            p += term * sign;
        } else {
            q += term * sign;
        }
        if mag <= f64::EPSILON * 1e-2 * p.norm() {
            break;
        }
        prev = mag;
        let n = (k + 1) as f64;
        term = term * (-(2.0 * n - 1.0).powi(2) / (8.0 * n)) * zinv;
    }
    let w = z - FRAC_PI_4;
    (2.0 / (PI * z)).sqrt() * (p * w.cos() - q * w.sin())
}

/// Modified Bessel function `I0(x) = J0(ix)`.
pub fn i0(x: f64) -> f64 {
    j0(Complex64::new(0.0, x)).re
}
