use crate::CoreError;

/// Floating point type used throughout the harness
pub type Real = f64;

/// Pulsatile cycles start being aggregated only after this time (seconds).
/// Womersley flow started from rest is not periodic during the first half cycle.
pub const FIRST_CYCLE_EXCLUSION: Real = 0.5;

#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Root mean square of a window; an empty window aggregates to zero.
pub fn rms(values: &[Real]) -> Real {
    if values.is_empty() {
        return 0.0;
    }
    let sum_sq: Real = values.iter().map(|v| v * v).sum();
    (sum_sq / values.len() as Real).sqrt()
}

/// Number of steps in one simulated second, `round(1/dt)`.
pub fn steps_per_cycle(dt: Real) -> Result<usize, CoreError> {
    if !dt.is_finite() || dt <= 0.0 || dt > 1.0 {
        return Err(CoreError::InvalidTimestep { dt });
    }
    Ok((1.0 / dt).round() as usize)
}

/// Returns the completed cycle index when `t` lies within half a step of a
/// whole second past the excluded start-up half cycle.
pub fn whole_second(t: Real, dt: Real) -> Option<u32> {
    if t <= FIRST_CYCLE_EXCLUSION {
        return None;
    }
    let second = t.round();
    if (t - second).abs() < 0.5 * dt {
        Some(second as u32)
    } else {
        None
    }
}

/// `value / reference`, with `0/0 = 0` so an exact solution reports zero error.
pub fn ratio(value: Real, reference: Real) -> Real {
    if reference == 0.0 {
        if value == 0.0 { 0.0 } else { Real::INFINITY }
    } else {
        value / reference
    }
}
