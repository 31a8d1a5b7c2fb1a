//! Womersley solution for the reference cylinder (R = 5, L = 20).
//!
//! Axial velocity:
//!
//! ```text
//! u(r, t) = P (R² − r²) + Σ_k Re( c_k (a_k J0(λ_k r) + 1) e^{i ω_k t} ),   ω_k = f_k π
//! ```
//!
//! driven by the axial pressure gradient `dp/dz = −G(t)` with
//! `G(t) = 4νP + Σ_k Re(i ω_k c_k e^{i ω_k t})`. The tabulated constants are
//! calibration data for ν = 3.71; `for_viscosity` recomputes the viscosity
//! dependent parts (`P`, `λ_k`, `a_k`) while keeping the driving gradient.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use num_complex::Complex64;

use crate::bessel::j0;
use crate::{AnalyticError, AnalyticResult};

pub const RADIUS: f64 = 5.0;
pub const PIPE_LENGTH: f64 = 20.0;
pub const KINEMATIC_VISCOSITY: f64 = 3.71;
pub const PARABOLIC_COEF: f64 = 43.2592;
/// Reynolds number of the tabulated flow at unit velocity factor.
pub const REYNOLDS_AT_UNIT_FACTOR: f64 = 728.761;

/// Frequency indices of the harmonic modes, in basis-field order.
pub const FREQUENCIES: [i32; 8] = [-8, -6, -4, -2, 2, 4, 6, 8];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WomersleyMode {
    pub frequency: i32,
    pub coefficient: Complex64,
    pub wall_coef: Complex64,
    pub lambda: Complex64,
}

impl WomersleyMode {
    pub fn omega(&self) -> f64 {
        f64::from(self.frequency) * PI
    }

    /// Complex radial amplitude `c (a J0(λr) + 1)`.
    pub fn radial_profile(&self, r: f64) -> Complex64 {
        self.coefficient * (self.wall_coef * j0(self.lambda * r) + 1.0)
    }

    /// Complex amplitude of this mode's contribution to `G(t)`.
    pub fn gradient_amplitude(&self) -> Complex64 {
        Complex64::new(0.0, self.omega()) * self.coefficient
    }
}

const fn mode(frequency: i32, c: (f64, f64), a: (f64, f64), lambda: (f64, f64)) -> WomersleyMode {
    WomersleyMode {
        frequency,
        coefficient: Complex64::new(c.0, c.1),
        wall_coef: Complex64::new(a.0, a.1),
        lambda: Complex64::new(lambda.0, lambda.1),
    }
}

const TABULATED_MODES: [WomersleyMode; 8] = [
    mode(-8, (-11.799, 0.60076), (0.000735686, -0.000528035), (1.84042, 1.84042)),
    mode(-6, (-26.3758, 4.65265), (-0.000814244, -0.00277126), (1.59385, 1.59385)),
    mode(-4, (-51.6771, 27.3133), (-0.0110653, 0.00200668), (1.30138, 1.30138)),
    mode(-2, (-33.1594, 95.2423), (0.0314408, 0.0549981), (0.920212, 0.920212)),
    mode(2, (-33.1594, -95.2423), (0.0314408, -0.0549981), (0.920212, -0.920212)),
    mode(4, (-51.6771, -27.3133), (-0.0110653, -0.00200668), (1.30138, -1.30138)),
    mode(6, (-26.3758, -4.65265), (-0.000814244, 0.00277126), (1.59385, -1.59385)),
    mode(8, (-11.799, -0.60076), (0.000735686, 0.000528035), (1.84042, -1.84042)),
];

#[derive(Debug, Clone, PartialEq)]
pub struct WomersleyCalibration {
    pub radius: f64,
    pub length: f64,
    pub viscosity: f64,
    pub parabolic_coef: f64,
    modes: [WomersleyMode; 8],
}

impl WomersleyCalibration {
    pub fn tabulated() -> Self {
        Self {
            radius: RADIUS,
            length: PIPE_LENGTH,
            viscosity: KINEMATIC_VISCOSITY,
            parabolic_coef: PARABOLIC_COEF,
            modes: TABULATED_MODES,
        }
    }

    /// Same driving pressure gradient, different kinematic viscosity.
    pub fn for_viscosity(viscosity: f64) -> AnalyticResult<Self> {
        if !viscosity.is_finite() || viscosity <= 0.0 {
            return Err(AnalyticError::Load {
                what: format!("kinematic viscosity must be positive, got {viscosity}"),
            });
        }
        let base = Self::tabulated();
        let g0 = base.mean_pressure_gradient();
        let modes = base.modes.map(|m| {
            let k = (m.omega().abs() / viscosity).sqrt() * FRAC_1_SQRT_2;
            let lambda = Complex64::new(k, -k * f64::from(m.frequency.signum()));
            WomersleyMode {
                lambda,
                wall_coef: -1.0 / j0(lambda * base.radius),
                ..m
            }
        });
        Ok(Self {
            viscosity,
            parabolic_coef: g0 / (4.0 * viscosity),
            modes,
            ..base
        })
    }

    pub fn modes(&self) -> &[WomersleyMode; 8] {
        &self.modes
    }

    /// Steady (Poiseuille) part of the axial velocity.
    pub fn parabolic(&self, r: f64) -> f64 {
        self.parabolic_coef * (self.radius * self.radius - r * r)
    }

    pub fn axial_velocity(&self, r: f64, t: f64) -> f64 {
        self.parabolic(r)
            + self
                .modes
                .iter()
                .map(|m| (m.radial_profile(r) * Complex64::new(0.0, m.omega() * t).exp()).re)
                .sum::<f64>()
    }

    /// `G0`, the time average of `G(t)`.
    pub fn mean_pressure_gradient(&self) -> f64 {
        4.0 * self.viscosity * self.parabolic_coef
    }

    /// `G(t)`; the axial pressure gradient is `−G(t)`.
    pub fn driving_gradient(&self, t: f64) -> f64 {
        self.mean_pressure_gradient()
            + self
                .modes
                .iter()
                .map(|m| (m.gradient_amplitude() * Complex64::new(0.0, m.omega() * t).exp()).re)
                .sum::<f64>()
    }

    pub fn reynolds_number(&self, factor: f64) -> f64 {
        REYNOLDS_AT_UNIT_FACTOR * factor
    }
}
