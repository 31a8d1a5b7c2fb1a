//! Analytic velocity and pressure for one run, built from loaded basis fields.

use std::f64::consts::PI;

use pv_fields::{Discretization, ScalarField, VectorField, functionals};
use tracing::info;

use crate::calibration::{FREQUENCIES, WomersleyCalibration};
use crate::store::BasisStore;
use crate::{AnalyticError, AnalyticResult};

/// One nodal field of the precomputed basis.
#[derive(Debug, Clone, PartialEq)]
pub struct BasisField {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HarmonicMode {
    pub frequency: i32,
    pub real: BasisField,
    pub imag: BasisField,
}

/// Pressure linear in the axial coordinate, `p(z) = gradient·(z − reference_z)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxialPressure {
    pub gradient: f64,
    pub reference_z: f64,
}

impl AxialPressure {
    pub fn at(&self, z: f64) -> f64 {
        self.gradient * (z - self.reference_z)
    }

    pub fn interpolate(&self, disc: &dyn Discretization) -> ScalarField {
        functionals::interpolate_scalar(disc, |p| self.at(p.z))
    }
}

#[derive(Debug, Clone)]
pub struct AnalyticProfile {
    parabolic: BasisField,
    modes: Vec<HarmonicMode>,
    scale_factor: f64,
    wall_mask: Vec<bool>,
    calibration: WomersleyCalibration,
}

impl AnalyticProfile {
    /// Takes the 17 basis fields out of `store`, checked against `disc`.
    ///
    /// Nodes whose radius is within `edge_min/10` of the pipe radius are
    /// masked to zero velocity.
    pub fn load(
        store: &BasisStore,
        disc: &dyn Discretization,
        scale_factor: f64,
    ) -> AnalyticResult<Self> {
        let nodes = disc.node_count();
        let take = |name: String| -> AnalyticResult<BasisField> {
            let values = store
                .field(&name)
                .ok_or_else(|| AnalyticError::MissingField { name: name.clone() })?;
            if values.len() != nodes {
                return Err(AnalyticError::ShapeMismatch {
                    name,
                    expected: nodes,
                    found: values.len(),
                });
            }
            Ok(BasisField {
                name,
                values: values.to_vec(),
            })
        };

        let parabolic = take("parab".to_string())?;
        let modes = FREQUENCIES
            .iter()
            .enumerate()
            .map(|(i, &frequency)| -> AnalyticResult<HarmonicMode> {
                Ok(HarmonicMode {
                    frequency,
                    real: take(format!("real{i}"))?,
                    imag: take(format!("imag{i}"))?,
                })
            })
            .collect::<AnalyticResult<Vec<_>>>()?;

        let calibration = WomersleyCalibration::tabulated();
        let tol = disc.min_edge_length() / 10.0;
        let wall_mask: Vec<bool> = (0..nodes)
            .map(|n| {
                let p = disc.node_position(n);
                (p.x.hypot(p.y) - calibration.radius).abs() < tol
            })
            .collect();

        info!(
            mesh = %store.mesh,
            nodes,
            wall_nodes = wall_mask.iter().filter(|w| **w).count(),
            scale_factor,
            "Loaded Womersley basis fields"
        );
        Ok(Self {
            parabolic,
            modes,
            scale_factor,
            wall_mask,
            calibration,
        })
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn modes(&self) -> &[HarmonicMode] {
        &self.modes
    }

    pub fn calibration(&self) -> &WomersleyCalibration {
        &self.calibration
    }

    pub fn is_wall_node(&self, node: usize) -> bool {
        self.wall_mask.get(node).copied().unwrap_or(false)
    }

    fn masked(&self, axial: Vec<f64>) -> VectorField {
        let axial: Vec<f64> = axial
            .into_iter()
            .zip(&self.wall_mask)
            .map(|(w, &wall)| if wall { 0.0 } else { w })
            .collect();
        VectorField::from_axial(&axial)
    }

    pub fn evaluate_velocity(&self, t: f64) -> VectorField {
        let mut axial = self.parabolic.values.clone();
        for mode in &self.modes {
            let phase = f64::from(mode.frequency) * PI * t;
            let (s, c) = phase.sin_cos();
            for ((w, re), im) in axial
                .iter_mut()
                .zip(&mode.real.values)
                .zip(&mode.imag.values)
            {
                *w += c * re - s * im;
            }
        }
        axial.iter_mut().for_each(|w| *w *= self.scale_factor);
        self.masked(axial)
    }

    /// Axial pressure gradient `dp/dz` at time `t`.
    pub fn evaluate_pressure_gradient(&self, t: f64) -> f64 {
        -self.scale_factor * self.calibration.driving_gradient(t)
    }

    /// Zero-mean pressure over the pipe at time `t`.
    pub fn evaluate_pressure(&self, t: f64) -> AxialPressure {
        AxialPressure {
            gradient: self.evaluate_pressure_gradient(t),
            reference_z: self.calibration.length / 2.0,
        }
    }

    /// Steady part of the velocity (the harmonic modes average to zero).
    pub fn average_velocity(&self) -> VectorField {
        let axial = self
            .parabolic
            .values
            .iter()
            .map(|w| w * self.scale_factor)
            .collect();
        self.masked(axial)
    }

    pub fn average_pressure(&self) -> AxialPressure {
        AxialPressure {
            gradient: -self.average_pressure_gradient(),
            reference_z: self.calibration.length / 2.0,
        }
    }

    /// Magnitude of the time-averaged pressure gradient.
    pub fn average_pressure_gradient(&self) -> f64 {
        self.scale_factor * self.calibration.mean_pressure_gradient()
    }

    pub fn reynolds_number(&self) -> f64 {
        self.calibration.reynolds_number(self.scale_factor)
    }
}
