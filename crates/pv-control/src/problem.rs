//! Flow scenarios the engine can validate against.

use pv_analytic::AnalyticProfile;
use pv_core::SubdomainId;
use pv_fields::{Discretization, FieldResult, ScalarField, VectorField, functionals};
use tracing::info;

use crate::config::{ControlConfig, InitialCondition};

/// Boundary markers of a pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryIds {
    pub wall: SubdomainId,
    pub inflow: SubdomainId,
    pub outflow: SubdomainId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VelocityCondition {
    NoSlip { id: SubdomainId },
    Prescribed { id: SubdomainId, field: VectorField },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureCondition {
    pub id: SubdomainId,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundaryConditions {
    pub velocity: Vec<VelocityCondition>,
    pub pressure: Vec<PressureCondition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Velocity,
    Pressure,
}

/// Initial field wanted by the solver at a (possibly negative) time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialRequest {
    pub kind: FieldKind,
    pub time: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InitialField {
    Velocity(VectorField),
    Pressure(ScalarField),
}

/// Time-independent reference magnitudes for normalized report rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub velocity: f64,
    pub pressure: f64,
    pub pressure_gradient: f64,
}

pub trait FlowProblem {
    /// Short code used in the results directory name.
    fn code(&self) -> &str;

    fn name(&self) -> &str;

    /// Label of the metric reported in the live status file.
    fn status_label(&self) -> &str;

    fn has_analytic_solution(&self) -> bool;

    /// Kinematic viscosity used in the stress tensor.
    fn viscosity(&self) -> f64;

    fn boundary_ids(&self) -> BoundaryIds;

    /// Distance between inflow and outflow planes.
    fn axial_length(&self) -> f64;

    fn outflow_measures(&self) -> Vec<SubdomainId> {
        vec![self.boundary_ids().outflow]
    }

    fn analytic_velocity(&self, t: f64) -> VectorField;

    fn analytic_pressure(&self, disc: &dyn Discretization, t: f64) -> ScalarField;

    fn analytic_pressure_gradient(&self, t: f64) -> f64;

    fn normalization(&self, disc: &dyn Discretization) -> FieldResult<Normalization>;

    /// Conditions at time `t`; the inflow profile is multiplied by `onset_factor`.
    fn boundary_conditions(
        &self,
        t: f64,
        onset_factor: f64,
        use_pressure_bc: bool,
    ) -> BoundaryConditions;

    fn initial_conditions(
        &self,
        disc: &dyn Discretization,
        requests: &[InitialRequest],
    ) -> Vec<InitialField>;
}

/// Womersley flow in the reference cylinder: wall 1, inflow 2, outflow 3.
#[derive(Debug, Clone)]
pub struct WomersleyCylinder {
    profile: AnalyticProfile,
    viscosity: f64,
    initial_condition: InitialCondition,
}

impl WomersleyCylinder {
    pub const CODE: &'static str = "WCYL";
    pub const NAME: &'static str = "womersley_cylinder";

    pub fn new(profile: AnalyticProfile, config: &ControlConfig) -> Self {
        let viscosity = profile.calibration().viscosity * config.nu_factor;
        info!(
            factor = profile.scale_factor(),
            reynolds = profile.reynolds_number(),
            viscosity,
            initial_condition = ?config.initial_condition,
            "Womersley cylinder problem"
        );
        Self {
            profile,
            viscosity,
            initial_condition: config.initial_condition,
        }
    }

    pub fn profile(&self) -> &AnalyticProfile {
        &self.profile
    }

    fn ids() -> BoundaryIds {
        BoundaryIds {
            wall: SubdomainId::WALL,
            inflow: SubdomainId::INFLOW,
            outflow: SubdomainId::OUTFLOW,
        }
    }
}

impl FlowProblem for WomersleyCylinder {
    fn code(&self) -> &str {
        Self::CODE
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn status_label(&self) -> &str {
        "last H1 velocity error"
    }

    fn has_analytic_solution(&self) -> bool {
        true
    }

    fn viscosity(&self) -> f64 {
        self.viscosity
    }

    fn boundary_ids(&self) -> BoundaryIds {
        Self::ids()
    }

    fn axial_length(&self) -> f64 {
        self.profile.calibration().length
    }

    fn analytic_velocity(&self, t: f64) -> VectorField {
        self.profile.evaluate_velocity(t)
    }

    fn analytic_pressure(&self, disc: &dyn Discretization, t: f64) -> ScalarField {
        self.profile.evaluate_pressure(t).interpolate(disc)
    }

    fn analytic_pressure_gradient(&self, t: f64) -> f64 {
        self.profile.evaluate_pressure_gradient(t)
    }

    fn normalization(&self, disc: &dyn Discretization) -> FieldResult<Normalization> {
        let pressure = self.profile.average_pressure().interpolate(disc);
        Ok(Normalization {
            velocity: functionals::l2_norm(disc, &self.profile.average_velocity())?,
            pressure: functionals::scalar_l2_norm(disc, &pressure)?,
            pressure_gradient: self.profile.average_pressure_gradient(),
        })
    }

    fn boundary_conditions(
        &self,
        t: f64,
        onset_factor: f64,
        use_pressure_bc: bool,
    ) -> BoundaryConditions {
        let ids = Self::ids();
        let inflow = self.profile.evaluate_velocity(t).scaled(onset_factor);
        let mut pressure = Vec::new();
        if use_pressure_bc {
            pressure.push(PressureCondition {
                id: ids.outflow,
                value: 0.0,
            });
        }
        BoundaryConditions {
            velocity: vec![
                VelocityCondition::Prescribed {
                    id: ids.inflow,
                    field: inflow,
                },
                VelocityCondition::NoSlip { id: ids.wall },
            ],
            pressure,
        }
    }

    fn initial_conditions(
        &self,
        disc: &dyn Discretization,
        requests: &[InitialRequest],
    ) -> Vec<InitialField> {
        let n = disc.node_count();
        requests
            .iter()
            .map(|r| match (r.kind, self.initial_condition) {
                (FieldKind::Velocity, InitialCondition::Zero) => {
                    InitialField::Velocity(VectorField::zeros(n))
                }
                (FieldKind::Velocity, InitialCondition::Analytic) => {
                    InitialField::Velocity(self.analytic_velocity(r.time))
                }
                (FieldKind::Pressure, InitialCondition::Zero) => {
                    InitialField::Pressure(ScalarField::zeros(n))
                }
                (FieldKind::Pressure, InitialCondition::Analytic) => {
                    InitialField::Pressure(self.analytic_pressure(disc, r.time))
                }
            })
            .collect()
    }
}
