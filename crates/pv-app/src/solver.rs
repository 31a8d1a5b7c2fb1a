//! Solver seam driven by the run loop.
//!
//! The harness validates a flow solver; it does not contain one. A solver
//! receives the problem's boundary conditions every step and hands back the
//! fields the error-control engine measures.

use pv_control::{
    BoundaryConditions, FieldKind, FlowProblem, InitialField, InitialRequest, VelocityCondition,
};
use pv_fields::{Discretization, ScalarField, VectorField};
use tracing::debug;

use crate::config::{SolverConfig, SolverKind};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq)]
pub struct SolverFields {
    pub velocity: VectorField,
    pub pressure: ScalarField,
}

/// Fields produced by one step. Projection schemes also report their
/// tentative (pre-correction) fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverStep {
    pub tentative: Option<SolverFields>,
    pub corrected: SolverFields,
}

pub trait FlowSolver {
    fn name(&self) -> &str;

    fn initialize(
        &mut self,
        problem: &dyn FlowProblem,
        disc: &dyn Discretization,
        dt: f64,
    ) -> AppResult<()>;

    fn step(
        &mut self,
        problem: &dyn FlowProblem,
        disc: &dyn Discretization,
        t: f64,
        bcs: &BoundaryConditions,
    ) -> AppResult<SolverStep>;
}

pub fn build_solver(config: &SolverConfig) -> Box<dyn FlowSolver> {
    match config.kind {
        SolverKind::AnalyticReplay => Box::new(AnalyticReplaySolver::new(
            config.perturbation,
            config.tentative_perturbation,
        )),
    }
}

fn scaled_pressure(pressure: &ScalarField, factor: f64) -> ScalarField {
    ScalarField::from_values(pressure.values().iter().map(|p| p * factor).collect())
}

/// Returns the analytic solution, with the inflow ramp applied, scaled by
/// `1 + perturbation`.
#[derive(Debug, Clone)]
pub struct AnalyticReplaySolver {
    perturbation: f64,
    tentative_perturbation: Option<f64>,
    initialized: bool,
}

impl AnalyticReplaySolver {
    pub fn new(perturbation: f64, tentative_perturbation: Option<f64>) -> Self {
        Self {
            perturbation,
            tentative_perturbation,
            initialized: false,
        }
    }

    fn fields(
        problem: &dyn FlowProblem,
        disc: &dyn Discretization,
        t: f64,
        bcs: &BoundaryConditions,
        perturbation: f64,
    ) -> SolverFields {
        let inflow = problem.boundary_ids().inflow;
        let prescribed = bcs.velocity.iter().find_map(|bc| match bc {
            VelocityCondition::Prescribed { id, field } if *id == inflow => Some(field),
            _ => None,
        });
        let factor = 1.0 + perturbation;
        let velocity = match prescribed {
            Some(field) => field.scaled(factor),
            None => problem.analytic_velocity(t).scaled(factor),
        };
        let pressure = scaled_pressure(&problem.analytic_pressure(disc, t), factor);
        SolverFields { velocity, pressure }
    }
}

impl FlowSolver for AnalyticReplaySolver {
    fn name(&self) -> &str {
        "analytic_replay"
    }

    fn initialize(
        &mut self,
        problem: &dyn FlowProblem,
        disc: &dyn Discretization,
        dt: f64,
    ) -> AppResult<()> {
        let requests = [
            InitialRequest {
                kind: FieldKind::Velocity,
                time: 0.0,
            },
            InitialRequest {
                kind: FieldKind::Velocity,
                time: -dt,
            },
            InitialRequest {
                kind: FieldKind::Pressure,
                time: 0.0,
            },
        ];
        let fields = problem.initial_conditions(disc, &requests);
        let n = disc.node_count();
        for field in &fields {
            let len = match field {
                InitialField::Velocity(v) => v.len(),
                InitialField::Pressure(p) => p.len(),
            };
            if len != n {
                return Err(AppError::Solver {
                    message: format!("initial field has {len} nodes, space has {n}"),
                });
            }
        }
        debug!(fields = fields.len(), "Initial conditions received");
        self.initialized = true;
        Ok(())
    }

    fn step(
        &mut self,
        problem: &dyn FlowProblem,
        disc: &dyn Discretization,
        t: f64,
        bcs: &BoundaryConditions,
    ) -> AppResult<SolverStep> {
        if !self.initialized {
            return Err(AppError::Solver {
                message: "step called before initialize".to_string(),
            });
        }
        let corrected = Self::fields(problem, disc, t, bcs, self.perturbation);
        let tentative = self
            .tentative_perturbation
            .map(|p| Self::fields(problem, disc, t, bcs, p));
        Ok(SolverStep {
            tentative,
            corrected,
        })
    }
}
