//! Step state machine: analytic evaluation, functionals, cycle closure and
//! the divergence stop.
//!
//! A step is driven as
//! `advance(t, step)` → `compute_*` (tentative and/or corrected) → `finish_step()`.
//! Cycle aggregates are taken in `finish_step`, after every functional of
//! the closing step has been appended.

use std::f64::consts::PI;

use pv_core::{SubdomainId, TimeControl, ratio};
use pv_fields::{Discretization, FieldResult, ScalarField, VectorField, functionals};
use pv_series::{CycleBoundary, CycleClock, SeriesHandle, SeriesRegistry};
use tracing::{debug, info, warn};

use crate::config::{ControlConfig, ErrorControlMode};
use crate::force::{WallFields, compare_wall_traction};
use crate::keys::{AnalyticSeries, SeriesCatalog};
use crate::problem::{FlowProblem, Normalization};
use crate::{ControlError, ControlResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Stepping,
    ErrorExceeded,
    Completed,
}

/// Cosine ramp applied to the inflow condition during the first `onset`
/// seconds; `1` once the ramp is over or when it is disabled.
pub fn onset_factor(onset: f64, t: f64) -> f64 {
    if onset < 0.001 || t > onset {
        1.0
    } else {
        0.5 * (1.0 - (PI * t / onset).cos())
    }
}

const WATCHES: [(&str, &str); 10] = [
    ("assembleSol", "Assemble analytic velocity"),
    ("analyticP", "Analytic pressure"),
    ("analyticVnorms", "Analytic velocity norms"),
    ("errorP", "Pressure error"),
    ("errorV", "Velocity error"),
    ("errorForce", "Wall force error"),
    ("errorVtest", "Velocity error (test norms)"),
    ("computePG", "Pressure gradient estimate"),
    ("averageP", "Pressure averaging"),
    ("divNorm", "Divergence norm"),
];

struct AnalyticState {
    velocity: VectorField,
    pressure: ScalarField,
    pressure_gradient: f64,
    h1_norm: f64,
}

struct StepContext {
    t: f64,
    step: u64,
    boundary: Option<CycleBoundary>,
    analytic: Option<AnalyticState>,
}

pub struct ErrorControlEngine<'a> {
    problem: &'a dyn FlowProblem,
    disc: &'a dyn Discretization,
    config: ControlConfig,
    clock: CycleClock,
    registry: SeriesRegistry,
    catalog: SeriesCatalog,
    timing: TimeControl,
    state: EngineState,
    volume: f64,
    inflow_area: f64,
    outflow_area: f64,
    normalization: Option<Normalization>,
    times: Vec<f64>,
    current: Option<StepContext>,
    last_relative_h1: Option<f64>,
    onset_factor: f64,
    save_this_step: bool,
}

impl<'a> ErrorControlEngine<'a> {
    pub fn new(
        problem: &'a dyn FlowProblem,
        disc: &'a dyn Discretization,
        config: ControlConfig,
        dt: f64,
    ) -> ControlResult<Self> {
        config.validate()?;
        let clock = CycleClock::new(dt)?;
        let mut registry = SeriesRegistry::new(clock.steps_per_cycle());
        let catalog = SeriesCatalog::register(&mut registry, problem.has_analytic_solution())?;

        let ids = problem.boundary_ids();
        let volume = functionals::domain_volume(disc)?;
        let inflow_area = functionals::boundary_measure(disc, ids.inflow)?;
        let mut outflow_area = 0.0;
        for id in problem.outflow_measures() {
            outflow_area += functionals::boundary_measure(disc, id)?;
        }

        registry.push_calibration(catalog.calibrations.scale, config.factor)?;
        let normalization = if problem.has_analytic_solution() {
            let n = problem.normalization(disc)?;
            registry.push_calibration(catalog.calibrations.velocity, n.velocity)?;
            registry.push_calibration(catalog.calibrations.pressure, n.pressure)?;
            registry.push_calibration(catalog.calibrations.pressure_gradient, n.pressure_gradient)?;
            Some(n)
        } else {
            None
        };

        let mut timing = TimeControl::new();
        for (key, label) in WATCHES {
            timing.init_watch(key, label, true);
        }

        info!(
            problem = problem.name(),
            volume,
            inflow_area,
            outflow_area,
            steps_per_cycle = clock.steps_per_cycle(),
            error_control = ?config.error_control,
            "Error control initialized"
        );
        if let Some(n) = &normalization {
            info!(
                velocity = n.velocity,
                pressure = n.pressure,
                pressure_gradient = n.pressure_gradient,
                "Normalization factors"
            );
        }

        Ok(Self {
            problem,
            disc,
            config,
            clock,
            registry,
            catalog,
            timing,
            state: EngineState::Idle,
            volume,
            inflow_area,
            outflow_area,
            normalization,
            times: Vec::new(),
            current: None,
            last_relative_h1: None,
            onset_factor: 0.0,
            save_this_step: false,
        })
    }

    /// Opens step `step` at time `t`. Returns the cycle this step completes,
    /// if any; it is aggregated by `finish_step`.
    pub fn advance(&mut self, t: f64, step: u64) -> ControlResult<Option<CycleBoundary>> {
        match self.state {
            EngineState::Idle | EngineState::Stepping => {}
            other => {
                return Err(ControlError::InvalidState {
                    what: format!("advance called in state {other:?}"),
                });
            }
        }
        if let Some(open) = &self.current {
            return Err(ControlError::InvalidState {
                what: format!("step {} was not finished", open.step),
            });
        }
        self.state = EngineState::Stepping;

        let boundary = self.clock.boundary_at(t);
        self.times.push(t);

        let analytic = match self.catalog.analytic {
            Some(series) => Some(self.evaluate_analytic(&series, t)?),
            None => None,
        };

        self.onset_factor = onset_factor(self.config.onset, t);
        let stride = u64::from(self.config.save_stride);
        self.save_this_step = self.config.save.saves()
            && (stride == 1 || t > 1.0 - self.clock.dt() / 2.0 || step % stride == 0);
        debug!(
            t,
            step,
            onset_factor = self.onset_factor,
            save = self.save_this_step,
            cycle = boundary.as_ref().map(|b| b.cycle),
            "Step opened"
        );

        self.current = Some(StepContext {
            t,
            step,
            boundary: boundary.clone(),
            analytic,
        });
        Ok(boundary)
    }

    fn evaluate_analytic(&mut self, series: &AnalyticSeries, t: f64) -> ControlResult<AnalyticState> {
        let wall = self.problem.boundary_ids().wall;

        let problem = self.problem;
        let disc = self.disc;

        let velocity = self
            .timing
            .time("assembleSol", || problem.analytic_velocity(t))?;
        let (pressure, pressure_gradient) = self.timing.time("analyticP", || {
            (
                problem.analytic_pressure(disc, t),
                problem.analytic_pressure_gradient(t),
            )
        })?;

        let (l2_norm, h1_norm, h1_wall_norm) =
            self.timing
                .time("analyticVnorms", || -> FieldResult<(f64, f64, f64)> {
                    Ok((
                        functionals::l2_norm(disc, &velocity)?,
                        functionals::h1_norm(disc, &velocity)?,
                        functionals::boundary_h1_sq(disc, &velocity, wall)?.sqrt(),
                    ))
                })??;
        self.registry.append(series.av_norm_l2, l2_norm);
        self.registry.append(series.av_norm_h1, h1_norm);
        self.registry.append(series.av_norm_h1_wall, h1_wall_norm);

        Ok(AnalyticState {
            velocity,
            pressure,
            pressure_gradient,
            h1_norm,
        })
    }

    fn open_check(&self, op: &str) -> ControlResult<()> {
        if self.state != EngineState::Stepping || self.current.is_none() {
            return Err(ControlError::InvalidState {
                what: format!("{op} called outside an open step (state {:?})", self.state),
            });
        }
        Ok(())
    }

    /// Error control applies only with an analytic solution and when enabled.
    fn controlled<'c>(
        config: &ControlConfig,
        catalog: &SeriesCatalog,
        current: &'c Option<StepContext>,
    ) -> Option<(AnalyticSeries, &'c StepContext, &'c AnalyticState)> {
        if !config.error_control.enabled() {
            return None;
        }
        let series = catalog.analytic?;
        let ctx = current.as_ref()?;
        let analytic = ctx.analytic.as_ref()?;
        Some((series, ctx, analytic))
    }

    /// Velocity L2/H1 errors against the analytic solution. Fails with
    /// `DivergenceExceeded` once the relative H1 error passes the threshold;
    /// the values of that call are appended first.
    pub fn compute_error(&mut self, is_tentative: bool, velocity: &VectorField) -> ControlResult<()> {
        self.open_check("compute_error")?;
        let Some((series, ctx, analytic)) = Self::controlled(&self.config, &self.catalog, &self.current) else {
            return Ok(());
        };
        let t = ctx.t;
        let analytic_h1 = analytic.h1_norm;
        let disc = self.disc;
        let wall = self.problem.boundary_ids().wall;
        let diff = velocity.difference(&analytic.velocity)?;
        let test_mode = self.config.error_control == ErrorControlMode::Test;

        let (l2, h1, h1_wall) = self
            .timing
            .time("errorV", || -> FieldResult<(f64, f64, f64)> {
                let l2_sq = functionals::l2_norm_sq(disc, &diff)?;
                let semi_sq = functionals::h1_seminorm_sq(disc, &diff)?;
                let h1_wall = functionals::boundary_h1_sq(disc, &diff, wall)?.sqrt();
                Ok((l2_sq.sqrt(), (l2_sq + semi_sq).sqrt(), h1_wall))
            })??;
        self.registry.append(series.l2.select(is_tentative), l2);
        self.registry.append(series.h1.select(is_tentative), h1);
        self.registry.append(series.h1_wall.select(is_tentative), h1_wall);

        if test_mode {
            let (l2_test, h1_test) = self
                .timing
                .time("errorVtest", || -> FieldResult<(f64, f64)> {
                    Ok((functionals::l2_norm(disc, &diff)?, functionals::h1_norm(disc, &diff)?))
                })??;
            self.registry.append(series.l2_test.select(is_tentative), l2_test);
            self.registry.append(series.h1_test.select(is_tentative), h1_test);
        }

        let relative_h1 = ratio(h1, analytic_h1);
        self.last_relative_h1 = Some(relative_h1);
        info!(
            tentative = is_tentative,
            relative_l2 = self.normalization.map(|n| ratio(l2, n.velocity)),
            relative_h1,
            "Velocity error"
        );

        let threshold = self.config.divergence_threshold;
        if relative_h1 > threshold {
            self.state = EngineState::ErrorExceeded;
            warn!(relative_h1, threshold, t, "Failed divergence test");
            return Err(ControlError::DivergenceExceeded {
                relative_h1,
                threshold,
                t,
            });
        }
        Ok(())
    }

    /// `‖div v‖` into `d` or `d2`.
    pub fn compute_divergence(&mut self, is_tentative: bool, velocity: &VectorField) -> ControlResult<()> {
        self.open_check("compute_divergence")?;
        let disc = self.disc;
        let norm = self
            .timing
            .time("divNorm", || functionals::divergence_norm(disc, velocity))??;
        self.registry
            .append(self.catalog.divergence.select(is_tentative), norm);
        Ok(())
    }

    /// Subtracts the volume average in place and returns it.
    pub fn average_pressure(&mut self, pressure: &mut ScalarField) -> ControlResult<f64> {
        let disc = self.disc;
        let mean = self.timing.time("averageP", || -> FieldResult<f64> {
            let mean = functionals::domain_mean(disc, pressure)?;
            pressure.shift(-mean);
            Ok(mean)
        })??;
        debug!(mean, "Average pressure");
        Ok(mean)
    }

    /// Averages `pressure`, then records the estimated axial gradient and,
    /// under error control, the pressure and gradient errors.
    pub fn compute_pressure_error(
        &mut self,
        is_tentative: bool,
        pressure: &mut ScalarField,
    ) -> ControlResult<()> {
        self.open_check("compute_pressure_error")?;
        self.average_pressure(pressure)?;

        let ids = self.problem.boundary_ids();
        let disc = self.disc;
        let length = self.problem.axial_length();
        let computed = self.timing.time("computePG", || -> FieldResult<f64> {
            let p_in = functionals::boundary_mean(disc, pressure, ids.inflow)?;
            let p_out = functionals::boundary_mean(disc, pressure, ids.outflow)?;
            Ok((p_out - p_in) / length)
        })??;
        self.registry
            .append(self.catalog.computed_pg.select(is_tentative), computed);

        let Some((series, _, analytic)) = Self::controlled(&self.config, &self.catalog, &self.current) else {
            return Ok(());
        };
        let analytic_gradient = analytic.pressure_gradient;
        let diff = pressure.difference(&analytic.pressure)?;
        let analytic_norm = if is_tentative {
            None
        } else {
            Some(functionals::scalar_l2_norm(disc, &analytic.pressure)?)
        };

        if let Some(norm) = analytic_norm {
            self.registry.append(series.analytic_pg, analytic_gradient);
            self.registry.append(series.ap_norm, norm);
        }

        let error = self
            .timing
            .time("errorP", || functionals::scalar_l2_norm(disc, &diff))??;
        let gradient_error = computed - analytic_gradient;
        self.registry.append(series.pressure.select(is_tentative), error);
        self.registry
            .append(series.pg_error.select(is_tentative), gradient_error);
        self.registry
            .append(series.pg_abs_error.select(is_tentative), gradient_error.abs());

        debug!(
            tentative = is_tentative,
            error,
            normalized = self.normalization.map(|n| ratio(error, n.pressure)),
            computed,
            analytic = analytic_gradient,
            "Pressure error"
        );
        Ok(())
    }

    /// Wall traction errors of the (corrected) solution.
    pub fn compute_force_error(
        &mut self,
        velocity: &VectorField,
        pressure: &ScalarField,
    ) -> ControlResult<()> {
        self.open_check("compute_force_error")?;
        let Some((series, _, analytic)) = Self::controlled(&self.config, &self.catalog, &self.current) else {
            return Ok(());
        };
        let wall = self.problem.boundary_ids().wall;
        let disc = self.disc;
        let nu = self.problem.viscosity();
        let cmp = self.timing.time("errorForce", || {
            compare_wall_traction(
                disc,
                WallFields { velocity, pressure },
                WallFields {
                    velocity: &analytic.velocity,
                    pressure: &analytic.pressure,
                },
                wall,
                nu,
            )
        })??;
        let f = series.force;
        self.registry.append(f.analytic_total, cmp.analytic.total);
        self.registry.append(f.analytic_normal, cmp.analytic.normal);
        self.registry.append(f.analytic_shear, cmp.analytic.shear);
        self.registry.append(f.total, cmp.error.total);
        self.registry.append(f.normal, cmp.error.normal);
        self.registry.append(f.shear, cmp.error.shear);
        info!(
            relative = ratio(cmp.error.total, cmp.analytic.total),
            "Wall force error"
        );
        Ok(())
    }

    /// Closes the open step, aggregating the cycle it completes.
    pub fn finish_step(&mut self) -> ControlResult<Option<CycleBoundary>> {
        self.open_check("finish_step")?;
        let Some(ctx) = self.current.take() else {
            return Ok(None);
        };
        if let Some(boundary) = &ctx.boundary {
            let closed = self.registry.close_all(boundary);
            info!(cycle = boundary.cycle, closed, "Cycle completed");
        }
        Ok(ctx.boundary)
    }

    pub fn complete(&mut self) -> ControlResult<()> {
        match self.state {
            EngineState::Idle | EngineState::Stepping => {
                if let Some(open) = self.current.take() {
                    warn!(step = open.step, "Completing with an unfinished step");
                }
                self.state = EngineState::Completed;
                Ok(())
            }
            other => Err(ControlError::InvalidState {
                what: format!("complete called in state {other:?}"),
            }),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn registry(&self) -> &SeriesRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &SeriesCatalog {
        &self.catalog
    }

    pub fn timing(&self) -> &TimeControl {
        &self.timing
    }

    /// For watches owned by the caller (solver phases).
    pub fn timing_mut(&mut self) -> &mut TimeControl {
        &mut self.timing
    }

    pub fn clock(&self) -> &CycleClock {
        &self.clock
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn problem(&self) -> &dyn FlowProblem {
        self.problem
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn inflow_area(&self) -> f64 {
        self.inflow_area
    }

    pub fn outflow_area(&self) -> f64 {
        self.outflow_area
    }

    pub fn normalization(&self) -> Option<Normalization> {
        self.normalization
    }

    pub fn last_relative_h1(&self) -> Option<f64> {
        self.last_relative_h1
    }

    /// Value shown in the live status record.
    pub fn status_value(&self) -> f64 {
        self.last_relative_h1.unwrap_or(0.0)
    }

    pub fn onset_factor(&self) -> f64 {
        self.onset_factor
    }

    pub fn save_this_step(&self) -> bool {
        self.save_this_step
    }

    pub fn wall(&self) -> SubdomainId {
        self.problem.boundary_ids().wall
    }

    pub fn handle(&self, key: &str) -> ControlResult<SeriesHandle> {
        Ok(self.registry.handle(key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn onset_ramp() {
        assert_eq!(onset_factor(0.0, 0.01), 1.0);
        assert_eq!(onset_factor(0.5, 0.0), 0.0);
        assert!((onset_factor(0.5, 0.25) - 0.5).abs() < 1e-12);
        assert_eq!(onset_factor(0.5, 0.6), 1.0);
    }
}
