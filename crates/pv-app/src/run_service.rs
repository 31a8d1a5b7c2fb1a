//! Run execution service: load, step, report.

use std::path::PathBuf;
use std::time::Instant;

use pv_analytic::{AnalyticProfile, BasisStore};
use pv_control::{ErrorControlEngine, FlowProblem, WomersleyCylinder};
use pv_fields::Discretization;
use pv_report::{ReportGenerator, ReportInput, ReportWriter, RunManifest, RunMetadata};
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::error::AppResult;
use crate::mesh_service;
use crate::progress::{RunProgressEvent, RunStage, StepProgress};
use crate::solver::FlowSolver;

const SOLVER_WATCH: &str = "solverStep";

/// Request to execute a run.
pub struct RunRequest<'a> {
    pub config: &'a RunConfig,
    pub solver_version: &'a str,
}

/// Response from a completed run.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub name: String,
    pub results_dir: PathBuf,
    pub manifest: RunManifest,
    pub last_relative_h1: Option<f64>,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
    step: Option<StepProgress>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent {
            stage,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            message,
            step,
        });
    }
}

pub fn run_simulation(request: &RunRequest, solver: &mut dyn FlowSolver) -> AppResult<RunResponse> {
    run_simulation_with_progress(request, solver, None)
}

/// Runs the step loop and writes the report.
///
/// Load failures return before any report file exists. Once stepping has
/// started, every error (the divergence stop included) leaves a partial
/// report and a failure sentinel behind before it is returned.
pub fn run_simulation_with_progress(
    request: &RunRequest,
    solver: &mut dyn FlowSolver,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let config = request.config;
    config.validate()?;
    let name = config.run_name();

    emit_progress(
        &mut progress_cb,
        RunStage::LoadingMesh,
        started,
        Some(format!("Loading mesh {}", config.mesh)),
        None,
    );
    let space = mesh_service::load_space(&config.mesh_dir, &config.mesh)?;

    emit_progress(
        &mut progress_cb,
        RunStage::LoadingBasis,
        started,
        Some("Loading basis fields".to_string()),
        None,
    );
    let store = BasisStore::load(&config.basis_dir, &config.mesh, config.control.nu_factor)?;
    let profile = AnalyticProfile::load(&store, &space, config.control.factor)?;
    let problem = WomersleyCylinder::new(profile, &config.control);

    emit_progress(
        &mut progress_cb,
        RunStage::Initializing,
        started,
        Some(format!("Initializing {}", solver.name())),
        None,
    );
    let mut engine = ErrorControlEngine::new(&problem, &space, config.control.clone(), config.dt)?;
    engine
        .timing_mut()
        .init_watch(SOLVER_WATCH, "solver step", true);
    solver.initialize(&problem, &space, config.dt)?;

    let metadata = RunMetadata {
        name: name.clone(),
        problem: problem.name().to_string(),
        mesh: config.mesh.clone(),
        dt: config.dt,
        time: config.time,
        parameters: serde_json::json!({
            "control": config.control,
            "solver": config.solver,
        }),
    };
    let results_dir = config.results_dir();
    let generator = ReportGenerator::new(
        ReportWriter::new(results_dir.clone(), config.results_root.clone(), config.rank),
        metadata,
        request.solver_version,
    );
    info!(
        name = %name,
        steps = config.step_count(),
        solver = solver.name(),
        dir = %results_dir.display(),
        "Run started"
    );

    let stepped = step_loop(
        config,
        &problem,
        &space,
        &mut engine,
        solver,
        &generator,
        &mut progress_cb,
        started,
    );

    if let Err(err) = stepped {
        let t = engine.times().last().copied().unwrap_or(0.0);
        let input = ReportInput {
            registry: engine.registry(),
            times: engine.times(),
            timing: engine.timing(),
        };
        if let Err(report_err) = generator.fail(input, t, &err) {
            warn!(error = %report_err, "Failure report could not be written");
        }
        emit_progress(
            &mut progress_cb,
            RunStage::Failed,
            started,
            Some(err.to_string()),
            None,
        );
        return Err(err);
    }

    engine.complete()?;
    emit_progress(
        &mut progress_cb,
        RunStage::Reporting,
        started,
        Some("Writing report".to_string()),
        None,
    );
    let manifest = generator.finish(ReportInput {
        registry: engine.registry(),
        times: engine.times(),
        timing: engine.timing(),
    })?;
    emit_progress(
        &mut progress_cb,
        RunStage::Completed,
        started,
        Some(format!("Run {} completed", manifest.run_id)),
        None,
    );

    Ok(RunResponse {
        name,
        results_dir,
        manifest,
        last_relative_h1: engine.last_relative_h1(),
    })
}

#[allow(clippy::too_many_arguments)]
fn step_loop(
    config: &RunConfig,
    problem: &dyn FlowProblem,
    disc: &dyn Discretization,
    engine: &mut ErrorControlEngine<'_>,
    solver: &mut dyn FlowSolver,
    generator: &ReportGenerator,
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    started: Instant,
) -> AppResult<()> {
    let steps = config.step_count();
    for step in 1..=steps {
        let t = step as f64 * config.dt;
        engine.advance(t, step)?;
        let bcs = problem.boundary_conditions(t, engine.onset_factor(), false);

        engine.timing_mut().start(SOLVER_WATCH)?;
        let fields = solver.step(problem, disc, t, &bcs)?;
        engine.timing_mut().end(SOLVER_WATCH)?;

        if let Some(mut tentative) = fields.tentative {
            engine.compute_divergence(true, &tentative.velocity)?;
            engine.compute_error(true, &tentative.velocity)?;
            engine.compute_pressure_error(true, &mut tentative.pressure)?;
        }
        let mut corrected = fields.corrected;
        engine.compute_divergence(false, &corrected.velocity)?;
        engine.compute_error(false, &corrected.velocity)?;
        engine.compute_pressure_error(false, &mut corrected.pressure)?;
        engine.compute_force_error(&corrected.velocity, &corrected.pressure)?;

        if engine.save_this_step() {
            debug!(step, t, mode = ?config.control.save, "Fields due for output");
        }
        let closed = engine.finish_step()?;
        let status_value = engine.status_value();
        generator.write_status(t, problem.status_label(), status_value)?;

        emit_progress(
            progress_cb,
            RunStage::Stepping,
            started,
            None,
            Some(StepProgress {
                step,
                t,
                t_end: config.time,
                fraction_complete: step as f64 / steps as f64,
                closed_cycle: closed.map(|b| b.cycle),
                status_value,
            }),
        );
    }
    Ok(())
}
