//! Engine step sequencing, cycle aggregation and the divergence stop.

use pv_analytic::{AnalyticProfile, precompute_basis};
use pv_control::{
    BoundaryConditions, BoundaryIds, ControlConfig, ControlError, EngineState, ErrorControlEngine,
    ErrorControlMode, FlowProblem, InitialField, InitialRequest, Normalization,
    WomersleyCylinder,
};
use pv_core::SubdomainId;
use pv_fields::{Discretization, FieldResult, P1Space, ScalarField, VectorField};
use pv_mesh::{PlaneDef, PlaneRole, SubdomainClassifier, TetMesh};

fn pipe_box() -> P1Space {
    let mesh = TetMesh::structured_box([-5.0, -5.0, 0.0], [10.0, 10.0, 20.0], [4, 4, 2]).unwrap();
    let tags = SubdomainClassifier::new(vec![
        PlaneDef {
            number: 2,
            normal: [0.0, 0.0, -1.0],
            center: [0.0, 0.0, 0.0],
            role: PlaneRole::Inflow {
                radius: 5.0,
                reference_radius: 5.0,
            },
        },
        PlaneDef {
            number: 3,
            normal: [0.0, 0.0, 1.0],
            center: [0.0, 0.0, 20.0],
            role: PlaneRole::Outflow,
        },
    ])
    .unwrap()
    .classify(&mesh)
    .unwrap()
    .tags;
    P1Space::new(mesh, &tags).unwrap()
}

fn womersley(space: &P1Space, config: &ControlConfig) -> WomersleyCylinder {
    let store = precompute_basis(space, "pipe_box", 1.0).unwrap();
    let profile = AnalyticProfile::load(&store, space, config.factor).unwrap();
    WomersleyCylinder::new(profile, config)
}

/// Fluid at rest: every field and every reference is zero.
struct StillFluid {
    nodes: usize,
}

impl FlowProblem for StillFluid {
    fn code(&self) -> &str {
        "STILL"
    }

    fn name(&self) -> &str {
        "still_fluid"
    }

    fn status_label(&self) -> &str {
        "last H1 velocity error"
    }

    fn has_analytic_solution(&self) -> bool {
        true
    }

    fn viscosity(&self) -> f64 {
        1.0
    }

    fn boundary_ids(&self) -> BoundaryIds {
        BoundaryIds {
            wall: SubdomainId::WALL,
            inflow: SubdomainId::INFLOW,
            outflow: SubdomainId::OUTFLOW,
        }
    }

    fn axial_length(&self) -> f64 {
        20.0
    }

    fn analytic_velocity(&self, _t: f64) -> VectorField {
        VectorField::zeros(self.nodes)
    }

    fn analytic_pressure(&self, disc: &dyn Discretization, _t: f64) -> ScalarField {
        ScalarField::zeros(disc.node_count())
    }

    fn analytic_pressure_gradient(&self, _t: f64) -> f64 {
        0.0
    }

    fn normalization(&self, _disc: &dyn Discretization) -> FieldResult<Normalization> {
        Ok(Normalization {
            velocity: 1.0,
            pressure: 1.0,
            pressure_gradient: 1.0,
        })
    }

    fn boundary_conditions(&self, _t: f64, _onset: f64, _p: bool) -> BoundaryConditions {
        BoundaryConditions::default()
    }

    fn initial_conditions(
        &self,
        _disc: &dyn Discretization,
        _requests: &[InitialRequest],
    ) -> Vec<InitialField> {
        Vec::new()
    }
}

#[test]
fn exact_solution_gives_zero_cycle_aggregates() {
    let space = pipe_box();
    let problem = StillFluid {
        nodes: space.node_count(),
    };
    let dt = 0.1;
    let mut engine = ErrorControlEngine::new(&problem, &space, ControlConfig::default(), dt).unwrap();
    assert_eq!(engine.state(), EngineState::Idle);

    let v = VectorField::zeros(space.node_count());
    let mut closed = Vec::new();
    for step in 1..=20u64 {
        let t = step as f64 * dt;
        engine.advance(t, step).unwrap();
        for tentative in [true, false] {
            let mut p = ScalarField::zeros(space.node_count());
            engine.compute_divergence(tentative, &v).unwrap();
            engine.compute_error(tentative, &v).unwrap();
            engine.compute_pressure_error(tentative, &mut p).unwrap();
        }
        engine
            .compute_force_error(&v, &ScalarField::zeros(space.node_count()))
            .unwrap();
        if let Some(boundary) = engine.finish_step().unwrap() {
            closed.push(boundary.cycle);
        }
    }
    engine.complete().unwrap();
    assert_eq!(engine.state(), EngineState::Completed);
    assert_eq!(closed, vec![1, 2]);
    assert_eq!(engine.times().len(), 20);

    let registry = engine.registry();
    let monitored: Vec<_> = registry
        .iter()
        .filter(|(_, s)| s.spec().monitored)
        .collect();
    assert_eq!(monitored.len(), 13);
    for (_, series) in monitored {
        assert_eq!(series.values().len(), 20, "{}", series.key());
        assert_eq!(series.cycle_values(), &[0.0, 0.0], "{}", series.key());
    }
    // corrected only
    assert_eq!(registry.by_key("apg").unwrap().values().len(), 20);
    assert_eq!(registry.by_key("ap_norm").unwrap().values().len(), 20);
    assert_eq!(engine.last_relative_h1(), Some(0.0));
}

#[test]
fn divergence_stops_on_the_exact_call() {
    let space = pipe_box();
    let config = ControlConfig::default();
    let problem = womersley(&space, &config);
    let dt = 0.1;
    let mut engine = ErrorControlEngine::new(&problem, &space, config, dt).unwrap();

    for step in 1..=3u64 {
        let t = step as f64 * dt;
        engine.advance(t, step).unwrap();
        let exact = problem.analytic_velocity(t);
        let velocity = if step == 3 { exact.scaled(12.0) } else { exact };
        let result = engine.compute_error(false, &velocity);
        if step < 3 {
            result.unwrap();
            assert!(engine.last_relative_h1().unwrap() < 1e-12);
            engine.finish_step().unwrap();
        } else {
            let err = result.unwrap_err();
            assert!(err.is_divergence());
            let ControlError::DivergenceExceeded {
                relative_h1,
                threshold,
                ..
            } = err
            else {
                unreachable!()
            };
            assert!((relative_h1 - 11.0).abs() < 1e-9);
            assert_eq!(threshold, 10.0);
        }
    }
    assert_eq!(engine.state(), EngineState::ErrorExceeded);
    // the failing call's values are kept for the partial report
    assert_eq!(engine.registry().by_key("u_H1").unwrap().values().len(), 3);
    assert!(matches!(
        engine.advance(0.4, 4),
        Err(ControlError::InvalidState { .. })
    ));
}

#[test]
fn analytic_fields_reproduce_pressure_gradient_and_wall_force() {
    let space = pipe_box();
    let config = ControlConfig {
        error_control: ErrorControlMode::Test,
        factor: 0.5,
        ..ControlConfig::default()
    };
    let problem = womersley(&space, &config);
    let mut engine = ErrorControlEngine::new(&problem, &space, config, 0.1).unwrap();

    let t = 0.3;
    engine.advance(t, 3).unwrap();
    let v = problem.analytic_velocity(t);
    let mut p = problem.analytic_pressure(&space, t);
    engine.compute_error(false, &v).unwrap();
    engine.compute_pressure_error(false, &mut p).unwrap();
    engine.compute_force_error(&v, &p).unwrap();
    engine.finish_step().unwrap();

    let registry = engine.registry();
    let last = |key: &str| registry.by_key(key).unwrap().last().unwrap();
    let analytic = problem.analytic_pressure_gradient(t);
    assert!((last("pg") - analytic).abs() < 1e-9 * analytic.abs());
    assert!(last("pgEA") < 1e-9 * analytic.abs());
    assert_eq!(last("apg"), analytic);
    assert!(last("force_wall") < 1e-9 * last("a_force_wall"));
    assert!(last("a_force_wall_normal") > 0.0);
    assert!(last("a_force_wall_shear") > 0.0);
    assert_eq!(last("u_L2test"), 0.0);
    assert_eq!(last("u_H1test"), 0.0);
    assert!(engine.volume() > 0.0);
    assert!((engine.inflow_area() - 100.0).abs() < 1e-9);
    assert!((engine.outflow_area() - 100.0).abs() < 1e-9);
}

#[test]
fn error_control_off_still_records_divergence() {
    let space = pipe_box();
    let config = ControlConfig {
        error_control: ErrorControlMode::Off,
        ..ControlConfig::default()
    };
    let problem = womersley(&space, &config);
    let mut engine = ErrorControlEngine::new(&problem, &space, config, 0.1).unwrap();
    engine.advance(0.1, 1).unwrap();
    let v = problem.analytic_velocity(0.1).scaled(50.0);
    engine.compute_error(false, &v).unwrap();
    engine.compute_divergence(false, &v).unwrap();
    engine.finish_step().unwrap();
    let registry = engine.registry();
    assert!(registry.by_key("u_H1").unwrap().values().is_empty());
    assert_eq!(registry.by_key("d").unwrap().values().len(), 1);
    assert_eq!(registry.by_key("av_norm_H1").unwrap().values().len(), 1);
    assert_eq!(engine.state(), EngineState::Stepping);
}

#[test]
fn step_sequencing_is_enforced() {
    let space = pipe_box();
    let problem = StillFluid {
        nodes: space.node_count(),
    };
    let mut engine = ErrorControlEngine::new(&problem, &space, ControlConfig::default(), 0.1).unwrap();
    let v = VectorField::zeros(space.node_count());
    assert!(matches!(
        engine.compute_divergence(false, &v),
        Err(ControlError::InvalidState { .. })
    ));
    engine.advance(0.1, 1).unwrap();
    assert!(matches!(
        engine.advance(0.2, 2),
        Err(ControlError::InvalidState { .. })
    ));
}

#[test]
fn failed_functional_stops_its_watch() {
    let space = pipe_box();
    let problem = StillFluid {
        nodes: space.node_count(),
    };
    let mut engine = ErrorControlEngine::new(&problem, &space, ControlConfig::default(), 0.1).unwrap();
    engine.advance(0.1, 1).unwrap();

    let short = VectorField::zeros(space.node_count() - 1);
    assert!(matches!(
        engine.compute_divergence(false, &short),
        Err(ControlError::Field(_))
    ));
    assert!(!engine.timing().is_running("divNorm"));

    let mut short_p = ScalarField::zeros(space.node_count() - 1);
    assert!(matches!(
        engine.compute_pressure_error(false, &mut short_p),
        Err(ControlError::Field(_))
    ));
    assert!(!engine.timing().is_running("averageP"));

    // the watches are reusable on the next call
    let v = VectorField::zeros(space.node_count());
    engine.compute_divergence(false, &v).unwrap();
    assert_eq!(engine.registry().by_key("d").unwrap().values(), &[0.0]);
}

#[test]
fn save_stride_applies_in_first_second_only() {
    let space = pipe_box();
    let problem = StillFluid {
        nodes: space.node_count(),
    };
    let config = ControlConfig {
        save: pv_control::SaveMode::On,
        save_stride: 3,
        onset: 0.5,
        ..ControlConfig::default()
    };
    let mut engine = ErrorControlEngine::new(&problem, &space, config, 0.1).unwrap();
    let mut saved = Vec::new();
    for step in 1..=12u64 {
        engine.advance(step as f64 * 0.1, step).unwrap();
        if engine.save_this_step() {
            saved.push(step);
        }
        if step == 2 {
            assert!(engine.onset_factor() < 1.0);
        }
        engine.finish_step().unwrap();
    }
    assert_eq!(engine.onset_factor(), 1.0);
    assert_eq!(saved, vec![3, 6, 9, 10, 11, 12]);
}
