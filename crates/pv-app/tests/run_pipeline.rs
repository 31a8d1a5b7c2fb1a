//! classify -> precompute -> run on a box-shaped pipe.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use pv_app::{
    AnalyticReplaySolver, ClassifyConfig, MeshSource, RunConfig, RunProgressEvent, RunRequest,
    RunStage, classify_mesh, has_basis, precompute, run_simulation, run_simulation_with_progress,
};
use pv_mesh::{PlaneDef, PlaneRole};
use pv_report::{RunOutcome, load_manifest, read_summary};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    dir
}

fn prepare(root: &Path) {
    let classify = ClassifyConfig {
        name: "pipe".to_string(),
        source: MeshSource::Box {
            origin: [-5.0, -5.0, 0.0],
            extent: [10.0, 10.0, 20.0],
            divisions: [4, 4, 2],
        },
        planes: vec![
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
        ],
        mesh_dir: root.join("meshes"),
    };
    let classified = classify_mesh(&classify).unwrap();
    assert!(classified.mesh_path.exists());
    assert!(classified.sidecar_path.exists());
    assert_eq!(classified.areas[0].0, 1);
    assert!((classified.areas[1].1 - 100.0).abs() < 1e-9);

    let basis_dir = root.join("precomputed");
    assert!(!has_basis(&basis_dir, "pipe", 1.0).unwrap());
    precompute(&root.join("meshes"), &basis_dir, "pipe", 1.0).unwrap();
    assert!(has_basis(&basis_dir, "pipe", 1.0).unwrap());
}

fn run_config(root: &Path) -> RunConfig {
    let mut config = RunConfig::from_yaml("mesh: pipe\ndt: 0.1\ntime: 2\n").unwrap();
    config.results_root = root.join("results");
    config.mesh_dir = root.join("meshes");
    config.basis_dir = root.join("precomputed");
    config
}

#[test]
fn exact_replay_completes_with_report() {
    let root = unique_temp_dir("pv_app_run");
    prepare(&root);
    let config = run_config(&root);
    let mut solver = AnalyticReplaySolver::new(0.0, Some(0.0));

    let mut events: Vec<RunProgressEvent> = Vec::new();
    let response = run_simulation_with_progress(
        &RunRequest {
            config: &config,
            solver_version: "0.1.0",
        },
        &mut solver,
        Some(&mut |event| events.push(event)),
    )
    .unwrap();

    assert_eq!(response.name, "WCYL_pipe_f1_t2_dt100");
    assert_eq!(response.manifest.outcome, RunOutcome::Completed);
    assert_eq!(response.manifest.steps, 20);
    assert_eq!(response.manifest.cycles, vec![1, 2]);
    assert!(response.last_relative_h1.unwrap() < 1e-12);

    let results_root = root.join("results");
    assert!(results_root.join("WCYL_pipe_f1_t2_dt100_OK.report").exists());
    assert!(!results_root.join("WCYL_pipe_f1_t2_dt100.run").exists());
    assert_eq!(load_manifest(&response.results_dir).unwrap(), response.manifest);

    let summary = read_summary(&response.results_dir).unwrap();
    let value = |key: &str| {
        summary
            .iter()
            .find(|(h, _)| h == key)
            .map(|(_, v)| v.clone())
            .unwrap()
    };
    assert_eq!(value("last_cycle_CE_H1"), "0");
    assert_eq!(value("last_cycle_TE_H1"), "0");
    assert_eq!(value("last_cycle_DC"), value("last_cycle_DT"));

    let stepping = events
        .iter()
        .filter(|e| e.stage == RunStage::Stepping)
        .count();
    assert_eq!(stepping, 20);
    let closed: Vec<u32> = events
        .iter()
        .filter_map(|e| e.step.as_ref().and_then(|s| s.closed_cycle))
        .collect();
    assert_eq!(closed, vec![1, 2]);
    assert_eq!(events.last().map(|e| e.stage), Some(RunStage::Completed));

    let timing = fs::read_to_string(response.results_dir.join("report_timecontrol.csv")).unwrap();
    assert!(timing.contains(";solverStep;"));
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn perturbed_replay_stops_with_failure_sentinel() {
    let root = unique_temp_dir("pv_app_diverge");
    prepare(&root);
    let config = run_config(&root);
    let mut solver = AnalyticReplaySolver::new(11.0, None);

    let err = run_simulation(
        &RunRequest {
            config: &config,
            solver_version: "0.1.0",
        },
        &mut solver,
    )
    .unwrap_err();
    assert!(err.is_divergence(), "{err}");

    let results_root = root.join("results");
    let sentinel = results_root.join("WCYL_pipe_f1_t2_dt100_failed_at_0.100.report");
    let trace = fs::read_to_string(sentinel).unwrap();
    assert!(trace.contains("STOPPED"));
    assert!(!results_root.join("WCYL_pipe_f1_t2_dt100.run").exists());
    assert!(!results_root.join("WCYL_pipe_f1_t2_dt100_OK.report").exists());

    let manifest = load_manifest(&config.results_dir()).unwrap();
    assert!(matches!(manifest.outcome, RunOutcome::Failed { t, .. } if (t - 0.1).abs() < 1e-12));
    assert_eq!(manifest.steps, 1);
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn missing_basis_fails_before_any_report() {
    let root = unique_temp_dir("pv_app_nobasis");
    prepare(&root);
    let mut config = run_config(&root);
    config.basis_dir = root.join("elsewhere");
    let mut solver = AnalyticReplaySolver::new(0.0, None);

    let err = run_simulation(
        &RunRequest {
            config: &config,
            solver_version: "0.1.0",
        },
        &mut solver,
    )
    .unwrap_err();
    assert!(!err.is_divergence());
    assert!(!root.join("results").exists());
    let _ = fs::remove_dir_all(&root);
}
