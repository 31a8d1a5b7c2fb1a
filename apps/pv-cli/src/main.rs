use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use pv_app::{
    AppResult, ClassifyConfig, RunConfig, RunProgressEvent, RunRequest, RunStage, build_solver,
    classify_mesh, precompute, run_simulation_with_progress,
};
use pv_control::ErrorControlMode;
use pv_report::{RunOutcome, load_manifest, read_summary};
use tracing::warn;

const SOLVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "pv-cli")]
#[command(about = "pulseval - pulsatile pipe flow validation harness", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tag exterior facets of a mesh as wall/inflow/outflow
    Classify {
        /// Path to the classification YAML file
        config_path: PathBuf,
        /// Override the output mesh directory
        #[arg(long)]
        mesh_dir: Option<PathBuf>,
    },
    /// Precompute Womersley basis fields for a tagged mesh
    Precompute {
        /// Mesh name
        mesh: String,
        /// Viscosity factor (1, 0.1 or 0.01)
        #[arg(long, default_value_t = 1.0)]
        nu_factor: f64,
        #[arg(long, default_value = "meshes")]
        mesh_dir: PathBuf,
        #[arg(long, default_value = "precomputed")]
        basis_dir: PathBuf,
    },
    /// Run a validation simulation
    Run {
        /// Path to the run YAML file
        config_path: PathBuf,
        /// Time step in seconds
        #[arg(long)]
        dt: Option<f64>,
        /// End time in seconds
        #[arg(long)]
        time: Option<f64>,
        /// Velocity scale factor
        #[arg(long)]
        factor: Option<f64>,
        /// Relative perturbation of the replayed solution
        #[arg(long)]
        perturbation: Option<f64>,
        /// Disable the error control
        #[arg(long)]
        no_error_control: bool,
        #[arg(long)]
        results_root: Option<PathBuf>,
        /// Process rank; only rank 0 writes files
        #[arg(long)]
        rank: Option<u32>,
    },
    /// Show the manifest and summary of a finished run
    Show {
        /// Results directory of the run
        results_dir: PathBuf,
    },
}

fn main() -> AppResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Classify {
            config_path,
            mesh_dir,
        } => cmd_classify(&config_path, mesh_dir),
        Commands::Precompute {
            mesh,
            nu_factor,
            mesh_dir,
            basis_dir,
        } => cmd_precompute(&mesh, nu_factor, &mesh_dir, &basis_dir),
        Commands::Run {
            config_path,
            dt,
            time,
            factor,
            perturbation,
            no_error_control,
            results_root,
            rank,
        } => {
            let mut config = RunConfig::load(&config_path)?;
            if let Some(dt) = dt {
                config.dt = dt;
            }
            if let Some(time) = time {
                config.time = time;
            }
            if let Some(factor) = factor {
                config.control.factor = factor;
            }
            if let Some(perturbation) = perturbation {
                config.solver.perturbation = perturbation;
            }
            if no_error_control {
                config.control.error_control = ErrorControlMode::Off;
            }
            if let Some(root) = results_root {
                config.results_root = root;
            }
            if let Some(rank) = rank {
                config.rank = rank;
            }
            cmd_run(&config)
        }
        Commands::Show { results_dir } => cmd_show(&results_dir),
    }
}

fn cmd_classify(config_path: &Path, mesh_dir: Option<PathBuf>) -> AppResult<()> {
    let mut config = ClassifyConfig::load(config_path)?;
    if let Some(dir) = mesh_dir {
        config.mesh_dir = dir;
    }
    println!("Classifying mesh: {}", config.name);
    let response = classify_mesh(&config)?;
    println!("✓ {} exterior facets tagged", response.facets);
    for (id, area) in &response.areas {
        println!("  subdomain {id}: area {area:.6}");
    }
    println!("  Mesh:    {}", response.mesh_path.display());
    println!("  Sidecar: {}", response.sidecar_path.display());
    Ok(())
}

fn cmd_precompute(mesh: &str, nu_factor: f64, mesh_dir: &Path, basis_dir: &Path) -> AppResult<()> {
    println!("Precomputing basis fields for {mesh} (nu factor {nu_factor})");
    let path = precompute(mesh_dir, basis_dir, mesh, nu_factor)?;
    println!("✓ Written: {}", path.display());
    Ok(())
}

fn cmd_run(config: &RunConfig) -> AppResult<()> {
    config.validate()?;
    println!("Running {}", config.run_name());
    println!(
        "  dt = {:.3} s, time = {:.3} s, factor = {}",
        config.dt, config.time, config.control.factor
    );

    let mut solver = build_solver(&config.solver);
    let request = RunRequest {
        config,
        solver_version: SOLVER_VERSION,
    };

    let mut last_emit = Instant::now();
    let mut last_fraction = -1.0f64;
    let result = run_simulation_with_progress(
        &request,
        solver.as_mut(),
        Some(&mut |event| {
            let fraction = event
                .step
                .as_ref()
                .map(|s| s.fraction_complete)
                .unwrap_or(-1.0);
            let emit_now = event.step.is_none()
                || (fraction - last_fraction).abs() >= 0.005
                || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                if fraction >= 0.0 {
                    last_fraction = fraction;
                }
                last_emit = Instant::now();
            }
        }),
    );
    clear_progress_line();

    match result {
        Ok(response) => {
            println!("✓ Run completed: {}", response.manifest.run_id);
            if let Some(h1) = response.last_relative_h1 {
                println!("  Last relative H1 velocity error: {h1:.3e}");
            }
            println!("  Results: {}", response.results_dir.display());
            Ok(())
        }
        Err(err) => {
            if err.is_divergence() {
                println!("✗ {err}");
            } else {
                warn!(error = %err, "Run failed");
            }
            Err(err)
        }
    }
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match (&event.stage, &event.step) {
        (RunStage::Stepping, Some(s)) => {
            let width = 28usize;
            let filled = ((s.fraction_complete * width as f64).round() as usize).min(width);
            let bar = format!(
                "{}{}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled))
            );
            print!(
                "\r[{}] {:>6.2}%  t={:.3}/{:.3}s  step={}  error={:.3e}  elapsed={:.1}s",
                bar,
                s.fraction_complete * 100.0,
                s.t,
                s.t_end,
                s.step,
                s.status_value,
                event.elapsed_wall_s
            );
            let _ = io::stdout().flush();
        }
        _ => {
            let mut line = format!(
                "\r{}  elapsed={:.2}s",
                event.stage.label(),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {}", msg));
            }
            print!("{}", line);
            let _ = io::stdout().flush();
        }
    }
}

fn cmd_show(results_dir: &Path) -> AppResult<()> {
    let manifest = load_manifest(results_dir)?;
    println!("Run: {}", manifest.name);
    println!("  Run ID:    {}", manifest.run_id);
    println!("  Problem:   {}", manifest.problem);
    println!("  Mesh:      {}", manifest.mesh);
    println!("  Timestamp: {}", manifest.timestamp);
    match &manifest.outcome {
        RunOutcome::Completed => println!("  Outcome:   completed"),
        RunOutcome::Failed { t, message } => {
            println!("  Outcome:   failed at t = {t:.3}");
            println!("             {message}");
        }
    }
    println!("  Steps:     {}", manifest.steps);
    println!("  Cycles:    {:?}", manifest.cycles);
    println!("  Wall time: {:.4} h", manifest.total_time_hours);

    let summary = read_summary(results_dir)?;
    println!("\nLast cycle:");
    for (header, value) in summary
        .iter()
        .filter(|(h, _)| h.starts_with("last_cycle_"))
    {
        println!("  {:<24} {}", header.trim_start_matches("last_cycle_"), value);
    }
    Ok(())
}
