use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use wl_app::{
    AppResult, RunOptions, RunOverrides, RunProgressEvent, RunRequest, RunStage,
    project_service, run_service,
};
use wl_locate::DeltaPolicy;

#[derive(Parser)]
#[command(name = "wl-cli")]
#[command(about = "WaterLeak CLI - leak localization experiments on water networks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    CarryForward,
    TopKAverage,
}

impl From<PolicyArg> for DeltaPolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::CarryForward => DeltaPolicy::CarryForward,
            PolicyArg::TopKAverage => DeltaPolicy::TopKAverage,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Validate project file syntax, network and experiment settings
    Validate {
        /// Path to the project file
        project_path: PathBuf,
    },
    /// Show network size and analysis windows
    Info {
        /// Path to the project file
        project_path: PathBuf,
    },
    /// Run a leak localization experiment
    Run {
        /// Path to the project file
        project_path: PathBuf,
        /// Override the number of iterations
        #[arg(long)]
        iterations: Option<usize>,
        /// Override the scenario seed
        #[arg(long)]
        seed: Option<u64>,
        /// Probe magnitude policy for both phases
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,
        /// Override the output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Do not write a run directory
        #[arg(long)]
        no_save: bool,
    },
    /// List saved runs for a project
    Runs {
        /// Path to the project file
        project_path: PathBuf,
        /// Output directory, if not the project's
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show details of a saved run
    ShowRun {
        /// Path to the project file
        project_path: PathBuf,
        /// Run ID to display
        run_id: String,
        /// Output directory, if not the project's
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Info { project_path } => cmd_info(&project_path),
        Commands::Run {
            project_path,
            iterations,
            seed,
            policy,
            output,
            no_save,
        } => cmd_run(
            &project_path,
            RunOverrides {
                iterations,
                seed,
                policy: policy.map(Into::into),
                output_dir: output,
            },
            !no_save,
        ),
        Commands::Runs {
            project_path,
            output,
        } => cmd_runs(&project_path, output.as_deref()),
        Commands::ShowRun {
            project_path,
            run_id,
            output,
        } => cmd_show_run(&project_path, &run_id, output.as_deref()),
    }
}

fn cmd_validate(project_path: &Path) -> AppResult<()> {
    println!("Validating project: {}", project_path.display());
    let project = project_service::load_project(project_path)?;
    project_service::validate_project(&project)?;
    println!("✓ Project is valid");
    Ok(())
}

fn cmd_info(project_path: &Path) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let summary = project_service::summarize(&project);
    println!("Project: {}", summary.name);
    println!(
        "  {} junctions, {} reservoirs, {} tanks, {} pipes, {} patterns",
        summary.junctions, summary.reservoirs, summary.tanks, summary.pipes, summary.patterns
    );
    println!("  Simulation: {:.1} h", summary.duration_h);
    println!("  Analysis windows:");
    for (i, w) in summary.windows.iter().enumerate() {
        println!(
            "    {}: start {:.1} h, {} points",
            i,
            w.start_s / 3600.0,
            w.points
        );
    }
    Ok(())
}

fn cmd_run(project_path: &Path, overrides: RunOverrides, persist: bool) -> AppResult<()> {
    println!("Running experiment: {}", project_path.display());

    let request = RunRequest {
        project_path,
        overrides,
        options: RunOptions {
            persist,
            ..Default::default()
        },
    };

    let mut last_emit = Instant::now();
    let mut last_stage = String::new();
    let response = run_service::run_with_progress(
        &request,
        Some(&mut |event| {
            let stage_key = format!("{:?}", event.stage);
            let emit_now = stage_key != last_stage || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = stage_key;
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    println!("✓ Experiment completed: {}", response.run_id);
    for it in &response.report.iterations {
        let leaks: Vec<String> = it
            .leak_labels
            .iter()
            .zip(&it.leaks.magnitudes)
            .map(|(n, m)| format!("{n}={m:.3}"))
            .collect();
        println!(
            "  Iteration {}: leaks [{}], mean error {:.4}{}",
            it.iteration,
            leaks.join(", "),
            it.mean_error(),
            if it.reliable() { "" } else { " (unreliable)" }
        );
    }
    println!("  Mean model error: {:.4}", response.manifest.mean_error);

    let t = &response.timing;
    println!(
        "  Timing: load {:.3}s, compile {:.3}s, experiment {:.3}s, save {:.3}s, total {:.3}s",
        t.load_time_s, t.compile_time_s, t.experiment_time_s, t.save_time_s, t.total_time_s
    );
    println!("  Hydraulic simulations: {}", t.simulations);
    match &response.run_dir {
        Some(dir) => println!("  Results: {}", dir.display()),
        None if persist => println!("  Results were not saved (see log)"),
        None => {}
    }
    Ok(())
}

fn cmd_runs(project_path: &Path, output: Option<&Path>) -> AppResult<()> {
    let runs = run_service::list_runs(project_path, output)?;
    if runs.is_empty() {
        println!("No saved runs");
        return Ok(());
    }
    println!("Saved runs:");
    for run in runs {
        println!(
            "  {}  seed={}  iterations={}  mean error={:.4}",
            run.run_id, run.seed, run.iterations, run.mean_error
        );
    }
    Ok(())
}

fn cmd_show_run(project_path: &Path, run_id: &str, output: Option<&Path>) -> AppResult<()> {
    let (manifest, summaries, errors) = run_service::load_run(project_path, output, run_id)?;
    println!("Run: {}", manifest.run_id);
    println!("  Project: {}", manifest.project_name);
    println!("  Started: {}", manifest.timestamp);
    println!("  Solver: {} {}", manifest.solver, manifest.solver_version);
    println!("  Seed: {}", manifest.seed);
    println!(
        "  Simulations: {}, elapsed {:.2}s",
        manifest.simulations, manifest.elapsed_s
    );
    for summary in &summaries {
        let leaks: Vec<String> = summary
            .leaks
            .iter()
            .map(|l| format!("{}={:.3}", l.node, l.magnitude))
            .collect();
        println!(
            "  Iteration {}: leaks [{}], {} sensors",
            summary.iteration,
            leaks.join(", "),
            summary.sensors.len()
        );
    }
    println!("  iter  window  lp_obj      mip_obj     error");
    for row in errors {
        let fmt = |v: Option<f64>| v.map(|v| format!("{v:<10.4}")).unwrap_or_else(|| "-".repeat(10));
        println!(
            "  {:<4}  {:<6}  {}  {}  {:.4}{}",
            row.iteration,
            row.window,
            fmt(row.lp_objective),
            fmt(row.mip_objective),
            row.model_error,
            if row.reliable { "" } else { "  (unreliable)" }
        );
    }
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    let spinner = ['|', '/', '-', '\\'];
    let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
    let mut line = format!(
        "\r{} {}  elapsed={:.2}s",
        spinner[spin_idx],
        event.stage.label(),
        event.elapsed_wall_s
    );
    if let Some(p) = &event.locate {
        line.push_str(&format!("  iter={}/{}", p.iteration + 1, p.total_iterations));
        if let Some(w) = p.window {
            line.push_str(&format!("  window={}", w));
        }
        if let Some(phase) = p.phase {
            line.push_str(&format!("  {}", phase.label()));
        }
        if let Some(round) = p.round {
            line.push_str(&format!("  round={}", round));
        }
        if let Some(obj) = p.objective {
            line.push_str(&format!("  obj={:.4e}", obj));
        }
    }
    if let Some(msg) = &event.message {
        line.push_str(&format!("  {}", msg));
    }
    if matches!(event.stage, RunStage::Completed) {
        line.push('\n');
    }
    print!("{}", line);
    let _ = io::stdout().flush();
}
