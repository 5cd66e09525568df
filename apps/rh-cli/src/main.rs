use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use rh_decomp::{DecompTables, TreeBuilder};
use rh_exec::{ExecResult, NoopExecutor};
use rh_model::{ConfigProvider, FileProvider, ModelConfig};

#[derive(Parser)]
#[command(name = "rh-cli")]
#[command(about = "rollhorizon CLI - temporal decomposition and solve scheduling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration file syntax and references
    Validate {
        /// Path to the configuration file (YAML or JSON)
        config_path: PathBuf,
    },
    /// Print the concrete solve order and window sizes
    Plan {
        /// Path to the configuration file (YAML or JSON)
        config_path: PathBuf,
    },
    /// Write every solve's artifact set without an optimization backend
    Emit {
        /// Path to the configuration file (YAML or JSON)
        config_path: PathBuf,
        /// Directory to write the per-solve artifacts into
        out_dir: PathBuf,
    },
}

fn main() -> ExecResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config_path } => cmd_validate(&config_path),
        Commands::Plan { config_path } => cmd_plan(&config_path),
        Commands::Emit {
            config_path,
            out_dir,
        } => cmd_emit(&config_path, &out_dir),
    }
}

fn load(config_path: &Path) -> ExecResult<ModelConfig> {
    Ok(FileProvider::new(config_path).load()?)
}

fn cmd_validate(config_path: &Path) -> ExecResult<()> {
    println!("Validating configuration: {}", config_path.display());
    let config = load(config_path)?;
    // Loading validates; also check the decomposition tables build.
    DecompTables::from_config(&config)?;
    println!("✓ Configuration is valid");
    Ok(())
}

fn cmd_plan(config_path: &Path) -> ExecResult<()> {
    let config = load(config_path)?;
    let tables = DecompTables::from_config(&config)?;
    let plan = TreeBuilder::new(&tables).plan()?;

    println!("Concrete solves in execution order:");
    for solve in &plan.order {
        let complete = plan.complete_solve_of(solve)?;
        let active = plan.active_of(solve)?;
        let realized = plan.realized_of(solve)?;
        println!(
            "  {} (from {}) - {} active steps, {} realized",
            solve,
            complete,
            active.step_count(),
            realized.step_count()
        );
    }
    Ok(())
}

fn cmd_emit(config_path: &Path, out_dir: &Path) -> ExecResult<()> {
    let config = load(config_path)?;
    let mut executor = NoopExecutor::new();
    let report = rh_exec::run(&config, out_dir, &mut executor)?;
    println!(
        "✓ Wrote artifact sets for {} solves into {}",
        report.executed.len(),
        out_dir.display()
    );
    Ok(())
}
