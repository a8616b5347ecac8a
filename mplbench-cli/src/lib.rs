#![warn(missing_docs)]
//! mplbench CLI Library
//!
//! Command-line driver for YCSB multiprogramming-level sweeps. The binary is a
//! thin wrapper around [`run`]; the subcommands are:
//!
//! - `run <config>`: execute the sweep for every configured target
//! - `plan <config>`: print the trials and MPL values each target would run
//! - `init`: emit a starter `mplbench.toml`

use anyhow::Context;
use clap::{Parser, Subcommand};
use mplbench_core::{
    HookArgs, HookLocation, HookRegistry, Metric, Runner, RunnerConfigFile, SweepPlan, Target,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// mplbench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "mplbench")]
#[command(author, version, about = "mplbench - YCSB benchmark sweeps over MPL")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the benchmark sweep for every target in a config file
    Run {
        /// Runner config file
        #[arg(default_value = "mplbench.toml")]
        config: PathBuf,
    },
    /// Show the sweep each target would run, without running it
    Plan {
        /// Runner config file
        #[arg(default_value = "mplbench.toml")]
        config: PathBuf,
    },
    /// Write a starter config file
    Init {
        /// Destination file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run the mplbench CLI with the process arguments.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the mplbench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run { ref config } => run_sweep(config),
        Commands::Plan { ref config } => {
            print!("{}", format_plan(config)?);
            Ok(())
        }
        Commands::Init { ref output, force } => init_config(output.as_deref(), force),
    }
}

/// RUST_LOG wins over the verbosity flag when set
fn init_logging(verbose: bool) {
    let default = if verbose {
        "mplbench=debug"
    } else {
        "mplbench=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed when embedded in another binary
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn progress_hooks() -> HookRegistry {
    let mut hooks = HookRegistry::new();
    hooks
        .on(HookLocation::PreDb, |args: &HookArgs<'_>| {
            if let Some(target) = args.target() {
                let sweep = target.sweep();
                tracing::debug!(
                    target_name = target.name(),
                    trials = sweep.trials,
                    min_mpl = sweep.min_mpl,
                    max_mpl = sweep.max_mpl,
                    inc_mpl = sweep.inc_mpl,
                    "sweep bounds"
                );
            }
        })
        .on(HookLocation::PostTrial, |args: &HookArgs<'_>| {
            if let (Some(trial), Some(target)) = (args.trial(), args.target()) {
                tracing::debug!(
                    target_name = target.name(),
                    trial,
                    rows = target.stats().len(),
                    "trial finished"
                );
            }
        });
    hooks
}

fn run_sweep(config: &Path) -> anyhow::Result<()> {
    let mut runner = Runner::from_config_file(config, progress_hooks())
        .with_context(|| format!("Failed to set up runner from {}", config.display()))?;

    if runner.targets().is_empty() {
        tracing::warn!("no supported targets configured; nothing to run");
        return Ok(());
    }

    let result = runner.run();
    let targets = runner.into_targets();
    print!("{}", format_summary(&targets));
    result.context("Benchmark sweep failed")
}

fn format_plan(config: &Path) -> anyhow::Result<String> {
    let file = RunnerConfigFile::load(config)?;
    let targets = file.targets()?;

    let mut out = String::from("mplbench Plan:\n");
    let mut total = 0;
    for spec in &targets {
        let plan = SweepPlan::for_target(spec);
        out.push_str(&format_target_plan(&plan));
        total += plan.total_steps();
    }
    out.push_str(&format!(
        "{} targets, {} benchmark runs.\n",
        targets.len(),
        total
    ));
    Ok(out)
}

fn format_target_plan(plan: &SweepPlan) -> String {
    let name = if plan.label.is_empty() {
        plan.target.clone()
    } else {
        format!("{} [{}]", plan.target, plan.label)
    };
    let mpls: Vec<String> = plan.mpls.iter().map(u32::to_string).collect();
    let mpls = if mpls.is_empty() {
        "(none)".to_string()
    } else {
        mpls.join(", ")
    };

    let mut out = format!("├── target: {}\n", name);
    out.push_str(&format!("│   ├── trials: {}\n", plan.trials.len()));
    out.push_str(&format!("│   ├── mpl: {}\n", mpls));
    if plan.clean_data {
        out.push_str("│   ├── clean + load before every run\n");
    }
    out
}

fn format_summary(targets: &[Box<dyn Target>]) -> String {
    let mut out = String::new();
    for target in targets {
        let stats = target.stats();
        let tag = if target.label().is_empty() {
            target.name().to_string()
        } else {
            format!("{}-{}", target.name(), target.label())
        };
        out.push_str(&format!("{}: {} rows\n", tag, stats.len()));
        for row in stats.rows() {
            let throughput = row
                .get(Metric::Throughput)
                .map(|v| format!("{:.2} ops/sec", v.as_f64()))
                .unwrap_or_else(|| "-".to_string());
            out.push_str(&format!(
                "  trial {:>3}  mpl {:>4}  {}\n",
                row.trial().unwrap_or_default(),
                row.mpl().unwrap_or_default(),
                throughput
            ));
        }
    }
    out
}

fn init_config(output: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let contents = RunnerConfigFile::default_toml();
    match output {
        None => {
            print!("{}", contents);
            Ok(())
        }
        Some(path) => {
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            std::fs::write(path, contents)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote starter config");
            Ok(())
        }
    }
}
