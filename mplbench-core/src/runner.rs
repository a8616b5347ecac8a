//! Sweep Runner
//!
//! Drives every configured target through its trials and MPL steps:
//!
//! ```text
//! PRE_RUN
//! └─ for each target                        PRE_DB / POST_DB
//!    ├─ copy config + base workload, generate workload
//!    ├─ for trial in 1..=trials             PRE_TRIAL / POST_TRIAL
//!    │  └─ for mpl in min, min+inc, ...     PRE_MPL / POST_MPL
//!    │     ├─ clean + load (clean_data only)
//!    │     ├─ run, extract stats, append
//!    │     └─ export stats
//!    └─ cleanup (always)
//! POST_RUN
//! ```
//!
//! Failures are not retried: the first process, target or export error aborts
//! the run. Statistics are exported after every step, so an aborted run keeps
//! everything up to the last completed step.

use crate::config::{ConfigError, RunnerConfigFile};
use crate::executor::{ExecutorError, ProcessExecutor, SystemExecutor};
use crate::extract::extract_stats;
use crate::hooks::{HookArgs, HookDispatch, HookLocation};
use crate::plan::{mpl_candidates, trial_range};
use crate::target::{Target, TargetError, YcsbTarget};
use chrono::Utc;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort a run
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Benchmark process failed: {0}")]
    Process(#[from] ExecutorError),

    #[error("Target error: {0}")]
    Target(#[from] TargetError),

    #[error("Failed to copy '{from}' to '{to}': {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Orchestrates the benchmark sweep over all targets
pub struct Runner {
    targets: Vec<Box<dyn Target>>,
    executor: Box<dyn ProcessExecutor>,
    hooks: Box<dyn HookDispatch>,
    config_path: Option<PathBuf>,
}

impl Runner {
    /// Create a runner over already-built targets
    pub fn new(
        targets: Vec<Box<dyn Target>>,
        executor: impl ProcessExecutor + 'static,
        hooks: impl HookDispatch + 'static,
    ) -> Self {
        Self {
            targets,
            executor: Box::new(executor),
            hooks: Box::new(hooks),
            config_path: None,
        }
    }

    /// Load a config file and build one [`YcsbTarget`] per configured target,
    /// running benchmarks as real processes.
    pub fn from_config_file(
        path: impl AsRef<Path>,
        hooks: impl HookDispatch + 'static,
    ) -> Result<Self, RunnerError> {
        Self::from_config(path, SystemExecutor, hooks)
    }

    /// Like [`Runner::from_config_file`] with an explicit executor
    pub fn from_config(
        path: impl AsRef<Path>,
        executor: impl ProcessExecutor + 'static,
        hooks: impl HookDispatch + 'static,
    ) -> Result<Self, RunnerError> {
        let path = path.as_ref();
        let specs = RunnerConfigFile::load(path)?.targets()?;
        let started = Utc::now();

        tracing::info!(
            config = %path.display(),
            targets = specs.len(),
            "loaded runner config"
        );

        let targets = specs
            .into_iter()
            .map(|spec| Box::new(YcsbTarget::new(spec, started)) as Box<dyn Target>)
            .collect();

        Ok(Self::new(targets, executor, hooks).with_config_path(path))
    }

    /// Copy `path` into every target's output as a record of the run's config
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Targets in sweep order, with the statistics they have accumulated
    pub fn targets(&self) -> &[Box<dyn Target>] {
        &self.targets
    }

    /// Consume the runner, returning its targets
    pub fn into_targets(self) -> Vec<Box<dyn Target>> {
        self.targets
    }

    /// Run the full sweep over every target, in order
    pub fn run(&mut self) -> Result<(), RunnerError> {
        let sweep = Sweep {
            executor: self.executor.as_ref(),
            hooks: self.hooks.as_ref(),
            config_path: self.config_path.as_deref(),
        };

        sweep.fire(HookLocation::PreRun, HookArgs::Run);
        for target in self.targets.iter_mut() {
            sweep.run_target(target.as_mut())?;
        }
        sweep.fire(HookLocation::PostRun, HookArgs::Run);

        Ok(())
    }
}

/// Borrowed collaborators for one run
struct Sweep<'a> {
    executor: &'a dyn ProcessExecutor,
    hooks: &'a dyn HookDispatch,
    config_path: Option<&'a Path>,
}

impl Sweep<'_> {
    fn fire(&self, location: HookLocation, args: HookArgs<'_>) {
        self.hooks.dispatch(location.as_str(), &args);
    }

    fn run_target(&self, target: &mut dyn Target) -> Result<(), RunnerError> {
        tracing::info!(target_name = target.name(), label = target.label(), "starting target");
        self.fire(HookLocation::PreDb, HookArgs::Target(&*target));

        let result = self
            .prepare(target)
            .and_then(|()| self.run_trials(target));
        // Release handles whether or not the sweep finished
        let released = target.cleanup();
        result?;
        released?;

        self.fire(HookLocation::PostDb, HookArgs::Target(&*target));
        tracing::info!(
            target_name = target.name(),
            rows = target.stats().len(),
            "finished target"
        );
        Ok(())
    }

    fn prepare(&self, target: &mut dyn Target) -> Result<(), RunnerError> {
        if let Some(config_path) = self.config_path {
            copy_file(config_path, &target.make_path("config-{}-{}.toml"))?;
        }
        // Keep the raw workload next to the generated one; generation drops comments
        let base = target.base_workload_path().to_path_buf();
        copy_file(&base, &target.make_path("workload-{}-{}"))?;
        let generated = target.make_path("workload-generated-{}-{}");
        target.generate_workload_file(&generated)?;
        Ok(())
    }

    fn run_trials(&self, target: &mut dyn Target) -> Result<(), RunnerError> {
        let settings = *target.sweep();

        for trial in trial_range(settings.trials) {
            self.fire(HookLocation::PreTrial, HookArgs::Trial { trial, target: &*target });
            target.log(&format!("Starting trial {}...", trial), None, Some(trial))?;

            for mpl in mpl_candidates(settings.min_mpl, settings.inc_mpl) {
                self.fire(HookLocation::PreMpl, HookArgs::Mpl { mpl, trial, target: &*target });
                if mpl > settings.max_mpl {
                    break;
                }
                self.run_step(target, mpl, trial)?;
                self.fire(HookLocation::PostMpl, HookArgs::Mpl { mpl, trial, target: &*target });
            }

            self.fire(HookLocation::PostTrial, HookArgs::Trial { trial, target: &*target });
        }

        Ok(())
    }

    fn run_step(&self, target: &mut dyn Target, mpl: u32, trial: u32) -> Result<(), RunnerError> {
        let (mpl_tag, trial_tag) = (Some(mpl), Some(trial));

        if target.sweep().clean_data {
            target.log("Cleaning the database...", mpl_tag, trial_tag)?;
            target.clean()?;
            target.log("Loading YCSB data...", mpl_tag, trial_tag)?;
            let output = self.executor.execute(&target.load_command())?;
            target.raw_log(&output)?;
        }

        target.log("Running YCSB workload...", mpl_tag, trial_tag)?;
        let output = self.executor.execute(&target.run_command(mpl))?;
        target.raw_log(&output)?;

        let row = extract_stats(&output).at(mpl, trial);
        tracing::debug!(mpl, trial, metrics = row.metrics().count(), "extracted stats");
        target.add_stats(row);

        target.log("Exporting run stats...", mpl_tag, trial_tag)?;
        target.export_stats()?;
        Ok(())
    }
}

fn copy_file(from: &Path, to: &Path) -> Result<(), RunnerError> {
    let copy = || -> std::io::Result<()> {
        if let Some(parent) = to.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::copy(from, to).map(|_| ())
    };
    copy().map_err(|source| RunnerError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}
