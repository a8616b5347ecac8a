//! Benchmark Targets
//!
//! A target is one configured system under test. The runner only talks to it
//! through the [`Target`] trait: it asks for commands, tells it to clean its
//! data store, hands it output to log and statistics to keep, and finally
//! releases it. [`YcsbTarget`] is the implementation that drives the YCSB
//! launcher and writes everything under the configured output directory.

use crate::config::{SweepSettings, TargetSpec};
use crate::executor::{ExecutorError, ProcessExecutor, SystemExecutor};
use crate::stats::{ExportMeta, Statistics, StatsRow, write_atomic};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by a target while preparing, logging or exporting
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to clean data store: {0}")]
    Clean(#[from] ExecutorError),

    #[error("Failed to serialize statistics: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write statistics CSV: {0}")]
    Csv(#[from] csv::Error),
}

impl TargetError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        TargetError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One system under test, as seen by the runner
pub trait Target {
    /// Target kind as configured (e.g. `mysql`)
    fn name(&self) -> &str;

    /// Instance label, empty when unlabelled
    fn label(&self) -> &str;

    /// Trial count and MPL bounds
    fn sweep(&self) -> &SweepSettings;

    /// Workload file the generated workload is derived from
    fn base_workload_path(&self) -> &Path;

    /// Destination path for an output file. `template` holds up to two `{}`
    /// placeholders.
    fn make_path(&self, template: &str) -> PathBuf;

    /// Write the workload definition to `dest`; later commands refer to it
    fn generate_workload_file(&mut self, dest: &Path) -> Result<(), TargetError>;

    /// Command that loads the initial data set
    fn load_command(&self) -> Vec<String>;

    /// Command that runs the workload with `mpl` client threads
    fn run_command(&self, mpl: u32) -> Vec<String>;

    /// Empty the underlying data store
    fn clean(&mut self) -> Result<(), TargetError>;

    /// Write a progress line, optionally tagged with sweep coordinates
    fn log(&mut self, message: &str, mpl: Option<u32>, trial: Option<u32>)
    -> Result<(), TargetError>;

    /// Record raw process output
    fn raw_log(&mut self, output: &str) -> Result<(), TargetError>;

    /// Statistics accumulated so far
    fn stats(&self) -> &Statistics;

    /// Append a statistics row
    fn add_stats(&mut self, row: StatsRow);

    /// Persist the accumulated statistics; safe to call repeatedly
    fn export_stats(&mut self) -> Result<(), TargetError>;

    /// Release file handles and other resources
    fn cleanup(&mut self) -> Result<(), TargetError>;
}

/// Target driven through the YCSB launcher
pub struct YcsbTarget {
    spec: TargetSpec,
    started: DateTime<Utc>,
    ycsb_path: PathBuf,
    workload_path: PathBuf,
    output_dir: PathBuf,
    generated_workload: Option<PathBuf>,
    stats: Statistics,
    log_file: Option<BufWriter<File>>,
    raw_file: Option<BufWriter<File>>,
    executor: Box<dyn ProcessExecutor>,
    warned_no_clean: bool,
}

impl YcsbTarget {
    /// Build a target from its processed config; `started` stamps output file names
    pub fn new(spec: TargetSpec, started: DateTime<Utc>) -> Self {
        let path_or = |key: &str, fallback: &str| {
            spec.config
                .path(key)
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(fallback))
        };
        let ycsb_path = path_or("ycsb_path", "ycsb");
        let workload_path = path_or("workload_path", "workload");
        let output_dir = path_or("output_dir", "output");

        Self {
            spec,
            started,
            ycsb_path,
            workload_path,
            output_dir,
            generated_workload: None,
            stats: Statistics::new(),
            log_file: None,
            raw_file: None,
            executor: Box::new(SystemExecutor),
            warned_no_clean: false,
        }
    }

    /// Use `executor` for the clean command instead of spawning processes
    pub fn with_executor(mut self, executor: impl ProcessExecutor + 'static) -> Self {
        self.executor = Box::new(executor);
        self
    }

    fn binding(&self) -> String {
        self.spec.name.to_lowercase()
    }

    fn workload_for_commands(&self) -> &Path {
        self.generated_workload
            .as_deref()
            .unwrap_or(&self.workload_path)
    }

    fn base_command(&self, phase: &str) -> Vec<String> {
        vec![
            self.ycsb_path.display().to_string(),
            phase.to_string(),
            self.binding(),
            "-P".to_string(),
            self.workload_for_commands().display().to_string(),
        ]
    }

    fn stamp(&self) -> String {
        self.started.format("%Y%m%dT%H%M%S").to_string()
    }

    fn open_append(path: &Path) -> Result<BufWriter<File>, TargetError> {
        create_parent(path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| TargetError::io(path, e))?;
        Ok(BufWriter::new(file))
    }

    fn write_export(&self, template: &str, contents: &[u8]) -> Result<(), TargetError> {
        let path = self.make_path(template);
        create_parent(&path)?;
        write_atomic(&path, contents).map_err(|e| TargetError::io(&path, e))
    }
}

fn create_parent(path: &Path) -> Result<(), TargetError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| TargetError::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Parse Java-properties text, dropping comments and blank lines.
fn parse_properties(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .map(|line| match line.find(['=', ':']) {
            Some(idx) => (
                line[..idx].trim().to_string(),
                line[idx + 1..].trim().to_string(),
            ),
            None => (line.to_string(), String::new()),
        })
        .collect()
}

impl Target for YcsbTarget {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn label(&self) -> &str {
        &self.spec.label
    }

    fn sweep(&self) -> &SweepSettings {
        &self.spec.sweep
    }

    fn base_workload_path(&self) -> &Path {
        &self.workload_path
    }

    fn make_path(&self, template: &str) -> PathBuf {
        let file_name = template
            .replacen("{}", &self.spec.tag(), 1)
            .replacen("{}", &self.stamp(), 1);
        self.output_dir.join(file_name)
    }

    fn generate_workload_file(&mut self, dest: &Path) -> Result<(), TargetError> {
        let base = std::fs::read_to_string(&self.workload_path)
            .map_err(|e| TargetError::io(&self.workload_path, e))?;
        let mut properties = parse_properties(&base);
        properties.extend(
            self.spec
                .extraneous
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        let mut contents = String::new();
        for (key, value) in &properties {
            contents.push_str(key);
            contents.push('=');
            contents.push_str(value);
            contents.push('\n');
        }

        create_parent(dest)?;
        std::fs::write(dest, contents).map_err(|e| TargetError::io(dest, e))?;
        self.generated_workload = Some(dest.to_path_buf());
        Ok(())
    }

    fn load_command(&self) -> Vec<String> {
        let mut cmd = self.base_command("load");
        cmd.push("-s".to_string());
        cmd
    }

    fn run_command(&self, mpl: u32) -> Vec<String> {
        let mut cmd = self.base_command("run");
        cmd.extend(["-threads".to_string(), mpl.to_string(), "-s".to_string()]);
        cmd
    }

    fn clean(&mut self) -> Result<(), TargetError> {
        let args: Vec<String> = self
            .spec
            .config
            .string("clean_command")
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        if args.is_empty() {
            if !self.warned_no_clean {
                tracing::warn!(
                    target_tag = %self.spec.tag(),
                    "clean_data is set but no clean_command is configured; data is not cleaned"
                );
                self.warned_no_clean = true;
            }
            return Ok(());
        }

        let output = self.executor.execute(&args)?;
        self.raw_log(&output)
    }

    fn log(
        &mut self,
        message: &str,
        mpl: Option<u32>,
        trial: Option<u32>,
    ) -> Result<(), TargetError> {
        tracing::info!(target_tag = %self.spec.tag(), trial, mpl, "{}", message);

        let mut line = format!("{} [{}]", Utc::now().to_rfc3339(), self.spec.tag());
        if let Some(trial) = trial {
            line.push_str(&format!(" [trial {}]", trial));
        }
        if let Some(mpl) = mpl {
            line.push_str(&format!(" [mpl {}]", mpl));
        }
        line.push(' ');
        line.push_str(message);

        let path = self.make_path("log-{}-{}.txt");
        if self.log_file.is_none() {
            self.log_file = Some(Self::open_append(&path)?);
        }
        if let Some(file) = self.log_file.as_mut() {
            writeln!(file, "{}", line).map_err(|e| TargetError::io(&path, e))?;
        }
        Ok(())
    }

    fn raw_log(&mut self, output: &str) -> Result<(), TargetError> {
        let path = self.make_path("raw-{}-{}.log");
        if self.raw_file.is_none() {
            self.raw_file = Some(Self::open_append(&path)?);
        }
        if let Some(file) = self.raw_file.as_mut() {
            file.write_all(output.as_bytes())
                .and_then(|_| file.flush())
                .map_err(|e| TargetError::io(&path, e))?;
        }
        Ok(())
    }

    fn stats(&self) -> &Statistics {
        &self.stats
    }

    fn add_stats(&mut self, row: StatsRow) {
        self.stats.add(row);
    }

    fn export_stats(&mut self) -> Result<(), TargetError> {
        let meta = ExportMeta {
            target: self.spec.name.clone(),
            label: self.spec.label.clone(),
            generated_at: Utc::now(),
        };
        let json = self.stats.to_json(&meta)?;
        self.write_export("stats-{}-{}.json", json.as_bytes())?;
        let csv = self.stats.to_csv()?;
        self.write_export("stats-{}-{}.csv", &csv)
    }

    fn cleanup(&mut self) -> Result<(), TargetError> {
        if let Some(mut file) = self.log_file.take() {
            let path = self.make_path("log-{}-{}.txt");
            file.flush().map_err(|e| TargetError::io(&path, e))?;
        }
        if let Some(mut file) = self.raw_file.take() {
            let path = self.make_path("raw-{}-{}.log");
            file.flush().map_err(|e| TargetError::io(&path, e))?;
        }
        Ok(())
    }
}
