#![warn(missing_docs)]
//! mplbench Core - Benchmark Sweep Orchestration
//!
//! Drives an external workload generator (YCSB / YCSB+T) against configured
//! database targets across a matrix of multiprogramming levels (MPL) and
//! repeated trials:
//! - **Config processing**: TOML sections normalized into typed, validated per-target settings
//! - **Stats extraction**: pattern-based best-effort parsing of the generator's status output
//! - **Incremental export**: statistics written after every MPL step
//! - **Lifecycle hooks**: callbacks fired around every run, target, trial and MPL boundary
//!
//! ## Pipeline
//!
//! ```text
//! mplbench.toml
//!      │
//!      ▼
//! ┌─────────────┐
//! │   config    │  Raw sections → TargetSpec (typed options, label, extraneous keys)
//! └──────┬──────┘
//!        ▼
//! ┌─────────────┐
//! │   runner    │  trials × MPL sweep, hooks at each boundary
//! └──────┬──────┘
//!        ▼
//! ┌─────────────┐
//! │  executor   │  Blocking process invocation, full stdout capture
//! └──────┬──────┘
//!        ▼
//! ┌─────────────┐
//! │   extract   │  stdout → StatsRow
//! └──────┬──────┘
//!        ▼
//! ┌─────────────┐
//! │   stats     │  Append-only rows, JSON/CSV export
//! └─────────────┘
//! ```

mod config;
mod executor;
mod extract;
mod hooks;
mod plan;
mod runner;
mod stats;
mod target;

pub use config::{
    ConfigError, ConfigValue, DEFAULT_SECTION, OPTION_TABLE, OptionDef, OptionKind, RawSection,
    RunnerConfigFile, SUPPORTED_TARGETS, SweepSettings, TargetSpec, TypedConfig, extract_label,
    process_section, process_sections,
};
pub use executor::{ExecutorError, MockExecutor, ProcessExecutor, SystemExecutor};
pub use extract::{METRIC_TABLE, MetricDef, extract_stats};
pub use hooks::{Hook, HookArgs, HookDispatch, HookLocation, HookRegistry};
pub use plan::{SweepPlan, mpl_candidates, mpl_sequence, trial_range};
pub use runner::{Runner, RunnerError};
pub use stats::{
    ExportMeta, Measure, Metric, MetricValue, Operation, Statistics, StatsRow, write_atomic,
};
pub use target::{Target, TargetError, YcsbTarget};
