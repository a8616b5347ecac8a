//! Statistics Rows and Export
//!
//! A `StatsRow` holds the metrics extracted from one benchmark invocation plus
//! the (trial, MPL) coordinates it was taken at. `Statistics` is the
//! append-only collection of rows a target accumulates over a run, with
//! JSON and CSV export.

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::Path;

/// Operation section of a YCSB status report (the bracketed line prefix)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    /// `[READ]`
    Read,
    /// `[UPDATE]`
    Update,
    /// `[INSERT]`
    Insert,
    /// `[SCAN]`
    Scan,
    /// `[READ-MODIFY-WRITE]`
    ReadModifyWrite,
    /// `[DELETE]`
    Delete,
    /// `[START]` (YCSB+T transaction start)
    Start,
    /// `[COMMIT]` (YCSB+T transaction commit)
    Commit,
    /// `[ABORT]` (YCSB+T transaction abort)
    Abort,
}

impl Operation {
    /// All operations in report order
    pub const ALL: [Operation; 9] = [
        Operation::Read,
        Operation::Update,
        Operation::Insert,
        Operation::Scan,
        Operation::ReadModifyWrite,
        Operation::Delete,
        Operation::Start,
        Operation::Commit,
        Operation::Abort,
    ];

    /// Tag as printed between the brackets
    pub fn tag(self) -> &'static str {
        match self {
            Operation::Read => "READ",
            Operation::Update => "UPDATE",
            Operation::Insert => "INSERT",
            Operation::Scan => "SCAN",
            Operation::ReadModifyWrite => "READ-MODIFY-WRITE",
            Operation::Delete => "DELETE",
            Operation::Start => "START",
            Operation::Commit => "COMMIT",
            Operation::Abort => "ABORT",
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Insert => "insert",
            Operation::Scan => "scan",
            Operation::ReadModifyWrite => "rmw",
            Operation::Delete => "delete",
            Operation::Start => "start",
            Operation::Commit => "commit",
            Operation::Abort => "abort",
        }
    }
}

/// Per-operation measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Measure {
    /// Number of completed operations
    Operations,
    /// Mean latency in microseconds
    AverageLatency,
    /// Minimum latency in microseconds
    MinLatency,
    /// Maximum latency in microseconds
    MaxLatency,
    /// 95th percentile latency in microseconds
    P95Latency,
    /// 99th percentile latency in microseconds
    P99Latency,
    /// Operations that returned OK
    ReturnOk,
}

impl Measure {
    /// All measures in report order
    pub const ALL: [Measure; 7] = [
        Measure::Operations,
        Measure::AverageLatency,
        Measure::MinLatency,
        Measure::MaxLatency,
        Measure::P95Latency,
        Measure::P99Latency,
        Measure::ReturnOk,
    ];

    /// Label as printed in the second column of the status line
    pub fn label(self) -> &'static str {
        match self {
            Measure::Operations => "Operations",
            Measure::AverageLatency => "AverageLatency(us)",
            Measure::MinLatency => "MinLatency(us)",
            Measure::MaxLatency => "MaxLatency(us)",
            Measure::P95Latency => "95thPercentileLatency(us)",
            Measure::P99Latency => "99thPercentileLatency(us)",
            Measure::ReturnOk => "Return=OK",
        }
    }

    /// Whether the value is a count (integer) rather than a latency
    pub fn is_count(self) -> bool {
        matches!(self, Measure::Operations | Measure::ReturnOk)
    }

    fn suffix(self) -> &'static str {
        match self {
            Measure::Operations => "ops",
            Measure::AverageLatency => "avg_latency_us",
            Measure::MinLatency => "min_latency_us",
            Measure::MaxLatency => "max_latency_us",
            Measure::P95Latency => "p95_latency_us",
            Measure::P99Latency => "p99_latency_us",
            Measure::ReturnOk => "return_ok",
        }
    }
}

/// A metric that can be extracted from workload output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    /// `[OVERALL], RunTime(ms)`
    RunTime,
    /// `[OVERALL], Throughput(ops/sec)`
    Throughput,
    /// Per-operation measurement
    Op(Operation, Measure),
}

impl Metric {
    /// Stable snake_case name, used as the export column / JSON key
    pub fn name(self) -> String {
        match self {
            Metric::RunTime => "runtime_ms".to_string(),
            Metric::Throughput => "throughput_ops_sec".to_string(),
            Metric::Op(op, measure) => format!("{}_{}", op.prefix(), measure.suffix()),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A coerced metric value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// Counts
    Integer(i64),
    /// Durations, rates and latencies
    Float(f64),
}

impl MetricValue {
    /// Numeric value as f64
    pub fn as_f64(self) -> f64 {
        match self {
            MetricValue::Integer(i) => i as f64,
            MetricValue::Float(f) => f,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Integer(i) => write!(f, "{}", i),
            MetricValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// One row of statistics: the metrics reported by a single benchmark run.
///
/// Metrics the output did not report are absent (`get` returns `None`), which
/// keeps "not reported" distinct from "reported as zero".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsRow {
    metrics: BTreeMap<Metric, MetricValue>,
    mpl: Option<u32>,
    trial: Option<u32>,
}

impl StatsRow {
    /// Build a row from extracted metrics, without sweep coordinates
    pub fn from_metrics(metrics: BTreeMap<Metric, MetricValue>) -> Self {
        Self {
            metrics,
            mpl: None,
            trial: None,
        }
    }

    /// Attach the sweep coordinates this row was measured at
    pub fn at(self, mpl: u32, trial: u32) -> Self {
        Self {
            mpl: Some(mpl),
            trial: Some(trial),
            ..self
        }
    }

    /// Value of a metric, if it was reported
    pub fn get(&self, metric: Metric) -> Option<MetricValue> {
        self.metrics.get(&metric).copied()
    }

    /// Reported metrics in table order
    pub fn metrics(&self) -> impl Iterator<Item = (Metric, MetricValue)> + '_ {
        self.metrics.iter().map(|(m, v)| (*m, *v))
    }

    /// MPL the row was measured at
    pub fn mpl(&self) -> Option<u32> {
        self.mpl
    }

    /// 1-based trial the row was measured in
    pub fn trial(&self) -> Option<u32> {
        self.trial
    }

    /// True when no metric was reported
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl Serialize for StatsRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.metrics.len() + 2))?;
        map.serialize_entry("trial", &self.trial)?;
        map.serialize_entry("mpl", &self.mpl)?;
        for (metric, value) in &self.metrics {
            map.serialize_entry(metric, value)?;
        }
        map.end()
    }
}

/// Identifies the target a statistics export belongs to
#[derive(Debug, Clone, Serialize)]
pub struct ExportMeta {
    /// Target kind as configured (e.g. `mysql`)
    pub target: String,
    /// Instance label, empty when unlabelled
    pub label: String,
    /// When the export was written
    pub generated_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct StatsExport<'a> {
    #[serde(flatten)]
    meta: &'a ExportMeta,
    rows: &'a [StatsRow],
}

/// Append-only collection of statistics rows, in creation order
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    rows: Vec<StatsRow>,
}

impl Statistics {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row
    pub fn add(&mut self, row: StatsRow) {
        self.rows.push(row);
    }

    /// All rows in the order they were added
    pub fn rows(&self) -> &[StatsRow] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no row has been added
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as pretty JSON: the export metadata plus one object per row.
    pub fn to_json(&self, meta: &ExportMeta) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&StatsExport {
            meta,
            rows: &self.rows,
        })
    }

    /// Render as CSV with one column per known metric; unreported metrics are
    /// left empty.
    pub fn to_csv(&self) -> Result<Vec<u8>, csv::Error> {
        let columns: Vec<Metric> = crate::extract::METRIC_TABLE
            .iter()
            .map(|def| def.metric)
            .collect();

        let mut wtr = csv::Writer::from_writer(Vec::new());

        let mut header = vec!["trial".to_string(), "mpl".to_string()];
        header.extend(columns.iter().map(|metric| metric.name()));
        wtr.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![optional_cell(row.trial), optional_cell(row.mpl)];
            record.extend(columns.iter().map(|metric| optional_cell(row.get(*metric))));
            wtr.write_record(&record)?;
        }

        wtr.into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }
}

fn optional_cell<T: fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write `contents` to `path` through a sibling temporary file and a rename,
/// so readers never observe a partially written export.
pub fn write_atomic(path: &Path, contents: impl AsRef<[u8]>) -> std::io::Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(contents.as_ref())?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)
}
