//! Stats Extraction
//!
//! Best-effort parsing of workload generator output. Every metric has a
//! pattern and a coercion; a metric whose pattern doesn't match is simply
//! absent from the resulting row.
//!
//! The patterns follow the YCSB status report format:
//!
//! ```text
//! [OVERALL], RunTime(ms), 10110.0
//! [OVERALL], Throughput(ops/sec), 9891.196834817013
//! [READ], Operations, 50000
//! [READ], AverageLatency(us), 412.33
//! [READ], 95thPercentileLatency(us), 901
//! ```

use crate::stats::{Measure, Metric, MetricValue, Operation, StatsRow};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

const FLOAT_CAPTURE: &str = r"([-+]?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)";
const INTEGER_CAPTURE: &str = r"(\d+)";

/// A metric together with the pattern that locates it and the coercion
/// applied to the captured text.
#[derive(Debug, Clone)]
pub struct MetricDef {
    /// Metric this entry produces
    pub metric: Metric,
    /// Pattern searched for in the output; group 1 is the value
    pub pattern: Regex,
    /// Converts the captured text into a value
    pub coerce: fn(&str) -> Option<MetricValue>,
}

fn coerce_integer(raw: &str) -> Option<MetricValue> {
    raw.trim().parse().ok().map(MetricValue::Integer)
}

fn coerce_float(raw: &str) -> Option<MetricValue> {
    raw.trim().parse().ok().map(MetricValue::Float)
}

fn status_line(section: &str, label: &str, capture: &str) -> Regex {
    let pattern = format!(
        r"(?m)^\[{}\],\s*{},\s*{}",
        regex::escape(section),
        regex::escape(label),
        capture
    );
    // Built from escaped literals and fixed captures
    Regex::new(&pattern).unwrap_or_else(|e| panic!("invalid metric pattern {pattern}: {e}"))
}

/// The fixed metric table, in report order.
pub static METRIC_TABLE: LazyLock<Vec<MetricDef>> = LazyLock::new(|| {
    let mut table = vec![
        MetricDef {
            metric: Metric::RunTime,
            pattern: status_line("OVERALL", "RunTime(ms)", FLOAT_CAPTURE),
            coerce: coerce_float,
        },
        MetricDef {
            metric: Metric::Throughput,
            pattern: status_line("OVERALL", "Throughput(ops/sec)", FLOAT_CAPTURE),
            coerce: coerce_float,
        },
    ];

    for op in Operation::ALL {
        for measure in Measure::ALL {
            let (capture, coerce): (&str, fn(&str) -> Option<MetricValue>) = if measure.is_count()
            {
                (INTEGER_CAPTURE, coerce_integer)
            } else {
                (FLOAT_CAPTURE, coerce_float)
            };
            table.push(MetricDef {
                metric: Metric::Op(op, measure),
                pattern: status_line(op.tag(), measure.label(), capture),
                coerce,
            });
        }
    }

    table
});

/// Extract a statistics row from workload output using the fixed metric table.
pub fn extract_stats(output: &str) -> StatsRow {
    extract_with(&METRIC_TABLE, output)
}

/// Extract a statistics row using an explicit metric table.
pub(crate) fn extract_with(table: &[MetricDef], output: &str) -> StatsRow {
    let mut metrics = BTreeMap::new();

    for def in table {
        let Some(raw) = first_group(&def.pattern, output) else {
            continue;
        };
        match (def.coerce)(raw) {
            Some(value) => {
                metrics.insert(def.metric, value);
            }
            None => {
                tracing::debug!(metric = %def.metric, raw, "captured value failed coercion");
            }
        }
    }

    StatsRow::from_metrics(metrics)
}

/// Text of the first capture group of the first match, or `None` when the
/// pattern doesn't match or has no capture group.
fn first_group<'t>(pattern: &Regex, text: &'t str) -> Option<&'t str> {
    if pattern.captures_len() < 2 {
        return None;
    }
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
