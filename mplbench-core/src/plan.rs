//! Sweep Planner
//!
//! The sweep over a target is the cross product of its trial range and its
//! MPL sequence:
//! - Trials are 1-based and inclusive of the configured count
//! - MPL values start at `min_mpl` and grow by `inc_mpl` while they stay at or
//!   below `max_mpl`

use crate::config::{SweepSettings, TargetSpec};
use std::ops::RangeInclusive;

/// Trial numbers for `trials` repetitions: `1..=trials`
pub fn trial_range(trials: u32) -> RangeInclusive<u32> {
    1..=trials
}

/// Unbounded arithmetic sequence of candidate MPL values starting at `min_mpl`.
///
/// The sequence only ends if the next value would overflow `u32`. Callers
/// apply the `max_mpl` limit themselves; see [`mpl_sequence`] for the bounded
/// form.
pub fn mpl_candidates(min_mpl: u32, inc_mpl: u32) -> impl Iterator<Item = u32> {
    std::iter::successors(Some(min_mpl), move |mpl| mpl.checked_add(inc_mpl))
}

/// MPL values executed for the given settings, in order.
pub fn mpl_sequence(settings: &SweepSettings) -> impl Iterator<Item = u32> + use<> {
    let max_mpl = settings.max_mpl;
    mpl_candidates(settings.min_mpl, settings.inc_mpl).take_while(move |mpl| *mpl <= max_mpl)
}

/// Planned sweep for one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPlan {
    /// Target kind as configured
    pub target: String,
    /// Instance label, empty when unlabelled
    pub label: String,
    /// Trial numbers in execution order
    pub trials: Vec<u32>,
    /// MPL values executed within each trial
    pub mpls: Vec<u32>,
    /// Whether data is cleaned and reloaded before every step
    pub clean_data: bool,
}

impl SweepPlan {
    /// Plan the sweep for a processed target
    pub fn for_target(spec: &TargetSpec) -> Self {
        Self {
            target: spec.name.clone(),
            label: spec.label.clone(),
            trials: trial_range(spec.sweep.trials).collect(),
            mpls: mpl_sequence(&spec.sweep).collect(),
            clean_data: spec.sweep.clean_data,
        }
    }

    /// Number of benchmark invocations this plan performs
    pub fn total_steps(&self) -> usize {
        self.trials.len() * self.mpls.len()
    }
}
