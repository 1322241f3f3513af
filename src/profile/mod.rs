//! Per-task burden profiles.
//!
//! A [`Profile`] aggregates cost measurements for *tasks* identified by
//! stable string ids. Each task has a fixed number of selectable options;
//! every option carries two accumulators: `full` over the whole run and
//! `recent` under exponential decay.
//!
//! The option count for an id is fixed at first collection. Re-collecting
//! under the same id with a different count is a programmer error and
//! asserts.

mod snapshot;

pub use snapshot::ProfileSnapshot;

use std::collections::HashMap;

use crate::stats::BurdenStat;

/// A single cost observation: which option was active and what it cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Index into the task's option array.
    pub choice: usize,
    /// Observed cost. The controller clamps negatives to zero before
    /// collection.
    pub burden: f64,
}

/// Lifetime and recency statistics for one option of one task.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionRecord {
    /// Every sample from this run.
    pub full: BurdenStat,
    /// Exponentially aged samples; favors current conditions.
    pub recent: BurdenStat,
}

impl OptionRecord {
    /// Whether this option has ever been measured this run.
    pub fn has_data(&self) -> bool {
        self.full.has_data()
    }
}

/// Profile entry for one task id.
#[derive(Debug, Clone)]
pub struct Task {
    records: Vec<OptionRecord>,
    data_count: u64,
    fully_explored: bool,
}

impl Task {
    fn new(option_count: usize) -> Self {
        assert!(option_count > 0, "task must have at least one option");
        Self {
            records: vec![OptionRecord::default(); option_count],
            data_count: 0,
            fully_explored: false,
        }
    }

    /// Rebuild a task from per-option (count, mean, deviation) summaries.
    pub(crate) fn from_summaries(summaries: &[(f64, f64, f64)]) -> Self {
        let mut task = Self::new(summaries.len());
        for (record, &(count, mean, deviation)) in task.records.iter_mut().zip(summaries) {
            record.full = BurdenStat::from_summary(count, mean, deviation);
        }
        task
    }

    pub fn option_count(&self) -> usize {
        self.records.len()
    }

    /// Total measurements collected for this task.
    pub fn data_count(&self) -> u64 {
        self.data_count
    }

    pub fn records(&self) -> &[OptionRecord] {
        &self.records
    }

    /// Stats for one option. Out-of-range indices are contract violations.
    pub fn record(&self, choice: usize) -> &OptionRecord {
        &self.records[choice]
    }

    /// True when every option has at least `quota` lifetime samples.
    pub fn meets_quota(&self, quota: f64) -> bool {
        self.records.iter().all(|r| r.full.count() >= quota)
    }

    /// Whether the quota flag has been latched by the controller.
    pub fn fully_explored(&self) -> bool {
        self.fully_explored
    }

    pub(crate) fn set_fully_explored(&mut self) {
        self.fully_explored = true;
    }
}

/// Measurement aggregate for all known tasks, keyed by id.
///
/// Tasks are created lazily on first [`collect`](Profile::collect) or
/// [`assimilate`](Profile::assimilate).
#[derive(Debug, Clone, Default)]
pub struct Profile {
    tasks: HashMap<String, Task>,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a profile from a persisted snapshot (scale factor 1).
    pub fn from_snapshot(snapshot: &ProfileSnapshot) -> Self {
        let mut profile = Self::new();
        profile.assimilate_snapshot(snapshot, 1.0);
        profile
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Iterate over known tasks. Order is unspecified.
    pub fn tasks(&self) -> impl Iterator<Item = (&str, &Task)> {
        self.tasks.iter().map(|(id, task)| (id.as_str(), task))
    }

    /// Profile data for a task, if any has been collected.
    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub(crate) fn find_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.get_mut(id)
    }

    fn task_init(&mut self, id: &str, option_count: usize) -> &mut Task {
        let task = self
            .tasks
            .entry(id.to_string())
            .or_insert_with(|| Task::new(option_count));
        assert_eq!(
            task.option_count(),
            option_count,
            "option count changed for task {id:?}"
        );
        task
    }

    /// Record one measurement into both accumulators of the chosen option.
    pub fn collect(&mut self, id: &str, option_count: usize, measurement: Measurement) -> &Task {
        assert!(
            measurement.choice < option_count,
            "measurement choice {} out of range for task {id:?} ({option_count} options)",
            measurement.choice
        );
        let task = self.task_init(id, option_count);
        task.data_count += 1;
        let record = &mut task.records[measurement.choice];
        record.full.push(measurement.burden);
        record.recent.push(measurement.burden);
        task
    }

    /// Pool another task's lifetime stats into ours, with every incoming
    /// mean scaled by `scale` (and variances by `scale²`).
    pub fn assimilate(&mut self, id: &str, data: &Task, scale: f64) -> &Task {
        let task = self.task_init(id, data.option_count());
        for (record, incoming) in task.records.iter_mut().zip(data.records.iter()) {
            let mut scaled = incoming.full;
            scaled.scale(scale);
            record.full = record.full.pool(&scaled);
        }
        task
    }

    /// Age every option's recent accumulator. Applied once per controller
    /// tick so recency keeps sliding even when no measurements arrive.
    pub fn decay_recent(&mut self, alpha: f64) {
        for task in self.tasks.values_mut() {
            for record in &mut task.records {
                record.recent.decay(alpha);
            }
        }
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}
