//! Persisted profile form.
//!
//! Only the lifetime (`full`) accumulator is persisted, as
//! `id → [[count, mean, std_dev], …]` with one triple per option. `recent`
//! always restarts empty on load. Standard deviation is stored instead of
//! variance for numeric headroom at small magnitudes.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Profile, Task};
use crate::errors::{Error, Result};

/// Serializable image of a profile's lifetime statistics.
///
/// Keys are task ids; ids may not contain control characters or double
/// quotes. The map is ordered so snapshots diff cleanly between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileSnapshot {
    tasks: BTreeMap<String, Vec<(f64, f64, f64)>>,
}

impl ProfileSnapshot {
    /// Capture the lifetime statistics of every task in `profile`.
    pub fn capture(profile: &Profile) -> Self {
        let tasks = profile
            .tasks()
            .map(|(id, task)| {
                let triples = task
                    .records()
                    .iter()
                    .map(|r| (r.full.count(), r.full.mean(), r.full.deviation()))
                    .collect();
                (id.to_string(), triples)
            })
            .collect();
        Self { tasks }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Check ids and stat triples against the data model.
    pub fn validate(&self) -> Result<()> {
        for (id, triples) in &self.tasks {
            validate_task_id(id)?;
            if triples.is_empty() {
                return Err(Error::invalid_snapshot(format!(
                    "task {id:?} has no options"
                )));
            }
            for (index, &(count, mean, deviation)) in triples.iter().enumerate() {
                if !count.is_finite() || count < 0.0 {
                    return Err(Error::invalid_snapshot(format!(
                        "task {id:?} option {index}: bad count {count}"
                    )));
                }
                if !mean.is_finite() || mean < 0.0 {
                    return Err(Error::invalid_snapshot(format!(
                        "task {id:?} option {index}: bad mean {mean}"
                    )));
                }
                if !deviation.is_finite() || deviation < 0.0 {
                    return Err(Error::invalid_snapshot(format!(
                        "task {id:?} option {index}: bad deviation {deviation}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Write the snapshot as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.validate()?;
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| Error::snapshot_io(path, e))
    }

    /// Read and validate a snapshot from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::snapshot_io(path, e))?;
        let snapshot: Self = serde_json::from_str(&text)?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

/// Ids may not contain control characters or double quotes.
fn validate_task_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::InvalidTaskId {
            id: id.to_string(),
            reason: "empty",
        });
    }
    if id.chars().any(|c| c.is_control() || c == '"') {
        return Err(Error::InvalidTaskId {
            id: id.to_string(),
            reason: "contains a control character or double quote",
        });
    }
    Ok(())
}

impl Profile {
    /// Merge a snapshot's tasks into this profile, scaling incoming means
    /// by `scale` (and variances by `scale²`) before pooling.
    pub fn assimilate_snapshot(&mut self, snapshot: &ProfileSnapshot, scale: f64) {
        for (id, triples) in &snapshot.tasks {
            let task = Task::from_summaries(triples);
            self.assimilate(id, &task, scale);
        }
    }
}
