//! Per-option burden synthesis.
//!
//! Turns profile statistics, the past-run profile, the anomaly multiplier,
//! and the exploration policy into the (burden, value) items handed to the
//! solver. All estimates are normal-economy burdens so the solver can
//! consolidate independent cost noise.

use tracing::warn;

use crate::consts::EPSILON;
use crate::economy::{Economy, NormalBurden, NormalEconomy};
use crate::profile::{Profile, Task};
use crate::solver::Decision;

use super::config::ControllerConfig;

/// Scale factor bridging a past run's profile to the present run.
///
/// Weighted mean of per-option mean ratios over every (id, option) pair
/// with data in both runs, weighted by
/// `sqrt(count_now · count_past · mean_now · mean_past)`, so well-sampled
/// and expensive options dominate. `None` until at least one pair
/// overlaps; past estimates are not applicable that tick.
pub(crate) fn past_present_ratio(current: &Profile, past: &Profile) -> Option<f64> {
    let mut weight_sum = 0.0;
    let mut ratio_sum = 0.0;

    for (id, task) in current.tasks() {
        let Some(past_task) = past.find(id) else {
            continue;
        };
        if past_task.option_count() != task.option_count() {
            continue;
        }
        for (record, past_record) in task.records().iter().zip(past_task.records()) {
            if !record.has_data() || !past_record.has_data() {
                continue;
            }
            let (mean_now, mean_past) = (record.full.mean(), past_record.full.mean());
            if mean_now <= EPSILON || mean_past <= EPSILON {
                continue;
            }
            let weight =
                (record.full.count() * past_record.full.count() * mean_now * mean_past).sqrt();
            weight_sum += weight;
            ratio_sum += weight * (mean_now / mean_past);
        }
    }

    (weight_sum > 0.0).then(|| ratio_sum / weight_sum)
}

/// Everything the per-setting estimator needs for one tick.
pub(crate) struct EstimationInputs<'a> {
    pub profile: &'a Profile,
    pub past: Option<&'a Profile>,
    pub ratio: Option<f64>,
    pub anomaly_recent: f64,
    pub config: &'a ControllerConfig,
}

impl EstimationInputs<'_> {
    /// Rebuild `decision`'s items for one setting.
    pub(crate) fn build_decision(
        &self,
        id: &str,
        values: &[f64],
        choice_default: usize,
        decision: &mut Decision<NormalEconomy>,
    ) {
        decision.clear_items();

        let task = self.profile.find(id).filter(|t| t.data_count() > 0);
        let past_task = self.past.and_then(|p| p.find(id)).filter(|t| {
            if t.option_count() != values.len() {
                warn!(
                    setting = id,
                    past = t.option_count(),
                    current = values.len(),
                    "past profile option count differs; ignoring its data"
                );
                return false;
            }
            true
        });
        let past_applicable = past_task.is_some() && self.ratio.is_some();

        // Without data of any kind the solver must preserve the default:
        // zero burden for it, infinite for everything else.
        if !(task.is_some() || past_applicable) {
            lock_to_default(values, choice_default, decision);
            return;
        }
        let Some(blind_guess) = self.blind_guess(task, past_task) else {
            lock_to_default(values, choice_default, decision);
            return;
        };

        // Exploration bookkeeping over the whole setting: how many samples
        // are still owed against the quota versus how many exist. The
        // damping factor shrinks unexplored estimates more the more is
        // already known, so stragglers get tried; with no data at all it
        // stays at 1 and the blind guess is used untouched.
        let quota = self.config.measure_quota;
        let mut data_missing = 0.0;
        let mut data_total = 0.0;
        for index in 0..values.len() {
            let current_count = task.map_or(0.0, |t| t.record(index).full.count());
            let past_count = past_task.map_or(0.0, |t| t.record(index).full.count());
            data_missing += (quota - current_count - past_count).max(0.0);
            data_total += current_count + past_count;
        }
        let unexplored_burden_mod = if data_missing > 0.0 {
            data_missing / data_missing.max(data_total)
        } else {
            1.0
        };

        for (index, &option_value) in values.iter().enumerate() {
            let current = task.map(|t| t.record(index)).filter(|r| r.has_data());
            let past_record = past_task.map(|t| t.record(index)).filter(|r| r.has_data());

            let prior_burden = match (past_record, self.ratio) {
                (Some(past_record), Some(ratio)) => past_record.full.burden_norm() * ratio,
                _ => blind_guess,
            };

            let mut burden = match current {
                // Calibrated: the recent window already reflects current
                // conditions, no anomaly scaling needed.
                Some(record) if record.full.count() >= quota => record.recent.burden_norm(),
                // Partially measured: blend this run's (anomaly-scaled)
                // estimate toward the prior by sample fraction.
                Some(record) => {
                    let mix = (record.full.count() / quota).min(1.0);
                    record.full.burden_norm() * self.anomaly_recent * mix
                        + prior_burden * (1.0 - mix)
                }
                None => prior_burden,
            };

            let mut value = option_value;
            let samples = current.map_or(0.0, |r| r.full.count())
                + past_record.map_or(0.0, |r| r.full.count());
            if samples < quota {
                value += self.config.explore_value;
                burden *= unexplored_burden_mod;
            }

            decision.push(burden, value);
        }
    }

    /// Lightest available estimate across the setting's options: the
    /// optimistic stand-in for options never measured.
    fn blind_guess(&self, task: Option<&Task>, past_task: Option<&Task>) -> Option<NormalBurden> {
        let quota = self.config.measure_quota;
        let mut best: Option<NormalBurden> = None;
        let mut consider = |candidate: NormalBurden| {
            if best.map_or(true, |b| candidate.mean < b.mean) {
                best = Some(candidate);
            }
        };

        if let Some(task) = task {
            for record in task.records() {
                if !record.has_data() {
                    continue;
                }
                let estimate = if record.full.count() >= quota {
                    record.recent.burden_norm()
                } else {
                    record.full.burden_norm() * self.anomaly_recent
                };
                consider(estimate);
            }
        }
        if let (Some(past_task), Some(ratio)) = (past_task, self.ratio) {
            for record in past_task.records() {
                if record.has_data() {
                    consider(record.full.burden_norm() * ratio);
                }
            }
        }
        best
    }
}

/// Emit trivial/infinite burdens so the solver preserves the default
/// choice.
fn lock_to_default(values: &[f64], choice_default: usize, decision: &mut Decision<NormalEconomy>) {
    for (index, &value) in values.iter().enumerate() {
        let burden = if index == choice_default {
            NormalEconomy::zero()
        } else {
            NormalEconomy::infinite()
        };
        decision.push(burden, value);
    }
}
