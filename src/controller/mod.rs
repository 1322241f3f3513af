//! Profile-driven quality controller.
//!
//! The controller owns the live [`Profile`], an optional past-run profile,
//! the anomaly tracker, and the knapsack solver. Every tick it harvests
//! measurements from its registered settings, refreshes per-option burden
//! estimates, solves for the best choices under the capacity, and applies
//! them back to the settings.
//!
//! Within one [`update`](QualityController::update), harvest strictly
//! precedes decide: the profile observed while deciding reflects every
//! measurement harvested that tick.

mod anomaly;
mod config;
mod estimation;
#[cfg(test)]
mod tests;

pub use anomaly::AnomalyTracker;
pub use config::ControllerConfig;

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, warn};

use crate::economy::{NormalBurden, NormalCapacity, NormalEconomy};
use crate::profile::{Measurement, Profile, ProfileSnapshot};
use crate::setting::SettingHandle;
use crate::solver::{Decision, SolveStats, Solver};

use estimation::{past_present_ratio, EstimationInputs};

static NEXT_CONTROLLER_ID: AtomicU64 = AtomicU64::new(1);

/// One registered setting. Its decision lives in a parallel vector so the
/// whole batch can be handed to the solver as one slice.
struct Slot {
    handle: SettingHandle,
    id: String,
}

/// Outcome of one controller tick.
#[derive(Debug, Clone, Copy)]
pub struct UpdateSummary {
    /// False when every combination exceeded capacity and the
    /// lightest-burden choices were applied instead. A normal outcome,
    /// not an error.
    pub within_capacity: bool,
    /// Predicted net burden of the applied choices.
    pub net_burden: NormalBurden,
    /// Net value of the applied choices.
    pub net_value: f64,
    /// Measurements harvested this tick.
    pub harvested: usize,
    /// Anomaly multiplier after this tick's harvest.
    pub anomaly_recent: f64,
    /// Past/present scale factor, when enough data overlaps.
    pub past_present_ratio: Option<f64>,
}

/// Online, self-calibrating selector of quality-setting options.
pub struct QualityController {
    config: ControllerConfig,
    profile: Profile,
    past: Option<Profile>,
    anomaly: AnomalyTracker,
    solver: Solver<NormalEconomy>,
    slots: Vec<Slot>,
    decisions: Vec<Decision<NormalEconomy>>,
    id: NonZeroU64,
}

impl Default for QualityController {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}

impl QualityController {
    pub fn new(config: ControllerConfig) -> Self {
        let id = NonZeroU64::new(NEXT_CONTROLLER_ID.fetch_add(1, Ordering::Relaxed))
            .expect("controller id counter starts at one");
        Self {
            config,
            profile: Profile::new(),
            past: None,
            anomaly: AnomalyTracker::new(),
            solver: Solver::new(),
            slots: Vec::new(),
            decisions: Vec::new(),
            id,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// The live measurement profile.
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn anomaly(&self) -> &AnomalyTracker {
        &self.anomaly
    }

    /// Solver statistics from the most recent decide.
    pub fn solve_stats(&self) -> &SolveStats<NormalBurden> {
        self.solver.stats()
    }

    /// Adopt a prior run's profile; its lifetime stats seed estimates for
    /// options this run has not measured yet.
    pub fn set_past_profile(&mut self, profile: Profile) {
        self.past = Some(profile);
    }

    /// Adopt a prior run's persisted snapshot.
    pub fn load_past_profile(&mut self, snapshot: &ProfileSnapshot) {
        self.past = Some(Profile::from_snapshot(snapshot));
    }

    pub fn clear_past_profile(&mut self) {
        self.past = None;
    }

    /// Snapshot the live profile for persistence.
    pub fn snapshot(&self) -> ProfileSnapshot {
        ProfileSnapshot::capture(&self.profile)
    }

    pub fn setting_count(&self) -> usize {
        self.slots.len()
    }

    /// The choice last applied to a registered setting.
    pub fn choice(&self, id: &str) -> Option<usize> {
        self.slot_index(id).map(|i| self.decisions[i].choice())
    }

    /// Register a setting. Re-registering under this controller is a
    /// no-op returning true; a setting owned by another controller is
    /// rejected.
    pub fn register(&mut self, handle: SettingHandle) -> bool {
        let id = {
            let setting = handle.borrow();
            assert!(
                !setting.option_values().is_empty(),
                "setting {:?} has no options",
                setting.id()
            );
            assert!(
                setting.choice_default() < setting.option_values().len(),
                "default choice out of range for setting {:?}",
                setting.id()
            );
            match setting.binding().owner() {
                Some(owner) if owner == self.id => return true,
                Some(_) => {
                    warn!(
                        setting = setting.id(),
                        "setting is owned by another controller; rejecting registration"
                    );
                    return false;
                }
                None => setting.binding().bind(self.id),
            }
            setting.id().to_string()
        };

        debug!(setting = %id, "setting registered");
        self.slots.push(Slot { handle, id });
        self.decisions.push(Decision::new());
        true
    }

    /// Unregister by id, releasing the ownership link. Returns false when
    /// the id is not registered here.
    pub fn unregister(&mut self, id: &str) -> bool {
        let Some(index) = self.slot_index(id) else {
            return false;
        };
        let slot = self.slots.remove(index);
        self.decisions.remove(index);
        slot.handle.borrow().binding().release();
        debug!(setting = %id, "setting unregistered");
        true
    }

    /// One controller tick: harvest measurements, then decide and apply.
    ///
    /// `limit` bounds the mean net burden; the configured sigma margin is
    /// applied on top, and precision comes from the config.
    pub fn update(&mut self, limit: f64) -> UpdateSummary {
        let capacity = NormalCapacity::new(limit, self.config.pessimism_sd);
        self.update_with(capacity, self.config.precision)
    }

    /// One tick with an explicit capacity and precision.
    pub fn update_with(&mut self, capacity: NormalCapacity, precision: usize) -> UpdateSummary {
        let harvested = self.harvest();
        self.decide(capacity, precision, harvested)
    }

    fn slot_index(&self, id: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.id == id)
    }

    /// Drain every setting's measurement queue into the profile and feed
    /// the anomaly tracker.
    fn harvest(&mut self) -> usize {
        // Age recency before new samples arrive, so the window slides even
        // on ticks with no measurements.
        self.profile.decay_recent(self.config.recent_alpha);

        let mut harvested = 0;
        let mut sum_typical = 0.0;
        let mut sum_current = 0.0;

        for slot in &self.slots {
            let mut setting = slot.handle.borrow_mut();
            let option_count = setting.option_values().len();

            while let Some(measurement) = setting.poll_measurement() {
                assert!(
                    measurement.choice < option_count,
                    "measurement choice {} out of range for setting {:?}",
                    measurement.choice,
                    slot.id
                );
                // Negative costs are measurement noise.
                let burden = measurement.burden.max(0.0);

                if let Some(task) = self.profile.find(&slot.id) {
                    let record = task.record(measurement.choice);
                    if record.has_data() {
                        sum_typical += record.full.mean();
                        sum_current += burden;
                    }
                }
                self.profile.collect(
                    &slot.id,
                    option_count,
                    Measurement {
                        choice: measurement.choice,
                        burden,
                    },
                );
                harvested += 1;
            }

            if let Some(task) = self.profile.find_mut(&slot.id) {
                if !task.fully_explored() && task.meets_quota(self.config.measure_quota) {
                    task.set_fully_explored();
                    info!(setting = %slot.id, "every option measured to quota");
                }
            }
        }

        self.anomaly
            .observe(sum_typical, sum_current, self.config.anomaly_alpha);
        harvested
    }

    /// Refresh burden estimates, run the solver, and apply the choices.
    fn decide(
        &mut self,
        capacity: NormalCapacity,
        precision: usize,
        harvested: usize,
    ) -> UpdateSummary {
        let ratio = self
            .past
            .as_ref()
            .and_then(|past| past_present_ratio(&self.profile, past));

        let inputs = EstimationInputs {
            profile: &self.profile,
            past: self.past.as_ref(),
            ratio,
            anomaly_recent: self.anomaly.recent(),
            config: &self.config,
        };
        for (slot, decision) in self.slots.iter().zip(self.decisions.iter_mut()) {
            let setting = slot.handle.borrow();
            inputs.build_decision(
                &slot.id,
                setting.option_values(),
                setting.choice_default(),
                decision,
            );
        }

        let within_capacity = self.solver.solve(&mut self.decisions, &capacity, precision);

        for (slot, decision) in self.slots.iter().zip(self.decisions.iter()) {
            slot.handle.borrow_mut().choice_set(decision.choice());
        }

        let stats = self.solver.stats();
        if !within_capacity && !self.slots.is_empty() {
            debug!(
                limit = capacity.limit,
                predicted = stats.chosen.net_burden.mean,
                "all combinations exceed capacity; applied lightest choices"
            );
        }
        debug!(
            harvested,
            within_capacity,
            net_value = stats.chosen.net_value,
            net_burden_mean = stats.chosen.net_burden.mean,
            anomaly = self.anomaly.recent(),
            ratio = ?ratio,
            iterations = stats.iterations,
            "controller tick"
        );

        UpdateSummary {
            within_capacity,
            net_burden: stats.chosen.net_burden,
            net_value: stats.chosen.net_value,
            harvested,
            anomaly_recent: self.anomaly.recent(),
            past_present_ratio: ratio,
        }
    }
}

impl Drop for QualityController {
    fn drop(&mut self) {
        for slot in &self.slots {
            slot.handle.borrow().binding().release();
        }
    }
}
