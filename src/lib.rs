#![deny(unreachable_pub)]

//! Online, self-calibrating quality-settings control.
//!
//! `frametune` keeps a soft-real-time application inside a per-frame cost
//! budget by choosing, every tick, one option for each controllable
//! quality setting. Costs are learned from live measurements — optionally
//! seeded by a prior run's persisted profile — and the selection is a
//! multiple-choice knapsack solved by a fully-polynomial approximation.
//!
//! The crate splits into:
//! - [`economy`]: the burden algebra (scalar, or mean/variance with a
//!   sigma-margin capacity),
//! - [`stats`] and [`profile`]: per-(setting, option) measurement
//!   statistics and their persisted form,
//! - [`solver`]: the knapsack FPTAS,
//! - [`controller`]: the per-tick harvest/decide loop,
//! - [`setting`]: the application-facing setting contract.

mod consts;
pub mod controller;
pub mod economy;
mod errors;
pub mod logging;
pub mod profile;
pub mod setting;
pub mod solver;
pub mod stats;

// Re-exports
pub use consts::EPSILON;
pub use controller::{AnomalyTracker, ControllerConfig, QualityController, UpdateSummary};
pub use economy::{
    BurdenArith, Economy, NormalBurden, NormalCapacity, NormalEconomy, ScalarEconomy,
};
pub use errors::{Error, Result};
pub use logging::{init_logging, targets as log_targets, LogConfig, LogFormat};
pub use profile::{Measurement, OptionRecord, Profile, ProfileSnapshot, Task};
pub use setting::{ArraySetting, ControllerBinding, Setting, SettingHandle};
pub use solver::{Decision, Item, NetStats, SolveStats, Solver};
pub use stats::BurdenStat;
