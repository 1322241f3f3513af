//! Controller configuration.

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Tuning knobs for the quality controller.
///
/// Defaults assume roughly 30 updates per second: the recency and anomaly
/// windows both span about one second of ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Exponential decay applied to every option's recent stats once per
    /// update.
    #[serde(default = "default_recent_alpha")]
    pub recent_alpha: f64,

    /// Decay for the recent-anomaly EMA.
    #[serde(default = "default_anomaly_alpha")]
    pub anomaly_alpha: f64,

    /// Samples per option considered sufficient calibration.
    #[serde(default = "default_measure_quota")]
    pub measure_quota: f64,

    /// Value bonus granted to under-sampled options, steering the solver
    /// toward trying them.
    #[serde(default)]
    pub explore_value: f64,

    /// Standard-deviation margin used when forming the capacity from a
    /// plain limit.
    #[serde(default = "default_pessimism_sd")]
    pub pessimism_sd: f64,

    /// Solver precision; net value lands within `(1 − 1/precision)` of
    /// optimal.
    #[serde(default = "default_precision")]
    pub precision: usize,
}

fn default_recent_alpha() -> f64 {
    1.0 - 1.0 / 30.0
}

fn default_anomaly_alpha() -> f64 {
    1.0 - 1.0 / 30.0
}

fn default_measure_quota() -> f64 {
    30.0
}

fn default_pessimism_sd() -> f64 {
    3.0
}

fn default_precision() -> usize {
    50
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            recent_alpha: default_recent_alpha(),
            anomaly_alpha: default_anomaly_alpha(),
            measure_quota: default_measure_quota(),
            explore_value: 0.0,
            pessimism_sd: default_pessimism_sd(),
            precision: default_precision(),
        }
    }
}

impl ControllerConfig {
    /// Preset that tries options sooner and trusts them on fewer samples.
    pub fn exploratory() -> Self {
        Self {
            measure_quota: 10.0,
            explore_value: 1.0,
            ..Default::default()
        }
    }

    /// Preset with a wider sigma margin and a larger quota.
    pub fn cautious() -> Self {
        Self {
            measure_quota: 60.0,
            pessimism_sd: 4.0,
            ..Default::default()
        }
    }

    /// Check every field against its valid range.
    pub fn validate(&self) -> Result<()> {
        if !(self.recent_alpha > 0.0 && self.recent_alpha < 1.0) {
            return Err(Error::invalid_config(format!(
                "recent_alpha must be in (0, 1), got {}",
                self.recent_alpha
            )));
        }
        if !(self.anomaly_alpha > 0.0 && self.anomaly_alpha < 1.0) {
            return Err(Error::invalid_config(format!(
                "anomaly_alpha must be in (0, 1), got {}",
                self.anomaly_alpha
            )));
        }
        if !(self.measure_quota > 0.0) {
            return Err(Error::invalid_config(format!(
                "measure_quota must be positive, got {}",
                self.measure_quota
            )));
        }
        if !(self.explore_value >= 0.0) {
            return Err(Error::invalid_config(format!(
                "explore_value must be nonnegative, got {}",
                self.explore_value
            )));
        }
        if !(self.pessimism_sd >= 0.0) {
            return Err(Error::invalid_config(format!(
                "pessimism_sd must be nonnegative, got {}",
                self.pessimism_sd
            )));
        }
        if self.precision == 0 {
            return Err(Error::invalid_config("precision must be nonzero"));
        }
        Ok(())
    }
}
