//! Tunable parameters of the dispatch engine.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::order::Time;

const DEFAULT_VALUE_WEIGHT: f64 = 0.3;
const DEFAULT_TIME_WEIGHT: f64 = 0.7;
/// Order values are divided by this before weighting.
const DEFAULT_VALUE_NORMALIZER: f64 = 50.0;
const DEFAULT_PRIORITY_DECIMALS: u32 = 4;

/// Weights of the dispatch priority formula
/// `value_weight * (order_value / value_normalizer) - time_weight * creation_time`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchParams {
    pub value_weight: f64,
    pub time_weight: f64,
    pub value_normalizer: f64,
    /// Priorities are rounded to this many decimal places before they are used
    /// as index keys.
    pub priority_decimals: u32,
}

impl Default for DispatchParams {
    fn default() -> Self {
        Self {
            value_weight: DEFAULT_VALUE_WEIGHT,
            time_weight: DEFAULT_TIME_WEIGHT,
            value_normalizer: DEFAULT_VALUE_NORMALIZER,
            priority_decimals: DEFAULT_PRIORITY_DECIMALS,
        }
    }
}

impl DispatchParams {
    /// Parse parameters from JSON. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_value_weight(mut self, weight: f64) -> Self {
        self.value_weight = weight;
        self
    }

    pub fn with_time_weight(mut self, weight: f64) -> Self {
        self.time_weight = weight;
        self
    }

    pub fn with_value_normalizer(mut self, normalizer: f64) -> Self {
        self.value_normalizer = normalizer;
        self
    }

    pub fn with_priority_decimals(mut self, decimals: u32) -> Self {
        self.priority_decimals = decimals;
        self
    }

    /// Rounded dispatch priority. Earlier creation and higher value both
    /// raise it.
    pub fn priority(&self, order_value: u64, creation_time: Time) -> f64 {
        let raw = self.value_weight * (order_value as f64 / self.value_normalizer)
            - self.time_weight * creation_time as f64;
        round_to(raw, self.priority_decimals)
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    let rounded = (value * scale).round() / scale;
    // -0.0 and 0.0 must land on the same index key.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
