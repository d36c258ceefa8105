//! Reward derivation for service mode.
//!
//! The scorer reports an overall score in its native range. Callers get that score
//! rescaled to `[0, 1]`, a binary success label, and the sub-scores flattened into a
//! single reasoning string.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{DEFAULT_GROUP_TAG, SUCCESS_THRESHOLD};
use crate::oracle::EditScore;

/// Native score range of the scorer. `min < max` is checked by the config layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardScale {
    pub min: f64,
    pub max: f64,
}

impl Default for RewardScale {
    fn default() -> Self {
        Self { min: 0.0, max: 10.0 }
    }
}

impl RewardScale {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Maps `overall` linearly onto `[0, 1]`, clamping out-of-range scores.
    pub fn rescale(&self, overall: f64) -> f64 {
        let span = self.max - self.min;
        if span.is_nan() || span <= 0.0 || !overall.is_finite() {
            return 0.0;
        }
        ((overall - self.min) / span).clamp(0.0, 1.0)
    }
}

/// One per item of a service request, in item order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardPayload {
    /// `1.0` when `reward` reaches the success threshold, else `0.0`.
    pub score: f64,
    pub reward: f64,
    pub reasoning: String,
    pub strict_reward: f64,
    pub meta_data: Map<String, Value>,
    pub group_reward: BTreeMap<String, f64>,
    pub group_strict_reward: BTreeMap<String, f64>,
}

impl RewardPayload {
    pub fn derive(score: &EditScore, meta_data: Map<String, Value>, scale: &RewardScale) -> Self {
        let reward = scale.rescale(score.overall);
        let tag = meta_data
            .get("tag")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_GROUP_TAG)
            .to_string();

        Self {
            score: success_label(reward),
            reward,
            reasoning: reasoning(score),
            strict_reward: reward,
            group_reward: BTreeMap::from([(tag.clone(), reward)]),
            group_strict_reward: BTreeMap::from([(tag, reward)]),
            meta_data,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.score >= 1.0
    }
}

pub fn success_label(reward: f64) -> f64 {
    if reward >= SUCCESS_THRESHOLD { 1.0 } else { 0.0 }
}

/// Renders sub-scores as `name: value` lines in a fixed order.
pub fn reasoning(score: &EditScore) -> String {
    let fields: [(&str, Value); 6] = [
        ("SC_score", score.semantic_consistency.clone()),
        (
            "SC_score_reasoning",
            Value::String(score.semantic_consistency_reasoning.clone()),
        ),
        ("PQ_score", score.perceptual_quality.clone()),
        (
            "PQ_score_reasoning",
            Value::String(score.perceptual_quality_reasoning.clone()),
        ),
        ("SC_raw_output", Value::String(score.semantic_consistency_raw.clone())),
        ("PQ_raw_output", Value::String(score.perceptual_quality_raw.clone())),
    ];

    let mut out = String::new();
    for (name, value) in &fields {
        // Strings render bare, everything else as JSON.
        let _ = match value {
            Value::String(s) => writeln!(out, "{name}: {s}"),
            other => writeln!(out, "{name}: {other}"),
        };
    }
    out
}
