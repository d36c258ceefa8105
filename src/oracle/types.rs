use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw image bytes as received from a caller. Decoding is the scorer's business.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBytes(Vec<u8>);

impl ImageBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for ImageBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ImageBytes({} bytes)", self.0.len())
    }
}

/// One (inputs, output, metadata) triple of a scoring batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringItem {
    pub input_images: Vec<ImageBytes>,
    pub output_image: ImageBytes,
    pub metadata: Map<String, Value>,
}

impl ScoringItem {
    /// The edit instruction carried in metadata, if any.
    pub fn instruction(&self) -> Option<&str> {
        self.metadata.get("instruction").and_then(Value::as_str)
    }
}

/// A validated batch handed to a [`BatchScorer`](super::BatchScorer) in one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoringBatch {
    pub items: Vec<ScoringItem>,
}

impl ScoringBatch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Per-item scorer output for service mode.
///
/// Wire names follow the scoring backend's JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditScore {
    /// Overall score in the scorer's native range.
    #[serde(rename = "O_score")]
    pub overall: f64,

    #[serde(rename = "SC_score", default)]
    pub semantic_consistency: Value,

    #[serde(rename = "SC_score_reasoning", default)]
    pub semantic_consistency_reasoning: String,

    #[serde(rename = "PQ_score", default)]
    pub perceptual_quality: Value,

    #[serde(rename = "PQ_score_reasoning", default)]
    pub perceptual_quality_reasoning: String,

    #[serde(rename = "SC_raw_output", default)]
    pub semantic_consistency_raw: String,

    #[serde(rename = "PQ_raw_output", default)]
    pub perceptual_quality_raw: String,
}

impl EditScore {
    /// A score with only the overall value set.
    pub fn with_overall(overall: f64) -> Self {
        Self {
            overall,
            semantic_consistency: Value::Null,
            semantic_consistency_reasoning: String::new(),
            perceptual_quality: Value::Null,
            perceptual_quality_reasoning: String::new(),
            semantic_consistency_raw: String::new(),
            perceptual_quality_raw: String::new(),
        }
    }
}
