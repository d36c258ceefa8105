use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{BrokerError, BrokerResult};
use crate::constants::RAW_METADATA_FIELD;
use crate::oracle::{ImageBytes, ScoringBatch, ScoringItem};

/// Raw service request body. Item `i` is `(input_images[i], output_image[i], meta_data[i])`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreRequest {
    /// Base64 images per item; every item may carry several inputs.
    pub input_images: Vec<Vec<String>>,
    /// One base64 edited image per item.
    pub output_image: Vec<String>,
    /// A JSON object, or a string holding one, per item.
    pub meta_data: Vec<Value>,
}

impl ScoreRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one item, encoding the images.
    pub fn push_item<I, B>(&mut self, inputs: I, output: &[u8], meta_data: Value)
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        self.input_images
            .push(inputs.into_iter().map(|img| STANDARD.encode(img)).collect());
        self.output_image.push(STANDARD.encode(output));
        self.meta_data.push(meta_data);
    }

    pub fn len(&self) -> usize {
        self.output_image.len()
    }

    pub fn is_empty(&self) -> bool {
        self.output_image.is_empty()
    }

    /// Decodes images and normalizes metadata into a batch the scorer can take.
    pub fn validate(&self) -> BrokerResult<ScoringBatch> {
        let n = self.output_image.len();
        if n == 0 {
            return Err(invalid("request contains no items"));
        }
        if self.input_images.len() != n || self.meta_data.len() != n {
            return Err(invalid(format!(
                "length mismatch: {} input_images, {} output_image, {} meta_data",
                self.input_images.len(),
                n,
                self.meta_data.len()
            )));
        }

        let mut items = Vec::with_capacity(n);
        for (idx, ((inputs, output), meta)) in self
            .input_images
            .iter()
            .zip(&self.output_image)
            .zip(&self.meta_data)
            .enumerate()
        {
            let input_images = inputs
                .iter()
                .map(|img| decode_image(img, idx, "input_images"))
                .collect::<BrokerResult<Vec<_>>>()?;
            items.push(ScoringItem {
                input_images,
                output_image: decode_image(output, idx, "output_image")?,
                metadata: normalize_metadata(meta)
                    .ok_or_else(|| invalid(format!("item {idx}: Meta data must be a dict or JSON string")))?,
            });
        }
        Ok(ScoringBatch { items })
    }
}

fn invalid(msg: impl Into<String>) -> BrokerError {
    BrokerError::InvalidRequest(msg.into())
}

fn decode_image(encoded: &str, idx: usize, field: &str) -> BrokerResult<ImageBytes> {
    STANDARD
        .decode(encoded.trim())
        .map(ImageBytes::new)
        .map_err(|e| invalid(format!("item {idx}: {field} is not valid base64: {e}")))
}

/// Objects pass through. Strings are parsed as JSON, and wrapped as `{"prompt": s}` when
/// they are not JSON at all. Anything that does not end up an object is rejected.
pub(crate) fn normalize_metadata(raw: &Value) -> Option<Map<String, Value>> {
    match raw {
        Value::Object(map) => Some(map.clone()),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => Some(map),
            Ok(_) => None,
            Err(_) => {
                let mut map = Map::new();
                map.insert(RAW_METADATA_FIELD.to_string(), Value::String(s.clone()));
                Some(map)
            }
        },
        _ => None,
    }
}
