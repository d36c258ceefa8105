use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use super::error::{OracleError, OracleResult};
use super::types::{EditScore, ScoringBatch};
use super::{BatchScorer, PairEvaluator, is_scored_result};
use crate::pairs::Pair;

#[derive(Debug, Clone)]
struct RemoteEndpoint {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl RemoteEndpoint {
    fn new(url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> OracleResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    async fn post(&self, body: &Value) -> OracleResult<Value> {
        let mut request = self.client.post(&self.url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<Value>().await?)
    }
}

/// Scores single pairs against a remote HTTP endpoint.
///
/// Sends `{"instruction", "input_image", "output_image"}` and expects a JSON object of
/// per-category scores back.
#[derive(Debug, Clone)]
pub struct RemoteEvaluator {
    endpoint: RemoteEndpoint,
}

impl RemoteEvaluator {
    pub fn new(url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> OracleResult<Self> {
        Ok(Self {
            endpoint: RemoteEndpoint::new(url, api_key, timeout)?,
        })
    }
}

#[async_trait]
impl PairEvaluator for RemoteEvaluator {
    #[instrument(skip(self), fields(output = %pair.output_image))]
    async fn evaluate(&self, pair: &Pair) -> OracleResult<Value> {
        let body = json!({
            "instruction": pair.instruction,
            "input_image": pair.input_image,
            "output_image": pair.output_image,
        });
        let result = self.endpoint.post(&body).await?;
        if !result.is_object() {
            return Err(OracleError::InvalidResponse(format!(
                "expected a JSON object, got {}",
                json_kind(&result)
            )));
        }
        if !is_scored_result(&result) {
            return Err(OracleError::InvalidResponse(
                "response carries no score categories".to_string(),
            ));
        }
        debug!("Pair evaluated");
        Ok(result)
    }
}

/// Forwards whole batches to a remote scoring backend.
///
/// Images are sent base64-encoded; the response must be a JSON array with one
/// [`EditScore`] per item, in order.
#[derive(Debug, Clone)]
pub struct RemoteBatchScorer {
    endpoint: RemoteEndpoint,
}

impl RemoteBatchScorer {
    pub fn new(url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> OracleResult<Self> {
        Ok(Self {
            endpoint: RemoteEndpoint::new(url, api_key, timeout)?,
        })
    }
}

#[async_trait]
impl BatchScorer for RemoteBatchScorer {
    #[instrument(skip(self, batch), fields(items = batch.len()))]
    async fn score_batch(&mut self, batch: &ScoringBatch) -> OracleResult<Vec<EditScore>> {
        let items: Vec<Value> = batch
            .items
            .iter()
            .map(|item| {
                json!({
                    "instruction": item.instruction(),
                    "input_images": item
                        .input_images
                        .iter()
                        .map(|img| STANDARD.encode(img.as_slice()))
                        .collect::<Vec<_>>(),
                    "output_image": STANDARD.encode(item.output_image.as_slice()),
                    "meta_data": item.metadata,
                })
            })
            .collect();

        let response = self.endpoint.post(&json!({ "items": items })).await?;
        let scores: Vec<EditScore> = serde_json::from_value(response)
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;
        Ok(scores)
    }

    fn name(&self) -> &str {
        "remote"
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
