//! "Mentions a location" oracle backed by a token-classification service
//!
//! The service is expected to speak the Hugging Face inference format:
//! `POST {"inputs": text}` answered by a list of entity spans, each carrying
//! an `entity_group` (aggregated) or `entity` (raw BIO tag) and a `score`.

use crate::error::LocationError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait LocationOracle: Send + Sync {
    async fn mentions_location(&self, text: &str) -> Result<bool, LocationError>;
}

#[derive(Debug, Deserialize)]
struct EntitySpan {
    #[serde(default)]
    entity_group: Option<String>,
    #[serde(default)]
    entity: Option<String>,
    score: f32,
    #[serde(default)]
    word: Option<String>,
}

impl EntitySpan {
    fn tag(&self) -> &str {
        self.entity_group
            .as_deref()
            .or(self.entity.as_deref())
            .unwrap_or("")
    }
}

/// True when any span is a location entity scoring above `threshold`
fn contains_location(spans: &[EntitySpan], threshold: f32) -> bool {
    spans.iter().any(|span| {
        let hit = span.tag().contains("LOC") && span.score > threshold;
        if hit {
            debug!(word = ?span.word, score = span.score, "Location entity");
        }
        hit
    })
}

pub struct NerLocationOracle {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
    score_threshold: f32,
}

impl NerLocationOracle {
    pub fn new(
        endpoint: String,
        api_token: Option<String>,
        score_threshold: f32,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_token,
            score_threshold,
        })
    }
}

#[async_trait]
impl LocationOracle for NerLocationOracle {
    async fn mentions_location(&self, text: &str) -> Result<bool, LocationError> {
        if text.trim().is_empty() {
            return Ok(false);
        }

        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "inputs": text }));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LocationError::Status(status.as_u16()));
        }

        let spans: Vec<EntitySpan> = response
            .json()
            .await
            .map_err(|e| LocationError::Malformed(e.to_string()))?;

        Ok(contains_location(&spans, self.score_threshold))
    }
}
