//! Client for OpenAI-compatible `/embeddings` endpoints.

use std::future::Future;
use std::time::Duration;

use nichescout_core::retry::retry_with_backoff;
use nichescout_core::AppConfig;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::error::RankingError;

/// Maximum number of texts per `/embeddings` call.
const BATCH_SIZE: usize = 64;

const USER_AGENT: &str = "nichescout/0.1 (competitive-research)";

/// Anything that can turn texts into vectors, one per input, in input order.
pub trait TextEmbedder: Send + Sync {
    fn embed(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, RankingError>> + Send;
}

pub struct EmbeddingClient {
    client: Client,
    url: Url,
    api_key: Option<String>,
    model: String,
    max_retries: u32,
    backoff_base_ms: u64,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedDatum>,
}

#[derive(Deserialize)]
struct EmbedDatum {
    index: usize,
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    /// Create a client for `{base_url}/embeddings`.
    ///
    /// # Errors
    ///
    /// Returns [`RankingError::InvalidBaseUrl`] if the URL does not parse and
    /// [`RankingError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, RankingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;
        let url = Url::parse(&format!("{}/embeddings", base_url.trim_end_matches('/'))).map_err(
            |e| RankingError::InvalidBaseUrl {
                url: base_url.to_owned(),
                reason: e.to_string(),
            },
        )?;

        Ok(Self {
            client,
            url,
            api_key: api_key
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(ToOwned::to_owned),
            model: model.to_owned(),
            max_retries: 3,
            backoff_base_ms: 500,
        })
    }

    /// # Errors
    ///
    /// See [`EmbeddingClient::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, RankingError> {
        Ok(Self::new(
            &config.embedding_api_url,
            config.embedding_api_key.as_deref(),
            &config.embedding_model,
            config.http_timeout_secs,
        )?
        .with_retry_policy(config.http_max_retries, config.http_backoff_base_ms))
    }

    #[must_use]
    pub fn with_retry_policy(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Embed `texts` in batches of [`BATCH_SIZE`], returning one vector per
    /// input in the same order.
    ///
    /// # Errors
    ///
    /// Returns [`RankingError`] if a request fails after retries or the
    /// response cannot be matched back to the inputs.
    pub async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RankingError> {
        let mut all_embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            let vectors = self.embed_with_retry(chunk).await?;
            all_embeddings.extend(vectors);
        }
        Ok(all_embeddings)
    }

    async fn embed_with_retry(&self, chunk: &[String]) -> Result<Vec<Vec<f32>>, RankingError> {
        retry_with_backoff(
            self.max_retries,
            self.backoff_base_ms,
            RankingError::is_retriable,
            || self.embed_batch(chunk),
        )
        .await
    }

    async fn embed_batch(&self, chunk: &[String]) -> Result<Vec<Vec<f32>>, RankingError> {
        let request = EmbedRequest {
            model: &self.model,
            input: chunk,
        };
        let mut builder = self.client.post(self.url.clone()).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(RankingError::RateLimited);
        }
        if !status.is_success() {
            return Err(RankingError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let parsed: EmbedResponse =
            serde_json::from_str(&body).map_err(|e| RankingError::Deserialize {
                context: format!("embeddings(count={})", chunk.len()),
                source: e,
            })?;

        reorder_by_index(parsed.data, chunk.len())
    }
}

impl TextEmbedder for EmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RankingError> {
        self.embed_texts(texts).await
    }
}

/// Place each datum at its `index`; every slot must be filled exactly once.
fn reorder_by_index(data: Vec<EmbedDatum>, expected: usize) -> Result<Vec<Vec<f32>>, RankingError> {
    let got = data.len();
    if got != expected {
        return Err(RankingError::CountMismatch { expected, got });
    }
    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for datum in data {
        let Some(slot) = slots.get_mut(datum.index) else {
            return Err(RankingError::CountMismatch { expected, got });
        };
        if slot.is_some() {
            return Err(RankingError::CountMismatch { expected, got });
        }
        *slot = Some(datum.embedding);
    }
    slots
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or(RankingError::CountMismatch { expected, got })
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(serde_json::Value::as_str)
                .map(ToOwned::to_owned)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datum(index: usize, value: f32) -> EmbedDatum {
        EmbedDatum {
            index,
            embedding: vec![value],
        }
    }

    #[test]
    fn reorders_out_of_order_response() {
        let out = reorder_by_index(vec![datum(1, 2.0), datum(0, 1.0)], 2).unwrap();
        assert_eq!(out, vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn rejects_duplicate_or_missing_indices() {
        assert!(reorder_by_index(vec![datum(0, 1.0), datum(0, 2.0)], 2).is_err());
        assert!(reorder_by_index(vec![datum(0, 1.0)], 2).is_err());
        assert!(reorder_by_index(vec![datum(5, 1.0)], 1).is_err());
    }

    #[test]
    fn error_message_prefers_envelope() {
        assert_eq!(
            error_message(r#"{"error":{"message":"bad key"}}"#),
            "bad key"
        );
        assert_eq!(error_message(r#"{"error":"plain"}"#), "plain");
        assert_eq!(error_message("oops"), "oops");
    }
}
