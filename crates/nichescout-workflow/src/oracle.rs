//! AI oracle seam and its OpenAI-compatible chat-completions client.
//!
//! The oracle is opaque: it receives instructions plus a JSON context and
//! returns a JSON value. Interpreting that value is [`crate::analysis`]'s job.

use std::future::Future;
use std::time::Duration;

use nichescout_core::retry::retry_with_backoff;
use nichescout_core::AppConfig;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const USER_AGENT: &str = "nichescout/0.1 (competitive-research)";

/// The five questions asked during analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OracleCall {
    PatternExtraction,
    GapScores,
    TitleVariants,
    DescriptionRewrite,
    TagSuggestions,
}

impl OracleCall {
    pub const ALL: [OracleCall; 5] = [
        OracleCall::PatternExtraction,
        OracleCall::GapScores,
        OracleCall::TitleVariants,
        OracleCall::DescriptionRewrite,
        OracleCall::TagSuggestions,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OracleCall::PatternExtraction => "pattern_extraction",
            OracleCall::GapScores => "gap_scores",
            OracleCall::TitleVariants => "title_variants",
            OracleCall::DescriptionRewrite => "description_rewrite",
            OracleCall::TagSuggestions => "tag_suggestions",
        }
    }

    /// System instructions, including the JSON shape expected back.
    #[must_use]
    pub fn instructions(self) -> &'static str {
        match self {
            OracleCall::PatternExtraction => {
                "You analyse top-performing competitor videos. Identify recurring patterns in \
                 titles, topics, formats and positioning. Respond with a JSON object: \
                 {\"summary\": string, \"patterns\": [string], \"hook_patterns\": [string], \
                 \"thumbnail_patterns\": [string], \"audience_notes\": string}."
            }
            OracleCall::GapScores => {
                "Compare the creator's concept with the competitor patterns and list content \
                 gaps the concept could fill. Score each gap 0-100 by opportunity. Respond \
                 with a JSON object: {\"gaps\": [{\"description\": string, \"score\": number}]}."
            }
            OracleCall::TitleVariants => {
                "Write alternative titles for the creator's concept that exploit the gaps \
                 while matching what works for competitors. Respond with a JSON object: \
                 {\"titles\": [string]}."
            }
            OracleCall::DescriptionRewrite => {
                "Rewrite the creator's video description to be search-friendly and to \
                 highlight the gaps it fills. Respond with a JSON object: \
                 {\"description\": string}."
            }
            OracleCall::TagSuggestions => {
                "Suggest tags for the creator's video based on competitor tags and the \
                 concept. Respond with a JSON object: {\"tags\": [string]}."
            }
        }
    }
}

impl std::fmt::Display for OracleCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OracleRequest {
    pub call: OracleCall,
    pub instructions: String,
    pub context: serde_json::Value,
}

impl OracleRequest {
    #[must_use]
    pub fn new(call: OracleCall, context: serde_json::Value) -> Self {
        Self {
            call,
            instructions: call.instructions().to_string(),
            context,
        }
    }
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle API key is not configured (set ORACLE_API_KEY)")]
    MissingApiKey,

    #[error("invalid oracle API URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by oracle API")]
    RateLimited,

    #[error("oracle API returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("oracle returned no content for {0}")]
    EmptyCompletion(OracleCall),

    /// The completion text was not valid JSON.
    #[error("oracle returned malformed JSON for {call}: {source}")]
    MalformedJson {
        call: OracleCall,
        #[source]
        source: serde_json::Error,
    },
}

impl OracleError {
    fn is_retriable(&self) -> bool {
        match self {
            OracleError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            OracleError::RateLimited => true,
            OracleError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub trait AnalysisOracle: Send + Sync {
    fn complete(
        &self,
        request: &OracleRequest,
    ) -> impl Future<Output = Result<serde_json::Value, OracleError>> + Send;
}

/// Oracle backed by an OpenAI-compatible `/chat/completions` endpoint in
/// JSON mode.
pub struct ChatOracle {
    client: Client,
    url: Url,
    api_key: String,
    model: String,
    max_retries: u32,
    backoff_base_ms: u64,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatOracle {
    /// # Errors
    ///
    /// Returns [`OracleError::MissingApiKey`] for a blank key,
    /// [`OracleError::InvalidBaseUrl`] for an unparseable URL, or
    /// [`OracleError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, OracleError> {
        if api_key.trim().is_empty() {
            return Err(OracleError::MissingApiKey);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;
        let url = Url::parse(&format!(
            "{}/chat/completions",
            base_url.trim_end_matches('/')
        ))
        .map_err(|e| OracleError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            url,
            api_key: api_key.trim().to_owned(),
            model: model.to_owned(),
            max_retries: 3,
            backoff_base_ms: 500,
        })
    }

    /// # Errors
    ///
    /// Returns [`OracleError::MissingApiKey`] when `ORACLE_API_KEY` is unset,
    /// plus any error from [`ChatOracle::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, OracleError> {
        let key = config
            .oracle_api_key
            .as_deref()
            .ok_or(OracleError::MissingApiKey)?;
        Ok(Self::new(
            &config.oracle_api_url,
            key,
            &config.oracle_model,
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

    async fn send_once(&self, request: &OracleRequest) -> Result<serde_json::Value, OracleError> {
        let context = request.context.to_string();
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.instructions,
                },
                ChatMessage {
                    role: "user",
                    content: &context,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: 0.4,
        };

        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(OracleError::RateLimited);
        }
        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| {
                    v.pointer("/error/message")
                        .and_then(serde_json::Value::as_str)
                        .map(ToOwned::to_owned)
                })
                .unwrap_or_else(|| text.chars().take(200).collect());
            return Err(OracleError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| OracleError::Deserialize {
                context: format!("chat/completions({})", request.call),
                source: e,
            })?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(OracleError::EmptyCompletion(request.call))?;

        serde_json::from_str(strip_code_fence(&content)).map_err(|e| OracleError::MalformedJson {
            call: request.call,
            source: e,
        })
    }
}

impl AnalysisOracle for ChatOracle {
    async fn complete(&self, request: &OracleRequest) -> Result<serde_json::Value, OracleError> {
        retry_with_backoff(
            self.max_retries,
            self.backoff_base_ms,
            OracleError::is_retriable,
            || self.send_once(request),
        )
        .await
    }
}

/// Models sometimes wrap JSON-mode output in a Markdown code fence.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map_or(trimmed, str::trim)
}
