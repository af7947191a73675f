use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::agents::provider::{ProviderError, ProviderGateway};
use crate::domain::agent::ProviderType;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Credentials and endpoints for the hosted providers
#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub anthropic_base_url: String,
    pub openai_base_url: String,
    pub gemini_base_url: String,
    pub timeout: Duration,
    pub max_tokens: u32,
}

impl Default for HttpGatewayConfig {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            openai_api_key: None,
            google_api_key: None,
            anthropic_base_url: "https://api.anthropic.com".to_string(),
            openai_base_url: "https://api.openai.com".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout: Duration::from_secs(120),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl HttpGatewayConfig {
    /// Points every provider at one base URL, for tests against a mock server
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        self.anthropic_base_url = base.clone();
        self.openai_base_url = base.clone();
        self.gemini_base_url = base;
        self
    }

    /// Providers with a key configured
    pub fn configured(&self) -> Vec<ProviderType> {
        [
            (ProviderType::Anthropic, &self.anthropic_api_key),
            (ProviderType::OpenAi, &self.openai_api_key),
            (ProviderType::Gemini, &self.google_api_key),
        ]
        .into_iter()
        .filter(|(_, key)| key.as_deref().is_some_and(|k| !k.trim().is_empty()))
        .map(|(provider, _)| provider)
        .collect()
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

/// Provider gateway talking to the Anthropic, OpenAI and Gemini HTTP APIs
///
/// One request per call. Rate limits, 5xx responses and transport failures
/// come back as [`ProviderError::Transient`] so the caller can retry them.
pub struct HttpProviderGateway {
    config: HttpGatewayConfig,
    client: reqwest::Client,
}

impl HttpProviderGateway {
    /// Creates a new gateway
    ///
    /// # Arguments
    /// * `config` - API keys, base URLs and request timeout
    pub fn new(config: HttpGatewayConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Permanent(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn key(&self, provider: ProviderType) -> Result<&str, ProviderError> {
        let key = match provider {
            ProviderType::Anthropic => &self.config.anthropic_api_key,
            ProviderType::OpenAi => &self.config.openai_api_key,
            ProviderType::Gemini => &self.config.google_api_key,
        };
        key.as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::NotConfigured(format!("no API key for {}", provider)))
    }

    fn request(&self, provider: ProviderType, key: &str, model: &str, prompt: &str) -> RequestBuilder {
        match provider {
            ProviderType::Anthropic => self
                .client
                .post(format!("{}/v1/messages", self.config.anthropic_base_url))
                .header("x-api-key", key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&json!({
                    "model": model,
                    "max_tokens": self.config.max_tokens,
                    "messages": [{"role": "user", "content": prompt}],
                })),
            ProviderType::OpenAi => self
                .client
                .post(format!("{}/v1/chat/completions", self.config.openai_base_url))
                .bearer_auth(key)
                .json(&json!({
                    "model": model,
                    "messages": [{"role": "user", "content": prompt}],
                })),
            ProviderType::Gemini => self
                .client
                .post(format!(
                    "{}/v1beta/models/{}:generateContent",
                    self.config.gemini_base_url, model
                ))
                .query(&[("key", key)])
                .json(&json!({
                    "contents": [{"parts": [{"text": prompt}]}],
                })),
        }
    }
}

fn classify_status(provider: ProviderType, status: StatusCode, body: &str) -> ProviderError {
    let message = format!("{} returned {}: {}", provider, status, truncate(body, 300));
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        ProviderError::Transient(message)
    } else {
        ProviderError::Permanent(message)
    }
}

/// Only timeouts and connection failures are worth another attempt
fn classify_transport(provider: ProviderType, error: reqwest::Error) -> ProviderError {
    let message = format!("{} request failed: {}", provider, error);
    if error.is_timeout() || error.is_connect() {
        ProviderError::Transient(message)
    } else {
        ProviderError::Permanent(message)
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn extract_text(provider: ProviderType, body: &str) -> Result<String, ProviderError> {
    let malformed =
        |e: serde_json::Error| ProviderError::Permanent(format!("{} response malformed: {}", provider, e));

    let text = match provider {
        ProviderType::Anthropic => serde_json::from_str::<AnthropicResponse>(body)
            .map_err(malformed)?
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join(""),
        ProviderType::OpenAi => serde_json::from_str::<OpenAiResponse>(body)
            .map_err(malformed)?
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default(),
        ProviderType::Gemini => serde_json::from_str::<GeminiResponse>(body)
            .map_err(malformed)?
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default(),
    };

    Ok(text)
}

#[async_trait]
impl ProviderGateway for HttpProviderGateway {
    async fn generate(
        &self,
        provider: ProviderType,
        prompt: &str,
        model: Option<&str>,
    ) -> Result<String, ProviderError> {
        let key = self.key(provider)?;
        let model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| provider.default_model());

        tracing::debug!(provider = %provider, model, prompt_len = prompt.len(), "Calling provider");

        let response = self
            .request(provider, key, model, prompt)
            .send()
            .await
            .map_err(|e| classify_transport(provider, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport(provider, e))?;

        if !status.is_success() {
            return Err(classify_status(provider, status, &body));
        }

        extract_text(provider, &body)
    }
}
