//! Google Gemini provider implementation.
//!
//! Talks to the `generateContent` REST endpoint of the Generative Language
//! API. System messages are either sent as a `systemInstruction` or merged
//! into the first user turn, per [`SystemMessageMode`].
//!
//! ## Security
//!
//! The API key travels in the `x-goog-api-key` header, never in the URL,
//! so it cannot leak through request logs.

use super::{
    factory::ProviderFactory,
    merge_system_messages,
    secrets::{ApiCredential, GOOGLE_KEY_LABEL},
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError,
    SystemMessageMode, TokenUsage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Environment variable name for the Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GOOGLE_API_KEY";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini provider.
pub struct GeminiProvider {
    credential: ApiCredential,
    base_url: String,
    #[cfg(feature = "gemini")]
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiProvider {
    /// Create a new Gemini provider from a raw key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_credential(ApiCredential::inline(api_key, GOOGLE_KEY_LABEL))
    }

    /// Create a provider from an already-loaded credential.
    pub fn with_credential(credential: ApiCredential) -> Self {
        Self {
            credential,
            base_url: DEFAULT_BASE_URL.to_string(),
            #[cfg(feature = "gemini")]
            client: reqwest::Client::new(),
        }
    }

    /// Create from the `GOOGLE_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, ProviderError> {
        let credential = ApiCredential::from_env(GEMINI_API_KEY_ENV, GOOGLE_KEY_LABEL)?;
        Ok(Self::with_credential(credential))
    }

    /// Create from JSON configuration with environment fallback.
    ///
    /// 1. Checks for `api_key` in the config
    /// 2. Falls back to `GOOGLE_API_KEY`
    /// 3. Returns error if neither is set
    pub fn from_config(config: &JsonValue) -> Result<Self, ProviderError> {
        let credential =
            ApiCredential::resolve(config, "api_key", GEMINI_API_KEY_ENV, GOOGLE_KEY_LABEL)?;
        Ok(Self::with_credential(credential).with_settings(config))
    }

    /// Apply non-secret settings (`base_url`) from JSON configuration.
    pub fn with_settings(mut self, config: &JsonValue) -> Self {
        if let Some(url) = config["base_url"].as_str() {
            self.base_url = url.to_string();
        }
        self
    }

    /// Set custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[cfg_attr(not(feature = "gemini"), allow(dead_code))]
    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }
}

/// Gemini API request format.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

/// Gemini API response format.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[cfg_attr(not(feature = "gemini"), allow(dead_code))]
#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[cfg_attr(not(feature = "gemini"), allow(dead_code))]
#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

#[cfg_attr(not(feature = "gemini"), allow(dead_code))]
fn text_content(text: String, role: Option<&str>) -> GeminiContent {
    GeminiContent {
        role: role.map(str::to_string),
        parts: vec![GeminiPart { text: Some(text) }],
    }
}

/// Translate chat messages into a Gemini request body.
#[cfg_attr(not(feature = "gemini"), allow(dead_code))]
fn build_request(messages: Vec<ChatMessage>, config: &CompletionConfig) -> GeminiRequest {
    let (system_instruction, turns) = match config.system_message {
        SystemMessageMode::MergeIntoUser => (None, merge_system_messages(messages)),
        SystemMessageMode::Native => {
            let (system, rest): (Vec<ChatMessage>, Vec<ChatMessage>) =
                messages.into_iter().partition(ChatMessage::is_system);
            let system_text = system
                .into_iter()
                .map(|m| m.content)
                .collect::<Vec<_>>()
                .join("\n\n");
            let instruction = if system_text.is_empty() {
                None
            } else {
                Some(text_content(system_text, None))
            };
            (instruction, rest)
        }
    };

    let contents = turns
        .into_iter()
        .map(|msg| {
            let role = if msg.role == "assistant" { "model" } else { "user" };
            text_content(msg.content, Some(role))
        })
        .collect();

    GeminiRequest {
        contents,
        system_instruction,
        generation_config: GenerationConfig {
            temperature: config.temperature,
            max_output_tokens: config.max_tokens,
        },
    }
}

/// Turn a successful response body into a completion.
///
/// A candidate with no text parts yields empty content rather than an error.
#[cfg_attr(not(feature = "gemini"), allow(dead_code))]
fn parse_response(
    body: GeminiResponse,
    requested_model: &str,
) -> Result<CompletionResponse, ProviderError> {
    let candidate = match body.candidates.into_iter().next() {
        Some(c) => c,
        None => {
            let reason = body
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "none given".to_string());
            return Err(ProviderError::ParseError(format!(
                "No candidates in response (block reason: {})",
                reason
            )));
        }
    };

    let content = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let usage = body
        .usage_metadata
        .map(|u| TokenUsage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
        })
        .unwrap_or_default();

    Ok(CompletionResponse {
        content,
        usage,
        model: body
            .model_version
            .unwrap_or_else(|| requested_model.to_string()),
        stop_reason: candidate.finish_reason,
    })
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    #[cfg(feature = "gemini")]
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let request = build_request(messages, config);

        // SECURITY: Only expose the credential here, at the point of use
        let response = self
            .client
            .post(self.endpoint(&config.model))
            .header("x-goog-api-key", self.credential.expose())
            .header("content-type", "application/json")
            .timeout(config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(config.timeout)
                } else {
                    ProviderError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(std::time::Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthError);
        }

        if !status.is_success() {
            let message = match response.json::<GeminiError>().await {
                Ok(body) => body.error.message,
                Err(e) => format!("unreadable error body: {}", e),
            };
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        parse_response(body, &config.model)
    }

    #[cfg(not(feature = "gemini"))]
    async fn complete(
        &self,
        _messages: Vec<ChatMessage>,
        _config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        Err(ProviderError::NotConfigured(
            "Gemini provider requires 'gemini' feature".to_string(),
        ))
    }

    async fn health_check(&self) -> bool {
        !self.credential.is_empty()
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Factory for creating Gemini providers from configuration.
///
/// ## Configuration Format
/// ```json
/// {
///   "api_key": "AIza...",          // Optional, falls back to GOOGLE_API_KEY env
///   "base_url": "https://...",     // Optional, custom API endpoint
///   "model": "gemini-2.0-flash"    // Optional, default model
/// }
/// ```
pub struct GeminiProviderFactory;

impl ProviderFactory for GeminiProviderFactory {
    fn provider_type(&self) -> &'static str {
        "gemini"
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Ok(Arc::new(GeminiProvider::from_config(config)?))
    }

    fn create_with_credential(
        &self,
        config: &JsonValue,
        credential: ApiCredential,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        check_base_url(config)?;
        Ok(Arc::new(
            GeminiProvider::with_credential(credential).with_settings(config),
        ))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        if !ApiCredential::is_set(config, "api_key", GEMINI_API_KEY_ENV) {
            return Err(ProviderError::NotConfigured(format!(
                "Google API key required: set 'api_key' in config or {} env",
                GEMINI_API_KEY_ENV
            )));
        }

        check_base_url(config)
    }

    fn default_config(&self) -> JsonValue {
        serde_json::json!({
            "model": "gemini-2.0-flash"
        })
    }

    fn description(&self) -> &'static str {
        "Google Gemini provider (generateContent API)"
    }
}

fn check_base_url(config: &JsonValue) -> Result<(), ProviderError> {
    match config["base_url"].as_str() {
        Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => Err(
            ProviderError::NotConfigured("base_url must start with http:// or https://".to_string()),
        ),
        _ => Ok(()),
    }
}
