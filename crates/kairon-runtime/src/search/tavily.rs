//! Tavily web-search client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{SearchDepth, SearchError, SearchHit, SearchOptions, SearchProvider, SearchResponse};
use crate::providers::secrets::{ApiCredential, TAVILY_KEY_LABEL};

/// Environment variable name for the Tavily API key.
pub const TAVILY_API_KEY_ENV: &str = "TAVILY_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

/// Client for the Tavily `/search` endpoint.
pub struct TavilyClient {
    credential: ApiCredential,
    base_url: String,
    options: SearchOptions,
    #[cfg(feature = "tavily")]
    client: reqwest::Client,
}

impl std::fmt::Debug for TavilyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilyClient")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("options", &self.options)
            .finish()
    }
}

impl TavilyClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_credential(ApiCredential::inline(api_key, TAVILY_KEY_LABEL))
    }

    pub fn with_credential(credential: ApiCredential) -> Self {
        Self {
            credential,
            base_url: DEFAULT_BASE_URL.to_string(),
            options: SearchOptions::default(),
            #[cfg(feature = "tavily")]
            client: reqwest::Client::new(),
        }
    }

    /// Create from the `TAVILY_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, SearchError> {
        Self::from_env_var(TAVILY_API_KEY_ENV)
    }

    fn from_env_var(env_var: &str) -> Result<Self, SearchError> {
        let credential = ApiCredential::from_env(env_var, TAVILY_KEY_LABEL)
            .map_err(|e| SearchError::NotConfigured(e.to_string()))?;
        Ok(Self::with_credential(credential))
    }

    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    #[cfg_attr(not(feature = "tavily"), allow(dead_code))]
    fn build_request<'a>(&self, query: &'a str) -> TavilyRequest<'a> {
        TavilyRequest {
            query,
            search_depth: self.options.search_depth,
            max_results: self.options.max_results,
            include_answer: self.options.include_answer,
        }
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    search_depth: SearchDepth,
    max_results: u32,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    query: String,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: f64,
}

impl TavilyResponse {
    fn into_search_response(self, requested: &str) -> SearchResponse {
        let query = if self.query.is_empty() {
            requested.to_string()
        } else {
            self.query
        };

        SearchResponse {
            query,
            answer: self.answer,
            results: self
                .results
                .into_iter()
                .map(|r| SearchHit {
                    title: r.title,
                    url: r.url,
                    content: r.content,
                    score: r.score,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl SearchProvider for TavilyClient {
    #[cfg(feature = "tavily")]
    async fn search(&self, query: &str) -> Result<SearchResponse, SearchError> {
        let timeout = self.options.timeout;

        let response = self
            .client
            .post(format!("{}/search", self.base_url.trim_end_matches('/')))
            .bearer_auth(self.credential.expose())
            .timeout(timeout)
            .json(&self.build_request(query))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout(timeout)
                } else {
                    SearchError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();

        if status == 401 || status == 403 {
            return Err(SearchError::AuthError);
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| SearchError::ParseError(e.to_string()))?;

        tracing::debug!(query, results = body.results.len(), "Search completed");
        Ok(body.into_search_response(query))
    }

    #[cfg(not(feature = "tavily"))]
    async fn search(&self, _query: &str) -> Result<SearchResponse, SearchError> {
        Err(SearchError::NotConfigured(
            "Tavily search requires 'tavily' feature".to_string(),
        ))
    }

    fn name(&self) -> &str {
        "tavily"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let client = TavilyClient::new("tvly-test").with_options(SearchOptions {
            max_results: 3,
            search_depth: SearchDepth::Advanced,
            ..Default::default()
        });

        let json = serde_json::to_value(client.build_request("capital of France")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "query": "capital of France",
                "search_depth": "advanced",
                "max_results": 3,
                "include_answer": true
            })
        );
    }

    #[test]
    fn test_response_conversion() {
        let raw: TavilyResponse = serde_json::from_value(serde_json::json!({
            "query": "capital of France",
            "answer": "Paris",
            "response_time": 0.42,
            "results": [{
                "title": "France - Wikipedia",
                "url": "https://en.wikipedia.org/wiki/France",
                "content": "Its capital is Paris.",
                "score": 0.98,
                "raw_content": null
            }]
        }))
        .unwrap();

        let response = raw.into_search_response("ignored");
        assert_eq!(response.query, "capital of France");
        assert_eq!(response.answer.as_deref(), Some("Paris"));
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].score, 0.98);
    }

    #[test]
    fn test_response_falls_back_to_requested_query() {
        let raw: TavilyResponse =
            serde_json::from_value(serde_json::json!({ "results": [] })).unwrap();
        assert_eq!(raw.into_search_response("asked").query, "asked");
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let client = TavilyClient::new("tvly-secret-98765");
        let debug = format!("{:?}", client);
        assert!(!debug.contains("tvly-secret-98765"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_from_env_reports_missing_key() {
        match TavilyClient::from_env_var("KAIRON_TEST_UNSET_TAVILY_4") {
            Err(SearchError::NotConfigured(msg)) => {
                assert!(msg.contains("KAIRON_TEST_UNSET_TAVILY_4"))
            }
            other => panic!("Expected NotConfigured, got {:?}", other.map(|c| c.name().to_string())),
        }
    }
}
