//! Web-search capability used by the research agent.
//!
//! Search is the one external call whose failures never end a run: the
//! research agent turns a [`SearchError`] into an inline error string and
//! keeps going.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

mod tavily;

pub use tavily::{TavilyClient, TAVILY_API_KEY_ENV};

/// Errors from search providers.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Search API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid search response: {0}")]
    ParseError(String),

    #[error("Search authentication failed")]
    AuthError,

    #[error("Search timed out after {0:?}")]
    Timeout(Duration),

    #[error("Search not configured: {0}")]
    NotConfigured(String),
}

/// How thorough a search should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchDepth {
    #[default]
    Basic,
    Advanced,
}

/// Options sent with every search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub max_results: u32,
    pub search_depth: SearchDepth,
    pub include_answer: bool,
    #[serde(with = "crate::config::duration_serde")]
    pub timeout: Duration,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 5,
            search_depth: SearchDepth::Basic,
            include_answer: true,
            timeout: Duration::from_secs(30),
        }
    }
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: f64,
}

/// Results for one query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

impl SearchResponse {
    /// Plain-text rendering for inclusion in a prompt.
    ///
    /// The provider's short answer (when present) comes first, then each
    /// hit as a numbered title, URL, and content block.
    pub fn to_context(&self) -> String {
        let mut context = String::new();

        if let Some(answer) = self.answer.as_deref().filter(|a| !a.trim().is_empty()) {
            context.push_str(&format!("Answer: {}\n\n", answer.trim()));
        }

        if self.results.is_empty() {
            context.push_str("No results found.");
            return context;
        }

        for (i, hit) in self.results.iter().enumerate() {
            context.push_str(&format!(
                "[{}] {}\nURL: {}\n{}\n\n",
                i + 1,
                hit.title,
                hit.url,
                hit.content.trim()
            ));
        }

        context.trim_end().to_string()
    }
}

/// A backend that answers web-search queries.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<SearchResponse, SearchError>;

    /// Name for logs.
    fn name(&self) -> &str;
}

/// Render a search outcome as prompt text, degrading errors to a message.
pub fn context_or_error(outcome: Result<SearchResponse, SearchError>) -> String {
    match outcome {
        Ok(response) => response.to_context(),
        Err(e) => format!("Error in web search: {}", e),
    }
}
