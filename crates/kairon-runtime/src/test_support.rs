//! In-memory providers for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};
use crate::search::{SearchError, SearchHit, SearchProvider, SearchResponse};

enum Reply {
    Text(String),
    Fail,
}

/// Generation provider whose reply depends on the prompt text.
///
/// Rules are checked in insertion order against the last message; the
/// first rule whose needle appears wins.
pub struct ScriptedProvider {
    rules: Vec<(String, Reply)>,
    fallback: Reply,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            fallback: Reply::Fail,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn on(mut self, needle: &str, reply: &str) -> Self {
        self.rules
            .push((needle.to_string(), Reply::Text(reply.to_string())));
        self
    }

    pub fn fail_on(mut self, needle: &str) -> Self {
        self.rules.push((needle.to_string(), Reply::Fail));
        self
    }

    pub fn fallback(mut self, reply: &str) -> Self {
        self.fallback = Reply::Text(reply.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Number of recorded prompts containing `needle`.
    pub fn calls_matching(&self, needle: &str) -> usize {
        self.prompts
            .lock()
            .iter()
            .filter(|p| p.contains(needle))
            .count()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        _config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts.lock().push(prompt.clone());

        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply)
            .unwrap_or(&self.fallback);

        match reply {
            Reply::Text(text) => Ok(CompletionResponse {
                content: text.clone(),
                usage: TokenUsage {
                    prompt_tokens: self.estimate_tokens(&prompt),
                    completion_tokens: self.estimate_tokens(text),
                },
                model: "gemini-2.0-flash".to_string(),
                stop_reason: Some("STOP".to_string()),
            }),
            Reply::Fail => Err(ProviderError::ApiError {
                status: 503,
                message: "scripted failure".to_string(),
            }),
        }
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Search provider returning the same hits for every query.
pub struct StaticSearch {
    hits: Vec<SearchHit>,
    queries: Mutex<Vec<String>>,
}

impl StaticSearch {
    pub fn with_hit(title: &str, content: &str) -> Self {
        Self {
            hits: vec![SearchHit {
                title: title.to_string(),
                url: "https://example.com/result".to_string(),
                content: content.to_string(),
                score: 0.9,
            }],
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    async fn search(&self, query: &str) -> Result<SearchResponse, SearchError> {
        self.queries.lock().push(query.to_string());
        Ok(SearchResponse {
            query: query.to_string(),
            answer: None,
            results: self.hits.clone(),
        })
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Search provider that always fails.
pub struct FailingSearch;

#[async_trait]
impl SearchProvider for FailingSearch {
    async fn search(&self, _query: &str) -> Result<SearchResponse, SearchError> {
        Err(SearchError::HttpError("connection refused".to_string()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}
