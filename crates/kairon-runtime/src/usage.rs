//! Token accounting for generation calls.
//!
//! Every agent talks to the model through a [`MeteredProvider`], which
//! records usage under the agent's [`AgentKind`] in a shared
//! [`UsageTracker`]. An optional global token budget turns further calls
//! into [`ProviderError::BudgetExceeded`] once spent.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};

/// Which agent made a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Research,
    Draft,
    Quality,
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentKind::Research => write!(f, "research"),
            AgentKind::Draft => write!(f, "draft"),
            AgentKind::Quality => write!(f, "quality"),
        }
    }
}

/// A token allowance shared across calls.
pub struct TokenBudget {
    pub max_tokens: u32,
    used: AtomicU32,
}

impl TokenBudget {
    pub fn new(max_tokens: u32) -> Self {
        Self {
            max_tokens,
            used: AtomicU32::new(0),
        }
    }

    pub fn can_afford(&self, tokens: u32) -> bool {
        self.remaining() >= tokens
    }

    /// Add `tokens` to the running total, saturating at `u32::MAX`.
    pub fn record(&self, tokens: u32) {
        let _ = self
            .used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                Some(used.saturating_add(tokens))
            });
    }

    pub fn remaining(&self) -> u32 {
        self.max_tokens.saturating_sub(self.used())
    }

    pub fn used(&self) -> u32 {
        self.used.load(Ordering::SeqCst)
    }
}

/// Accumulated generation usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmUsage {
    pub total_tokens: u32,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub llm_calls: u32,
    /// Estimated cost in USD
    pub estimated_cost: f64,
}

impl LlmUsage {
    /// Add one response's usage.
    pub fn add(&mut self, usage: &TokenUsage, model: &str) {
        self.prompt_tokens += usage.prompt_tokens;
        self.completion_tokens += usage.completion_tokens;
        self.total_tokens += usage.total();
        self.llm_calls += 1;
        self.estimated_cost += Self::estimate_cost(usage, model);
    }

    /// Combine two usage records.
    pub fn merge(&mut self, other: &LlmUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
        self.llm_calls += other.llm_calls;
        self.estimated_cost += other.estimated_cost;
    }

    fn estimate_cost(usage: &TokenUsage, model: &str) -> f64 {
        // USD per million tokens (input, output)
        let (input_rate, output_rate) = match model {
            m if m.contains("flash-lite") => (0.075, 0.3),
            m if m.contains("2.5-pro") => (1.25, 10.0),
            m if m.contains("2.5-flash") => (0.3, 2.5),
            m if m.contains("1.5-pro") => (1.25, 5.0),
            m if m.contains("flash") => (0.1, 0.4),
            _ => (0.1, 0.4),
        };

        (usage.prompt_tokens as f64 / 1_000_000.0) * input_rate
            + (usage.completion_tokens as f64 / 1_000_000.0) * output_rate
    }
}

/// Usage per agent plus an optional global budget.
pub struct UsageTracker {
    per_agent: RwLock<BTreeMap<AgentKind, LlmUsage>>,
    budget: Option<TokenBudget>,
}

impl UsageTracker {
    /// Tracker with no token limit.
    pub fn unlimited() -> Self {
        Self {
            per_agent: RwLock::new(BTreeMap::new()),
            budget: None,
        }
    }

    /// Tracker that refuses calls once `max_tokens` are spent.
    pub fn with_budget(max_tokens: u32) -> Self {
        Self {
            per_agent: RwLock::new(BTreeMap::new()),
            budget: Some(TokenBudget::new(max_tokens)),
        }
    }

    /// Whether a call of roughly `estimated_tokens` still fits.
    pub fn check(&self, estimated_tokens: u32) -> Result<(), ProviderError> {
        match &self.budget {
            Some(budget) if !budget.can_afford(estimated_tokens) => {
                Err(ProviderError::BudgetExceeded {
                    requested: estimated_tokens,
                    remaining: budget.remaining(),
                })
            }
            _ => Ok(()),
        }
    }

    pub fn record(&self, agent: AgentKind, usage: &TokenUsage, model: &str) {
        if let Some(budget) = &self.budget {
            budget.record(usage.total());
        }
        self.per_agent.write().entry(agent).or_default().add(usage, model);
    }

    /// Usage summed over every agent.
    pub fn total(&self) -> LlmUsage {
        let mut total = LlmUsage::default();
        for usage in self.per_agent.read().values() {
            total.merge(usage);
        }
        total
    }

    pub fn for_agent(&self, agent: AgentKind) -> LlmUsage {
        self.per_agent
            .read()
            .get(&agent)
            .cloned()
            .unwrap_or_default()
    }

    pub fn by_agent(&self) -> BTreeMap<AgentKind, LlmUsage> {
        self.per_agent.read().clone()
    }

    /// Remaining budget, or `None` when unlimited.
    pub fn remaining(&self) -> Option<u32> {
        self.budget.as_ref().map(TokenBudget::remaining)
    }
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::unlimited()
    }
}

/// Provider decorator that checks the budget and records usage.
pub struct MeteredProvider {
    inner: Arc<dyn LlmProvider>,
    agent: AgentKind,
    tracker: Arc<UsageTracker>,
}

impl MeteredProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, agent: AgentKind, tracker: Arc<UsageTracker>) -> Self {
        Self {
            inner,
            agent,
            tracker,
        }
    }
}

#[async_trait]
impl LlmProvider for MeteredProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let prompt_estimate: u32 = messages
            .iter()
            .map(|m| self.inner.estimate_tokens(&m.content))
            .sum();

        if let Err(e) = self.tracker.check(prompt_estimate) {
            tracing::warn!(agent = %self.agent, estimate = prompt_estimate, "Token budget exhausted");
            return Err(e);
        }

        let response = self.inner.complete(messages, config).await?;
        self.tracker.record(self.agent, &response.usage, &response.model);

        tracing::debug!(
            agent = %self.agent,
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "Generation call recorded"
        );

        Ok(response)
    }

    async fn health_check(&self) -> bool {
        self.inner.health_check().await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn estimate_tokens(&self, text: &str) -> u32 {
        self.inner.estimate_tokens(text)
    }
}
