//! Prompts for the research, drafting, and quality agents.
//!
//! Each agent sends a fixed system prompt plus one task prompt built from
//! the run's data. With the default [`SystemMessageMode::MergeIntoUser`]
//! the two reach the model as a single user turn.
//!
//! [`SystemMessageMode::MergeIntoUser`]: crate::providers::SystemMessageMode

use kairon_core::Finding;

/// System prompt for the research agent.
pub const RESEARCH_SYSTEM_PROMPT: &str = r#"You are a research agent specialized in gathering and analyzing information from the web.
Your task is to:
1. Break down complex research questions into smaller, searchable queries
2. Gather relevant information from web searches
3. Organize and summarize the findings
4. Identify gaps in information that need further research

Always maintain focus on the original research question while gathering information."#;

/// System prompt for the drafting agent.
pub const DRAFT_SYSTEM_PROMPT: &str = r#"You are a drafting agent specialized in creating clear, concise, and well-structured content.
Your task is to:
1. Synthesize research findings into coherent narratives
2. Maintain accuracy and relevance to the original research question
3. Structure information logically
4. Use clear and professional language

Always ensure your drafts are factually accurate and well-supported by the research."#;

/// Research iteration: reason over one round of search results.
pub fn research_prompt(query: &str, search_context: &str) -> String {
    format!(
        "Current research question: {query}\n\n\
         Web search results:\n{search_context}\n\n\
         Summarize what these results establish about the question and note \
         any gaps that need further research."
    )
}

/// Initial draft from the formatted findings block.
pub fn draft_prompt(question: &str, formatted_findings: &str) -> String {
    format!(
        "Based on the following research findings, create a comprehensive answer \
         to the question: {question}\n\n\
         {formatted_findings}\n\
         Please provide a well-structured, clear, and accurate response."
    )
}

/// Revision of an existing draft. The feedback is passed through verbatim.
pub fn revise_prompt(current_draft: &str, feedback: &str) -> String {
    format!(
        "Please revise the following draft based on the provided feedback:\n\n\
         Current Draft:\n{current_draft}\n\n\
         Feedback:\n{feedback}\n\n\
         Please provide an improved version of the draft that addresses the \
         feedback while maintaining accuracy and clarity."
    )
}

/// Fact and consistency check over the draft and its sources.
pub fn fact_check_prompt(content: &str, sources: &[Finding]) -> String {
    format!(
        "Analyze the following content for factual accuracy and consistency:\n\n\
         Content: {content}\n\n\
         Research Sources: {}\n\n\
         Please identify any factual inaccuracies or inconsistencies and provide a \
         confidence score (0-1) for the overall accuracy. If you also rate \
         consistency, label it \"Consistency:\".",
        serialize_sources(sources)
    )
}

/// Bias check over the draft alone.
pub fn bias_check_prompt(content: &str) -> String {
    format!(
        "Analyze the following content for potential biases:\n\n\
         Content: {content}\n\n\
         Please identify any potential biases in language, perspective, or source \
         selection."
    )
}

/// Readability check over the draft alone.
pub fn readability_prompt(content: &str) -> String {
    format!(
        "Evaluate the readability of the following content:\n\n\
         Content: {content}\n\n\
         Please provide a readability score (0-1) and suggestions for improvement."
    )
}

/// Sources as compact JSON, one object per finding.
fn serialize_sources(sources: &[Finding]) -> String {
    serde_json::to_string(sources).unwrap_or_else(|_| "[]".to_string())
}
