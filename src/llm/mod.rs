//! Completion service boundary for generative planning
//!
//! The planner only needs `complete(prompt) -> text`. Every way that can go
//! wrong is a `CompletionError`, and the planner treats them all the same.

pub mod client;
pub mod parser;

pub use client::{ApiFormat, LlmClient};
pub use parser::extract_json;

use async_trait::async_trait;
use thiserror::Error;

/// Provider failures, mapped from transport errors and HTTP statuses
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Completion service unreachable: {0}")]
    Unreachable(String),

    #[error("Completion service rejected the credentials")]
    Unauthorized,

    #[error("Insufficient credits on the provider account")]
    InsufficientCredits,

    #[error("Rate limited by the provider")]
    RateLimited,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Completion timed out after {0}s")]
    Timeout(u64),

    #[error("Provider error {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Empty response")]
    EmptyResponse,

    #[error("No completion provider configured")]
    NotConfigured,
}

/// Anything that can turn a prompt into text
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}
