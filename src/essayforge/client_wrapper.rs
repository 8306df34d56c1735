use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;

/// A ClientWrapper is a wrapper around a text-generation service.
/// It provides a single request/response interface to the research pipeline.
/// It does not keep any conversation state: every research task and the final
/// synthesis issue exactly one independent request.
// src/essayforge/client_wrapper

/// How many tokens were spent on prompt vs. completion.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

impl TokenUsage {
    /// Build a usage record, deriving `total_tokens` from its parts.
    pub fn new(input_tokens: usize, output_tokens: usize) -> Self {
        TokenUsage {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }

    /// Rough usage estimate at four characters per token, for services that do
    /// not report usage.
    pub fn estimate(prompt: &str, completion: &str) -> Self {
        TokenUsage::new(prompt.len() / 4, completion.len() / 4)
    }
}

/// Why a request is being made.
///
/// Network clients ignore this; the [`OfflineClient`](crate::clients::offline::OfflineClient)
/// uses it to pick a deterministic template.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestPurpose {
    /// One research draft for a role.
    Research { role_id: String, topic: String },
    /// The single merge call over the selected drafts.
    Synthesis { topic: String, role_ids: Vec<String> },
}

/// A single generation request.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
    /// Model identifier forwarded to the service.
    pub model: String,
    /// Full prompt text.
    pub prompt: String,
    /// Upper bound on generated tokens.
    pub max_tokens: usize,
    pub purpose: RequestPurpose,
}

/// What the service sends back.
#[derive(Clone, Debug)]
pub struct GenerationResponse {
    pub text: String,
    pub usage: TokenUsage,
    /// Cost of this call in USD.
    pub cost: f64,
}

/// Trait defining the interface to a text-generation service.
///
/// Errors are recoverable per call: the orchestrator drops the failing research task and
/// carries on, while a failing synthesis call fails the run.
#[async_trait]
pub trait ClientWrapper: Send + Sync {
    /// Model identifier this client was configured with.
    fn model_name(&self) -> &str;

    /// Send one prompt and wait for the full response.
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, Box<dyn Error + Send + Sync>>;
}
