//! Anthropic Claude client speaking the Messages API directly over `reqwest`.
//!
//! Every call is a single user turn: the research pipeline never keeps conversation
//! state, so the client only needs the prompt, the model and an output budget. Usage is
//! taken from the response and priced with [`model_pricing`].
//!
//! # Example
//!
//! ```rust,no_run
//! use essayforge::client_wrapper::{ClientWrapper, GenerationRequest, RequestPurpose};
//! use essayforge::clients::claude::{ClaudeClient, Model};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let key = std::env::var("ANTHROPIC_API_KEY")?;
//!     let client = ClaudeClient::new_with_model_enum(&key, Model::ClaudeHaiku3)?;
//!     let response = client
//!         .generate(GenerationRequest {
//!             model: client.model_name().to_string(),
//!             prompt: "List three facts about tidal energy.".into(),
//!             max_tokens: 512,
//!             purpose: RequestPurpose::Research {
//!                 role_id: "fact-gatherer".into(),
//!                 topic: "tidal energy".into(),
//!             },
//!         })
//!         .await?;
//!     println!("{} ({} tokens, ${:.4})", response.text, response.usage.total_tokens, response.cost);
//!     Ok(())
//! }
//! ```

use crate::client_wrapper::{ClientWrapper, GenerationRequest, GenerationResponse, TokenUsage};
use crate::clients::common::{cost_for, truncate_for_log, ClientError};
use crate::clients::http_pool::get_http_client;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

/// Default Anthropic endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// API version header sent with every request.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Claude models with published pricing.
pub enum Model {
    /// `claude-3-opus-20240229` – most capable, highest cost.
    ClaudeOpus3,
    /// `claude-3-sonnet-20240229` – balanced performance and cost (default).
    ClaudeSonnet3,
    /// `claude-3-haiku-20240307` – fastest, lowest cost.
    ClaudeHaiku3,
}

/// Convert a [`Model`] variant into its public string identifier.
pub fn model_to_string(model: Model) -> String {
    match model {
        Model::ClaudeOpus3 => "claude-3-opus-20240229".to_string(),
        Model::ClaudeSonnet3 => "claude-3-sonnet-20240229".to_string(),
        Model::ClaudeHaiku3 => "claude-3-haiku-20240307".to_string(),
    }
}

/// USD per million `(input, output)` tokens. Unknown models are priced as Sonnet.
pub fn model_pricing(model: &str) -> (f64, f64) {
    match model {
        "claude-3-opus-20240229" => (15.0, 75.0),
        "claude-3-haiku-20240307" => (0.25, 1.25),
        _ => (3.0, 15.0),
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<ResponseUsage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ResponseUsage {
    input_tokens: usize,
    output_tokens: usize,
}

/// Client wrapper for Anthropic's Messages API.
pub struct ClaudeClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl fmt::Debug for ClaudeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaudeClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ClaudeClient {
    /// Create a client from an API key and strongly typed model variant.
    pub fn new_with_model_enum(secret_key: &str, model: Model) -> Result<Self, ClientError> {
        Self::new_with_model_str(secret_key, &model_to_string(model))
    }

    /// Create a client from an API key and explicit model string.
    pub fn new_with_model_str(secret_key: &str, model_name: &str) -> Result<Self, ClientError> {
        Self::new_with_base_url(secret_key, model_name, DEFAULT_BASE_URL)
    }

    /// Create a client pointing at a custom Messages-compatible base URL.
    ///
    /// # Errors
    ///
    /// [`ClientError::Setup`] when the key is blank or the HTTP client cannot be built.
    pub fn new_with_base_url(
        secret_key: &str,
        model_name: &str,
        base_url: &str,
    ) -> Result<Self, ClientError> {
        if secret_key.trim().is_empty() {
            return Err(ClientError::Setup("API key is empty".into()));
        }
        let http = get_http_client(base_url).map_err(|e| ClientError::Setup(e.to_string()))?;
        Ok(ClaudeClient {
            http,
            api_key: secret_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model_name.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

#[async_trait]
impl ClientWrapper for ClaudeClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, Box<dyn Error + Send + Sync>> {
        let model = if request.model.is_empty() {
            self.model.as_str()
        } else {
            request.model.as_str()
        };
        let body = MessagesRequest {
            model,
            max_tokens: request.max_tokens,
            messages: vec![RequestMessage {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            log::error!(
                "essayforge::clients::claude::generate(...): status {} from {}",
                status.as_u16(),
                self.base_url
            );
            return Err(Box::new(ClientError::Status {
                code: status.as_u16(),
                body: truncate_for_log(&text, 500),
            }));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        let text = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        if text.is_empty() {
            return Err(Box::new(ClientError::EmptyResponse));
        }

        let usage = match parsed.usage {
            Some(u) => TokenUsage::new(u.input_tokens, u.output_tokens),
            None => TokenUsage::estimate(&request.prompt, &text),
        };
        let (input_price, output_price) = model_pricing(model);
        let cost = cost_for(
            usage.input_tokens,
            usage.output_tokens,
            input_price,
            output_price,
        );

        log::debug!(
            "essayforge::clients::claude::generate(...): {} tokens, ${:.4}",
            usage.total_tokens,
            cost
        );

        Ok(GenerationResponse { text, usage, cost })
    }
}
