//! Configuration for an EssayForge run.
//!
//! [`EssayForgeConfig`] is a plain struct: build it in code, or deserialize it from
//! whatever format your application already uses. No file parsing happens here.
//!
//! # Example
//!
//! ```rust
//! use essayforge::EssayForgeConfig;
//!
//! let config = EssayForgeConfig::default()
//!     .with_intensity(3)
//!     .with_variations_per_role(2)
//!     .with_offline(true);
//! assert_eq!(config.intensity, 3);
//! assert_eq!(config.model, "claude-3-sonnet-20240229");
//! ```

use crate::clients::claude::DEFAULT_BASE_URL;
use crate::orchestration::DEFAULT_MAX_OUTPUT_TOKENS;
use crate::synthesis::DEFAULT_SYNTHESIS_MAX_TOKENS;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default Claude model.
pub const DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";

/// Settings for one run of the pipeline.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EssayForgeConfig {
    /// Number of roles to run (`<= 0` selects 2, `> 10` selects all 10).
    pub intensity: i64,
    /// Variations generated per role; values below 1 count as 1.
    pub variations_per_role: usize,
    /// Token ceiling; `0` is unlimited.
    pub token_limit: usize,
    /// Cost ceiling in USD; `0.0` is unlimited.
    pub cost_limit: f64,
    /// Use the deterministic offline client instead of the network.
    pub offline: bool,
    pub model: String,
    /// Anthropic API key. Required unless `offline` is set.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    /// Output budget for each research call.
    pub max_output_tokens: usize,
    /// Output budget for the synthesis call.
    pub synthesis_max_tokens: usize,
    /// Cap on concurrently running research calls; `None` runs everything at once.
    pub max_concurrency: Option<usize>,
    /// Parent directory for per-run scratch directories; `None` uses the system temp dir.
    pub scratch_root: Option<PathBuf>,
}

impl Default for EssayForgeConfig {
    fn default() -> Self {
        EssayForgeConfig {
            intensity: 5,
            variations_per_role: 1,
            token_limit: 0,
            cost_limit: 0.0,
            offline: false,
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            synthesis_max_tokens: DEFAULT_SYNTHESIS_MAX_TOKENS,
            max_concurrency: None,
            scratch_root: None,
        }
    }
}

impl fmt::Debug for EssayForgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EssayForgeConfig")
            .field("intensity", &self.intensity)
            .field("variations_per_role", &self.variations_per_role)
            .field("token_limit", &self.token_limit)
            .field("cost_limit", &self.cost_limit)
            .field("offline", &self.offline)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("synthesis_max_tokens", &self.synthesis_max_tokens)
            .field("max_concurrency", &self.max_concurrency)
            .field("scratch_root", &self.scratch_root)
            .finish()
    }
}

impl EssayForgeConfig {
    pub fn with_intensity(mut self, intensity: i64) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn with_variations_per_role(mut self, variations: usize) -> Self {
        self.variations_per_role = variations;
        self
    }

    pub fn with_token_limit(mut self, limit: usize) -> Self {
        self.token_limit = limit;
        self
    }

    pub fn with_cost_limit(mut self, limit: f64) -> Self {
        self.cost_limit = limit;
        self
    }

    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: usize) -> Self {
        self.max_output_tokens = tokens;
        self
    }

    pub fn with_synthesis_max_tokens(mut self, tokens: usize) -> Self {
        self.synthesis_max_tokens = tokens;
        self
    }

    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }

    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Variations per role after clamping to at least 1.
    pub fn effective_variations(&self) -> usize {
        self.variations_per_role.max(1)
    }
}
