//! # EssayForge
//!
//! EssayForge researches a topic in parallel and merges the results into one cited
//! document. It fans a topic out to many independently generated drafts, one per
//! `(role, variation)` pair, keeps the best draft per role, and synthesizes the survivors
//! into a single essay with a deduplicated reference list.
//!
//! The crate provides:
//!
//! * **Role catalog**: [`roles`] holds ten research perspectives with prompt templates;
//!   the run intensity selects a prefix of them.
//! * **Parallel research**: [`orchestration::Orchestrator`] runs every task on tokio under a
//!   shared [`budget::ResourceBudget`], skipping new calls once a token or cost ceiling is
//!   reached and tolerating individual request failures.
//! * **Best-of-N selection**: [`scoring`] ranks drafts heuristically and
//!   [`selection::reduce`] keeps one winner per role.
//! * **Citations**: [`citation`] recognises links, academic `(Author, Year)` references
//!   and `[Source: ...]` tags, and dedupes them across a run.
//! * **Synthesis and quality**: [`synthesis::Synthesizer`] merges the winners with one
//!   generation call, and [`quality::aggregate`] scores the result.
//! * **Providers**: the [`ClientWrapper`] trait, implemented by the Anthropic
//!   [`clients::claude::ClaudeClient`] and the network-free
//!   [`clients::offline::OfflineClient`].
//! * **Progress**: [`event::ProgressSink`] receives task and run updates for dashboards
//!   or logs.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use essayforge::output::{render, OutputFormat};
//! use essayforge::{EssayForge, EssayForgeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     essayforge::init_logger();
//!
//!     let config = EssayForgeConfig::default()
//!         .with_intensity(4)
//!         .with_variations_per_role(2)
//!         .with_api_key(std::env::var("ANTHROPIC_API_KEY")?)
//!         .with_cost_limit(1.50);
//!
//!     let report = EssayForge::new(config)?.run("the future of tidal energy").await?;
//!     println!("{}", render(&report.document, Some(&report.quality), OutputFormat::Markdown));
//!     Ok(())
//! }
//! ```
//!
//! Set `offline` in the config to run the whole pipeline against deterministic templates
//! with no network access.

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// Applications embedding EssayForge can opt in to `RUST_LOG` driven diagnostics without
/// choosing a logging backend up front.
///
/// ```rust
/// essayforge::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

// Import the top-level `essayforge` module.
pub mod essayforge;

// Re-exporting key items for easier external access.
pub use essayforge::client_wrapper;
pub use essayforge::client_wrapper::{
    ClientWrapper, GenerationRequest, GenerationResponse, RequestPurpose, TokenUsage,
};
pub use essayforge::clients;
pub use essayforge::config;
pub use essayforge::config::EssayForgeConfig;
pub use essayforge::pipeline;
pub use essayforge::pipeline::{EssayForge, RunReport};

pub use essayforge::budget;
pub use essayforge::budget::ResourceBudget;
pub use essayforge::citation;
pub use essayforge::citation::CitationRecord;
pub use essayforge::event;
pub use essayforge::event::{ProgressSink, ProgressSnapshot, TaskStatus, TaskUpdate};
pub use essayforge::orchestration;
pub use essayforge::orchestration::{Candidate, OrchestrationError, Orchestrator};
pub use essayforge::output;
pub use essayforge::quality;
pub use essayforge::quality::QualityMetrics;
pub use essayforge::roles;
pub use essayforge::scoring;
pub use essayforge::selection;
pub use essayforge::synthesis;
pub use essayforge::synthesis::{FinalDocument, Synthesizer};
