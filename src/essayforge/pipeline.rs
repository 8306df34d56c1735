//! Whole-run driver: research, selection, synthesis and quality in one call.
//!
//! ```text
//! Setup (0%) ─> Research (10%..70%) ─> Synthesis (70%) ─> Complete (100%)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use essayforge::{EssayForge, EssayForgeConfig};
//! use essayforge::event::LoggingSink;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     essayforge::init_logger();
//!     let config = EssayForgeConfig::default().with_offline(true).with_intensity(3);
//!     let forge = EssayForge::new(config)?.with_progress_sink(Arc::new(LoggingSink));
//!     let report = forge.run("tidal energy").await?;
//!     println!("{}", report.document.content);
//!     Ok(())
//! }
//! ```

use crate::budget::{BudgetSnapshot, ResourceBudget};
use crate::client_wrapper::ClientWrapper;
use crate::clients::claude::ClaudeClient;
use crate::clients::offline::OfflineClient;
use crate::config::EssayForgeConfig;
use crate::event::{NoopSink, ProgressSink, ProgressSnapshot, Stage};
use crate::orchestration::{
    Candidate, OrchestrationError, Orchestrator, TaskFailure, RESEARCH_SPAN_PERCENT,
    RESEARCH_START_PERCENT,
};
use crate::quality::{self, QualityMetrics};
use crate::roles;
use crate::selection;
use crate::synthesis::{FinalDocument, Synthesizer};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub document: FinalDocument,
    pub quality: QualityMetrics,
    /// Every successful candidate, in `(role, variation)` order.
    pub candidates: Vec<Candidate>,
    /// The per-role winners that were merged.
    pub selected: Vec<Candidate>,
    pub failed_tasks: Vec<TaskFailure>,
    pub skipped_tasks: Vec<String>,
    pub budget: BudgetSnapshot,
}

/// Runs the full research pipeline for a topic.
pub struct EssayForge {
    config: EssayForgeConfig,
    client: Arc<dyn ClientWrapper>,
    sink: Arc<dyn ProgressSink>,
}

impl EssayForge {
    /// Build a pipeline with the client implied by `config`.
    ///
    /// # Errors
    ///
    /// [`OrchestrationError::Setup`] when online mode has no API key or the HTTP client
    /// cannot be built.
    pub fn new(config: EssayForgeConfig) -> Result<Self, OrchestrationError> {
        let client: Arc<dyn ClientWrapper> = if config.offline {
            Arc::new(OfflineClient::new())
        } else {
            let key = config
                .api_key
                .as_deref()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| {
                    OrchestrationError::Setup(
                        "an Anthropic API key is required unless offline mode is enabled".into(),
                    )
                })?;
            let claude = ClaudeClient::new_with_base_url(key, &config.model, &config.base_url)
                .map_err(|e| OrchestrationError::Setup(e.to_string()))?;
            Arc::new(claude)
        };
        Ok(Self::with_client(config, client))
    }

    /// Build a pipeline around an existing client; `config.offline` and `config.api_key`
    /// are ignored.
    pub fn with_client(config: EssayForgeConfig, client: Arc<dyn ClientWrapper>) -> Self {
        EssayForge {
            config,
            client,
            sink: Arc::new(NoopSink),
        }
    }

    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &EssayForgeConfig {
        &self.config
    }

    /// Research `topic` and return the synthesized document with its metrics.
    ///
    /// # Errors
    ///
    /// - [`OrchestrationError::Setup`] / [`OrchestrationError::ExecutionFailed`] from the
    ///   research stage.
    /// - [`OrchestrationError::NoCandidates`] when every task failed or was skipped.
    /// - [`OrchestrationError::SynthesisFailed`] when the merge call fails.
    pub async fn run(&self, topic: &str) -> Result<RunReport, OrchestrationError> {
        let run_id = Uuid::new_v4().to_string();
        let budget = Arc::new(ResourceBudget::new(
            self.config.token_limit,
            self.config.cost_limit,
        ));
        let selected_roles = roles::select_roles(self.config.intensity);
        let variations = self.config.effective_variations();

        log::info!(
            "essayforge::pipeline::run({}): topic {:?}, {} roles, best-of-{}",
            run_id,
            topic,
            selected_roles.len(),
            variations
        );
        self.emit(Stage::Setup, 0.0, &budget, 0, 0, "Preparing research run")
            .await;

        let mut orchestrator = Orchestrator::new(Arc::clone(&self.client), Arc::clone(&budget))
            .with_progress_sink(Arc::clone(&self.sink))
            .with_model(self.config.model.clone())
            .with_max_output_tokens(self.config.max_output_tokens);
        if let Some(limit) = self.config.max_concurrency {
            orchestrator = orchestrator.with_max_concurrency(limit);
        }
        if let Some(root) = &self.config.scratch_root {
            orchestrator = orchestrator.with_scratch_root(root.clone());
        }

        let total_tasks = selected_roles.len() * variations;
        self.emit(
            Stage::Research,
            RESEARCH_START_PERCENT,
            &budget,
            total_tasks,
            0,
            "Running parallel research",
        )
        .await;

        let outcome = orchestrator.run(topic, selected_roles, variations).await?;
        if outcome.candidates.is_empty() {
            log::error!(
                "essayforge::pipeline::run({}): no candidates ({} failed, {} skipped)",
                run_id,
                outcome.failed.len(),
                outcome.skipped.len()
            );
            return Err(OrchestrationError::NoCandidates);
        }
        for role in selected_roles {
            if !outcome.candidates.iter().any(|c| c.role_id == role.id) {
                log::warn!(
                    "essayforge::pipeline::run({}): role {} produced no candidates",
                    run_id,
                    role.id
                );
            }
        }

        self.emit(
            Stage::Synthesis,
            RESEARCH_START_PERCENT + RESEARCH_SPAN_PERCENT,
            &budget,
            0,
            outcome.candidates.len(),
            "Selecting best variations and synthesizing",
        )
        .await;

        let selected = selection::reduce(outcome.candidates.clone());
        let document = Synthesizer::new(Arc::clone(&self.client), Arc::clone(&budget))
            .with_model(self.config.model.clone())
            .with_max_tokens(self.config.synthesis_max_tokens)
            .with_best_of_n(variations)
            .with_run_id(run_id.clone())
            .synthesize(topic, &selected, outcome.candidates.len())
            .await?;

        let quality = quality::aggregate(&document, &outcome.candidates, selected_roles.len());

        self.emit(
            Stage::Complete,
            100.0,
            &budget,
            0,
            outcome.candidates.len(),
            "Essay complete",
        )
        .await;

        log::info!(
            "essayforge::pipeline::run({}): overall quality {:.2}, {} tokens, ${:.4}",
            run_id,
            quality.overall_score,
            budget.total_tokens(),
            budget.total_cost()
        );

        Ok(RunReport {
            run_id,
            document,
            quality,
            candidates: outcome.candidates,
            selected,
            failed_tasks: outcome.failed,
            skipped_tasks: outcome.skipped,
            budget: budget.snapshot(),
        })
    }

    async fn emit(
        &self,
        stage: Stage,
        percentage: f64,
        budget: &ResourceBudget,
        active_count: usize,
        completed_count: usize,
        message: &str,
    ) {
        let snapshot = ProgressSnapshot {
            stage,
            percentage,
            active_count,
            completed_count,
            tokens_used: budget.total_tokens(),
            estimated_cost: budget.total_cost(),
            message: message.to_string(),
        };
        self.sink.on_progress(&snapshot).await;
    }
}
