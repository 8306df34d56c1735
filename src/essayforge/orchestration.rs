//! Parallel research fan-out.
//!
//! The [`Orchestrator`] turns a topic and a list of roles into one independent tokio task
//! per `(role, variation)` pair and waits for all of them behind a single join barrier.
//!
//! # Task lifecycle
//!
//! ```text
//! spawn ─┬─ acquire permit (only with a concurrency cap)
//!        ├─ budget exceeded? ── yes ──> Skipped
//!        ├─ Running ── generate(prompt) ── Err ──> Failed (siblings continue)
//!        └─ record usage, score, extract citations, write scratch file ──> Completed
//! ```
//!
//! The join loop is the only place that emits terminal task statuses and overall
//! [`ProgressSnapshot`]s, so the progress a sink sees is monotonic. A *hard* failure (a
//! task panicking, the scratch directory becoming unwritable, the permit source closing)
//! aborts every remaining task and fails the whole run with
//! [`OrchestrationError::ExecutionFailed`].
//!
//! Returned candidates are sorted by the role's position in the input slice and then by
//! variation index, whatever order the tasks finished in.
//!
//! # Example
//!
//! ```rust,no_run
//! use essayforge::budget::ResourceBudget;
//! use essayforge::clients::offline::OfflineClient;
//! use essayforge::orchestration::Orchestrator;
//! use essayforge::roles::select_roles;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let orchestrator = Orchestrator::new(
//!         Arc::new(OfflineClient::new()),
//!         Arc::new(ResourceBudget::unlimited()),
//!     )
//!     .with_max_concurrency(4);
//!
//!     let outcome = orchestrator.run("tidal energy", select_roles(3), 2).await?;
//!     println!("{} candidates, {} failures", outcome.candidates.len(), outcome.failed.len());
//!     Ok(())
//! }
//! ```

use crate::budget::ResourceBudget;
use crate::citation::{self, CitationRecord};
use crate::client_wrapper::{ClientWrapper, GenerationRequest, RequestPurpose, TokenUsage};
use crate::event::{NoopSink, ProgressSink, ProgressSnapshot, Stage, TaskStatus, TaskUpdate};
use crate::roles::RoleDefinition;
use crate::scoring;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Appended to every research prompt so models cite in a form the extractor understands.
pub const CITATION_INSTRUCTIONS: &str = "

Please ensure your response includes:
1. Specific facts and data with sources
2. Expert opinions with attribution
3. Recent developments
4. Cite all sources in the format: [Source: Title, Author/Organization, Date, URL if available]

Focus on accuracy and verifiability.";

/// Default output budget for a single research call.
pub const DEFAULT_MAX_OUTPUT_TOKENS: usize = 4000;

/// Progress percentage at the start and end of the research stage.
pub const RESEARCH_START_PERCENT: f64 = 10.0;
pub const RESEARCH_SPAN_PERCENT: f64 = 60.0;

/// One successful research output. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// `"{role_id}-{role_index}-{variation}"`.
    pub task_id: String,
    pub role_id: String,
    pub variation_index: usize,
    pub text: String,
    pub citations: Vec<CitationRecord>,
    pub token_usage: TokenUsage,
    pub cost: f64,
    /// Ranking score, only comparable within a role.
    pub score: f64,
    /// Normalised `[0, 1]` estimate.
    pub quality_score: f64,
    pub timestamp: DateTime<Utc>,
}

/// A task whose generation request failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskFailure {
    pub task_id: String,
    pub role_id: String,
    pub error: String,
}

/// Everything the research stage produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResearchOutcome {
    /// Successful candidates in `(role position, variation)` order.
    pub candidates: Vec<Candidate>,
    pub failed: Vec<TaskFailure>,
    /// Ids of tasks that never called the service because the budget was exhausted.
    pub skipped: Vec<String>,
    pub total_tasks: usize,
}

/// Errors that abort a run.
#[derive(Debug)]
pub enum OrchestrationError {
    /// The run could not be prepared (scratch directory, client construction, credentials).
    Setup(String),

    /// No roles were supplied.
    NoRoles,

    /// Every research task failed or was skipped.
    NoCandidates,

    /// A hard runtime failure: task panic, join error, scratch write or permit failure.
    ExecutionFailed(String),

    /// The synthesis call failed; no partial document is produced.
    SynthesisFailed(String),
}

impl fmt::Display for OrchestrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestrationError::Setup(msg) => write!(f, "Setup failed: {}", msg),
            OrchestrationError::NoRoles => write!(f, "No research roles selected"),
            OrchestrationError::NoCandidates => {
                write!(f, "No research candidates were produced")
            }
            OrchestrationError::ExecutionFailed(msg) => write!(f, "Execution failed: {}", msg),
            OrchestrationError::SynthesisFailed(msg) => write!(f, "Synthesis failed: {}", msg),
        }
    }
}

impl Error for OrchestrationError {}

enum TaskOutcome {
    Completed(Candidate),
    Failed(TaskFailure),
    Skipped { task_id: String, role_id: String },
}

/// Per-task inputs, moved into the spawned future.
struct TaskContext {
    task_id: String,
    role_id: String,
    variation_index: usize,
    topic: String,
    prompt: String,
    model: String,
    max_tokens: usize,
    client: Arc<dyn ClientWrapper>,
    budget: Arc<ResourceBudget>,
    sink: Arc<dyn ProgressSink>,
    semaphore: Option<Arc<Semaphore>>,
    scratch_dir: Arc<PathBuf>,
}

/// Runs the research fan-out for one topic.
pub struct Orchestrator {
    client: Arc<dyn ClientWrapper>,
    budget: Arc<ResourceBudget>,
    sink: Arc<dyn ProgressSink>,
    model: String,
    max_output_tokens: usize,
    max_concurrency: Option<usize>,
    scratch_root: Option<PathBuf>,
}

impl Orchestrator {
    /// Create an orchestrator that charges every call against `budget`.
    ///
    /// The model id defaults to the client's own model name.
    pub fn new(client: Arc<dyn ClientWrapper>, budget: Arc<ResourceBudget>) -> Self {
        let model = client.model_name().to_string();
        Orchestrator {
            client,
            budget,
            sink: Arc::new(NoopSink),
            model,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            max_concurrency: None,
            scratch_root: None,
        }
    }

    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_output_tokens(mut self, max_tokens: usize) -> Self {
        self.max_output_tokens = max_tokens;
        self
    }

    /// Cap the number of tasks inside the generation call at once. `0` is treated as `1`.
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit.max(1));
        self
    }

    /// Create per-run scratch directories under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    pub fn budget(&self) -> &Arc<ResourceBudget> {
        &self.budget
    }

    /// Run every `(role, variation)` task for `topic` and wait for all of them.
    ///
    /// `variations_per_role` below 1 is treated as 1.
    ///
    /// # Errors
    ///
    /// - [`OrchestrationError::NoRoles`] when `roles` is empty.
    /// - [`OrchestrationError::Setup`] when the scratch directory cannot be created.
    /// - [`OrchestrationError::ExecutionFailed`] on a hard task failure; remaining tasks
    ///   are aborted.
    ///
    /// Failed and skipped tasks are not errors; they are listed in the outcome.
    pub async fn run(
        &self,
        topic: &str,
        roles: &[RoleDefinition],
        variations_per_role: usize,
    ) -> Result<ResearchOutcome, OrchestrationError> {
        if roles.is_empty() {
            return Err(OrchestrationError::NoRoles);
        }
        let variations = variations_per_role.max(1);
        let total = roles.len() * variations;

        let scratch = self.create_scratch_dir()?;
        let scratch_dir = Arc::new(scratch.path().to_path_buf());
        let semaphore = self.max_concurrency.map(|n| Arc::new(Semaphore::new(n)));

        log::info!(
            "essayforge::orchestration::run(...): {} roles x {} variations = {} tasks for {:?}",
            roles.len(),
            variations,
            total,
            topic
        );

        let mut tasks = JoinSet::new();
        for (role_index, role) in roles.iter().enumerate() {
            let prompt = format!("{}{}", role.render_prompt(topic), CITATION_INSTRUCTIONS);
            for variation in 0..variations {
                let ctx = TaskContext {
                    task_id: format!("{}-{}-{}", role.id, role_index, variation),
                    role_id: role.id.to_string(),
                    variation_index: variation,
                    topic: topic.to_string(),
                    prompt: prompt.clone(),
                    model: self.model.clone(),
                    max_tokens: self.max_output_tokens,
                    client: Arc::clone(&self.client),
                    budget: Arc::clone(&self.budget),
                    sink: Arc::clone(&self.sink),
                    semaphore: semaphore.clone(),
                    scratch_dir: Arc::clone(&scratch_dir),
                };
                tasks.spawn(execute_task(ctx));
            }
        }

        let mut outcome = ResearchOutcome {
            total_tasks: total,
            ..ResearchOutcome::default()
        };
        let mut finished = 0usize;

        while let Some(joined) = tasks.join_next().await {
            let task_outcome = match joined {
                Ok(Ok(task_outcome)) => task_outcome,
                Ok(Err(hard)) => {
                    tasks.abort_all();
                    log::error!("essayforge::orchestration::run(...): aborting run: {}", hard);
                    return Err(hard);
                }
                Err(join_error) => {
                    tasks.abort_all();
                    log::error!(
                        "essayforge::orchestration::run(...): task join error: {}",
                        join_error
                    );
                    return Err(OrchestrationError::ExecutionFailed(format!(
                        "Task join error: {}",
                        join_error
                    )));
                }
            };
            finished += 1;

            let update = match task_outcome {
                TaskOutcome::Completed(candidate) => {
                    let update = TaskUpdate {
                        task_id: candidate.task_id.clone(),
                        role_id: candidate.role_id.clone(),
                        status: TaskStatus::Completed,
                        tokens_used: candidate.token_usage.total_tokens,
                    };
                    outcome.candidates.push(candidate);
                    update
                }
                TaskOutcome::Failed(failure) => {
                    let update = TaskUpdate {
                        task_id: failure.task_id.clone(),
                        role_id: failure.role_id.clone(),
                        status: TaskStatus::Failed,
                        tokens_used: 0,
                    };
                    outcome.failed.push(failure);
                    update
                }
                TaskOutcome::Skipped { task_id, role_id } => {
                    outcome.skipped.push(task_id.clone());
                    TaskUpdate {
                        task_id,
                        role_id,
                        status: TaskStatus::Skipped,
                        tokens_used: 0,
                    }
                }
            };
            self.sink.on_task_update(&update).await;

            let completed = outcome.candidates.len();
            let snapshot = ProgressSnapshot {
                stage: Stage::Research,
                percentage: research_percentage(completed, total),
                active_count: total - finished,
                completed_count: completed,
                tokens_used: self.budget.total_tokens(),
                estimated_cost: self.budget.total_cost(),
                message: format!("{} {}", update.task_id, update.status),
            };
            self.sink.on_progress(&snapshot).await;
        }

        outcome.candidates.sort_by_key(|c| {
            let role_position = roles
                .iter()
                .position(|role| role.id == c.role_id)
                .unwrap_or(usize::MAX);
            (role_position, c.variation_index)
        });

        log::info!(
            "essayforge::orchestration::run(...): {} completed, {} failed, {} skipped, {} tokens",
            outcome.candidates.len(),
            outcome.failed.len(),
            outcome.skipped.len(),
            self.budget.total_tokens()
        );

        Ok(outcome)
    }

    fn create_scratch_dir(&self) -> Result<tempfile::TempDir, OrchestrationError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("essayforge-");
        let created = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        created.map_err(|e| OrchestrationError::Setup(format!("scratch directory: {}", e)))
    }
}

/// `10 + 60 * completed / total`.
pub fn research_percentage(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return RESEARCH_START_PERCENT;
    }
    RESEARCH_START_PERCENT + RESEARCH_SPAN_PERCENT * completed as f64 / total as f64
}

async fn execute_task(ctx: TaskContext) -> Result<TaskOutcome, OrchestrationError> {
    let _permit = match &ctx.semaphore {
        Some(semaphore) => Some(Arc::clone(semaphore).acquire_owned().await.map_err(|e| {
            OrchestrationError::ExecutionFailed(format!("concurrency permit: {}", e))
        })?),
        None => None,
    };

    if ctx.budget.exceeded() {
        log::warn!(
            "essayforge::orchestration::execute_task({}): budget exhausted, skipping",
            ctx.task_id
        );
        return Ok(TaskOutcome::Skipped {
            task_id: ctx.task_id,
            role_id: ctx.role_id,
        });
    }

    ctx.sink
        .on_task_update(&TaskUpdate {
            task_id: ctx.task_id.clone(),
            role_id: ctx.role_id.clone(),
            status: TaskStatus::Running,
            tokens_used: 0,
        })
        .await;

    let request = GenerationRequest {
        model: ctx.model.clone(),
        prompt: ctx.prompt.clone(),
        max_tokens: ctx.max_tokens,
        purpose: RequestPurpose::Research {
            role_id: ctx.role_id.clone(),
            topic: ctx.topic.clone(),
        },
    };

    let response = match ctx.client.generate(request).await {
        Ok(response) => response,
        Err(e) => {
            log::error!(
                "essayforge::orchestration::execute_task({}): {}",
                ctx.task_id,
                e
            );
            return Ok(TaskOutcome::Failed(TaskFailure {
                task_id: ctx.task_id,
                role_id: ctx.role_id,
                error: e.to_string(),
            }));
        }
    };

    ctx.budget.record(&ctx.task_id, &response.usage, response.cost);

    write_scratch(&ctx.scratch_dir, &ctx.task_id, &response.text).await?;

    let candidate = Candidate {
        score: scoring::score(&response.text),
        quality_score: scoring::quality_score(&response.text),
        citations: citation::extract(&response.text),
        task_id: ctx.task_id,
        role_id: ctx.role_id,
        variation_index: ctx.variation_index,
        text: response.text,
        token_usage: response.usage,
        cost: response.cost,
        timestamp: Utc::now(),
    };

    log::debug!(
        "essayforge::orchestration::execute_task({}): score {:.2}, {} citations, {} tokens",
        candidate.task_id,
        candidate.score,
        candidate.citations.len(),
        candidate.token_usage.total_tokens
    );

    Ok(TaskOutcome::Completed(candidate))
}

async fn write_scratch(dir: &Path, task_id: &str, text: &str) -> Result<(), OrchestrationError> {
    let path = dir.join(format!("{}.md", task_id));
    tokio::fs::write(&path, text).await.map_err(|e| {
        OrchestrationError::ExecutionFailed(format!(
            "writing scratch file {}: {}",
            path.display(),
            e
        ))
    })
}
