//! Progress reporting for research runs.
//!
//! The pipeline pushes two kinds of notifications into a [`ProgressSink`]:
//!
//! - [`TaskUpdate`]: one research task changed status (`Running`, `Completed`,
//!   `Failed` or `Skipped`).
//! - [`ProgressSnapshot`]: the run as a whole moved forward (stage, percentage, counters).
//!
//! Snapshots are emitted only by the orchestrator's join loop and the pipeline driver, so
//! counters never go backwards. Both trait methods default to no-ops; implement only what
//! you need. Sinks are shared as `Arc<dyn ProgressSink>`.
//!
//! # Example
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use essayforge::event::{ProgressSink, ProgressSnapshot, TaskStatus, TaskUpdate};
//!
//! struct Printer;
//!
//! #[async_trait]
//! impl ProgressSink for Printer {
//!     async fn on_task_update(&self, update: &TaskUpdate) {
//!         if update.status == TaskStatus::Failed {
//!             eprintln!("{} failed", update.task_id);
//!         }
//!     }
//!     async fn on_progress(&self, snapshot: &ProgressSnapshot) {
//!         println!("[{:>3.0}%] {}", snapshot.percentage, snapshot.message);
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// Lifecycle of a single research task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
    /// Never called the service because the budget was already exhausted.
    Skipped,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

/// Status change of one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskUpdate {
    pub task_id: String,
    pub role_id: String,
    pub status: TaskStatus,
    /// Tokens consumed by this task so far (zero until it completes).
    pub tokens_used: usize,
}

/// Coarse phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Setup,
    Research,
    Synthesis,
    Complete,
}

/// Whole-run progress at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub stage: Stage,
    /// `0.0..=100.0`.
    pub percentage: f64,
    pub active_count: usize,
    pub completed_count: usize,
    pub tokens_used: usize,
    pub estimated_cost: f64,
    pub message: String,
}

/// Receiver for run progress. Both methods default to no-ops.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Called whenever a research task changes status.
    async fn on_task_update(&self, _update: &TaskUpdate) {}

    /// Called when the run as a whole advances.
    async fn on_progress(&self, _snapshot: &ProgressSnapshot) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

#[async_trait]
impl ProgressSink for NoopSink {}

/// Forwards progress into the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSink;

#[async_trait]
impl ProgressSink for LoggingSink {
    async fn on_task_update(&self, update: &TaskUpdate) {
        match update.status {
            TaskStatus::Failed => log::error!("task {} ({}) failed", update.task_id, update.role_id),
            TaskStatus::Skipped => {
                log::warn!("task {} ({}) skipped", update.task_id, update.role_id)
            }
            status => log::debug!(
                "task {} ({}) {} [{} tokens]",
                update.task_id,
                update.role_id,
                status,
                update.tokens_used
            ),
        }
    }

    async fn on_progress(&self, snapshot: &ProgressSnapshot) {
        log::info!(
            "[{:?} {:.0}%] {} (active {}, done {}, {} tokens, ${:.4})",
            snapshot.stage,
            snapshot.percentage,
            snapshot.message,
            snapshot.active_count,
            snapshot.completed_count,
            snapshot.tokens_used,
            snapshot.estimated_cost
        );
    }
}

#[derive(Debug, Default)]
struct BoardState {
    tasks: BTreeMap<String, TaskUpdate>,
    latest: Option<ProgressSnapshot>,
}

/// Point-in-time copy of a [`ProgressBoard`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoardSnapshot {
    /// Latest update per task, ordered by task id.
    pub tasks: Vec<TaskUpdate>,
    pub progress: Option<ProgressSnapshot>,
}

impl BoardSnapshot {
    /// Number of tasks currently in `status`.
    pub fn count(&self, status: TaskStatus) -> usize {
        self.tasks.iter().filter(|t| t.status == status).count()
    }
}

/// Sink that keeps the latest status of every task for a dashboard to poll.
#[derive(Debug, Default)]
pub struct ProgressBoard {
    state: Mutex<BoardState>,
}

impl ProgressBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Latest status recorded for `task_id`.
    pub fn status(&self, task_id: &str) -> Option<TaskStatus> {
        self.lock().tasks.get(task_id).map(|t| t.status)
    }

    /// Copy the board under its lock.
    pub fn snapshot(&self) -> BoardSnapshot {
        let state = self.lock();
        BoardSnapshot {
            tasks: state.tasks.values().cloned().collect(),
            progress: state.latest.clone(),
        }
    }
}

#[async_trait]
impl ProgressSink for ProgressBoard {
    async fn on_task_update(&self, update: &TaskUpdate) {
        self.lock()
            .tasks
            .insert(update.task_id.clone(), update.clone());
    }

    async fn on_progress(&self, snapshot: &ProgressSnapshot) {
        self.lock().latest = Some(snapshot.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(id: &str, status: TaskStatus) -> TaskUpdate {
        TaskUpdate {
            task_id: id.into(),
            role_id: "fact-gatherer".into(),
            status,
            tokens_used: 0,
        }
    }

    #[tokio::test]
    async fn test_board_keeps_latest_status_per_task() {
        let board = ProgressBoard::new();
        board.on_task_update(&update("a", TaskStatus::Running)).await;
        board.on_task_update(&update("b", TaskStatus::Running)).await;
        board.on_task_update(&update("a", TaskStatus::Completed)).await;

        let snap = board.snapshot();
        assert_eq!(snap.tasks.len(), 2);
        assert_eq!(snap.count(TaskStatus::Completed), 1);
        assert_eq!(board.status("b"), Some(TaskStatus::Running));
        assert!(snap.progress.is_none());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(TaskStatus::Skipped.to_string(), "skipped");
    }
}
