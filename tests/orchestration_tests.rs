use async_trait::async_trait;
use essayforge::budget::ResourceBudget;
use essayforge::client_wrapper::{
    ClientWrapper, GenerationRequest, GenerationResponse, RequestPurpose, TokenUsage,
};
use essayforge::clients::offline::OfflineClient;
use essayforge::event::{ProgressBoard, ProgressSink, ProgressSnapshot, TaskStatus, TaskUpdate};
use essayforge::orchestration::{OrchestrationError, Orchestrator, CITATION_INSTRUCTIONS};
use essayforge::roles::select_roles;
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Answers every research request with a fixed text and usage.
struct MockClient {
    response: String,
    tokens: usize,
    fail_role: Option<String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockClient {
    fn new(response: &str, tokens: usize) -> Self {
        MockClient {
            response: response.to_string(),
            tokens,
            fail_role: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing_for(mut self, role_id: &str) -> Self {
        self.fail_role = Some(role_id.to_string());
        self
    }
}

#[async_trait]
impl ClientWrapper for MockClient {
    fn model_name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, Box<dyn Error + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        if let RequestPurpose::Research { role_id, .. } = &request.purpose {
            if self.fail_role.as_deref() == Some(role_id.as_str()) {
                return Err(format!("upstream refused {}", role_id).into());
            }
        }
        Ok(GenerationResponse {
            text: self.response.clone(),
            usage: TokenUsage::new(0, self.tokens),
            cost: 0.01,
        })
    }
}

/// Tracks how many calls are in flight at once.
struct SlowClient {
    current: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl ClientWrapper for SlowClient {
    fn model_name(&self) -> &str {
        "slow"
    }

    async fn generate(
        &self,
        _request: GenerationRequest,
    ) -> Result<GenerationResponse, Box<dyn Error + Send + Sync>> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(GenerationResponse {
            text: "slow draft".into(),
            usage: TokenUsage::new(1, 1),
            cost: 0.0,
        })
    }
}

struct PanickingClient;

#[async_trait]
impl ClientWrapper for PanickingClient {
    fn model_name(&self) -> &str {
        "panics"
    }

    async fn generate(
        &self,
        _request: GenerationRequest,
    ) -> Result<GenerationResponse, Box<dyn Error + Send + Sync>> {
        panic!("generation backend crashed");
    }
}

#[derive(Default)]
struct RecordingSink {
    updates: Mutex<Vec<TaskUpdate>>,
    snapshots: Mutex<Vec<ProgressSnapshot>>,
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn on_task_update(&self, update: &TaskUpdate) {
        self.updates.lock().unwrap().push(update.clone());
    }

    async fn on_progress(&self, snapshot: &ProgressSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot.clone());
    }
}

#[tokio::test]
async fn test_every_pair_produces_a_candidate_in_order() {
    let client = Arc::new(MockClient::new("## Draft\n\n[Foo](http://x)", 50));
    let orchestrator = Orchestrator::new(client.clone(), Arc::new(ResourceBudget::unlimited()));

    let outcome = orchestrator.run("T", select_roles(3), 2).await.unwrap();

    assert_eq!(outcome.total_tasks, 6);
    assert_eq!(outcome.candidates.len(), 6);
    assert!(outcome.failed.is_empty());
    assert!(outcome.skipped.is_empty());
    let ids: Vec<&str> = outcome.candidates.iter().map(|c| c.task_id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "fact-gatherer-0-0",
            "fact-gatherer-0-1",
            "current-state-1-0",
            "current-state-1-1",
            "expert-opinions-2-0",
            "expert-opinions-2-1",
        ]
    );
    assert_eq!(outcome.candidates[0].citations.len(), 1);
    assert_eq!(client.calls.load(Ordering::SeqCst), 6);
    assert_eq!(orchestrator.budget().total_tokens(), 300);
}

#[tokio::test]
async fn test_prompts_carry_topic_and_citation_instructions() {
    let client = Arc::new(MockClient::new("draft", 1));
    let orchestrator = Orchestrator::new(client.clone(), Arc::new(ResourceBudget::unlimited()));
    orchestrator.run("deep sea mining", select_roles(1), 1).await.unwrap();

    let prompts = client.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("deep sea mining"));
    assert!(prompts[0].ends_with(CITATION_INSTRUCTIONS));
}

#[tokio::test]
async fn test_request_failure_does_not_stop_siblings() {
    let client = Arc::new(MockClient::new("draft", 10).failing_for("current-state"));
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = Orchestrator::new(client, Arc::new(ResourceBudget::unlimited()))
        .with_progress_sink(sink.clone());

    let outcome = orchestrator.run("T", select_roles(3), 2).await.unwrap();

    assert_eq!(outcome.candidates.len(), 4);
    assert_eq!(outcome.failed.len(), 2);
    assert!(outcome.failed.iter().all(|f| f.role_id == "current-state"));
    assert!(outcome.failed[0].error.contains("upstream refused"));

    let failed_updates = sink
        .updates
        .lock()
        .unwrap()
        .iter()
        .filter(|u| u.status == TaskStatus::Failed)
        .count();
    assert_eq!(failed_updates, 2);
}

#[tokio::test]
async fn test_exhausted_budget_skips_remaining_tasks() {
    let client = Arc::new(MockClient::new("draft", 100));
    let budget = Arc::new(ResourceBudget::new(100, 0.0));
    let orchestrator = Orchestrator::new(client.clone(), budget.clone()).with_max_concurrency(1);

    let outcome = orchestrator.run("T", select_roles(4), 1).await.unwrap();

    assert_eq!(outcome.candidates.len(), 1);
    assert_eq!(outcome.skipped.len(), 3);
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    assert!(budget.exceeded());
}

#[tokio::test]
async fn test_concurrency_cap_is_respected() {
    let client = Arc::new(SlowClient {
        current: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let orchestrator = Orchestrator::new(client.clone(), Arc::new(ResourceBudget::unlimited()))
        .with_max_concurrency(2);

    let outcome = orchestrator.run("T", select_roles(4), 2).await.unwrap();

    assert_eq!(outcome.candidates.len(), 8);
    assert!(client.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_progress_is_monotonic_and_ends_at_seventy() {
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = Orchestrator::new(
        Arc::new(OfflineClient::new()),
        Arc::new(ResourceBudget::unlimited()),
    )
    .with_progress_sink(sink.clone());

    orchestrator.run("T", select_roles(5), 2).await.unwrap();

    let snapshots = sink.snapshots.lock().unwrap();
    assert_eq!(snapshots.len(), 10);
    for pair in snapshots.windows(2) {
        assert!(pair[1].percentage >= pair[0].percentage);
        assert!(pair[1].tokens_used >= pair[0].tokens_used);
    }
    let last = snapshots.last().unwrap();
    assert!((last.percentage - 70.0).abs() < 1e-9);
    assert_eq!(last.completed_count, 10);
    assert_eq!(last.active_count, 0);
}

#[tokio::test]
async fn test_board_sees_every_task_complete() {
    let board = Arc::new(ProgressBoard::new());
    let orchestrator = Orchestrator::new(
        Arc::new(OfflineClient::new()),
        Arc::new(ResourceBudget::unlimited()),
    )
    .with_progress_sink(board.clone());

    orchestrator.run("T", select_roles(2), 3).await.unwrap();

    let snap = board.snapshot();
    assert_eq!(snap.tasks.len(), 6);
    assert_eq!(snap.count(TaskStatus::Completed), 6);
    assert_eq!(board.status("current-state-1-2"), Some(TaskStatus::Completed));
}

#[tokio::test]
async fn test_zero_variations_counts_as_one() {
    let orchestrator = Orchestrator::new(
        Arc::new(OfflineClient::new()),
        Arc::new(ResourceBudget::unlimited()),
    );
    let outcome = orchestrator.run("T", select_roles(2), 0).await.unwrap();
    assert_eq!(outcome.total_tasks, 2);
    assert_eq!(outcome.candidates.len(), 2);
}

#[tokio::test]
async fn test_empty_roles_is_an_error() {
    let orchestrator = Orchestrator::new(
        Arc::new(OfflineClient::new()),
        Arc::new(ResourceBudget::unlimited()),
    );
    let err = orchestrator.run("T", &[], 1).await.unwrap_err();
    assert!(matches!(err, OrchestrationError::NoRoles));
}

#[tokio::test]
async fn test_task_panic_fails_the_run() {
    let orchestrator = Orchestrator::new(
        Arc::new(PanickingClient),
        Arc::new(ResourceBudget::unlimited()),
    );
    let err = orchestrator.run("T", select_roles(3), 1).await.unwrap_err();
    assert!(matches!(err, OrchestrationError::ExecutionFailed(_)));
}

#[tokio::test]
async fn test_unusable_scratch_root_is_setup_error() {
    let dir = tempfile::tempdir().unwrap();
    let not_a_dir = dir.path().join("plain-file");
    std::fs::write(&not_a_dir, "x").unwrap();

    let orchestrator = Orchestrator::new(
        Arc::new(OfflineClient::new()),
        Arc::new(ResourceBudget::unlimited()),
    )
    .with_scratch_root(&not_a_dir);

    let err = orchestrator.run("T", select_roles(2), 1).await.unwrap_err();
    assert!(matches!(err, OrchestrationError::Setup(_)));
}

#[tokio::test]
async fn test_scratch_directory_is_cleaned_up() {
    let root = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(
        Arc::new(OfflineClient::new()),
        Arc::new(ResourceBudget::unlimited()),
    )
    .with_scratch_root(root.path());

    orchestrator.run("T", select_roles(2), 1).await.unwrap();

    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

/// Deletes every per-run scratch directory under `root` before answering.
struct ScratchWipingClient {
    root: std::path::PathBuf,
    calls: AtomicUsize,
}

#[async_trait]
impl ClientWrapper for ScratchWipingClient {
    fn model_name(&self) -> &str {
        "wiper"
    }

    async fn generate(
        &self,
        _request: GenerationRequest,
    ) -> Result<GenerationResponse, Box<dyn Error + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for entry in std::fs::read_dir(&self.root)? {
            std::fs::remove_dir_all(entry?.path())?;
        }
        Ok(GenerationResponse {
            text: "draft [Source: Report, Org, 2024]".into(),
            usage: TokenUsage::new(0, 10),
            cost: 0.0,
        })
    }
}

#[tokio::test]
async fn test_scratch_write_failure_aborts_remaining_tasks() {
    let root = tempfile::tempdir().unwrap();
    let client = Arc::new(ScratchWipingClient {
        root: root.path().to_path_buf(),
        calls: AtomicUsize::new(0),
    });
    let orchestrator = Orchestrator::new(client.clone(), Arc::new(ResourceBudget::unlimited()))
        .with_scratch_root(root.path())
        .with_max_concurrency(1);

    let err = orchestrator.run("T", select_roles(4), 2).await.unwrap_err();
    match err {
        OrchestrationError::ExecutionFailed(msg) => assert!(msg.contains("scratch")),
        other => panic!("expected ExecutionFailed, got {:?}", other),
    }
    assert!(client.calls.load(Ordering::SeqCst) < 8);
}
