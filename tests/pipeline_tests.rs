use async_trait::async_trait;
use essayforge::client_wrapper::{
    ClientWrapper, GenerationRequest, GenerationResponse, RequestPurpose, TokenUsage,
};
use essayforge::clients::offline::OfflineClient;
use essayforge::event::{ProgressBoard, Stage, TaskStatus};
use essayforge::orchestration::OrchestrationError;
use essayforge::output::{render, OutputFormat};
use essayforge::{EssayForge, EssayForgeConfig};
use std::error::Error;
use std::sync::Arc;

fn offline_config() -> EssayForgeConfig {
    EssayForgeConfig::default().with_offline(true)
}

/// Research succeeds offline; the merge call fails.
struct NoSynthesisClient {
    inner: OfflineClient,
}

#[async_trait]
impl ClientWrapper for NoSynthesisClient {
    fn model_name(&self) -> &str {
        "no-synthesis"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, Box<dyn Error + Send + Sync>> {
        match request.purpose {
            RequestPurpose::Synthesis { .. } => Err("merge model overloaded".into()),
            RequestPurpose::Research { .. } => self.inner.generate(request).await,
        }
    }
}

struct AlwaysFails;

#[async_trait]
impl ClientWrapper for AlwaysFails {
    fn model_name(&self) -> &str {
        "fails"
    }

    async fn generate(
        &self,
        _request: GenerationRequest,
    ) -> Result<GenerationResponse, Box<dyn Error + Send + Sync>> {
        Err("no route to host".into())
    }
}

/// Plain drafts with no citations at all.
struct UncitedClient;

#[async_trait]
impl ClientWrapper for UncitedClient {
    fn model_name(&self) -> &str {
        "uncited"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, Box<dyn Error + Send + Sync>> {
        let text = match request.purpose {
            RequestPurpose::Research { role_id, .. } => format!("Notes from {}.", role_id),
            RequestPurpose::Synthesis { .. } => "## Essay\n\nMerged notes.".to_string(),
        };
        Ok(GenerationResponse {
            text,
            usage: TokenUsage::new(5, 5),
            cost: 0.0,
        })
    }
}

#[tokio::test]
async fn test_offline_end_to_end() {
    let forge = EssayForge::new(offline_config().with_intensity(2).with_variations_per_role(1))
        .unwrap();
    let report = forge.run("T").await.unwrap();

    assert_eq!(report.candidates.len(), 2);
    assert_eq!(report.selected.len(), 2);
    assert!(report.failed_tasks.is_empty());
    assert!(report.skipped_tasks.is_empty());

    let has_citations = report.candidates.iter().any(|c| !c.citations.is_empty());
    assert!(has_citations);
    assert!(!report.document.citations.is_empty());
    assert!(report.document.content.contains("## References"));
    assert!(report.document.body.contains('T'));
    assert_eq!(report.document.metadata.roles_used, vec!["fact-gatherer", "current-state"]);
    assert_eq!(report.document.metadata.run_id, report.run_id);

    assert!((0.0..=1.0).contains(&report.quality.overall_score));
    assert!((report.quality.originality - 1.0).abs() < 1e-9);

    // Two research drafts at 950 tokens each plus the synthesis call.
    assert!(report.budget.total_tokens > 1900);
}

#[tokio::test]
async fn test_no_citations_means_no_references() {
    let forge =
        EssayForge::with_client(offline_config().with_intensity(2), Arc::new(UncitedClient));
    let report = forge.run("T").await.unwrap();

    assert!(report.candidates.iter().all(|c| c.citations.is_empty()));
    assert!(report.document.citations.is_empty());
    assert!(!report.document.content.contains("## References"));
}

#[tokio::test]
async fn test_best_of_n_selects_one_per_role() {
    let forge = EssayForge::new(offline_config().with_intensity(3).with_variations_per_role(3))
        .unwrap();
    let report = forge.run("Ocean Acidification").await.unwrap();

    assert_eq!(report.candidates.len(), 9);
    assert_eq!(report.selected.len(), 3);
    assert_eq!(report.document.metadata.best_of_n, 3);
    assert_eq!(report.document.metadata.total_variations, 9);
    assert!(report.document.content.contains("best-of-3"));
}

#[tokio::test]
async fn test_token_ceiling_skips_tasks_but_still_synthesizes() {
    let config = offline_config()
        .with_intensity(4)
        .with_token_limit(950)
        .with_max_concurrency(1);
    let report = EssayForge::new(config).unwrap().run("T").await.unwrap();

    assert_eq!(report.candidates.len(), 1);
    assert_eq!(report.skipped_tasks.len(), 3);
    assert_eq!(report.selected.len(), 1);
}

#[tokio::test]
async fn test_zero_candidates_aborts() {
    let forge = EssayForge::with_client(offline_config(), Arc::new(AlwaysFails));
    let err = forge.run("T").await.unwrap_err();
    assert!(matches!(err, OrchestrationError::NoCandidates));
}

#[tokio::test]
async fn test_synthesis_failure_is_fatal() {
    let client = Arc::new(NoSynthesisClient {
        inner: OfflineClient::new(),
    });
    let forge = EssayForge::with_client(offline_config().with_intensity(2), client);
    let err = forge.run("T").await.unwrap_err();
    assert!(matches!(err, OrchestrationError::SynthesisFailed(_)));
}

#[test]
fn test_online_mode_requires_api_key() {
    let result = EssayForge::new(EssayForgeConfig::default());
    assert!(matches!(result, Err(OrchestrationError::Setup(_))));

    let blank = EssayForge::new(EssayForgeConfig::default().with_api_key("   "));
    assert!(matches!(blank, Err(OrchestrationError::Setup(_))));

    let ok = EssayForge::new(EssayForgeConfig::default().with_api_key("sk-test"));
    assert!(ok.is_ok());
}

#[tokio::test]
async fn test_progress_board_ends_complete() {
    let board = Arc::new(ProgressBoard::new());
    let forge = EssayForge::new(offline_config().with_intensity(3))
        .unwrap()
        .with_progress_sink(board.clone());
    forge.run("T").await.unwrap();

    let snap = board.snapshot();
    assert_eq!(snap.count(TaskStatus::Completed), 3);
    let progress = snap.progress.as_ref().expect("progress recorded");
    assert_eq!(progress.stage, Stage::Complete);
    assert!((progress.percentage - 100.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_report_renders_in_every_format() {
    let report = EssayForge::new(offline_config().with_intensity(2))
        .unwrap()
        .run("T")
        .await
        .unwrap();
    for format in [OutputFormat::Markdown, OutputFormat::Latex, OutputFormat::Html] {
        let text = render(&report.document, Some(&report.quality), format);
        assert!(!text.is_empty());
    }
}
