use async_trait::async_trait;
use chrono::Utc;
use essayforge::budget::ResourceBudget;
use essayforge::citation;
use essayforge::client_wrapper::{
    ClientWrapper, GenerationRequest, GenerationResponse, RequestPurpose, TokenUsage,
};
use essayforge::clients::offline::OfflineClient;
use essayforge::orchestration::{Candidate, OrchestrationError};
use essayforge::synthesis::{build_merge_prompt, Synthesizer};
use std::error::Error;
use std::sync::{Arc, Mutex};

fn candidate(role_id: &str, text: &str) -> Candidate {
    Candidate {
        task_id: format!("{}-0-0", role_id),
        role_id: role_id.to_string(),
        variation_index: 0,
        text: text.to_string(),
        citations: citation::extract(text),
        token_usage: TokenUsage::new(10, 10),
        cost: 0.0,
        score: 1.0,
        quality_score: 0.4,
        timestamp: Utc::now(),
    }
}

/// Returns a fixed body and remembers the request it saw.
struct EchoClient {
    body: String,
    seen: Mutex<Option<GenerationRequest>>,
}

#[async_trait]
impl ClientWrapper for EchoClient {
    fn model_name(&self) -> &str {
        "echo"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, Box<dyn Error + Send + Sync>> {
        *self.seen.lock().unwrap() = Some(request);
        Ok(GenerationResponse {
            text: self.body.clone(),
            usage: TokenUsage::new(500, 250),
            cost: 0.02,
        })
    }
}

struct DownClient;

#[async_trait]
impl ClientWrapper for DownClient {
    fn model_name(&self) -> &str {
        "down"
    }

    async fn generate(
        &self,
        _request: GenerationRequest,
    ) -> Result<GenerationResponse, Box<dyn Error + Send + Sync>> {
        Err("service unavailable".into())
    }
}

#[test]
fn test_merge_prompt_contains_every_draft() {
    let selected = vec![
        candidate("fact-gatherer", "FACTS BODY"),
        candidate("counter-arguments", "CRITIQUE BODY"),
    ];
    let prompt = build_merge_prompt("Rust adoption", &selected);
    assert!(prompt.contains("\"Rust adoption\""));
    assert!(prompt.contains("=== fact-gatherer Research ===\nFACTS BODY"));
    assert!(prompt.contains("=== counter-arguments Research ===\nCRITIQUE BODY"));
    assert!(prompt.contains("executive summary"));
}

#[tokio::test]
async fn test_synthesis_assembles_document_and_records_usage() {
    let client = Arc::new(EchoClient {
        body: "## Summary\n\nMerged.".into(),
        seen: Mutex::new(None),
    });
    let budget = Arc::new(ResourceBudget::unlimited());
    let selected = vec![
        candidate("fact-gatherer", "[Foo](http://x) (Turner, 1998)"),
        candidate("current-state", "[Foo](http://x) [Bar](http://y)"),
    ];

    let document = Synthesizer::new(client.clone(), budget.clone())
        .with_best_of_n(3)
        .with_run_id("run-42")
        .synthesize("T", &selected, 6)
        .await
        .unwrap();

    assert_eq!(document.title, "Comprehensive Analysis: T");
    assert_eq!(document.body, "## Summary\n\nMerged.");
    assert_eq!(document.citations.len(), 3);
    assert!(document.content.starts_with("---\ntitle: \"Comprehensive Analysis: T\""));
    assert!(document.content.contains("synthesis_method: best-of-n-parallel"));
    assert!(document.content.contains("## References\n\n1. [Foo](http://x)\n"));
    assert!(document.content.contains("2. Turner (1998) - Turner (1998)\n3. [Bar](http://y)\n"));
    assert!(document.content.contains("best-of-3"));

    assert_eq!(document.metadata.run_id, "run-42");
    assert_eq!(document.metadata.total_variations, 6);
    assert_eq!(document.metadata.roles_used, vec!["fact-gatherer", "current-state"]);
    assert_eq!(document.metadata.word_count, 3);
    assert_eq!(budget.total_tokens(), 750);
    assert_eq!(document.metadata.total_tokens, 750);

    let seen = client.seen.lock().unwrap().clone().unwrap();
    match seen.purpose {
        RequestPurpose::Synthesis { topic, role_ids } => {
            assert_eq!(topic, "T");
            assert_eq!(role_ids.len(), 2);
        }
        other => panic!("unexpected purpose {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_merge_call_is_fatal() {
    let synthesizer = Synthesizer::new(Arc::new(DownClient), Arc::new(ResourceBudget::unlimited()));
    let err = synthesizer
        .synthesize("T", &[candidate("fact-gatherer", "x")], 1)
        .await
        .unwrap_err();
    match err {
        OrchestrationError::SynthesisFailed(msg) => assert!(msg.contains("service unavailable")),
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_nothing_to_merge() {
    let synthesizer =
        Synthesizer::new(Arc::new(OfflineClient::new()), Arc::new(ResourceBudget::unlimited()));
    let err = synthesizer.synthesize("T", &[], 0).await.unwrap_err();
    assert!(matches!(err, OrchestrationError::NoCandidates));
}

#[tokio::test]
async fn test_offline_body_reflects_topic() {
    let synthesizer =
        Synthesizer::new(Arc::new(OfflineClient::new()), Arc::new(ResourceBudget::unlimited()));
    let document = synthesizer
        .synthesize("Quantum Networking", &[candidate("fact-gatherer", "plain")], 1)
        .await
        .unwrap();
    assert!(document.body.contains("Quantum Networking"));
    assert!(document.citations.is_empty());
    assert!(!document.content.contains("## References"));
}
