//! Final merge of the selected candidates into one document.
//!
//! [`Synthesizer::synthesize`] builds a merge prompt from the selected drafts, makes a
//! single generation call, and assembles the [`FinalDocument`]: a YAML-style header, the
//! merged body, a numbered `## References` list built from the drafts' citations, and a
//! footer naming the best-of-N factor.
//!
//! References are extracted from the selected drafts, not from the merged body.

use crate::budget::ResourceBudget;
use crate::citation::{self, CitationRecord};
use crate::client_wrapper::{ClientWrapper, GenerationRequest, RequestPurpose};
use crate::orchestration::{Candidate, OrchestrationError};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Recorded in the document header and metadata.
pub const SYNTHESIS_METHOD: &str = "best-of-n-parallel";

/// Default output budget for the merge call.
pub const DEFAULT_SYNTHESIS_MAX_TOKENS: usize = 8000;

/// Facts about how a document was produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentMetadata {
    pub run_id: String,
    pub topic: String,
    pub generated_at: DateTime<Utc>,
    pub synthesis_method: String,
    /// Role ids of the selected candidates, in selection order.
    pub roles_used: Vec<String>,
    /// Number of candidates produced before selection.
    pub total_variations: usize,
    pub best_of_n: usize,
    /// Tokens recorded in the budget when the document was assembled.
    pub total_tokens: usize,
    pub estimated_cost: f64,
    pub generation_time_ms: u128,
    pub word_count: usize,
}

/// The one document a run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalDocument {
    pub title: String,
    /// Merged text returned by the synthesis call.
    pub body: String,
    /// Header, body, references and footer.
    pub content: String,
    pub citations: Vec<CitationRecord>,
    pub metadata: DocumentMetadata,
}

/// Merges selected candidates with one generation call.
pub struct Synthesizer {
    client: Arc<dyn ClientWrapper>,
    budget: Arc<ResourceBudget>,
    model: String,
    max_tokens: usize,
    best_of_n: usize,
    run_id: Option<String>,
}

impl Synthesizer {
    pub fn new(client: Arc<dyn ClientWrapper>, budget: Arc<ResourceBudget>) -> Self {
        let model = client.model_name().to_string();
        Synthesizer {
            client,
            budget,
            model,
            max_tokens: DEFAULT_SYNTHESIS_MAX_TOKENS,
            best_of_n: 1,
            run_id: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Variations generated per role; shown in the footer.
    pub fn with_best_of_n(mut self, n: usize) -> Self {
        self.best_of_n = n.max(1);
        self
    }

    /// Reuse an existing run id instead of generating one.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Merge `selected` into a [`FinalDocument`].
    ///
    /// `total_candidates` is the number of candidates produced before selection.
    ///
    /// # Errors
    ///
    /// [`OrchestrationError::NoCandidates`] when `selected` is empty and
    /// [`OrchestrationError::SynthesisFailed`] when the merge call fails.
    pub async fn synthesize(
        &self,
        topic: &str,
        selected: &[Candidate],
        total_candidates: usize,
    ) -> Result<FinalDocument, OrchestrationError> {
        if selected.is_empty() {
            return Err(OrchestrationError::NoCandidates);
        }
        let started = Instant::now();
        let role_ids: Vec<String> = selected.iter().map(|c| c.role_id.clone()).collect();

        log::info!(
            "essayforge::synthesis::synthesize(...): merging {} perspectives on {:?}",
            selected.len(),
            topic
        );

        let request = GenerationRequest {
            model: self.model.clone(),
            prompt: build_merge_prompt(topic, selected),
            max_tokens: self.max_tokens,
            purpose: RequestPurpose::Synthesis {
                topic: topic.to_string(),
                role_ids: role_ids.clone(),
            },
        };

        let response = self.client.generate(request).await.map_err(|e| {
            log::error!("essayforge::synthesis::synthesize(...): {}", e);
            OrchestrationError::SynthesisFailed(e.to_string())
        })?;
        self.budget.record("synthesis", &response.usage, response.cost);

        let citations = citation::extract_all(selected.iter().map(|c| c.text.as_str()));
        let generated_at = Utc::now();
        let title = format!("Comprehensive Analysis: {}", topic);
        let content = assemble_content(
            &title,
            topic,
            generated_at,
            &response.text,
            &citations,
            self.best_of_n,
        );

        let metadata = DocumentMetadata {
            run_id: self
                .run_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            topic: topic.to_string(),
            generated_at,
            synthesis_method: SYNTHESIS_METHOD.to_string(),
            roles_used: role_ids,
            total_variations: total_candidates,
            best_of_n: self.best_of_n,
            total_tokens: self.budget.total_tokens(),
            estimated_cost: self.budget.total_cost(),
            generation_time_ms: started.elapsed().as_millis(),
            word_count: response.text.split_whitespace().count(),
        };

        log::info!(
            "essayforge::synthesis::synthesize(...): {} words, {} references",
            metadata.word_count,
            citations.len()
        );

        Ok(FinalDocument {
            title,
            body: response.text,
            content,
            citations,
            metadata,
        })
    }
}

/// Prompt for the merge call; every selected draft appears in full.
pub fn build_merge_prompt(topic: &str, selected: &[Candidate]) -> String {
    let mut prompt = format!(
        "You are a master synthesis agent creating a comprehensive, well-cited essay on \"{}\".

You have been provided with research from multiple specialized agents. Your task is to:

1. Synthesize all the research into a cohesive, insightful essay
2. Maintain all citations and add proper references
3. Create a logical flow that covers all important aspects
4. Ensure the essay is comprehensive yet readable
5. Add section headings and structure
6. Include an executive summary at the beginning
7. End with conclusions and future considerations

Here is the research from each specialized agent:
",
        topic
    );

    for candidate in selected {
        let _ = write!(
            prompt,
            "\n=== {} Research ===\n{}\n",
            candidate.role_id, candidate.text
        );
    }

    prompt.push_str(
        "
Please create a comprehensive essay that:
- Integrates all perspectives seamlessly
- Maintains academic rigor with proper citations
- Provides unique insights from the synthesis
- Is structured with clear sections
- Balances depth with readability

Output the essay in markdown format with a clear structure.",
    );
    prompt
}

/// Header, body, references and footer.
pub fn assemble_content(
    title: &str,
    topic: &str,
    generated_at: DateTime<Utc>,
    body: &str,
    citations: &[CitationRecord],
    best_of_n: usize,
) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "---\ntitle: \"{}\"\ntopic: \"{}\"\ndate: {}\nsynthesis_method: {}\n---\n\n",
        title,
        topic,
        generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        SYNTHESIS_METHOD
    );
    out.push_str(body);

    if !citations.is_empty() {
        out.push_str("\n\n## References\n\n");
        out.push_str(&format_references(citations));
    }

    let _ = write!(
        out,
        "\n\n---\n*Generated using EssayForge with parallel research and best-of-{} selection.*\n",
        best_of_n
    );
    out
}

/// Numbered reference list, one line per citation.
pub fn format_references(citations: &[CitationRecord]) -> String {
    let mut out = String::new();
    for (i, c) in citations.iter().enumerate() {
        if c.url.is_empty() {
            let _ = write!(out, "{}. {}", i + 1, c.source);
        } else {
            let _ = write!(out, "{}. [{}]({})", i + 1, c.source, c.url);
        }
        if !c.authors.is_empty() {
            let _ = write!(out, " - {}", c.authors.join(", "));
        }
        if !c.date.is_empty() {
            let _ = write!(out, " ({})", c.date);
        }
        out.push('\n');
    }
    out
}
