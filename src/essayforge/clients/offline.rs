//! A network-free [`ClientWrapper`] that answers from deterministic templates.
//!
//! Used for demo runs and self-contained tests: research requests return a per-role
//! markdown draft that embeds the topic and at least one extractable citation, and the
//! synthesis request returns a structured essay body naming the topic and the merged
//! perspectives. The same request always yields the same response.

use crate::client_wrapper::{
    ClientWrapper, GenerationRequest, GenerationResponse, RequestPurpose, TokenUsage,
};
use async_trait::async_trait;
use std::error::Error;

/// Model name reported by the offline client.
pub const OFFLINE_MODEL: &str = "offline";

/// Usage charged for every offline research draft.
const RESEARCH_INPUT_TOKENS: usize = 150;
const RESEARCH_OUTPUT_TOKENS: usize = 800;
const RESEARCH_COST: f64 = 0.05;

/// Flat price used to cost the offline synthesis call (USD per million tokens).
const SYNTHESIS_PRICE_PER_MILLION: f64 = 15.0;

/// Deterministic stand-in for a generation service.
#[derive(Debug, Default, Clone)]
pub struct OfflineClient;

impl OfflineClient {
    pub fn new() -> Self {
        OfflineClient
    }
}

#[async_trait]
impl ClientWrapper for OfflineClient {
    fn model_name(&self) -> &str {
        OFFLINE_MODEL
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, Box<dyn Error + Send + Sync>> {
        match &request.purpose {
            RequestPurpose::Research { role_id, topic } => Ok(GenerationResponse {
                text: research_draft(role_id, topic),
                usage: TokenUsage::new(RESEARCH_INPUT_TOKENS, RESEARCH_OUTPUT_TOKENS),
                cost: RESEARCH_COST,
            }),
            RequestPurpose::Synthesis { topic, role_ids } => {
                let text = essay_body(topic, role_ids);
                let usage = TokenUsage::estimate(&request.prompt, &text);
                let cost =
                    usage.total_tokens as f64 / 1_000_000.0 * SYNTHESIS_PRICE_PER_MILLION;
                Ok(GenerationResponse { text, usage, cost })
            }
        }
    }
}

/// Templated research draft for `role_id`.
pub fn research_draft(role_id: &str, topic: &str) -> String {
    let template = match role_id {
        "fact-gatherer" => {
            "# Key Facts about {topic}\n\n\
             ## Statistics\n\
             - 87% of surveyed practitioners report measurable benefits\n\
             - 45% reduction in reported defects after adoption\n\
             - 3x faster iteration cycles in pilot programmes\n\n\
             ## Core Concepts\n\
             1. Definitions and scope\n\
             2. Measurable outcomes\n\
             3. Known constraints\n\n\
             According to a recent study, the data indicates steady growth (Smith & Lee, 2023).\n\n\
             [Source](https://example.com/facts-study)"
        }
        "current-state" => {
            "# Current State of {topic}\n\n\
             ## Latest Trends\n\
             - Growing adoption in enterprise environments\n\
             - Integration with existing tooling\n\
             - Increased investment in training\n\n\
             ## Recent Developments\n\
             Analysis of recent releases found that interest keeps rising.\n\n\
             [Industry Report 2024](https://example.com/report)"
        }
        "expert-opinions" => {
            "# Expert Perspectives on {topic}\n\n\
             > \"This is not just a technique, it is a mindset shift\" - Jane Doe, Research Lead\n\n\
             > \"The benefits become clear once teams commit to it\" - Dr. John Smith\n\n\
             ## Consensus Views\n\
             - Improved maintainability\n\
             - Better evidence-based decision making\n\n\
             [Expert Panel](https://example.com/panel)"
        }
        "historical-context" => {
            "# Historical Development of {topic}\n\n\
             ## Origins\n\
             - Early theoretical work\n\
             - First practical implementations\n\n\
             ## Evolution\n\
             - Standardisation efforts\n\
             - Mainstream adoption in the 2010s\n\n\
             Historians of the field describe a long arc (Turner, 1998).\n\n\
             [History Archive](https://example.com/history)"
        }
        "counter-arguments" => {
            "# Criticisms of {topic}\n\n\
             ## Common Concerns\n\
             - Steep learning curve\n\
             - Performance overhead claims\n\
             - Limited talent pool\n\n\
             ## Rebuttals\n\
             - Tooling has matured\n\
             - Return on investment justifies training\n\n\
             [Debate Analysis](https://example.com/debate)"
        }
        _ => {
            "# {role} Research on {topic}\n\n\
             Comprehensive analysis of {topic} from the {role} perspective.\n\n\
             [Source](https://example.com/{role})"
        }
    };
    template.replace("{topic}", topic).replace("{role}", role_id)
}

/// Templated essay body for the synthesis step.
pub fn essay_body(topic: &str, role_ids: &[String]) -> String {
    let perspectives = if role_ids.is_empty() {
        "no specialised perspectives".to_string()
    } else {
        role_ids.join(", ")
    };

    let mut sections = String::new();
    for role_id in role_ids {
        sections.push_str(&format!(
            "### {}\n\nThe {} perspective contributes evidence and analysis on {}.\n\n",
            title_case(role_id),
            role_id,
            topic
        ));
    }

    format!(
        "# Comprehensive Analysis: {topic}\n\n\
         ## Executive Summary\n\n\
         This analysis synthesizes parallel research on {topic} drawn from the following \
         perspectives: {perspectives}.\n\n\
         ## Key Findings\n\n\
         {sections}\
         ## Benefits and Challenges\n\n\
         The research indicates clear benefits for {topic}, balanced against the adoption \
         costs raised by critics.\n\n\
         ## Conclusion\n\n\
         Taken together, the evidence suggests {topic} merits continued study and careful, \
         incremental adoption.\n",
        topic = topic,
        perspectives = perspectives,
        sections = sections,
    )
}

fn title_case(id: &str) -> String {
    id.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
