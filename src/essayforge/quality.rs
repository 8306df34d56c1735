//! Run-level quality metrics.

use crate::orchestration::Candidate;
use crate::synthesis::FinalDocument;
use serde::Serialize;
use std::collections::HashSet;

const COHERENCE_WEIGHT: f64 = 0.25;
const CITATION_WEIGHT: f64 = 0.35;
const DEPTH_WEIGHT: f64 = 0.25;
const ORIGINALITY_WEIGHT: f64 = 0.15;

/// Aggregate scores for a finished run, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityMetrics {
    pub coherence: f64,
    pub citation_quality: f64,
    pub depth_score: f64,
    pub originality: f64,
    pub overall_score: f64,
}

/// Score a document against the candidates it was built from.
///
/// - `coherence`: 0.8 when the body has `## ` sections and paragraph breaks, else 0.6.
/// - `citation_quality`: distinct citations over twice the candidate count, capped at 1.
/// - `depth_score`: mean candidate `quality_score`.
/// - `originality`: distinct roles among `candidates` over `total_role_count`.
///
/// Every ratio is 0 when its denominator is 0.
pub fn aggregate(
    document: &FinalDocument,
    candidates: &[Candidate],
    total_role_count: usize,
) -> QualityMetrics {
    let coherence = if document.body.contains("## ") && document.body.contains("\n\n") {
        0.8
    } else {
        0.6
    };

    let citation_quality = if candidates.is_empty() {
        0.0
    } else {
        let distinct = document.citations.len() as f64;
        (distinct / (candidates.len() as f64 * 2.0)).min(1.0)
    };

    let depth_score = if candidates.is_empty() {
        0.0
    } else {
        candidates.iter().map(|c| c.quality_score).sum::<f64>() / candidates.len() as f64
    };

    let originality = if total_role_count == 0 {
        0.0
    } else {
        let roles: HashSet<&str> = candidates.iter().map(|c| c.role_id.as_str()).collect();
        (roles.len() as f64 / total_role_count as f64).min(1.0)
    };

    let overall_score = COHERENCE_WEIGHT * coherence
        + CITATION_WEIGHT * citation_quality
        + DEPTH_WEIGHT * depth_score
        + ORIGINALITY_WEIGHT * originality;

    QualityMetrics {
        coherence,
        citation_quality,
        depth_score,
        originality,
        overall_score,
    }
}
