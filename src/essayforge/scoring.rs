//! Heuristic candidate scoring.
//!
//! Both functions are pure functions of the text. [`score`] is an unbounded ranking
//! value used only to compare variations of the same role; [`quality_score`] is the
//! normalised `[0, 1]` member of the same family that feeds the depth metric.

use crate::citation;
use lazy_static::lazy_static;
use regex::Regex;

/// Vocabulary that signals research-grounded prose.
pub const QUALITY_INDICATORS: [&str; 9] = [
    "research",
    "study",
    "analysis",
    "data",
    "evidence",
    "expert",
    "according to",
    "found that",
    "indicates",
];

const IDEAL_MIN_CHARS: usize = 1000;
const IDEAL_MAX_CHARS: usize = 5000;
const LENGTH_WEIGHT: f64 = 10.0;
const LENGTH_FLOOR: f64 = 5.0;
const CITATION_WEIGHT: f64 = 2.0;
const CITATION_CAP: usize = 10;
const STRUCTURE_WEIGHT: f64 = 3.0;
const PARAGRAPH_WEIGHT: f64 = 2.0;
const VOCABULARY_WEIGHT: f64 = 5.0;

lazy_static! {
    static ref HEADING_LINE: Regex =
        Regex::new(r"(?m)^#{1,6}\s").expect("heading pattern is valid");
}

/// Ranking score for one candidate text.
///
/// ```
/// use essayforge::scoring::score;
///
/// let text = "## Findings\n\nThe study found that [A](http://a) holds.";
/// assert_eq!(score(text), score(text));
/// assert!(score(text) > score("short"));
/// ```
pub fn score(text: &str) -> f64 {
    let citations = citation::extract(text).len().min(CITATION_CAP);

    let mut total = length_component(text.chars().count());
    total += CITATION_WEIGHT * citations as f64;
    if has_structure(text) {
        total += STRUCTURE_WEIGHT;
    }
    if has_paragraph_breaks(text) {
        total += PARAGRAPH_WEIGHT;
    }
    total += VOCABULARY_WEIGHT * indicator_fraction(text);
    total
}

/// Normalised quality estimate in `[0, 1]`.
pub fn quality_score(text: &str) -> f64 {
    let words = text.split_whitespace().count();
    let citations = citation::extract(text).len();

    let mut total = if words > 500 {
        0.25
    } else {
        words as f64 / 2000.0
    };
    total += if citations > 5 {
        0.25
    } else {
        citations as f64 / 20.0
    };
    if text.contains("##") || text.contains("**") {
        total += 0.15;
    }
    if has_paragraph_breaks(text) {
        total += 0.10;
    }
    total += indicator_fraction(text) * 0.25;

    total.clamp(0.0, 1.0)
}

fn length_component(chars: usize) -> f64 {
    if chars > IDEAL_MIN_CHARS && chars < IDEAL_MAX_CHARS {
        LENGTH_WEIGHT
    } else if chars <= IDEAL_MIN_CHARS {
        LENGTH_WEIGHT * chars as f64 / IDEAL_MIN_CHARS as f64
    } else {
        let overshoot = (chars - IDEAL_MAX_CHARS) as f64 / 1000.0;
        (LENGTH_WEIGHT - overshoot).max(LENGTH_FLOOR)
    }
}

fn has_structure(text: &str) -> bool {
    HEADING_LINE.is_match(text) || text.contains("**")
}

fn has_paragraph_breaks(text: &str) -> bool {
    text.contains("\n\n")
}

/// Fraction of [`QUALITY_INDICATORS`] present in `text`, case-insensitive.
fn indicator_fraction(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let matched = QUALITY_INDICATORS
        .iter()
        .filter(|indicator| lower.contains(*indicator))
        .count();
    matched as f64 / QUALITY_INDICATORS.len() as f64
}
