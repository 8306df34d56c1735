//! Best-of-N reduction: one surviving candidate per role.

use crate::orchestration::Candidate;
use std::cmp::Ordering;

/// Keep the highest scoring candidate for each role.
///
/// Groups appear in the order their role was first seen. Within a group the highest
/// `score` wins; ties go to the lowest `variation_index`, then the smallest `task_id`.
/// A `NaN` score ranks below every real score.
pub fn reduce(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut best: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        match best.iter().position(|kept| kept.role_id == candidate.role_id) {
            Some(i) => {
                if ranks_before(&candidate, &best[i]) {
                    best[i] = candidate;
                }
            }
            None => best.push(candidate),
        }
    }

    for winner in &best {
        log::debug!(
            "essayforge::selection::reduce(...): {} -> {} (score {:.2})",
            winner.role_id,
            winner.task_id,
            winner.score
        );
    }
    best
}

/// `true` when `a` should be preferred over `b`.
fn ranks_before(a: &Candidate, b: &Candidate) -> bool {
    compare(a, b) == Ordering::Less
}

fn compare(a: &Candidate, b: &Candidate) -> Ordering {
    compare_scores(a.score, b.score)
        .then_with(|| a.variation_index.cmp(&b.variation_index))
        .then_with(|| a.task_id.cmp(&b.task_id))
}

/// Descending by score with NaN last.
fn compare_scores(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
