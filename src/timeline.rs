use tracing::debug;

use crate::models::{AttemptRecord, TimelinePoint};

/// Orders exam attempts by submission time and re-indexes them `1..=N`.
///
/// Scores are percentages of the attempt total. Incomplete attempts, or ones
/// with a non-positive total, are left out before indexing so positions stay
/// dense. Equal timestamps keep their input order.
pub fn build_timeline(exams: &[AttemptRecord]) -> Vec<TimelinePoint> {
    let mut scored: Vec<(&AttemptRecord, f64)> = exams
        .iter()
        .filter_map(|attempt| match percentage(attempt) {
            Some(score) => Some((attempt, score)),
            None => {
                debug!(attempt_id = %attempt.id, domain = %attempt.domain, "skipping malformed attempt");
                None
            }
        })
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| a.0.submitted_at.cmp(&b.0.submitted_at));

    scored
        .into_iter()
        .enumerate()
        .map(|(index, (_, score))| TimelinePoint {
            t: index as u32 + 1,
            score,
        })
        .collect()
}

fn percentage(attempt: &AttemptRecord) -> Option<f64> {
    if !attempt.is_complete() {
        return None;
    }
    let score = attempt.score?;
    let total = attempt.total?;
    if total <= 0.0 || !score.is_finite() || !total.is_finite() {
        return None;
    }
    Some(score * 100.0 / total)
}
