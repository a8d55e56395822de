use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::models::{
    Difficulty, LearningStep, RecommendationPath, StepStatus, WeakTopicEntry,
};

pub const MAX_STEPS: usize = 6;
const MIN_STEP_DAYS: u32 = 2;
const ACCURACY_POINTS_PER_DAY: u32 = 15;
const STEP_RESOURCES: [&str; 3] = [
    "Practice Problems",
    "Explanations Review",
    "Recommended Videos",
];

/// Turns ranked weak topics (weakest first) into a sequential plan. Only the
/// first step is open; the rest are locked until earlier steps complete.
pub fn build_plan(weak_topics: &[WeakTopicEntry], now: DateTime<Utc>) -> RecommendationPath {
    let steps: Vec<LearningStep> = weak_topics
        .iter()
        .take(MAX_STEPS)
        .enumerate()
        .map(|(index, entry)| build_step(index, entry))
        .collect();

    let estimated_duration: u32 = steps.iter().map(|step| step.estimated_days).sum();
    debug!(steps = steps.len(), estimated_duration, "recommendation plan built");

    RecommendationPath {
        total_steps: steps.len(),
        steps,
        estimated_duration,
        created_at: now,
        target_completion_date: now + Duration::days(i64::from(estimated_duration)),
    }
}

fn build_step(index: usize, entry: &WeakTopicEntry) -> LearningStep {
    let domain = entry.domain.as_str();
    LearningStep {
        title: format!("{} · {}", domain.to_uppercase(), entry.topic),
        description: format!(
            "Strengthen {} in your {} work: you are currently answering {}% of questions correctly.",
            entry.topic, domain, entry.accuracy
        ),
        status: if index == 0 {
            StepStatus::InProgress
        } else {
            StepStatus::Locked
        },
        estimated_days: estimated_days(entry.accuracy),
        difficulty: difficulty_for(entry.accuracy),
        content_id: slugify(&format!("{domain}-{}", entry.topic)),
        resources: STEP_RESOURCES.iter().map(|r| r.to_string()).collect(),
    }
}

/// Days needed to close the gap to full accuracy, never fewer than two.
pub fn estimated_days(accuracy: u32) -> u32 {
    let gap = 100 - accuracy.min(99);
    gap.div_ceil(ACCURACY_POINTS_PER_DAY).max(MIN_STEP_DAYS)
}

pub fn difficulty_for(accuracy: u32) -> Difficulty {
    match accuracy {
        0..=49 => Difficulty::Beginner,
        50..=74 => Difficulty::Intermediate,
        _ => Difficulty::Advanced,
    }
}

fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
