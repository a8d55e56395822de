use std::fmt::Write;

use crate::models::{PerformanceDashboard, Principal, RecommendationPath};

const REPORT_TOPIC_LIMIT: usize = 10;

pub fn build_report(
    principal: &Principal,
    dashboard: &PerformanceDashboard,
    plan: &RecommendationPath,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Learner Performance Report");
    let _ = writeln!(
        output,
        "Generated for {} ({}) on {}",
        principal.name,
        principal.email,
        plan.created_at.date_naive()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Exam Trend");

    if dashboard.trend.points.is_empty() {
        let _ = writeln!(output, "No exam attempts recorded yet.");
    } else {
        let direction = if dashboard.trend.slope > 0.0 {
            "improving"
        } else if dashboard.trend.slope < 0.0 {
            "declining"
        } else {
            "flat"
        };
        let _ = writeln!(
            output,
            "- {} exams, trend {} ({:+.2} points per exam, intercept {:.2})",
            dashboard.trend.points.len(),
            direction,
            dashboard.trend.slope,
            dashboard.trend.intercept
        );
        let _ = writeln!(
            output,
            "- Predicted next score {:.1}, pass probability {:.0}%",
            dashboard.predicted_score, dashboard.pass_probability
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weakest Topics");

    if dashboard.weak_topics.is_empty() {
        let _ = writeln!(output, "No practice, quiz or aptitude answers recorded yet.");
    } else {
        for entry in dashboard.weak_topics.iter().take(REPORT_TOPIC_LIMIT) {
            let _ = writeln!(
                output,
                "- {} / {}: {}% across {} questions",
                entry.domain, entry.topic, entry.accuracy, entry.sample_count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Scores");

    if dashboard.category_scores.is_empty() {
        let _ = writeln!(output, "No category scores yet.");
    } else {
        for (domain, score) in dashboard.category_scores.iter() {
            let _ = writeln!(output, "- {}: {:.1}%", domain, score);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommended Path");

    if plan.steps.is_empty() {
        let _ = writeln!(output, "Nothing to remediate yet.");
    } else {
        let _ = writeln!(
            output,
            "{} steps over {} days, target completion {}",
            plan.total_steps,
            plan.estimated_duration,
            plan.target_completion_date.date_naive()
        );
        for (index, step) in plan.steps.iter().enumerate() {
            let _ = writeln!(
                output,
                "{}. {} ({}, {} days)",
                index + 1,
                step.title,
                step.difficulty,
                step.estimated_days
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use crate::dashboard;
    use crate::models::{AttemptBundle, AttemptRecord, Domain, QuestionResult};
    use crate::trend::ProbabilityCalibration;

    fn principal() -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            name: "Kiara Patel".to_string(),
            email: "kiara.patel@groupscholar.com".to_string(),
        }
    }

    fn practice(topic: &str, correct: usize, total: usize) -> AttemptRecord {
        AttemptRecord {
            id: Uuid::new_v4(),
            domain: Domain::Practice,
            topic: topic.to_string(),
            submitted_at: Utc.with_ymd_and_hms(2026, 1, 20, 10, 0, 0).unwrap(),
            questions: Some(
                (0..total)
                    .map(|i| QuestionResult {
                        was_correct: i < correct,
                        topic: topic.to_string(),
                    })
                    .collect(),
            ),
            score: Some(correct as f64),
            total: Some(total as f64),
        }
    }

    #[test]
    fn empty_history_reports_no_data_sections() {
        let bundle = AttemptBundle::default();
        let now = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let report = build_report(
            &principal(),
            &dashboard::performance_dashboard(&bundle, &ProbabilityCalibration::default()),
            &dashboard::recommendation_path(&bundle, now),
        );

        assert!(report.starts_with("# Learner Performance Report"));
        assert!(report.contains("Generated for Kiara Patel"));
        assert!(report.contains("No exam attempts recorded yet."));
        assert!(report.contains("Nothing to remediate yet."));
    }

    #[test]
    fn lists_weak_topics_and_plan_steps() {
        let bundle = AttemptBundle {
            practices: vec![practice("algebra", 1, 10), practice("geometry", 7, 10)],
            ..Default::default()
        };
        let now = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let report = build_report(
            &principal(),
            &dashboard::performance_dashboard(&bundle, &ProbabilityCalibration::default()),
            &dashboard::recommendation_path(&bundle, now),
        );

        assert!(report.contains("- practice / algebra: 10% across 10 questions"));
        assert!(report.contains("- practice: 40.0%"));
        assert!(report.contains("2 steps over 8 days, target completion 2026-02-09"));
        assert!(report.contains("1. PRACTICE · algebra (beginner, 6 days)"));
        assert!(report.contains("2. PRACTICE · geometry (intermediate, 2 days)"));
    }
}
