use std::collections::BTreeMap;

use tracing::debug;

use crate::models::{AttemptBundle, AttemptRecord, Domain, WeakTopicEntry};

const UNTAGGED_TOPIC: &str = "general";

/// Ranks `(domain, topic)` pairs by question-level accuracy across practice,
/// quiz and aptitude attempts, weakest first.
///
/// Ties on accuracy rank the pair with more answered questions first, then fall
/// back to domain and topic order.
pub fn rank_weak_topics(bundle: &AttemptBundle) -> Vec<WeakTopicEntry> {
    let sources = [
        (Domain::Practice, &bundle.practices),
        (Domain::Quiz, &bundle.quizzes),
        (Domain::Aptitude, &bundle.aptitudes),
    ];

    let mut tallies: BTreeMap<(Domain, String), (usize, usize)> = BTreeMap::new();
    for (domain, attempts) in sources {
        for attempt in attempts.iter() {
            tally_attempt(&mut tallies, domain, attempt);
        }
    }

    let mut entries: Vec<WeakTopicEntry> = tallies
        .into_iter()
        .filter(|(_, (_, total))| *total > 0)
        .map(|((domain, topic), (correct, total))| WeakTopicEntry {
            domain,
            topic,
            accuracy: accuracy_percent(correct, total),
            sample_count: total,
        })
        .collect();

    entries.sort_by(|a, b| {
        a.accuracy
            .cmp(&b.accuracy)
            .then_with(|| b.sample_count.cmp(&a.sample_count))
            .then_with(|| a.domain.cmp(&b.domain))
            .then_with(|| a.topic.cmp(&b.topic))
    });

    debug!(count = entries.len(), "weak topics ranked");
    entries
}

fn tally_attempt(
    tallies: &mut BTreeMap<(Domain, String), (usize, usize)>,
    domain: Domain,
    attempt: &AttemptRecord,
) {
    let questions = match (&attempt.questions, attempt.score, attempt.total) {
        (Some(questions), Some(_), Some(_)) => questions,
        _ => {
            debug!(attempt_id = %attempt.id, %domain, "skipping malformed attempt");
            return;
        }
    };

    for question in questions {
        let topic = question_topic(&question.topic, &attempt.topic);
        let entry = tallies.entry((domain, topic)).or_insert((0, 0));
        if question.was_correct {
            entry.0 += 1;
        }
        entry.1 += 1;
    }
}

fn question_topic(question_topic: &str, attempt_topic: &str) -> String {
    [question_topic.trim(), attempt_topic.trim()]
        .into_iter()
        .find(|topic| !topic.is_empty())
        .unwrap_or(UNTAGGED_TOPIC)
        .to_string()
}

/// Integer percentage rounded half up, so 1 of 2 is 50 and 1 of 8 is 13.
pub fn accuracy_percent(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((200 * correct + total) / (2 * total)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::models::QuestionResult;

    fn attempt(domain: Domain, topic: &str, results: &[bool]) -> AttemptRecord {
        let questions: Vec<QuestionResult> = results
            .iter()
            .map(|&was_correct| QuestionResult {
                was_correct,
                topic: topic.to_string(),
            })
            .collect();
        let correct = results.iter().filter(|&&r| r).count();
        AttemptRecord {
            id: Uuid::new_v4(),
            domain,
            topic: topic.to_string(),
            submitted_at: Utc::now(),
            questions: Some(questions),
            score: Some(correct as f64),
            total: Some(results.len() as f64),
        }
    }

    fn results(correct: usize, total: usize) -> Vec<bool> {
        (0..total).map(|i| i < correct).collect()
    }

    fn order(entries: &[WeakTopicEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.topic.as_str()).collect()
    }

    #[test]
    fn accuracy_rounds_half_up() {
        assert_eq!(accuracy_percent(2, 5), 40);
        assert_eq!(accuracy_percent(3, 4), 75);
        assert_eq!(accuracy_percent(1, 2), 50);
        assert_eq!(accuracy_percent(1, 3), 33);
        assert_eq!(accuracy_percent(2, 3), 67);
        assert_eq!(accuracy_percent(1, 8), 13);
        assert_eq!(accuracy_percent(0, 4), 0);
        assert_eq!(accuracy_percent(4, 4), 100);
    }

    #[test]
    fn ranks_weakest_first() {
        let bundle = AttemptBundle {
            practices: vec![
                attempt(Domain::Practice, "A", &results(6, 10)),
                attempt(Domain::Practice, "B", &results(4, 10)),
                attempt(Domain::Practice, "C", &results(8, 10)),
            ],
            ..Default::default()
        };

        let ranked = rank_weak_topics(&bundle);
        assert_eq!(order(&ranked), vec!["B", "A", "C"]);
        assert_eq!(ranked[0].accuracy, 40);
        assert_eq!(ranked[0].sample_count, 10);
    }

    #[test]
    fn equal_accuracy_prefers_more_evidence() {
        let bundle = AttemptBundle {
            quizzes: vec![
                attempt(Domain::Quiz, "B", &results(1, 2)),
                attempt(Domain::Quiz, "A", &results(5, 10)),
            ],
            ..Default::default()
        };

        let ranked = rank_weak_topics(&bundle);
        assert_eq!(order(&ranked), vec!["A", "B"]);
        assert_eq!(ranked[0].accuracy, 50);
        assert_eq!(ranked[1].accuracy, 50);
    }

    #[test]
    fn aggregates_questions_across_attempts_per_domain() {
        let bundle = AttemptBundle {
            practices: vec![
                attempt(Domain::Practice, "geometry", &results(1, 2)),
                attempt(Domain::Practice, "geometry", &results(1, 2)),
            ],
            aptitudes: vec![attempt(Domain::Aptitude, "geometry", &results(3, 3))],
            ..Default::default()
        };

        let ranked = rank_weak_topics(&bundle);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].domain, Domain::Practice);
        assert_eq!(ranked[0].accuracy, 50);
        assert_eq!(ranked[0].sample_count, 4);
        assert_eq!(ranked[1].domain, Domain::Aptitude);
        assert_eq!(ranked[1].accuracy, 100);
    }

    #[test]
    fn questions_are_grouped_by_their_own_topic() {
        let mut mixed = attempt(Domain::Quiz, "mixed", &[]);
        mixed.questions = Some(vec![
            QuestionResult {
                was_correct: false,
                topic: "fractions".to_string(),
            },
            QuestionResult {
                was_correct: true,
                topic: "decimals".to_string(),
            },
            QuestionResult {
                was_correct: false,
                topic: "  ".to_string(),
            },
        ]);
        let bundle = AttemptBundle {
            quizzes: vec![mixed],
            ..Default::default()
        };

        let ranked = rank_weak_topics(&bundle);
        assert_eq!(order(&ranked), vec!["fractions", "mixed", "decimals"]);
    }

    #[test]
    fn exams_and_malformed_attempts_are_ignored() {
        let mut no_questions = attempt(Domain::Practice, "logic", &results(0, 3));
        no_questions.questions = None;
        let mut no_total = attempt(Domain::Quiz, "logic", &results(0, 3));
        no_total.total = None;
        let bundle = AttemptBundle {
            exams: vec![attempt(Domain::Exam, "logic", &results(0, 5))],
            practices: vec![no_questions, attempt(Domain::Practice, "sets", &results(2, 4))],
            quizzes: vec![no_total],
            ..Default::default()
        };

        let ranked = rank_weak_topics(&bundle);
        assert_eq!(order(&ranked), vec!["sets"]);
    }

    #[test]
    fn empty_history_has_no_weak_topics() {
        let empty_attempt = attempt(Domain::Practice, "unused", &[]);
        let bundle = AttemptBundle {
            practices: vec![empty_attempt],
            ..Default::default()
        };
        assert!(rank_weak_topics(&bundle).is_empty());
        assert!(rank_weak_topics(&AttemptBundle::default()).is_empty());
    }
}
