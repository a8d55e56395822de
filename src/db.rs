use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::loader::{AttemptLoader, AttemptStore};
use crate::models::{AttemptRecord, Domain, Principal, QuestionResult};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Reads one domain's attempts from `learner_insights.attempts`.
pub struct PgAttemptStore {
    pool: PgPool,
    domain: Domain,
}

impl PgAttemptStore {
    pub fn new(pool: PgPool, domain: Domain) -> Self {
        Self { pool, domain }
    }
}

#[async_trait]
impl AttemptStore for PgAttemptStore {
    async fn find_attempts_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<AttemptRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, topic, submitted_at, score, total, questions
            FROM learner_insights.attempts
            WHERE student_id = $1 AND domain = $2
            ORDER BY submitted_at, recorded_at
            "#,
        )
        .bind(user_id)
        .bind(self.domain.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut attempts = Vec::with_capacity(rows.len());
        for row in rows {
            let id: Uuid = row.try_get("id")?;
            let questions = match row.try_get::<Option<serde_json::Value>, _>("questions")? {
                Some(value) => Some(
                    serde_json::from_value::<Vec<QuestionResult>>(value)
                        .with_context(|| format!("attempt {id} has unreadable questions"))?,
                ),
                None => None,
            };

            attempts.push(AttemptRecord {
                id,
                domain: self.domain,
                topic: row.try_get("topic")?,
                submitted_at: row.try_get("submitted_at")?,
                questions,
                score: row.try_get("score")?,
                total: row.try_get("total")?,
            });
        }

        Ok(attempts)
    }
}

pub fn attempt_loader(pool: &PgPool) -> AttemptLoader {
    let store = |domain: Domain| -> Arc<dyn AttemptStore> {
        Arc::new(PgAttemptStore::new(pool.clone(), domain))
    };
    AttemptLoader::new(
        store(Domain::Exam),
        store(Domain::Practice),
        store(Domain::Quiz),
        store(Domain::Aptitude),
    )
}

pub async fn find_principal(pool: &PgPool, email: &str) -> anyhow::Result<Option<Principal>> {
    let row = sqlx::query(
        "SELECT id, full_name, email FROM learner_insights.students WHERE email = $1",
    )
    .bind(email.trim())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    Ok(Some(Principal {
        user_id: row.try_get("id")?,
        name: row.try_get("full_name")?,
        email: row.try_get("email")?,
    }))
}

struct NewAttempt<'a> {
    source_key: &'a str,
    domain: Domain,
    topic: &'a str,
    submitted_at: DateTime<Utc>,
    score: Option<f64>,
    total: Option<f64>,
    questions: Option<Vec<QuestionResult>>,
}

async fn upsert_student(pool: &PgPool, id: Uuid, name: &str, email: &str) -> anyhow::Result<Uuid> {
    let student_id: Uuid = sqlx::query(
        r#"
        INSERT INTO learner_insights.students (id, full_name, email)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE
        SET full_name = EXCLUDED.full_name
        RETURNING id
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .fetch_one(pool)
    .await?
    .try_get("id")?;

    Ok(student_id)
}

async fn insert_attempt(
    pool: &PgPool,
    student_id: Uuid,
    attempt: NewAttempt<'_>,
) -> anyhow::Result<bool> {
    let questions = attempt
        .questions
        .map(serde_json::to_value)
        .transpose()?;

    let result = sqlx::query(
        r#"
        INSERT INTO learner_insights.attempts
        (id, student_id, domain, topic, submitted_at, score, total, questions, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(attempt.domain.as_str())
    .bind(attempt.topic)
    .bind(attempt.submitted_at)
    .bind(attempt.score)
    .bind(attempt.total)
    .bind(questions)
    .bind(attempt.source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

fn seed_questions(topic: &str, correct: usize, total: usize) -> Option<Vec<QuestionResult>> {
    Some(
        (0..total)
            .map(|i| QuestionResult {
                was_correct: i < correct,
                topic: topic.to_string(),
            })
            .collect(),
    )
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let avery = upsert_student(
        pool,
        Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
        "Avery Lee",
        "avery.lee@groupscholar.com",
    )
    .await?;
    upsert_student(
        pool,
        Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
        "Jules Moreno",
        "jules.moreno@groupscholar.com",
    )
    .await?;

    let at = |day: u32, hour: u32| {
        Utc.with_ymd_and_hms(2026, 2, day, hour, 0, 0)
            .single()
            .context("invalid seed timestamp")
    };

    // (source_key, domain, topic, submitted_at, correct, total)
    let attempts = vec![
        ("seed-exam-001", Domain::Exam, "midterm", at(2, 9)?, 12, 20),
        ("seed-exam-002", Domain::Exam, "midterm", at(9, 9)?, 14, 20),
        ("seed-exam-003", Domain::Exam, "final", at(16, 9)?, 15, 20),
        ("seed-practice-001", Domain::Practice, "algebra", at(3, 18)?, 2, 5),
        ("seed-practice-002", Domain::Practice, "algebra", at(10, 18)?, 3, 5),
        ("seed-practice-003", Domain::Practice, "geometry", at(11, 18)?, 6, 8),
        ("seed-quiz-001", Domain::Quiz, "probability", at(5, 12)?, 1, 4),
        ("seed-quiz-002", Domain::Quiz, "statistics", at(12, 12)?, 4, 5),
        ("seed-aptitude-001", Domain::Aptitude, "number series", at(6, 15)?, 7, 10),
        ("seed-aptitude-002", Domain::Aptitude, "verbal reasoning", at(13, 15)?, 3, 6),
    ];

    for (source_key, domain, topic, submitted_at, correct, total) in attempts {
        insert_attempt(
            pool,
            avery,
            NewAttempt {
                source_key,
                domain,
                topic,
                submitted_at,
                score: Some(correct as f64),
                total: Some(total as f64),
                questions: seed_questions(topic, correct, total),
            },
        )
        .await?;
    }

    // An interrupted quiz with no graded questions.
    insert_attempt(
        pool,
        avery,
        NewAttempt {
            source_key: "seed-quiz-003",
            domain: Domain::Quiz,
            topic: "probability",
            submitted_at: at(14, 12)?,
            score: None,
            total: None,
            questions: None,
        },
    )
    .await?;

    info!("seeded learner insights data");
    Ok(())
}

/// Parses `topic=1;topic=0` into per-question results. `1`, `true`, `y` and
/// `yes` count as correct.
pub fn parse_question_list(value: &str) -> anyhow::Result<Vec<QuestionResult>> {
    value
        .split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (topic, outcome) = item
                .rsplit_once('=')
                .with_context(|| format!("question `{item}` is not in topic=1|0 form"))?;
            let was_correct = match outcome.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "y" | "yes" => true,
                "0" | "false" | "n" | "no" => false,
                other => anyhow::bail!("question `{item}` has unknown outcome `{other}`"),
            };
            Ok(QuestionResult {
                was_correct,
                topic: topic.trim().to_string(),
            })
        })
        .collect()
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        domain: String,
        topic: String,
        submitted_at: DateTime<Utc>,
        score: Option<f64>,
        total: Option<f64>,
        questions: Option<String>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("row {line} could not be read"))?;
        let domain: Domain = row
            .domain
            .parse()
            .with_context(|| format!("row {line} has an invalid domain"))?;
        let questions = row
            .questions
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .map(parse_question_list)
            .transpose()
            .with_context(|| format!("row {line} has invalid questions"))?;

        let student_id = upsert_student(pool, Uuid::new_v4(), &row.full_name, &row.email).await?;
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let was_inserted = insert_attempt(
            pool,
            student_id,
            NewAttempt {
                source_key: &source_key,
                domain,
                topic: &row.topic,
                submitted_at: row.submitted_at,
                score: row.score,
                total: row.total,
                questions,
            },
        )
        .await?;

        if was_inserted {
            inserted += 1;
        }
    }

    info!(inserted, path = %csv_path.display(), "attempt import finished");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_question_outcomes() {
        let questions = parse_question_list("fractions=1; decimals=0;;ratios = yes").unwrap();
        assert_eq!(
            questions,
            vec![
                QuestionResult {
                    was_correct: true,
                    topic: "fractions".to_string(),
                },
                QuestionResult {
                    was_correct: false,
                    topic: "decimals".to_string(),
                },
                QuestionResult {
                    was_correct: true,
                    topic: "ratios".to_string(),
                },
            ]
        );
    }

    #[test]
    fn blank_topic_is_kept_for_fallback() {
        let questions = parse_question_list("=0").unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].topic, "");
        assert!(!questions[0].was_correct);
    }

    #[test]
    fn rejects_malformed_question_items() {
        assert!(parse_question_list("fractions").is_err());
        assert!(parse_question_list("fractions=maybe").is_err());
    }

    #[test]
    fn stored_questions_use_camel_case() {
        let value = serde_json::json!([
            { "wasCorrect": true, "topic": "sets" },
            { "wasCorrect": false }
        ]);
        let questions: Vec<QuestionResult> = serde_json::from_value(value).unwrap();
        assert!(questions[0].was_correct);
        assert_eq!(questions[1].topic, "");
    }
}
