use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Exam,
    Practice,
    Quiz,
    Aptitude,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Exam => "exam",
            Domain::Practice => "practice",
            Domain::Quiz => "quiz",
            Domain::Aptitude => "aptitude",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "exam" => Ok(Domain::Exam),
            "practice" => Ok(Domain::Practice),
            "quiz" => Ok(Domain::Quiz),
            "aptitude" => Ok(Domain::Aptitude),
            other => anyhow::bail!("unknown attempt domain `{other}`"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub was_correct: bool,
    #[serde(default)]
    pub topic: String,
}

/// One completed activity instance as read from an attempt store.
///
/// `score`, `total` and `questions` are optional because stored records may be
/// incomplete; such records are skipped by every aggregation.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub id: Uuid,
    pub domain: Domain,
    pub topic: String,
    pub submitted_at: DateTime<Utc>,
    pub questions: Option<Vec<QuestionResult>>,
    pub score: Option<f64>,
    pub total: Option<f64>,
}

impl AttemptRecord {
    pub fn is_complete(&self) -> bool {
        self.questions.is_some() && self.score.is_some() && self.total.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttemptBundle {
    pub exams: Vec<AttemptRecord>,
    pub practices: Vec<AttemptRecord>,
    pub quizzes: Vec<AttemptRecord>,
    pub aptitudes: Vec<AttemptRecord>,
}

impl AttemptBundle {
    pub fn total_attempts(&self) -> usize {
        self.exams.len() + self.practices.len() + self.quizzes.len() + self.aptitudes.len()
    }
}

/// Authenticated caller identity. Analysis is only run for a resolved principal.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub t: u32,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeakTopicEntry {
    pub domain: Domain,
    pub topic: String,
    pub accuracy: u32,
    pub sample_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    InProgress,
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningStep {
    pub title: String,
    pub description: String,
    pub status: StepStatus,
    pub estimated_days: u32,
    pub difficulty: Difficulty,
    pub content_id: String,
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationPath {
    pub steps: Vec<LearningStep>,
    pub total_steps: usize,
    pub estimated_duration: u32,
    pub created_at: DateTime<Utc>,
    pub target_completion_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSummary {
    pub slope: f64,
    pub intercept: f64,
    pub points: Vec<TimelinePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarPoint {
    pub subject: String,
    pub score: f64,
    pub full_mark: f64,
}

/// Payload served to the performance dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceDashboard {
    pub trend: TrendSummary,
    pub predicted_score: f64,
    pub pass_probability: f64,
    pub weak_topics: Vec<WeakTopicEntry>,
    pub category_scores: BTreeMap<String, f64>,
    pub radar_data: Vec<RadarPoint>,
}
