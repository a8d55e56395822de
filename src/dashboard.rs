use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::LoadError;
use crate::loader::AttemptLoader;
use crate::models::{
    AttemptBundle, Domain, PerformanceDashboard, Principal, RadarPoint, RecommendationPath,
    TimelinePoint, TrendSummary, WeakTopicEntry,
};
use crate::planner;
use crate::timeline;
use crate::trend::{self, ProbabilityCalibration, TrendModel};
use crate::weak_topics;

const RADAR_FULL_MARK: f64 = 100.0;

pub fn assemble(
    points: Vec<TimelinePoint>,
    model: &TrendModel,
    weak_topics: Vec<WeakTopicEntry>,
    calibration: &ProbabilityCalibration,
) -> PerformanceDashboard {
    let next_t = points.len() as f64 + 1.0;
    let current_score = points.last().map(|point| point.score).unwrap_or(0.0);
    let domain_scores = domain_averages(&weak_topics);

    let category_scores = domain_scores
        .iter()
        .map(|(domain, score)| (domain.to_string(), *score))
        .collect();
    let radar_data = domain_scores
        .iter()
        .map(|(domain, score)| RadarPoint {
            subject: domain.to_string(),
            score: *score,
            full_mark: RADAR_FULL_MARK,
        })
        .collect();

    PerformanceDashboard {
        trend: TrendSummary {
            slope: model.slope,
            intercept: model.intercept,
            points,
        },
        predicted_score: model.predict(next_t),
        pass_probability: trend::pass_probability(current_score, model.slope, calibration),
        weak_topics,
        category_scores,
        radar_data,
    }
}

/// Mean topic accuracy per domain, rounded to one decimal place.
fn domain_averages(weak_topics: &[WeakTopicEntry]) -> BTreeMap<Domain, f64> {
    let mut sums: BTreeMap<Domain, (u32, u32)> = BTreeMap::new();
    for entry in weak_topics {
        let sum = sums.entry(entry.domain).or_insert((0, 0));
        sum.0 += entry.accuracy;
        sum.1 += 1;
    }

    sums.into_iter()
        .map(|(domain, (accuracy_sum, count))| {
            let average = f64::from(accuracy_sum) / f64::from(count);
            (domain, (average * 10.0).round() / 10.0)
        })
        .collect()
}

pub fn performance_dashboard(
    bundle: &AttemptBundle,
    calibration: &ProbabilityCalibration,
) -> PerformanceDashboard {
    let points = timeline::build_timeline(&bundle.exams);
    let model = TrendModel::fit(&points);
    let weak_topics = weak_topics::rank_weak_topics(bundle);
    debug!(
        timeline_len = points.len(),
        slope = model.slope,
        weak_topics = weak_topics.len(),
        "performance analysed"
    );
    assemble(points, &model, weak_topics, calibration)
}

pub fn recommendation_path(bundle: &AttemptBundle, now: DateTime<Utc>) -> RecommendationPath {
    let weak_topics = weak_topics::rank_weak_topics(bundle);
    planner::build_plan(&weak_topics, now)
}

pub async fn load_dashboard(
    loader: &AttemptLoader,
    principal: &Principal,
    calibration: &ProbabilityCalibration,
) -> Result<PerformanceDashboard, LoadError> {
    let bundle = loader.load(principal.user_id).await?;
    info!(
        user_id = %principal.user_id,
        attempts = bundle.total_attempts(),
        "building performance dashboard"
    );
    Ok(performance_dashboard(&bundle, calibration))
}

pub async fn load_recommendation_path(
    loader: &AttemptLoader,
    principal: &Principal,
    now: DateTime<Utc>,
) -> Result<RecommendationPath, LoadError> {
    let bundle = loader.load(principal.user_id).await?;
    info!(
        user_id = %principal.user_id,
        attempts = bundle.total_attempts(),
        "building recommendation path"
    );
    Ok(recommendation_path(&bundle, now))
}
