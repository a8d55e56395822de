use tracing::warn;

use crate::models::TimelinePoint;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendModel {
    pub slope: f64,
    pub intercept: f64,
}

impl TrendModel {
    /// Least-squares line over the timeline. No points gives a flat zero line,
    /// a single point a flat line at that score.
    pub fn fit(points: &[TimelinePoint]) -> Self {
        match points {
            [] => Self {
                slope: 0.0,
                intercept: 0.0,
            },
            [only] => Self {
                slope: 0.0,
                intercept: only.score,
            },
            _ => {
                let n = points.len() as f64;
                let (mut sum_t, mut sum_score, mut sum_t_score, mut sum_t_sq) = (0.0, 0.0, 0.0, 0.0);
                for point in points {
                    let t = point.t as f64;
                    sum_t += t;
                    sum_score += point.score;
                    sum_t_score += t * point.score;
                    sum_t_sq += t * t;
                }

                let denominator = n * sum_t_sq - sum_t * sum_t;
                let slope = if denominator == 0.0 {
                    0.0
                } else {
                    (n * sum_t_score - sum_t * sum_score) / denominator
                };
                let intercept = (sum_score - slope * sum_t) / n;

                Self { slope, intercept }
            }
        }
    }

    pub fn predict(&self, t: f64) -> f64 {
        self.slope * t + self.intercept
    }
}

/// How strongly the trend direction shifts the pass probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbabilityCalibration {
    /// Probability points added per unit of slope.
    pub slope_weight: f64,
    /// Largest shift the slope may cause in either direction.
    pub max_adjustment: f64,
}

impl Default for ProbabilityCalibration {
    fn default() -> Self {
        Self {
            slope_weight: 5.0,
            max_adjustment: 20.0,
        }
    }
}

impl ProbabilityCalibration {
    pub fn new(slope_weight: f64, max_adjustment: f64) -> Self {
        let defaults = Self::default();
        let valid = |value: f64| value.is_finite() && value >= 0.0;

        let slope_weight = if valid(slope_weight) {
            slope_weight
        } else {
            warn!(slope_weight, "invalid slope weight, using default");
            defaults.slope_weight
        };
        let max_adjustment = if valid(max_adjustment) {
            max_adjustment
        } else {
            warn!(max_adjustment, "invalid max adjustment, using default");
            defaults.max_adjustment
        };

        Self {
            slope_weight,
            max_adjustment,
        }
    }
}

/// Probability in `[0, 100]` of passing, starting from the current score and
/// shifted by a bounded amount in the direction of the trend.
pub fn pass_probability(current_score: f64, slope: f64, calibration: &ProbabilityCalibration) -> f64 {
    let base = if current_score.is_nan() {
        0.0
    } else {
        current_score.clamp(0.0, 100.0)
    };
    let cap = calibration.max_adjustment.abs().max(0.0);
    let shift = slope * calibration.slope_weight;
    let adjustment = if shift.is_nan() {
        0.0
    } else {
        shift.clamp(-cap, cap)
    };

    (base + adjustment).clamp(0.0, 100.0)
}
