use tracing::warn;

use crate::models::{AllocationRecommendation, ComplexityLevel, ParticipantRecord};

/// Complexity scores above this land in the High bucket.
pub const HIGH_COMPLEXITY_SCORE: f64 = 0.5;
/// Participants per coordinator in the High bucket.
pub const HIGH_COMPLEXITY_CASELOAD: usize = 10;
/// Participants per coordinator in the Low bucket.
pub const LOW_COMPLEXITY_CASELOAD: usize = 15;

/// Returns exactly two rows, High then Low.
pub fn recommend_allocation(records: &[ParticipantRecord]) -> Vec<AllocationRecommendation> {
    let scores = complexity_scores(records);
    let high_count = scores
        .iter()
        .filter(|score| **score > HIGH_COMPLEXITY_SCORE)
        .count();
    let low_count = scores.len() - high_count;

    vec![
        recommendation(ComplexityLevel::High, high_count),
        recommendation(ComplexityLevel::Low, low_count),
    ]
}

fn recommendation(level: ComplexityLevel, participant_count: usize) -> AllocationRecommendation {
    let caseload = match level {
        ComplexityLevel::High => HIGH_COMPLEXITY_CASELOAD,
        ComplexityLevel::Low => LOW_COMPLEXITY_CASELOAD,
    };

    AllocationRecommendation {
        complexity_level: level,
        participant_count,
        recommended_coordinators: (participant_count / caseload).max(1),
    }
}

/// Mean of the standardized daily expenditure and standardized service hours,
/// one score per record in input order.
pub fn complexity_scores(records: &[ParticipantRecord]) -> Vec<f64> {
    let expenditure: Vec<f64> = records.iter().map(|r| r.daily_expenditure).collect();
    let hours: Vec<f64> = records.iter().map(|r| r.service_hours).collect();

    standardize(&expenditure, "daily_expenditure")
        .into_iter()
        .zip(standardize(&hours, "service_hours"))
        .map(|(expenditure, hours)| (expenditure + hours) / 2.0)
        .collect()
}

/// Zero mean, unit population variance. A column without spread (including a
/// single value) standardizes to all zeros.
fn standardize(values: &[f64], column: &str) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    if is_constant(values, mean, std_dev) {
        warn!(column, records = values.len(), "column has no variance; standardized to zero");
        return vec![0.0; values.len()];
    }

    values.iter().map(|v| (v - mean) / std_dev).collect()
}

/// Identical values, or a deviation within the rounding error of summing
/// `values.len()` terms of this magnitude, count as no spread.
fn is_constant(values: &[f64], mean: f64, std_dev: f64) -> bool {
    if !std_dev.is_finite() || values.iter().all(|v| *v == values[0]) {
        return true;
    }
    std_dev <= f64::EPSILON * mean.abs().max(1.0) * values.len() as f64
}
