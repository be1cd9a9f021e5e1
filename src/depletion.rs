use crate::models::{DepletionEstimate, ParticipantRecord};

/// Longest runway ever reported, in days.
pub const MAX_RUNWAY_DAYS: f64 = 365.0;

pub fn estimate_depletion(records: &[ParticipantRecord]) -> Vec<DepletionEstimate> {
    records
        .iter()
        .map(|record| DepletionEstimate {
            participant_id: record.participant_id.clone(),
            days_until_depletion: runway_days(record.total_funding, record.daily_expenditure),
        })
        .collect()
}

/// Days of funding left at the current burn rate, capped at a year.
/// A record that spends nothing is reported at the cap.
pub fn runway_days(total_funding: f64, daily_expenditure: f64) -> f64 {
    if daily_expenditure <= 0.0 {
        return MAX_RUNWAY_DAYS;
    }

    (total_funding / daily_expenditure).clamp(0.0, MAX_RUNWAY_DAYS)
}
