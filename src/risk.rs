use tracing::warn;

use crate::error::AnalysisError;
use crate::models::{ParticipantRecord, RiskAssessment, RiskLevel};

/// Scores above this are High.
pub const HIGH_RISK_SCORE: f64 = 0.7;
/// Scores above this (and not High) are Medium.
pub const MEDIUM_RISK_SCORE: f64 = 0.3;
/// Magnitude a non-finite score is pinned to.
pub const RISK_SCORE_LIMIT: f64 = 1000.0;

const DAYS_PER_YEAR: f64 = 365.0;

/// Caller-supplied alert thresholds, both percentages in (0, 100].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskThresholds {
    funding_pct: f64,
    service_hours: f64,
}

impl RiskThresholds {
    pub fn new(funding_pct: f64, service_hours: f64) -> Result<Self, AnalysisError> {
        Ok(Self {
            funding_pct: check_threshold("funding", funding_pct)?,
            service_hours: check_threshold("service hours", service_hours)?,
        })
    }

    pub fn funding_pct(&self) -> f64 {
        self.funding_pct
    }

    pub fn service_hours(&self) -> f64 {
        self.service_hours
    }
}

fn check_threshold(name: &'static str, value: f64) -> Result<f64, AnalysisError> {
    if value.is_finite() && value > 0.0 && value <= 100.0 {
        Ok(value)
    } else {
        Err(AnalysisError::InvalidThreshold { name, value })
    }
}

pub fn assess_risk(
    records: &[ParticipantRecord],
    funding_threshold_pct: f64,
    service_hours_threshold: f64,
) -> Result<Vec<RiskAssessment>, AnalysisError> {
    let thresholds = RiskThresholds::new(funding_threshold_pct, service_hours_threshold)?;
    Ok(records
        .iter()
        .map(|record| assess_record(record, &thresholds))
        .collect())
}

pub fn assess_record(record: &ParticipantRecord, thresholds: &RiskThresholds) -> RiskAssessment {
    let funding_risk = funding_risk_pct(record.total_funding, record.daily_expenditure);
    let raw_score = ((thresholds.funding_pct - funding_risk) / thresholds.funding_pct
        + (thresholds.service_hours - record.service_hours) / thresholds.service_hours)
        / 2.0;

    let (risk_score, clamped) = clamp_score(raw_score);
    if clamped {
        warn!(
            participant_id = %record.participant_id,
            raw_score,
            "risk score was not finite; clamped"
        );
    }

    RiskAssessment {
        participant_id: record.participant_id.clone(),
        risk_score,
        risk_level: classify(risk_score),
        clamped,
    }
}

/// Percentage of funding that would remain after a year at the current burn.
/// Negative once a year of spending outruns the funding.
pub fn funding_risk_pct(total_funding: f64, daily_expenditure: f64) -> f64 {
    let remaining = total_funding - daily_expenditure * DAYS_PER_YEAR;
    if total_funding == 0.0 && remaining == 0.0 {
        return 0.0;
    }
    remaining / total_funding * 100.0
}

fn clamp_score(score: f64) -> (f64, bool) {
    if score.is_finite() {
        (score, false)
    } else if score == f64::NEG_INFINITY {
        (-RISK_SCORE_LIMIT, true)
    } else {
        (RISK_SCORE_LIMIT, true)
    }
}

pub fn classify(score: f64) -> RiskLevel {
    if score > HIGH_RISK_SCORE {
        RiskLevel::High
    } else if score > MEDIUM_RISK_SCORE {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

pub fn count_at_level(assessments: &[RiskAssessment], level: RiskLevel) -> usize {
    assessments
        .iter()
        .filter(|assessment| assessment.risk_level == level)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(funding: f64, expenditure: f64, hours: f64) -> ParticipantRecord {
        ParticipantRecord {
            participant_id: "1".to_string(),
            total_funding: funding,
            daily_expenditure: expenditure,
            service_hours: hours,
        }
    }

    #[test]
    fn overspending_participant_scores_high() {
        let assessments = assess_risk(&[record(1000.0, 10.0, 5.0)], 20.0, 15.0).unwrap();
        let assessment = &assessments[0];

        assert_eq!(funding_risk_pct(1000.0, 10.0), -265.0);
        let expected = (14.25 + 10.0 / 15.0) / 2.0;
        assert!((assessment.risk_score - expected).abs() < 1e-9);
        assert!((assessment.risk_score - 7.46).abs() < 0.01);
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert!(!assessment.clamped);
    }

    #[test]
    fn well_funded_participant_scores_low() {
        let assessments = assess_risk(&[record(7300.0, 10.0, 30.0)], 20.0, 15.0).unwrap();
        // funding risk 50% -> (20-50)/20 = -1.5; hours (15-30)/15 = -1.0
        assert!((assessments[0].risk_score - -1.25).abs() < 1e-9);
        assert_eq!(assessments[0].risk_level, RiskLevel::Low);
    }

    #[test]
    fn classification_boundaries_are_exclusive_above() {
        assert_eq!(classify(0.7), RiskLevel::Medium);
        assert_eq!(classify(0.7000001), RiskLevel::High);
        assert_eq!(classify(0.3), RiskLevel::Low);
        assert_eq!(classify(0.3000001), RiskLevel::Medium);
    }

    #[test]
    fn rejects_zero_and_out_of_range_thresholds() {
        assert_eq!(
            RiskThresholds::new(0.0, 15.0),
            Err(AnalysisError::InvalidThreshold {
                name: "funding",
                value: 0.0
            })
        );
        assert!(RiskThresholds::new(20.0, 0.0).is_err());
        assert!(RiskThresholds::new(120.0, 15.0).is_err());
        assert!(RiskThresholds::new(20.0, f64::NAN).is_err());
        assert!(assess_risk(&[], 0.0, 15.0).is_err());
    }

    #[test]
    fn unfunded_spender_is_clamped_not_infinite() {
        let assessments = assess_risk(&[record(0.0, 5.0, 5.0)], 20.0, 15.0).unwrap();
        assert_eq!(assessments[0].risk_score, RISK_SCORE_LIMIT);
        assert!(assessments[0].clamped);
        assert_eq!(assessments[0].risk_level, RiskLevel::High);
    }

    #[test]
    fn unfunded_idle_participant_keeps_finite_score() {
        let assessments = assess_risk(&[record(0.0, 0.0, 15.0)], 20.0, 15.0).unwrap();
        // funding risk defined as 0% -> (20-0)/20 = 1; hours term 0.
        assert!((assessments[0].risk_score - 0.5).abs() < 1e-9);
        assert!(!assessments[0].clamped);
    }

    #[test]
    fn counts_high_risk_participants() {
        let thresholds = RiskThresholds::new(20.0, 15.0).unwrap();
        let assessments: Vec<_> = [record(1000.0, 10.0, 5.0), record(7300.0, 10.0, 30.0)]
            .iter()
            .map(|r| assess_record(r, &thresholds))
            .collect();
        assert_eq!(count_at_level(&assessments, RiskLevel::High), 1);
        assert_eq!(count_at_level(&assessments, RiskLevel::Low), 1);
    }

    #[test]
    fn repeated_runs_agree() {
        let records = vec![record(1000.0, 10.0, 5.0), record(5000.0, 2.0, 40.0)];
        assert_eq!(
            assess_risk(&records, 20.0, 15.0).unwrap(),
            assess_risk(&records, 20.0, 15.0).unwrap()
        );
    }

    proptest! {
        #[test]
        fn level_is_a_function_of_score(score in -10.0f64..10.0) {
            let level = classify(score);
            if score > 0.7 {
                prop_assert_eq!(level, RiskLevel::High);
            } else if score > 0.3 {
                prop_assert_eq!(level, RiskLevel::Medium);
            } else {
                prop_assert_eq!(level, RiskLevel::Low);
            }
        }

        #[test]
        fn scores_are_always_finite(
            funding in 0.0f64..1.0e6,
            expenditure in 0.0f64..1.0e3,
            hours in 0.0f64..200.0,
            funding_threshold in 1.0f64..=100.0,
            hours_threshold in 1.0f64..=100.0,
        ) {
            let thresholds = RiskThresholds::new(funding_threshold, hours_threshold).unwrap();
            let assessment = assess_record(&record(funding, expenditure, hours), &thresholds);
            prop_assert!(assessment.risk_score.is_finite());
        }
    }
}
