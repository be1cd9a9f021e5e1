use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of participant input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub participant_id: String,
    pub total_funding: f64,
    pub daily_expenditure: f64,
    pub service_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepletionEstimate {
    pub participant_id: String,
    pub days_until_depletion: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub participant_id: String,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    /// Set when the raw score was non-finite and has been pinned to the limit.
    pub clamped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplexityLevel {
    High,
    Low,
}

impl fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplexityLevel::High => f.write_str("High"),
            ComplexityLevel::Low => f.write_str("Low"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationRecommendation {
    pub complexity_level: ComplexityLevel,
    pub participant_count: usize,
    pub recommended_coordinators: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_expenditure: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub date: NaiveDate,
    pub total_participants: usize,
    pub total_funding: f64,
    pub average_service_hours: f64,
    pub high_risk_participants: usize,
    pub recommendations: Vec<AllocationRecommendation>,
}
