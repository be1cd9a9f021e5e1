use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{
    AllocationRecommendation, DepletionEstimate, ForecastPoint, ParticipantRecord,
    PortfolioSummary, RiskAssessment, RiskLevel,
};
use crate::risk::{self, RiskThresholds};
use crate::service_hours;

pub fn summarize(
    records: &[ParticipantRecord],
    assessments: &[RiskAssessment],
    recommendations: &[AllocationRecommendation],
    date: NaiveDate,
) -> PortfolioSummary {
    let total_hours: f64 = records.iter().map(|r| r.service_hours).sum();

    PortfolioSummary {
        date,
        total_participants: records.len(),
        total_funding: records.iter().map(|r| r.total_funding).sum(),
        average_service_hours: if records.is_empty() {
            0.0
        } else {
            total_hours / records.len() as f64
        },
        high_risk_participants: risk::count_at_level(assessments, RiskLevel::High),
        recommendations: recommendations.to_vec(),
    }
}

#[derive(Serialize)]
struct SummaryRow<'a> {
    date: NaiveDate,
    total_participants: usize,
    total_funding: f64,
    average_service_hours: f64,
    high_risk_participants: usize,
    recommendations: &'a str,
}

/// Writes the summary as a header line plus one data row. Recommendations
/// are nested as JSON inside a single cell.
pub fn write_summary_csv<W: std::io::Write>(
    summary: &PortfolioSummary,
    writer: W,
) -> anyhow::Result<()> {
    let recommendations = serde_json::to_string(&summary.recommendations)?;
    let mut writer = csv::Writer::from_writer(writer);
    writer.serialize(SummaryRow {
        date: summary.date,
        total_participants: summary.total_participants,
        total_funding: summary.total_funding,
        average_service_hours: summary.average_service_hours,
        high_risk_participants: summary.high_risk_participants,
        recommendations: &recommendations,
    })?;
    writer.flush()?;
    Ok(())
}

pub fn report_filename(date: NaiveDate) -> String {
    format!("support_coordination_report_{}.csv", date.format("%Y%m%d"))
}

pub fn build_dashboard(
    records: &[ParticipantRecord],
    depletion: &[DepletionEstimate],
    assessments: &[RiskAssessment],
    thresholds: &RiskThresholds,
    forecast: &[ForecastPoint],
    recommendations: &[AllocationRecommendation],
    generated_on: NaiveDate,
) -> String {
    let mut output = String::new();
    let total_funding: f64 = records.iter().map(|r| r.total_funding).sum();

    let _ = writeln!(output, "# Support Coordination Portfolio Dashboard");
    let _ = writeln!(
        output,
        "Generated on {} for {} participants",
        generated_on,
        records.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Funding Overview");

    if records.is_empty() {
        let _ = writeln!(output, "No participants loaded.");
    } else {
        let _ = writeln!(output, "Total funding {:.2}", total_funding);
        let mut by_funding: Vec<&ParticipantRecord> = records.iter().collect();
        by_funding.sort_by(|a, b| b.total_funding.total_cmp(&a.total_funding));
        for record in by_funding {
            let share = if total_funding > 0.0 {
                record.total_funding / total_funding * 100.0
            } else {
                0.0
            };
            let _ = writeln!(
                output,
                "- {}: {:.2} ({:.1}% of portfolio)",
                record.participant_id, record.total_funding, share
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Days Until Funding Depletion");

    if depletion.is_empty() {
        let _ = writeln!(output, "No participants loaded.");
    } else {
        for estimate in depletion {
            let _ = writeln!(
                output,
                "- {}: {:.0} days",
                estimate.participant_id, estimate.days_until_depletion
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Service Hours vs. Daily Expenditure");

    match service_hours::fit_hours_trend(records) {
        Some(trend) => {
            let _ = writeln!(
                output,
                "service_hours = {:.4} * daily_expenditure {} {:.4}",
                trend.slope,
                if trend.intercept < 0.0 { "-" } else { "+" },
                trend.intercept.abs()
            );
            match trend.correlation {
                Some(correlation) => {
                    let _ = writeln!(output, "- correlation {:.2}", correlation);
                }
                None => {
                    let _ = writeln!(output, "- correlation undefined (service hours do not vary)");
                }
            }
        }
        None => {
            let _ = writeln!(output, "Not enough spread in daily expenditure to fit a trend.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "## Participant Risk Assessment (funding alert {}%, service hours alert {})",
        thresholds.funding_pct(),
        thresholds.service_hours()
    );

    if assessments.is_empty() {
        let _ = writeln!(output, "No participants loaded.");
    } else {
        let _ = writeln!(
            output,
            "High {} / Medium {} / Low {}",
            risk::count_at_level(assessments, RiskLevel::High),
            risk::count_at_level(assessments, RiskLevel::Medium),
            risk::count_at_level(assessments, RiskLevel::Low)
        );
        let mut ranked = assessments.to_vec();
        ranked.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));
        for assessment in ranked.iter() {
            let flag = if assessment.clamped { " (clamped)" } else { "" };
            let _ = writeln!(
                output,
                "- {} {} score {:.2}{}",
                assessment.participant_id, assessment.risk_level, assessment.risk_score, flag
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Expenditure Forecast");

    match (forecast.first(), forecast.last()) {
        (Some(first), Some(last)) => {
            let total: f64 = forecast.iter().map(|p| p.predicted_expenditure).sum();
            let _ = writeln!(
                output,
                "{} days from {} to {}, projected spend {:.2}",
                forecast.len(),
                first.date,
                last.date,
                total
            );
            let _ = writeln!(
                output,
                "- first day {:.2}, last day {:.2}",
                first.predicted_expenditure, last.predicted_expenditure
            );
            let _ = writeln!(output, "Directional only: linear trend with random noise.");
        }
        _ => {
            let _ = writeln!(output, "No forecast requested.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Coordinator Allocation Recommendations");
    for recommendation in recommendations {
        let _ = writeln!(
            output,
            "- {} complexity: {} participants, {} coordinators",
            recommendation.complexity_level,
            recommendation.participant_count,
            recommendation.recommended_coordinators
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::recommend_allocation;
    use crate::depletion::estimate_depletion;
    use crate::models::ComplexityLevel;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn portfolio() -> Vec<ParticipantRecord> {
        vec![
            ParticipantRecord {
                participant_id: "1".to_string(),
                total_funding: 1000.0,
                daily_expenditure: 10.0,
                service_hours: 5.0,
            },
            ParticipantRecord {
                participant_id: "2".to_string(),
                total_funding: 7300.0,
                daily_expenditure: 10.0,
                service_hours: 30.0,
            },
        ]
    }

    fn assessments(records: &[ParticipantRecord]) -> Vec<RiskAssessment> {
        risk::assess_risk(records, 20.0, 15.0).unwrap()
    }

    #[test]
    fn summary_aggregates_portfolio() {
        let records = portfolio();
        let summary = summarize(
            &records,
            &assessments(&records),
            &recommend_allocation(&records),
            date(),
        );

        assert_eq!(summary.total_participants, 2);
        assert_eq!(summary.total_funding, 8300.0);
        assert_eq!(summary.average_service_hours, 17.5);
        assert_eq!(summary.high_risk_participants, 1);
        assert_eq!(summary.recommendations.len(), 2);
    }

    #[test]
    fn empty_summary_has_zero_average() {
        let summary = summarize(&[], &[], &recommend_allocation(&[]), date());
        assert_eq!(summary.total_participants, 0);
        assert_eq!(summary.average_service_hours, 0.0);
    }

    #[test]
    fn filename_embeds_date() {
        assert_eq!(
            report_filename(date()),
            "support_coordination_report_20261016.csv"
        );
    }

    #[test]
    fn summary_csv_is_a_single_row() {
        let records = portfolio();
        let summary = summarize(
            &records,
            &assessments(&records),
            &recommend_allocation(&records),
            date(),
        );
        let mut buffer = Vec::new();
        write_summary_csv(&summary, &mut buffer).unwrap();

        let mut reader = csv::Reader::from_reader(buffer.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec![
                "date",
                "total_participants",
                "total_funding",
                "average_service_hours",
                "high_risk_participants",
                "recommendations"
            ]
        );

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "2026-10-16");
        assert_eq!(&rows[0][1], "2");
        assert_eq!(&rows[0][4], "1");

        let nested: serde_json::Value = serde_json::from_str(&rows[0][5]).unwrap();
        assert_eq!(nested[0]["complexity_level"], "High");
        assert_eq!(nested[1]["complexity_level"], "Low");
    }

    #[test]
    fn dashboard_lists_every_section() {
        let records = portfolio();
        let thresholds = RiskThresholds::new(20.0, 15.0).unwrap();
        let recommendations = recommend_allocation(&records);
        let dashboard = build_dashboard(
            &records,
            &estimate_depletion(&records),
            &assessments(&records),
            &thresholds,
            &[],
            &recommendations,
            date(),
        );

        assert!(dashboard.contains("Generated on 2026-10-16 for 2 participants"));
        assert!(dashboard.contains("- 1: 100 days"));
        assert!(dashboard.contains("High 1 / Medium 0 / Low 1"));
        assert!(dashboard.contains("No forecast requested."));
        assert!(dashboard.contains("Not enough spread in daily expenditure to fit a trend."));
        assert_eq!(recommendations[0].complexity_level, ComplexityLevel::High);
        assert!(dashboard.contains("- High complexity: 0 participants, 1 coordinators"));
        assert!(dashboard.contains("- Low complexity: 2 participants, 1 coordinators"));
    }

    #[test]
    fn dashboard_flags_clamped_scores_and_fits_hours_trend() {
        let mut records = portfolio();
        records.push(ParticipantRecord {
            participant_id: "3".to_string(),
            total_funding: 0.0,
            daily_expenditure: 30.0,
            service_hours: 45.0,
        });
        let thresholds = RiskThresholds::new(20.0, 15.0).unwrap();
        let risks = assessments(&records);
        assert!(risks[2].clamped);

        let dashboard = build_dashboard(
            &records,
            &estimate_depletion(&records),
            &risks,
            &thresholds,
            &[],
            &recommend_allocation(&records),
            date(),
        );

        assert!(dashboard.contains("- 3 High score 1000.00 (clamped)"));
        assert!(!dashboard.contains("- 1 High score 7.46 (clamped)"));
        assert!(dashboard.contains("- 1 High score 7.46\n"));
        assert!(!dashboard.contains("inf"));
        assert!(!dashboard.contains("NaN"));
        assert!(dashboard.contains("## Service Hours vs. Daily Expenditure"));
        assert!(dashboard.contains("- correlation"));
    }
}
