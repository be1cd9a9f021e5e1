use crate::models::ParticipantRecord;

/// Least-squares line of service hours against daily expenditure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoursTrend {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation; `None` when every participant has the same hours.
    pub correlation: Option<f64>,
}

/// Returns `None` for fewer than two records or when every record spends the
/// same amount, since no line is defined.
pub fn fit_hours_trend(records: &[ParticipantRecord]) -> Option<HoursTrend> {
    if records.len() < 2 {
        return None;
    }

    let first = records[0].daily_expenditure;
    if records.iter().all(|r| r.daily_expenditure == first) {
        return None;
    }

    let n = records.len() as f64;
    let mean_x = records.iter().map(|r| r.daily_expenditure).sum::<f64>() / n;
    let mean_y = records.iter().map(|r| r.service_hours).sum::<f64>() / n;

    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for record in records {
        let dx = record.daily_expenditure - mean_x;
        let dy = record.service_hours - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    if sxx <= 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let first_hours = records[0].service_hours;
    let correlation = if records.iter().all(|r| r.service_hours == first_hours) || syy <= 0.0 {
        None
    } else {
        Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
    };

    Some(HoursTrend {
        slope,
        intercept: mean_y - slope * mean_x,
        correlation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(expenditure: f64, hours: f64) -> ParticipantRecord {
        ParticipantRecord {
            participant_id: format!("{expenditure}-{hours}"),
            total_funding: 10_000.0,
            daily_expenditure: expenditure,
            service_hours: hours,
        }
    }

    #[test]
    fn fits_an_exact_line() {
        let trend =
            fit_hours_trend(&[record(10.0, 1.0), record(20.0, 3.0), record(30.0, 5.0)]).unwrap();
        assert!((trend.slope - 0.2).abs() < 1e-12);
        assert!((trend.intercept - -1.0).abs() < 1e-12);
        assert!((trend.correlation.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn negative_relationship_has_negative_correlation() {
        let trend = fit_hours_trend(&[
            record(10.0, 9.0),
            record(20.0, 6.0),
            record(30.0, 4.0),
            record(40.0, 1.0),
        ])
        .unwrap();
        assert!(trend.slope < 0.0);
        assert!(trend.correlation.unwrap() < -0.9);
    }

    #[test]
    fn flat_hours_have_no_correlation() {
        let trend = fit_hours_trend(&[record(10.0, 4.0), record(30.0, 4.0)]).unwrap();
        assert_eq!(trend.slope, 0.0);
        assert_eq!(trend.intercept, 4.0);
        assert_eq!(trend.correlation, None);
    }

    #[test]
    fn undefined_without_spread_in_spend() {
        assert_eq!(fit_hours_trend(&[]), None);
        assert_eq!(fit_hours_trend(&[record(10.0, 4.0)]), None);
        assert_eq!(
            fit_hours_trend(&[record(0.1, 4.0), record(0.1, 8.0), record(0.1, 2.0)]),
            None
        );
    }
}
