use chrono::{Duration, NaiveDate};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::models::{ForecastPoint, ParticipantRecord};

/// Cumulative growth reached on the last forecast day.
pub const TREND_GROWTH: f64 = 0.20;
/// Standard deviation of the daily multiplicative noise.
pub const NOISE_STD_DEV: f64 = 0.02;
pub const MIN_FORECAST_DAYS: u32 = 30;
pub const MAX_FORECAST_DAYS: u32 = 365;

/// Projects portfolio spend for `forecast_days` consecutive days from `start`.
///
/// The projection is a straight-line trend on today's total daily spend with
/// Gaussian noise drawn from `rng`. It is directional only; nothing is fitted.
pub fn generate_forecast<R: Rng + ?Sized>(
    records: &[ParticipantRecord],
    forecast_days: usize,
    start: NaiveDate,
    rng: &mut R,
) -> Vec<ForecastPoint> {
    let daily_total: f64 = records.iter().map(|r| r.daily_expenditure).sum();
    let noise = Normal::new(0.0, NOISE_STD_DEV).expect("invalid Normal params");

    debug!(forecast_days, daily_total, "generating expenditure forecast");

    (0..forecast_days)
        .map(|day| ForecastPoint {
            date: start + Duration::days(day as i64),
            predicted_expenditure: daily_total
                * (1.0 + trend_at(day, forecast_days) + noise.sample(&mut *rng)),
        })
        .collect()
}

/// Evenly spaced growth from 0 on the first day to `TREND_GROWTH` on the last.
pub fn trend_at(day: usize, forecast_days: usize) -> f64 {
    if forecast_days <= 1 {
        return 0.0;
    }
    TREND_GROWTH * day as f64 / (forecast_days - 1) as f64
}
