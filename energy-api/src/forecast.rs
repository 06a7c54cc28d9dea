//! Moving-average baseline forecast.
//!
//! The most recent readings of the trailing hour are averaged and the
//! average is projected flat over every minute of the requested horizon.
//! The average is then compared against the configured threshold to pick a
//! recommendation.

use crate::errors::{Error, Result};
use crate::metrics::FORECASTS_TOTAL;
use crate::model::{ForecastPoint, ForecastResponse, StoredReading};
use crate::store::ReadingStore;
use crate::timestamp::{format_local, local_now, minutes_after};
use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_THRESHOLD: f64 = 100.0;
pub const LOOKBACK_MINUTES: i64 = 60;
pub const MOVING_AVERAGE_WINDOW: usize = 5;
/// Longest projection served, one week of per-minute points.
pub const MAX_HORIZON_MINUTES: i64 = 7 * 24 * 60;

pub const INSUFFICIENT_DATA: &str = "Insufficient data for forecast. Collect more readings.";
pub const WITHIN_NORMAL_RANGE: &str =
    "Energy consumption within normal range. No action required.";

#[derive(Clone)]
pub struct ForecastEngine {
    store: Arc<dyn ReadingStore>,
    threshold: f64,
}

impl ForecastEngine {
    pub fn new(store: Arc<dyn ReadingStore>, threshold: f64) -> Self {
        Self { store, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub async fn forecast(&self, building_id: i64, horizon_minutes: i64) -> Result<ForecastResponse> {
        self.forecast_at(building_id, horizon_minutes, local_now())
            .await
    }

    /// Same as [`ForecastEngine::forecast`] with an explicit clock.
    pub async fn forecast_at(
        &self,
        building_id: i64,
        horizon_minutes: i64,
        now: NaiveDateTime,
    ) -> Result<ForecastResponse> {
        debug!(
            "Generating forecast for building {} for next {} minutes",
            building_id, horizon_minutes
        );
        if horizon_minutes > MAX_HORIZON_MINUTES {
            return Err(Error::Validation(format!(
                "minutes must be at most {}",
                MAX_HORIZON_MINUTES
            )));
        }

        let readings = self
            .store
            .recent(building_id, LOOKBACK_MINUTES, now)
            .await?;

        if readings.is_empty() {
            warn!("No recent readings found for building {}", building_id);
            FORECASTS_TOTAL
                .with_label_values(&["insufficient_data"])
                .inc();
            return Ok(ForecastResponse {
                building_id,
                forecast: Vec::new(),
                recommendation: INSUFFICIENT_DATA.to_string(),
            });
        }

        let average = moving_average(&readings);
        let exceeds = average > self.threshold;
        FORECASTS_TOTAL
            .with_label_values(&[if exceeds { "exceeds_threshold" } else { "normal" }])
            .inc();

        Ok(ForecastResponse {
            building_id,
            forecast: project(now, average, horizon_minutes),
            recommendation: self.recommendation(average),
        })
    }

    pub fn recommendation(&self, average: f64) -> String {
        if average > self.threshold {
            format!(
                "Forecast exceeds threshold ({} > {}). Recommendation: Activate energy-saving mode.",
                display_number(average),
                display_number(self.threshold)
            )
        } else {
            WITHIN_NORMAL_RANGE.to_string()
        }
    }
}

/// Shortest round-trip rendering: plain decimal with at least one fractional
/// digit inside `[1e-3, 1e7)`, otherwise `<mantissa>E<exponent>` with the
/// mantissa always carrying a `.` (`1.0E7`).
pub fn display_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = value.abs();
    if value == 0.0 || (1e-3..1e7).contains(&magnitude) {
        return format!("{:?}", value);
    }

    let scientific = format!("{:e}", value);
    match scientific.split_once('e') {
        Some((mantissa, exponent)) if mantissa.contains('.') => {
            format!("{}E{}", mantissa, exponent)
        }
        Some((mantissa, exponent)) => format!("{}.0E{}", mantissa, exponent),
        None => scientific,
    }
}

/// Mean of the first `MOVING_AVERAGE_WINDOW` readings of a newest-first
/// sequence. NaN values do not count towards the sum or the divisor; with no
/// contributing values the average is 0.
pub fn moving_average(readings: &[StoredReading]) -> f64 {
    let (sum, count) = readings
        .iter()
        .take(MOVING_AVERAGE_WINDOW)
        .map(|r| r.value)
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count > 0 {
        sum / count as f64
    } else {
        0.0
    }
}

/// One point per minute at offsets `1..=horizon_minutes`, all carrying `value`.
pub fn project(now: NaiveDateTime, value: f64, horizon_minutes: i64) -> Vec<ForecastPoint> {
    (1..=horizon_minutes)
        .map_while(|offset| minutes_after(now, offset))
        .map(|ts| ForecastPoint {
            timestamp: format_local(&ts),
            value,
        })
        .collect()
}
