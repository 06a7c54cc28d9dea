mod reading;

use chrono::{Duration as ChronoDuration, Local, NaiveDateTime};
use clap::Parser;
use rand::Rng;
use reading::Reading;
use std::time::Duration;
use tracing::{error, info, warn};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const HIGH_CONSUMPTION: [f64; 5] = [120.0, 125.0, 130.0, 128.0, 132.0];

/// Buildings of the default fixture and the sensors installed in each.
const BUILDINGS: [(i64, &[&str]); 3] = [
    (1, &["sensor-001", "sensor-002", "sensor-003"]),
    (2, &["sensor-004", "sensor-005"]),
    (3, &["sensor-006", "sensor-007", "sensor-008"]),
];

#[derive(Debug, Parser)]
#[command(about = "Posts generated sensor readings to the building energy API")]
struct Args {
    /// Base URL of the API
    #[arg(long, env = "API_URL", default_value = "http://localhost:8080")]
    api_url: String,

    /// Readings per sensor, one minute apart, ending now
    #[arg(long, env = "READINGS", default_value_t = 10)]
    readings: usize,

    /// Pause between requests
    #[arg(long, env = "DELAY_MS", default_value_t = 100)]
    delay_ms: u64,

    /// Also send a fixed above-threshold sequence to this building
    #[arg(long, env = "HIGH_BUILDING")]
    high_building: Option<i64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Starting sensor data simulator");
    info!(
        "API: {}, readings per sensor: {}, delay: {}ms",
        args.api_url, args.readings, args.delay_ms
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;
    let url = format!("{}/ingest", args.api_url.trim_end_matches('/'));

    let mut rng = rand::thread_rng();
    let now = Local::now().naive_local();

    let mut batch = Vec::new();
    for (building_id, sensors) in BUILDINGS {
        info!("Generating data for building {} ({} sensors)", building_id, sensors.len());
        for sensor_id in sensors {
            batch.extend(generate_readings(&mut rng, building_id, sensor_id, args.readings, now));
        }
    }
    if let Some(building_id) = args.high_building {
        info!("Adding high-consumption sequence for building {}", building_id);
        batch.extend(high_consumption_readings(building_id, now));
    }

    let total = batch.len();
    let mut sent = 0;
    for reading in batch {
        match client.post(&url).json(&reading).send().await {
            Ok(resp) if resp.status() == reqwest::StatusCode::CREATED => {
                sent += 1;
                info!(
                    "Sent reading: building {}, sensor {}, value {}",
                    reading.building_id, reading.sensor_id, reading.value
                );
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                warn!("Failed to send reading: {} - {}", status, body);
            }
            Err(e) => {
                error!("Error sending reading: {}", e);
            }
        }
        tokio::time::sleep(Duration::from_millis(args.delay_ms)).await;
    }

    info!("Generation complete: {} sent, {} failed", sent, total - sent);
    Ok(())
}

/// `base ± variance + trend`, clamped at zero and rounded to two decimals.
fn generate_value(rng: &mut impl Rng, base: f64, variance: f64, trend: f64) -> f64 {
    let value = base + rng.gen_range(-variance..=variance) + trend;
    (value.max(0.0) * 100.0).round() / 100.0
}

fn generate_readings(
    rng: &mut impl Rng,
    building_id: i64,
    sensor_id: &str,
    count: usize,
    now: NaiveDateTime,
) -> Vec<Reading> {
    let base = rng.gen_range(40.0..80.0);
    (0..count)
        .map(|i| {
            let trend = rng.gen_range(-1.0..=1.0);
            let ts = now - ChronoDuration::minutes((count - i) as i64);
            Reading {
                building_id,
                sensor_id: sensor_id.to_string(),
                timestamp: ts.format(TIMESTAMP_FORMAT).to_string(),
                value: generate_value(rng, base, 15.0, trend),
            }
        })
        .collect()
}

/// Readings whose five-point average is 127.0, the newest one minute ago.
fn high_consumption_readings(building_id: i64, now: NaiveDateTime) -> Vec<Reading> {
    let n = HIGH_CONSUMPTION.len();
    HIGH_CONSUMPTION
        .iter()
        .enumerate()
        .map(|(i, value)| Reading {
            building_id,
            sensor_id: "sensor-high".to_string(),
            timestamp: (now - ChronoDuration::minutes((n - i) as i64))
                .format(TIMESTAMP_FORMAT)
                .to_string(),
            value: *value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_values_are_clamped_and_rounded() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let v = generate_value(&mut rng, 5.0, 15.0, 0.0);
            assert!(v >= 0.0);
            assert_eq!((v * 100.0).round() / 100.0, v);
        }
    }

    #[test]
    fn test_readings_end_one_minute_before_now() {
        let mut rng = StdRng::seed_from_u64(7);
        let readings = generate_readings(&mut rng, 2, "sensor-004", 10, now());

        assert_eq!(readings.len(), 10);
        assert_eq!(readings[0].timestamp, "2024-03-15T11:50:00");
        assert_eq!(readings[9].timestamp, "2024-03-15T11:59:00");
        assert!(readings.iter().all(|r| r.building_id == 2 && r.sensor_id == "sensor-004"));
    }

    #[test]
    fn test_high_consumption_sequence() {
        let readings = high_consumption_readings(1, now());
        let avg: f64 = readings.iter().map(|r| r.value).sum::<f64>() / readings.len() as f64;
        assert_eq!(avg, 127.0);
        assert_eq!(readings[4].timestamp, "2024-03-15T11:59:00");
    }

    #[test]
    fn test_reading_json_shape() {
        let json = serde_json::to_value(&high_consumption_readings(1, now())[0]).unwrap();
        assert_eq!(json["buildingId"], 1);
        assert_eq!(json["sensorId"], "sensor-high");
        assert_eq!(json["timestamp"], "2024-03-15T11:55:00");
        assert_eq!(json["value"], 120.0);
    }
}
