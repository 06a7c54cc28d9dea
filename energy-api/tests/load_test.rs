//! Throughput checks against a running server (`cargo test -- --ignored`).
//! Set `API_URL` to target something other than `http://localhost:8080`.

use chrono::Local;
use rand::Rng;
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::time::sleep;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IngestBody {
    building_id: i64,
    sensor_id: String,
    timestamp: String,
    value: f64,
}

impl IngestBody {
    fn random(building_id: i64, sensor_id: String) -> Self {
        let mut rng = rand::thread_rng();
        Self {
            building_id,
            sensor_id,
            timestamp: Local::now()
                .naive_local()
                .format("%Y-%m-%dT%H:%M:%S%.f")
                .to_string(),
            value: rng.gen_range(40.0..80.0),
        }
    }
}

fn base_url() -> String {
    std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

async fn run_load(total: usize, concurrency: usize) -> (usize, usize, Duration) {
    let client = reqwest::Client::new();
    let url = format!("{}/ingest", base_url());
    let start = Instant::now();

    let mut handles = Vec::with_capacity(concurrency);
    for worker in 0..concurrency {
        let client = client.clone();
        let url = url.clone();
        let share = total / concurrency + usize::from(worker < total % concurrency);
        handles.push(tokio::spawn(async move {
            let mut sent = 0;
            let mut errors = 0;
            for i in 0..share {
                let building_id = (i % 3) as i64 + 1;
                let body = IngestBody::random(building_id, format!("load-sensor-{}", worker));
                match client.post(&url).json(&body).send().await {
                    Ok(resp) if resp.status() == reqwest::StatusCode::CREATED => sent += 1,
                    Ok(resp) => {
                        errors += 1;
                        if errors < 10 {
                            eprintln!("Unexpected status: {}", resp.status());
                        }
                    }
                    Err(e) => {
                        errors += 1;
                        if errors < 10 {
                            eprintln!("Send error: {}", e);
                        }
                    }
                }
            }
            (sent, errors)
        }));
    }

    let mut sent = 0;
    let mut errors = 0;
    for handle in handles {
        let (s, e) = handle.await.unwrap();
        sent += s;
        errors += e;
    }
    (sent, errors, start.elapsed())
}

#[tokio::test]
#[ignore]
async fn test_ingest_throughput() {
    let total = 5_000;
    let (sent, errors, duration) = run_load(total, 16).await;
    let rate = sent as f64 / duration.as_secs_f64();

    println!("Sent {} readings in {:.2}s ({:.0} req/s), {} errors", sent, duration.as_secs_f64(), rate, errors);

    assert_eq!(errors, 0, "Too many errors: {} (expected 0)", errors);
    assert!(rate >= 500.0, "Throughput too low: {:.2} req/s (expected >= 500)", rate);
}

#[tokio::test]
#[ignore]
async fn test_forecast_under_ingest_load() {
    let client = reqwest::Client::new();
    let load = tokio::spawn(run_load(2_000, 8));

    sleep(Duration::from_millis(200)).await;

    let start = Instant::now();
    for _ in 0..50 {
        let resp = client
            .get(format!("{}/buildings/1/forecast?minutes=60", base_url()))
            .header("Authorization", "Bearer admin:ADMIN")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body["recommendation"].is_string());
    }
    let per_request = start.elapsed() / 50;
    println!("Forecast latency under load: {:?}", per_request);

    let (_, errors, _) = load.await.unwrap();
    assert_eq!(errors, 0);
}
