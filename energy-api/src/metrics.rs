use crate::errors::Result;
use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref READINGS_INGESTED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "energy_readings_ingested_total",
        "Total readings persisted through the ingest endpoint"
    ))
    .expect("valid metric opts");
    pub static ref TIMESTAMP_FALLBACK_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "energy_timestamp_fallback_total",
            "Readings stamped with the current time instead of the supplied timestamp"
        ),
        &["cause"]
    )
    .expect("valid metric opts");
    pub static ref ACCESS_DENIED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "energy_access_denied_total",
            "Building-scoped requests answered with 403"
        ),
        &["reason"]
    )
    .expect("valid metric opts");
    pub static ref FORECASTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("energy_forecasts_total", "Forecasts generated by outcome"),
        &["outcome"]
    )
    .expect("valid metric opts");
    pub static ref DB_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "energy_db_failures_total",
        "Total database insert failures"
    ))
    .expect("valid metric opts");
    pub static ref INGEST_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "energy_ingest_latency_seconds",
            "Time taken to persist a single reading"
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0
        ])
    )
    .expect("valid metric opts");
}

pub fn init_metrics() -> Result<()> {
    REGISTRY.register(Box::new(READINGS_INGESTED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TIMESTAMP_FALLBACK_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ACCESS_DENIED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(FORECASTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DB_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(INGEST_LATENCY_SECONDS.clone()))?;
    Ok(())
}

pub fn gather_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
