use crate::errors::Result;
use crate::metrics::{INGEST_LATENCY_SECONDS, READINGS_INGESTED_TOTAL, TIMESTAMP_FALLBACK_TOTAL};
use crate::model::{RawReading, Reading, ReadingResponse};
use crate::store::ReadingStore;
use crate::timestamp::{local_now, parse_local};
use chrono::NaiveDateTime;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where the persisted timestamp of a reading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampSource {
    Supplied,
    /// Absent or empty; replaced by the current time.
    Missing,
    /// Present but unparsable; replaced by the current time.
    Malformed,
}

impl TimestampSource {
    fn fallback_cause(&self) -> Option<&'static str> {
        match self {
            TimestampSource::Supplied => None,
            TimestampSource::Missing => Some("missing"),
            TimestampSource::Malformed => Some("malformed"),
        }
    }
}

/// Picks the timestamp to persist. Ingestion is best-effort: a bad timestamp
/// never rejects the reading.
pub fn resolve_timestamp(raw: Option<&str>, now: NaiveDateTime) -> (NaiveDateTime, TimestampSource) {
    match raw {
        None | Some("") => (now, TimestampSource::Missing),
        Some(text) => match parse_local(text) {
            Some(ts) => (ts, TimestampSource::Supplied),
            None => (now, TimestampSource::Malformed),
        },
    }
}

#[derive(Clone)]
pub struct IngestionPipeline {
    store: Arc<dyn ReadingStore>,
}

impl IngestionPipeline {
    pub fn new(store: Arc<dyn ReadingStore>) -> Self {
        Self { store }
    }

    pub async fn ingest(&self, raw: RawReading) -> Result<ReadingResponse> {
        self.ingest_at(raw, local_now()).await
    }

    /// Same as [`IngestionPipeline::ingest`] with `now` used for fallbacks.
    pub async fn ingest_at(&self, raw: RawReading, now: NaiveDateTime) -> Result<ReadingResponse> {
        debug!(
            "Ingesting reading: buildingId={}, sensorId={}, value={}",
            raw.building_id, raw.sensor_id, raw.value
        );

        let (timestamp, source) = resolve_timestamp(raw.timestamp.as_deref(), now);
        if let Some(cause) = source.fallback_cause() {
            TIMESTAMP_FALLBACK_TOTAL.with_label_values(&[cause]).inc();
        }
        if source == TimestampSource::Malformed {
            warn!(
                "Invalid timestamp format, using current time: {:?}",
                raw.timestamp.as_deref().unwrap_or_default()
            );
        }

        let start = Instant::now();
        let stored = self
            .store
            .append(Reading {
                building_id: raw.building_id,
                sensor_id: raw.sensor_id,
                timestamp,
                value: raw.value,
            })
            .await?;
        INGEST_LATENCY_SECONDS.observe(start.elapsed().as_secs_f64());
        READINGS_INGESTED_TOTAL.inc();

        info!("Reading saved with id: {}", stored.id);
        Ok(stored.into())
    }
}
