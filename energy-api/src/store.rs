use crate::errors::Result;
use crate::model::{Reading, StoredReading};
use crate::timestamp::minutes_before;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::cmp::Reverse;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Append-only time-series storage for readings.
///
/// Results of [`ReadingStore::query_recent`] are ordered by timestamp
/// descending, with ties broken by id descending, so repeated queries over
/// unchanged data return identical sequences regardless of insertion order.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Persists a reading and returns it with its assigned id.
    async fn append(&self, reading: Reading) -> Result<StoredReading>;

    /// All readings of `building_id` with `timestamp >= since`, newest first.
    async fn query_recent(
        &self,
        building_id: i64,
        since: NaiveDateTime,
    ) -> Result<Vec<StoredReading>>;

    /// Readings from the trailing `minutes` before `now`.
    async fn recent(
        &self,
        building_id: i64,
        minutes: i64,
        now: NaiveDateTime,
    ) -> Result<Vec<StoredReading>> {
        self.query_recent(building_id, minutes_before(now, minutes))
            .await
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    last_id: i64,
    by_building: HashMap<i64, Vec<StoredReading>>,
}

/// Process-local store used by tests and `STORE=memory` runs.
#[derive(Debug, Default)]
pub struct MemoryReadingStore {
    state: RwLock<MemoryState>,
}

impl MemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReadingStore for MemoryReadingStore {
    async fn append(&self, reading: Reading) -> Result<StoredReading> {
        let mut state = self.state.write().await;
        state.last_id += 1;
        let stored = StoredReading::from_reading(state.last_id, reading);
        state
            .by_building
            .entry(stored.building_id)
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn query_recent(
        &self,
        building_id: i64,
        since: NaiveDateTime,
    ) -> Result<Vec<StoredReading>> {
        let state = self.state.read().await;
        let mut readings: Vec<StoredReading> = state
            .by_building
            .get(&building_id)
            .map(|all| {
                all.iter()
                    .filter(|r| r.timestamp >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        readings.sort_by_key(|r| Reverse((r.timestamp, r.id)));
        Ok(readings)
    }
}
