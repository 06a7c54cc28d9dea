use serde::Serialize;

/// Body accepted by `POST /ingest`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub building_id: i64,
    pub sensor_id: String,
    pub timestamp: String,
    pub value: f64,
}
