use crate::errors::Error;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access role. Only two exist; anything new must be handled explicitly
/// wherever roles are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Owner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Owner => "OWNER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "OWNER" => Ok(Role::Owner),
            other => Err(Error::InvalidRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Building {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub address: Option<String>,
}

/// A sensor measurement that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub building_id: i64,
    pub sensor_id: String,
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

/// A reading as persisted, including its store-assigned id.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StoredReading {
    pub id: i64,
    pub building_id: i64,
    pub sensor_id: String,
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

impl StoredReading {
    pub fn from_reading(id: i64, reading: Reading) -> Self {
        Self {
            id,
            building_id: reading.building_id,
            sensor_id: reading.sensor_id,
            timestamp: reading.timestamp,
            value: reading.value,
        }
    }
}

/// Ingest body as received. Every field is optional here so that a missing
/// one is reported as a validation failure rather than a decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub building_id: Option<i64>,
    pub sensor_id: Option<String>,
    pub timestamp: Option<String>,
    pub value: Option<f64>,
}

/// Ingest input after presence validation. The timestamp is still raw text.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReading {
    pub building_id: i64,
    pub sensor_id: String,
    pub timestamp: Option<String>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingResponse {
    pub building_id: i64,
    pub sensor_id: String,
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

impl From<StoredReading> for ReadingResponse {
    fn from(r: StoredReading) -> Self {
        Self {
            building_id: r.building_id,
            sensor_id: r.sensor_id,
            timestamp: r.timestamp,
            value: r.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResponse {
    pub building_id: i64,
    pub forecast: Vec<ForecastPoint>,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibleBuildingsResponse {
    pub username: String,
    pub building_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
