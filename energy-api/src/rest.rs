use crate::access::AccessControl;
use crate::auth::Caller;
use crate::directory::Directory;
use crate::errors::Error;
use crate::forecast::ForecastEngine;
use crate::ingest::IngestionPipeline;
use crate::metrics::ACCESS_DENIED_TOTAL;
use crate::model::{
    AccessibleBuildingsResponse, ErrorResponse, ForecastResponse, IngestRequest, ReadingResponse,
};
use crate::store::ReadingStore;
use crate::timestamp::local_now;
use crate::validate::validate;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

const DEFAULT_WINDOW_MINUTES: i32 = 60;

#[derive(Clone)]
pub struct AppState {
    pub readings: Arc<dyn ReadingStore>,
    pub access: AccessControl,
    pub forecasts: ForecastEngine,
    pub ingestion: IngestionPipeline,
}

impl AppState {
    pub fn new(
        readings: Arc<dyn ReadingStore>,
        directory: Arc<dyn Directory>,
        forecast_threshold: f64,
    ) -> Self {
        Self {
            access: AccessControl::new(directory),
            forecasts: ForecastEngine::new(readings.clone(), forecast_threshold),
            ingestion: IngestionPipeline::new(readings.clone()),
            readings,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub minutes: Option<i32>,
}

impl WindowQuery {
    fn minutes(&self) -> i64 {
        i64::from(self.minutes.unwrap_or(DEFAULT_WINDOW_MINUTES))
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ingest", post(ingest))
        .route("/buildings", get(accessible_buildings))
        .route("/buildings/:id/last-readings", get(last_readings))
        .route("/buildings/:id/forecast", get(forecast))
        .with_state(state)
}

pub async fn ingest(
    State(state): State<AppState>,
    body: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReadingResponse>), ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let raw = validate(request)?;
    info!(
        "Received ingest request for buildingId: {}, sensorId: {}",
        raw.building_id, raw.sensor_id
    );

    let response = state.ingestion.ingest(raw).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn last_readings(
    State(state): State<AppState>,
    caller: Caller,
    Path(building_id): Path<i64>,
    Query(window): Query<WindowQuery>,
) -> Result<Json<Vec<ReadingResponse>>, ApiError> {
    info!(
        "User {} requesting last readings for building {}",
        caller.username, building_id
    );
    authorize(&state, &caller, building_id).await?;

    let readings = state
        .readings
        .recent(building_id, window.minutes(), local_now())
        .await?;
    Ok(Json(readings.into_iter().map(ReadingResponse::from).collect()))
}

pub async fn forecast(
    State(state): State<AppState>,
    caller: Caller,
    Path(building_id): Path<i64>,
    Query(window): Query<WindowQuery>,
) -> Result<Json<ForecastResponse>, ApiError> {
    info!(
        "User {} requesting forecast for building {}",
        caller.username, building_id
    );
    authorize(&state, &caller, building_id).await?;

    let forecast = state
        .forecasts
        .forecast(building_id, window.minutes())
        .await?;
    Ok(Json(forecast))
}

pub async fn accessible_buildings(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<AccessibleBuildingsResponse>, ApiError> {
    match state.access.accessible_building_ids(&caller.username).await {
        Ok(ids) => Ok(Json(AccessibleBuildingsResponse {
            username: caller.username,
            building_ids: ids.into_iter().collect(),
        })),
        Err(Error::UserNotFound(_)) => {
            ACCESS_DENIED_TOTAL.with_label_values(&["unknown_user"]).inc();
            warn!("Unknown user {} requesting building list", caller.username);
            Err(ApiError::Forbidden)
        }
        Err(e) => Err(e.into()),
    }
}

/// Gate for building-scoped reads. Unknown users and unknown buildings are
/// answered exactly like an ownership mismatch; only logs and the
/// `reason` label tell them apart.
async fn authorize(state: &AppState, caller: &Caller, building_id: i64) -> Result<(), ApiError> {
    let reason = match state.access.can_access(&caller.username, building_id).await {
        Ok(true) => return Ok(()),
        Ok(false) => "not_owner",
        Err(Error::UserNotFound(_)) => "unknown_user",
        Err(Error::BuildingNotFound(_)) => "unknown_building",
        Err(e) => return Err(e.into()),
    };

    ACCESS_DENIED_TOTAL.with_label_values(&[reason]).inc();
    warn!(
        "User {} does not have access to building {} ({})",
        caller.username, building_id, reason
    );
    Err(ApiError::Forbidden)
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Forbidden,
    Internal(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(msg) => ApiError::BadRequest(msg),
            Error::UserNotFound(_) | Error::BuildingNotFound(_) => ApiError::Forbidden,
            other => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "access denied".to_string()),
            ApiError::Internal(err) => {
                error!("API error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            ApiError::from(Error::Validation("value is required".to_string())),
            ApiError::BadRequest(msg) if msg == "value is required"
        ));
        assert!(matches!(
            ApiError::from(Error::BuildingNotFound(3)),
            ApiError::Forbidden
        ));
        assert!(matches!(
            ApiError::from(Error::Config("x".to_string())),
            ApiError::Internal(_)
        ));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest("bad".to_string()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Forbidden.into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::Internal(Error::Database(sqlx::Error::PoolTimedOut))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_window_default() {
        assert_eq!(WindowQuery::default().minutes(), 60);
        assert_eq!(WindowQuery { minutes: Some(15) }.minutes(), 15);
    }
}
