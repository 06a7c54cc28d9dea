use crate::errors::{Error, Result};
use crate::model::{IngestRequest, RawReading};

fn required<T>(field: Option<T>, name: &str) -> Result<T> {
    field.ok_or_else(|| Error::Validation(format!("{} is required", name)))
}

/// Checks that every ingest field is present. Values themselves are not
/// inspected: an empty sensor id or timestamp string is accepted.
pub fn validate(request: IngestRequest) -> Result<RawReading> {
    let building_id = required(request.building_id, "buildingId")?;
    let sensor_id = required(request.sensor_id, "sensorId")?;
    let timestamp = required(request.timestamp, "timestamp")?;
    let value = required(request.value, "value")?;

    Ok(RawReading {
        building_id,
        sensor_id,
        timestamp: Some(timestamp),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> IngestRequest {
        IngestRequest {
            building_id: Some(1),
            sensor_id: Some("sensor-001".to_string()),
            timestamp: Some("2024-03-15T10:00:00".to_string()),
            value: Some(75.5),
        }
    }

    fn message(result: Result<RawReading>) -> String {
        match result {
            Err(Error::Validation(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_request() {
        let raw = validate(complete()).unwrap();
        assert_eq!(raw.building_id, 1);
        assert_eq!(raw.sensor_id, "sensor-001");
        assert_eq!(raw.timestamp.as_deref(), Some("2024-03-15T10:00:00"));
        assert_eq!(raw.value, 75.5);
    }

    #[test]
    fn test_empty_strings_are_present() {
        let request = IngestRequest {
            sensor_id: Some(String::new()),
            timestamp: Some(String::new()),
            ..complete()
        };
        assert!(validate(request).is_ok());
    }

    #[test]
    fn test_missing_building_id() {
        let request = IngestRequest {
            building_id: None,
            ..complete()
        };
        assert_eq!(message(validate(request)), "buildingId is required");
    }

    #[test]
    fn test_missing_sensor_id() {
        let request = IngestRequest {
            sensor_id: None,
            ..complete()
        };
        assert_eq!(message(validate(request)), "sensorId is required");
    }

    #[test]
    fn test_missing_timestamp() {
        let request = IngestRequest {
            timestamp: None,
            ..complete()
        };
        assert_eq!(message(validate(request)), "timestamp is required");
    }

    #[test]
    fn test_missing_value() {
        let request = IngestRequest {
            value: None,
            ..complete()
        };
        assert_eq!(message(validate(request)), "value is required");
    }

    #[test]
    fn test_reports_first_missing_field() {
        let request = IngestRequest {
            building_id: Some(1),
            ..IngestRequest::default()
        };
        assert_eq!(message(validate(request)), "sensorId is required");
    }
}
