// src/location.rs
//! Validation of Notecard position-fix payloads

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub const FIELD_TYPE: &str = "best_location_type";
pub const FIELD_WHEN: &str = "best_location_when";
pub const FIELD_LAT: &str = "best_lat";
pub const FIELD_LON: &str = "best_lon";

/// Required payload keys in the order they are checked.
pub const REQUIRED_FIELDS: [&str; 4] = [FIELD_TYPE, FIELD_WHEN, FIELD_LAT, FIELD_LON];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for field: {0}")]
    InvalidField(&'static str),

    #[error("Field {field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

impl ValidationError {
    /// Payload key the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField(field)
            | ValidationError::InvalidField(field)
            | ValidationError::OutOfRange { field, .. } => field,
        }
    }
}

/// A validated position report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationFix {
    #[serde(rename = "type")]
    fix_type: String,
    #[serde(rename = "timestamp")]
    observed_at: String,
    latitude: f64,
    longitude: f64,
}

impl LocationFix {
    pub fn new(
        fix_type: impl Into<String>,
        observed_at: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            fix_type: fix_type.into(),
            observed_at: observed_at.into(),
            latitude,
            longitude,
        }
    }

    /// Source tag such as `gps`, `triangulated` or `tower`.
    pub fn fix_type(&self) -> &str {
        &self.fix_type
    }

    /// Observation time exactly as the source reported it.
    pub fn observed_at(&self) -> &str {
        &self.observed_at
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocationValidator {
    check_range: bool,
}

impl LocationValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also reject latitudes outside [-90, 90] and longitudes outside [-180, 180].
    pub fn with_range_check(mut self, enabled: bool) -> Self {
        self.check_range = enabled;
        self
    }

    pub fn validate(&self, payload: &Map<String, Value>) -> Result<LocationFix, ValidationError> {
        // Presence first, so the reported field only depends on which keys exist
        for field in REQUIRED_FIELDS {
            if payload.get(field).map_or(true, Value::is_null) {
                return Err(ValidationError::MissingField(field));
            }
        }

        let fix_type = text(payload, FIELD_TYPE)?;
        let observed_at = text(payload, FIELD_WHEN)?;
        let latitude = coordinate(payload, FIELD_LAT)?;
        let longitude = coordinate(payload, FIELD_LON)?;

        if self.check_range {
            check_range(FIELD_LAT, latitude, 90.0)?;
            check_range(FIELD_LON, longitude, 180.0)?;
        }

        Ok(LocationFix {
            fix_type,
            observed_at,
            latitude,
            longitude,
        })
    }
}

fn text(payload: &Map<String, Value>, field: &'static str) -> Result<String, ValidationError> {
    match payload.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(Value::Null) | None => Err(ValidationError::MissingField(field)),
        Some(_) => Err(ValidationError::InvalidField(field)),
    }
}

fn coordinate(payload: &Map<String, Value>, field: &'static str) -> Result<f64, ValidationError> {
    let value = match payload.get(field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Null) | None => return Err(ValidationError::MissingField(field)),
        Some(_) => None,
    };
    value
        .filter(|v| v.is_finite())
        .ok_or(ValidationError::InvalidField(field))
}

fn check_range(field: &'static str, value: f64, limit: f64) -> Result<(), ValidationError> {
    if value.abs() > limit {
        return Err(ValidationError::OutOfRange { field, value });
    }
    Ok(())
}
