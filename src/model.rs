use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wind reading from a current-conditions observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    /// Direction in meteorological degrees.
    pub deg: f64,
    pub speed: f64,
}

/// Temperature reading, in the configured measurement system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub current: f64,
    pub max: f64,
    pub min: f64,
}

/// One projected entry of a forecast response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
}

/// Unified weather record produced by normalizing either service payload
/// shape.
///
/// An observation fills the scalar fields and leaves `forecasts` empty; a
/// forecast fills `location`, `country`, and `forecasts` and leaves the
/// scalar fields `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub location: String,
    pub country: String,
    pub wind: Option<Wind>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub temperature: Option<Temperature>,
    /// Service condition code, e.g. 800 for clear sky.
    pub condition_code: Option<i64>,
    pub short_desc: Option<String>,
    pub long_desc: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forecasts: Vec<Forecast>,
}
