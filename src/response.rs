//! Raw service payloads and their projection onto [`Weather`].
//!
//! The service answers with one of two shapes: a single current-conditions
//! observation, or a forecast carrying a `list` of per-timestamp entries.
//! Presence of `list` is the sole discriminator, so decoding goes through
//! an untagged union that tries the forecast shape first.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::Error;
use crate::model::{Forecast, Temperature, Weather, Wind};

/// A service payload classified by shape at the deserialization boundary.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawResponse {
    ForecastList(RawForecastList),
    Observation(RawObservation),
}

/// Current-conditions payload from the `weather` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RawObservation {
    pub name: String,
    pub sys: RawSys,
    pub wind: RawWind,
    pub main: RawMain,
    pub weather: Vec<RawCondition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSys {
    pub country: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawWind {
    pub deg: f64,
    pub speed: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMain {
    pub humidity: f64,
    pub pressure: f64,
    pub temp: f64,
    pub temp_max: f64,
    pub temp_min: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCondition {
    pub id: i64,
    pub main: String,
    pub description: String,
}

/// Multi-entry payload from the `forecast` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RawForecastList {
    pub city: RawCity,
    pub list: Vec<RawForecastEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCity {
    pub name: String,
    pub country: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawForecastEntry {
    pub dt: i64,
    pub main: RawEntryMain,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEntryMain {
    pub temp: f64,
}

impl From<RawResponse> for Weather {
    fn from(raw: RawResponse) -> Self {
        match raw {
            RawResponse::Observation(obs) => {
                // The first condition entry is authoritative; later entries
                // are dropped, matching upstream convention.
                let condition = obs.weather.into_iter().next();

                Weather {
                    location: obs.name,
                    country: obs.sys.country,
                    wind: Some(Wind {
                        deg: obs.wind.deg,
                        speed: obs.wind.speed,
                    }),
                    humidity: Some(obs.main.humidity),
                    pressure: Some(obs.main.pressure),
                    temperature: Some(Temperature {
                        current: obs.main.temp,
                        max: obs.main.temp_max,
                        min: obs.main.temp_min,
                    }),
                    condition_code: condition.as_ref().map(|c| c.id),
                    short_desc: condition.as_ref().map(|c| c.main.clone()),
                    long_desc: condition.map(|c| c.description),
                    forecasts: Vec::new(),
                }
            }
            RawResponse::ForecastList(fc) => Weather {
                location: fc.city.name,
                country: fc.city.country,
                wind: None,
                humidity: None,
                pressure: None,
                temperature: None,
                condition_code: None,
                short_desc: None,
                long_desc: None,
                forecasts: fc
                    .list
                    .into_iter()
                    .map(|entry| Forecast {
                        timestamp: unix_to_utc(entry.dt),
                        temperature: entry.main.temp,
                    })
                    .collect(),
            },
        }
    }
}

/// Decode `payload` into a [`Weather`] record.
///
/// Pure projection with no side effects. The only failure is a payload
/// matching neither known shape; callers are expected to pass only bodies
/// that already cleared the application-level success check.
pub fn normalize(payload: Value) -> Result<Weather, Error> {
    let raw: RawResponse =
        serde_json::from_value(payload).map_err(|e| Error::Shape(e.to_string()))?;
    Ok(Weather::from(raw))
}

/// Application-level status embedded in response bodies.
///
/// The service sends `cod` as a number on the observation endpoint and as a
/// string on the forecast endpoint; both forms are accepted.
pub(crate) fn application_status(payload: &Value) -> Option<u16> {
    match payload.get("cod") {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

fn unix_to_utc(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_default()
}
