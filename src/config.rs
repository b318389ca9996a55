use serde::{Deserialize, Serialize};

/// Measurement system sent to the service as the `units` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Kelvin, the service's native scale.
    Internal,
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Internal => "internal",
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request defaults shared by every call made through one [`crate::WeatherClient`].
///
/// Created with built-in defaults and mutated only through
/// [`Config::apply`]. Values are not range-checked: a zero `timeout_ms` is
/// stored as-is and handed to the transport unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// API key appended to every query as `APPID`. Empty until configured;
    /// the library checks nothing beyond that the field exists.
    pub api_key: String,

    /// Measurement system, `units` query parameter.
    pub units: Units,

    /// Response language, `lang` query parameter (ISO-639-ish code).
    pub lang: String,

    /// Deadline for asynchronous requests, in milliseconds. Blocking
    /// requests ignore it.
    pub timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            units: Units::Metric,
            lang: "en".to_string(),
            timeout_ms: 15_000,
        }
    }
}

/// Partial configuration update.
///
/// Every field is optional; [`Config::apply`] overwrites only the fields
/// that are `Some` and leaves the rest at their previous value.
///
/// Example:
/// ```
/// use openweather_lib::{Config, ConfigUpdate, Units};
///
/// let mut config = Config::default();
/// config.apply(ConfigUpdate {
///     units: Some(Units::Imperial),
///     ..ConfigUpdate::default()
/// });
/// assert_eq!(config.units, Units::Imperial);
/// assert_eq!(config.lang, "en");
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigUpdate {
    pub api_key: Option<String>,
    pub units: Option<Units>,
    pub lang: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl Config {
    /// Merge `update` into `self`, field by field.
    pub fn apply(&mut self, update: ConfigUpdate) {
        if let Some(api_key) = update.api_key {
            self.api_key = api_key;
        }
        if let Some(units) = update.units {
            self.units = units;
        }
        if let Some(lang) = update.lang {
            self.lang = lang;
        }
        if let Some(timeout_ms) = update.timeout_ms {
            self.timeout_ms = timeout_ms;
        }
    }
}
