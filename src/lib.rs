//! Client library for the OpenWeatherMap `data/2.5` API.
//!
//! This crate defines:
//! - Process-wide request defaults and their merge semantics
//! - A request engine with asynchronous (callback) and blocking dispatch
//! - Normalization of the two service payload shapes into one record
//! - A transport abstraction over the actual HTTP stack
//!
//! A minimal round-trip:
//!
//! ```no_run
//! use openweather_lib::{ConfigUpdate, WeatherClient};
//!
//! let mut client = WeatherClient::new();
//! client.configure(ConfigUpdate {
//!     api_key: Some("your_key".to_string()),
//!     ..ConfigUpdate::default()
//! });
//!
//! let weather = client.current_by_city_blocking("London")?;
//! println!("{} {:?}", weather.location, weather.temperature);
//! # Ok::<(), openweather_lib::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod request;
pub mod response;
pub mod transport;

pub use config::{Config, ConfigUpdate, Units};
pub use error::Error;
pub use model::{Forecast, Temperature, Weather, Wind};
pub use request::{Callbacks, Mode, QueryParams, WeatherClient, DEFAULT_BASE_URL};
pub use response::{normalize, RawResponse};
pub use transport::{HttpTransport, Transport, TransportError, TransportReply};
