//! The request engine: query construction, dispatch, and completion.
//!
//! [`WeatherClient`] owns the process configuration and the transport. A
//! request builds its URL from the caller's parameters plus a snapshot of
//! the configuration, then either spawns the round-trip onto the ambient
//! tokio runtime (asynchronous mode, completion delivered later through
//! [`Callbacks`]) or drives the transport's blocking path on the calling
//! thread (synchronous mode, callbacks invoked before `request` returns).

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde_json::Value;

use crate::config::{Config, ConfigUpdate};
use crate::error::Error;
use crate::model::Weather;
use crate::response::{self, normalize};
use crate::transport::{HttpTransport, Transport, TransportError, TransportReply};

/// Production endpoint family.
pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Dispatch mode for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Fire-and-forget: control returns immediately, completion arrives on
    /// the tokio runtime. The configured timeout applies.
    #[default]
    Async,
    /// The calling thread blocks until the transport completes or errors.
    /// No timeout applies.
    Blocking,
}

/// Caller-supplied query parameters, preserved in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one parameter, builder style. Values are any scalar with a
    /// string form (city names, coordinates, counts).
    #[must_use]
    pub fn pair(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) {
        self.pairs.push((key.into(), value.to_string()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

pub type SuccessFn<S> = Box<dyn FnOnce(Value, S) + Send>;
pub type FailureFn<F> = Box<dyn FnOnce(Error, F) + Send>;

/// Completion handlers for one request, each paired with an opaque context
/// value forwarded verbatim to it.
///
/// Both handlers are optional and default to no-ops; the contexts let
/// callers correlate completions without capturing state in the closures.
pub struct Callbacks<S = (), F = ()> {
    on_success: Option<SuccessFn<S>>,
    success_context: S,
    on_failure: Option<FailureFn<F>>,
    failure_context: F,
}

impl Callbacks {
    /// No handlers at all; completions are dropped.
    pub fn none() -> Self {
        Self {
            on_success: None,
            success_context: (),
            on_failure: None,
            failure_context: (),
        }
    }
}

impl<S> Callbacks<S, ()> {
    /// Success handler only; failures become no-ops.
    pub fn success(
        on_success: impl FnOnce(Value, S) + Send + 'static,
        success_context: S,
    ) -> Self {
        Self {
            on_success: Some(Box::new(on_success)),
            success_context,
            on_failure: None,
            failure_context: (),
        }
    }
}

impl<F> Callbacks<(), F> {
    /// Failure handler only; successes become no-ops.
    pub fn failure(
        on_failure: impl FnOnce(Error, F) + Send + 'static,
        failure_context: F,
    ) -> Self {
        Self {
            on_success: None,
            success_context: (),
            on_failure: Some(Box::new(on_failure)),
            failure_context,
        }
    }
}

impl<S, F> Callbacks<S, F> {
    pub fn new(
        on_success: impl FnOnce(Value, S) + Send + 'static,
        success_context: S,
        on_failure: impl FnOnce(Error, F) + Send + 'static,
        failure_context: F,
    ) -> Self {
        Self {
            on_success: Some(Box::new(on_success)),
            success_context,
            on_failure: Some(Box::new(on_failure)),
            failure_context,
        }
    }

    fn succeed(self, payload: Value) {
        if let Some(on_success) = self.on_success {
            on_success(payload, self.success_context);
        }
    }

    fn fail(self, error: Error) {
        if let Some(on_failure) = self.on_failure {
            on_failure(error, self.failure_context);
        }
    }
}

/// Client for the OpenWeatherMap `data/2.5` API family.
///
/// Holds the mutable request defaults (see [`Config`]) and the transport.
/// Configuration changes apply to subsequent calls only; a request in
/// flight keeps the URL and timeout it was built with.
#[derive(Debug)]
pub struct WeatherClient {
    config: Config,
    base_url: String,
    transport: Arc<dyn Transport>,
}

impl Default for WeatherClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherClient {
    /// Client over the default HTTP transport, pointed at the production
    /// endpoints, with default configuration.
    pub fn new() -> Self {
        Self::with_transport(HttpTransport::new())
    }

    /// Client over a caller-supplied transport.
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            config: Config::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            transport: Arc::new(transport),
        }
    }

    /// Point the client at a different host, e.g. a proxy or test server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Merge a partial configuration update; see [`Config::apply`].
    pub fn configure(&mut self, update: ConfigUpdate) {
        self.config.apply(update);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Issue one GET request against `path`.
    ///
    /// The query string carries every caller parameter in insertion order,
    /// followed by `units`, `lang`, and `APPID` from the configuration, in
    /// that fixed order, all values percent-escaped.
    ///
    /// Completion is delivered through `callbacks`: the success handler
    /// receives the parsed body once it cleared both the HTTP status and
    /// the application-level `cod` check; every other outcome (connection
    /// failure, timeout, non-success HTTP status, failing or missing `cod`,
    /// unparseable body) goes to the failure handler as an [`Error`].
    ///
    /// An `Err` return means the request was never dispatched: the URL did
    /// not parse, or asynchronous mode was requested outside a tokio
    /// runtime.
    pub fn request<S, F>(
        &self,
        path: &str,
        params: &QueryParams,
        callbacks: Callbacks<S, F>,
        mode: Mode,
    ) -> Result<(), Error>
    where
        S: Send + 'static,
        F: Send + 'static,
    {
        let url = self.build_url(path, params)?;
        log::debug!("GET {path} ({mode:?}, {} caller params)", params.len());

        match mode {
            Mode::Async => {
                let handle =
                    tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;
                let transport = Arc::clone(&self.transport);
                let timeout = Duration::from_millis(self.config.timeout_ms);

                handle.spawn(async move {
                    let outcome = transport.get(url.as_str(), Some(timeout)).await;
                    complete(outcome, callbacks);
                });
            }
            Mode::Blocking => {
                let outcome = self.transport.get_blocking(url.as_str());
                complete(outcome, callbacks);
            }
        }

        Ok(())
    }

    /// Current conditions at a coordinate pair.
    pub fn current_by_coordinates<S, F>(
        &self,
        lat: f64,
        lon: f64,
        callbacks: Callbacks<S, F>,
        mode: Mode,
    ) -> Result<(), Error>
    where
        S: Send + 'static,
        F: Send + 'static,
    {
        let params = QueryParams::new().pair("lat", lat).pair("lon", lon);
        self.request("weather", &params, callbacks, mode)
    }

    /// Current conditions for a named city.
    pub fn current_by_city<S, F>(
        &self,
        city: &str,
        callbacks: Callbacks<S, F>,
        mode: Mode,
    ) -> Result<(), Error>
    where
        S: Send + 'static,
        F: Send + 'static,
    {
        let params = QueryParams::new().pair("q", city);
        self.request("weather", &params, callbacks, mode)
    }

    /// Forecast list at a coordinate pair.
    pub fn forecast_by_coordinates<S, F>(
        &self,
        lat: f64,
        lon: f64,
        callbacks: Callbacks<S, F>,
        mode: Mode,
    ) -> Result<(), Error>
    where
        S: Send + 'static,
        F: Send + 'static,
    {
        let params = QueryParams::new().pair("lat", lat).pair("lon", lon);
        self.request("forecast", &params, callbacks, mode)
    }

    /// Arbitrary endpoint/parameter combination, for resources the fixed
    /// wrappers don't anticipate.
    pub fn custom<S, F>(
        &self,
        path: &str,
        params: &QueryParams,
        callbacks: Callbacks<S, F>,
        mode: Mode,
    ) -> Result<(), Error>
    where
        S: Send + 'static,
        F: Send + 'static,
    {
        self.request(path, params, callbacks, mode)
    }

    /// Blocking fetch of current conditions at a coordinate pair,
    /// normalized. Blocks the calling thread; see [`Mode::Blocking`].
    pub fn current_by_coordinates_blocking(&self, lat: f64, lon: f64) -> Result<Weather, Error> {
        let params = QueryParams::new().pair("lat", lat).pair("lon", lon);
        self.fetch_blocking("weather", &params)
    }

    /// Blocking fetch of current conditions for a named city, normalized.
    pub fn current_by_city_blocking(&self, city: &str) -> Result<Weather, Error> {
        let params = QueryParams::new().pair("q", city);
        self.fetch_blocking("weather", &params)
    }

    /// Blocking fetch of the forecast list at a coordinate pair,
    /// normalized.
    pub fn forecast_by_coordinates_blocking(&self, lat: f64, lon: f64) -> Result<Weather, Error> {
        let params = QueryParams::new().pair("lat", lat).pair("lon", lon);
        self.fetch_blocking("forecast", &params)
    }

    fn fetch_blocking(&self, path: &str, params: &QueryParams) -> Result<Weather, Error> {
        let (tx, rx) = std::sync::mpsc::channel();
        let failure_tx = tx.clone();

        self.request(
            path,
            params,
            Callbacks::new(
                move |payload, _: ()| {
                    let _ = tx.send(Ok(payload));
                },
                (),
                move |error, _: ()| {
                    let _ = failure_tx.send(Err(error));
                },
                (),
            ),
            Mode::Blocking,
        )?;

        // A conforming transport has delivered exactly one completion by
        // now; anything else must not be reported as an empty success.
        let outcome = rx.try_recv().map_err(|_| Error::NoSynchronousCompletion)?;
        outcome.and_then(normalize)
    }

    fn build_url(&self, path: &str, params: &QueryParams) -> Result<Url, Error> {
        let joined = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let mut url = Url::parse(&joined).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params.iter() {
                query.append_pair(key, value);
            }
            query
                .append_pair("units", self.config.units.as_str())
                .append_pair("lang", &self.config.lang)
                .append_pair("APPID", &self.config.api_key);
        }

        Ok(url)
    }
}

/// Interpret one transport outcome and invoke the matching handler.
fn complete<S, F>(outcome: Result<TransportReply, TransportError>, callbacks: Callbacks<S, F>) {
    match outcome {
        Err(e) => {
            let error = Error::from(e);
            log::debug!("transport failure: {error}");
            callbacks.fail(error);
        }
        Ok(reply) => {
            let status = reply.status;
            if !(200..300).contains(&status) {
                log::debug!("completed with HTTP {status}");
                callbacks.fail(Error::Status(status));
                return;
            }

            match serde_json::from_str::<Value>(&reply.body) {
                Err(e) => callbacks.fail(Error::Malformed {
                    status,
                    message: e.to_string(),
                }),
                Ok(payload) => match response::application_status(&payload) {
                    Some(200) => callbacks.succeed(payload),
                    Some(code) => {
                        log::debug!("service reported cod {code}");
                        callbacks.fail(Error::Status(code));
                    }
                    // No application code at all still counts as a failing
                    // body; the HTTP status is what's available.
                    None => callbacks.fail(Error::Status(status)),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Units;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const LONDON_BODY: &str = r#"{
        "cod": 200,
        "name": "London",
        "sys": {"country": "GB"},
        "wind": {"deg": 10, "speed": 5},
        "main": {"humidity": 80, "pressure": 1010, "temp": 15, "temp_max": 17, "temp_min": 13},
        "weather": [{"id": 800, "main": "Clear", "description": "clear sky"}]
    }"#;

    const PARIS_FORECAST_BODY: &str = r#"{
        "cod": "200",
        "city": {"name": "Paris", "country": "FR"},
        "list": [
            {"dt": 1000, "main": {"temp": 10}},
            {"dt": 2000, "main": {"temp": 12}}
        ]
    }"#;

    #[derive(Debug, Default)]
    struct StubTransport {
        status: u16,
        body: String,
        fail_connect: bool,
        seen_urls: Arc<Mutex<Vec<String>>>,
    }

    impl StubTransport {
        fn replying(status: u16, body: &str) -> Self {
            Self {
                status,
                body: body.to_string(),
                ..Self::default()
            }
        }

        fn failing() -> Self {
            Self {
                fail_connect: true,
                ..Self::default()
            }
        }

        fn outcome(&self) -> Result<TransportReply, TransportError> {
            if self.fail_connect {
                Err(TransportError::Connect("stub refused".to_string()))
            } else {
                Ok(TransportReply {
                    status: self.status,
                    body: self.body.clone(),
                })
            }
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn get(
            &self,
            url: &str,
            _timeout: Option<Duration>,
        ) -> Result<TransportReply, TransportError> {
            self.seen_urls.lock().unwrap().push(url.to_string());
            self.outcome()
        }

        fn get_blocking(&self, url: &str) -> Result<TransportReply, TransportError> {
            self.seen_urls.lock().unwrap().push(url.to_string());
            self.outcome()
        }
    }

    fn client_with(stub: StubTransport) -> (WeatherClient, Arc<Mutex<Vec<String>>>) {
        let urls = Arc::clone(&stub.seen_urls);
        (WeatherClient::with_transport(stub), urls)
    }

    #[test]
    fn url_keeps_caller_params_in_insertion_order() {
        let (mut client, _) = client_with(StubTransport::default());
        client.configure(ConfigUpdate {
            api_key: Some("KEY".to_string()),
            ..ConfigUpdate::default()
        });

        let params = QueryParams::new()
            .pair("lat", 37.97)
            .pair("lon", 23.72)
            .pair("cnt", 3);
        let url = client.build_url("forecast", &params).unwrap();

        assert_eq!(
            url.as_str(),
            "https://api.openweathermap.org/data/2.5/forecast\
             ?lat=37.97&lon=23.72&cnt=3&units=metric&lang=en&APPID=KEY"
        );
    }

    #[test]
    fn url_escapes_unsafe_characters() {
        let (client, _) = client_with(StubTransport::default());

        let params = QueryParams::new().pair("q", "São Paulo");
        let url = client.build_url("weather", &params).unwrap();

        assert!(url.as_str().contains("q=S%C3%A3o+Paulo"));
    }

    #[test]
    fn url_tolerates_trailing_slash_in_base() {
        let (client, _) = client_with(StubTransport::default());
        let client = client.with_base_url("http://localhost:8080/api/");

        let url = client.build_url("weather", &QueryParams::new()).unwrap();

        assert!(url.as_str().starts_with("http://localhost:8080/api/weather?"));
    }

    #[tokio::test]
    async fn city_request_reaches_success_with_normalized_fields() {
        let (mut client, urls) = client_with(StubTransport::replying(200, LONDON_BODY));
        client.configure(ConfigUpdate {
            units: Some(Units::Imperial),
            ..ConfigUpdate::default()
        });

        let (tx, rx) = tokio::sync::oneshot::channel();
        let (fail_tx, mut fail_rx) = tokio::sync::oneshot::channel();
        client
            .current_by_city(
                "London",
                Callbacks::new(
                    move |payload, _: ()| {
                        let _ = tx.send(payload);
                    },
                    (),
                    move |error, _: ()| {
                        let _ = fail_tx.send(error);
                    },
                    (),
                ),
                Mode::Async,
            )
            .unwrap();

        let payload = rx.await.expect("success handler must run");
        assert!(fail_rx.try_recv().is_err(), "failure handler must not run");

        let weather = normalize(payload).unwrap();
        assert_eq!(weather.location, "London");
        assert_eq!(weather.country, "GB");
        assert_eq!(weather.temperature.unwrap().current, 15.0);

        let seen = urls.lock().unwrap();
        assert!(seen[0].contains("q=London"));
        assert!(seen[0].contains("units=imperial"));
    }

    #[tokio::test]
    async fn non_success_http_status_reaches_failure() {
        let (client, _) = client_with(StubTransport::replying(500, "oops"));

        let (tx, rx) = tokio::sync::oneshot::channel();
        client
            .current_by_city(
                "London",
                Callbacks::failure(
                    move |error, _: ()| {
                        let _ = tx.send(error);
                    },
                    (),
                ),
                Mode::Async,
            )
            .unwrap();

        let error = rx.await.unwrap();
        assert_eq!(error.status(), Some(500));
    }

    #[tokio::test]
    async fn failing_application_code_reaches_failure() {
        let body = r#"{"cod": "404", "message": "city not found"}"#;
        let (client, _) = client_with(StubTransport::replying(200, body));

        let (tx, rx) = tokio::sync::oneshot::channel();
        client
            .current_by_city(
                "Atlantis",
                Callbacks::failure(
                    move |error, _: ()| {
                        let _ = tx.send(error);
                    },
                    (),
                ),
                Mode::Async,
            )
            .unwrap();

        assert_eq!(rx.await.unwrap().status(), Some(404));
    }

    #[tokio::test]
    async fn unparseable_body_reaches_failure_with_http_status() {
        let (client, _) = client_with(StubTransport::replying(200, "<html>not json</html>"));

        let (tx, rx) = tokio::sync::oneshot::channel();
        client
            .current_by_city(
                "London",
                Callbacks::failure(
                    move |error, _: ()| {
                        let _ = tx.send(error);
                    },
                    (),
                ),
                Mode::Async,
            )
            .unwrap();

        let error = rx.await.unwrap();
        assert!(matches!(error, Error::Malformed { status: 200, .. }));
    }

    #[tokio::test]
    async fn contexts_are_forwarded_verbatim() {
        let (client, _) = client_with(StubTransport::replying(200, LONDON_BODY));

        let (tx, rx) = tokio::sync::oneshot::channel();
        client
            .current_by_coordinates(
                51.5,
                -0.12,
                Callbacks::success(
                    move |_payload, context: &'static str| {
                        let _ = tx.send(context);
                    },
                    "request-42",
                ),
                Mode::Async,
            )
            .unwrap();

        assert_eq!(rx.await.unwrap(), "request-42");
    }

    #[tokio::test]
    async fn connection_failure_reaches_failure() {
        let (client, _) = client_with(StubTransport::failing());

        let (tx, rx) = tokio::sync::oneshot::channel();
        client
            .current_by_coordinates(
                51.5,
                -0.12,
                Callbacks::failure(
                    move |error, _: ()| {
                        let _ = tx.send(error);
                    },
                    (),
                ),
                Mode::Async,
            )
            .unwrap();

        let error = rx.await.unwrap();
        assert!(matches!(
            error,
            Error::Transport(TransportError::Connect(_))
        ));
        assert_eq!(error.status(), None);
    }

    #[test]
    fn async_mode_outside_a_runtime_fails_fast() {
        let (client, _) = client_with(StubTransport::replying(200, LONDON_BODY));

        let err = client
            .current_by_city("London", Callbacks::none(), Mode::Async)
            .unwrap_err();

        assert!(matches!(err, Error::NoRuntime));
    }

    #[test]
    fn blocking_city_fetch_returns_normalized_weather() {
        let (client, urls) = client_with(StubTransport::replying(200, LONDON_BODY));

        let weather = client.current_by_city_blocking("London").unwrap();

        assert_eq!(weather.location, "London");
        assert_eq!(weather.country, "GB");
        assert_eq!(weather.humidity, Some(80.0));
        assert!(weather.forecasts.is_empty());
        assert!(urls.lock().unwrap()[0].contains("q=London"));
    }

    #[test]
    fn blocking_forecast_fetch_projects_all_entries() {
        let (client, _) = client_with(StubTransport::replying(200, PARIS_FORECAST_BODY));

        let weather = client.forecast_by_coordinates_blocking(48.85, 2.35).unwrap();

        assert_eq!(weather.location, "Paris");
        assert_eq!(weather.country, "FR");
        assert_eq!(weather.forecasts.len(), 2);
        assert_eq!(weather.forecasts[0].timestamp.timestamp(), 1000);
        assert_eq!(weather.forecasts[0].temperature, 10.0);
        assert_eq!(weather.forecasts[1].timestamp.timestamp(), 2000);
        assert_eq!(weather.forecasts[1].temperature, 12.0);
        assert!(weather.temperature.is_none());
    }

    #[test]
    fn blocking_fetch_surfaces_application_failure_as_error() {
        let body = r#"{"cod": "404", "message": "city not found"}"#;
        let (client, _) = client_with(StubTransport::replying(200, body));

        let err = client.current_by_city_blocking("Atlantis").unwrap_err();

        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn blocking_fetch_surfaces_unsupported_transport() {
        #[derive(Debug)]
        struct AsyncOnly;

        #[async_trait]
        impl Transport for AsyncOnly {
            async fn get(
                &self,
                _url: &str,
                _timeout: Option<Duration>,
            ) -> Result<TransportReply, TransportError> {
                Ok(TransportReply {
                    status: 200,
                    body: String::new(),
                })
            }

            fn get_blocking(&self, _url: &str) -> Result<TransportReply, TransportError> {
                Err(TransportError::BlockingUnsupported("async-only stub".to_string()))
            }
        }

        let client = WeatherClient::with_transport(AsyncOnly);
        let err = client.current_by_city_blocking("London").unwrap_err();

        assert!(matches!(
            err,
            Error::Transport(TransportError::BlockingUnsupported(_))
        ));
    }

    #[test]
    fn configure_applies_to_subsequent_requests_only() {
        let (mut client, urls) = client_with(StubTransport::replying(200, LONDON_BODY));

        let _ = client.current_by_city_blocking("London");
        client.configure(ConfigUpdate {
            lang: Some("el".to_string()),
            ..ConfigUpdate::default()
        });
        let _ = client.current_by_city_blocking("London");

        let seen = urls.lock().unwrap();
        assert!(seen[0].contains("lang=en"));
        assert!(seen[1].contains("lang=el"));
    }
}
