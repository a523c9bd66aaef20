//! The public entry point: coordinate in, weather out.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::task::JoinHandle;

use crate::{
    config::Config,
    error::WeatherError,
    geocode::{DEFAULT_NOMINATIM_URL, DEFAULT_USER_AGENT, GeoResolver, NominatimGeocoder, ReverseGeocoder},
    model::{Coordinate, QuerySelector, WeatherInfo},
    provider::{WeatherProvider, provider_from_config},
};

pub type WeatherResult = Result<WeatherInfo, WeatherError>;

/// Resolves current weather for a coordinate.
///
/// With `prefer_area_name` set (the default) the coordinate is first reverse
/// geocoded and the weather is requested by place name; any geocoding failure
/// silently falls back to a `lat`/`lon` request. Weather errors are returned
/// unchanged.
///
/// The in-progress flag is advisory. Calls are never rejected or queued, so
/// concurrent requests on one service run independently and the flag only
/// reflects whichever of them last started or finished.
#[derive(Debug, Clone)]
pub struct WeatherService {
    resolver: GeoResolver,
    provider: Arc<dyn WeatherProvider>,
    prefer_area_name: bool,
    in_progress: Arc<AtomicBool>,
}

impl WeatherService {
    pub fn new(geocoder: Arc<dyn ReverseGeocoder>, provider: Arc<dyn WeatherProvider>) -> Self {
        Self {
            resolver: GeoResolver::new(geocoder),
            provider,
            prefer_area_name: true,
            in_progress: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Nominatim + OpenWeather, wired from the on-disk configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let geocoder = NominatimGeocoder::with_base_url(
            config.geocoder.base_url.as_deref().unwrap_or(DEFAULT_NOMINATIM_URL),
            config.geocoder.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT),
        )?;
        let provider = provider_from_config(config)?;

        Ok(Self::new(Arc::new(geocoder), Arc::new(provider))
            .with_prefer_area_name(config.prefer_area_name))
    }

    pub fn with_prefer_area_name(mut self, prefer: bool) -> Self {
        self.prefer_area_name = prefer;
        self
    }

    pub fn set_prefer_area_name(&mut self, prefer: bool) {
        self.prefer_area_name = prefer;
    }

    pub fn prefer_area_name(&self) -> bool {
        self.prefer_area_name
    }

    pub fn is_request_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    pub async fn get_weather(&self, coordinate: Coordinate) -> WeatherResult {
        let _guard = RequestGuard::start(&self.in_progress);

        let selector = self.select_query(coordinate).await;
        tracing::debug!(query = %selector.query_component(), "Fetching weather");

        self.provider.fetch(&selector).await
    }

    /// Callback flavour of [`WeatherService::get_weather`].
    ///
    /// Runs the request on the current tokio runtime and hands the result to
    /// `completion` exactly once.
    pub fn get_weather_with<F>(&self, coordinate: Coordinate, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(WeatherResult) + Send + 'static,
    {
        let service = self.clone();
        tokio::spawn(async move {
            let result = service.get_weather(coordinate).await;
            completion(result);
        })
    }

    async fn select_query(&self, coordinate: Coordinate) -> QuerySelector {
        if !self.prefer_area_name {
            return QuerySelector::Coordinate(coordinate);
        }

        match self.resolver.resolve(coordinate).await {
            Ok(place) => QuerySelector::Place(place),
            Err(err) => {
                // Connectivity problems during geocoding are masked here too.
                tracing::warn!(%coordinate, error = %err, "Falling back to coordinate query");
                QuerySelector::Coordinate(coordinate)
            }
        }
    }
}

/// Holds the in-progress flag up for the lifetime of one request.
struct RequestGuard<'a>(&'a AtomicBool);

impl<'a> RequestGuard<'a> {
    fn start(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::BoxError, model::Placemark};
    use async_trait::async_trait;
    use std::sync::{Mutex, atomic::AtomicUsize};
    use tokio::sync::{Notify, oneshot};

    const NYC: Coordinate = Coordinate::new(40.7128, -74.0060);

    #[derive(Debug, Default)]
    struct CountingGeocoder {
        placemark: Option<Placemark>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl CountingGeocoder {
        fn found(locality: &str, country: &str) -> Arc<Self> {
            Arc::new(Self {
                placemark: Some(Placemark {
                    locality: Some(locality.into()),
                    country: Some(country.into()),
                }),
                ..Self::default()
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { fail: true, ..Self::default() })
        }
    }

    #[async_trait]
    impl ReverseGeocoder for CountingGeocoder {
        async fn reverse_geocode(&self, _: Coordinate) -> Result<Option<Placemark>, BoxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err("geocoder offline".into());
            }
            Ok(self.placemark.clone())
        }
    }

    #[derive(Debug)]
    enum Reply {
        Named(&'static str),
        Server(&'static str),
        Invalid,
    }

    #[derive(Debug)]
    struct RecordingProvider {
        reply: Reply,
        seen: Mutex<Vec<String>>,
    }

    impl RecordingProvider {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self { reply, seen: Mutex::new(Vec::new()) })
        }

        fn queries(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WeatherProvider for RecordingProvider {
        async fn fetch(&self, selector: &QuerySelector) -> WeatherResult {
            self.seen.lock().unwrap().push(selector.query_component());
            match self.reply {
                Reply::Named(name) => Ok(WeatherInfo {
                    location_name: Some(name.into()),
                    ..WeatherInfo::default()
                }),
                Reply::Server(msg) => Err(WeatherError::ServerError(msg.into())),
                Reply::Invalid => Err(WeatherError::InvalidJson),
            }
        }
    }

    #[tokio::test]
    async fn uses_place_name_when_geocoding_succeeds() {
        let geocoder = CountingGeocoder::found("New York", "United States");
        let provider = RecordingProvider::new(Reply::Named("New York"));
        let service = WeatherService::new(geocoder.clone(), provider.clone());

        let info = service.get_weather(NYC).await.expect("weather must resolve");

        assert_eq!(info.location_name.as_deref(), Some("New York"));
        assert_eq!(provider.queries(), vec!["q=New%20York%2CUnited%20States"]);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn skips_geocoder_when_area_name_not_preferred() {
        let geocoder = CountingGeocoder::found("New York", "United States");
        let provider = RecordingProvider::new(Reply::Named("New York"));
        let service =
            WeatherService::new(geocoder.clone(), provider.clone()).with_prefer_area_name(false);

        service.get_weather(NYC).await.unwrap();

        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(provider.queries(), vec!["lat=40.7128&lon=-74.006"]);
    }

    #[tokio::test]
    async fn geocoder_failure_falls_back_to_coordinates() {
        let provider = RecordingProvider::new(Reply::Named("Somewhere"));
        let service = WeatherService::new(CountingGeocoder::failing(), provider.clone());

        let info = service.get_weather(NYC).await.expect("fallback must succeed");

        assert_eq!(info.location_name.as_deref(), Some("Somewhere"));
        assert_eq!(provider.queries(), vec!["lat=40.7128&lon=-74.006"]);
    }

    #[tokio::test]
    async fn missing_placemark_falls_back_to_coordinates() {
        let provider = RecordingProvider::new(Reply::Named("Somewhere"));
        let service = WeatherService::new(Arc::new(CountingGeocoder::default()), provider.clone());

        service.get_weather(NYC).await.unwrap();

        assert_eq!(provider.queries(), vec!["lat=40.7128&lon=-74.006"]);
    }

    #[tokio::test]
    async fn weather_errors_are_forwarded_unchanged() {
        for prefer in [true, false] {
            let provider = RecordingProvider::new(Reply::Server("Invalid API key"));
            let geocoder = CountingGeocoder::found("New York", "United States");
            let service = WeatherService::new(geocoder, provider).with_prefer_area_name(prefer);

            match service.get_weather(NYC).await {
                Err(WeatherError::ServerError(msg)) => assert_eq!(msg, "Invalid API key"),
                other => panic!("unexpected result: {other:?}"),
            }
            assert!(!service.is_request_in_progress());
        }
    }

    #[tokio::test]
    async fn sequential_calls_issue_identical_requests() {
        let provider = RecordingProvider::new(Reply::Named("New York"));
        let service =
            WeatherService::new(CountingGeocoder::found("New York", "United States"), provider.clone());

        service.get_weather(NYC).await.unwrap();
        service.get_weather(NYC).await.unwrap();

        let queries = provider.queries();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0], queries[1]);
    }

    #[tokio::test]
    async fn completion_is_called_once_with_result() {
        let provider = RecordingProvider::new(Reply::Invalid);
        let service = WeatherService::new(CountingGeocoder::failing(), provider);
        let (tx, rx) = oneshot::channel();

        service
            .get_weather_with(NYC, move |result| {
                let _ = tx.send(result);
            })
            .await
            .unwrap();

        assert!(matches!(rx.await.unwrap(), Err(WeatherError::InvalidJson)));
    }

    #[derive(Debug)]
    struct GatedProvider {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl WeatherProvider for GatedProvider {
        async fn fetch(&self, _: &QuerySelector) -> WeatherResult {
            self.gate.notified().await;
            Ok(WeatherInfo::default())
        }
    }

    #[tokio::test]
    async fn flag_is_raised_while_request_runs() {
        let gate = Arc::new(Notify::new());
        let service = WeatherService::new(
            Arc::new(CountingGeocoder::default()),
            Arc::new(GatedProvider { gate: gate.clone() }),
        );
        assert!(!service.is_request_in_progress());

        let task = tokio::spawn({
            let service = service.clone();
            async move { service.get_weather(NYC).await }
        });
        while !service.is_request_in_progress() {
            tokio::task::yield_now().await;
        }

        gate.notify_one();
        task.await.unwrap().unwrap();
        assert!(!service.is_request_in_progress());
    }

    #[tokio::test]
    async fn concurrent_calls_are_not_rejected() {
        let provider = RecordingProvider::new(Reply::Named("New York"));
        let service = WeatherService::new(
            CountingGeocoder::found("New York", "United States"),
            provider.clone(),
        );

        let (a, b) = tokio::join!(service.get_weather(NYC), service.get_weather(NYC));

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(provider.queries().len(), 2);
    }
}
