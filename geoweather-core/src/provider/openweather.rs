use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::{
    error::WeatherError,
    model::{QuerySelector, WeatherInfo},
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Current-weather client for the OpenWeather `/data/2.5/weather` endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    units: Option<String>,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            units: None,
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Unit system passed as `units=`; without one the API answers in Kelvin.
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    /// Build the request URL by hand: a place query is already percent-encoded
    /// and must not be encoded a second time.
    pub fn request_url(&self, selector: &QuerySelector) -> String {
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        let mut url = format!(
            "{}{}{}&appid={}",
            self.base_url,
            separator,
            selector.query_component(),
            self.api_key
        );

        if let Some(units) = &self.units {
            url.push_str("&units=");
            url.push_str(&urlencoding::encode(units));
        }

        url
    }

    fn redact(&self, url: &str) -> String {
        if self.api_key.is_empty() {
            return url.to_string();
        }
        url.replace(self.api_key.as_str(), "<redacted>")
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch(&self, selector: &QuerySelector) -> Result<WeatherInfo, WeatherError> {
        let url = self.request_url(selector);
        tracing::debug!(url = %self.redact(&url), "Requesting current weather");

        let res = self.http.get(&url).send().await?;

        // Status is not checked: API failures carry a `message` field in the body.
        let status = res.status();
        let body: Value = res.json().await?;
        tracing::debug!(%status, "OpenWeather responded");

        classify_response(body)
    }
}

/// Interpret a decoded response body.
///
/// A top-level string `message` wins over everything else in the object.
pub fn classify_response(body: Value) -> Result<WeatherInfo, WeatherError> {
    let Value::Object(json) = body else {
        return Err(WeatherError::InvalidJson);
    };

    if let Some(message) = json.get("message").and_then(Value::as_str) {
        return Err(WeatherError::ServerError(message.to_string()));
    }

    Ok(WeatherInfo::from_json(&json))
}
