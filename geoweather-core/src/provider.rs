use crate::{
    Config, QuerySelector, WeatherError, WeatherInfo, provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// Turns a place-or-coordinate selector into current weather with a single request.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch(&self, selector: &QuerySelector) -> Result<WeatherInfo, WeatherError>;
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<OpenWeatherProvider> {
    let api_key = config.resolved_api_key()?;

    let mut provider = OpenWeatherProvider::new(api_key);
    if let Some(base_url) = &config.base_url {
        provider = provider.with_base_url(base_url.clone());
    }
    if let Some(units) = &config.units {
        provider = provider.with_units(units.clone());
    }

    Ok(provider)
}
