use thiserror::Error;

/// Boxed error forwarded unchanged from a reverse-geocoding backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures while turning a coordinate into a place name.
///
/// Never reaches callers of [`crate::WeatherService`]; any of these makes the
/// service fall back to a coordinate query.
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("Place not found.")]
    PlacemarkNotFound,

    #[error("Reverse geocoding failed: {0}")]
    Underlying(#[source] BoxError),
}

/// Failures while fetching or interpreting the weather API response.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Invalid json received from server.")]
    InvalidJson,

    /// Message reported by the API, kept verbatim.
    #[error("{0}")]
    ServerError(String),

    #[error("Weather request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl WeatherError {
    /// Text suitable for showing to an end user: the server's own message
    /// when there is one, a generic sentence otherwise.
    pub fn user_message(&self) -> String {
        match self {
            WeatherError::ServerError(message) => message.clone(),
            WeatherError::InvalidJson => self.to_string(),
            WeatherError::Transport(_) => {
                "Could not load weather information. Please try again later.".to_string()
            }
        }
    }
}
