//! Reverse geocoding: coordinate -> place-name query.
//!
//! [`GeoResolver`] holds the joining/encoding rules and delegates the actual
//! lookup to a [`ReverseGeocoder`]. The default backend is Nominatim
//! (OpenStreetMap), which needs no API key.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{fmt::Debug, sync::Arc};

use crate::{
    error::{BoxError, GeoError},
    model::{Coordinate, PlaceQuery, Placemark},
};

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/reverse";
pub const DEFAULT_USER_AGENT: &str = concat!("geoweather/", env!("CARGO_PKG_VERSION"));

/// Something that can look up the place at a coordinate.
///
/// Yields at most one placemark; `Ok(None)` means the backend answered but
/// knew nothing about the location.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync + Debug {
    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<Option<Placemark>, BoxError>;
}

#[derive(Debug, Clone)]
pub struct GeoResolver {
    geocoder: Arc<dyn ReverseGeocoder>,
}

impl GeoResolver {
    pub fn new(geocoder: Arc<dyn ReverseGeocoder>) -> Self {
        Self { geocoder }
    }

    /// Resolve `coordinate` to a percent-encoded `locality,country` query.
    pub async fn resolve(&self, coordinate: Coordinate) -> Result<PlaceQuery, GeoError> {
        let placemark = self
            .geocoder
            .reverse_geocode(coordinate)
            .await
            .map_err(GeoError::Underlying)?
            .ok_or(GeoError::PlacemarkNotFound)?;

        let query = PlaceQuery::from_placemark(&placemark).ok_or(GeoError::PlacemarkNotFound)?;
        tracing::info!(%coordinate, place = %query, "Reverse geocoded coordinate");
        Ok(query)
    }
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    country: Option<String>,
}

impl From<NominatimAddress> for Placemark {
    fn from(addr: NominatimAddress) -> Self {
        Placemark {
            locality: addr.city.or(addr.town).or(addr.village).or(addr.municipality),
            country: addr.country,
        }
    }
}

/// Reverse geocoder backed by the Nominatim `/reverse` endpoint.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    base_url: String,
    http: Client,
}

impl NominatimGeocoder {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_base_url(DEFAULT_NOMINATIM_URL, DEFAULT_USER_AGENT)
    }

    pub fn with_base_url(base_url: impl Into<String>, user_agent: &str) -> Result<Self, reqwest::Error> {
        // Nominatim's usage policy rejects requests without an identifying agent.
        let http = Client::builder().user_agent(user_agent).build()?;
        Ok(Self { base_url: base_url.into(), http })
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<Option<Placemark>, BoxError> {
        let lat = coordinate.latitude.to_string();
        let lon = coordinate.longitude.to_string();

        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("format", "jsonv2"),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("zoom", "10"),
                ("addressdetails", "1"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: NominatimResponse = res.json().await?;

        // Unknown locations come back as `{"error": "Unable to geocode"}`.
        let placemark = body.address.map(Placemark::from);
        if placemark.is_none() {
            tracing::debug!(%coordinate, "Nominatim returned no address");
        }
        Ok(placemark)
    }
}
