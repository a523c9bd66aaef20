use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A geographic point supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// A single reverse-geocoding result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placemark {
    pub locality: Option<String>,
    pub country: Option<String>,
}

/// Percent-encoded `"<locality>,<country>"` ready to be placed after `q=`.
///
/// Never empty: the only way to build one is [`PlaceQuery::from_placemark`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceQuery(String);

impl PlaceQuery {
    /// Joins whichever of locality and country are present with a comma and
    /// percent-encodes the result. Returns `None` if neither is usable.
    pub fn from_placemark(placemark: &Placemark) -> Option<Self> {
        let parts: Vec<&str> = [placemark.locality.as_deref(), placemark.country.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        if parts.is_empty() {
            return None;
        }

        Some(Self(urlencoding::encode(&parts.join(",")).into_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decides which form the outbound weather request takes.
#[derive(Debug, Clone, PartialEq)]
pub enum QuerySelector {
    Place(PlaceQuery),
    Coordinate(Coordinate),
}

impl QuerySelector {
    /// The part of the query string that identifies the location,
    /// e.g. `q=New%20York%2CUnited%20States` or `lat=40.7128&lon=-74.006`.
    pub fn query_component(&self) -> String {
        match self {
            QuerySelector::Place(place) => format!("q={place}"),
            QuerySelector::Coordinate(c) => format!("lat={}&lon={}", c.latitude, c.longitude),
        }
    }
}

/// Current conditions as reported by the weather API.
///
/// Every field is optional; whatever the response carried is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherInfo {
    pub location_name: Option<String>,
    pub country: Option<String>,
    pub coordinate: Option<Coordinate>,
    pub temperature: Option<f64>,
    pub feels_like: Option<f64>,
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
    pub condition: Option<String>,
    pub description: Option<String>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub cloudiness: Option<f64>,
    pub visibility: Option<f64>,
    pub observation_time: Option<DateTime<Utc>>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
}

impl WeatherInfo {
    pub fn from_json(json: &Map<String, Value>) -> Self {
        let main = json.get("main");
        let wind = json.get("wind");
        let sys = json.get("sys");
        let weather = json
            .get("weather")
            .and_then(Value::as_array)
            .and_then(|list| list.first());

        let coordinate = json.get("coord").and_then(|c| {
            Some(Coordinate::new(number(c, "lat")?, number(c, "lon")?))
        });

        Self {
            location_name: json.get("name").and_then(Value::as_str).map(str::to_owned),
            country: sys.and_then(|s| text(s, "country")),
            coordinate,
            temperature: main.and_then(|m| number(m, "temp")),
            feels_like: main.and_then(|m| number(m, "feels_like")),
            temp_min: main.and_then(|m| number(m, "temp_min")),
            temp_max: main.and_then(|m| number(m, "temp_max")),
            pressure: main.and_then(|m| number(m, "pressure")),
            humidity: main.and_then(|m| number(m, "humidity")),
            condition: weather.and_then(|w| text(w, "main")),
            description: weather.and_then(|w| text(w, "description")),
            wind_speed: wind.and_then(|w| number(w, "speed")),
            wind_direction: wind.and_then(|w| number(w, "deg")),
            cloudiness: json.get("clouds").and_then(|c| number(c, "all")),
            visibility: json.get("visibility").and_then(Value::as_f64),
            observation_time: json.get("dt").and_then(Value::as_i64).and_then(unix_to_utc),
            sunrise: sys.and_then(|s| s.get("sunrise")).and_then(Value::as_i64).and_then(unix_to_utc),
            sunset: sys.and_then(|s| s.get("sunset")).and_then(Value::as_i64).and_then(unix_to_utc),
        }
    }
}

fn number(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(Value::as_f64)
}

fn text(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}
