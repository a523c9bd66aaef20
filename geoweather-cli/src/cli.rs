use anyhow::{Context, bail};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use geoweather_core::{Config, Coordinate, WeatherInfo, WeatherService};
use inquire::{Confirm, Password, PasswordDisplayMode, Select};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "geoweather", version, about = "Current weather for a coordinate")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and lookup preferences.
    Configure,

    /// Show current weather at a coordinate.
    Show {
        /// Latitude in decimal degrees.
        #[arg(allow_negative_numbers = true)]
        latitude: f64,

        /// Longitude in decimal degrees.
        #[arg(allow_negative_numbers = true)]
        longitude: f64,

        /// Skip reverse geocoding and query by latitude/longitude only.
        #[arg(long)]
        by_coordinates: bool,

        /// Print the raw result as JSON.
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { latitude, longitude, by_coordinates, json } => {
                show(Coordinate::new(latitude, longitude), by_coordinates, json).await
            }
        }
    }
}

const UNIT_CHOICES: &[&str] = &["standard", "metric", "imperial"];

fn configure() -> anyhow::Result<()> {
    let mut cfg = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }
    cfg.set_api_key(api_key.trim().to_string());

    cfg.prefer_area_name = Confirm::new("Look weather up by place name first?")
        .with_default(cfg.prefer_area_name)
        .prompt()
        .context("Failed to read lookup preference")?;

    let units = Select::new("Units:", UNIT_CHOICES.to_vec())
        .prompt()
        .context("Failed to read units")?;
    cfg.units = Some(units.to_string());

    let path = cfg.save()?;
    println!("Configuration saved to {}", path.display());

    Ok(())
}

async fn show(coordinate: Coordinate, by_coordinates: bool, json: bool) -> anyhow::Result<()> {
    let cfg = Config::load()?;
    let mut service = WeatherService::from_config(&cfg)?;
    if by_coordinates {
        service.set_prefer_area_name(false);
    }

    let info = match service.get_weather(coordinate).await {
        Ok(info) => info,
        Err(err) => {
            tracing::debug!(error = ?err, "Weather lookup failed");
            bail!("{}", err.user_message());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print!("{}", render(&info, coordinate, cfg.units.as_deref()));
    }

    Ok(())
}

fn temperature_suffix(units: Option<&str>) -> &'static str {
    match units {
        Some("metric") => "°C",
        Some("imperial") => "°F",
        _ => " K",
    }
}

fn speed_suffix(units: Option<&str>) -> &'static str {
    match units {
        Some("imperial") => "mph",
        _ => "m/s",
    }
}

fn local_time(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn render(info: &WeatherInfo, coordinate: Coordinate, units: Option<&str>) -> String {
    let deg = temperature_suffix(units);
    let mut out = String::new();

    let title = match (&info.location_name, &info.country) {
        (Some(name), Some(country)) if !name.is_empty() => format!("{name}, {country}"),
        (Some(name), _) if !name.is_empty() => name.clone(),
        _ => coordinate.to_string(),
    };
    out.push_str(&format!("{title}\n"));

    if let Some(desc) = info.description.as_ref().or(info.condition.as_ref()) {
        out.push_str(&format!("  Conditions:  {desc}\n"));
    }
    if let Some(t) = info.temperature {
        match info.feels_like {
            Some(f) => out.push_str(&format!("  Temperature: {t:.1}{deg} (feels like {f:.1}{deg})\n")),
            None => out.push_str(&format!("  Temperature: {t:.1}{deg}\n")),
        }
    }
    if let (Some(lo), Some(hi)) = (info.temp_min, info.temp_max) {
        out.push_str(&format!("  Range:       {lo:.1}{deg} .. {hi:.1}{deg}\n"));
    }
    if let Some(h) = info.humidity {
        out.push_str(&format!("  Humidity:    {h:.0}%\n"));
    }
    if let Some(p) = info.pressure {
        out.push_str(&format!("  Pressure:    {p:.0} hPa\n"));
    }
    if let Some(w) = info.wind_speed {
        let dir = info.wind_direction.map(|d| format!(" from {d:.0}°")).unwrap_or_default();
        out.push_str(&format!("  Wind:        {w:.1} {}{dir}\n", speed_suffix(units)));
    }
    if let Some(c) = info.cloudiness {
        out.push_str(&format!("  Cloudiness:  {c:.0}%\n"));
    }
    if let Some(v) = info.visibility {
        out.push_str(&format!("  Visibility:  {:.1} km\n", v / 1000.0));
    }
    if let (Some(rise), Some(set)) = (info.sunrise, info.sunset) {
        out.push_str(&format!("  Sun:         {} / {}\n", local_time(rise), local_time(set)));
    }
    if let Some(t) = info.observation_time {
        out.push_str(&format!("  Observed:    {}\n", local_time(t)));
    }

    out
}
