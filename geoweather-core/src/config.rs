use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Environment variable that overrides the stored API key.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Reverse-geocoder settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeocoderConfig {
    /// Nominatim `/reverse` endpoint; the public instance when unset.
    pub base_url: Option<String>,
    pub user_agent: Option<String>,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// prefer_area_name = true
/// units = "metric"
///
/// [geocoder]
/// user_agent = "my-app/1.0 (me@example.com)"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub api_key: Option<String>,

    /// Look the weather up by place name first, falling back to coordinates.
    #[serde(default = "default_prefer_area_name")]
    pub prefer_area_name: bool,

    /// OpenWeather current-weather endpoint override.
    pub base_url: Option<String>,

    /// `standard`, `metric` or `imperial`; omitted from requests when unset.
    pub units: Option<String>,

    #[serde(default)]
    pub geocoder: GeocoderConfig,
}

fn default_prefer_area_name() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            prefer_area_name: default_prefer_area_name(),
            base_url: None,
            units: None,
            geocoder: GeocoderConfig::default(),
        }
    }
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "geoweather", "geoweather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    /// API key from `OPENWEATHER_API_KEY`, falling back to the stored one.
    pub fn resolved_api_key(&self) -> Result<String> {
        self.api_key_or_env(std::env::var(API_KEY_ENV).ok())
    }

    pub(crate) fn api_key_or_env(&self, env_key: Option<String>) -> Result<String> {
        env_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
            .ok_or_else(|| {
                anyhow!(
                    "No OpenWeather API key configured.\n\
                     Hint: run `geoweather configure` or set {API_KEY_ENV}."
                )
            })
    }
}
