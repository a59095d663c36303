use std::{collections::HashMap, fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::weather::WeatherLocation;

pub const DEFAULT_CONFIG_FILE: &str = "launcher.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LauncherSettings {
    pub database_url: String,
    /// The launcher's own package, left out of the app list.
    pub own_package: Option<String>,
    pub weather_endpoint: String,
    pub weather_refresh_secs: u64,
    pub weather_cache_ttl_secs: u64,
    pub clock_tick_secs: u64,
    pub weather_latitude: Option<f64>,
    pub weather_longitude: Option<f64>,
    pub log_filter: String,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/launcher.db".into(),
            own_package: None,
            weather_endpoint: "https://api.open-meteo.com/v1/forecast".into(),
            weather_refresh_secs: 1800,
            weather_cache_ttl_secs: 900,
            clock_tick_secs: 15,
            weather_latitude: None,
            weather_longitude: None,
            log_filter: "info".into(),
        }
    }
}

impl LauncherSettings {
    pub fn weather_location(&self) -> Option<WeatherLocation> {
        Some(WeatherLocation::new(
            self.weather_latitude?,
            self.weather_longitude?,
        ))
    }

    pub fn weather_refresh_period(&self) -> Duration {
        Duration::from_secs(self.weather_refresh_secs)
    }

    pub fn weather_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.weather_cache_ttl_secs)
    }

    pub fn clock_tick_period(&self) -> Duration {
        Duration::from_secs(self.clock_tick_secs)
    }

    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "database_url" => self.database_url = value.to_string(),
            "own_package" => {
                let value = value.trim();
                self.own_package = (!value.is_empty()).then(|| value.to_string());
            }
            "weather_endpoint" => self.weather_endpoint = value.to_string(),
            "weather_refresh_secs" => set_parsed(&mut self.weather_refresh_secs, value),
            "weather_cache_ttl_secs" => set_parsed(&mut self.weather_cache_ttl_secs, value),
            "clock_tick_secs" => set_parsed(&mut self.clock_tick_secs, value),
            "weather_latitude" => {
                if let Ok(parsed) = value.trim().parse() {
                    self.weather_latitude = Some(parsed);
                }
            }
            "weather_longitude" => {
                if let Ok(parsed) = value.trim().parse() {
                    self.weather_longitude = Some(parsed);
                }
            }
            "log_filter" => self.log_filter = value.to_string(),
            _ => {}
        }
    }
}

const KEYS: &[&str] = &[
    "database_url",
    "own_package",
    "weather_endpoint",
    "weather_refresh_secs",
    "weather_cache_ttl_secs",
    "clock_tick_secs",
    "weather_latitude",
    "weather_longitude",
    "log_filter",
];

fn set_parsed(slot: &mut u64, value: &str) {
    if let Ok(parsed) = value.trim().parse() {
        *slot = parsed;
    }
}

/// Defaults, then `launcher.toml` in the working directory, then
/// `LAUNCHER__*` environment variables.
pub fn load_settings() -> LauncherSettings {
    load_settings_from(Path::new(DEFAULT_CONFIG_FILE), |name| {
        std::env::var(name).ok()
    })
}

pub fn load_settings_from<F>(config_path: &Path, env: F) -> LauncherSettings
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = LauncherSettings::default();

    if let Ok(raw) = fs::read_to_string(config_path) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            for key in KEYS {
                if let Some(value) = file_cfg.get(*key) {
                    settings.apply(key, value);
                }
            }
        }
    }

    for key in KEYS {
        if let Some(value) = env(&format!("LAUNCHER__{}", key.to_ascii_uppercase())) {
            settings.apply(key, &value);
        }
    }

    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
