//! Current-conditions client for an Open-Meteo compatible endpoint.

use std::{collections::HashMap, time::Duration};

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tokio::{sync::Mutex, time::Instant};
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("invalid weather endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("weather request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("weather endpoint answered {0}")]
    Status(StatusCode),
    #[error("weather response has no current conditions")]
    MissingCurrent,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl WeatherLocation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    // Roughly 100 m of precision; nearby fixes share a cache slot.
    fn cache_key(&self) -> String {
        format!("{:.3},{:.3}", self.latitude, self.longitude)
    }
}

/// Coarse condition derived from a WMO weather interpretation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Fog,
    Drizzle,
    Rain,
    Snow,
    Thunderstorm,
    Unknown,
}

impl WeatherCondition {
    pub fn from_wmo_code(code: i64) -> Self {
        match code {
            0 => Self::Clear,
            1..=3 => Self::PartlyCloudy,
            45 | 48 => Self::Fog,
            51..=57 => Self::Drizzle,
            61..=67 | 80..=82 => Self::Rain,
            71..=77 | 85 | 86 => Self::Snow,
            95..=99 => Self::Thunderstorm,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::Snow => "Snow",
            Self::Thunderstorm => "Storm",
            Self::Unknown => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub temperature_c: f64,
    pub weather_code: i64,
    pub condition: WeatherCondition,
    pub fetched_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    /// e.g. `12°C Cloudy`.
    pub fn summary(&self) -> String {
        let label = self.condition.label();
        let temperature = format!("{:.0}°C", self.temperature_c);
        if label.is_empty() {
            temperature
        } else {
            format!("{temperature} {label}")
        }
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Option<CurrentConditions>,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    temperature_2m: f64,
    weather_code: i64,
}

struct CachedWeather {
    snapshot: WeatherSnapshot,
    expires_at: Instant,
}

pub struct WeatherClient {
    http: Client,
    endpoint: Url,
    ttl: Duration,
    cache: Mutex<HashMap<String, CachedWeather>>,
}

impl WeatherClient {
    pub fn new(endpoint: &str, ttl: Duration) -> Result<Self, WeatherError> {
        Ok(Self {
            http: Client::new(),
            endpoint: Url::parse(endpoint)?,
            ttl,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Current conditions at `location`, served from the cache while fresh.
    pub async fn current(
        &self,
        location: WeatherLocation,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let key = location.cache_key();
        if let Some(cached) = self.cache.lock().await.get(&key) {
            if cached.expires_at > Instant::now() {
                return Ok(cached.snapshot.clone());
            }
        }

        let snapshot = self.fetch(location).await?;
        self.cache.lock().await.insert(
            key,
            CachedWeather {
                snapshot: snapshot.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(snapshot)
    }

    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }

    async fn fetch(&self, location: WeatherLocation) -> Result<WeatherSnapshot, WeatherError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("latitude", &location.latitude.to_string())
            .append_pair("longitude", &location.longitude.to_string())
            .append_pair("current", "temperature_2m,weather_code");

        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(WeatherError::Status(response.status()));
        }
        let body: ForecastResponse = response.json().await?;
        let current = body.current.ok_or(WeatherError::MissingCurrent)?;
        debug!(
            temperature = current.temperature_2m,
            code = current.weather_code,
            "weather fetched"
        );
        Ok(WeatherSnapshot {
            temperature_c: current.temperature_2m,
            weather_code: current.weather_code,
            condition: WeatherCondition::from_wmo_code(current.weather_code),
            fetched_at: Utc::now(),
        })
    }
}

#[cfg(test)]
#[path = "tests/weather_tests.rs"]
mod tests;
