//! City lookups: geocode, fetch, map.

use std::sync::Arc;

use chrono::Utc;

use crate::{
    Config,
    error::WeatherError,
    geocode::{self, Geocoder, Languages},
    mapper::{self, OpenMeteoResponse},
    model::{Forecast, WeatherReading},
    provider::WeatherProvider,
};

#[derive(Debug, Clone)]
pub struct WeatherService {
    geocoder: Arc<dyn Geocoder>,
    provider: Arc<dyn WeatherProvider>,
    languages: Languages,
}

impl WeatherService {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        provider: Arc<dyn WeatherProvider>,
        languages: Languages,
    ) -> Self {
        Self { geocoder, provider, languages }
    }

    /// Build a service backed by the Open-Meteo client described by `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = crate::provider::client_from_config(config)?;
        Ok(Self::new(client.clone(), client, config.languages()))
    }

    pub fn geocoder(&self) -> Arc<dyn Geocoder> {
        Arc::clone(&self.geocoder)
    }

    pub async fn current_by_city(&self, city: &str) -> Result<WeatherReading, WeatherError> {
        let (raw, label) = self.fetch(city, None).await?;
        let mut reading = mapper::map_current(&raw, Utc::now());
        reading.name = label;
        Ok(reading)
    }

    pub async fn forecast_by_city(&self, city: &str) -> Result<Forecast, WeatherError> {
        self.forecast(city, None).await
    }

    /// Forecast including `past_days` of history (10 on the detail view).
    pub async fn forecast_with_past_by_city(
        &self,
        city: &str,
        past_days: u32,
    ) -> Result<Forecast, WeatherError> {
        self.forecast(city, Some(past_days)).await
    }

    async fn forecast(&self, city: &str, past_days: Option<u32>) -> Result<Forecast, WeatherError> {
        let (raw, label) = self.fetch(city, past_days).await?;
        let mut forecast = mapper::map_forecast(&raw);
        forecast.city = label;
        Ok(forecast)
    }

    /// Fetch the raw payload for `city` together with the label to display.
    async fn fetch(
        &self,
        city: &str,
        past_days: Option<u32>,
    ) -> Result<(OpenMeteoResponse, String), WeatherError> {
        if !self.provider.uses_location() {
            let raw = self.provider.fetch_forecast(None, past_days).await?;
            let label = self.label_from_payload(&raw).await;
            return Ok((raw, label));
        }

        let resolved = geocode::resolve(self.geocoder.as_ref(), city, &self.languages)
            .await?
            .ok_or_else(|| WeatherError::NoResults(city.trim().to_string()))?;

        tracing::debug!(city, label = %resolved.label, coords = %resolved.coords, "resolved city");

        let raw = self.provider.fetch_forecast(Some(resolved.coords), past_days).await?;
        let label = if resolved.label.is_empty() { city.trim().to_string() } else { resolved.label };

        Ok((raw, label))
    }

    async fn label_from_payload(&self, raw: &OpenMeteoResponse) -> String {
        let fallback = raw.coordinate_label();
        let Some(coords) = raw.coords() else {
            return fallback;
        };

        match self.geocoder.reverse(coords, &self.languages.primary).await {
            Ok(Some(place)) if !place.label().is_empty() => place.label(),
            Ok(_) => fallback,
            Err(e) => {
                tracing::debug!(%coords, "reverse geocoding failed: {e}");
                fallback
            }
        }
    }
}
