use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    config::ApiConfig,
    error::WeatherError,
    geocode::{Geocoder, Place, SearchQuery},
    http::{build_client, get_json},
    mapper::OpenMeteoResponse,
    model::Coordinates,
};

use super::WeatherProvider;

const CURRENT_FIELDS: &str = "temperature_2m,apparent_temperature,relative_humidity_2m,\
surface_pressure,wind_speed_10m,wind_direction_10m,wind_gusts_10m,precipitation,cloud_cover,\
weather_code";
const HOURLY_FIELDS: &str = "temperature_2m,apparent_temperature,relative_humidity_2m,\
wind_speed_10m,precipitation_probability,weather_code";
const DAILY_FIELDS: &str = "sunrise,sunset,uv_index_max";

/// Client for the Open-Meteo forecast and geocoding APIs. No API key needed.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: Client,
    geocoding_url: String,
    forecast_url: String,
    override_url: Option<String>,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct GeoResults {
    #[serde(default)]
    results: Option<Vec<Place>>,
}

impl OpenMeteoClient {
    pub fn new(api: &ApiConfig) -> Result<Self, WeatherError> {
        Ok(Self {
            http: build_client(api.timeout_secs)?,
            geocoding_url: api.geocoding_url.trim_end_matches('/').to_string(),
            forecast_url: api.forecast_url.clone(),
            override_url: api.override_url.clone(),
            timeout_secs: api.timeout_secs,
        })
    }

    /// The underlying HTTP client, shared with other senders (e.g. the contact form).
    pub fn http(&self) -> &Client {
        &self.http
    }

    fn forecast_query(coords: Coordinates, past_days: Option<u32>) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("latitude", coords.lat.to_string()),
            ("longitude", coords.lon.to_string()),
            ("current", CURRENT_FIELDS.to_string()),
            ("hourly", HOURLY_FIELDS.to_string()),
            ("daily", DAILY_FIELDS.to_string()),
            ("timezone", "GMT".to_string()),
            ("timeformat", "iso8601".to_string()),
        ];
        if let Some(days) = past_days.filter(|d| *d > 0) {
            query.push(("past_days", days.to_string()));
        }
        query
    }
}

#[async_trait]
impl Geocoder for OpenMeteoClient {
    async fn search(&self, query: SearchQuery<'_>) -> Result<Vec<Place>, WeatherError> {
        let url = format!("{}/search", self.geocoding_url);

        let mut params = vec![
            ("name", query.name.to_string()),
            ("count", query.count.to_string()),
            ("language", query.language.to_string()),
            ("format", "json".to_string()),
        ];
        if let Some(country) = query.country {
            params.push(("countryCode", country.to_uppercase()));
        }

        let parsed: GeoResults =
            get_json(&self.http, &url, &params, "geocoding search", self.timeout_secs).await?;

        Ok(parsed.results.unwrap_or_default())
    }

    async fn reverse(
        &self,
        coords: Coordinates,
        language: &str,
    ) -> Result<Option<Place>, WeatherError> {
        let url = format!("{}/reverse", self.geocoding_url);
        let params = [
            ("latitude", coords.lat.to_string()),
            ("longitude", coords.lon.to_string()),
            ("language", language.to_string()),
        ];

        let parsed: GeoResults =
            get_json(&self.http, &url, &params, "reverse geocoding", self.timeout_secs).await?;

        Ok(parsed.results.and_then(|r| r.into_iter().next()))
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    fn uses_location(&self) -> bool {
        self.override_url.is_none()
    }

    async fn fetch_forecast(
        &self,
        coords: Option<Coordinates>,
        past_days: Option<u32>,
    ) -> Result<OpenMeteoResponse, WeatherError> {
        if let Some(url) = &self.override_url {
            return get_json(&self.http, url, &[], "forecast", self.timeout_secs).await;
        }

        let coords = coords.ok_or_else(|| {
            WeatherError::InvalidInput("coordinates are required for a forecast".into())
        })?;

        get_json(
            &self.http,
            &self.forecast_url,
            &Self::forecast_query(coords, past_days),
            "forecast",
            self.timeout_secs,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forecast_query_includes_past_days_only_when_positive() {
        let coords = Coordinates::new(52.37, 4.9);

        let plain = OpenMeteoClient::forecast_query(coords, None);
        assert!(plain.iter().all(|(k, _)| *k != "past_days"));
        assert!(OpenMeteoClient::forecast_query(coords, Some(0)).iter().all(|(k, _)| *k != "past_days"));

        let with_past = OpenMeteoClient::forecast_query(coords, Some(10));
        assert!(with_past.contains(&("past_days", "10".to_string())));
        assert!(with_past.contains(&("latitude", "52.37".to_string())));
        assert!(with_past.contains(&("timezone", "GMT".to_string())));
    }

    #[tokio::test]
    async fn missing_coordinates_are_rejected_without_override() {
        let client = OpenMeteoClient::new(&ApiConfig::default()).unwrap();
        let err = client.fetch_forecast(None, None).await.unwrap_err();
        assert!(matches!(err, WeatherError::InvalidInput(_)));
    }
}
