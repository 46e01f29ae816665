use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;

use crate::{Config, error::WeatherError, mapper::OpenMeteoResponse, model::Coordinates};

pub mod openmeteo;

pub use openmeteo::OpenMeteoClient;

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// `false` when every fetch returns the same fixed source regardless of
    /// coordinates, in which case callers skip geocoding altogether.
    fn uses_location(&self) -> bool {
        true
    }

    /// Fetch the raw current + hourly + daily payload for `coords`,
    /// including `past_days` of history when given.
    async fn fetch_forecast(
        &self,
        coords: Option<Coordinates>,
        past_days: Option<u32>,
    ) -> Result<OpenMeteoResponse, WeatherError>;
}

/// Construct the Open-Meteo client described by `config`.
pub fn client_from_config(config: &Config) -> anyhow::Result<Arc<OpenMeteoClient>> {
    let client = OpenMeteoClient::new(&config.api).map_err(|e| {
        anyhow::anyhow!("Failed to set up the weather client: {e}")
    })?;

    if let Some(url) = &config.api.override_url {
        tracing::info!(url, "using fixed forecast source");
    }

    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_from_default_config_uses_location() {
        let client = client_from_config(&Config::default()).unwrap();
        assert!(client.uses_location());
    }

    #[test]
    fn override_url_switches_to_fixed_source() {
        let cfg = Config::default().with_override_url(Some("http://localhost:1/om.json".into()));
        let client = client_from_config(&cfg).unwrap();
        assert!(!client.uses_location());
    }
}
