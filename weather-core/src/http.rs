//! Small helpers shared by every HTTP call the crate makes.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::WeatherError;

/// Build the shared client with a whole-request timeout.
pub fn build_client(timeout_secs: u64) -> Result<Client, WeatherError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("weather-lookup/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(WeatherError::Network)
}

/// GET `url` with `query` and decode the JSON body into `T`.
pub(crate) async fn get_json<T: DeserializeOwned>(
    http: &Client,
    url: &str,
    query: &[(&str, String)],
    what: &'static str,
    timeout_secs: u64,
) -> Result<T, WeatherError> {
    tracing::debug!(url, ?query, "requesting {what}");

    let res = http
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| classify(e, timeout_secs))?;

    let status = res.status();
    let body = res.text().await.map_err(|e| classify(e, timeout_secs))?;

    if !status.is_success() {
        return Err(WeatherError::Status { status: status.as_u16(), body: truncate_body(&body) });
    }

    serde_json::from_str(&body).map_err(|source| WeatherError::Parse { what, source })
}

pub(crate) fn classify(err: reqwest::Error, timeout_secs: u64) -> WeatherError {
    if err.is_timeout() { WeatherError::Timeout(timeout_secs) } else { WeatherError::Network(err) }
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut cut = MAX;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
