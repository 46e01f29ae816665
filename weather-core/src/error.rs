use thiserror::Error;

/// Failures surfaced by lookups against the geocoding and forecast services.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Timeout: the request took too long ({0}s). Please try again.")]
    Timeout(u64),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Failed to parse {what}: {source}")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("No results found for '{0}'. Try another name or pick one of the suggestions.")]
    NoResults(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl WeatherError {
    /// True for failures where retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            WeatherError::Timeout(_) | WeatherError::Network(_) => true,
            WeatherError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_results_message_names_the_query() {
        let err = WeatherError::NoResults("Atlantis".into());
        assert!(err.to_string().contains("'Atlantis'"));
    }

    #[test]
    fn status_message_matches_http_format() {
        let err = WeatherError::Status { status: 404, body: "not here".into() };
        assert_eq!(err.to_string(), "HTTP 404: not here");
    }

    #[test]
    fn only_server_side_and_transport_failures_are_transient() {
        assert!(WeatherError::Timeout(8).is_transient());
        assert!(WeatherError::Status { status: 503, body: String::new() }.is_transient());
        assert!(!WeatherError::Status { status: 400, body: String::new() }.is_transient());
        assert!(!WeatherError::NoResults("x".into()).is_transient());
    }
}
