//! Resolving a free-text city query (or a literal "lat,lon" pair) to a location.

use std::{fmt::Debug, sync::LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use crate::{
    error::WeatherError,
    model::{Coordinates, ResolvedLocation},
};

/// Number of candidates requested per name search.
pub const SEARCH_COUNT: u8 = 5;

/// One geocoding search hit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Place {
    #[serde(default)]
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub admin1: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub population: Option<u64>,
}

impl Place {
    pub fn coords(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// "name, admin1, country" with the empty parts left out.
    pub fn label(&self) -> String {
        [Some(self.name.as_str()), self.admin1.as_deref(), self.country.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SearchQuery<'a> {
    pub name: &'a str,
    pub count: u8,
    pub language: &'a str,
    /// ISO-3166 alpha-2 filter.
    pub country: Option<&'a str>,
}

#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    async fn search(&self, query: SearchQuery<'_>) -> Result<Vec<Place>, WeatherError>;

    async fn reverse(
        &self,
        coords: Coordinates,
        language: &str,
    ) -> Result<Option<Place>, WeatherError>;
}

/// Search languages, tried in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Languages {
    pub primary: String,
    pub fallback: String,
}

impl Default for Languages {
    fn default() -> Self {
        Self { primary: "nl".into(), fallback: "en".into() }
    }
}

static COORDINATES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(-?[0-9]+(?:\.[0-9]+)?)\s*,\s*(-?[0-9]+(?:\.[0-9]+)?)\s*$")
        .expect("coordinate pattern is valid")
});

/// Parse a literal `"lat,lon"` pair, e.g. `"52.37, 4.90"`.
pub fn parse_coordinates(input: &str) -> Option<Coordinates> {
    let caps = COORDINATES.captures(input)?;
    let lat: f64 = caps[1].parse().ok()?;
    let lon: f64 = caps[2].parse().ok()?;

    if lat.is_finite() && lon.is_finite() && lat.abs() <= 90.0 && lon.abs() <= 180.0 {
        Some(Coordinates::new(lat, lon))
    } else {
        None
    }
}

/// Pick the exact (case-insensitive) name match, else the most populous place.
/// Ties on population keep the earlier candidate.
pub fn pick_best<'a>(query: &str, candidates: &'a [Place]) -> Option<&'a Place> {
    let lowered = query.trim().to_lowercase();

    if let Some(exact) = candidates.iter().find(|p| p.name.to_lowercase() == lowered) {
        return Some(exact);
    }

    candidates.iter().fold(None, |best: Option<&Place>, place| match best {
        Some(b) if b.population.unwrap_or(0) >= place.population.unwrap_or(0) => Some(b),
        _ => Some(place),
    })
}

/// Resolve `query` to a location.
///
/// Literal coordinates skip the name search and only use reverse geocoding for
/// a label. Name searches fall back from the primary to the fallback language,
/// then to the part of the query before the first comma.
/// `Ok(None)` means nothing matched.
pub async fn resolve(
    geocoder: &dyn Geocoder,
    query: &str,
    languages: &Languages,
) -> Result<Option<ResolvedLocation>, WeatherError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(WeatherError::InvalidInput("empty city name".into()));
    }

    if let Some(coords) = parse_coordinates(trimmed) {
        let label = match geocoder.reverse(coords, &languages.primary).await {
            Ok(Some(place)) if !place.label().is_empty() => place.label(),
            Ok(_) => trimmed.to_string(),
            Err(e) => {
                tracing::debug!(%coords, "reverse geocoding failed: {e}");
                trimmed.to_string()
            }
        };
        return Ok(Some(ResolvedLocation { coords, label }));
    }

    let search = |name, language| SearchQuery { name, count: SEARCH_COUNT, language, country: None };

    let mut results = geocoder.search(search(trimmed, &languages.primary)).await?;

    if results.is_empty() {
        tracing::debug!(query = trimmed, "no hits in '{}', retrying", languages.primary);
        results = geocoder.search(search(trimmed, &languages.fallback)).await?;
    }

    if results.is_empty() {
        let simplified = trimmed.split(',').next().unwrap_or_default().trim();
        if !simplified.is_empty() && simplified.to_lowercase() != trimmed.to_lowercase() {
            tracing::debug!(query = trimmed, simplified, "retrying with simplified query");
            results = geocoder.search(search(simplified, &languages.fallback)).await?;
        }
    }

    Ok(pick_best(trimmed, &results)
        .map(|place| ResolvedLocation { coords: place.coords(), label: place.label() }))
}
