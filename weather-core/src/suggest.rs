//! Autocomplete suggestions for the city search box.
//!
//! [`SuggestionLookup`] performs one lookup; [`Debouncer`] sits in front of it
//! and only lets a lookup through once the input has been quiet for a while.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use serde::Serialize;
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    config::SuggestionConfig,
    geocode::{Geocoder, SearchQuery},
};

/// Country filters offered next to the search box (ISO-3166 alpha-2).
pub const COUNTRIES: &[(&str, &str)] = &[
    ("NL", "Netherlands"),
    ("BE", "Belgium"),
    ("DE", "Germany"),
    ("FR", "France"),
    ("ES", "Spain"),
    ("IT", "Italy"),
    ("GB", "United Kingdom"),
    ("US", "United States"),
    ("CA", "Canada"),
];

/// Returns the normalized code when `code` is one of [`COUNTRIES`].
pub fn country_filter(code: &str) -> Option<&'static str> {
    COUNTRIES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code.trim()))
        .map(|(c, _)| *c)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub name: String,
    pub country: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

impl Suggestion {
    pub fn label(&self) -> String {
        match self.country.as_deref().filter(|c| !c.is_empty()) {
            Some(country) => format!("{}, {country}", self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SuggestionLookup {
    geocoder: Arc<dyn Geocoder>,
    language: String,
    min_chars: usize,
    count: u8,
}

impl SuggestionLookup {
    pub fn new(geocoder: Arc<dyn Geocoder>, language: impl Into<String>, config: &SuggestionConfig) -> Self {
        Self {
            geocoder,
            language: language.into(),
            min_chars: config.min_chars,
            count: config.count,
        }
    }

    /// Look up suggestions for `query`. Short queries and failed lookups
    /// both yield an empty list.
    pub async fn suggest(&self, query: &str, country: Option<&str>) -> Vec<Suggestion> {
        let trimmed = query.trim();
        if trimmed.is_empty() || trimmed.chars().count() < self.min_chars {
            return Vec::new();
        }

        let search = SearchQuery { name: trimmed, count: self.count, language: &self.language, country };

        match self.geocoder.search(search).await {
            Ok(places) => places
                .into_iter()
                .map(|p| Suggestion { name: p.name, country: p.country, lat: p.latitude, lon: p.longitude })
                .collect(),
            Err(e) => {
                tracing::warn!(query = trimmed, "suggestion lookup failed: {e}");
                Vec::new()
            }
        }
    }
}

/// The most recent suggestions that made it through the debouncer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuggestionBatch {
    pub query: String,
    pub items: Vec<Suggestion>,
}

/// Delays lookups until input has been quiet for `delay`; superseded queries never hit the network.
#[derive(Debug)]
pub struct Debouncer {
    lookup: Arc<SuggestionLookup>,
    delay: Duration,
    country: Option<String>,
    generation: Arc<AtomicU64>,
    latest: Arc<watch::Sender<SuggestionBatch>>,
}

impl Debouncer {
    pub fn new(lookup: SuggestionLookup, delay: Duration) -> Self {
        let (tx, _rx) = watch::channel(SuggestionBatch::default());
        Self {
            lookup: Arc::new(lookup),
            delay,
            country: None,
            generation: Arc::new(AtomicU64::new(0)),
            latest: Arc::new(tx),
        }
    }

    pub fn with_country(mut self, country: Option<String>) -> Self {
        self.country = country;
        self
    }

    /// Schedule a lookup for `query`. Must be called from within a tokio runtime.
    pub fn submit(&self, query: &str) -> JoinHandle<()> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let lookup = Arc::clone(&self.lookup);
        let latest = Arc::clone(&self.latest);
        let country = self.country.clone();
        let delay = self.delay;
        let query = query.trim().to_string();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if generation.load(Ordering::SeqCst) != ticket {
                tracing::trace!(query, "superseded before lookup");
                return;
            }

            let items = lookup.suggest(&query, country.as_deref()).await;

            if generation.load(Ordering::SeqCst) != ticket {
                tracing::trace!(query, "superseded during lookup");
                return;
            }
            latest.send_replace(SuggestionBatch { query, items });
        })
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn latest(&self) -> SuggestionBatch {
        self.latest.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SuggestionBatch> {
        self.latest.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::testing::{FakeGeocoder, place};

    fn lookup(geo: Arc<FakeGeocoder>) -> SuggestionLookup {
        SuggestionLookup::new(geo, "nl", &SuggestionConfig::default())
    }

    #[test]
    fn label_includes_country_when_known() {
        let mut s = Suggestion { name: "Delft".into(), country: Some("Nederland".into()), lat: 0.0, lon: 0.0 };
        assert_eq!(s.label(), "Delft, Nederland");
        s.country = None;
        assert_eq!(s.label(), "Delft");
    }

    #[test]
    fn country_filter_accepts_known_codes_only() {
        assert_eq!(country_filter("nl"), Some("NL"));
        assert_eq!(country_filter("XX"), None);
    }

    #[tokio::test]
    async fn short_queries_skip_the_lookup() {
        let geo = Arc::new(FakeGeocoder::default());

        assert!(lookup(geo.clone()).suggest(" A ", None).await.is_empty());
        assert!(lookup(geo.clone()).suggest("", None).await.is_empty());
        assert!(geo.calls().is_empty());
    }

    #[tokio::test]
    async fn maps_places_to_suggestions() {
        let geo = Arc::new(
            FakeGeocoder::default().with_hit("Ams", "nl", vec![place("Amsterdam", "Nederland", None)]),
        );

        let out = lookup(geo).suggest("  Ams ", None).await;

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label(), "Amsterdam, Nederland");
    }

    #[tokio::test]
    async fn failed_lookup_yields_no_suggestions() {
        let geo = Arc::new(FakeGeocoder { search_fails: true, ..Default::default() });

        assert!(lookup(geo.clone()).suggest("Leiden", None).await.is_empty());
        assert_eq!(geo.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn query_superseded_during_lookup_is_never_published() {
        let mut fake = FakeGeocoder::default()
            .with_hit("Gron", "nl", vec![place("Groningen", "Nederland", None)])
            .with_hit("Zwol", "nl", vec![place("Zwolle", "Nederland", None)]);
        fake.search_delay = Some(Duration::from_millis(500));
        let geo = Arc::new(fake);
        let debouncer = Debouncer::new(lookup(geo.clone()), Duration::from_millis(100));

        let first = debouncer.submit("Gron");
        tokio::time::sleep(Duration::from_millis(200)).await;
        let second = debouncer.submit("Zwol");

        first.await.unwrap();
        assert_eq!(debouncer.latest(), SuggestionBatch::default());

        second.await.unwrap();
        assert_eq!(geo.calls().len(), 2);
        let latest = debouncer.latest();
        assert_eq!(latest.query, "Zwol");
        assert_eq!(latest.items[0].name, "Zwolle");
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_input_only_looks_up_the_last_query() {
        let geo = Arc::new(
            FakeGeocoder::default().with_hit("Amst", "nl", vec![place("Amsterdam", "Nederland", None)]),
        );
        let debouncer = Debouncer::new(lookup(geo.clone()), Duration::from_millis(300));

        let handles = vec![debouncer.submit("Am"), debouncer.submit("Ams"), debouncer.submit("Amst")];
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(geo.calls(), vec![("Amst".to_string(), "nl".to_string())]);
        let latest = debouncer.latest();
        assert_eq!(latest.query, "Amst");
        assert_eq!(latest.items.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_gaps_let_each_query_through() {
        let geo = Arc::new(FakeGeocoder::default());
        let debouncer = Debouncer::new(lookup(geo.clone()), Duration::from_millis(300));
        let mut rx = debouncer.subscribe();

        debouncer.submit("Utrecht").await.unwrap();
        debouncer.submit("Utrech").await.unwrap();

        assert_eq!(geo.calls().len(), 2);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().query, "Utrech");
    }
}
