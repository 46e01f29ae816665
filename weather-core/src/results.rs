use crate::model::WeatherReading;

/// Lookup results shown on the home view, newest first, one entry per city name.
#[derive(Debug, Clone, Default)]
pub struct ResultList {
    items: Vec<WeatherReading>,
    last_query: Option<String>,
}

impl ResultList {
    pub fn items(&self) -> &[WeatherReading] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    pub fn record_query(&mut self, query: &str) {
        self.last_query = Some(query.to_string());
    }

    /// Put `reading` first, replacing any entry with the same name (ignoring case).
    pub fn upsert(&mut self, reading: WeatherReading) {
        let key = reading.name.to_lowercase();
        self.items.retain(|r| r.name.to_lowercase() != key);
        self.items.insert(0, reading);
    }

    /// What a refresh should look up again: the last query, else the newest result.
    pub fn refresh_target(&self) -> Option<String> {
        self.last_query.clone().or_else(|| self.items.first().map(|r| r.name.clone()))
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.last_query = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::{OpenMeteoResponse, map_current};

    fn reading(name: &str, temp: f64) -> WeatherReading {
        let mut r = map_current(&OpenMeteoResponse::default(), chrono::Utc::now());
        r.name = name.to_string();
        r.temp = temp;
        r
    }

    #[test]
    fn upsert_replaces_same_city_and_moves_it_first() {
        let mut list = ResultList::default();
        list.upsert(reading("Lisse", 10.0));
        list.upsert(reading("Hoorn", 11.0));
        list.upsert(reading("LISSE", 12.0));

        let names: Vec<_> = list.items().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["LISSE", "Hoorn"]);
        assert_eq!(list.items()[0].temp, 12.0);
    }

    #[test]
    fn refresh_prefers_last_query_then_first_item() {
        let mut list = ResultList::default();
        assert_eq!(list.refresh_target(), None);

        list.upsert(reading("Venlo", 1.0));
        assert_eq!(list.refresh_target().as_deref(), Some("Venlo"));

        list.record_query("venlo, limburg");
        assert_eq!(list.refresh_target().as_deref(), Some("venlo, limburg"));
    }

    #[test]
    fn clear_forgets_items_and_query() {
        let mut list = ResultList::default();
        list.record_query("Assen");
        list.upsert(reading("Assen", 1.0));

        list.clear();

        assert!(list.is_empty());
        assert_eq!(list.last_query(), None);
    }
}
