//! Open-Meteo payload types and their mapping onto [`WeatherReading`] / [`Forecast`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::model::{Coordinates, Forecast, WeatherCondition, WeatherReading, Wind};

const CURRENT_DESCRIPTION: &str = "Current conditions";
const HOURLY_DESCRIPTION: &str = "Hourly forecast";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenMeteoResponse {
    #[serde(default, deserialize_with = "number")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "number")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub current: Option<CurrentBlock>,
    #[serde(default)]
    pub hourly: Option<HourlySeries>,
    #[serde(default)]
    pub daily: Option<DailySeries>,
}

impl OpenMeteoResponse {
    pub fn coords(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.latitude?, self.longitude?))
    }

    /// `"lat,lon"`, leaving a side blank when the payload lacks it.
    pub fn coordinate_label(&self) -> String {
        let side = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
        format!("{},{}", side(self.latitude), side(self.longitude))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CurrentBlock {
    #[serde(deserialize_with = "text")]
    pub time: Option<String>,
    #[serde(deserialize_with = "number")]
    pub temperature_2m: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub apparent_temperature: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub relative_humidity_2m: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub surface_pressure: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub wind_speed_10m: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub wind_direction_10m: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub wind_gusts_10m: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub precipitation: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub cloud_cover: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub weather_code: Option<f64>,
}

impl CurrentBlock {
    fn is_empty(&self) -> bool {
        self.time.is_none()
            && self.temperature_2m.is_none()
            && self.apparent_temperature.is_none()
            && self.relative_humidity_2m.is_none()
            && self.surface_pressure.is_none()
            && self.wind_speed_10m.is_none()
            && self.wind_direction_10m.is_none()
            && self.wind_gusts_10m.is_none()
            && self.precipitation.is_none()
            && self.cloud_cover.is_none()
            && self.weather_code.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HourlySeries {
    #[serde(deserialize_with = "texts")]
    pub time: Vec<Option<String>>,
    #[serde(deserialize_with = "numbers")]
    pub temperature_2m: Vec<Option<f64>>,
    #[serde(deserialize_with = "numbers")]
    pub apparent_temperature: Vec<Option<f64>>,
    #[serde(deserialize_with = "numbers")]
    pub relative_humidity_2m: Vec<Option<f64>>,
    #[serde(deserialize_with = "numbers")]
    pub wind_speed_10m: Vec<Option<f64>>,
    #[serde(deserialize_with = "numbers")]
    pub precipitation_probability: Vec<Option<f64>>,
    #[serde(deserialize_with = "numbers")]
    pub weather_code: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DailySeries {
    #[serde(deserialize_with = "texts")]
    pub time: Vec<Option<String>>,
    #[serde(deserialize_with = "texts")]
    pub sunrise: Vec<Option<String>>,
    #[serde(deserialize_with = "texts")]
    pub sunset: Vec<Option<String>>,
    #[serde(deserialize_with = "numbers")]
    pub uv_index_max: Vec<Option<f64>>,
}

// Open-Meteo payloads are decoded leniently: a value of the wrong type counts as missing.

fn number<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
    Ok(Value::deserialize(de)?.as_f64())
}

fn text<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(Value::deserialize(de)?.as_str().map(str::to_owned))
}

fn numbers<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<Option<f64>>, D::Error> {
    Ok(elements(Value::deserialize(de)?, Value::as_f64))
}

fn texts<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<Option<String>>, D::Error> {
    Ok(elements(Value::deserialize(de)?, |v| v.as_str().map(str::to_owned)))
}

fn elements<T>(value: Value, item: impl Fn(&Value) -> Option<T>) -> Vec<Option<T>> {
    value.as_array().map(|a| a.iter().map(item).collect()).unwrap_or_default()
}

fn at(series: &[Option<f64>], idx: usize) -> Option<f64> {
    series.get(idx).copied().flatten()
}

fn condition_of(code: Option<f64>) -> Option<WeatherCondition> {
    code.and_then(|c| WeatherCondition::from_wmo_code(c as i32))
}

/// Parse an Open-Meteo timestamp into unix seconds. Offset-less values are GMT.
pub fn parse_time(raw: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|ndt| ndt.and_utc().timestamp())
}

/// Build the "current" reading, synthesizing one from the first hourly sample
/// when the payload carries no current block.
pub fn map_current(raw: &OpenMeteoResponse, now: DateTime<Utc>) -> WeatherReading {
    let current = match raw.current.as_ref().filter(|c| !c.is_empty()) {
        Some(c) => c.clone(),
        None => {
            let hourly = raw.hourly.clone().unwrap_or_default();
            CurrentBlock {
                time: hourly.time.first().cloned().flatten(),
                temperature_2m: at(&hourly.temperature_2m, 0),
                wind_speed_10m: at(&hourly.wind_speed_10m, 0),
                ..Default::default()
            }
        }
    };

    let temp = current.temperature_2m.unwrap_or(0.0);
    let dt = current.time.as_deref().and_then(parse_time).unwrap_or_else(|| now.timestamp());
    let condition = condition_of(current.weather_code);
    let daily = raw.daily.as_ref();

    WeatherReading {
        name: raw.coordinate_label(),
        dt,
        condition,
        description: condition
            .map_or(CURRENT_DESCRIPTION, |c| c.description())
            .to_string(),
        temp,
        feels_like: current.apparent_temperature.unwrap_or(temp),
        temp_min: temp,
        temp_max: temp,
        pressure: current.surface_pressure.unwrap_or(0.0),
        humidity: current.relative_humidity_2m.unwrap_or(0.0),
        wind: Wind {
            speed: current.wind_speed_10m.unwrap_or(0.0),
            deg: current.wind_direction_10m.unwrap_or(0.0),
            gust: current.wind_gusts_10m,
        },
        coord: raw.coords(),
        sunrise: daily.and_then(|d| d.sunrise.first().cloned().flatten()),
        sunset: daily.and_then(|d| d.sunset.first().cloned().flatten()),
        uv_index: daily.and_then(|d| at(&d.uv_index_max, 0)),
        precipitation: current.precipitation,
        precipitation_probability: None,
        cloud_cover: current.cloud_cover,
        dt_txt: current.time,
    }
}

/// One reading per hourly timestamp; entries with unparseable times are dropped.
pub fn map_forecast(raw: &OpenMeteoResponse) -> Forecast {
    let Some(hourly) = raw.hourly.as_ref() else {
        return Forecast { city: raw.coordinate_label(), list: Vec::new() };
    };

    let list = hourly
        .time
        .iter()
        .enumerate()
        .filter_map(|(idx, t)| {
            let t = t.as_deref().unwrap_or_default();
            let Some(dt) = parse_time(t) else {
                tracing::debug!(time = %t, "skipping hourly sample with unparseable time");
                return None;
            };
            let temp = at(&hourly.temperature_2m, idx).unwrap_or(0.0);
            let condition = condition_of(at(&hourly.weather_code, idx));

            Some(WeatherReading {
                name: raw.coordinate_label(),
                dt,
                condition,
                description: condition
                    .map_or(HOURLY_DESCRIPTION, |c| c.description())
                    .to_string(),
                temp,
                feels_like: at(&hourly.apparent_temperature, idx).unwrap_or(temp),
                temp_min: temp,
                temp_max: temp,
                pressure: 0.0,
                humidity: at(&hourly.relative_humidity_2m, idx).unwrap_or(0.0),
                wind: Wind {
                    speed: at(&hourly.wind_speed_10m, idx).unwrap_or(0.0),
                    ..Default::default()
                },
                coord: None,
                sunrise: None,
                sunset: None,
                uv_index: None,
                precipitation: None,
                precipitation_probability: at(&hourly.precipitation_probability, idx),
                cloud_cover: None,
                dt_txt: Some(t.to_string()),
            })
        })
        .collect();

    Forecast { city: raw.coordinate_label(), list }
}
