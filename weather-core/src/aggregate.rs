//! Daily summaries computed from hourly forecast readings.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::model::{DailyAggregate, Forecast, WeatherReading};

#[derive(Debug, Default)]
struct Accumulator {
    temp_sum: f64,
    humidity_sum: f64,
    wind_sum: f64,
    min_temp: f64,
    max_temp: f64,
    count: usize,
}

impl Accumulator {
    fn push(&mut self, reading: &WeatherReading) {
        if self.count == 0 {
            self.min_temp = reading.temp;
            self.max_temp = reading.temp;
        } else {
            self.min_temp = self.min_temp.min(reading.temp);
            self.max_temp = self.max_temp.max(reading.temp);
        }
        self.temp_sum += reading.temp;
        self.humidity_sum += reading.humidity;
        self.wind_sum += reading.wind.speed;
        self.count += 1;
    }

    fn finish(self, date: NaiveDate) -> DailyAggregate {
        let n = self.count as f64;
        DailyAggregate {
            date,
            avg_temp: self.temp_sum / n,
            avg_humidity: self.humidity_sum / n,
            avg_wind: self.wind_sum / n,
            min_temp: self.min_temp,
            max_temp: self.max_temp,
            samples: self.count,
        }
    }
}

/// Group readings by the UTC calendar date of their timestamp, oldest date first.
pub fn group_by_day<'a, I>(readings: I) -> Vec<DailyAggregate>
where
    I: IntoIterator<Item = &'a WeatherReading>,
{
    let mut days: BTreeMap<NaiveDate, Accumulator> = BTreeMap::new();

    for reading in readings {
        let Some(at) = reading.observed_at() else {
            continue;
        };
        days.entry(at.date_naive()).or_default().push(reading);
    }

    days.into_iter().map(|(date, acc)| acc.finish(date)).collect()
}

/// Summaries for the first `max_days` dates that still have readings at or after `now`.
pub fn daily_summary(
    forecast: &Forecast,
    now: DateTime<Utc>,
    max_days: usize,
) -> Vec<DailyAggregate> {
    let cutoff = now.timestamp();
    let mut days = group_by_day(forecast.list.iter().filter(|r| r.dt >= cutoff));
    days.truncate(max_days);
    days
}
