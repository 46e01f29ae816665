//! Human-friendly output: themed headings, tables and a small temperature chart.

use std::io::IsTerminal;

use owo_colors::{OwoColorize, Style};
use tabled::{Table, Tabled, settings::Style as TableStyle};
use weather_core::{DailyAggregate, Theme, WeatherReading, suggest::Suggestion};

const SPARK_BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Colours for one theme. Empty styles when colour is off.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    theme: Theme,
    color: bool,
    heading: Style,
    accent: Style,
    muted: Style,
    error: Style,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        Self::with_color(theme, std::io::stdout().is_terminal())
    }

    pub fn with_color(theme: Theme, color: bool) -> Self {
        if !color {
            let plain = Style::new();
            return Self { theme, color, heading: plain, accent: plain, muted: plain, error: plain };
        }
        match theme {
            Theme::Light => Self {
                theme,
                color,
                heading: Style::new().bold().blue(),
                accent: Style::new().cyan(),
                muted: Style::new().dimmed(),
                error: Style::new().red(),
            },
            Theme::Dark => Self {
                theme,
                color,
                heading: Style::new().bold().bright_cyan(),
                accent: Style::new().bright_yellow(),
                muted: Style::new().bright_black(),
                error: Style::new().bright_red(),
            },
        }
    }

    pub fn heading(&self, text: &str) -> String {
        self.paint(text, self.heading)
    }

    pub fn accent(&self, text: &str) -> String {
        self.paint(text, self.accent)
    }

    pub fn muted(&self, text: &str) -> String {
        self.paint(text, self.muted)
    }

    pub fn error(&self, text: &str) -> String {
        self.paint(text, self.error)
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.color { text.style(style).to_string() } else { text.to_string() }
    }

    fn table<R: Tabled>(&self, rows: impl IntoIterator<Item = R>) -> String {
        let mut table = Table::new(rows);
        match self.theme {
            Theme::Light => table.with(TableStyle::modern()),
            Theme::Dark => table.with(TableStyle::rounded()),
        };
        table.to_string()
    }
}

#[derive(Tabled)]
struct CityRow {
    #[tabled(rename = "City")]
    city: String,
    #[tabled(rename = "Temperature (°C)")]
    temperature: i64,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Wind (km/h)")]
    wind: String,
}

#[derive(Tabled)]
struct DayRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Avg. temperature (°C)")]
    avg_temp: i64,
    #[tabled(rename = "Min / max (°C)")]
    range: String,
    #[tabled(rename = "Avg. humidity (%)")]
    avg_humidity: i64,
    #[tabled(rename = "Avg. wind (km/h)")]
    avg_wind: i64,
}

fn round(n: f64) -> i64 {
    n.round() as i64
}

/// The home view table, one row per city.
pub fn results_table(palette: &Palette, items: &[WeatherReading]) -> String {
    if items.is_empty() {
        return palette.muted("Search for a city to get started.");
    }
    palette.table(items.iter().map(|w| CityRow {
        city: w.name.clone(),
        temperature: round(w.temp),
        description: if w.description.is_empty() { "-".into() } else { w.description.clone() },
        wind: w.wind.speed.to_string(),
    }))
}

pub fn current_block(palette: &Palette, current: &WeatherReading) -> String {
    let mut lines = vec![
        palette.heading("Current weather"),
        format!("Temperature: {}°C", round(current.temp)),
        format!("Feels like: {}°C", round(current.feels_like)),
        format!("Wind: {} km/h", current.wind.speed),
    ];
    if current.humidity > 0.0 {
        lines.push(format!("Humidity: {}%", round(current.humidity)));
    }
    if let (Some(rise), Some(set)) = (&current.sunrise, &current.sunset) {
        lines.push(palette.muted(&format!("Sunrise {rise} / sunset {set} (GMT)")));
    }
    if let Some(uv) = current.uv_index {
        lines.push(palette.muted(&format!("UV index (max today): {uv}")));
    }
    lines.join("\n")
}

pub fn daily_table(palette: &Palette, days: &[DailyAggregate]) -> String {
    if days.is_empty() {
        return palette.muted("No upcoming forecast data.");
    }
    let heading = palette.heading(&format!("Average temperature (next {} days)", days.len()));
    let table = palette.table(days.iter().map(|d| DayRow {
        date: d.date.format("%A %-d %B %Y").to_string(),
        avg_temp: round(d.avg_temp),
        range: format!("{} / {}", round(d.min_temp), round(d.max_temp)),
        avg_humidity: round(d.avg_humidity),
        avg_wind: round(d.avg_wind),
    }));
    let chart = format!(
        "{} {}",
        palette.muted("trend"),
        palette.accent(&sparkline(&days.iter().map(|d| d.avg_temp).collect::<Vec<_>>()))
    );
    format!("{heading}\n{table}\n{chart}")
}

pub fn suggestion_list(palette: &Palette, items: &[Suggestion]) -> String {
    if items.is_empty() {
        return palette.muted("No suggestions.");
    }
    items
        .iter()
        .map(|s| format!("{} {}", s.label(), palette.muted(&format!("({:.2}, {:.2})", s.lat, s.lon))))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One bar per value, scaled between the smallest and largest value.
pub fn sparkline(values: &[f64]) -> String {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    let span = max - min;
    let top = (SPARK_BARS.len() - 1) as f64;

    values
        .iter()
        .map(|v| {
            let idx = if span > 0.0 { ((v - min) / span * top).round() as usize } else { 0 };
            SPARK_BARS[idx.min(SPARK_BARS.len() - 1)]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn plain() -> Palette {
        Palette::with_color(Theme::Light, false)
    }

    #[test]
    fn sparkline_scales_between_extremes() {
        assert_eq!(sparkline(&[0.0, 7.0, 3.5]), "▁█▅");
        assert_eq!(sparkline(&[2.0, 2.0]), "▁▁");
        assert_eq!(sparkline(&[]), "");
    }

    #[test]
    fn empty_results_prompt_a_search() {
        assert_eq!(results_table(&plain(), &[]), "Search for a city to get started.");
    }

    #[test]
    fn daily_table_rounds_and_names_the_weekday() {
        let day = DailyAggregate {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            avg_temp: 12.6,
            avg_humidity: 70.4,
            avg_wind: 9.5,
            min_temp: 8.2,
            max_temp: 16.9,
            samples: 24,
        };

        let out = daily_table(&plain(), &[day]);

        assert!(out.contains("Wednesday 1 May 2024"));
        assert!(out.contains("8 / 17"));
        assert!(out.contains(" 13 "));
    }
}
