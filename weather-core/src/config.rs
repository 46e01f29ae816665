use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{geocode::Languages, theme::Theme};

pub const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1";
pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_CONTACT_ENDPOINT: &str = "https://httpbin.org/post";

/// Endpoints and transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL; `/search` and `/reverse` are appended.
    pub geocoding_url: String,
    pub forecast_url: String,
    /// When set, every forecast is fetched from this URL verbatim and no geocoding happens.
    pub override_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            geocoding_url: DEFAULT_GEOCODING_URL.into(),
            forecast_url: DEFAULT_FORECAST_URL.into(),
            override_url: None,
            timeout_secs: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    pub min_chars: usize,
    pub count: u8,
    pub debounce_ms: u64,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self { min_chars: 2, count: 5, debounce_ms: 300 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// History included on the detail view.
    pub past_days: u32,
    /// Number of days shown in the daily summary.
    pub summary_days: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self { past_days: 10, summary_days: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactConfig {
    pub endpoint: String,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self { endpoint: DEFAULT_CONTACT_ENDPOINT.into() }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// language = "nl"
/// theme = "dark"
///
/// [api]
/// timeout_secs = 8
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Primary geocoding language.
    pub language: String,
    /// Language used when the primary one finds nothing.
    pub fallback_language: String,
    pub theme: Theme,
    pub api: ApiConfig,
    pub suggestions: SuggestionConfig,
    pub forecast: ForecastConfig,
    pub contact: ContactConfig,
}

impl Default for Config {
    fn default() -> Self {
        let languages = Languages::default();
        Self {
            language: languages.primary,
            fallback_language: languages.fallback,
            theme: Theme::default(),
            api: ApiConfig::default(),
            suggestions: SuggestionConfig::default(),
            forecast: ForecastConfig::default(),
            contact: ContactConfig::default(),
        }
    }
}

impl Config {
    pub fn languages(&self) -> Languages {
        Languages { primary: self.language.clone(), fallback: self.fallback_language.clone() }
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "weather-lookup", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Path to the persisted favorites list.
    pub fn favorites_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().join("favorites.json"))
    }

    /// Apply an override URL coming from the command line or environment.
    pub fn with_override_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.api.override_url = Some(url);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("nope.toml")).unwrap();

        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.api.timeout_secs, 8);
        assert_eq!(cfg.languages(), Languages { primary: "nl".into(), fallback: "en".into() });
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "theme = \"dark\"\n[suggestions]\ndebounce_ms = 500\n").unwrap();

        let cfg = Config::load_from(&path).unwrap();

        assert_eq!(cfg.theme, Theme::Dark);
        assert_eq!(cfg.suggestions.debounce_ms, 500);
        assert_eq!(cfg.suggestions.min_chars, 2);
        assert_eq!(cfg.forecast.past_days, 10);
        assert_eq!(cfg.contact.endpoint, DEFAULT_CONTACT_ENDPOINT);
    }

    #[test]
    fn save_then_load_preserves_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.language = "de".into();
        cfg.api.override_url = Some("http://localhost:9/fixture.json".into());
        cfg.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn malformed_file_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "theme = [").unwrap();

        let err = Config::load_from(&path).unwrap_err();

        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn blank_override_is_ignored() {
        let cfg = Config::default().with_override_url(Some("  ".into()));
        assert_eq!(cfg.api.override_url, None);

        let cfg = Config::default().with_override_url(Some("http://x/y".into()));
        assert_eq!(cfg.api.override_url.as_deref(), Some("http://x/y"));
    }
}
