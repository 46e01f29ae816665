use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use weather_core::{
    Config, FavoritesStore, ResultList, Theme, WeatherError, WeatherService,
    aggregate::daily_summary,
    contact::{ContactForm, ContactSender},
    http::build_client,
    suggest::{COUNTRIES, SuggestionLookup, country_filter},
};

use crate::{interactive, render::{self, Palette}};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather lookup CLI")]
pub struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Fetch every forecast from this URL instead of geocoding the city.
    #[arg(long, global = true, env = "WEATHER_FORECAST_URL")]
    pub forecast_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show current weather for one or more cities (or "lat,lon" pairs).
    Current {
        #[arg(required = true)]
        cities: Vec<String>,
    },

    /// Current conditions plus a daily summary of the coming days.
    Detail {
        city: String,

        /// Days of history to request along with the forecast.
        #[arg(long)]
        past_days: Option<u32>,

        /// Number of days in the summary.
        #[arg(long)]
        days: Option<usize>,
    },

    /// List city suggestions for a partial name.
    Suggest {
        query: String,

        /// Restrict to a country (ISO code, e.g. NL).
        #[arg(long)]
        country: Option<String>,
    },

    /// Manage favorite cities.
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },

    /// Show or change the colour theme.
    Theme {
        #[arg(value_enum, default_value_t = ThemeAction::Show)]
        action: ThemeAction,
    },

    /// Send a message through the contact form.
    Contact {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        message: Option<String>,
    },

    /// Interactive session with search-as-you-type.
    Interactive,

    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum FavoritesAction {
    /// Print favorite city names.
    List,
    /// Add a city, or remove it when already a favorite.
    Toggle { name: String },
    /// Current weather for every favorite.
    Show,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeAction {
    Show,
    Light,
    Dark,
    Toggle,
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print where configuration and favorites are stored.
    Path,
    /// Print the effective configuration.
    Show,
}

/// Everything a command needs once configuration is loaded.
#[derive(Debug)]
pub struct App {
    pub config: Config,
    pub service: WeatherService,
    pub palette: Palette,
    pub format: OutputFormat,
}

impl App {
    pub fn new(config: Config, format: OutputFormat) -> Result<Self> {
        let service = WeatherService::from_config(&config)?;
        let palette = Palette::for_theme(config.theme);
        Ok(Self { config, service, palette, format })
    }

    pub fn suggestion_lookup(&self) -> SuggestionLookup {
        SuggestionLookup::new(self.service.geocoder(), self.config.language.clone(), &self.config.suggestions)
    }

    pub fn report(&self, err: &dyn std::fmt::Display) {
        eprintln!("{}", self.palette.error(&format!("Error: {err}")));
    }

    fn report_lookup(&self, err: &WeatherError) {
        self.report(err);
        if err.is_transient() {
            eprintln!("{}", self.palette.muted("This looks temporary, try again in a moment."));
        }
    }

    /// Look up `city` and put the result at the top of `list`. Failures are reported, not returned.
    pub async fn lookup_into(&self, list: &mut ResultList, city: &str) -> bool {
        list.record_query(city);
        match self.service.current_by_city(city).await {
            Ok(reading) => {
                tracing::info!(city = %reading.name, "updated");
                list.upsert(reading);
                true
            }
            Err(e) => {
                self.report_lookup(&e);
                false
            }
        }
    }

    /// Look up every city in order, so the last one ends up on top.
    /// Fails only when none of them could be retrieved.
    pub async fn lookup_all(&self, cities: &[String]) -> Result<ResultList> {
        let mut list = ResultList::default();
        let mut found = 0;
        for city in cities {
            if self.lookup_into(&mut list, city).await {
                found += 1;
            }
        }
        if found == 0 {
            bail!("No weather could be retrieved.");
        }
        Ok(list)
    }

    pub fn print_results(&self, list: &ResultList) -> Result<()> {
        match self.format {
            OutputFormat::Text => println!("{}", render::results_table(&self.palette, list.items())),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(list.items())?),
        }
        Ok(())
    }

    pub async fn show_detail(&self, city: &str, past_days: u32, days: usize) -> Result<()> {
        let (current, forecast) = tokio::join!(
            self.service.current_by_city(city),
            self.service.forecast_with_past_by_city(city, past_days),
        );
        let current = current?;
        let forecast = forecast?;
        let daily = daily_summary(&forecast, Utc::now(), days);

        match self.format {
            OutputFormat::Json => {
                let out = json!({ "city": forecast.city, "current": current, "daily": daily });
                println!("{}", serde_json::to_string_pretty(&out)?);
            }
            OutputFormat::Text => {
                let favorite = FavoritesStore::open_default()
                    .map(|s| s.favorites().is_favorite(&forecast.city))
                    .unwrap_or(false);
                let star = if favorite { " ★" } else { "" };

                println!("{}", self.palette.heading(&format!("Details for: {}{star}", forecast.city)));
                println!("{}\n", render::current_block(&self.palette, &current));
                println!("{}", render::daily_table(&self.palette, &daily));
            }
        }
        Ok(())
    }

    pub async fn send_contact(&self, form: ContactForm) -> Result<()> {
        let form = match form.validate() {
            Ok(form) => form,
            Err(errors) => {
                for e in &errors {
                    eprintln!("{}", self.palette.error(&e.to_string()));
                }
                bail!("The contact form has {} invalid field(s).", errors.len());
            }
        };

        let timeout = self.config.api.timeout_secs;
        let http = build_client(timeout).context("Failed to set up HTTP client")?;
        let sender = ContactSender::new(http, self.config.contact.endpoint.clone(), timeout);

        sender
            .submit(&form)
            .await
            .context("Something went wrong. Please try again.")?;

        println!("{}", self.palette.accent("Thanks! Your message has been sent."));
        Ok(())
    }
}

/// Store a new theme without writing command-line overrides back to disk.
pub fn persist_theme(theme: Theme) -> Result<()> {
    let mut on_disk = Config::load()?;
    on_disk.theme = theme;
    on_disk.save()
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = Config::load()?.with_override_url(self.forecast_url);
        let format = self.format;
        let app = || App::new(config.clone(), format);

        match self.command {
            Command::Config { action } => match action {
                ConfigAction::Path => {
                    println!("config:    {}", Config::config_file_path()?.display());
                    println!("favorites: {}", Config::favorites_file_path()?.display());
                }
                ConfigAction::Show => print!("{}", toml::to_string_pretty(&config)?),
            },
            Command::Theme { action } => {
                let theme = match action {
                    ThemeAction::Show => config.theme,
                    ThemeAction::Light => Theme::Light,
                    ThemeAction::Dark => Theme::Dark,
                    ThemeAction::Toggle => config.theme.toggled(),
                };
                if action != ThemeAction::Show {
                    persist_theme(theme)?;
                }
                println!("{}", Palette::for_theme(theme).heading(&format!("Theme: {theme}")));
            }
            Command::Current { cities } => {
                let app = app()?;
                let list = app.lookup_all(&cities).await?;
                app.print_results(&list)?;
            }
            Command::Detail { city, past_days, days } => {
                let app = app()?;
                let past_days = past_days.unwrap_or(app.config.forecast.past_days);
                let days = days.unwrap_or(app.config.forecast.summary_days);
                app.show_detail(&city, past_days, days).await?;
            }
            Command::Suggest { query, country } => {
                let app = app()?;
                let country = match country.as_deref() {
                    Some(code) => Some(country_filter(code).ok_or_else(|| {
                        let known: Vec<_> = COUNTRIES.iter().map(|(c, _)| *c).collect();
                        anyhow::anyhow!("Unknown country '{code}'. Supported: {}.", known.join(", "))
                    })?),
                    None => None,
                };
                let items = app.suggestion_lookup().suggest(&query, country).await;
                match format {
                    OutputFormat::Text => println!("{}", render::suggestion_list(&app.palette, &items)),
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&items)?),
                }
            }
            Command::Favorites { action } => {
                let app = app()?;
                let mut store = FavoritesStore::open_default()?;
                match action {
                    FavoritesAction::List => {
                        let names = store.favorites().names();
                        match format {
                            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(names)?),
                            OutputFormat::Text if names.is_empty() => {
                                println!("{}", app.palette.muted("No favorites yet."))
                            }
                            OutputFormat::Text => names.iter().for_each(|n| println!("★ {n}")),
                        }
                    }
                    FavoritesAction::Toggle { name } => {
                        let added = store.toggle(&name)?;
                        let verb = if added { "Added to" } else { "Removed from" };
                        println!("{verb} favorites: {name}");
                    }
                    FavoritesAction::Show => {
                        let mut list = ResultList::default();
                        // Oldest first so the newest favorite ends up on top.
                        for name in store.favorites().names().iter().rev() {
                            app.lookup_into(&mut list, name).await;
                        }
                        app.print_results(&list)?;
                    }
                }
            }
            Command::Contact { name, email, message } => {
                let app = app()?;
                if let Some(form) = interactive::complete_contact_form(name, email, message).await? {
                    app.send_contact(form).await?;
                }
            }
            Command::Interactive => interactive::run(app()?).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use clap::CommandFactory;
    use weather_core::{
        Coordinates, WeatherProvider,
        geocode::{Geocoder, Languages, Place, SearchQuery},
        mapper::{CurrentBlock, OpenMeteoResponse},
    };

    use super::*;

    // Guards WEATHER_FORECAST_URL, which clap reads on every parse.
    static ENV: Mutex<()> = Mutex::new(());

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        let _env = ENV.lock().unwrap_or_else(|e| e.into_inner());
        Cli::try_parse_from(args)
    }

    #[derive(Debug)]
    struct KnownCities;

    #[async_trait]
    impl Geocoder for KnownCities {
        async fn search(&self, query: SearchQuery<'_>) -> Result<Vec<Place>, WeatherError> {
            if query.name.eq_ignore_ascii_case("Atlantis") {
                return Ok(Vec::new());
            }
            Ok(vec![Place {
                name: query.name.to_string(),
                latitude: 52.0,
                longitude: 5.0,
                admin1: None,
                country: Some("Nederland".into()),
                population: None,
            }])
        }

        async fn reverse(&self, _: Coordinates, _: &str) -> Result<Option<Place>, WeatherError> {
            Ok(None)
        }
    }

    #[derive(Debug)]
    struct MildWeather;

    #[async_trait]
    impl WeatherProvider for MildWeather {
        async fn fetch_forecast(
            &self,
            coords: Option<Coordinates>,
            _past_days: Option<u32>,
        ) -> Result<OpenMeteoResponse, WeatherError> {
            let coords = coords.unwrap_or(Coordinates::new(0.0, 0.0));
            Ok(OpenMeteoResponse {
                latitude: Some(coords.lat),
                longitude: Some(coords.lon),
                current: Some(CurrentBlock { temperature_2m: Some(12.0), ..Default::default() }),
                ..Default::default()
            })
        }
    }

    fn app() -> App {
        App {
            config: Config::default(),
            service: WeatherService::new(Arc::new(KnownCities), Arc::new(MildWeather), Languages::default()),
            palette: Palette::with_color(Theme::Light, false),
            format: OutputFormat::Text,
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_detail_with_options() {
        let cli = parse(&["weather", "detail", "Utrecht", "--past-days", "3", "--days", "4"]).unwrap();
        match cli.command {
            Command::Detail { city, past_days, days } => {
                assert_eq!(city, "Utrecht");
                assert_eq!(past_days, Some(3));
                assert_eq!(days, Some(4));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn current_requires_a_city() {
        assert!(parse(&["weather", "current"]).is_err());
    }

    #[test]
    fn theme_defaults_to_show_and_format_to_text() {
        let cli = parse(&["weather", "theme"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(matches!(cli.command, Command::Theme { action: ThemeAction::Show }));
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = parse(&["weather", "favorites", "list", "--format", "json", "-q"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.quiet);
    }

    #[test]
    fn forecast_url_is_read_from_the_environment() {
        let _env = ENV.lock().unwrap_or_else(|e| e.into_inner());
        // SAFETY: every parse in this module holds ENV, so nothing reads the variable concurrently.
        unsafe { std::env::set_var("WEATHER_FORECAST_URL", "http://localhost:9/om.json") };
        let from_env = Cli::try_parse_from(["weather", "current", "Delft"]);
        let from_flag = Cli::try_parse_from(["weather", "current", "Delft", "--forecast-url", "http://x/y"]);
        // SAFETY: as above.
        unsafe { std::env::remove_var("WEATHER_FORECAST_URL") };

        assert_eq!(from_env.unwrap().forecast_url.as_deref(), Some("http://localhost:9/om.json"));
        assert_eq!(from_flag.unwrap().forecast_url.as_deref(), Some("http://x/y"));
    }

    #[tokio::test]
    async fn current_keeps_going_past_a_failed_city() {
        let cities = ["Delft".to_string(), "Atlantis".to_string(), "Gouda".to_string()];

        let list = app().lookup_all(&cities).await.unwrap();

        let names: Vec<&str> = list.items().iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, ["Gouda, Nederland", "Delft, Nederland"]);
        assert_eq!(list.items()[0].temp, 12.0);
    }

    #[tokio::test]
    async fn current_fails_only_when_every_city_fails() {
        let err = app().lookup_all(&["Atlantis".to_string()]).await.unwrap_err();
        assert!(err.to_string().contains("No weather could be retrieved"));
    }
}
