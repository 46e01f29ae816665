//! Interactive session: search-as-you-type, a result list and the side panels.

use std::{
    fmt,
    io::{self, IsTerminal},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result, bail};
use inquire::{
    Autocomplete, CustomUserError, InquireError, Select, Text,
    autocompletion::Replacement,
    validator::Validation,
};
use tokio::runtime::Handle;
use weather_core::{
    FavoritesStore, ResultList,
    contact::{ContactForm, validate_email, validate_message, validate_name},
    suggest::{COUNTRIES, Debouncer},
};

use crate::{cli::{App, persist_theme}, render::Palette};

/// Run a blocking inquire prompt off the async runtime. `None` when the user cancels.
async fn blocking_prompt<T, F>(prompt: F) -> Result<Option<T>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, InquireError> + Send + 'static,
{
    match tokio::task::spawn_blocking(prompt).await.context("Prompt task failed")? {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn require_terminal() -> Result<()> {
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        bail!("Interactive prompts need a terminal. Pass every value as an option instead.");
    }
    Ok(())
}

/// Extra time, on top of the debounce delay, a keystroke waits for its lookup.
const LOOKUP_GRACE: Duration = Duration::from_secs(2);

/// Feeds keystrokes to the debouncer and offers the batch published for the current input.
#[derive(Clone)]
struct CityCompleter {
    debouncer: Arc<Debouncer>,
    runtime: Handle,
}

impl CityCompleter {
    /// Wait until the batch for `query` is published, or the grace period runs out.
    /// Runs on inquire's blocking thread.
    fn wait_for(&self, query: &str) {
        let mut updates = self.debouncer.subscribe();
        let wait = self.debouncer.delay() + LOOKUP_GRACE;

        self.runtime.block_on(async {
            let published = async {
                while updates.borrow_and_update().query != query {
                    if updates.changed().await.is_err() {
                        break;
                    }
                }
            };
            if tokio::time::timeout(wait, published).await.is_err() {
                tracing::debug!(query, "no suggestions in time");
            }
        });
    }
}

impl Autocomplete for CityCompleter {
    fn get_suggestions(&mut self, input: &str) -> Result<Vec<String>, CustomUserError> {
        let query = input.trim();
        {
            let _guard = self.runtime.enter();
            drop(self.debouncer.submit(query));
        }
        self.wait_for(query);

        let batch = self.debouncer.latest();
        if batch.query != query {
            return Ok(Vec::new());
        }
        Ok(batch.items.iter().map(|s| s.label()).collect())
    }

    fn get_completion(
        &mut self,
        _input: &str,
        highlighted: Option<String>,
    ) -> Result<Replacement, CustomUserError> {
        let Some(label) = highlighted else {
            return Ok(None);
        };
        let batch = self.debouncer.latest();
        let name = batch
            .items
            .iter()
            .find(|s| s.label() == label)
            .map(|s| s.name.clone())
            .unwrap_or(label);
        Ok(Some(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    Search,
    Country,
    Refresh,
    Clear,
    Details,
    ToggleFavorite,
    Favorites,
    ToggleTheme,
    Contact,
    Quit,
}

impl MenuItem {
    const ALL: [MenuItem; 10] = [
        MenuItem::Search,
        MenuItem::Country,
        MenuItem::Refresh,
        MenuItem::Clear,
        MenuItem::Details,
        MenuItem::ToggleFavorite,
        MenuItem::Favorites,
        MenuItem::ToggleTheme,
        MenuItem::Contact,
        MenuItem::Quit,
    ];
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MenuItem::Search => "Search a city",
            MenuItem::Country => "Country filter",
            MenuItem::Refresh => "Refresh last search",
            MenuItem::Clear => "Clear results",
            MenuItem::Details => "Details",
            MenuItem::ToggleFavorite => "Toggle favorite",
            MenuItem::Favorites => "Favorites",
            MenuItem::ToggleTheme => "Toggle theme",
            MenuItem::Contact => "Contact",
            MenuItem::Quit => "Quit",
        })
    }
}

struct Session {
    app: App,
    results: ResultList,
    favorites: FavoritesStore,
    country: Option<String>,
    debouncer: Arc<Debouncer>,
}

impl Session {
    fn new(app: App) -> Result<Self> {
        let favorites = FavoritesStore::open_default()?;
        let debouncer = Arc::new(Self::debouncer(&app, None));
        Ok(Self { app, results: ResultList::default(), favorites, country: None, debouncer })
    }

    fn debouncer(app: &App, country: Option<String>) -> Debouncer {
        let delay = Duration::from_millis(app.config.suggestions.debounce_ms);
        Debouncer::new(app.suggestion_lookup(), delay).with_country(country)
    }

    fn show_results(&self) -> Result<()> {
        self.app.print_results(&self.results)
    }

    async fn search(&mut self) -> Result<()> {
        let completer = CityCompleter { debouncer: Arc::clone(&self.debouncer), runtime: Handle::current() };
        let placeholder = self.results.last_query().unwrap_or("e.g. Amsterdam").to_string();
        let help = match &self.country {
            Some(code) => format!("Suggestions limited to {code}"),
            None => "Type at least two letters for suggestions".to_string(),
        };

        let city = blocking_prompt(move || {
            Text::new("City:")
                .with_autocomplete(completer)
                .with_placeholder(&placeholder)
                .with_help_message(&help)
                .prompt()
        })
        .await?;

        let Some(city) = city.filter(|c| !c.trim().is_empty()) else {
            return Ok(());
        };
        if self.app.lookup_into(&mut self.results, city.trim()).await {
            self.show_results()?;
        }
        Ok(())
    }

    async fn choose_country(&mut self) -> Result<()> {
        let mut options = vec!["Any country".to_string()];
        options.extend(COUNTRIES.iter().map(|(code, name)| format!("{code} {name}")));

        let Some(choice) = blocking_prompt(move || Select::new("Country:", options).prompt()).await? else {
            return Ok(());
        };

        self.country = COUNTRIES
            .iter()
            .find(|(code, _)| choice.starts_with(code))
            .map(|(code, _)| code.to_string());
        self.debouncer = Arc::new(Self::debouncer(&self.app, self.country.clone()));
        tracing::debug!(country = ?self.country, "suggestion filter changed");
        Ok(())
    }

    async fn refresh(&mut self) -> Result<()> {
        match self.results.refresh_target() {
            Some(query) => {
                if self.app.lookup_into(&mut self.results, &query).await {
                    self.show_results()?;
                }
            }
            None => println!("{}", self.app.palette.muted("Nothing to refresh yet.")),
        }
        Ok(())
    }

    /// Let the user pick one of the listed cities.
    async fn pick_listed(&self, prompt: &'static str) -> Result<Option<String>> {
        let names: Vec<String> = self.results.items().iter().map(|w| w.name.clone()).collect();
        if names.is_empty() {
            println!("{}", self.app.palette.muted("Search for a city to get started."));
            return Ok(None);
        }
        blocking_prompt(move || Select::new(prompt, names).prompt()).await
    }

    async fn details(&self) -> Result<()> {
        let Some(city) = self.pick_listed("Details for:").await? else {
            return Ok(());
        };
        let cfg = &self.app.config.forecast;
        if let Err(e) = self.app.show_detail(&city, cfg.past_days, cfg.summary_days).await {
            self.app.report(&e);
        }
        Ok(())
    }

    async fn toggle_favorite(&mut self) -> Result<()> {
        let Some(city) = self.pick_listed("Toggle favorite:").await? else {
            return Ok(());
        };
        let added = self.favorites.toggle(&city)?;
        let verb = if added { "Added to" } else { "Removed from" };
        println!("{verb} favorites: {city}");
        Ok(())
    }

    async fn favorites(&mut self) -> Result<()> {
        let names = self.favorites.favorites().names().to_vec();
        if names.is_empty() {
            println!("{}", self.app.palette.muted("No favorites yet."));
            return Ok(());
        }
        let Some(city) = blocking_prompt(move || Select::new("Favorite:", names).prompt()).await? else {
            return Ok(());
        };
        if self.app.lookup_into(&mut self.results, &city).await {
            self.show_results()?;
        }
        Ok(())
    }

    fn toggle_theme(&mut self) -> Result<()> {
        let theme = self.app.config.theme.toggled();
        persist_theme(theme)?;
        self.app.config.theme = theme;
        self.app.palette = Palette::for_theme(theme);
        println!("{}", self.app.palette.heading(&format!("Theme: {theme}")));
        Ok(())
    }

    async fn contact(&self) -> Result<()> {
        if let Some(form) = complete_contact_form(None, None, None).await? {
            if let Err(e) = self.app.send_contact(form).await {
                self.app.report(&format!("{e:#}"));
            }
        }
        Ok(())
    }
}

/// Main loop of `weather interactive`.
pub async fn run(app: App) -> Result<()> {
    require_terminal()?;
    let mut session = Session::new(app)?;
    session.show_results()?;

    loop {
        let choice = blocking_prompt(|| Select::new("What next?", MenuItem::ALL.to_vec()).prompt()).await?;
        let Some(choice) = choice else {
            break;
        };

        match choice {
            MenuItem::Search => session.search().await?,
            MenuItem::Country => session.choose_country().await?,
            MenuItem::Refresh => session.refresh().await?,
            MenuItem::Clear => {
                session.results.clear();
                session.show_results()?;
            }
            MenuItem::Details => session.details().await?,
            MenuItem::ToggleFavorite => session.toggle_favorite().await?,
            MenuItem::Favorites => session.favorites().await?,
            MenuItem::ToggleTheme => session.toggle_theme()?,
            MenuItem::Contact => session.contact().await?,
            MenuItem::Quit => break,
        }
    }

    Ok(())
}

fn field_validator(
    check: fn(&str) -> Result<(), &'static str>,
) -> impl Fn(&str) -> Result<Validation, CustomUserError> + Clone {
    move |input: &str| {
        Ok(match check(input) {
            Ok(()) => Validation::Valid,
            Err(message) => Validation::Invalid(message.into()),
        })
    }
}

async fn ask_field(
    label: &'static str,
    check: fn(&str) -> Result<(), &'static str>,
) -> Result<Option<String>> {
    blocking_prompt(move || Text::new(label).with_validator(field_validator(check)).prompt()).await
}

/// Prompt for whichever contact fields were not given. `None` when the user cancels.
pub async fn complete_contact_form(
    name: Option<String>,
    email: Option<String>,
    message: Option<String>,
) -> Result<Option<ContactForm>> {
    if name.is_none() || email.is_none() || message.is_none() {
        require_terminal()?;
    }

    let name = match name {
        Some(v) => v,
        None => match ask_field("Name:", validate_name).await? {
            Some(v) => v,
            None => return Ok(None),
        },
    };
    let email = match email {
        Some(v) => v,
        None => match ask_field("Email:", validate_email).await? {
            Some(v) => v,
            None => return Ok(None),
        },
    };
    let message = match message {
        Some(v) => v,
        None => match ask_field("Message:", validate_message).await? {
            Some(v) => v,
            None => return Ok(None),
        },
    };

    Ok(Some(ContactForm { name, email, message }))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use weather_core::{
        Coordinates, WeatherError,
        config::SuggestionConfig,
        geocode::{Geocoder, Place, SearchQuery},
        suggest::SuggestionLookup,
    };

    use super::*;

    #[test]
    fn validator_maps_field_checks() {
        let v = field_validator(validate_name);
        assert!(matches!(v("Ada").unwrap(), Validation::Valid));
        assert!(matches!(v("A").unwrap(), Validation::Invalid(_)));
    }

    #[test]
    fn menu_lists_quit_last() {
        assert_eq!(MenuItem::ALL.last(), Some(&MenuItem::Quit));
        assert_eq!(MenuItem::Search.to_string(), "Search a city");
    }

    #[tokio::test]
    async fn complete_form_skips_prompts_when_all_fields_are_given() {
        let form = complete_contact_form(Some("Ada".into()), Some("a@b.nl".into()), Some("Hello".into()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(form.name, "Ada");
        assert_eq!(form.message, "Hello");
    }

    #[derive(Debug)]
    struct EchoGeocoder;

    #[async_trait]
    impl Geocoder for EchoGeocoder {
        async fn search(&self, query: SearchQuery<'_>) -> Result<Vec<Place>, WeatherError> {
            Ok(vec![Place {
                name: format!("{}-city", query.name),
                latitude: 1.0,
                longitude: 2.0,
                admin1: None,
                country: None,
                population: None,
            }])
        }

        async fn reverse(&self, _: Coordinates, _: &str) -> Result<Option<Place>, WeatherError> {
            Ok(None)
        }
    }

    fn completer(delay: Duration) -> CityCompleter {
        let lookup = SuggestionLookup::new(Arc::new(EchoGeocoder), "nl", &SuggestionConfig::default());
        CityCompleter { debouncer: Arc::new(Debouncer::new(lookup, delay)), runtime: Handle::current() }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn suggestions_belong_to_the_typed_query() {
        let mut completer = completer(Duration::from_millis(20));

        let (first, second, short) = tokio::task::spawn_blocking(move || {
            (
                completer.get_suggestions("Amst").unwrap(),
                completer.get_suggestions(" Rott ").unwrap(),
                completer.get_suggestions("R").unwrap(),
            )
        })
        .await
        .unwrap();

        assert_eq!(first, vec!["Amst-city"]);
        assert_eq!(second, vec!["Rott-city"]);
        assert!(short.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn completion_maps_label_back_to_name() {
        let mut completer = completer(Duration::from_millis(10));

        let (picked, none) = tokio::task::spawn_blocking(move || {
            completer.get_suggestions("Utre").unwrap();
            (
                completer.get_completion("Utre", Some("Utre-city".into())).unwrap(),
                completer.get_completion("Utre", None).unwrap(),
            )
        })
        .await
        .unwrap();

        assert_eq!(picked, Some("Utre-city".to_string()));
        assert_eq!(none, None);
    }
}
