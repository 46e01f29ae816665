//! Favorite cities, most recently added first, unique ignoring case.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Favorites {
    names: Vec<String>,
}

impl Favorites {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { names: names.into_iter().map(Into::into).collect() }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn is_favorite(&self, name: &str) -> bool {
        let key = name.to_lowercase();
        self.names.iter().any(|n| n.to_lowercase() == key)
    }

    /// Add `name` at the front, or remove it (and any case variants) if present.
    /// Returns whether `name` is a favorite afterwards.
    pub fn toggle(&mut self, name: &str) -> bool {
        let key = name.to_lowercase();
        if self.is_favorite(name) {
            self.names.retain(|n| n.to_lowercase() != key);
            false
        } else {
            self.names.insert(0, name.to_string());
            true
        }
    }
}

/// JSON-file-backed favorites.
#[derive(Debug)]
pub struct FavoritesStore {
    path: PathBuf,
    favorites: Favorites,
}

impl FavoritesStore {
    /// Open the store at the platform data path.
    pub fn open_default() -> Result<Self> {
        Ok(Self::open(crate::Config::favorites_file_path()?))
    }

    /// Open the store at `path`. Unreadable or malformed files start out empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let favorites = load(&path);
        Self { path, favorites }
    }

    pub fn favorites(&self) -> &Favorites {
        &self.favorites
    }

    /// Toggle `name` and persist the result. On a failed write nothing changes.
    pub fn toggle(&mut self, name: &str) -> Result<bool> {
        let mut next = self.favorites.clone();
        let now_favorite = next.toggle(name);
        write(&self.path, &next)?;
        self.favorites = next;
        tracing::debug!(name, now_favorite, "toggled favorite");
        Ok(now_favorite)
    }
}

fn write(path: &Path, favorites: &Favorites) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create favorites directory: {}", parent.display())
        })?;
    }

    let json = serde_json::to_string(favorites.names()).context("Failed to serialize favorites")?;

    fs::write(path, json)
        .with_context(|| format!("Failed to write favorites file: {}", path.display()))
}

fn load(path: &Path) -> Favorites {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Favorites::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), "could not read favorites: {e}");
            return Favorites::default();
        }
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(items)) => Favorites::from_names(
            items.into_iter().filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            }),
        ),
        Ok(_) => Favorites::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), "ignoring malformed favorites file: {e}");
            Favorites::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_adds_to_front_then_removes() {
        let mut favs = Favorites::from_names(["Utrecht"]);

        assert!(favs.toggle("Leiden"));
        assert_eq!(favs.names(), ["Leiden", "Utrecht"]);

        assert!(!favs.toggle("Leiden"));
        assert_eq!(favs.names(), ["Utrecht"]);
    }

    #[test]
    fn membership_and_removal_ignore_case() {
        let mut favs = Favorites::from_names(["Den Haag", "den haag", "Breda"]);

        assert!(favs.is_favorite("DEN HAAG"));
        assert!(!favs.toggle("Den haag"));
        assert_eq!(favs.names(), ["Breda"]);
    }

    #[test]
    fn store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("favorites.json");

        let mut store = FavoritesStore::open(&path);
        assert!(store.favorites().is_empty());
        store.toggle("Groningen").unwrap();
        store.toggle("Zwolle").unwrap();

        let reopened = FavoritesStore::open(&path);
        assert_eq!(reopened.favorites().names(), ["Zwolle", "Groningen"]);
        assert_eq!(fs::read_to_string(&path).unwrap(), r#"["Zwolle","Groningen"]"#);
    }

    #[test]
    fn failed_write_leaves_favorites_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();

        let mut store = FavoritesStore::open(blocker.join("favorites.json"));
        assert!(store.toggle("Haarlem").is_err());
        assert!(!store.favorites().is_favorite("Haarlem"));
    }

    #[test]
    fn non_string_entries_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.json");
        fs::write(&path, r#"["Arnhem", 42, null, "Ede"]"#).unwrap();

        assert_eq!(FavoritesStore::open(&path).favorites().names(), ["Arnhem", "Ede"]);
    }

    #[test]
    fn malformed_or_non_array_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.json");

        fs::write(&path, "{not json").unwrap();
        assert!(FavoritesStore::open(&path).favorites().is_empty());

        fs::write(&path, r#"{"a": 1}"#).unwrap();
        assert!(FavoritesStore::open(&path).favorites().is_empty());
    }
}
