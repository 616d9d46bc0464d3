//! Reference data fixtures: pages, categories and choosables from JSON.
//!
//! Saving is an upsert by id, so loading the same fixture on every start is safe.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use super::WizardStore;
use crate::error::{ConfigError, Error};
use crate::wizard::model::{Category, Choosable, Page};
use crate::wizard::PageChain;

/// Contents of a seed file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub choosables: Vec<Choosable>,
}

impl SeedData {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(format!("seed data: {e}")))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Every page must sit on a well-formed chain.
    pub fn validate(&self) -> Result<(), Error> {
        let chain = PageChain::new(self.pages.iter().cloned());
        for page in &self.pages {
            chain.resolve_route(page.id)?;
        }
        Ok(())
    }
}

/// Validate and store `seed`.
pub async fn load_seed(store: &dyn WizardStore, seed: &SeedData) -> Result<(), Error> {
    seed.validate()?;

    for page in &seed.pages {
        store.save_page(page).await?;
    }
    for category in &seed.categories {
        store.save_category(category).await?;
    }
    for choosable in &seed.choosables {
        store.save_choosable(choosable).await?;
    }

    info!(
        pages = seed.pages.len(),
        categories = seed.categories.len(),
        choosables = seed.choosables.len(),
        "Seed data loaded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ChainError, RouteError};
    use crate::store::LibSqlBackend;

    const SEED: &str = r#"{
        "pages": [
            {"id": 1, "catalogue_id": "welcome", "title": "Welcome", "href": "?page=welcome", "next_page": 2, "require_session": false},
            {"id": 2, "catalogue_id": "desktop", "title": "Desktop", "href": "?page=desktop", "previous_page": 1}
        ],
        "categories": [
            {"id": 1, "name": "Start", "icon": "home", "target_page": 1},
            {"id": 2, "name": "Desktop", "icon": "monitor", "target_page": 2, "child_of": 1}
        ],
        "choosables": [
            {"id": 1, "name": "Fedora", "meta": {"WEBSITE": {"meta_key": "WEBSITE", "meta_value": "https://fedoraproject.org"}}}
        ]
    }"#;

    #[tokio::test]
    async fn load_seed_stores_everything() {
        let store = LibSqlBackend::new_memory().await.unwrap();
        let seed = SeedData::from_json(SEED).unwrap();
        load_seed(&store, &seed).await.unwrap();

        let pages = store.list_pages().await.unwrap();
        assert_eq!(pages.len(), 2);
        assert!(!pages[0].require_session);
        assert_eq!(store.list_categories().await.unwrap().len(), 2);
        assert!(store.get_choosable(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn loading_twice_is_harmless() {
        let store = LibSqlBackend::new_memory().await.unwrap();
        let seed = SeedData::from_json(SEED).unwrap();
        load_seed(&store, &seed).await.unwrap();
        load_seed(&store, &seed).await.unwrap();
        assert_eq!(store.list_pages().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn cyclic_seed_rejected() {
        let store = LibSqlBackend::new_memory().await.unwrap();
        let seed = SeedData {
            pages: vec![
                Page::new(1, "a", "A").with_links(Some(2), Some(2)),
                Page::new(2, "b", "B").with_links(Some(1), Some(1)),
            ],
            ..Default::default()
        };
        let err = load_seed(&store, &seed).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Route(RouteError::Chain(ChainError::Cycle { .. }))
        ));
        assert!(store.list_pages().await.unwrap().is_empty());
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        assert!(matches!(
            SeedData::from_json("{ nope").unwrap_err(),
            ConfigError::ParseError(_)
        ));
    }

    #[test]
    fn seed_file_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("seed.json");
        std::fs::write(&path, SEED).unwrap();
        let seed = SeedData::from_file(&path).unwrap();
        assert_eq!(seed.pages.len(), 2);
        assert_eq!(seed.choosables[0].meta["WEBSITE"].meta_value, "https://fedoraproject.org");
    }
}
