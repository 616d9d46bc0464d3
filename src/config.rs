//! Configuration types.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Site name, shown as the page title.
    pub name: String,
    /// HTTP port to bind on 0.0.0.0.
    pub port: u16,
    /// Path of the libSQL database file.
    pub db_path: PathBuf,
    /// Language codes offered in the language selector.
    pub language_codes: Vec<String>,
    /// Language used when the URL carries none.
    pub default_language_code: String,
    /// Languages whose translations are known to be incomplete.
    pub incomplete_translations: Vec<String>,
    /// Where visitors can help translating.
    pub translation_url: String,
    /// Frontend acceleration flag passed through to the template.
    pub acceleration: bool,
    pub debug: bool,
    /// Optional JSON fixture with pages, categories and choosables loaded at startup.
    pub seed_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "kuusi".to_string(),
            port: 8000,
            db_path: PathBuf::from("./data/kuusi.db"),
            language_codes: vec!["en".to_string(), "de".to_string()],
            default_language_code: "en".to_string(),
            incomplete_translations: Vec::new(),
            translation_url: String::new(),
            acceleration: false,
            debug: false,
            seed_path: None,
        }
    }
}

impl AppConfig {
    /// Build config from `KUUSI_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let name = std::env::var("KUUSI_NAME").unwrap_or(defaults.name);

        let port: u16 = std::env::var("KUUSI_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        let db_path = std::env::var("KUUSI_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let language_codes = std::env::var("KUUSI_LANGUAGE_CODES")
            .map(|s| split_list(&s))
            .unwrap_or(defaults.language_codes);

        let default_language_code =
            std::env::var("KUUSI_DEFAULT_LANGUAGE_CODE").unwrap_or(defaults.default_language_code);

        let incomplete_translations = std::env::var("KUUSI_INCOMPLETE_TRANSLATIONS")
            .map(|s| split_list(&s))
            .unwrap_or_default();

        let translation_url = std::env::var("KUUSI_TRANSLATION_URL").unwrap_or_default();

        let acceleration = std::env::var("KUUSI_ACCELERATION")
            .ok()
            .map(|s| parse_flag("KUUSI_ACCELERATION", &s))
            .transpose()?
            .unwrap_or(defaults.acceleration);

        let debug = std::env::var("KUUSI_DEBUG")
            .ok()
            .map(|s| parse_flag("KUUSI_DEBUG", &s))
            .transpose()?
            .unwrap_or(defaults.debug);

        let seed_path = std::env::var("KUUSI_SEED_PATH").ok().map(PathBuf::from);

        let config = Self {
            name,
            port,
            db_path,
            language_codes,
            default_language_code,
            incomplete_translations,
            translation_url,
            acceleration,
            debug,
            seed_path,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the router cannot serve.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.language_codes.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "KUUSI_LANGUAGE_CODES".into(),
                message: "at least one language code is required".into(),
            });
        }
        if !self.language_codes.contains(&self.default_language_code) {
            return Err(ConfigError::InvalidValue {
                key: "KUUSI_DEFAULT_LANGUAGE_CODE".into(),
                message: format!(
                    "'{}' is not one of {:?}",
                    self.default_language_code, self.language_codes
                ),
            });
        }
        Ok(())
    }

    /// Whether the language has incomplete translations.
    pub fn is_locale_incomplete(&self, language_code: &str) -> bool {
        self.incomplete_translations
            .iter()
            .any(|code| code == language_code)
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}
