use anyhow::{bail, Context};
use folio_core::config::{validate_locale, EngineConfig};
use folio_db::DEFAULT_MAX_CONNECTIONS;

/// CLI configuration loaded from environment variables.
///
/// | Env Var                | Default                      |
/// |------------------------|------------------------------|
/// | `DATABASE_URL`         | required                     |
/// | `DB_MAX_CONNECTIONS`   | `20`                         |
/// | `FOLIO_DEFAULT_LOCALE` | `en`                         |
/// | `FOLIO_LOCALES`        | empty (any well-formed code) |
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("DB_MAX_CONNECTIONS must be a valid u32, got '{raw}'"))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let default_locale = lookup("FOLIO_DEFAULT_LOCALE").unwrap_or_else(|| "en".into());
        validate_locale(&default_locale).context("FOLIO_DEFAULT_LOCALE is invalid")?;

        let locales: Vec<String> = lookup("FOLIO_LOCALES")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        for locale in &locales {
            validate_locale(locale).context("FOLIO_LOCALES is invalid")?;
        }
        if !locales.is_empty() && !locales.contains(&default_locale) {
            bail!("FOLIO_DEFAULT_LOCALE '{default_locale}' is not listed in FOLIO_LOCALES");
        }

        Ok(Self {
            database_url,
            max_connections,
            engine: EngineConfig {
                default_locale,
                locales,
            },
        })
    }
}
