//! Engine settings passed explicitly to [`crate::engine::RevisionEngine`].

use crate::error::CoreError;

/// Maximum length of a locale code.
pub const MAX_LOCALE_LEN: usize = 16;

/// Locale handling for draft writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Locale used when a draft write does not name one.
    pub default_locale: String,
    /// Accepted locales. Empty accepts any well-formed code.
    pub locales: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_locale: "en".into(),
            locales: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Resolve the locale for a draft write.
    pub fn resolve_locale(&self, requested: Option<&str>) -> Result<String, CoreError> {
        let locale = requested
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(self.default_locale.as_str());
        validate_locale(locale)?;
        if !self.locales.is_empty() && !self.locales.iter().any(|l| l == locale) {
            return Err(CoreError::Validation(format!(
                "Unsupported locale '{locale}'. Supported locales: {}",
                self.locales.join(", ")
            )));
        }
        Ok(locale.to_string())
    }
}

/// Validate a locale code (non-empty, `[A-Za-z0-9_-]`, at most 16 chars).
pub fn validate_locale(locale: &str) -> Result<(), CoreError> {
    if locale.is_empty() {
        return Err(CoreError::Validation("Locale must not be empty".into()));
    }
    if locale.len() > MAX_LOCALE_LEN {
        return Err(CoreError::Validation(format!(
            "Locale must be at most {MAX_LOCALE_LEN} characters"
        )));
    }
    if !locale
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(CoreError::Validation(format!(
            "Locale '{locale}' must contain only letters, digits, '-' or '_'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_locale_uses_default() {
        let config = EngineConfig::default();
        assert_eq!(config.resolve_locale(None).unwrap(), "en");
        assert_eq!(config.resolve_locale(Some("  ")).unwrap(), "en");
    }

    #[test]
    fn any_well_formed_locale_when_unrestricted() {
        let config = EngineConfig::default();
        assert_eq!(config.resolve_locale(Some("pt-BR")).unwrap(), "pt-BR");
        assert!(config.resolve_locale(Some("en.US")).is_err());
    }

    #[test]
    fn restricted_locales_reject_others() {
        let config = EngineConfig {
            default_locale: "en".into(),
            locales: vec!["en".into(), "fr".into()],
        };
        assert!(config.resolve_locale(Some("fr")).is_ok());
        let msg = config.resolve_locale(Some("de")).unwrap_err().to_string();
        assert!(msg.contains("de"));
    }

    #[test]
    fn overlong_locale_is_invalid() {
        assert!(validate_locale(&"a".repeat(MAX_LOCALE_LEN + 1)).is_err());
    }
}
