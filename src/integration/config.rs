//! Application configuration
//!
//! All static settings live in one `AppConfig`, loaded once at startup from an
//! optional TOML file and then overridden from the environment.

use crate::emergency::{EmergencyConfig, NAME_PLACEHOLDER};
use crate::llm::config::{ApiConfig, API_KEY_ENV};
use crate::llm::PromptPrefixes;
use crate::preferences::{DisplayConfig, FilePreferenceStore};
use crate::speech::SpeechConfig;
use crate::{Result, SahayakError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Overrides the completion endpoint
pub const API_URL_ENV: &str = "SAHAYAK_API_URL";

/// Path of the config file when none is given on the command line
pub const CONFIG_PATH_ENV: &str = "SAHAYAK_CONFIG";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub prompts: PromptPrefixes,
    pub speech: SpeechConfig,
    pub display: DisplayConfig,
    pub emergency: EmergencyConfig,

    /// Where preferences are stored; the user config dir when unset
    pub preferences_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| SahayakError::ConfigError(format!("Invalid config file: {}", e)))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from {:?}", path);
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SahayakError::ConfigError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Load from `path` (or defaults), apply the process environment and validate
    pub fn resolve(path: Option<PathBuf>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => {
                debug!("No config file given; using defaults");
                Self::default()
            }
        };
        let config = config.with_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// First CLI argument, else `SAHAYAK_CONFIG`
    pub fn path_from_args(mut args: impl Iterator<Item = String>) -> Option<PathBuf> {
        args.next()
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from)
    }

    /// Apply environment overrides through `lookup`
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup(API_KEY_ENV).filter(|key| !key.trim().is_empty()) {
            debug!("Using API key from {}", API_KEY_ENV);
            self.api.api_key = Some(key);
        }
        if let Some(url) = lookup(API_URL_ENV).filter(|url| !url.trim().is_empty()) {
            debug!("Using API endpoint from {}", API_URL_ENV);
            self.api.api_url = url;
        }
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api.api_key = Some(api_key.into());
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api.api_url = api_url.into();
        self
    }

    /// Never ask for the device location during emergencies
    pub fn without_geolocation(mut self) -> Self {
        self.emergency.settings.attempt_geolocation = false;
        self
    }

    pub fn preferences_path(&self) -> Option<PathBuf> {
        self.preferences_path
            .clone()
            .or_else(FilePreferenceStore::default_path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api.api_url.trim().is_empty() {
            return Err(SahayakError::ConfigError(
                "API endpoint must not be empty".to_string(),
            ));
        }

        let display = &self.display;
        if display.font_size_step == 0 {
            return Err(SahayakError::ConfigError(
                "Font size step must be positive".to_string(),
            ));
        }
        if display.min_font_size > display.default_font_size
            || display.default_font_size > display.max_font_size
        {
            return Err(SahayakError::ConfigError(format!(
                "Font sizes must satisfy min <= default <= max (got {} / {} / {})",
                display.min_font_size, display.default_font_size, display.max_font_size
            )));
        }

        if self.speech.rate <= 0.0 {
            return Err(SahayakError::ConfigError(format!(
                "Speech rate must be positive (got {})",
                self.speech.rate
            )));
        }

        if !self.emergency.message_template.contains(NAME_PLACEHOLDER) {
            return Err(SahayakError::ConfigError(format!(
                "Emergency message template must contain {}",
                NAME_PLACEHOLDER
            )));
        }
        if self.emergency.primary_contact.phone.trim().is_empty() {
            return Err(SahayakError::ConfigError(
                "Primary emergency contact needs a phone number".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::DEFAULT_API_URL;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.api.api_url, DEFAULT_API_URL);
        assert_eq!(config.api.generation.max_output_tokens, 1024);
        assert_eq!(config.speech.rate, 0.9);
        assert_eq!(config.display.font_size_step, 2);
        assert_eq!(config.emergency.services.police, "100");
        assert!(config.api.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml_str(
            r#"
            [speech]
            rate = 0.8
            language = "hi-IN"

            [display]
            max_font_size = 32

            [emergency.primary_contact]
            name = "Asha"
            phone = "+91 98000 00000"
            relationship = "Daughter"
            "#,
        )
        .unwrap();

        assert_eq!(config.speech.rate, 0.8);
        assert_eq!(config.speech.pitch, 1.0);
        assert_eq!(config.speech.language, "hi-IN");
        assert_eq!(config.display.max_font_size, 32);
        assert_eq!(config.display.min_font_size, 16);
        assert_eq!(config.emergency.primary_contact.name, "Asha");
        assert_eq!(config.emergency.secondary_contacts.len(), 1);
    }

    #[test]
    fn test_invalid_toml() {
        let err = AppConfig::from_toml_str("[speech\nrate = ").unwrap_err();
        assert!(matches!(err, SahayakError::ConfigError(_)));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api]\napi_url = \"http://localhost:9999/generate\"").unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.api.api_url, "http://localhost:9999/generate");
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::default().with_overrides(|name| match name {
            "GEMINI_API_KEY" => Some("from-env".to_string()),
            "SAHAYAK_API_URL" => Some("  ".to_string()),
            _ => None,
        });

        assert_eq!(config.api.key(), Some("from-env"));
        assert_eq!(config.api.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.display.font_size_step = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.display.default_font_size = 40;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.emergency.message_template = "Help at [LOCATION]".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.speech.rate = 0.0;
        assert!(config.validate().is_err());

        assert!(AppConfig::default().with_api_url("").validate().is_err());
    }

    #[test]
    fn test_builder_helpers() {
        let config = AppConfig::default()
            .with_api_key("key")
            .with_api_url("http://localhost/x")
            .without_geolocation();

        assert_eq!(config.api.key(), Some("key"));
        assert_eq!(config.api.api_url, "http://localhost/x");
        assert!(!config.emergency.settings.attempt_geolocation);
    }
}
