//! Completion API configuration

use serde::{Deserialize, Serialize};

/// Default generate-content endpoint
pub const DEFAULT_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Sampling parameters sent with every request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Temperature for sampling (0.0 = deterministic, 1.0+ = creative)
    pub temperature: f32,

    /// Top-k sampling parameter
    pub top_k: u32,

    /// Top-p (nucleus) sampling parameter
    pub top_p: f32,

    /// Maximum tokens to generate per response
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
        }
    }
}

/// Configuration for the completion client
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Endpoint receiving the POST; the key is appended as a query parameter
    pub api_url: String,

    /// API key, normally taken from the environment rather than a file.
    /// Readable from a config file but never written out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Sampling parameters
    pub generation: GenerationConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            generation: GenerationConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Create a configuration for a specific endpoint
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Default::default()
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the generation parameters
    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// The configured key, ignoring blank values
    pub fn key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_generation() {
        let config = GenerationConfig::default();
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.top_k, 40);
        assert_eq!(config.top_p, 0.95);
        assert_eq!(config.max_output_tokens, 1024);
    }

    #[test]
    fn test_generation_serializes_camel_case() {
        let value = serde_json::to_value(GenerationConfig::default()).unwrap();
        assert_eq!(value["topK"], 40);
        assert_eq!(value["maxOutputTokens"], 1024);
    }

    #[test]
    fn test_blank_key_is_missing() {
        let config = ApiConfig::default().with_api_key("   ");
        assert!(config.key().is_none());

        let config = ApiConfig::new("http://localhost/generate").with_api_key("abc");
        assert_eq!(config.key(), Some("abc"));
        assert_eq!(config.api_url, "http://localhost/generate");
    }

    #[test]
    fn test_key_is_not_serialized() {
        let config = ApiConfig::default().with_api_key("secret-key");
        let value = serde_json::to_value(&config).unwrap();
        assert!(value.get("api_key").is_none());
        assert!(!value.to_string().contains("secret-key"));
        assert_eq!(value["api_url"], DEFAULT_API_URL);

        let parsed: ApiConfig = serde_json::from_str(r#"{"api_key": "from-file"}"#).unwrap();
        assert_eq!(parsed.key(), Some("from-file"));
    }
}
