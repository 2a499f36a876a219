pub mod emergency;
pub mod integration;
pub mod llm;
pub mod messages;
pub mod mode;
pub mod preferences;
pub mod speech;
pub mod ui;
pub mod utils;

pub use mode::Mode;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SahayakError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("API key is not configured")]
    MissingApiKey,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error: {status} - {}", .message.as_deref().unwrap_or("Unknown error"))]
    ApiError { status: u16, message: Option<String> },

    #[error("Invalid response format from API: {0}")]
    InvalidResponse(String),

    #[error("Speech not supported: {0}")]
    SpeechUnsupported(String),

    #[error("Speech error: {0}")]
    SpeechRuntime(String),

    #[error("Geolocation error: {0}")]
    GeolocationError(String),

    #[error("Dispatch error: {0}")]
    DispatchError(String),

    #[error("Preference error: {0}")]
    PreferenceError(String),

    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for SahayakError {
    fn from(e: std::io::Error) -> Self {
        SahayakError::IOError(e.to_string())
    }
}

impl From<reqwest::Error> for SahayakError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SahayakError::InvalidResponse(e.to_string())
        } else {
            SahayakError::NetworkError(e.to_string())
        }
    }
}

impl SahayakError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Bad configuration needs the user to edit settings
            SahayakError::ConfigError(_) => false,
            SahayakError::MissingApiKey => false,
            // These are typically transient errors
            SahayakError::NetworkError(_) => true,
            SahayakError::ApiError { status, .. } => !matches!(status, 401 | 403),
            SahayakError::InvalidResponse(_) => true,
            // Platform capability is not coming back mid-session
            SahayakError::SpeechUnsupported(_) => false,
            SahayakError::SpeechRuntime(_) => true,
            SahayakError::GeolocationError(_) => true,
            SahayakError::DispatchError(_) => true,
            SahayakError::PreferenceError(_) => true,
            SahayakError::IOError(_) => false,
        }
    }

    /// Whether the failure points at the API credential rather than the request
    pub fn is_credential_error(&self) -> bool {
        match self {
            SahayakError::MissingApiKey => true,
            SahayakError::ApiError { status: 401 | 403, .. } => true,
            other => other.to_string().to_lowercase().contains("api key"),
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            SahayakError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            SahayakError::MissingApiKey => {
                "There seems to be an issue with the API key. Please check your configuration."
                    .to_string()
            }
            SahayakError::NetworkError(_) => {
                "Could not reach the assistant service. Please check your connection.".to_string()
            }
            SahayakError::ApiError { .. } | SahayakError::InvalidResponse(_) => {
                "Sorry, I encountered an error while processing your request. Please try again."
                    .to_string()
            }
            SahayakError::SpeechUnsupported(_) => {
                "Speech is not available here. Please type your message.".to_string()
            }
            SahayakError::SpeechRuntime(_) => {
                "Speech failed. Please try again or type your message.".to_string()
            }
            SahayakError::GeolocationError(_) => {
                "Your location could not be determined.".to_string()
            }
            SahayakError::DispatchError(_) => {
                "Could not open the call or message app.".to_string()
            }
            SahayakError::PreferenceError(_) => {
                "Your settings could not be saved.".to_string()
            }
            SahayakError::IOError(_) => "File system error occurred.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SahayakError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = SahayakError::ApiError {
            status: 429,
            message: Some("Resource has been exhausted".to_string()),
        };
        assert_eq!(err.to_string(), "API error: 429 - Resource has been exhausted");

        let bare = SahayakError::ApiError {
            status: 500,
            message: None,
        };
        assert_eq!(bare.to_string(), "API error: 500 - Unknown error");
    }

    #[test]
    fn test_credential_detection() {
        assert!(SahayakError::MissingApiKey.is_credential_error());
        assert!(SahayakError::ApiError {
            status: 403,
            message: None
        }
        .is_credential_error());
        assert!(SahayakError::ApiError {
            status: 400,
            message: Some("API key not valid. Please pass a valid API key.".to_string()),
        }
        .is_credential_error());
        assert!(!SahayakError::ApiError {
            status: 429,
            message: Some("Resource has been exhausted".to_string()),
        }
        .is_credential_error());
        assert!(!SahayakError::NetworkError("connection refused".to_string()).is_credential_error());
    }

    #[test]
    fn test_recoverability() {
        assert!(SahayakError::NetworkError("timeout".into()).is_recoverable());
        assert!(!SahayakError::MissingApiKey.is_recoverable());
        assert!(!SahayakError::ApiError {
            status: 401,
            message: None
        }
        .is_recoverable());
    }
}
