//! Conversational modes
//!
//! Each mode carries its own prompt framing, welcome text and message history.

use crate::SahayakError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four conversational contexts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// General questions and answers
    #[default]
    Information,
    /// Spiritual topics, stories and teachings
    Religious,
    /// Health and wellbeing
    Wellness,
    /// Guidance for ordering products and services online
    Ordering,
}

impl Mode {
    /// All modes in the order they are offered to the user
    pub const ALL: [Mode; 4] = [
        Mode::Information,
        Mode::Religious,
        Mode::Wellness,
        Mode::Ordering,
    ];

    /// Stable lowercase key, also used for persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Information => "information",
            Mode::Religious => "religious",
            Mode::Wellness => "wellness",
            Mode::Ordering => "ordering",
        }
    }

    /// Capitalized name for headings
    pub fn display_name(&self) -> &'static str {
        match self {
            Mode::Information => "Information",
            Mode::Religious => "Religious",
            Mode::Wellness => "Wellness",
            Mode::Ordering => "Ordering",
        }
    }

    /// Greeting shown at the top of a freshly opened conversation
    pub fn welcome_message(&self) -> &'static str {
        match self {
            Mode::Information => {
                "Welcome to Information Mode. Ask me any general questions, and I'll provide clear and helpful answers."
            }
            Mode::Religious => {
                "Welcome to Religious Mode. I can discuss spiritual topics, share stories from various traditions, or answer questions about religious practices."
            }
            Mode::Wellness => {
                "Welcome to Wellness Mode. I can provide tips on staying healthy, suggest simple exercises, or discuss general wellbeing topics."
            }
            Mode::Ordering => {
                "Welcome to Ordering Mode. I can help you place orders online. I'll guide you through the process of ordering food, groceries, or other items."
            }
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Mode {
    type Err = SahayakError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "information" => Ok(Mode::Information),
            "religious" => Ok(Mode::Religious),
            "wellness" => Ok(Mode::Wellness),
            "ordering" => Ok(Mode::Ordering),
            other => Err(SahayakError::ConfigError(format!("Invalid mode: {}", other))),
        }
    }
}
