use chrono::Local;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
    System,
}

impl Sender {
    /// Label shown above a rendered message
    pub fn label(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Assistant => "Sahayak",
            Sender::System => "System",
        }
    }
}

/// Rendering classification of a message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageTag {
    #[default]
    Normal,
    Error,
}

/// A single transcript entry. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub tag: MessageTag,
    /// Wall-clock time as shown to the user, e.g. `9:05`
    pub timestamp: String,
}

impl Message {
    pub fn new(sender: Sender, text: impl Into<String>, tag: MessageTag) -> Self {
        Self::at(sender, text, tag, current_timestamp())
    }

    pub fn at(
        sender: Sender,
        text: impl Into<String>,
        tag: MessageTag,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            text: text.into(),
            tag,
            timestamp: timestamp.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text, MessageTag::Normal)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text, MessageTag::Normal)
    }

    /// System notices are always rendered as errors
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Sender::System, text, MessageTag::Error)
    }

    pub fn is_error(&self) -> bool {
        self.tag == MessageTag::Error
    }
}

/// Hours without padding, minutes padded to two digits
pub fn current_timestamp() -> String {
    Local::now().format("%-H:%M").to_string()
}
