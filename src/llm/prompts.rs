//! Mode prefixes and prompt composition

use crate::{Mode, Result};
use serde::{Deserialize, Serialize};

/// Appended to ordering prompts that say nothing about where to deliver
pub const ORDERING_LOCATION_REMINDER: &str =
    " Note: Remember to ask for the user's address or location if needed for delivery.";

pub const INFORMATION_PREFIX: &str = "You are Sahayak, a helpful AI assistant for senior citizens. Provide clear, concise, and informative answers to the following question. Use simple language and avoid technical jargon: ";

pub const RELIGIOUS_PREFIX: &str = "You are Sahayak, a compassionate AI companion for senior citizens interested in religious and spiritual topics. Respond to the following query about religious topics, focusing on stories and teachings, in a way that is engaging and easy for a senior citizen to understand. Be respectful of all faiths and provide balanced information: ";

pub const WELLNESS_PREFIX: &str = "You are Sahayak, a supportive AI wellness companion for senior citizens. Respond to the following query about health and wellness, offering gentle, supportive, and informative advice suitable for a senior citizen. Focus on general wellbeing rather than specific medical advice, and always suggest consulting healthcare professionals for medical concerns: ";

pub const ORDERING_PREFIX: &str = "You are Sahayak, a helpful AI shopping assistant for senior citizens. Help the user understand how to order products online. Explain the process step by step, in a clear and easy to follow manner. If they mention specific items or services, guide them on how to find and order these items on platforms like Amazon or food delivery services. Ask for their address if delivery information is needed: ";

/// Instructional prefix for each mode
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptPrefixes {
    pub information: String,
    pub religious: String,
    pub wellness: String,
    pub ordering: String,
}

impl Default for PromptPrefixes {
    fn default() -> Self {
        Self {
            information: INFORMATION_PREFIX.to_string(),
            religious: RELIGIOUS_PREFIX.to_string(),
            wellness: WELLNESS_PREFIX.to_string(),
            ordering: ORDERING_PREFIX.to_string(),
        }
    }
}

impl PromptPrefixes {
    pub fn get(&self, mode: Mode) -> &str {
        match mode {
            Mode::Information => &self.information,
            Mode::Religious => &self.religious,
            Mode::Wellness => &self.wellness,
            Mode::Ordering => &self.ordering,
        }
    }
}

/// Maps a mode and user text to the outbound prompt. Pure and deterministic.
#[derive(Clone, Debug, Default)]
pub struct PromptComposer {
    prefixes: PromptPrefixes,
}

impl PromptComposer {
    pub fn new(prefixes: PromptPrefixes) -> Self {
        Self { prefixes }
    }

    pub fn prefix(&self, mode: Mode) -> &str {
        self.prefixes.get(mode)
    }

    pub fn compose(&self, mode: Mode, user_text: &str) -> String {
        let prefix = self.prefixes.get(mode);

        if mode == Mode::Ordering && !mentions_delivery_location(user_text) {
            return format!("{}{}{}", prefix, user_text, ORDERING_LOCATION_REMINDER);
        }

        format!("{}{}", prefix, user_text)
    }

    /// Compose for a mode given by name, failing on an unknown mode
    pub fn compose_for(&self, mode: &str, user_text: &str) -> Result<String> {
        let mode: Mode = mode.parse()?;
        Ok(self.compose(mode, user_text))
    }
}

fn mentions_delivery_location(text: &str) -> bool {
    let lowered = text.to_lowercase();
    lowered.contains("address") || lowered.contains("location")
}
