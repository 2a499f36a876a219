use super::types::Message;
use crate::Mode;
use std::collections::HashMap;

/// Ordered, append-only message list for one mode
#[derive(Debug, Clone, Default)]
pub struct MessageStorage {
    messages: Vec<Message>,
}

impl MessageStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn get_all(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Volatile per-session history, one store per mode
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    by_mode: HashMap<Mode, MessageStorage>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        let by_mode = Mode::ALL
            .iter()
            .map(|mode| (*mode, MessageStorage::new()))
            .collect();
        Self { by_mode }
    }

    pub fn add(&mut self, mode: Mode, message: Message) {
        self.by_mode.entry(mode).or_default().add(message);
    }

    pub fn get(&self, mode: Mode) -> Vec<Message> {
        self.by_mode
            .get(&mode)
            .map(MessageStorage::get_all)
            .unwrap_or_default()
    }

    pub fn len(&self, mode: Mode) -> usize {
        self.by_mode.get(&mode).map_or(0, MessageStorage::len)
    }

    pub fn is_empty(&self, mode: Mode) -> bool {
        self.len(mode) == 0
    }

    /// Total number of messages across every mode
    pub fn total(&self) -> usize {
        self.by_mode.values().map(MessageStorage::len).sum()
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_preserves_order() {
        let mut storage = MessageStorage::new();
        storage.add(Message::user("first"));
        storage.add(Message::assistant("second"));

        let texts: Vec<_> = storage.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(storage.last().unwrap().text, "second");
    }

    #[test]
    fn test_history_is_isolated_per_mode() {
        let mut history = ConversationHistory::new();
        history.add(Mode::Wellness, Message::user("how do I sleep better?"));

        assert_eq!(history.len(Mode::Wellness), 1);
        assert!(history.is_empty(Mode::Information));
        assert!(history.get(Mode::Ordering).is_empty());
        assert_eq!(history.total(), 1);
    }
}
