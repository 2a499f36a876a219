//! Accessibility and session preferences
//!
//! Three scalar settings survive restarts: font size, high contrast and the
//! last used mode. They are read once at startup and written on every change.

pub mod store;

pub use store::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore};

use crate::Mode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const FONT_SIZE_KEY: &str = "sahayak_fontSize";
pub const HIGH_CONTRAST_KEY: &str = "sahayak_highContrast";
pub const LAST_MODE_KEY: &str = "sahayak_lastMode";

/// Font size bounds and step, in pixels
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub default_font_size: u32,
    pub min_font_size: u32,
    pub max_font_size: u32,
    pub font_size_step: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            default_font_size: 18,
            min_font_size: 16,
            max_font_size: 28,
            font_size_step: 2,
        }
    }
}

impl DisplayConfig {
    pub fn clamp(&self, size: u32) -> u32 {
        size.clamp(self.min_font_size, self.max_font_size)
    }
}

/// Derived text sizes for the render layer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FontScale {
    pub base: u32,
    pub large: f32,
    pub xlarge: f32,
}

impl FontScale {
    pub fn from_base(base: u32) -> Self {
        Self {
            base,
            large: base as f32 * 1.25,
            xlarge: base as f32 * 1.5,
        }
    }
}

/// Loaded preferences backed by a store
pub struct Preferences {
    store: Box<dyn PreferenceStore>,
    display: DisplayConfig,
    font_size: u32,
    high_contrast: bool,
    last_mode: Mode,
}

impl Preferences {
    /// Read all settings from the store, falling back to defaults
    pub fn load(store: Box<dyn PreferenceStore>, display: DisplayConfig) -> Self {
        let font_size = store
            .get(FONT_SIZE_KEY)
            .and_then(|value| value.trim().parse::<u32>().ok())
            .map(|size| display.clamp(size))
            .unwrap_or(display.default_font_size);

        let high_contrast = store.get(HIGH_CONTRAST_KEY).as_deref() == Some("true");

        let last_mode = match store.get(LAST_MODE_KEY) {
            Some(value) => value.parse::<Mode>().unwrap_or_else(|_| {
                warn!("Ignoring unknown stored mode: {}", value);
                Mode::default()
            }),
            None => Mode::default(),
        };

        debug!(
            "Loaded preferences: font {}px, high contrast {}, last mode {}",
            font_size, high_contrast, last_mode
        );

        Self {
            store,
            display,
            font_size,
            high_contrast,
            last_mode,
        }
    }

    pub fn font_size(&self) -> u32 {
        self.font_size
    }

    pub fn font_scale(&self) -> FontScale {
        FontScale::from_base(self.font_size)
    }

    pub fn high_contrast(&self) -> bool {
        self.high_contrast
    }

    pub fn last_mode(&self) -> Mode {
        self.last_mode
    }

    pub fn display(&self) -> &DisplayConfig {
        &self.display
    }

    /// Apply `delta` pixels. Changes that would leave the bounds are refused.
    pub fn change_font_size(&mut self, delta: i32) -> Option<FontScale> {
        let new_size = self.font_size as i64 + delta as i64;
        if new_size < self.display.min_font_size as i64
            || new_size > self.display.max_font_size as i64
        {
            debug!("Font size {} out of bounds; unchanged", new_size);
            return None;
        }

        self.font_size = new_size as u32;
        self.persist(FONT_SIZE_KEY, self.font_size.to_string());
        info!("Font size set to {}px", self.font_size);
        Some(self.font_scale())
    }

    pub fn increase_font(&mut self) -> Option<FontScale> {
        self.change_font_size(self.display.font_size_step as i32)
    }

    pub fn decrease_font(&mut self) -> Option<FontScale> {
        self.change_font_size(-(self.display.font_size_step as i32))
    }

    pub fn toggle_high_contrast(&mut self) -> bool {
        self.high_contrast = !self.high_contrast;
        self.persist(HIGH_CONTRAST_KEY, self.high_contrast.to_string());
        self.high_contrast
    }

    pub fn set_last_mode(&mut self, mode: Mode) {
        self.last_mode = mode;
        self.persist(LAST_MODE_KEY, mode.as_str().to_string());
    }

    fn persist(&mut self, key: &str, value: String) {
        if let Err(e) = self.store.set(key, &value) {
            warn!("Failed to save preference {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(store: MemoryPreferenceStore) -> Preferences {
        Preferences::load(Box::new(store), DisplayConfig::default())
    }

    #[test]
    fn test_defaults_when_empty() {
        let prefs = load(MemoryPreferenceStore::new());
        assert_eq!(prefs.font_size(), 18);
        assert!(!prefs.high_contrast());
        assert_eq!(prefs.last_mode(), Mode::Information);
    }

    #[test]
    fn test_loads_and_clamps_stored_values() {
        let store = MemoryPreferenceStore::new()
            .with(FONT_SIZE_KEY, "40")
            .with(HIGH_CONTRAST_KEY, "true")
            .with(LAST_MODE_KEY, "wellness");
        let prefs = load(store);

        assert_eq!(prefs.font_size(), 28);
        assert!(prefs.high_contrast());
        assert_eq!(prefs.last_mode(), Mode::Wellness);
    }

    #[test]
    fn test_unknown_mode_and_garbage_size_fall_back() {
        let store = MemoryPreferenceStore::new()
            .with(FONT_SIZE_KEY, "big")
            .with(LAST_MODE_KEY, "banking");
        let prefs = load(store);

        assert_eq!(prefs.font_size(), 18);
        assert_eq!(prefs.last_mode(), Mode::Information);
    }

    #[test]
    fn test_font_steps_stop_at_bounds() {
        let mut prefs = load(MemoryPreferenceStore::new());

        assert_eq!(prefs.decrease_font().map(|s| s.base), Some(16));
        assert_eq!(prefs.decrease_font(), None);
        assert_eq!(prefs.font_size(), 16);

        for _ in 0..6 {
            prefs.increase_font();
        }
        assert_eq!(prefs.font_size(), 28);
        assert_eq!(prefs.increase_font(), None);
    }

    #[test]
    fn test_changes_are_persisted() {
        let store = MemoryPreferenceStore::new();
        let shared = store.clone();
        let mut prefs = load(store);

        prefs.increase_font();
        prefs.toggle_high_contrast();
        prefs.set_last_mode(Mode::Ordering);

        assert_eq!(shared.get(FONT_SIZE_KEY).as_deref(), Some("20"));
        assert_eq!(shared.get(HIGH_CONTRAST_KEY).as_deref(), Some("true"));
        assert_eq!(shared.get(LAST_MODE_KEY).as_deref(), Some("ordering"));
    }

    #[test]
    fn test_font_scale() {
        let scale = FontScale::from_base(20);
        assert_eq!(scale.large, 25.0);
        assert_eq!(scale.xlarge, 30.0);
    }
}
