//! Small key/value preference store handed to a game at construction.

use dashmap::DashMap;

/// Key suffix recording that the instructions were shown once.
pub const TUTORIAL_SEEN: &str = "tutorial_seen";
/// Key suffix for the sound effects toggle.
pub const SOUND_ENABLED: &str = "sound_enabled";

/// Persisted client preferences (sound toggle, tutorial seen, ...).
pub trait PreferenceStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;
    /// Write a value.
    fn set(&self, key: &str, value: String);
}

/// Process-local preferences.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: DashMap<String, String>,
}

impl MemoryPreferences {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|value| value.clone())
    }

    fn set(&self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }
}

/// Read a boolean flag, falling back to `default` when unset or unparsable.
pub fn flag(store: &dyn PreferenceStore, key: &str, default: bool) -> bool {
    store
        .get(key)
        .and_then(|value| value.parse::<bool>().ok())
        .unwrap_or(default)
}

/// Write a boolean flag.
pub fn set_flag(store: &dyn PreferenceStore, key: &str, value: bool) {
    store.set(key, value.to_string());
}

/// Preference key scoped to one game.
pub fn scoped_key(test_type: &str, key: &str) -> String {
    format!("{test_type}.{key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_default_until_written() {
        let prefs = MemoryPreferences::new();
        let key = scoped_key("reaction-time", SOUND_ENABLED);
        assert!(flag(&prefs, &key, true));

        set_flag(&prefs, &key, false);
        assert!(!flag(&prefs, &key, true));
        assert_eq!(prefs.get("reaction-time.sound_enabled").as_deref(), Some("false"));
    }

    #[test]
    fn garbage_values_fall_back_to_default() {
        let prefs = MemoryPreferences::new();
        prefs.set("x", "maybe".into());
        assert!(flag(&prefs, "x", true));
    }
}
