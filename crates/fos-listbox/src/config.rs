//! List widget configuration

use serde::Deserialize;

/// List box configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ListBoxConfig {
    /// Idle time after which the typeahead buffer starts over
    pub typeahead_timeout_ms: u64,
}

impl Default for ListBoxConfig {
    fn default() -> Self {
        Self {
            typeahead_timeout_ms: 1000,
        }
    }
}

/// Combobox configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ComboBoxConfig {
    /// Quiet period before a search query is fetched
    pub search_debounce_ms: u64,
}

impl Default for ComboBoxConfig {
    fn default() -> Self {
        Self {
            search_debounce_ms: 300,
        }
    }
}
