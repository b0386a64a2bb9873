//! Dispatcher configuration

use serde::Deserialize;

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Event types observed in the capture phase; everything else is
    /// observed while bubbling
    pub capture_events: Vec<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            capture_events: [
                "beforetoggle",
                "toggle",
                "focus",
                "blur",
                "focusin",
                "focusout",
                "invalid",
                "scroll",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl DispatchConfig {
    pub fn captures(&self, event_type: &str) -> bool {
        self.capture_events.iter().any(|e| e == event_type)
    }
}
