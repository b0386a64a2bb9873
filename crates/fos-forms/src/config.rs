//! Validation configuration

use serde::Deserialize;

/// Attribute names the validation layer reads
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Attribute listing validator ids
    pub attribute: String,
    /// Opt-out from automatic error clearing
    pub manual_attribute: String,
    /// Marks the element that displays a control's error
    pub error_slot_attribute: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            attribute: "data-validate".to_string(),
            manual_attribute: "data-validate-manual".to_string(),
            error_slot_attribute: "data-error-slot".to_string(),
        }
    }
}
