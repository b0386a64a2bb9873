//! UI configuration

use fos_forms::ValidationConfig;
use fos_listbox::{ComboBoxConfig, ListBoxConfig};
use fos_runtime::DispatchConfig;
use serde::Deserialize;

/// Configuration for every behavior installed by [`crate::Ui`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub dispatch: DispatchConfig,
    pub list_box: ListBoxConfig,
    pub combo_box: ComboBoxConfig,
    pub validation: ValidationConfig,
}

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

impl UiConfig {
    /// Load from JSON; missing sections and fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
