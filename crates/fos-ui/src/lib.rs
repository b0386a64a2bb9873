//! fOS UI
//!
//! Behavior attachment for server-rendered widgets: one [`Ui`] wires
//! delegated dispatch, validation, list boxes and comboboxes onto a window.
//!
//! # Example
//! ```rust,ignore
//! use fos_ui::{Ui, UiConfig};
//!
//! let ui = Ui::from_markup(html, UiConfig::default())?;
//! let list = ui.element("sizes").unwrap();
//! ui.window().dispatch(list, &mut fos_ui::dom::Event::click());
//! println!("{:?}", ui.snapshot());
//! ```

mod config;
mod replay;
mod ui;

pub use config::{ConfigError, UiConfig};
pub use replay::{Replay, Report, Step, StepError, Submission};
pub use ui::{ListSnapshot, Ui};

// Re-export sub-crates
pub use fos_dom as dom;
pub use fos_forms as forms;
pub use fos_html as html;
pub use fos_listbox as listbox;
pub use fos_runtime as runtime;

pub use fos_forms::{Validation, ValidationConfig};
pub use fos_listbox::{ComboBox, ComboBoxConfig, ListBox, ListBoxConfig};
pub use fos_runtime::{DispatchConfig, Dispatcher, Window};

/// Version of the fOS UI runtime
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
