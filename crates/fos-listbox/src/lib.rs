//! fOS List Box - selectable list widgets
//!
//! Three layers over server-rendered list markup:
//!
//! - [`OptionList`]: highlight navigation (arrows, Home/End, typeahead)
//! - [`ListBox`]: the value set, single/multi semantics, hidden-input
//!   reconciliation and the required validator
//! - [`ComboBox`]: popover open/close, focus transfer and async filtering

mod combo_box;
mod config;
mod list_box;
mod option_list;

pub use combo_box::{ComboBox, FetchError, Parts};
pub use config::{ComboBoxConfig, ListBoxConfig};
pub use list_box::{PRESERVED, REQUIRED_VALIDATOR, ListBox, Reconciliation, Values, reconcile};
pub use option_list::{HIGHLIGHTED, ITEM_VALUE, ItemSelect, OptionList, is_selected, item_input};

/// Behavior ids to reference from `data-on-*` attributes
pub mod ids {
    pub use crate::combo_box::BEHAVIOR_ID as COMBOBOX;
    pub use crate::list_box::BEHAVIOR_ID as LISTBOX;
}
