//! fOS Forms - validation
//!
//! A validator registry that reuses the callback grammar of `fos-runtime`,
//! per-element touched tracking, error display and the document listeners
//! that validate on change/input and block invalid submissions.

mod config;
mod validation;

pub use config::ValidationConfig;
pub use validation::{
    validator, Validation, ValidationError, Validator, ValidatorRegistry,
};
