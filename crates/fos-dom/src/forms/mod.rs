//! Form Elements Module
//!
//! Constraint validation, form data collection, submit and reset.

mod form;
mod validation;

pub use form::FormData;
pub use validation::ValidityState;
