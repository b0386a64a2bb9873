//! Form Validation
//!
//! Constraint Validation API implementation.

use crate::dom_events::types;
use crate::{Document, DomTree, Event, NodeId};

/// Validity state for form controls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidityState {
    /// The element's value is missing (for required)
    pub value_missing: bool,
    /// The element's value doesn't match the type
    pub type_mismatch: bool,
    /// The element's value is too long
    pub too_long: bool,
    /// The element's value is too short
    pub too_short: bool,
    /// Custom validity message set
    pub custom_error: bool,
    custom_message: String,
}

impl ValidityState {
    /// Check if all constraints are satisfied
    pub fn is_valid(&self) -> bool {
        !self.value_missing
            && !self.type_mismatch
            && !self.too_long
            && !self.too_short
            && !self.custom_error
    }

    /// Set custom error message
    pub fn set_custom_validity(&mut self, message: &str) {
        self.custom_message = message.to_string();
        self.custom_error = !message.is_empty();
    }

    /// Get validation message
    pub fn validation_message(&self) -> String {
        if !self.custom_message.is_empty() {
            return self.custom_message.clone();
        }

        if self.value_missing {
            return "Please fill out this field.".to_string();
        }

        if self.type_mismatch {
            return "Please enter a valid value.".to_string();
        }

        if self.too_long {
            return "Please shorten this text.".to_string();
        }

        if self.too_short {
            return "Please lengthen this text.".to_string();
        }

        String::new()
    }
}

impl DomTree {
    /// Whether `id` takes part in constraint validation
    pub fn will_validate(&self, id: NodeId) -> bool {
        let Some(el) = self.element(id) else {
            return false;
        };
        if el.has_attr("disabled") || el.has_attr("readonly") {
            return false;
        }
        match el.tag.as_str() {
            "select" | "textarea" => true,
            "input" => !matches!(
                el.input_type().as_deref(),
                Some("hidden" | "submit" | "reset" | "button" | "image")
            ),
            _ => false,
        }
    }

    /// Compute the validity state of `id`.
    ///
    /// Any element can carry a custom validity message; built-in
    /// constraints only apply to elements that `will_validate`.
    pub fn validity(&self, id: NodeId) -> ValidityState {
        let mut state = ValidityState::default();
        let Some(el) = self.element(id) else {
            return state;
        };
        if !el.custom_validity.is_empty() {
            state.set_custom_validity(&el.custom_validity);
        }
        if !self.will_validate(id) {
            return state;
        }

        let required = el.has_attr("required");
        match el.input_type().as_deref() {
            Some("checkbox") => {
                state.value_missing = required && !el.checked;
            }
            Some("radio") => {
                state.value_missing = required && !self.radio_group_checked(id);
            }
            input_type => {
                let value = self.value(id);
                if required && value.is_empty() {
                    state.value_missing = true;
                }
                if !value.is_empty() {
                    let len = value.chars().count();
                    if let Some(min) = el.get_attr("minlength").and_then(|m| m.parse::<usize>().ok()) {
                        state.too_short = len < min;
                    }
                    if let Some(max) = el.get_attr("maxlength").and_then(|m| m.parse::<usize>().ok()) {
                        state.too_long = len > max;
                    }
                    if input_type == Some("email") && !is_valid_email(&value) {
                        state.type_mismatch = true;
                    }
                }
            }
        }
        state
    }

    fn radio_group_checked(&self, id: NodeId) -> bool {
        let Some(name) = self.attr(id, "name") else {
            return self.checked(id);
        };
        let scope = self.form_owner(id).unwrap_or(NodeId::ROOT);
        self.query_all(scope, |e| {
            e.input_type().as_deref() == Some("radio") && e.get_attr("name") == Some(name)
        })
        .into_iter()
        .any(|r| self.checked(r))
    }

    /// Install (or clear, with "") the custom validity message
    pub fn set_custom_validity(&mut self, id: NodeId, message: &str) {
        if let Some(el) = self.element_mut(id) {
            el.custom_validity = message.to_string();
        }
    }

    pub fn validation_message(&self, id: NodeId) -> String {
        self.validity(id).validation_message()
    }
}

impl Document {
    /// Check validity, firing `invalid` at the element when it fails
    pub fn check_validity(&mut self, id: NodeId) -> bool {
        let valid = self.validity(id).is_valid();
        if !valid {
            let mut invalid = Event::new(types::INVALID);
            self.dispatch_event(id, &mut invalid);
        }
        valid
    }
}

fn is_valid_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(doc: &mut Document, attrs: &[(&str, &str)]) -> NodeId {
        let id = doc.create_element("input");
        for (name, value) in attrs {
            doc.set_attr(id, name, *value);
        }
        let body = doc.body();
        doc.append_child(body, id).unwrap();
        id
    }

    #[test]
    fn test_validity_state_invalid() {
        let state = ValidityState {
            value_missing: true,
            ..Default::default()
        };
        assert!(!state.is_valid());
        assert_eq!(state.validation_message(), "Please fill out this field.");
    }

    #[test]
    fn test_custom_message_wins() {
        let mut state = ValidityState {
            value_missing: true,
            ..Default::default()
        };
        state.set_custom_validity("Pick another one.");
        assert_eq!(state.validation_message(), "Pick another one.");
    }

    #[test]
    fn test_required_text() {
        let mut doc = Document::new();
        let name = input(&mut doc, &[("required", "")]);
        assert!(doc.validity(name).value_missing);

        doc.set_value(name, "Ada");
        assert!(doc.check_validity(name));
    }

    #[test]
    fn test_length_and_email() {
        let mut doc = Document::new();
        let email = input(&mut doc, &[("type", "email"), ("minlength", "6")]);
        doc.set_value(email, "a@b");
        let state = doc.validity(email);
        assert!(state.type_mismatch);
        assert!(state.too_short);

        doc.set_value(email, "ada@example.org");
        assert!(doc.validity(email).is_valid());
    }

    #[test]
    fn test_required_radio_group() {
        let mut doc = Document::new();
        let a = input(&mut doc, &[("type", "radio"), ("name", "size"), ("required", "")]);
        let b = input(&mut doc, &[("type", "radio"), ("name", "size")]);
        assert!(doc.validity(a).value_missing);

        doc.set_checked(b, true);
        assert!(doc.validity(a).is_valid());
    }

    #[test]
    fn test_disabled_and_hidden_do_not_validate() {
        let mut doc = Document::new();
        let hidden = input(&mut doc, &[("type", "hidden"), ("required", "")]);
        let disabled = input(&mut doc, &[("required", ""), ("disabled", "")]);
        assert!(doc.validity(hidden).is_valid());
        assert!(doc.validity(disabled).is_valid());
    }

    #[test]
    fn test_custom_validity_on_plain_element() {
        let mut doc = Document::new();
        let list = doc.create_element("div");
        doc.set_custom_validity(list, "Don't pick red.");
        assert!(!doc.validity(list).is_valid());
        doc.set_custom_validity(list, "");
        assert!(doc.validity(list).is_valid());
    }
}
