//! Validation registry
//!
//! Validators are referenced from markup through the validation attribute
//! (`data-validate="no-red max-items (3)"`) using the same callback grammar as
//! event behaviors. A validation pass runs native constraint validation first
//! and then the element's validators in attribute order; the first message
//! wins and is displayed through `aria-invalid`, the custom validity message
//! and the error slot referenced by `aria-describedby`.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use fos_dom::{Document, DomTree, Event, ListenerOptions, NodeId, ScrollAlign, types};
use fos_runtime::{CallbackRegistry, CallbackToken};

use crate::config::ValidationConfig;

/// Validator referenced through the validation attribute.
///
/// Returns an error message, or `None` (or an empty string) when valid.
pub trait Validator {
    fn validate(
        &self,
        doc: &Document,
        element: NodeId,
        event: &Event,
        args: &[String],
    ) -> Option<String>;
}

impl<F> Validator for F
where
    F: Fn(&Document, NodeId, &Event, &[String]) -> Option<String>,
{
    fn validate(
        &self,
        doc: &Document,
        element: NodeId,
        event: &Event,
        args: &[String],
    ) -> Option<String> {
        self(doc, element, event, args)
    }
}

/// Wrap a closure as a shareable validator
pub fn validator<F>(f: F) -> Rc<dyn Validator>
where
    F: Fn(&Document, NodeId, &Event, &[String]) -> Option<String> + 'static,
{
    Rc::new(f)
}

pub type ValidatorRegistry = CallbackRegistry<dyn Validator>;

/// A failed validation pass
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub element: NodeId,
    pub message: String,
}

/// Validator registry plus per-element touched state
pub struct Validation {
    registry: Rc<ValidatorRegistry>,
    touched: RefCell<HashSet<NodeId>>,
    config: ValidationConfig,
}

impl Validation {
    pub fn new(config: ValidationConfig) -> Rc<Self> {
        Rc::new(Self {
            registry: Rc::new(ValidatorRegistry::new(config.attribute.clone())),
            touched: RefCell::new(HashSet::new()),
            config,
        })
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn registry(&self) -> &Rc<ValidatorRegistry> {
        &self.registry
    }

    /// Registration token for a validator
    pub fn create_validator(&self, id: &str, validator: Rc<dyn Validator>) -> CallbackToken<dyn Validator> {
        self.registry.create(id, validator)
    }

    /// Register a validator directly; false if `id` was taken
    pub fn add_validator(&self, id: &str, validator: Rc<dyn Validator>) -> bool {
        self.registry.add(id, validator)
    }

    /// Native control or element with validators
    pub fn is_validatable(&self, tree: &DomTree, element: NodeId) -> bool {
        tree.will_validate(element) || tree.has_attr(element, &self.config.attribute)
    }

    pub fn is_touched(&self, element: NodeId) -> bool {
        self.touched.borrow().contains(&element)
    }

    /// Drop per-element state for an unmounted element
    pub fn forget(&self, element: NodeId) {
        self.touched.borrow_mut().remove(&element);
    }

    /// Run a validation pass on `element` and display the outcome
    pub fn validate(
        &self,
        doc: &mut Document,
        element: NodeId,
        event: &Event,
    ) -> Result<(), ValidationError> {
        self.touched.borrow_mut().insert(element);
        let manual = doc.has_attr(element, &self.config.manual_attribute);
        if !manual {
            doc.set_custom_validity(element, "");
        }

        let message = self.first_failure(doc, element, event);
        match message {
            Some(message) => {
                tracing::debug!("{:?} invalid: {}", element, message);
                self.set_error(doc, element, &message);
                Err(ValidationError { element, message })
            }
            None => {
                if !manual {
                    self.set_error(doc, element, "");
                }
                Ok(())
            }
        }
    }

    fn first_failure(&self, doc: &mut Document, element: NodeId, event: &Event) -> Option<String> {
        if !doc.check_validity(element) {
            return Some(doc.validation_message(element));
        }
        let doc: &Document = doc;
        self.registry
            .iter(doc, element)
            .into_iter()
            .find_map(|bound| {
                bound
                    .behavior
                    .validate(doc, element, event, &bound.callback.args)
                    .filter(|message| !message.is_empty())
            })
    }

    /// Display `message` for `element`; an empty message clears the error
    pub fn set_error(&self, doc: &mut Document, element: NodeId, message: &str) {
        if message.is_empty() {
            doc.remove_attr(element, "aria-invalid");
        } else {
            doc.set_attr(element, "aria-invalid", "true");
        }
        doc.set_custom_validity(element, message);
        if let Some(slot) = self.error_slot(doc, element) {
            doc.set_text_content(slot, message);
        }
    }

    /// Current error message, if the element is marked invalid
    pub fn error(&self, tree: &DomTree, element: NodeId) -> Option<String> {
        if !tree.attr_is_true(element, "aria-invalid") {
            return None;
        }
        tree.element(element).map(|e| e.custom_validity.clone())
    }

    /// First `aria-describedby` target carrying the error slot marker
    pub fn error_slot(&self, tree: &DomTree, element: NodeId) -> Option<NodeId> {
        tree.attr(element, "aria-describedby")?
            .split_whitespace()
            .filter_map(|id| tree.get_element_by_id(id))
            .find(|&slot| tree.has_attr(slot, &self.config.error_slot_attribute))
    }

    /// Validate every validatable descendant of `form` and the form itself.
    ///
    /// Returns the first failure in tree order.
    pub fn validate_form(
        &self,
        doc: &mut Document,
        form: NodeId,
        event: &Event,
    ) -> Result<(), ValidationError> {
        let mut targets: Vec<NodeId> = doc
            .descendants(form)
            .into_iter()
            .filter(|&d| self.is_validatable(&doc.tree, d))
            .collect();
        targets.push(form);

        let mut first = None;
        for target in targets {
            if let Err(err) = self.validate(doc, target, event) {
                first.get_or_insert(err);
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// Clear touched state and errors below `form`
    pub fn reset(&self, doc: &mut Document, form: NodeId) {
        let mut targets = doc.descendants(form);
        targets.push(form);
        let mut touched = self.touched.borrow_mut();
        for target in targets {
            touched.remove(&target);
            if doc.is_element(target)
                && (doc.has_attr(target, "aria-invalid") || self.is_validatable(doc, target))
            {
                self.set_error(doc, target, "");
            }
        }
    }

    /// Install the document listeners (once per document)
    pub fn attach(self: &Rc<Self>, doc: &mut Document) {
        if !doc.once("validation") {
            return;
        }

        let this = Rc::downgrade(self);
        doc.add_event_listener(
            types::SUBMIT,
            ListenerOptions::capture(),
            Rc::new(move |doc: &mut Document, event: &mut Event| {
                if let Some(validation) = this.upgrade() {
                    validation.on_submit(doc, event);
                }
            }),
        );

        let this = Rc::downgrade(self);
        doc.add_event_listener(
            types::RESET,
            ListenerOptions::bubble(),
            Rc::new(move |doc: &mut Document, event: &mut Event| {
                if let (Some(validation), Some(form)) = (this.upgrade(), event.target) {
                    validation.reset(doc, form);
                }
            }),
        );

        self.listen_path(doc, types::CHANGE, false);
        self.listen_path(doc, types::INPUT, true);
        tracing::debug!("Validation listeners attached");
    }

    fn listen_path(self: &Rc<Self>, doc: &mut Document, event_type: &str, touched_only: bool) {
        let this: Weak<Self> = Rc::downgrade(self);
        doc.add_event_listener(
            event_type,
            ListenerOptions::bubble(),
            Rc::new(move |doc: &mut Document, event: &mut Event| {
                let (Some(validation), Some(target)) = (this.upgrade(), event.target) else {
                    return;
                };
                let path: Vec<NodeId> = doc
                    .composed_path(target)
                    .into_iter()
                    .filter(|&n| validation.is_validatable(&doc.tree, n))
                    .filter(|&n| !touched_only || validation.is_touched(n))
                    .collect();
                for node in path {
                    let _ = validation.validate(doc, node, event);
                }
            }),
        );
    }

    fn on_submit(&self, doc: &mut Document, event: &mut Event) {
        let Some(form) = event.target.filter(|&t| doc.tag(t) == Some("form")) else {
            return;
        };
        if let Err(err) = self.validate_form(doc, form, event) {
            tracing::debug!("Submission of {:?} blocked: {}", form, err);
            event.prevent_default();
            doc.focus(err.element, true);
            doc.scroll_into_view(form, err.element, ScrollAlign::Nearest);
        }
    }
}

impl std::fmt::Debug for Validation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validation")
            .field("registry", &self.registry)
            .field("touched", &self.touched.borrow().len())
            .finish()
    }
}
