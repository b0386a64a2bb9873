//! Form owner, form data, submit and reset

use crate::{Document, DomTree, Event, NodeId};

/// Submitted name/value pairs in tree order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pub entries: Vec<(String, String)>,
}

impl FormData {
    /// First value for `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `name`
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DomTree {
    /// Form owning `id`: the `form` attribute target, else the nearest form ancestor
    pub fn form_owner(&self, id: NodeId) -> Option<NodeId> {
        if let Some(form_id) = self.attr(id, "form") {
            return self.get_element_by_id(form_id);
        }
        self.closest(id, |e| e.tag == "form")
    }

    /// Listed controls inside `form`
    pub fn form_controls(&self, form: NodeId) -> Vec<NodeId> {
        self.query_all(form, |e| {
            matches!(e.tag.as_str(), "input" | "select" | "textarea" | "button")
        })
    }

    /// Collect the entries `form` would submit
    pub fn form_data(&self, form: NodeId) -> FormData {
        let mut data = FormData::default();
        for control in self.form_controls(form) {
            let Some(el) = self.element(control) else {
                continue;
            };
            let Some(name) = el.get_attr("name") else {
                continue;
            };
            if el.has_attr("disabled") || el.tag == "button" {
                continue;
            }
            match el.input_type().as_deref() {
                Some("checkbox" | "radio") if !el.checked => continue,
                Some("submit" | "reset" | "button" | "image" | "file") => continue,
                _ => {}
            }
            data.entries.push((name.to_string(), self.value(control)));
        }
        data
    }

    /// Restore every control in `form` to its default state
    pub(crate) fn reset_controls(&mut self, form: NodeId) {
        for control in self.form_controls(form) {
            let default_checked = self.default_checked(control);
            if let Some(el) = self.element_mut(control) {
                el.checked = default_checked;
                el.dirty_value = None;
            }
        }
    }
}

impl Document {
    /// Fire `submit` at `form`; returns the form data unless a listener canceled it
    pub fn request_submit(&mut self, form: NodeId) -> Option<FormData> {
        let mut submit = Event::submit();
        if self.dispatch_event(form, &mut submit) {
            tracing::debug!("form {:?} submitted", form);
            Some(self.form_data(form))
        } else {
            tracing::debug!("form {:?} submission canceled", form);
            None
        }
    }

    /// Fire `reset` at `form`; the controls are restored as the default action
    pub fn reset(&mut self, form: NodeId) -> bool {
        let mut reset = Event::reset();
        self.dispatch_event(form, &mut reset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ListenerOptions;
    use std::rc::Rc;

    fn form_with_controls() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let form = doc.create_element("form");
        let body = doc.body();
        doc.append_child(body, form).unwrap();

        let check = doc.create_element("input");
        doc.set_attr(check, "type", "checkbox");
        doc.set_attr(check, "name", "color");
        doc.set_attr(check, "value", "red");
        doc.set_attr(check, "checked", "");
        doc.set_checked(check, true);
        doc.append_child(form, check).unwrap();

        let text = doc.create_element("input");
        doc.set_attr(text, "name", "note");
        doc.set_attr(text, "value", "hi");
        doc.append_child(form, text).unwrap();

        (doc, form, check, text)
    }

    #[test]
    fn test_form_data_skips_unchecked() {
        let (mut doc, form, check, _text) = form_with_controls();
        assert_eq!(doc.form_data(form).get("color"), Some("red"));

        doc.set_checked(check, false);
        let data = doc.form_data(form);
        assert_eq!(data.get("color"), None);
        assert_eq!(data.get("note"), Some("hi"));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let (mut doc, form, check, text) = form_with_controls();
        doc.set_checked(check, false);
        doc.set_value(text, "edited");

        assert!(doc.reset(form));
        assert!(doc.checked(check));
        assert_eq!(doc.value(text), "hi");
    }

    #[test]
    fn test_canceled_submit_returns_none() {
        let (mut doc, form, _check, _text) = form_with_controls();
        doc.add_event_listener(
            "submit",
            ListenerOptions::capture(),
            Rc::new(|_doc: &mut Document, ev: &mut Event| ev.prevent_default()),
        );
        assert_eq!(doc.request_submit(form), None);
    }

    #[test]
    fn test_form_owner_by_attribute() {
        let (mut doc, form, _check, _text) = form_with_controls();
        doc.set_attr(form, "id", "order");
        let outside = doc.create_element("input");
        doc.set_attr(outside, "form", "order");
        let body = doc.body();
        doc.append_child(body, outside).unwrap();

        assert_eq!(doc.form_owner(outside), Some(form));
    }
}
