//! Option list navigation
//!
//! Arrow-key, Home/End and typeahead navigation over the value-bearing
//! elements (`[data-value]`) of a list. The highlighted item carries
//! `data-highlighted` and is referenced by the list's `aria-activedescendant`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use fos_dom::{Document, DomTree, Event, Key, NodeId, ScrollAlign};

use crate::config::ListBoxConfig;

/// Marker attribute carrying an item's value
pub const ITEM_VALUE: &str = "data-value";
/// Marker attribute of the highlighted item
pub const HIGHLIGHTED: &str = "data-highlighted";

/// Selection hook invoked by Enter, Space and clicks
pub trait ItemSelect {
    fn select(&self, doc: &mut Document, list: NodeId, item: NodeId);
}

#[derive(Debug)]
struct Typeahead {
    buffer: String,
    last: f64,
}

impl Default for Typeahead {
    fn default() -> Self {
        Self {
            buffer: String::new(),
            last: f64::NEG_INFINITY,
        }
    }
}

/// Navigation state machine shared by list boxes and comboboxes
#[derive(Debug, Default)]
pub struct OptionList {
    config: ListBoxConfig,
    typeahead: RefCell<HashMap<NodeId, Typeahead>>,
    // scroll container -> latest target, flushed once per frame
    pending_scroll: Rc<RefCell<HashMap<NodeId, NodeId>>>,
}

impl OptionList {
    pub fn new(config: ListBoxConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Items of `list` in document order
    pub fn items(tree: &DomTree, list: NodeId) -> Vec<NodeId> {
        tree.query_all(list, |e| e.has_attr(ITEM_VALUE))
    }

    pub fn item_value(tree: &DomTree, item: NodeId) -> Option<&str> {
        tree.attr(item, ITEM_VALUE)
    }

    /// Item that owns `node` within `list`
    pub fn item_for(tree: &DomTree, list: NodeId, node: NodeId) -> Option<NodeId> {
        let item = tree.closest(node, |e| e.has_attr(ITEM_VALUE))?;
        (item != list && tree.contains(list, item)).then_some(item)
    }

    /// Visible label: `data-label`, else the whitespace-collapsed text
    pub fn label(tree: &DomTree, item: NodeId) -> String {
        if let Some(label) = tree.attr(item, "data-label") {
            return label.to_string();
        }
        tree.text_content(item)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_disabled(tree: &DomTree, item: NodeId) -> bool {
        tree.attr_is_true(item, "aria-disabled")
            || tree.has_attr(item, "disabled")
            || tree.has_attr(item, "hidden")
    }

    /// Items reachable by keyboard
    pub fn navigable(tree: &DomTree, list: NodeId) -> Vec<NodeId> {
        Self::items(tree, list)
            .into_iter()
            .filter(|&item| !Self::is_disabled(tree, item))
            .collect()
    }

    pub fn highlighted(tree: &DomTree, list: NodeId) -> Option<NodeId> {
        tree.query(list, |e| e.has_attr(HIGHLIGHTED))
    }

    /// Highlight `item` (or nothing), keeping at most one highlighted item
    pub fn highlight(&self, doc: &mut Document, list: NodeId, item: Option<NodeId>) {
        for previous in doc.query_all(list, |e| e.has_attr(HIGHLIGHTED)) {
            doc.remove_attr(previous, HIGHLIGHTED);
        }
        let Some(item) = item else {
            doc.remove_attr(list, "aria-activedescendant");
            return;
        };

        let id = match doc.attr(item, "id") {
            Some(id) => id.to_string(),
            None => {
                let id = doc.unique_id("option");
                doc.set_attr(item, "id", id.clone());
                id
            }
        };
        doc.set_attr(item, HIGHLIGHTED, "");
        doc.set_attr(list, "aria-activedescendant", id);
        self.schedule_scroll(doc, list, item);
    }

    /// Scroll `item` into view on the next frame, once per container
    fn schedule_scroll(&self, doc: &mut Document, container: NodeId, item: NodeId) {
        let first = self
            .pending_scroll
            .borrow_mut()
            .insert(container, item)
            .is_none();
        if !first {
            return;
        }
        let pending = Rc::clone(&self.pending_scroll);
        doc.request_animation_frame(Box::new(move |doc: &mut Document| {
            let target = pending.borrow_mut().remove(&container);
            if let Some(target) = target {
                doc.scroll_into_view(container, target, ScrollAlign::Nearest);
            }
        }));
    }

    pub fn highlight_first(&self, doc: &mut Document, list: NodeId) -> Option<NodeId> {
        let first = Self::navigable(doc, list).first().copied();
        self.highlight(doc, list, first);
        first
    }

    pub fn highlight_last(&self, doc: &mut Document, list: NodeId) -> Option<NodeId> {
        let last = Self::navigable(doc, list).last().copied();
        self.highlight(doc, list, last);
        last
    }

    /// Move the highlight one item forward or back, wrapping at the ends.
    ///
    /// With nothing highlighted the first (or last) item is taken, unless
    /// focus is keyboard-visible and an item is selected, in which case the
    /// move starts from the selected item.
    pub fn step(&self, doc: &mut Document, list: NodeId, forward: bool) -> Option<NodeId> {
        let tree = &doc.tree;
        let items = Self::navigable(tree, list);
        if items.is_empty() {
            return None;
        }
        let last = items.len() - 1;
        let from = Self::highlighted(tree, list).or_else(|| {
            if doc.focus_visible() {
                items.iter().copied().find(|&i| is_selected(tree, i))
            } else {
                None
            }
        });
        let index = match from.and_then(|f| items.iter().position(|&i| i == f)) {
            Some(i) if forward => if i == last { 0 } else { i + 1 },
            Some(i) => if i == 0 { last } else { i - 1 },
            None if forward => 0,
            None => last,
        };
        let next = items[index];
        self.highlight(doc, list, Some(next));
        Some(next)
    }

    /// Feed a typed character to the typeahead buffer and jump to the next
    /// item whose label starts with it
    pub fn typeahead(&self, doc: &mut Document, list: NodeId, ch: char, timestamp: f64) -> Option<NodeId> {
        let buffer = {
            let mut states = self.typeahead.borrow_mut();
            let state = states.entry(list).or_default();
            if timestamp - state.last > self.config.typeahead_timeout_ms as f64 {
                state.buffer.clear();
            }
            state.last = timestamp;
            state.buffer.extend(ch.to_lowercase());
            state.buffer.clone()
        };

        // Repeating one character cycles through items starting with it
        let mut chars = buffer.chars();
        let first = chars.next()?;
        let (needle, cycle) = if chars.all(|c| c == first) {
            (first.to_string(), true)
        } else {
            (buffer, false)
        };

        let tree = &doc.tree;
        let items = Self::navigable(tree, list);
        if items.is_empty() {
            return None;
        }
        let current = Self::highlighted(tree, list).and_then(|h| items.iter().position(|&i| i == h));
        let start = match current {
            Some(i) if cycle => i + 1,
            Some(i) => i,
            None => 0,
        };
        let found = (0..items.len())
            .map(|k| items[(start + k) % items.len()])
            .find(|&item| Self::label(tree, item).to_lowercase().starts_with(&needle))?;
        self.highlight(doc, list, Some(found));
        Some(found)
    }

    /// Handle a keydown for `list`; returns true if the key was consumed
    pub fn handle_keydown(
        &self,
        doc: &mut Document,
        event: &mut Event,
        list: NodeId,
        select: &dyn ItemSelect,
    ) -> bool {
        let Some(key) = event.key.clone() else {
            return false;
        };
        if event.modifiers.is_command() {
            return false;
        }
        let in_text_input = event.target.is_some_and(|t| is_text_input(&doc.tree, t));

        let consumed = match key {
            Key::ArrowDown => self.step(doc, list, true).is_some(),
            Key::ArrowUp => self.step(doc, list, false).is_some(),
            Key::Home => self.highlight_first(doc, list).is_some(),
            Key::End => self.highlight_last(doc, list).is_some(),
            Key::Enter => self.select_highlighted(doc, list, select),
            Key::Space if in_text_input => false,
            Key::Space => self.select_highlighted(doc, list, select),
            Key::Character(c) => {
                let timestamp = event.timestamp;
                self.typeahead(doc, list, c, timestamp);
                // Typed text still reaches the focused control
                return false;
            }
            _ => false,
        };
        if consumed {
            event.prevent_default();
        }
        consumed
    }

    fn select_highlighted(&self, doc: &mut Document, list: NodeId, select: &dyn ItemSelect) -> bool {
        match Self::highlighted(doc, list) {
            Some(item) => {
                select.select(doc, list, item);
                true
            }
            None => false,
        }
    }

    /// Handle a click inside `list`; returns the item selected
    pub fn handle_click(
        &self,
        doc: &mut Document,
        event: &Event,
        list: NodeId,
        select: &dyn ItemSelect,
    ) -> Option<NodeId> {
        let item = Self::item_for(doc, list, event.target?)?;
        if Self::is_disabled(doc, item) {
            return None;
        }
        self.highlight(doc, list, Some(item));
        select.select(doc, list, item);
        Some(item)
    }

    /// Forget per-list state for an unmounted list
    pub fn forget(&self, list: NodeId) {
        self.typeahead.borrow_mut().remove(&list);
        self.pending_scroll.borrow_mut().remove(&list);
    }
}

/// Form input carrying an item's checked state: the item itself if it is an
/// input, else its first non-hidden input
pub fn item_input(tree: &DomTree, item: NodeId) -> Option<NodeId> {
    if tree.tag(item) == Some("input") {
        return Some(item);
    }
    tree.query(item, |e| {
        e.tag == "input" && e.input_type().as_deref() != Some("hidden")
    })
}

/// Checked state of the item's input, else its `aria-selected`
pub fn is_selected(tree: &DomTree, item: NodeId) -> bool {
    match item_input(tree, item) {
        Some(input) => tree.checked(input),
        None => tree.attr_is_true(item, "aria-selected"),
    }
}

fn is_text_input(tree: &DomTree, node: NodeId) -> bool {
    match tree.tag(node) {
        Some("textarea") => true,
        Some("input") => matches!(
            tree.element(node).and_then(|e| e.input_type()).as_deref(),
            Some("text" | "search" | "email" | "url" | "tel" | "password")
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<NodeId>>);

    impl ItemSelect for Recorder {
        fn select(&self, _doc: &mut Document, _list: NodeId, item: NodeId) {
            self.0.borrow_mut().push(item);
        }
    }

    fn list(labels: &[&str]) -> (Document, NodeId, Vec<NodeId>) {
        let mut doc = Document::new();
        let body = doc.body();
        let list = doc.create_element("ul");
        doc.set_attr(list, "role", "listbox");
        doc.append_child(body, list).unwrap();
        let items = labels
            .iter()
            .map(|label| {
                let item = doc.create_element("li");
                doc.set_attr(item, "role", "option");
                doc.set_attr(item, ITEM_VALUE, label.to_lowercase());
                let text = doc.create_text(label);
                doc.append_child(item, text).unwrap();
                doc.append_child(list, item).unwrap();
                item
            })
            .collect();
        (doc, list, items)
    }

    #[test]
    fn test_step_wraps() {
        let (mut doc, list, items) = list(&["Apple", "Banana", "Orange"]);
        let nav = OptionList::default();

        assert_eq!(nav.step(&mut doc, list, false), Some(items[2]));
        assert_eq!(nav.step(&mut doc, list, true), Some(items[0]));
        assert_eq!(nav.step(&mut doc, list, true), Some(items[1]));
        assert_eq!(OptionList::highlighted(&doc, list), Some(items[1]));
        assert_eq!(doc.query_all(list, |e| e.has_attr(HIGHLIGHTED)).len(), 1);
    }

    #[test]
    fn test_highlight_assigns_ids() {
        let (mut doc, list, items) = list(&["Apple", "Banana"]);
        let nav = OptionList::default();
        nav.highlight(&mut doc, list, Some(items[1]));

        let id = doc.attr(items[1], "id").unwrap().to_string();
        assert_eq!(doc.attr(list, "aria-activedescendant"), Some(id.as_str()));

        nav.highlight(&mut doc, list, None);
        assert_eq!(doc.attr(list, "aria-activedescendant"), None);
        assert_eq!(OptionList::highlighted(&doc, list), None);
    }

    #[test]
    fn test_disabled_items_are_skipped() {
        let (mut doc, list, items) = list(&["Apple", "Banana", "Orange"]);
        doc.set_attr(items[1], "aria-disabled", "true");
        let nav = OptionList::default();

        nav.step(&mut doc, list, true);
        assert_eq!(nav.step(&mut doc, list, true), Some(items[2]));
    }

    #[test]
    fn test_typeahead_buffer_and_timeout() {
        let (mut doc, list, items) = list(&["Blueberry", "Banana", "Cherry", "Blackberry"]);
        let nav = OptionList::default();

        assert_eq!(nav.typeahead(&mut doc, list, 'b', 0.0), Some(items[0]));
        assert_eq!(nav.typeahead(&mut doc, list, 'a', 100.0), Some(items[1]));
        // Same letter again after the timeout cycles forward
        assert_eq!(nav.typeahead(&mut doc, list, 'b', 2000.0), Some(items[3]));
        assert_eq!(nav.typeahead(&mut doc, list, 'b', 2100.0), Some(items[0]));
        assert_eq!(nav.typeahead(&mut doc, list, 'x', 5000.0), None);
    }

    #[test]
    fn test_enter_selects_highlighted() {
        let (mut doc, list, items) = list(&["Apple", "Banana"]);
        let nav = OptionList::default();
        let recorder = Recorder::default();

        let mut enter = Event::keydown(Key::Enter);
        assert!(!nav.handle_keydown(&mut doc, &mut enter, list, &recorder));

        nav.step(&mut doc, list, true);
        let mut enter = Event::keydown(Key::Enter);
        enter.target = Some(list);
        assert!(nav.handle_keydown(&mut doc, &mut enter, list, &recorder));
        assert!(enter.is_default_prevented());
        assert_eq!(*recorder.0.borrow(), vec![items[0]]);
    }

    #[test]
    fn test_space_in_text_input_is_not_selection() {
        let (mut doc, list, _items) = list(&["Apple"]);
        let input = doc.create_element("input");
        doc.set_attr(input, "type", "search");
        let body = doc.body();
        doc.append_child(body, input).unwrap();
        let nav = OptionList::default();
        let recorder = Recorder::default();
        nav.step(&mut doc, list, true);

        let mut space = Event::keydown(Key::Space);
        space.target = Some(input);
        assert!(!nav.handle_keydown(&mut doc, &mut space, list, &recorder));
        assert!(recorder.0.borrow().is_empty());
    }

    #[test]
    fn test_scroll_is_batched_per_frame() {
        let (mut doc, list, items) = list(&["Apple", "Banana", "Orange"]);
        let nav = OptionList::default();
        nav.step(&mut doc, list, true);
        nav.step(&mut doc, list, true);
        nav.step(&mut doc, list, true);

        assert_eq!(doc.pending_frames(), 1);
        doc.run_animation_frame();
        let log = doc.take_scroll_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].target, items[2]);
        assert_eq!(log[0].align, ScrollAlign::Nearest);
    }

    #[test]
    fn test_click_selects_closest_item() {
        let (mut doc, list, items) = list(&["Apple", "Banana"]);
        let nav = OptionList::default();
        let recorder = Recorder::default();
        let text = doc.children(items[1])[0];

        let mut click = Event::click();
        click.target = Some(text);
        assert_eq!(nav.handle_click(&mut doc, &click, list, &recorder), Some(items[1]));

        click.target = Some(list);
        assert_eq!(nav.handle_click(&mut doc, &click, list, &recorder), None);
    }
}
