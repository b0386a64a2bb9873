//! List box selection
//!
//! Adds a value set to [`OptionList`] navigation. Items carry their selection
//! in a checkbox/radio input when they have one, otherwise in
//! `aria-selected`. Values whose item is no longer rendered (after a search
//! replaced the options) are kept as hidden inputs so the form still submits
//! the logical value set.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::{Rc, Weak};

use fos_dom::{Document, DomError, DomTree, Event, Fragment, ListenerOptions, NodeId, types};
use fos_forms::{Validation, validator};
use fos_runtime::{Cx, Dispatcher};

use crate::config::ListBoxConfig;
use crate::option_list::{ItemSelect, OptionList, is_selected, item_input};

/// Selected values of a list
pub type Values = BTreeSet<String>;

/// Marker for hidden inputs holding values whose item is not rendered
pub const PRESERVED: &str = "data-listbox-preserved";

/// Behavior id bound through `data-on-keydown` / `data-on-click` / `data-on-focusin`
pub const BEHAVIOR_ID: &str = "listbox";
/// Validator id reporting an empty required list
pub const REQUIRED_VALIDATOR: &str = "listbox-required";

const REQUIRED_MESSAGE: &str = "Please fill out this field.";

type ValuesListener = Rc<dyn Fn(&mut Document, NodeId, &Values)>;

/// Hidden-input changes that keep form data equal to the logical values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Values that need a new hidden input
    pub materialize: Vec<String>,
    /// Values whose hidden input must go
    pub release: Vec<String>,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.materialize.is_empty() && self.release.is_empty()
    }
}

/// Diff the logical value set against what the rendered items and the
/// existing hidden inputs already submit.
///
/// A value with a rendered item is carried by that item; every other logical
/// value needs exactly one hidden input.
pub fn reconcile(logical: &Values, rendered: &Values, preserved: &Values) -> Reconciliation {
    let needed: Values = logical.difference(rendered).cloned().collect();
    Reconciliation {
        materialize: needed.difference(preserved).cloned().collect(),
        release: preserved.difference(&needed).cloned().collect(),
    }
}

/// Selection-set control shared by every list box in a document
pub struct ListBox {
    nav: OptionList,
    controlled: RefCell<HashSet<NodeId>>,
    listeners: RefCell<Vec<ValuesListener>>,
}

impl ListBox {
    pub fn new(config: ListBoxConfig) -> Rc<Self> {
        Rc::new(Self {
            nav: OptionList::new(config),
            controlled: RefCell::new(HashSet::new()),
            listeners: RefCell::new(Vec::new()),
        })
    }

    pub fn nav(&self) -> &OptionList {
        &self.nav
    }

    /// Register the `listbox` behaviors and the required validator
    pub fn install(self: &Rc<Self>, dispatcher: &Rc<Dispatcher>, validation: &Validation) {
        let this = Rc::downgrade(self);
        dispatcher.on(types::KEYDOWN, BEHAVIOR_ID, move |cx: &mut Cx<'_>, list, _args| {
            if let Some(this) = this.upgrade() {
                this.nav.handle_keydown(cx.doc, cx.event, list, &*this);
            }
        });

        let this = Rc::downgrade(self);
        dispatcher.on(types::CLICK, BEHAVIOR_ID, move |cx: &mut Cx<'_>, list, _args| {
            if let Some(this) = this.upgrade() {
                this.nav.handle_click(cx.doc, cx.event, list, &*this);
            }
        });

        dispatcher.on(types::FOCUSIN, BEHAVIOR_ID, |cx: &mut Cx<'_>, list, _args| {
            Self::sync(cx.doc, list);
        });

        validation.add_validator(
            REQUIRED_VALIDATOR,
            validator(|doc: &Document, element, _event: &Event, _args: &[String]| {
                let list = Self::list_elm(doc, element)?;
                (Self::is_required(doc, list) && Self::values(doc, list).is_empty())
                    .then(|| REQUIRED_MESSAGE.to_string())
            }),
        );
        tracing::debug!("List box behaviors installed");
    }

    /// Install the form reset listener (once per document)
    pub fn attach(self: &Rc<Self>, doc: &mut Document) {
        if !doc.once("listbox") {
            return;
        }
        let this: Weak<Self> = Rc::downgrade(self);
        doc.add_event_listener(
            types::RESET,
            ListenerOptions::bubble(),
            Rc::new(move |doc: &mut Document, event: &mut Event| {
                let Some(form) = event.target else {
                    return;
                };
                let lists = doc.query_all(form, |e| e.get_attr("role") == Some("listbox"));
                if lists.is_empty() {
                    return;
                }
                // Controls are restored by the default action, after listeners
                let this = this.clone();
                doc.queue_microtask(Box::new(move |doc: &mut Document| {
                    if let Some(this) = this.upgrade() {
                        for list in lists {
                            this.after_reset(doc, list);
                        }
                    }
                }));
            }),
        );
    }

    fn after_reset(&self, doc: &mut Document, list: NodeId) {
        for input in Self::preserved_inputs(doc, list) {
            doc.remove(input);
        }
        // Items without a backing control have no default to restore
        for item in OptionList::items(doc, list) {
            if item_input(doc, item).is_none() {
                doc.set_attr(item, "aria-selected", "false");
            }
        }
        Self::sync(doc, list);
        self.nav.highlight(doc, list, None);
        let values = Self::values(doc, list);
        tracing::debug!("List {:?} reset to {:?}", list, values);
        self.notify(doc, list, &values);
    }

    pub fn is_multiple(tree: &DomTree, list: NodeId) -> bool {
        tree.attr_is_true(list, "aria-multiselectable")
    }

    pub fn is_required(tree: &DomTree, list: NodeId) -> bool {
        tree.attr_is_true(list, "aria-required") || tree.has_attr(list, "required")
    }

    /// The list associated with `element`: itself, an enclosing list, the
    /// `aria-controls` target, or the list inside an enclosing combobox
    pub fn list_elm(tree: &DomTree, element: NodeId) -> Option<NodeId> {
        let is_list = |e: &fos_dom::ElementData| e.get_attr("role") == Some("listbox");
        if let Some(list) = tree.closest(element, is_list) {
            return Some(list);
        }
        if let Some(list) = tree
            .attr(element, "aria-controls")
            .and_then(|id| tree.get_element_by_id(id))
            .filter(|&target| tree.attr(target, "role") == Some("listbox"))
        {
            return Some(list);
        }
        let root = tree.closest(element, |e| e.has_attr("data-combobox"))?;
        tree.query(root, is_list)
    }

    /// Logical values: selected rendered items plus preserved hidden inputs
    pub fn values(tree: &DomTree, list: NodeId) -> Values {
        let mut values: Values = OptionList::items(tree, list)
            .into_iter()
            .filter(|&item| is_selected(tree, item))
            .filter_map(|item| OptionList::item_value(tree, item).map(str::to_string))
            .collect();
        values.extend(Self::preserved_values(tree, list));
        values
    }

    /// Labels of the selected values in display order
    pub fn labels(tree: &DomTree, list: NodeId) -> Vec<String> {
        let mut labels: Vec<String> = OptionList::items(tree, list)
            .into_iter()
            .filter(|&item| is_selected(tree, item))
            .map(|item| OptionList::label(tree, item))
            .collect();
        labels.extend(Self::preserved_inputs(tree, list).into_iter().map(|input| {
            tree.attr(input, "data-label")
                .or_else(|| tree.attr(input, "value"))
                .unwrap_or_default()
                .to_string()
        }));
        labels
    }

    pub fn set_controlled(&self, list: NodeId, controlled: bool) {
        let mut set = self.controlled.borrow_mut();
        if controlled {
            set.insert(list);
        } else {
            set.remove(&list);
        }
    }

    pub fn is_controlled(&self, list: NodeId) -> bool {
        self.controlled.borrow().contains(&list)
    }

    /// Observe value changes; also called with the unchanged set when a
    /// selection was refused
    pub fn on_values(&self, f: impl Fn(&mut Document, NodeId, &Values) + 'static) {
        self.listeners.borrow_mut().push(Rc::new(f));
    }

    fn notify(&self, doc: &mut Document, list: NodeId, values: &Values) {
        let listeners = self.listeners.borrow().clone();
        for listener in listeners {
            listener(doc, list, values);
        }
    }

    /// Toggle (multi) or set (single) the value of `item`
    pub fn select(&self, doc: &mut Document, list: NodeId, item: NodeId) {
        if OptionList::is_disabled(doc, item) {
            return;
        }
        let Some(value) = OptionList::item_value(doc, item).map(str::to_string) else {
            return;
        };
        let multiple = Self::is_multiple(doc, list);
        let required = Self::is_required(doc, list);
        let current = Self::values(doc, list);

        let mut next = current.clone();
        if multiple {
            if !next.remove(&value) {
                next.insert(value);
            }
        } else {
            let sole = current.len() == 1 && current.contains(&value);
            next.clear();
            if !sole {
                next.insert(value);
            }
        }

        if next.is_empty() && (required || !multiple) {
            tracing::trace!("List {:?} keeps its last value", list);
            self.notify(doc, list, &current);
            return;
        }
        if self.is_controlled(list) {
            self.notify(doc, list, &next);
            return;
        }
        self.commit(doc, list, &next);
    }

    /// Empty the value set; false for required lists
    pub fn clear(&self, doc: &mut Document, list: NodeId) -> bool {
        if Self::is_required(doc, list) {
            return false;
        }
        let next = Values::new();
        if self.is_controlled(list) {
            self.notify(doc, list, &next);
        } else {
            self.commit(doc, list, &next);
        }
        true
    }

    fn commit(&self, doc: &mut Document, list: NodeId, values: &Values) {
        Self::set_values(doc, list, values);
        tracing::debug!("List {:?} values {:?}", list, values);
        self.notify(doc, list, values);
        let mut change = Event::change();
        doc.dispatch_event(list, &mut change);
    }

    /// Project `values` onto the items and hidden inputs without notifying
    pub fn set_values(doc: &mut Document, list: NodeId, values: &Values) {
        let name = Self::input_name(doc, list);
        let labels = Self::known_labels(doc, list);
        for item in OptionList::items(doc, list) {
            let on = OptionList::item_value(doc, item).is_some_and(|v| values.contains(v));
            if let Some(input) = item_input(doc, item) {
                doc.set_checked(input, on);
            }
            doc.set_attr(item, "aria-selected", if on { "true" } else { "false" });
        }
        Self::sync_preserved(doc, list, values, name.as_deref(), &labels);
    }

    /// Mirror each item's checked state to `aria-selected`
    pub fn sync(doc: &mut Document, list: NodeId) {
        for item in OptionList::items(doc, list) {
            if item_input(doc, item).is_none() {
                continue;
            }
            let on = is_selected(doc, item);
            doc.set_attr(item, "aria-selected", if on { "true" } else { "false" });
        }
    }

    /// Swap the rendered options for `fragment`, keeping the logical values.
    ///
    /// Returns the new items.
    pub fn replace_options(
        &self,
        doc: &mut Document,
        list: NodeId,
        fragment: &Fragment,
    ) -> Result<Vec<NodeId>, DomError> {
        doc.get(list).ok_or(DomError::MissingNode(list))?;
        if !doc.is_element(list) {
            return Err(DomError::NotAnElement(list));
        }
        let logical = Self::values(doc, list);
        let name = Self::input_name(doc, list);
        let labels = Self::known_labels(doc, list);

        self.nav.highlight(doc, list, None);
        for child in doc.children(list).to_vec() {
            if !doc.has_attr(child, PRESERVED) {
                doc.remove(child);
            }
        }
        for root in doc.import(fragment) {
            doc.append_child(list, root)?;
        }

        let items = OptionList::items(doc, list);
        for &item in &items {
            let on = OptionList::item_value(doc, item).is_some_and(|v| logical.contains(v));
            if let Some(input) = item_input(doc, item) {
                doc.set_checked(input, on);
            }
            doc.set_attr(item, "aria-selected", if on { "true" } else { "false" });
        }
        Self::sync_preserved(doc, list, &logical, name.as_deref(), &labels);
        tracing::debug!("List {:?} options replaced ({} items)", list, items.len());
        Ok(items)
    }

    fn sync_preserved(
        doc: &mut Document,
        list: NodeId,
        logical: &Values,
        name: Option<&str>,
        labels: &HashMap<String, String>,
    ) {
        let rendered: Values = OptionList::items(doc, list)
            .into_iter()
            .filter_map(|item| OptionList::item_value(doc, item).map(str::to_string))
            .collect();
        let preserved = Self::preserved_values(doc, list);
        let plan = reconcile(logical, &rendered, &preserved);
        if plan.is_empty() {
            return;
        }

        for input in Self::preserved_inputs(doc, list) {
            let released = doc
                .attr(input, "value")
                .is_some_and(|v| plan.release.iter().any(|r| r == v));
            if released {
                doc.remove(input);
            }
        }
        for value in &plan.materialize {
            let input = doc.create_element("input");
            doc.set_attr(input, "type", "hidden");
            doc.set_attr(input, PRESERVED, "");
            if let Some(name) = name {
                doc.set_attr(input, "name", name);
            }
            doc.set_attr(input, "value", value.as_str());
            if let Some(label) = labels.get(value) {
                doc.set_attr(input, "data-label", label.as_str());
            }
            // A freshly created element is always detached
            let _ = doc.append_child(list, input);
        }
        tracing::trace!("List {:?} reconciled: {:?}", list, plan);
    }

    fn preserved_inputs(tree: &DomTree, list: NodeId) -> Vec<NodeId> {
        tree.query_all(list, |e| e.tag == "input" && e.has_attr(PRESERVED))
    }

    fn preserved_values(tree: &DomTree, list: NodeId) -> Values {
        Self::preserved_inputs(tree, list)
            .into_iter()
            .filter_map(|input| tree.attr(input, "value").map(str::to_string))
            .collect()
    }

    /// Submission name: the list's `data-name`, an item input's name, or an
    /// existing hidden input's name
    fn input_name(tree: &DomTree, list: NodeId) -> Option<String> {
        if let Some(name) = tree.attr(list, "data-name") {
            return Some(name.to_string());
        }
        OptionList::items(tree, list)
            .into_iter()
            .filter_map(|item| item_input(tree, item))
            .chain(Self::preserved_inputs(tree, list))
            .find_map(|input| tree.attr(input, "name").map(str::to_string))
    }

    fn known_labels(tree: &DomTree, list: NodeId) -> HashMap<String, String> {
        let mut labels: HashMap<String, String> = Self::preserved_inputs(tree, list)
            .into_iter()
            .filter_map(|input| {
                let value = tree.attr(input, "value")?;
                let label = tree.attr(input, "data-label").unwrap_or(value);
                Some((value.to_string(), label.to_string()))
            })
            .collect();
        for item in OptionList::items(tree, list) {
            if let Some(value) = OptionList::item_value(tree, item) {
                labels.insert(value.to_string(), OptionList::label(tree, item));
            }
        }
        labels
    }
}

impl ItemSelect for ListBox {
    fn select(&self, doc: &mut Document, list: NodeId, item: NodeId) {
        ListBox::select(self, doc, list, item);
    }
}

impl std::fmt::Debug for ListBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListBox")
            .field("nav", &self.nav)
            .field("controlled", &self.controlled.borrow().len())
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}
