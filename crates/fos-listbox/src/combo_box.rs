//! Combobox / select
//!
//! A `[data-combobox]` root groups a `role=combobox` trigger, a `[popover]`
//! holding the `role=listbox` list and an optional `input[data-filter]`. The
//! root carries the `combobox` behavior for keydown, click, focusout, toggle
//! and input; the list box underneath keeps the value set.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::{Rc, Weak};
use std::time::Duration;

use fos_dom::{Document, DomTree, Event, Fragment, Key, NodeId, types};
use fos_runtime::{Cx, DebounceError, DebounceNext, Dispatcher, WindowHandle};

use crate::config::ComboBoxConfig;
use crate::list_box::{ListBox, Values};
use crate::option_list::{OptionList, is_selected};

/// Behavior id bound on the combobox root
pub const BEHAVIOR_ID: &str = "combobox";

/// Failure reported by an option source
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Option source failed: {0}")]
    Source(String),
}

/// Elements making up one combobox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parts {
    pub root: NodeId,
    pub trigger: Option<NodeId>,
    pub popover: Option<NodeId>,
    pub list: Option<NodeId>,
    pub filter: Option<NodeId>,
}

impl Parts {
    pub fn find(tree: &DomTree, root: NodeId) -> Self {
        Self {
            root,
            trigger: tree.query(root, |e| e.get_attr("role") == Some("combobox")),
            popover: tree.query(root, |e| e.has_attr("popover")),
            list: tree.query(root, |e| e.get_attr("role") == Some("listbox")),
            filter: tree.query(root, |e| e.tag == "input" && e.has_attr("data-filter")),
        }
    }

    /// Whether `node` lies inside the trigger or the popover
    fn owns(&self, tree: &DomTree, node: NodeId) -> bool {
        [self.trigger, self.popover]
            .into_iter()
            .flatten()
            .any(|part| tree.contains(part, node))
    }
}

type SearchResult = Result<Fragment, DebounceError<FetchError>>;

struct Source {
    search: DebounceNext<String, Fragment, FetchError>,
}

/// Popover orchestration and async filtering on top of [`ListBox`]
pub struct ComboBox {
    window: WindowHandle,
    list_box: Rc<ListBox>,
    config: ComboBoxConfig,
    sources: RefCell<HashMap<NodeId, Rc<Source>>>,
    // latest issued query per root, kept across source swaps
    searches: RefCell<HashMap<NodeId, u64>>,
}

impl ComboBox {
    pub fn new(window: &WindowHandle, list_box: Rc<ListBox>, config: ComboBoxConfig) -> Rc<Self> {
        Rc::new(Self {
            window: window.clone(),
            list_box,
            config,
            sources: RefCell::new(HashMap::new()),
            searches: RefCell::new(HashMap::new()),
        })
    }

    pub fn list_box(&self) -> &Rc<ListBox> {
        &self.list_box
    }

    /// Register the `combobox` behaviors and the value listener
    pub fn install(self: &Rc<Self>, dispatcher: &Rc<Dispatcher>) {
        let this = Rc::downgrade(self);
        dispatcher.on(types::KEYDOWN, BEHAVIOR_ID, move |cx: &mut Cx<'_>, root, _args| {
            if let Some(this) = this.upgrade() {
                this.on_keydown(cx.doc, cx.event, root);
            }
        });
        let this = Rc::downgrade(self);
        dispatcher.on(types::CLICK, BEHAVIOR_ID, move |cx: &mut Cx<'_>, root, _args| {
            if let Some(this) = this.upgrade() {
                this.on_click(cx.doc, cx.event, root);
            }
        });
        dispatcher.on(types::TOGGLE, BEHAVIOR_ID, |cx: &mut Cx<'_>, root, _args| {
            Self::on_toggle(cx.doc, cx.event, root);
        });
        dispatcher.on(types::FOCUSOUT, BEHAVIOR_ID, |cx: &mut Cx<'_>, root, _args| {
            Self::on_focusout(cx.doc, cx.event, root);
        });
        let this = Rc::downgrade(self);
        dispatcher.on(types::INPUT, BEHAVIOR_ID, move |cx: &mut Cx<'_>, root, _args| {
            if let Some(this) = this.upgrade() {
                this.on_input(cx.doc, cx.event, root);
            }
        });

        self.list_box.on_values(|doc: &mut Document, list: NodeId, values: &Values| {
            if let Some(root) = doc.closest(list, |e| e.has_attr("data-combobox")) {
                Self::on_values(doc, root, list, values);
            }
        });
        tracing::debug!("Combobox behaviors installed");
    }

    pub fn is_open(doc: &Document, root: NodeId) -> bool {
        Parts::find(doc, root)
            .popover
            .is_some_and(|p| doc.popover_open(p))
    }

    fn on_keydown(&self, doc: &mut Document, event: &mut Event, root: NodeId) {
        let parts = Parts::find(doc, root);
        let (Some(list), Some(popover)) = (parts.list, parts.popover) else {
            return;
        };
        let Some(key) = event.key.clone() else {
            return;
        };

        if doc.popover_open(popover) {
            // Characters typed into the filter feed the search, not typeahead
            let typing = matches!(key, Key::Character(_))
                && parts.filter.is_some()
                && event.target == parts.filter;
            if !typing {
                // Escape falls through to the light-dismiss default action
                self.list_box.nav().handle_keydown(doc, event, list, &*self.list_box);
            }
        } else {
            match key {
                Key::Escape => {
                    // Without a value the key belongs to whatever encloses us
                    if !ListBox::values(doc, list).is_empty() && self.list_box.clear(doc, list) {
                        event.prevent_default();
                        event.stop_propagation();
                    }
                }
                Key::ArrowDown | Key::ArrowUp | Key::Enter => {
                    event.prevent_default();
                    self.open_with(doc, &parts, &key, event.timestamp);
                }
                ref printable if printable.is_printable() && !event.modifiers.is_command() => {
                    self.open_with(doc, &parts, &key, event.timestamp);
                }
                _ => {}
            }
        }
        Self::mirror_active(doc, &parts);
    }

    /// Open the popover in response to `key`
    fn open_with(&self, doc: &mut Document, parts: &Parts, key: &Key, timestamp: f64) {
        let (Some(list), Some(popover)) = (parts.list, parts.popover) else {
            return;
        };
        doc.show_popover(popover);
        let nav = self.list_box.nav();
        match key {
            Key::ArrowUp => {
                nav.highlight_last(doc, list);
            }
            Key::ArrowDown if OptionList::highlighted(doc, list).is_none() => {
                let selected = if ListBox::is_multiple(doc, list) {
                    None
                } else {
                    let tree = &doc.tree;
                    OptionList::navigable(tree, list)
                        .into_iter()
                        .find(|&item| is_selected(tree, item))
                };
                match selected {
                    Some(item) => nav.highlight(doc, list, Some(item)),
                    None => {
                        nav.highlight_first(doc, list);
                    }
                }
            }
            Key::Character(c) if parts.filter.is_none() => {
                nav.typeahead(doc, list, *c, timestamp);
            }
            _ => {}
        }
        if let Some(filter) = parts.filter {
            doc.focus(filter, true);
        }
    }

    fn on_click(&self, doc: &mut Document, event: &mut Event, root: NodeId) {
        let parts = Parts::find(doc, root);
        let Some(target) = event.target else {
            return;
        };
        if let Some(list) = parts.list {
            if OptionList::item_for(doc, list, target).is_some() {
                self.list_box.nav().handle_click(doc, event, list, &*self.list_box);
                Self::mirror_active(doc, &parts);
                return;
            }
        }
        if let (Some(trigger), Some(popover)) = (parts.trigger, parts.popover) {
            if doc.contains(trigger, target) {
                doc.toggle_popover(popover);
            }
        }
    }

    fn on_toggle(doc: &mut Document, event: &mut Event, root: NodeId) {
        let parts = Parts::find(doc, root);
        let Some(popover) = parts.popover.filter(|&p| event.target == Some(p)) else {
            return;
        };
        let open = event.new_state.as_deref() == Some("open");
        if let Some(trigger) = parts.trigger {
            doc.set_attr(trigger, "aria-expanded", if open { "true" } else { "false" });
        }
        if open {
            return;
        }
        if let Some(list) = parts.list {
            for item in doc.query_all(list, |e| e.has_attr(crate::option_list::HIGHLIGHTED)) {
                doc.remove_attr(item, crate::option_list::HIGHLIGHTED);
            }
            doc.remove_attr(list, "aria-activedescendant");
        }
        Self::mirror_active(doc, &parts);
        let focus_inside = doc
            .active_element()
            .is_some_and(|active| doc.tree.contains(popover, active));
        if let (true, Some(trigger)) = (focus_inside, parts.trigger) {
            let visible = doc.focus_visible();
            doc.focus(trigger, visible);
        }
    }

    fn on_focusout(doc: &mut Document, event: &mut Event, root: NodeId) {
        let parts = Parts::find(doc, root);
        let Some(popover) = parts.popover else {
            return;
        };
        let inside = event.related_target.is_some_and(|r| parts.owns(&doc.tree, r));
        if !inside && doc.focus_visible() && doc.popover_open(popover) {
            doc.hide_popover(popover);
        }
    }

    fn on_values(doc: &mut Document, root: NodeId, list: NodeId, values: &Values) {
        let parts = Parts::find(doc, root);
        Self::render_display(doc, &parts, list);
        let Some(popover) = parts.popover.filter(|&p| doc.popover_open(p)) else {
            return;
        };
        let visible = doc.focus_visible();
        if ListBox::is_multiple(doc, list) {
            if let Some(filter) = parts.filter {
                doc.focus(filter, visible);
            }
        } else {
            tracing::trace!("Combobox {:?} picked {:?}", root, values);
            doc.hide_popover(popover);
            if let Some(trigger) = parts.trigger {
                doc.focus(trigger, visible);
            }
        }
    }

    /// Write the selected labels (or the placeholder) into the display
    fn render_display(doc: &mut Document, parts: &Parts, list: NodeId) {
        let Some(display) = doc
            .query(parts.root, |e| e.has_attr("data-display"))
            .or(parts.trigger)
        else {
            return;
        };
        let labels = ListBox::labels(doc, list);
        let text = if labels.is_empty() {
            parts
                .trigger
                .and_then(|t| doc.tree.attr(t, "data-placeholder"))
                .unwrap_or_default()
                .to_string()
        } else {
            labels.join(", ")
        };
        doc.set_text_content(display, &text);
    }

    /// Copy the list's active descendant onto the trigger
    fn mirror_active(doc: &mut Document, parts: &Parts) {
        let (Some(trigger), Some(list)) = (parts.trigger, parts.list) else {
            return;
        };
        match doc.attr(list, "aria-activedescendant").map(str::to_string) {
            Some(active) => doc.set_attr(trigger, "aria-activedescendant", active),
            None => {
                doc.remove_attr(trigger, "aria-activedescendant");
            }
        }
    }

    // ------------------------------------------------------------------
    // Async filtering
    // ------------------------------------------------------------------

    /// Fetch replacement options for the combobox at `root` as its filter
    /// input changes
    pub fn set_source<F, Fut>(&self, root: NodeId, fetch: F)
    where
        F: Fn(String) -> Fut + 'static,
        Fut: Future<Output = Result<Fragment, FetchError>> + 'static,
    {
        let wait = Duration::from_millis(self.config.search_debounce_ms);
        let source = Source {
            search: DebounceNext::new(&self.window, wait, fetch),
        };
        let replaced = self.sources.borrow_mut().insert(root, Rc::new(source));
        if let Some(old) = replaced {
            old.search.cancel();
        }
    }

    /// Drop the source of an unmounted combobox
    pub fn forget(&self, root: NodeId) {
        self.searches.borrow_mut().remove(&root);
        if let Some(source) = self.sources.borrow_mut().remove(&root) {
            source.search.cancel();
        }
    }

    /// Whether a search for `root` has not been applied yet
    pub fn is_searching(tree: &DomTree, root: NodeId) -> bool {
        Parts::find(tree, root)
            .list
            .is_some_and(|list| tree.attr_is_true(list, "aria-busy"))
    }

    fn on_input(self: &Rc<Self>, doc: &mut Document, event: &mut Event, root: NodeId) {
        let parts = Parts::find(doc, root);
        let (Some(filter), Some(list)) = (parts.filter, parts.list) else {
            return;
        };
        if event.target != Some(filter) {
            return;
        }
        let Some(source) = self.sources.borrow().get(&root).cloned() else {
            return;
        };

        let query = doc.value(filter);
        let seq = {
            let mut searches = self.searches.borrow_mut();
            let seq = searches.entry(root).or_default();
            *seq += 1;
            *seq
        };
        doc.set_attr(list, "aria-busy", "true");
        tracing::debug!("Combobox {:?} search #{} for {:?}", root, seq, query);

        let pending = source.search.call(query);
        let issued_by = Rc::downgrade(&source);
        let this: Weak<Self> = Rc::downgrade(self);
        self.window
            .spawn(async move {
                let result = pending.await;
                if let Some(this) = this.upgrade() {
                    this.apply_search(root, seq, &issued_by, result);
                }
            })
            .detach();
    }

    fn apply_search(&self, root: NodeId, seq: u64, issued_by: &Weak<Source>, result: SearchResult) {
        if self.searches.borrow().get(&root) != Some(&seq) {
            // The newer search clears the busy flag
            tracing::trace!("Dropping stale search #{} for {:?}", seq, root);
            return;
        }
        let current = self
            .sources
            .borrow()
            .get(&root)
            .zip(issued_by.upgrade())
            .is_some_and(|(source, issued_by)| Rc::ptr_eq(source, &issued_by));
        if !current {
            tracing::trace!("Dropping search #{} from a replaced source for {:?}", seq, root);
            self.window.with_document(|doc| {
                if let Some(list) = Parts::find(doc, root).list {
                    doc.remove_attr(list, "aria-busy");
                }
            });
            return;
        }

        let list_box = Rc::downgrade(&self.list_box);
        self.window.with_document(|doc| {
            let parts = Parts::find(doc, root);
            let Some(list) = parts.list else {
                return;
            };
            doc.remove_attr(list, "aria-busy");
            let fragment = match result {
                Ok(fragment) => fragment,
                Err(err) => {
                    tracing::warn!("Search for {:?} failed: {}", root, err);
                    return;
                }
            };
            if let Err(err) = self.list_box.replace_options(doc, list, &fragment) {
                tracing::warn!("Could not replace options of {:?}: {}", list, err);
                return;
            }
            doc.queue_microtask(Box::new(move |doc: &mut Document| {
                if let Some(list_box) = list_box.upgrade() {
                    list_box.nav().highlight_first(doc, list);
                    let parts = Parts::find(doc, root);
                    Self::mirror_active(doc, &parts);
                }
            }));
        });
    }
}

impl std::fmt::Debug for ComboBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComboBox")
            .field("config", &self.config)
            .field("sources", &self.sources.borrow().len())
            .finish()
    }
}
