//! Document - High-level document API
//!
//! Owns the tree plus everything a page keeps beside it: document-level
//! listeners, focus, open popovers, and the microtask / animation-frame queues.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use crate::dom_events::{types, EventPhase, ListenerFn, ListenerId, ListenerOptions};
use crate::{DomTree, Event, Key, NodeId};

/// Deferred work run against the document
pub type Task = Box<dyn FnOnce(&mut Document)>;

/// Scroll alignment for `scroll_into_view`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollAlign {
    Start,
    Center,
    End,
    #[default]
    Nearest,
}

/// A scroll performed by `scroll_into_view`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRecord {
    pub container: NodeId,
    pub target: NodeId,
    pub align: ScrollAlign,
}

/// Handle for a pending animation frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

struct RegisteredListener {
    id: ListenerId,
    event_type: String,
    options: ListenerOptions,
    callback: ListenerFn,
}

/// HTML Document
pub struct Document {
    /// The DOM tree
    pub tree: DomTree,
    body: NodeId,
    listeners: Vec<RegisteredListener>,
    next_listener: u64,
    active_element: Option<NodeId>,
    focus_visible: bool,
    open_popovers: Vec<NodeId>,
    microtasks: VecDeque<Task>,
    frames: Vec<(FrameHandle, Task)>,
    next_frame: u64,
    scroll_log: Vec<ScrollRecord>,
    setup: HashSet<String>,
    dispatch_depth: u32,
}

impl Document {
    /// Create a document with `<html><body></body></html>`
    pub fn new() -> Self {
        let mut tree = DomTree::new();
        let html = tree.create_element("html");
        let body = tree.create_element("body");
        // Fresh nodes under the root cannot fail hierarchy checks
        let _ = tree.append_child(NodeId::ROOT, html);
        let _ = tree.append_child(html, body);

        Self {
            tree,
            body,
            listeners: Vec::new(),
            next_listener: 0,
            active_element: None,
            focus_visible: false,
            open_popovers: Vec::new(),
            microtasks: VecDeque::new(),
            frames: Vec::new(),
            next_frame: 0,
            scroll_log: Vec::new(),
            setup: HashSet::new(),
            dispatch_depth: 0,
        }
    }

    /// Get <body> element
    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Access the DOM tree
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Access the DOM tree mutably
    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    /// Per-document setup hook: true the first time `key` is seen
    pub fn once(&mut self, key: &str) -> bool {
        self.setup.insert(key.to_string())
    }

    // ------------------------------------------------------------------
    // Listeners and dispatch
    // ------------------------------------------------------------------

    /// Attach a document-level listener
    pub fn add_event_listener(
        &mut self,
        event_type: &str,
        options: ListenerOptions,
        callback: ListenerFn,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push(RegisteredListener {
            id,
            event_type: event_type.to_string(),
            options,
            callback,
        });
        id
    }

    pub fn remove_event_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    /// Number of listeners attached for `event_type`
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners
            .iter()
            .filter(|l| l.event_type == event_type)
            .count()
    }

    /// Dispatch `event` at `target`; returns false if the default was prevented.
    ///
    /// Listeners live on the document, so the capture pass runs first and the
    /// bubble pass only runs for bubbling events (or events targeted at the
    /// document itself). Default actions follow, then the microtask checkpoint
    /// when this is the outermost dispatch.
    pub fn dispatch_event(&mut self, target: NodeId, event: &mut Event) -> bool {
        event.target = Some(target);
        self.dispatch_depth += 1;

        let at_root = target == NodeId::ROOT;
        event.phase = if at_root {
            EventPhase::AtTarget
        } else {
            EventPhase::Capturing
        };
        self.invoke_listeners(event, true);

        if !event.is_propagation_stopped() && (event.bubbles || at_root) {
            if !at_root {
                event.phase = EventPhase::Bubbling;
            }
            self.invoke_listeners(event, false);
        }

        event.phase = EventPhase::None;
        event.current_target = None;
        self.dispatch_depth -= 1;

        if !event.is_default_prevented() {
            self.run_default_action(target, event);
        }
        if self.dispatch_depth == 0 {
            self.perform_microtask_checkpoint();
        }
        !event.is_default_prevented()
    }

    fn invoke_listeners(&mut self, event: &mut Event, capture: bool) {
        let matching: Vec<(ListenerId, bool, ListenerFn)> = self
            .listeners
            .iter()
            .filter(|l| l.options.capture == capture && l.event_type == event.event_type)
            .map(|l| (l.id, l.options.once, l.callback.clone()))
            .collect();

        for (id, once, callback) in matching {
            if event.is_immediate_propagation_stopped() {
                break;
            }
            if once {
                self.remove_event_listener(id);
            }
            event.current_target = Some(NodeId::ROOT);
            callback(self, event);
        }
    }

    fn run_default_action(&mut self, target: NodeId, event: &Event) {
        match event.event_type.as_str() {
            types::KEYDOWN if event.key == Some(Key::Escape) => {
                // Light dismiss: the most recently opened popover closes
                if let Some(&top) = self.open_popovers.last() {
                    self.hide_popover(top);
                }
            }
            types::RESET if self.tag(target) == Some("form") => {
                self.reset_controls(target);
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    pub fn queue_microtask(&mut self, task: Task) {
        self.microtasks.push_back(task);
    }

    /// Drain the microtask queue, including tasks queued while draining
    pub fn perform_microtask_checkpoint(&mut self) {
        while let Some(task) = self.microtasks.pop_front() {
            task(self);
        }
    }

    pub fn request_animation_frame(&mut self, task: Task) -> FrameHandle {
        let handle = FrameHandle(self.next_frame);
        self.next_frame += 1;
        self.frames.push((handle, task));
        handle
    }

    pub fn cancel_animation_frame(&mut self, handle: FrameHandle) {
        self.frames.retain(|(h, _)| *h != handle);
    }

    /// Run the callbacks queued before this frame; returns how many ran
    pub fn run_animation_frame(&mut self) -> usize {
        let frames = std::mem::take(&mut self.frames);
        let count = frames.len();
        for (_, task) in frames {
            task(self);
        }
        self.perform_microtask_checkpoint();
        count
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// Scroll `target` into view inside `container`
    pub fn scroll_into_view(&mut self, container: NodeId, target: NodeId, align: ScrollAlign) {
        tracing::trace!("scroll {:?} into view within {:?}", target, container);
        self.scroll_log.push(ScrollRecord {
            container,
            target,
            align,
        });
    }

    pub fn scroll_log(&self) -> &[ScrollRecord] {
        &self.scroll_log
    }

    pub fn take_scroll_log(&mut self) -> Vec<ScrollRecord> {
        std::mem::take(&mut self.scroll_log)
    }

    // ------------------------------------------------------------------
    // Focus
    // ------------------------------------------------------------------

    pub fn active_element(&self) -> Option<NodeId> {
        self.active_element
    }

    /// Whether the current focus came from keyboard interaction
    pub fn focus_visible(&self) -> bool {
        self.focus_visible
    }

    /// Move focus, firing focusout on the old element and focusin on the new one
    pub fn focus(&mut self, id: NodeId, visible: bool) {
        self.focus_visible = visible;
        let previous = self.active_element;
        if previous == Some(id) {
            return;
        }
        if let Some(prev) = previous {
            let mut out = Event::focus_out(Some(id));
            self.dispatch_event(prev, &mut out);
        }
        self.active_element = Some(id);
        let mut focus_in = Event::focus_in(previous);
        self.dispatch_event(id, &mut focus_in);
    }

    pub fn blur(&mut self) {
        if let Some(prev) = self.active_element.take() {
            let mut out = Event::focus_out(None);
            self.dispatch_event(prev, &mut out);
        }
    }

    // ------------------------------------------------------------------
    // Popovers
    // ------------------------------------------------------------------

    pub fn popover_open(&self, id: NodeId) -> bool {
        self.open_popovers.contains(&id)
    }

    /// Open a `[popover]` element; false if it was already open or the
    /// beforetoggle event was canceled
    pub fn show_popover(&mut self, id: NodeId) -> bool {
        if !self.has_attr(id, "popover") || self.popover_open(id) {
            return false;
        }
        let mut before = Event::toggle(types::BEFORETOGGLE, "open");
        if !self.dispatch_event(id, &mut before) {
            return false;
        }
        self.open_popovers.push(id);
        tracing::debug!("popover {:?} opened", id);
        let mut toggle = Event::toggle(types::TOGGLE, "open");
        self.dispatch_event(id, &mut toggle);
        true
    }

    pub fn hide_popover(&mut self, id: NodeId) -> bool {
        if !self.popover_open(id) {
            return false;
        }
        let mut before = Event::toggle(types::BEFORETOGGLE, "closed");
        before.cancelable = false;
        self.dispatch_event(id, &mut before);
        self.open_popovers.retain(|&p| p != id);
        tracing::debug!("popover {:?} closed", id);
        let mut toggle = Event::toggle(types::TOGGLE, "closed");
        self.dispatch_event(id, &mut toggle);
        true
    }

    pub fn toggle_popover(&mut self, id: NodeId) -> bool {
        if self.popover_open(id) {
            self.hide_popover(id)
        } else {
            self.show_popover(id)
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Document {
    type Target = DomTree;

    fn deref(&self) -> &DomTree {
        &self.tree
    }
}

impl DerefMut for Document {
    fn deref_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.tree.len())
            .field("listeners", &self.listeners.len())
            .field("active_element", &self.active_element)
            .field("open_popovers", &self.open_popovers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn recorder(doc: &mut Document, event_type: &str, options: ListenerOptions) -> Rc<RefCell<Vec<String>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let tag = if options.capture { "capture" } else { "bubble" };
        doc.add_event_listener(
            event_type,
            options,
            Rc::new(move |_doc: &mut Document, ev: &mut Event| {
                sink.borrow_mut().push(format!("{tag}:{}", ev.event_type));
            }),
        );
        log
    }

    #[test]
    fn test_capture_runs_before_bubble() {
        let mut doc = Document::new();
        let button = doc.create_element("button");
        let body = doc.body();
        doc.append_child(body, button).unwrap();

        let bubble = recorder(&mut doc, "click", ListenerOptions::bubble());
        let capture = recorder(&mut doc, "click", ListenerOptions::capture());

        let mut ev = Event::click();
        doc.dispatch_event(button, &mut ev);
        assert_eq!(capture.borrow().len(), 1);
        assert_eq!(bubble.borrow().len(), 1);
    }

    #[test]
    fn test_non_bubbling_event_only_reaches_capture() {
        let mut doc = Document::new();
        let pop = doc.create_element("div");
        let body = doc.body();
        doc.append_child(body, pop).unwrap();

        let bubble = recorder(&mut doc, "toggle", ListenerOptions::bubble());
        let capture = recorder(&mut doc, "toggle", ListenerOptions::capture());

        let mut ev = Event::toggle(types::TOGGLE, "open");
        doc.dispatch_event(pop, &mut ev);
        assert_eq!(capture.borrow().len(), 1);
        assert!(bubble.borrow().is_empty());
    }

    #[test]
    fn test_once_listener_removed() {
        let mut doc = Document::new();
        let log = recorder(
            &mut doc,
            "click",
            ListenerOptions {
                capture: false,
                once: true,
            },
        );
        let body = doc.body();
        doc.dispatch_event(body, &mut Event::click());
        doc.dispatch_event(body, &mut Event::click());
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(doc.listener_count("click"), 0);
    }

    #[test]
    fn test_setup_hook_runs_once() {
        let mut doc = Document::new();
        assert!(doc.once("dispatch:click"));
        assert!(!doc.once("dispatch:click"));
        assert!(doc.once("dispatch:keydown"));
    }

    #[test]
    fn test_popover_light_dismiss_on_escape() {
        let mut doc = Document::new();
        let pop = doc.create_element("div");
        doc.set_attr(pop, "popover", "");
        let body = doc.body();
        doc.append_child(body, pop).unwrap();

        assert!(doc.show_popover(pop));
        assert!(!doc.show_popover(pop));

        doc.dispatch_event(body, &mut Event::keydown(Key::Escape));
        assert!(!doc.popover_open(pop));
    }

    #[test]
    fn test_prevented_escape_keeps_popover_open() {
        let mut doc = Document::new();
        let pop = doc.create_element("div");
        doc.set_attr(pop, "popover", "");
        let body = doc.body();
        doc.append_child(body, pop).unwrap();
        doc.add_event_listener(
            "keydown",
            ListenerOptions::bubble(),
            Rc::new(|_doc: &mut Document, ev: &mut Event| ev.prevent_default()),
        );

        doc.show_popover(pop);
        doc.dispatch_event(body, &mut Event::keydown(Key::Escape));
        assert!(doc.popover_open(pop));
    }

    #[test]
    fn test_microtasks_run_after_outer_dispatch() {
        let mut doc = Document::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        doc.add_event_listener(
            "click",
            ListenerOptions::bubble(),
            Rc::new(move |doc: &mut Document, _ev: &mut Event| {
                let inner = sink.clone();
                sink.borrow_mut().push("listener");
                doc.queue_microtask(Box::new(move |_doc: &mut Document| inner.borrow_mut().push("microtask")));
            }),
        );
        let body = doc.body();
        doc.dispatch_event(body, &mut Event::click());
        assert_eq!(*seen.borrow(), vec!["listener", "microtask"]);
    }

    #[test]
    fn test_animation_frame_batches() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.request_animation_frame(Box::new(move |doc: &mut Document| {
            doc.scroll_into_view(body, body, ScrollAlign::Nearest);
        }));
        let cancelled = doc.request_animation_frame(Box::new(|doc: &mut Document| {
            let root = doc.root();
            doc.scroll_into_view(root, root, ScrollAlign::Start);
        }));
        doc.cancel_animation_frame(cancelled);

        assert_eq!(doc.run_animation_frame(), 1);
        assert_eq!(doc.scroll_log().len(), 1);
        assert_eq!(doc.run_animation_frame(), 0);
    }

    #[test]
    fn test_focus_fires_focusout_with_related_target() {
        let mut doc = Document::new();
        let body = doc.body();
        let a = doc.create_element("input");
        let b = doc.create_element("input");
        doc.append_child(body, a).unwrap();
        doc.append_child(body, b).unwrap();

        let related = Rc::new(RefCell::new(None));
        let sink = related.clone();
        doc.add_event_listener(
            "focusout",
            ListenerOptions::capture(),
            Rc::new(move |doc: &mut Document, ev: &mut Event| {
                *sink.borrow_mut() = Some((ev.target, ev.related_target, doc.focus_visible()));
            }),
        );

        doc.focus(a, false);
        doc.focus(b, true);
        assert_eq!(*related.borrow(), Some((Some(a), Some(b), true)));
        assert_eq!(doc.active_element(), Some(b));
    }
}
