//! Delegated event dispatch
//!
//! One native listener per event type is attached to each document. When it
//! fires, the dispatcher walks the event's composed path from the target
//! outward and runs the behaviors each node references through the
//! registries routed to that event type.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use fos_dom::{Document, Event, ListenerOptions};

use crate::config::DispatchConfig;
use crate::registry::{Behavior, BehaviorRegistry, Cx, behavior};
use crate::window::{Window, WindowHandle};

static NEXT_DISPATCHER: AtomicU64 = AtomicU64::new(0);

/// Routes native events to behavior registries
pub struct Dispatcher {
    id: u64,
    config: DispatchConfig,
    routes: RefCell<Vec<(String, Rc<BehaviorRegistry>)>>,
    windows: RefCell<Vec<WindowHandle>>,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Rc<Self> {
        Rc::new(Self {
            id: NEXT_DISPATCHER.fetch_add(1, Ordering::Relaxed),
            config,
            routes: RefCell::new(Vec::new()),
            windows: RefCell::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Route `event_type` to `registry`.
    ///
    /// Registries routed to the same event type run per node in routing
    /// order. Attached windows get the native listener immediately.
    pub fn route(self: &Rc<Self>, event_type: &str, registry: Rc<BehaviorRegistry>) {
        tracing::debug!("Routing {} to {}", event_type, registry.attribute());
        self.routes
            .borrow_mut()
            .push((event_type.to_string(), registry));

        self.windows.borrow_mut().retain(WindowHandle::is_alive);
        let windows = self.windows.borrow().clone();
        for window in windows {
            let Some(document) = window.document_weak().upgrade() else {
                continue;
            };
            match document.try_borrow_mut() {
                Ok(mut doc) => self.install(&mut doc, event_type),
                Err(_) => tracing::warn!(
                    "Document busy; {} listener not attached until the next attach()",
                    event_type
                ),
            };
        }
    }

    /// The `data-on-<event_type>` registry, created and routed on first use
    pub fn registry(self: &Rc<Self>, event_type: &str) -> Rc<BehaviorRegistry> {
        let attribute = format!("data-on-{event_type}");
        let existing = self
            .routes
            .borrow()
            .iter()
            .find(|(ty, registry)| ty == event_type && registry.attribute() == attribute)
            .map(|(_, registry)| Rc::clone(registry));
        if let Some(registry) = existing {
            return registry;
        }
        let registry = Rc::new(BehaviorRegistry::new(attribute));
        self.route(event_type, Rc::clone(&registry));
        registry
    }

    /// Register a closure under `id` for `event_type`; false if `id` was taken
    pub fn on<F>(self: &Rc<Self>, event_type: &str, id: &str, f: F) -> bool
    where
        F: Fn(&mut Cx<'_>, fos_dom::NodeId, &[String]) + 'static,
    {
        self.registry(event_type).add(id, behavior(f))
    }

    /// Register a behavior object under `id` for `event_type`
    pub fn on_behavior(self: &Rc<Self>, event_type: &str, id: &str, b: Rc<dyn Behavior>) -> bool {
        self.registry(event_type).add(id, b)
    }

    /// Event types with at least one routed registry
    pub fn event_types(&self) -> Vec<String> {
        let mut types: Vec<String> = Vec::new();
        for (ty, _) in self.routes.borrow().iter() {
            if !types.contains(ty) {
                types.push(ty.clone());
            }
        }
        types
    }

    /// Install the native listeners on `window`'s document
    pub fn attach(self: &Rc<Self>, window: &Window) {
        let handle = window.handle();
        let types = self.event_types();
        window.with_document(|doc| {
            for ty in &types {
                self.install(doc, ty);
            }
        });
        let mut windows = self.windows.borrow_mut();
        windows.retain(WindowHandle::is_alive);
        if !windows
            .iter()
            .any(|w| w.same_document(&handle.document_weak()))
        {
            windows.push(handle);
        }
    }

    fn install(self: &Rc<Self>, doc: &mut Document, event_type: &str) {
        if !doc.once(&format!("dispatch:{}:{}", self.id, event_type)) {
            return;
        }
        let options = if self.config.captures(event_type) {
            ListenerOptions::capture()
        } else {
            ListenerOptions::bubble()
        };
        let dispatcher: Weak<Self> = Rc::downgrade(self);
        doc.add_event_listener(
            event_type,
            options,
            Rc::new(move |doc: &mut Document, event: &mut Event| {
                if let Some(dispatcher) = dispatcher.upgrade() {
                    dispatcher.dispatch(doc, event);
                }
            }),
        );
        tracing::debug!(
            "Attached {} listener for {}",
            if options.capture { "capture" } else { "bubble" },
            event_type
        );
    }

    /// Walk `event`'s composed path and run the bound behaviors.
    ///
    /// Stopping propagation ends the walk after the current node; stopping
    /// immediate propagation ends it before the next behavior.
    pub fn dispatch(&self, doc: &mut Document, event: &mut Event) {
        let Some(target) = event.target else {
            return;
        };
        let registries: Vec<Rc<BehaviorRegistry>> = self
            .routes
            .borrow()
            .iter()
            .filter(|(ty, _)| *ty == event.event_type)
            .map(|(_, registry)| Rc::clone(registry))
            .collect();
        if registries.is_empty() {
            return;
        }

        let native_current = event.current_target;
        let path = doc.composed_path(target);
        'path: for node in path {
            if event.is_propagation_stopped() {
                break;
            }
            for registry in &registries {
                for bound in registry.iter(&doc.tree, node) {
                    if event.is_immediate_propagation_stopped() {
                        break 'path;
                    }
                    tracing::trace!(
                        "{} on {:?}: {}",
                        event.event_type,
                        node,
                        bound.callback
                    );
                    event.current_target = Some(node);
                    let mut cx = Cx {
                        doc: &mut *doc,
                        event: &mut *event,
                    };
                    bound.behavior.invoke(&mut cx, node, &bound.callback.args);
                }
            }
        }
        event.current_target = native_current;
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("id", &self.id)
            .field("event_types", &self.event_types())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fos_dom::{Key, NodeId};

    type Log = Rc<RefCell<Vec<String>>>;

    fn setup() -> (Window, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let body = doc.body();
        let outer = doc.create_element("div");
        let inner = doc.create_element("button");
        doc.append_child(body, outer).unwrap();
        doc.append_child(outer, inner).unwrap();
        (Window::new(doc), body, outer, inner)
    }

    fn record(dispatcher: &Rc<Dispatcher>, event_type: &str, id: &str, log: &Log) {
        let sink = log.clone();
        let name = id.to_string();
        dispatcher.on(event_type, id, move |_cx: &mut Cx<'_>, el: NodeId, args: &[String]| {
            sink.borrow_mut()
                .push(format!("{name}@{}{:?}", el.index(), args));
        });
    }

    #[test]
    fn test_walks_path_outward() {
        let (window, _body, outer, inner) = setup();
        let dispatcher = Dispatcher::new(DispatchConfig::default());
        let log: Log = Rc::default();
        record(&dispatcher, "click", "a", &log);
        record(&dispatcher, "click", "b", &log);
        dispatcher.attach(&window);

        window.with_document(|doc| {
            doc.set_attr(inner, "data-on-click", "a (1) b");
            doc.set_attr(outer, "data-on-click", "b (x,y)");
        });
        window.dispatch(inner, &mut Event::click());

        assert_eq!(
            *log.borrow(),
            vec![
                format!("a@{}[\"1\"]", inner.index()),
                format!("b@{}[]", inner.index()),
                format!("b@{}[\"x\", \"y\"]", outer.index()),
            ]
        );
    }

    #[test]
    fn test_one_listener_per_type() {
        let (window, _body, _outer, _inner) = setup();
        let dispatcher = Dispatcher::new(DispatchConfig::default());
        dispatcher.registry("click");
        dispatcher.registry("click");
        dispatcher.registry("focusin");
        dispatcher.attach(&window);
        dispatcher.attach(&window);

        let doc = window.document();
        assert_eq!(doc.listener_count("click"), 1);
        assert_eq!(doc.listener_count("focusin"), 1);
    }

    #[test]
    fn test_late_route_installs_on_attached_window() {
        let (window, _body, _outer, inner) = setup();
        let dispatcher = Dispatcher::new(DispatchConfig::default());
        dispatcher.attach(&window);

        let log: Log = Rc::default();
        record(&dispatcher, "keydown", "k", &log);
        window.with_document(|doc| doc.set_attr(inner, "data-on-keydown", "k"));
        window.dispatch(inner, &mut Event::keydown(Key::Enter));

        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_stop_propagation_ends_walk_after_node() {
        let (window, _body, outer, inner) = setup();
        let dispatcher = Dispatcher::new(DispatchConfig::default());
        let log: Log = Rc::default();
        dispatcher.on("click", "stop", |cx: &mut Cx<'_>, _el: NodeId, _args: &[String]| {
            cx.event.stop_propagation();
        });
        record(&dispatcher, "click", "after", &log);
        dispatcher.attach(&window);

        window.with_document(|doc| {
            doc.set_attr(inner, "data-on-click", "stop after");
            doc.set_attr(outer, "data-on-click", "after");
        });
        window.dispatch(inner, &mut Event::click());

        assert_eq!(*log.borrow(), vec![format!("after@{}[]", inner.index())]);
    }

    #[test]
    fn test_stop_immediate_propagation_skips_remaining_handlers() {
        let (window, _body, outer, inner) = setup();
        let dispatcher = Dispatcher::new(DispatchConfig::default());
        let log: Log = Rc::default();
        dispatcher.on("click", "halt", |cx: &mut Cx<'_>, _el: NodeId, _args: &[String]| {
            cx.event.stop_immediate_propagation();
        });
        record(&dispatcher, "click", "after", &log);
        dispatcher.attach(&window);

        window.with_document(|doc| {
            doc.set_attr(inner, "data-on-click", "halt after");
            doc.set_attr(outer, "data-on-click", "after");
        });
        window.dispatch(inner, &mut Event::click());

        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_registries_run_in_routing_order_per_node() {
        let (window, _body, outer, inner) = setup();
        let dispatcher = Dispatcher::new(DispatchConfig::default());
        let log: Log = Rc::default();

        let first = Rc::new(BehaviorRegistry::new("data-first"));
        let second = Rc::new(BehaviorRegistry::new("data-second"));
        for (registry, name) in [(&first, "first"), (&second, "second")] {
            let sink = log.clone();
            registry.add(
                name,
                behavior(move |_cx: &mut Cx<'_>, el: NodeId, _args: &[String]| {
                    sink.borrow_mut().push(format!("{name}@{}", el.index()));
                }),
            );
        }
        dispatcher.route("click", first);
        dispatcher.route("click", second);
        dispatcher.attach(&window);

        window.with_document(|doc| {
            doc.set_attr(inner, "data-second", "second");
            doc.set_attr(outer, "data-first", "first");
            doc.set_attr(outer, "data-second", "second");
        });
        window.dispatch(inner, &mut Event::click());

        assert_eq!(
            *log.borrow(),
            vec![
                format!("second@{}", inner.index()),
                format!("first@{}", outer.index()),
                format!("second@{}", outer.index()),
            ]
        );
    }

    #[test]
    fn test_capture_events_see_non_bubbling_toggle() {
        let (window, _body, outer, _inner) = setup();
        let dispatcher = Dispatcher::new(DispatchConfig::default());
        let log: Log = Rc::default();
        record(&dispatcher, "toggle", "t", &log);
        dispatcher.attach(&window);

        window.with_document(|doc| doc.set_attr(outer, "data-on-toggle", "t"));
        window.dispatch(outer, &mut Event::toggle("toggle", "open"));

        assert_eq!(log.borrow().len(), 1);
    }
}
