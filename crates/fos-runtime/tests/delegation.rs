//! Delegated dispatch over parsed markup

use std::cell::RefCell;
use std::rc::Rc;

use fos_dom::{Event, Key, NodeId};
use fos_runtime::{CallbackRef, Cx, DispatchConfig, Dispatcher, Window};

fn window(html: &str) -> Window {
    Window::new(fos_html::parse(html).unwrap())
}

fn id(window: &Window, id: &str) -> NodeId {
    window.document().get_element_by_id(id).unwrap()
}

// ============================================================================
// PROGRESSIVE ENHANCEMENT
// ============================================================================

#[test]
fn test_markup_before_behavior_is_loaded() {
    let window = window(
        r#"<div id="menu" data-on-click="toggle (menu)"><button id="btn">Menu</button></div>"#,
    );
    let dispatcher = Dispatcher::new(DispatchConfig::default());
    let registry = dispatcher.registry("click");
    dispatcher.attach(&window);

    // Nothing registered yet: the click is a no-op
    let btn = id(&window, "btn");
    assert!(window.dispatch(btn, &mut Event::click()));

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let token = Rc::clone(&registry).create(
        "toggle",
        fos_runtime::behavior(move |cx: &mut Cx<'_>, el: NodeId, args: &[String]| {
            sink.borrow_mut().push(args.to_vec());
            let open = cx.doc.attr_is_true(el, "aria-expanded");
            cx.doc.set_attr(el, "aria-expanded", (!open).to_string());
        }),
    );
    let (attr, value) = token.bind(&[Some("menu")]);
    assert_eq!((attr.as_str(), value.as_str()), ("data-on-click", "toggle (menu)"));

    window.dispatch(btn, &mut Event::click());
    let menu = id(&window, "menu");
    assert_eq!(window.document().attr(menu, "aria-expanded"), Some("true"));
    assert_eq!(*seen.borrow(), vec![vec!["menu".to_string()]]);
}

#[test]
fn test_malformed_attribute_keeps_leading_entries() {
    let window = window(r#"<button id="btn" data-on-keydown="mark (a) (b)">x</button>"#);
    let dispatcher = Dispatcher::new(DispatchConfig::default());
    dispatcher.on("keydown", "mark", |cx: &mut Cx<'_>, el: NodeId, args: &[String]| {
        cx.doc.set_attr(el, "data-marked", args.join(","));
    });
    dispatcher.attach(&window);

    let btn = id(&window, "btn");
    window.dispatch(btn, &mut Event::keydown(Key::Enter));
    assert_eq!(window.document().attr(btn, "data-marked"), Some("a"));
}

// ============================================================================
// DEFAULT ACTIONS
// ============================================================================

#[test]
fn test_behavior_can_prevent_default() {
    let window = window(r#"<form id="f" data-on-submit="block"><input name="q"></form>"#);
    let dispatcher = Dispatcher::new(DispatchConfig::default());
    dispatcher.on("submit", "block", |cx: &mut Cx<'_>, _el: NodeId, _args: &[String]| {
        cx.event.prevent_default();
    });
    dispatcher.attach(&window);

    let form = id(&window, "f");
    assert_eq!(window.document_mut().request_submit(form), None);
}

#[test]
fn test_encoded_attribute_round_trips_through_markup() {
    let value = CallbackRef::encode("fmt", &[Some("a,b"), None, Some("c")]);
    let window = window(&format!(r#"<p id="p" data-on-click="{value}">x</p>"#));
    let dispatcher = Dispatcher::new(DispatchConfig::default());
    dispatcher.on("click", "fmt", |cx: &mut Cx<'_>, el: NodeId, args: &[String]| {
        cx.doc.set_attr(el, "data-args", args.join("|"));
    });
    dispatcher.attach(&window);

    let p = id(&window, "p");
    window.dispatch(p, &mut Event::click());
    assert_eq!(window.document().attr(p, "data-args"), Some("a,b||c"));
}
