//! End-to-end scenarios against a fully wired [`Ui`]

use std::cell::RefCell;
use std::rc::Rc;

use fos_ui::dom::{Event, Fragment, FragmentNode, Key, NodeId};
use fos_ui::forms::validator;
use fos_ui::listbox::{FetchError, OptionList};
use fos_ui::{ComboBoxConfig, ListBox, Replay, Step, Ui, UiConfig};

const FRUIT_LIST: &str = r#"
<div id="fruit" role="listbox" tabindex="0"
     data-on-keydown="listbox" data-on-click="listbox" data-on-focusin="listbox">
  <label id="apple" data-value="apple"><input type="radio" name="fruit" value="apple">Apple</label>
  <label id="banana" data-value="banana"><input type="radio" name="fruit" value="banana">Banana</label>
  <label id="orange" data-value="orange"><input type="radio" name="fruit" value="orange">Orange</label>
</div>
"#;

const COLOR_LIST: &str = r#"
<form id="paint">
  <div id="colors" role="listbox" aria-multiselectable="true" aria-required="true"
       data-on-click="listbox" data-validate="listbox-required no-red"
       aria-describedby="colors-error">
    <label id="red" data-value="red"><input type="checkbox" name="color" value="red">Red</label>
    <label id="green" data-value="green"><input type="checkbox" name="color" value="green">Green</label>
    <label id="blue" data-value="blue"><input type="checkbox" name="color" value="blue">Blue</label>
  </div>
  <p id="colors-error" data-error-slot></p>
</form>
"#;

const FRUIT_COMBO: &str = r#"
<div id="picker" data-combobox
     data-on-keydown="combobox" data-on-click="combobox" data-on-focusout="combobox"
     data-on-toggle="combobox" data-on-input="combobox">
  <button id="trigger" type="button" role="combobox" aria-controls="picker-list"
          aria-expanded="false" data-placeholder="Pick a fruit"><span id="display" data-display>Pick a fruit</span></button>
  <div id="pop" popover>
    <input id="filter" type="search" data-filter>
    <div id="picker-list" role="listbox">
      <label data-value="apple"><input type="radio" name="fruit" value="apple">apple</label>
    </div>
  </div>
</div>
"#;

fn ui(markup: &str) -> Ui {
    Ui::from_markup(markup, UiConfig::default()).unwrap()
}

fn id(ui: &Ui, id: &str) -> NodeId {
    ui.element(id).unwrap()
}

fn click(ui: &Ui, target: &str) {
    let target = id(ui, target);
    ui.window().dispatch(target, &mut Event::click());
}

fn key(ui: &Ui, target: &str, key: Key) {
    let target = id(ui, target);
    ui.window().dispatch(target, &mut Event::keydown(key));
}

fn values(ui: &Ui, list: &str) -> Vec<String> {
    ListBox::values(&ui.window().document(), id(ui, list))
        .into_iter()
        .collect()
}

fn highlighted(ui: &Ui, list: &str) -> Option<NodeId> {
    OptionList::highlighted(&ui.window().document(), id(ui, list))
}

fn fruit(value: &str) -> FragmentNode {
    FragmentNode::element("label")
        .attr("data-value", value)
        .child(
            FragmentNode::element("input")
                .attr("type", "radio")
                .attr("name", "fruit")
                .attr("value", value),
        )
        .child(FragmentNode::text(value))
}

fn fruits_matching(query: &str) -> Fragment {
    ["raspberry", "redcurrant", "reineclaude", "banana"]
        .into_iter()
        .filter(|name| name.starts_with(query))
        .fold(Fragment::new(), |fragment, name| fragment.with(fruit(name)))
}

// ============================================================================
// LIST BOX NAVIGATION
// ============================================================================

#[test]
fn test_arrow_keys_move_highlight() {
    let ui = ui(FRUIT_LIST);
    let list = id(&ui, "fruit");
    ui.window().with_document(|doc| doc.focus(list, true));

    key(&ui, "fruit", Key::ArrowDown);
    assert_eq!(highlighted(&ui, "fruit"), Some(id(&ui, "apple")));
    key(&ui, "fruit", Key::ArrowDown);
    assert_eq!(highlighted(&ui, "fruit"), Some(id(&ui, "banana")));
    key(&ui, "fruit", Key::ArrowUp);
    assert_eq!(highlighted(&ui, "fruit"), Some(id(&ui, "apple")));

    let doc = ui.window().document();
    assert_eq!(doc.attr(list, "aria-activedescendant"), Some("apple"));
}

#[test]
fn test_single_select_holds_at_most_one_value() {
    let ui = ui(FRUIT_LIST);
    for target in ["apple", "orange", "orange", "banana", "apple", "banana"] {
        click(&ui, target);
        assert!(values(&ui, "fruit").len() <= 1);
    }
    assert_eq!(values(&ui, "fruit"), vec!["banana"]);
}

// ============================================================================
// MULTI-SELECT
// ============================================================================

#[test]
fn test_multi_select_toggles_membership() {
    let ui = ui(&COLOR_LIST.replace(r#" aria-required="true""#, ""));

    click(&ui, "green");
    assert_eq!(values(&ui, "colors"), vec!["green"]);
    click(&ui, "blue");
    assert_eq!(values(&ui, "colors"), vec!["blue", "green"]);
    click(&ui, "green");
    assert_eq!(values(&ui, "colors"), vec!["blue"]);
}

#[test]
fn test_app_validator_reports_and_clears() {
    let ui = ui(COLOR_LIST);
    ui.validation().add_validator(
        "no-red",
        validator(|doc, list, _event, _args| {
            ListBox::values(doc, list)
                .contains("red")
                .then(|| "Don't pick red.".to_string())
        }),
    );
    let list = id(&ui, "colors");
    let slot = id(&ui, "colors-error");

    click(&ui, "green");
    assert_eq!(ui.window().document().attr(list, "aria-invalid"), None);

    click(&ui, "red");
    {
        let doc = ui.window().document();
        assert_eq!(doc.attr(list, "aria-invalid"), Some("true"));
        assert_eq!(doc.text_content(slot), "Don't pick red.");
    }
    assert_eq!(
        ui.snapshot()[0].error.as_deref(),
        Some("Don't pick red.")
    );

    click(&ui, "red");
    let doc = ui.window().document();
    assert_eq!(doc.attr(list, "aria-invalid"), None);
    assert_eq!(doc.text_content(slot), "");
}

#[test]
fn test_invalid_selection_blocks_submit() {
    let ui = ui(COLOR_LIST);
    ui.validation().add_validator(
        "no-red",
        validator(|doc, list, _event, _args| {
            ListBox::values(doc, list)
                .contains("red")
                .then(|| "Don't pick red.".to_string())
        }),
    );
    let steps: Vec<Step> = [
        "click:#red",
        "submit:#paint",
        "click:#blue",
        "click:#red",
        "submit:#paint",
    ]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();

    let mut replay = Replay::new(&ui);
    replay.run_all(&steps).unwrap();
    let report = replay.finish();

    assert!(!report.submissions[0].accepted);
    assert!(report.submissions[1].accepted);
    assert_eq!(
        report.submissions[1].entries,
        vec![("color".to_string(), "blue".to_string())]
    );
}

// ============================================================================
// COMBOBOX SEARCH
// ============================================================================

#[test]
fn test_search_fetches_once_and_selection_closes() {
    let config = UiConfig {
        combo_box: ComboBoxConfig {
            search_debounce_ms: 20,
        },
        ..UiConfig::default()
    };
    let ui = Ui::from_markup(FRUIT_COMBO, config).unwrap();
    let root = id(&ui, "picker");
    let queries = Rc::new(RefCell::new(Vec::new()));
    let log = queries.clone();
    ui.combo_box().set_source(root, move |query: String| {
        log.borrow_mut().push(query.clone());
        async move { Ok::<Fragment, FetchError>(fruits_matching(&query)) }
    });

    let steps: Vec<Step> = [
        "focus:#trigger",
        "key:ArrowDown",
        "type:#filter:r",
        "type:#filter:re",
        "wait:100",
    ]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();
    let mut replay = Replay::new(&ui);
    replay.run_all(&steps).unwrap();

    assert_eq!(*queries.borrow(), vec!["re".to_string()]);
    let list = id(&ui, "picker-list");
    let item = {
        let doc = ui.window().document();
        let items: Vec<_> = OptionList::items(&doc, list)
            .into_iter()
            .filter_map(|item| doc.attr(item, "data-value").map(str::to_string))
            .collect();
        assert_eq!(items, vec!["redcurrant", "reineclaude"]);
        OptionList::items(&doc, list)[1]
    };

    ui.window().dispatch(item, &mut Event::click());
    let doc = ui.window().document();
    assert!(!doc.popover_open(id(&ui, "pop")));
    assert_eq!(doc.text_content(id(&ui, "display")), "reineclaude");
    assert_eq!(doc.active_element(), Some(id(&ui, "trigger")));
    drop(doc);
    assert_eq!(values(&ui, "picker-list"), vec!["reineclaude"]);
}
