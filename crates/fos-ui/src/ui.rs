//! Wiring of every behavior onto one window

use std::rc::Rc;

use fos_dom::{Document, NodeId};
use fos_forms::Validation;
use fos_listbox::{ComboBox, ListBox};
use fos_runtime::{Dispatcher, Window};
use serde::Serialize;

use crate::config::UiConfig;

/// A window with dispatch, validation, list boxes and comboboxes installed
pub struct Ui {
    window: Window,
    config: UiConfig,
    dispatcher: Rc<Dispatcher>,
    validation: Rc<Validation>,
    list_box: Rc<ListBox>,
    combo_box: Rc<ComboBox>,
}

/// Observable state of one list box
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListSnapshot {
    pub id: Option<String>,
    pub values: Vec<String>,
    pub labels: Vec<String>,
    pub error: Option<String>,
}

impl Ui {
    pub fn new(window: Window, config: UiConfig) -> Self {
        let dispatcher = Dispatcher::new(config.dispatch.clone());
        let validation = Validation::new(config.validation.clone());
        let list_box = ListBox::new(config.list_box.clone());
        list_box.install(&dispatcher, &validation);

        let combo_box = ComboBox::new(
            &window.handle(),
            Rc::clone(&list_box),
            config.combo_box.clone(),
        );
        combo_box.install(&dispatcher);

        dispatcher.attach(&window);
        window.with_document(|doc| {
            validation.attach(doc);
            list_box.attach(doc);
        });
        tracing::info!("fOS UI v{} attached", crate::VERSION);

        Self {
            window,
            config,
            dispatcher,
            validation,
            list_box,
            combo_box,
        }
    }

    /// Parse `html` into a fresh window and attach to it
    pub fn from_markup(html: &str, config: UiConfig) -> Result<Self, fos_html::ParseError> {
        let document = fos_html::parse(html)?;
        Ok(Self::new(Window::new(document), config))
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn config(&self) -> &UiConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Rc<Dispatcher> {
        &self.dispatcher
    }

    pub fn validation(&self) -> &Rc<Validation> {
        &self.validation
    }

    pub fn list_box(&self) -> &Rc<ListBox> {
        &self.list_box
    }

    pub fn combo_box(&self) -> &Rc<ComboBox> {
        &self.combo_box
    }

    /// Element by id
    pub fn element(&self, id: &str) -> Option<NodeId> {
        self.window.document().get_element_by_id(id)
    }

    /// Every list box in the document, in tree order
    pub fn lists(&self) -> Vec<NodeId> {
        Self::lists_in(&self.window.document())
    }

    fn lists_in(doc: &Document) -> Vec<NodeId> {
        doc.query_all(doc.root(), |e| e.get_attr("role") == Some("listbox"))
    }

    /// Values, labels and error of every list box
    pub fn snapshot(&self) -> Vec<ListSnapshot> {
        let doc = self.window.document();
        Self::lists_in(&doc)
            .into_iter()
            .map(|list| ListSnapshot {
                id: doc.attr(list, "id").map(str::to_string),
                values: ListBox::values(&doc, list).into_iter().collect(),
                labels: ListBox::labels(&doc, list),
                error: self.validation.error(&doc, list),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PETS: &str = r#"
        <div id="pets" role="listbox" data-on-click="listbox">
          <label id="cat" data-value="cat"><input type="radio" name="pet" value="cat" checked>Cat</label>
          <label id="dog" data-value="dog"><input type="radio" name="pet" value="dog">Dog</label>
        </div>
    "#;

    #[test]
    fn test_snapshot_reads_every_list() {
        let ui = Ui::from_markup(PETS, UiConfig::default()).unwrap();
        let snapshot = ui.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id.as_deref(), Some("pets"));
        assert_eq!(snapshot[0].values, vec!["cat".to_string()]);
        assert_eq!(snapshot[0].labels, vec!["Cat".to_string()]);
        assert_eq!(snapshot[0].error, None);
    }

    #[test]
    fn test_listeners_attach_once() {
        let ui = Ui::from_markup(PETS, UiConfig::default()).unwrap();
        let clicks = ui.window().document().listener_count("click");
        ui.dispatcher().attach(ui.window());
        assert_eq!(ui.window().document().listener_count("click"), clicks);
    }
}
