//! HTML5 Parser implementation
//!
//! Uses html5ever's built-in RcDom and converts the `<body>` content into a
//! `Fragment`, which the document then imports.

use fos_dom::{Document, Fragment, FragmentNode};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use crate::ParseError;

/// HTML5 parser
#[derive(Debug, Clone, Copy)]
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self
    }

    /// Parse markup into a fresh document, placing body content under `<body>`
    pub fn parse(&self, html: &str) -> Result<Document, ParseError> {
        let fragment = self.parse_fragment(html)?;
        let mut document = Document::new();
        let body = document.body();
        for node in document.import(&fragment) {
            document.append_child(body, node)?;
        }
        tracing::debug!("Parsed {} nodes", document.tree().len());
        Ok(document)
    }

    /// Parse markup into detached body-level nodes
    pub fn parse_fragment(&self, html: &str) -> Result<Fragment, ParseError> {
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())?;

        let mut fragment = Fragment::new();
        if let Some(body) = find_element(&dom.document, "body") {
            for child in body.children.borrow().iter() {
                if is_whitespace(child) {
                    continue;
                }
                if let Some(node) = convert_node(child) {
                    fragment.push(node);
                }
            }
        }
        Ok(fragment)
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

fn find_element(handle: &Handle, tag: &str) -> Option<Handle> {
    if let RcNodeData::Element { name, .. } = &handle.data {
        if &*name.local == tag {
            return Some(handle.clone());
        }
    }
    handle
        .children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, tag))
}

/// Elements whose neighbouring whitespace never renders
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "details", "dialog", "div", "dl",
    "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hr", "li", "main", "nav", "ol", "option", "p", "pre", "section", "select",
    "summary", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

fn is_whitespace(handle: &Handle) -> bool {
    match &handle.data {
        RcNodeData::Text { contents } => contents.borrow().trim().is_empty(),
        _ => false,
    }
}

/// Text or an inline element; comments and block elements break a run
fn is_inline(handle: &Handle) -> bool {
    match &handle.data {
        RcNodeData::Text { .. } => true,
        RcNodeData::Element { name, .. } => !BLOCK_TAGS.contains(&&*name.local),
        _ => false,
    }
}

/// Children of an element, with whitespace-only text collapsed to one space
/// between inline siblings and dropped everywhere else
fn convert_children(handle: &Handle) -> Vec<FragmentNode> {
    let children = handle.children.borrow();
    let mut nodes = Vec::with_capacity(children.len());
    for (i, child) in children.iter().enumerate() {
        if is_whitespace(child) {
            let inline_before = i > 0 && is_inline(&children[i - 1]);
            let inline_after = children.get(i + 1).is_some_and(is_inline);
            if inline_before && inline_after {
                nodes.push(FragmentNode::Text(" ".to_string()));
            }
            continue;
        }
        nodes.extend(convert_node(child));
    }
    nodes
}

/// Convert an RcDom node to a fragment node
fn convert_node(handle: &Handle) -> Option<FragmentNode> {
    match &handle.data {
        RcNodeData::Text { contents } => Some(FragmentNode::Text(contents.borrow().to_string())),
        RcNodeData::Element { name, attrs, .. } => {
            let attrs = attrs
                .borrow()
                .iter()
                .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                .collect();
            let children = convert_children(handle);
            Some(FragmentNode::Element {
                tag: name.local.to_string(),
                attrs,
                children,
            })
        }
        RcNodeData::Document
        | RcNodeData::Doctype { .. }
        | RcNodeData::Comment { .. }
        | RcNodeData::ProcessingInstruction { .. } => None,
    }
}
