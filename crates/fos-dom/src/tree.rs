//! DOM Tree (arena-based allocation)
//!
//! Nodes are never freed: removing a node only detaches it, so a `NodeId`
//! held by a behavior stays valid (and reports `is_connected() == false`).

use crate::{DomError, ElementData, Fragment, FragmentNode, Node, NodeData, NodeId};

/// Arena-based DOM tree
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
        }
    }

    /// Root (document) node
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes ever allocated
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(Node::element(tag))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(Node::text(text))
    }

    /// Create a detached comment node
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(Node {
            parent: None,
            children: Vec::new(),
            data: NodeData::Comment(text.to_string()),
        })
    }

    /// Element data for `id`, if it is an element
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    /// Mutable element data for `id`
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).and_then(Node::as_element_mut)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    /// Lowercase tag name
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Children of `id` (empty for unknown nodes)
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Append `child` to `parent`, detaching it from its old parent first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or at the end)
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.get(parent).ok_or(DomError::MissingNode(parent))?;
        self.get(child).ok_or(DomError::MissingNode(child))?;
        if child == NodeId::ROOT || self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        self.remove(child);

        let siblings = &mut self.nodes[parent.index()].children;
        let pos = reference
            .and_then(|r| siblings.iter().position(|&c| c == r))
            .unwrap_or(siblings.len());
        siblings.insert(pos, child);
        self.nodes[child.index()].parent = Some(parent);
        Ok(())
    }

    /// Detach a node from its parent
    pub fn remove(&mut self, child: NodeId) {
        let Some(parent) = self.parent(child) else {
            return;
        };
        self.nodes[parent.index()].children.retain(|&c| c != child);
        self.nodes[child.index()].parent = None;
    }

    /// Replace every child of `parent` with `children`
    pub fn replace_children(&mut self, parent: NodeId, children: &[NodeId]) -> Result<(), DomError> {
        for old in self.children(parent).to_vec() {
            self.remove(old);
        }
        for &child in children {
            self.append_child(parent, child)?;
        }
        Ok(())
    }

    /// Inclusive ancestor check
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// Reachable from the document node
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.ancestors(id).last() == Some(NodeId::ROOT)
    }

    /// `id` followed by each ancestor up to the root
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.get(id).map(|_| id),
        }
    }

    /// Event path from `target` outward
    pub fn composed_path(&self, target: NodeId) -> Vec<NodeId> {
        self.ancestors(target).collect()
    }

    /// Closest inclusive ancestor element matching `pred`
    pub fn closest(&self, id: NodeId, pred: impl Fn(&ElementData) -> bool) -> Option<NodeId> {
        self.ancestors(id)
            .find(|&a| self.element(a).is_some_and(&pred))
    }

    /// Descendants of `id` in document order, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Descendant elements matching `pred`
    pub fn query_all(&self, root: NodeId, pred: impl Fn(&ElementData) -> bool) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&d| self.element(d).is_some_and(&pred))
            .collect()
    }

    /// First descendant element matching `pred`
    pub fn query(&self, root: NodeId, pred: impl Fn(&ElementData) -> bool) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|&d| self.element(d).is_some_and(&pred))
    }

    /// Connected element with the given `id` attribute
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.query(NodeId::ROOT, |e| e.get_attr("id") == Some(id))
    }

    /// Attribute value
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.get_attr(name))
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_attr(name))
    }

    /// Attribute equals `"true"`
    pub fn attr_is_true(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name) == Some("true")
    }

    /// Set an attribute; ignored for non-elements
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(el) = self.element_mut(id) {
            el.set_attr(name, value.into());
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id).and_then(|e| e.remove_attr(name))
    }

    /// Concatenated descendant text
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.get(id).and_then(Node::as_text) {
            return text.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|d| self.get(d).and_then(Node::as_text))
            .collect()
    }

    /// Replace the children of `id` with a single text node (none for "")
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        let children = if text.is_empty() {
            Vec::new()
        } else {
            vec![self.create_text(text)]
        };
        // A fresh text node cannot violate hierarchy rules
        let _ = self.replace_children(id, &children);
    }

    /// An `id` attribute value unused in the document
    pub fn unique_id(&mut self, prefix: &str) -> String {
        let mut n = self.nodes.len();
        loop {
            let candidate = format!("{prefix}-{n}");
            if self.get_element_by_id(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Instantiate a fragment as detached nodes, returning its roots
    pub fn import(&mut self, fragment: &Fragment) -> Vec<NodeId> {
        fragment
            .nodes
            .iter()
            .map(|node| self.import_node(node))
            .collect()
    }

    fn import_node(&mut self, node: &FragmentNode) -> NodeId {
        match node {
            FragmentNode::Text(text) => self.create_text(text),
            FragmentNode::Element {
                tag,
                attrs,
                children,
            } => {
                let id = self.create_element(tag);
                if let Some(el) = self.element_mut(id) {
                    for (name, value) in attrs {
                        el.set_attr(name, value.clone());
                    }
                    el.checked = el.has_attr("checked");
                }
                for child in children {
                    let child_id = self.import_node(child);
                    // Freshly created nodes are always detached
                    let _ = self.append_child(id, child_id);
                }
                id
            }
        }
    }

    /// Current checkedness
    pub fn checked(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(|e| e.checked)
    }

    pub fn set_checked(&mut self, id: NodeId, checked: bool) {
        if let Some(el) = self.element_mut(id) {
            el.checked = checked;
        }
    }

    /// Checkedness restored on form reset
    pub fn default_checked(&self, id: NodeId) -> bool {
        self.has_attr(id, "checked")
    }

    /// Current value of a control
    pub fn value(&self, id: NodeId) -> String {
        let Some(el) = self.element(id) else {
            return String::new();
        };
        if el.is_checkable() {
            return el.get_attr("value").unwrap_or("on").to_string();
        }
        el.dirty_value
            .clone()
            .or_else(|| el.get_attr("value").map(str::to_string))
            .unwrap_or_default()
    }

    /// Set the value as a user edit would
    pub fn set_value(&mut self, id: NodeId, value: &str) {
        if let Some(el) = self.element_mut(id) {
            if el.is_checkable() || el.input_type().as_deref() == Some("hidden") {
                el.set_attr("value", value.to_string());
            } else {
                el.dirty_value = Some(value.to_string());
            }
        }
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Inclusive ancestor iterator
#[derive(Debug)]
pub struct Ancestors<'a> {
    tree: &'a DomTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_tree() -> (DomTree, NodeId, Vec<NodeId>) {
        let mut tree = DomTree::new();
        let list = tree.create_element("ul");
        tree.append_child(NodeId::ROOT, list).unwrap();
        let items: Vec<NodeId> = ["a", "b", "c"]
            .iter()
            .map(|v| {
                let li = tree.create_element("li");
                tree.set_attr(li, "data-value", *v);
                let text = tree.create_text(&v.to_uppercase());
                tree.append_child(li, text).unwrap();
                tree.append_child(list, li).unwrap();
                li
            })
            .collect();
        (tree, list, items)
    }

    #[test]
    fn test_append_and_reparent() {
        let (mut tree, list, items) = list_tree();
        assert_eq!(tree.children(list), items.as_slice());

        let other = tree.create_element("div");
        tree.append_child(NodeId::ROOT, other).unwrap();
        tree.append_child(other, items[0]).unwrap();

        assert_eq!(tree.children(list), &items[1..]);
        assert_eq!(tree.parent(items[0]), Some(other));
    }

    #[test]
    fn test_hierarchy_request_rejected() {
        let (mut tree, list, items) = list_tree();
        let err = tree.append_child(items[0], list).unwrap_err();
        assert!(matches!(err, DomError::HierarchyRequest { .. }));
    }

    #[test]
    fn test_closest_and_path() {
        let (tree, list, items) = list_tree();
        let text = tree.children(items[1])[0];

        assert_eq!(tree.closest(text, |e| e.has_attr("data-value")), Some(items[1]));
        assert_eq!(tree.composed_path(text), vec![text, items[1], list, NodeId::ROOT]);
    }

    #[test]
    fn test_detached_node_is_not_connected() {
        let (mut tree, _list, items) = list_tree();
        assert!(tree.is_connected(items[2]));
        tree.remove(items[2]);
        assert!(!tree.is_connected(items[2]));
    }

    #[test]
    fn test_text_content_and_replace() {
        let (mut tree, list, items) = list_tree();
        assert_eq!(tree.text_content(list), "ABC");

        tree.set_text_content(items[0], "apple");
        assert_eq!(tree.text_content(items[0]), "apple");
    }

    #[test]
    fn test_checkbox_value_defaults_to_on() {
        let mut tree = DomTree::new();
        let input = tree.create_element("input");
        tree.set_attr(input, "type", "checkbox");
        assert_eq!(tree.value(input), "on");

        let text = tree.create_element("input");
        tree.set_attr(text, "value", "initial");
        tree.set_value(text, "typed");
        assert_eq!(tree.value(text), "typed");
        assert_eq!(tree.attr(text, "value"), Some("initial"));
    }
}
