//! Document fragments
//!
//! Owned, detached markup produced by the HTML parser or by an async option
//! source. A fragment becomes live nodes through `DomTree::import`.

/// Detached list of sibling nodes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub nodes: Vec<FragmentNode>,
}

/// Fragment node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentNode {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<FragmentNode>,
    },
    Text(String),
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a root node
    pub fn with(mut self, node: FragmentNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn push(&mut self, node: FragmentNode) {
        self.nodes.push(node);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl FromIterator<FragmentNode> for Fragment {
    fn from_iter<I: IntoIterator<Item = FragmentNode>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

impl FragmentNode {
    /// Element with no attributes or children
    pub fn element(tag: &str) -> Self {
        Self::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn text(text: &str) -> Self {
        Self::Text(text.to_string())
    }

    /// Builder: add an attribute (no-op on text)
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        if let Self::Element { attrs, .. } = &mut self {
            attrs.push((name.to_string(), value.to_string()));
        }
        self
    }

    /// Builder: append a child (no-op on text)
    pub fn child(mut self, node: FragmentNode) -> Self {
        if let Self::Element { children, .. } = &mut self {
            children.push(node);
        }
        self
    }

    /// Attribute lookup on an element node
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        match self {
            Self::Element { attrs, .. } => attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            Self::Text(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let option = FragmentNode::element("li")
            .attr("role", "option")
            .attr("data-value", "red")
            .child(FragmentNode::text("Red"));

        assert_eq!(option.get_attr("data-value"), Some("red"));
        assert_eq!(FragmentNode::text("x").get_attr("role"), None);

        let frag: Fragment = vec![option.clone(), option].into_iter().collect();
        assert_eq!(frag.len(), 2);
    }
}
