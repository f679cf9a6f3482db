//! Arena form of a page.
//!
//! Nodes are addressed by [`NodeId`] instead of by reference, so the class
//! map and the preview map can both refer to "this exact node" without
//! borrowing the tree. Import nodes own a lazily built expansion: the
//! page-local copy of the component they import.

use crate::element::{Element, Page};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fmt;

/// Stable index of a node inside a [`PageTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        NodeId(index)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a node's definition comes from.
///
/// Nodes copied from the same position of the same component share an
/// origin, which is what the CSS pass keys shared classes on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Built from the page itself (or rewritten by an edit)
    Page(NodeId),
    /// Copied from a component; `path` is the child-index path inside its definition
    Component { reference: String, path: Vec<usize> },
}

/// One element of the arena
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: String,
    pub attributes: BTreeMap<String, String>,
    pub style: IndexMap<String, String>,
    pub text: String,
    pub import: String,
    pub private: bool,
    pub pid: String,
    pub children: Vec<NodeId>,
    pub(crate) origin: Origin,
    pub(crate) expansion: Option<NodeId>,
}

impl Node {
    fn from_element(element: &Element, origin: Origin) -> Self {
        Self {
            kind: element.kind.clone(),
            attributes: element.attributes.clone(),
            style: element.style.clone(),
            text: element.text.clone(),
            import: element.import.clone(),
            private: element.private,
            pid: element.pid.clone(),
            children: Vec::new(),
            origin,
            expansion: None,
        }
    }

    pub fn is_import(&self) -> bool {
        !self.import.is_empty()
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// The component copy this import node renders as, once built
    pub fn expansion(&self) -> Option<NodeId> {
        self.expansion
    }
}

/// A page's head and body held as one arena of nodes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageTree {
    nodes: Vec<Node>,
    head: Vec<NodeId>,
    body: Vec<NodeId>,
}

impl PageTree {
    pub fn from_page(page: &Page) -> Self {
        Self::from_elements(&page.head.elements, &page.body.elements)
    }

    pub fn from_elements(head: &[Element], body: &[Element]) -> Self {
        let mut tree = Self::default();
        let head: Vec<NodeId> = head.iter().map(|el| tree.push_page_element(el)).collect();
        let body: Vec<NodeId> = body.iter().map(|el| tree.push_page_element(el)).collect();
        tree.head = head;
        tree.body = body;
        tree
    }

    pub fn head(&self) -> &[NodeId] {
        &self.head
    }

    pub fn body(&self) -> &[NodeId] {
        &self.body
    }

    /// Panics if `id` does not belong to this tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Number of nodes in the arena, including component expansions
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Rebuild the JSON element for a node and its subtree
    pub fn to_element(&self, id: NodeId) -> Element {
        let node = self.node(id);
        Element {
            kind: node.kind.clone(),
            attributes: node.attributes.clone(),
            elements: node.children.iter().map(|&c| self.to_element(c)).collect(),
            text: node.text.clone(),
            style: node.style.clone(),
            import: node.import.clone(),
            private: node.private,
            pid: node.pid.clone(),
        }
    }

    /// Overwrite a node in place with `element`. Children are rebuilt as
    /// page nodes; an import node loses its cached expansion.
    pub fn replace(&mut self, id: NodeId, element: &Element) {
        let children: Vec<NodeId> = element
            .elements
            .iter()
            .map(|child| self.push_page_element(child))
            .collect();
        let node = self.node_mut(id);
        node.kind = element.kind.clone();
        node.attributes = element.attributes.clone();
        node.style = element.style.clone();
        node.text = element.text.clone();
        node.import = element.import.clone();
        node.private = element.private;
        node.pid = element.pid.clone();
        node.children = children;
        node.origin = Origin::Page(id);
        node.expansion = None;
    }

    /// Return the import node's expansion, building it from `component` on
    /// first use. The copy takes the importer's overlays: style entries and
    /// attributes (importer wins per key), non-empty text, and pid. Pids in
    /// the component definition are not copied; every use gets its own.
    pub(crate) fn expand(
        &mut self,
        importer: NodeId,
        reference: &str,
        component: &Element,
    ) -> NodeId {
        if let Some(existing) = self.node(importer).expansion {
            return existing;
        }

        let root = self.push_component_element(component, reference, &mut Vec::new());
        let source = self.node(importer).clone();
        let copy = self.node_mut(root);
        for (property, value) in &source.style {
            copy.style.insert(property.clone(), value.clone());
        }
        for (name, value) in &source.attributes {
            copy.attributes.insert(name.clone(), value.clone());
        }
        if !source.text.is_empty() {
            copy.text = source.text.clone();
        }
        if !source.pid.is_empty() {
            copy.pid = source.pid.clone();
        }

        self.node_mut(importer).expansion = Some(root);
        root
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn push_page_element(&mut self, element: &Element) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.push(Node::from_element(element, Origin::Page(id)));
        let children: Vec<NodeId> = element
            .elements
            .iter()
            .map(|child| self.push_page_element(child))
            .collect();
        self.node_mut(id).children = children;
        id
    }

    fn push_component_element(
        &mut self,
        element: &Element,
        reference: &str,
        path: &mut Vec<usize>,
    ) -> NodeId {
        let origin = Origin::Component {
            reference: reference.to_string(),
            path: path.clone(),
        };
        let mut node = Node::from_element(element, origin);
        node.pid.clear();
        let id = self.push(node);
        let mut children = Vec::with_capacity(element.elements.len());
        for (index, child) in element.elements.iter().enumerate() {
            path.push(index);
            children.push(self.push_component_element(child, reference, path));
            path.pop();
        }
        self.node_mut(id).children = children;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_page() -> Page {
        Page::new(
            vec![Element::new("title").with_text("Home")],
            vec![Element::new("div")
                .with_style("color", "red")
                .with_child(Element::new("h1").with_text("Hi"))
                .with_child(Element::import("card").with_text("Local"))],
        )
    }

    #[test]
    fn test_round_trip_through_arena() {
        let page = sample_page();
        let tree = PageTree::from_page(&page);
        assert_eq!(tree.head().len(), 1);
        assert_eq!(tree.body().len(), 1);
        assert_eq!(tree.to_element(tree.body()[0]), page.body.elements[0]);
        assert_eq!(tree.to_element(tree.head()[0]), page.head.elements[0]);
    }

    #[test]
    fn test_page_nodes_are_their_own_origin() {
        let tree = PageTree::from_page(&sample_page());
        let div = tree.body()[0];
        assert_eq!(tree.node(div).origin(), &Origin::Page(div));
    }

    #[test]
    fn test_expand_overlays_importer_and_leaves_component_alone() {
        let mut tree = PageTree::from_page(&sample_page());
        let div = tree.body()[0];
        let importer = tree.node(div).children[1];
        tree.node_mut(importer).style.insert("color".into(), "blue".into());
        tree.node_mut(importer).attributes.insert("id".into(), "featured".into());

        let component = Element::new("section")
            .with_text("Default")
            .with_style("color", "black")
            .with_style("padding", "4px")
            .with_attribute("id", "card")
            .with_attribute("role", "note")
            .with_child(Element::new("p").with_text("Body"));
        let snapshot = component.clone();

        let root = tree.expand(importer, "card", &component);
        let copy = tree.node(root);
        assert_eq!(copy.kind, "section");
        assert_eq!(copy.text, "Local");
        assert_eq!(copy.style["color"], "blue");
        assert_eq!(copy.style["padding"], "4px");
        assert_eq!(copy.attributes["id"], "featured");
        assert_eq!(copy.attributes["role"], "note");
        assert_eq!(
            copy.origin(),
            &Origin::Component { reference: "card".into(), path: vec![] }
        );
        let child = copy.children[0];
        assert_eq!(
            tree.node(child).origin(),
            &Origin::Component { reference: "card".into(), path: vec![0] }
        );
        assert_eq!(component, snapshot);

        // Second request for the same importer reuses the copy.
        assert_eq!(tree.expand(importer, "card", &component), root);
    }

    #[test]
    fn test_replace_rewrites_in_place() {
        let mut tree = PageTree::from_page(&sample_page());
        let div = tree.body()[0];
        tree.node_mut(div).pid = "div_abcdef".into();
        let edited = Element::new("section")
            .with_text("Edited")
            .with_child(Element::new("em").with_text("new"));
        tree.replace(div, &edited);

        assert_eq!(tree.body()[0], div);
        assert_eq!(tree.to_element(div), edited);
    }

    #[test]
    fn test_expand_drops_component_pids() {
        let page = Page::new(
            vec![],
            vec![Element::import("chip"), Element::import("chip").with_pid("x")],
        );
        let mut tree = PageTree::from_page(&page);
        let (first, second) = (tree.body()[0], tree.body()[1]);
        let component = Element::new("span")
            .with_pid("fixed")
            .with_child(Element::new("b").with_pid("inner"));

        let plain = tree.expand(first, "chip", &component);
        let marked = tree.expand(second, "chip", &component);
        assert_eq!(tree.node(plain).pid, "");
        assert_eq!(tree.node(tree.node(plain).children[0]).pid, "");
        assert_eq!(tree.node(marked).pid, "x");
    }
}
