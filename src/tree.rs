// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A mutable SVG element tree.
//!
//! Similar in spirit to `roxmltree`, which is used for parsing,
//! but stores nodes in an owned arena so the normalization pipeline
//! can rewrite attributes, prune subtrees and inject elements
//! before serialization.

use std::num::NonZeroU32;

use xmlwriter::XmlWriter;

/// The SVG XML namespace.
pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
/// The XLink XML namespace.
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// A node identifier inside a [`Document`] arena.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    #[inline]
    fn new(id: usize) -> Self {
        debug_assert!(id < u32::MAX as usize);

        // We are using `NonZeroU32` to reduce overhead of `Option<NodeId>`.
        NodeId(NonZeroU32::new(id as u32 + 1).unwrap())
    }

    #[inline]
    fn get(self) -> usize {
        self.0.get() as usize - 1
    }
}

#[derive(Clone, Debug)]
enum NodeKind {
    Element {
        tag_name: String,
        attributes: Vec<Attribute>,
    },
    Text(String),
}

#[derive(Clone, Debug)]
struct NodeData {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// An attribute.
#[derive(Clone, PartialEq, Debug)]
pub struct Attribute {
    /// Attribute's name, prefixed for the XLink and XML namespaces.
    pub name: String,
    /// Attribute's value.
    pub value: String,
}

/// An SVG document as a mutable tree of element and text nodes.
///
/// The node at index 0 is always the root element.
/// Detached nodes stay in the arena, but are unreachable from the root.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Document {
    /// Parses a document from an SVG string.
    pub fn parse(text: &str) -> Result<Self, roxmltree::Error> {
        let xml = roxmltree::Document::parse(text.trim())?;
        let root = xml.root_element();

        let mut doc = Document { nodes: Vec::new() };
        append_xml_node(root, None, &mut doc);
        debug_assert!(!doc.nodes.is_empty());
        Ok(doc)
    }

    /// Creates a document from a single, child-less element.
    pub fn new_element(tag_name: &str) -> Self {
        Document {
            nodes: vec![NodeData {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Element {
                    tag_name: tag_name.to_string(),
                    attributes: Vec::new(),
                },
            }],
        }
    }

    /// Returns the root element.
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::new(0)
    }

    #[inline]
    fn get(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.get()]
    }

    #[inline]
    fn get_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.get()]
    }

    /// Checks if the node is an element.
    #[inline]
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.get(id).kind, NodeKind::Element { .. })
    }

    /// Returns an element's tag name.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.get(id).kind {
            NodeKind::Element { ref tag_name, .. } => Some(tag_name),
            _ => None,
        }
    }

    /// Returns a text node's content.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.get(id).kind {
            NodeKind::Text(ref text) => Some(text),
            _ => None,
        }
    }

    /// Returns the parent node.
    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).parent
    }

    /// Returns node's children.
    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.get(id).children
    }

    /// Returns node's element children.
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
            .collect()
    }

    /// Returns the node and its descendants in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut list = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            list.push(node);
            for &child in self.children(node).iter().rev() {
                stack.push(child);
            }
        }
        list
    }

    /// Returns all reachable elements with the given tag name.
    pub fn elements_by_tag_name(&self, tag_name: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&id| self.tag_name(id) == Some(tag_name))
            .collect()
    }

    /// Returns an attribute value.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.get(id).kind {
            NodeKind::Element { ref attributes, .. } => attributes
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.value.as_str()),
            _ => None,
        }
    }

    /// Checks if an attribute is present.
    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    /// Returns a list of all element's attributes.
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match self.get(id).kind {
            NodeKind::Element { ref attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Sets an attribute, replacing an existing value.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeKind::Element { ref mut attributes, .. } = self.get_mut(id).kind {
            match attributes.iter_mut().find(|a| a.name == name) {
                Some(attr) => attr.value = value.to_string(),
                None => attributes.push(Attribute {
                    name: name.to_string(),
                    value: value.to_string(),
                }),
            }
        }
    }

    /// Removes an attribute, if present.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        if let NodeKind::Element { ref mut attributes, .. } = self.get_mut(id).kind {
            attributes.retain(|a| a.name != name);
        }
    }

    /// Returns a declaration value from the element's inline `style` attribute.
    pub fn style_property(&self, id: NodeId, name: &str) -> Option<&str> {
        let style = self.attribute(id, "style")?;
        simplecss::DeclarationTokenizer::from(style)
            .find(|d| d.name == name)
            .map(|d| d.value)
    }

    /// Detaches a node from its parent.
    ///
    /// The subtree stays in the arena, but is no longer reachable.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.get(id).parent {
            self.get_mut(parent).children.retain(|&c| c != id);
            self.get_mut(id).parent = None;
        }
    }

    /// Creates a new element and inserts it as the parent's first child.
    pub fn insert_new_element(&mut self, parent: NodeId, tag_name: &str) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(NodeData {
            parent: Some(parent),
            children: Vec::new(),
            kind: NodeKind::Element {
                tag_name: tag_name.to_string(),
                attributes: Vec::new(),
            },
        });
        self.get_mut(parent).children.insert(0, id);
        id
    }

    /// Resolves a structural path of element-child indexes, starting at the root.
    ///
    /// An empty path addresses the root itself.
    pub fn node_by_path(&self, path: &[usize]) -> Option<NodeId> {
        let mut node = self.root();
        for &index in path {
            node = self.element_children(node).get(index).copied()?;
        }
        Some(node)
    }

    /// Returns every reachable element whose position matches the selector.
    ///
    /// Matches are returned as structural paths (see [`Document::node_by_path`]),
    /// so they can be applied to a structurally identical clone.
    pub fn select(&self, selector: &simplecss::Selector) -> Vec<Vec<usize>> {
        let mut matches = Vec::new();
        self.select_impl(self.root(), &mut Vec::new(), selector, &mut matches);
        matches
    }

    fn select_impl(
        &self,
        id: NodeId,
        path: &mut Vec<usize>,
        selector: &simplecss::Selector,
        matches: &mut Vec<Vec<usize>>,
    ) {
        if selector.matches(&Node { doc: self, id }) {
            matches.push(path.clone());
        }

        for (index, child) in self.element_children(id).into_iter().enumerate() {
            path.push(index);
            self.select_impl(child, path, selector, matches);
            path.pop();
        }
    }

    /// Serializes the reachable tree into an SVG string.
    ///
    /// The root tag always declares the SVG and XLink namespaces exactly once.
    /// When `replace_current_color` is set, every `currentColor` token in the
    /// output is replaced with `black`.
    pub fn to_string(&self, replace_current_color: bool) -> String {
        let opt = xmlwriter::Options {
            indent: xmlwriter::Indent::None,
            ..xmlwriter::Options::default()
        };
        let mut xml = XmlWriter::new(opt);
        self.write_node(self.root(), true, &mut xml);
        let text = xml.end_document();

        if replace_current_color {
            text.replace("currentColor", "black")
        } else {
            text
        }
    }

    fn write_node(&self, id: NodeId, is_root: bool, xml: &mut XmlWriter) {
        match self.get(id).kind {
            NodeKind::Element { ref tag_name, ref attributes } => {
                xml.start_element(tag_name);
                if is_root {
                    xml.write_attribute("xmlns", SVG_NS);
                    xml.write_attribute("xmlns:xlink", XLINK_NS);
                }
                for attr in attributes {
                    if attr.name == "xmlns" || attr.name.starts_with("xmlns:") {
                        continue;
                    }
                    xml.write_attribute(&attr.name, &attr.value);
                }
                for &child in self.children(id) {
                    self.write_node(child, false, xml);
                }
                xml.end_element();
            }
            NodeKind::Text(ref text) => xml.write_text(text),
        }
    }
}

fn append_xml_node(node: roxmltree::Node, parent: Option<NodeId>, doc: &mut Document) {
    let kind = if node.is_element() {
        match node.tag_name().namespace() {
            None | Some(SVG_NS) => {}
            // Foreign content cannot be expressed in the exported artifact.
            // The root is kept regardless, the exporters validate it themselves.
            _ if parent.is_some() => return,
            _ => {}
        }

        let mut attributes = Vec::new();
        for attr in node.attributes() {
            let name = match attr.namespace() {
                None | Some(SVG_NS) => attr.name().to_string(),
                Some(XLINK_NS) => format!("xlink:{}", attr.name()),
                Some(XML_NS) => format!("xml:{}", attr.name()),
                _ => continue,
            };
            attributes.push(Attribute {
                name,
                value: attr.value().to_string(),
            });
        }

        NodeKind::Element {
            tag_name: node.tag_name().name().to_string(),
            attributes,
        }
    } else if node.is_text() {
        match node.text() {
            Some(text) if !text.trim().is_empty() => NodeKind::Text(text.to_string()),
            _ => return,
        }
    } else {
        return;
    };

    let id = NodeId::new(doc.nodes.len());
    doc.nodes.push(NodeData {
        parent,
        children: Vec::new(),
        kind,
    });
    if let Some(parent) = parent {
        doc.get_mut(parent).children.push(id);
    }

    for child in node.children() {
        append_xml_node(child, Some(id), doc);
    }
}

/// A borrowed node, used for CSS selector matching.
#[derive(Clone, Copy, Debug)]
pub struct Node<'a> {
    pub(crate) doc: &'a Document,
    pub(crate) id: NodeId,
}

impl simplecss::Element for Node<'_> {
    fn parent_element(&self) -> Option<Self> {
        self.doc.parent(self.id).map(|id| Node { doc: self.doc, id })
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        let parent = self.doc.parent(self.id)?;
        let siblings = self.doc.element_children(parent);
        let pos = siblings.iter().position(|&id| id == self.id)?;
        if pos == 0 {
            None
        } else {
            Some(Node { doc: self.doc, id: siblings[pos - 1] })
        }
    }

    fn has_local_name(&self, local_name: &str) -> bool {
        self.doc.tag_name(self.id) == Some(local_name)
    }

    fn attribute_matches(&self, local_name: &str, operator: simplecss::AttributeOperator) -> bool {
        match self.doc.attribute(self.id, local_name) {
            Some(value) => operator.matches(value),
            None => false,
        }
    }

    fn pseudo_class_matches(&self, class: simplecss::PseudoClass) -> bool {
        match class {
            simplecss::PseudoClass::FirstChild => self.prev_sibling_element().is_none(),
            // Since we are querying a static SVG we can ignore other pseudo-classes.
            _ => false,
        }
    }
}
