//! Tree Builder
//!
//! Builds an [`ElementTree`] from a sequence of calls made in document
//! order. Namespace declarations are resolved while building, so the
//! finished tree carries a resolved namespace URI on every element and
//! prefixed attribute.

use thiserror::Error;

use super::namespace::NamespaceResolver;
use super::node::{NamespaceDecl, NodeId, TreeNode, XmlAttribute};
use super::tree::ElementTree;

/// Errors raised while building a tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("element or target name is empty")]
    EmptyName,
    #[error("prefix `{0}` is not bound to a namespace")]
    UnboundPrefix(String),
    #[error("prefix `{0}` is reserved and cannot be redeclared")]
    ReservedPrefix(String),
    #[error("end of element without a matching start")]
    UnbalancedEnd,
    #[error("unclosed element <{0}>")]
    UnclosedElement(String),
    #[error("tree has no nodes")]
    Empty,
    #[error("invalid tree term: {0}")]
    InvalidTerm(&'static str),
}

impl BuildError {
    /// Short machine-readable reason, used as an atom at the NIF boundary
    pub fn reason(&self) -> &'static str {
        match self {
            BuildError::EmptyName => "empty_name",
            BuildError::UnboundPrefix(_) => "unbound_prefix",
            BuildError::ReservedPrefix(_) => "reserved_prefix",
            BuildError::UnbalancedEnd => "unbalanced_end",
            BuildError::UnclosedElement(_) => "unclosed_element",
            BuildError::Empty => "empty",
            BuildError::InvalidTerm(_) => "invalid_term",
        }
    }
}

/// Split `prefix:local` at the first colon
#[inline]
pub(crate) fn split_qname(name: &str) -> (Option<&str>, &str) {
    match memchr::memchr(b':', name.as_bytes()) {
        Some(pos) => (Some(&name[..pos]), &name[pos + 1..]),
        None => (None, name),
    }
}

/// Resolved pieces of an element, computed before the arenas are touched
struct PendingElement {
    name_id: u32,
    prefix_id: u32,
    namespace_id: u32,
    attributes: Vec<XmlAttribute>,
    namespaces: Vec<NamespaceDecl>,
}

/// Incremental element tree builder
pub struct TreeBuilder {
    tree: ElementTree,
    /// Currently open elements, outermost first
    open: Vec<NodeId>,
    /// Last top-level node, for sibling linking
    last_top: Option<NodeId>,
    resolver: NamespaceResolver,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        let mut tree = ElementTree {
            nodes: Vec::with_capacity(256),
            attributes: Vec::with_capacity(128),
            ..ElementTree::default()
        };
        let resolver = NamespaceResolver::new(&mut tree.strings);
        TreeBuilder {
            tree,
            open: Vec::new(),
            last_top: None,
            resolver,
        }
    }

    /// Open an element; children follow until [`end_element`](Self::end_element)
    pub fn start_element(&mut self, qname: &str, attrs: &[(&str, &str)]) -> Result<NodeId, BuildError> {
        self.resolver.push_scope();
        let pending = match self.resolve_element(qname, attrs) {
            Ok(p) => p,
            Err(e) => {
                self.resolver.pop_scope();
                return Err(e);
            }
        };
        let node = TreeNode::element(pending.name_id, self.parent(), self.depth());
        let id = self.commit(node, pending);
        self.open.push(id);
        Ok(id)
    }

    /// Add a complete element whose only content is `text`
    pub fn leaf_text_element(
        &mut self,
        qname: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> Result<NodeId, BuildError> {
        self.resolver.push_scope();
        let pending = self.resolve_element(qname, attrs);
        self.resolver.pop_scope();
        let pending = pending?;

        let text_id = self.tree.strings.intern(text);
        let node = TreeNode::leaf_text_element(pending.name_id, text_id, self.parent(), self.depth());
        Ok(self.commit(node, pending))
    }

    /// Close the innermost open element
    pub fn end_element(&mut self) -> Result<NodeId, BuildError> {
        let id = self.open.pop().ok_or(BuildError::UnbalancedEnd)?;
        self.resolver.pop_scope();
        Ok(id)
    }

    /// Add a comment node
    pub fn comment(&mut self, content: &str) -> NodeId {
        let text_id = self.tree.strings.intern(content);
        let node = TreeNode::comment(text_id, self.parent(), self.depth());
        self.push_node(node)
    }

    /// Add a processing instruction node. `Some("")` and `None` stay distinct.
    pub fn processing_instruction(&mut self, target: &str, data: Option<&str>) -> Result<NodeId, BuildError> {
        if target.is_empty() {
            return Err(BuildError::EmptyName);
        }
        let target_id = self.tree.strings.intern(target);
        let data_id = data.map(|d| self.tree.strings.intern(d));
        let node = TreeNode::processing_instruction(target_id, data_id, self.parent(), self.depth());
        Ok(self.push_node(node))
    }

    /// Add a character data node
    pub fn text(&mut self, content: &str) -> NodeId {
        let text_id = self.tree.strings.intern(content);
        let node = TreeNode::text(text_id, self.parent(), self.depth());
        self.push_node(node)
    }

    /// Finish building
    pub fn finish(self) -> Result<ElementTree, BuildError> {
        if let Some(&outer) = self.open.first() {
            let node = &self.tree.nodes[outer as usize];
            let local = self.tree.strings.resolve(node.name_id);
            let name = match node.prefix_id {
                0 => local.to_string(),
                p => format!("{}:{}", self.tree.strings.resolve(p), local),
            };
            return Err(BuildError::UnclosedElement(name));
        }
        if self.tree.nodes.is_empty() {
            return Err(BuildError::Empty);
        }
        Ok(self.tree)
    }

    fn parent(&self) -> Option<NodeId> {
        self.open.last().copied()
    }

    fn depth(&self) -> u32 {
        self.open.len() as u32
    }

    /// Resolve names and namespaces. Expects the element scope to be pushed.
    fn resolve_element(&mut self, qname: &str, attrs: &[(&str, &str)]) -> Result<PendingElement, BuildError> {
        let (prefix, local) = split_qname(qname);
        if local.is_empty() || prefix == Some("") {
            return Err(BuildError::EmptyName);
        }

        // Declarations first: they are in scope for the element's own name
        let mut namespaces = Vec::new();
        for &(name, value) in attrs {
            let declared = if name == "xmlns" {
                Some(0)
            } else {
                name.strip_prefix("xmlns:").map(|p| self.tree.strings.intern(p))
            };
            let Some(prefix_id) = declared else { continue };
            if prefix_id == 0 && name != "xmlns" {
                return Err(BuildError::EmptyName);
            }
            let uri_id = self.tree.strings.intern(value);
            if !self.resolver.declare(prefix_id, uri_id) {
                return Err(BuildError::ReservedPrefix(name[6..].to_string()));
            }
            namespaces.push(NamespaceDecl { prefix_id, uri_id });
        }

        let name_id = self.tree.strings.intern(local);
        let (prefix_id, namespace_id) = match prefix {
            Some(p) => self.resolve_prefix(p)?,
            None => (0, self.resolver.resolve_default().unwrap_or(0)),
        };

        let mut attributes = Vec::with_capacity(attrs.len());
        for &(name, value) in attrs {
            if name == "xmlns" || name.starts_with("xmlns:") {
                continue;
            }
            let (attr_prefix, attr_local) = split_qname(name);
            if attr_local.is_empty() || attr_prefix == Some("") {
                return Err(BuildError::EmptyName);
            }
            let mut attr = XmlAttribute::new(self.tree.strings.intern(attr_local), self.tree.strings.intern(value));
            if let Some(p) = attr_prefix {
                let (prefix_id, namespace_id) = self.resolve_prefix(p)?;
                attr.prefix_id = prefix_id;
                attr.namespace_id = namespace_id;
            }
            attributes.push(attr);
        }

        Ok(PendingElement {
            name_id,
            prefix_id,
            namespace_id,
            attributes,
            namespaces,
        })
    }

    fn resolve_prefix(&mut self, prefix: &str) -> Result<(u32, u32), BuildError> {
        let prefix_id = self.tree.strings.intern(prefix);
        match self.resolver.resolve(prefix_id) {
            Some(uri_id) if uri_id != 0 => Ok((prefix_id, uri_id)),
            _ => Err(BuildError::UnboundPrefix(prefix.to_string())),
        }
    }

    /// Store resolved element data and link the node into the tree
    fn commit(&mut self, mut node: TreeNode, pending: PendingElement) -> NodeId {
        node.prefix_id = pending.prefix_id;
        node.namespace_id = pending.namespace_id;

        node.attr_start = self.tree.attributes.len() as u32;
        node.attr_count = pending.attributes.len() as u32;
        self.tree.attributes.extend(pending.attributes);

        node.ns_start = self.tree.namespaces.len() as u32;
        node.ns_count = pending.namespaces.len() as u32;
        self.tree.namespaces.extend(pending.namespaces);

        self.push_node(node)
    }

    /// Add node to arena and link it under the current parent
    fn push_node(&mut self, node: TreeNode) -> NodeId {
        let parent = node.parent;
        let node_id = self.tree.nodes.len() as NodeId;
        self.tree.nodes.push(node);

        let prev = match parent {
            Some(parent_id) => {
                let parent_node = &mut self.tree.nodes[parent_id as usize];
                let prev = parent_node.last_child;
                if prev.is_none() {
                    parent_node.first_child = Some(node_id);
                }
                parent_node.last_child = Some(node_id);
                prev
            }
            None => {
                let prev = self.last_top.replace(node_id);
                if prev.is_none() {
                    self.tree.first_top = Some(node_id);
                }
                prev
            }
        };

        if let Some(prev_id) = prev {
            self.tree.nodes[node_id as usize].prev_sibling = Some(prev_id);
            self.tree.nodes[prev_id as usize].next_sibling = Some(node_id);
        }
        node_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{MiscKind, NodeKind, TreeAccess};

    #[test]
    fn test_split_qname() {
        assert_eq!(split_qname("a:b"), (Some("a"), "b"));
        assert_eq!(split_qname("b"), (None, "b"));
        assert_eq!(split_qname("a:b:c"), (Some("a"), "b:c"));
    }

    #[test]
    fn test_sibling_links() {
        let mut b = TreeBuilder::new();
        let root = b.start_element("root", &[]).unwrap();
        let first = b.leaf_text_element("a", &[], "1").unwrap();
        let comment = b.comment("c");
        let last = b.leaf_text_element("b", &[], "2").unwrap();
        b.end_element().unwrap();
        let tree = b.finish().unwrap();

        assert_eq!(tree.first_child(root), Some(first));
        assert_eq!(tree.next_sibling(first), Some(comment));
        assert_eq!(tree.next_sibling(comment), Some(last));
        assert_eq!(tree.next_sibling(last), None);
        assert_eq!(tree.get_node(last).unwrap().prev_sibling, Some(comment));
        assert_eq!(tree.get_node(last).unwrap().depth, 1);
    }

    #[test]
    fn test_namespace_resolution() {
        let mut b = TreeBuilder::new();
        let root = b
            .start_element("a:root", &[("xmlns:a", "urn:a"), ("xmlns", "urn:default"), ("a:id", "1"), ("plain", "2")])
            .unwrap();
        let child = b.leaf_text_element("child", &[], "x").unwrap();
        b.end_element().unwrap();
        let tree = b.finish().unwrap();

        assert_eq!(tree.local_name(root), "root");
        assert_eq!(tree.prefix(root), Some("a"));
        assert_eq!(tree.namespace_uri(root), Some("urn:a"));
        assert_eq!(tree.namespace_uri(child), Some("urn:default"));
        assert_eq!(tree.prefix(child), None);

        let decls = tree.namespace_declarations(root);
        assert_eq!(decls.len(), 2);
        assert_eq!(tree.string(decls[0].prefix_id), "a");
        assert_eq!(tree.string(decls[1].prefix_id), "");
        assert_eq!(tree.string(decls[1].uri_id), "urn:default");

        let attrs = tree.attributes(root);
        assert_eq!(attrs.len(), 2);
        assert_eq!(tree.string(attrs[0].namespace_id), "urn:a");
        assert_eq!(attrs[1].namespace_id, 0);
    }

    #[test]
    fn test_scope_ends_with_element() {
        let mut b = TreeBuilder::new();
        b.start_element("root", &[]).unwrap();
        b.leaf_text_element("p:inner", &[("xmlns:p", "urn:p")], "t").unwrap();
        let err = b.leaf_text_element("p:after", &[], "t").unwrap_err();
        assert_eq!(err, BuildError::UnboundPrefix("p".to_string()));
    }

    #[test]
    fn test_xml_prefix_is_predeclared() {
        let mut b = TreeBuilder::new();
        let root = b.leaf_text_element("root", &[("xml:lang", "en")], "").unwrap();
        let tree = b.finish().unwrap();
        let attr = &tree.attributes(root)[0];
        assert_eq!(tree.string(attr.namespace_id), crate::dom::namespace::ns::XML);
    }

    #[test]
    fn test_reserved_prefix_rejected() {
        let mut b = TreeBuilder::new();
        let err = b.start_element("root", &[("xmlns:xml", "urn:nope")]).unwrap_err();
        assert_eq!(err, BuildError::ReservedPrefix("xml".to_string()));
        assert_eq!(err.reason(), "reserved_prefix");
        // The failed element was never opened
        assert_eq!(b.end_element().unwrap_err(), BuildError::UnbalancedEnd);
    }

    #[test]
    fn test_misc_nodes() {
        let mut b = TreeBuilder::new();
        let pi = b.processing_instruction("xml-stylesheet", Some("href=\"a.xsl\"")).unwrap();
        let text = b.text("\n");
        let tree = b.finish().unwrap();
        assert_eq!(tree.kind(pi), NodeKind::Misc(MiscKind::ProcessingInstruction));
        assert_eq!(tree.local_name(pi), "xml-stylesheet");
        assert_eq!(tree.text(pi), Some("href=\"a.xsl\""));
        assert_eq!(tree.kind(text), NodeKind::Misc(MiscKind::Text));
        assert_eq!(tree.next_sibling(pi), Some(text));
    }

    #[test]
    fn test_finish_errors() {
        assert_eq!(TreeBuilder::new().finish().unwrap_err(), BuildError::Empty);

        let mut b = TreeBuilder::new();
        assert_eq!(b.end_element().unwrap_err(), BuildError::UnbalancedEnd);
        b.start_element("outer", &[]).unwrap();
        b.start_element("inner", &[]).unwrap();
        assert_eq!(b.finish().unwrap_err(), BuildError::UnclosedElement("outer".to_string()));
    }

    #[test]
    fn test_empty_names_rejected() {
        let mut b = TreeBuilder::new();
        assert_eq!(b.start_element("", &[]).unwrap_err(), BuildError::EmptyName);
        assert_eq!(b.start_element("p:", &[]).unwrap_err(), BuildError::EmptyName);
        assert_eq!(b.processing_instruction("", None).unwrap_err(), BuildError::EmptyName);
    }

    #[test]
    fn test_pi_data_presence_kept() {
        let mut b = TreeBuilder::new();
        let bare = b.processing_instruction("a", None).unwrap();
        let empty = b.processing_instruction("a", Some("")).unwrap();
        let tree = b.finish().unwrap();
        assert_eq!(tree.text(bare), None);
        assert_eq!(tree.text(empty), Some(""));
    }

    #[test]
    fn test_large_attribute_and_declaration_counts() {
        let count = u16::MAX as usize + 4465;
        let attr_names: Vec<String> = (0..count).map(|i| format!("a{i}")).collect();
        let decl_names: Vec<String> = (0..count).map(|i| format!("xmlns:p{i}")).collect();
        let mut attrs: Vec<(&str, &str)> = attr_names.iter().map(|n| (n.as_str(), "v")).collect();
        attrs.extend(decl_names.iter().map(|n| (n.as_str(), "urn:p")));

        let mut b = TreeBuilder::new();
        let root = b.leaf_text_element("root", &attrs, "").unwrap();
        let after = b.leaf_text_element("after", &[("x", "1")], "").unwrap();
        let tree = b.finish().unwrap();

        let stored = tree.attributes(root);
        assert_eq!(stored.len(), count);
        assert_eq!(tree.string(stored[count - 1].name_id), format!("a{}", count - 1));
        assert_eq!(tree.namespace_declarations(root).len(), count);
        assert_eq!(tree.attributes(after).len(), 1);
        assert_eq!(tree.string(tree.attributes(after)[0].name_id), "x");
    }

    #[test]
    fn test_error_reasons() {
        assert_eq!(BuildError::UnboundPrefix("p".into()).reason(), "unbound_prefix");
        assert_eq!(BuildError::InvalidTerm("x").reason(), "invalid_term");
        assert_eq!(
            BuildError::UnclosedElement("a".into()).to_string(),
            "unclosed element <a>"
        );
    }
}
