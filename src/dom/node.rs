//! Element tree node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// Flavour of a non-element node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiscKind {
    /// `<!-- ... -->`
    Comment,
    /// `<?target data?>`
    ProcessingInstruction,
    /// Character data that is not the sole content of an element
    Text,
}

/// Classification of a node, decided once when the tree is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Structural element, may have children and attributes
    Element,
    /// Element whose only content is inline text
    LeafTextElement,
    /// Comment, processing instruction or stray text
    Misc(MiscKind),
}

impl NodeKind {
    /// Element or leaf-text element
    #[inline]
    pub fn is_element(self) -> bool {
        matches!(self, NodeKind::Element | NodeKind::LeafTextElement)
    }
}

/// A node in the tree arena
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Type of this node
    pub kind: NodeKind,
    /// Parent node (None for top-level nodes)
    pub parent: Option<NodeId>,
    /// First child node
    pub first_child: Option<NodeId>,
    /// Last child node
    pub last_child: Option<NodeId>,
    /// Previous sibling
    pub prev_sibling: Option<NodeId>,
    /// Next sibling
    pub next_sibling: Option<NodeId>,
    /// Local name (elements) or target (PIs), 0 otherwise
    pub name_id: u32,
    /// Namespace prefix, or 0
    pub prefix_id: u32,
    /// Resolved namespace URI, or 0
    pub namespace_id: u32,
    /// Leaf text, comment body, PI data or character data. None for
    /// structural elements and for PIs without data.
    pub text_id: Option<u32>,
    /// Start of attributes in attribute arena
    pub attr_start: u32,
    /// Number of attributes
    pub attr_count: u32,
    /// Start of namespace declarations in declaration arena
    pub ns_start: u32,
    /// Number of namespace declarations
    pub ns_count: u32,
    /// Depth in the tree (top-level nodes are 0)
    pub depth: u32,
}

impl TreeNode {
    fn blank(kind: NodeKind, parent: Option<NodeId>, depth: u32) -> Self {
        TreeNode {
            kind,
            parent,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id: 0,
            prefix_id: 0,
            namespace_id: 0,
            text_id: None,
            attr_start: 0,
            attr_count: 0,
            ns_start: 0,
            ns_count: 0,
            depth,
        }
    }

    /// Create a new element node
    pub fn element(name_id: u32, parent: Option<NodeId>, depth: u32) -> Self {
        let mut node = Self::blank(NodeKind::Element, parent, depth);
        node.name_id = name_id;
        node
    }

    /// Create a new leaf-text element node
    pub fn leaf_text_element(name_id: u32, text_id: u32, parent: Option<NodeId>, depth: u32) -> Self {
        let mut node = Self::blank(NodeKind::LeafTextElement, parent, depth);
        node.name_id = name_id;
        node.text_id = Some(text_id);
        node
    }

    /// Create a new comment node
    pub fn comment(text_id: u32, parent: Option<NodeId>, depth: u32) -> Self {
        let mut node = Self::blank(NodeKind::Misc(MiscKind::Comment), parent, depth);
        node.text_id = Some(text_id);
        node
    }

    /// Create a processing instruction node
    pub fn processing_instruction(target_id: u32, data_id: Option<u32>, parent: Option<NodeId>, depth: u32) -> Self {
        let mut node = Self::blank(NodeKind::Misc(MiscKind::ProcessingInstruction), parent, depth);
        node.name_id = target_id;
        node.text_id = data_id;
        node
    }

    /// Create a character data node
    pub fn text(text_id: u32, parent: Option<NodeId>, depth: u32) -> Self {
        let mut node = Self::blank(NodeKind::Misc(MiscKind::Text), parent, depth);
        node.text_id = Some(text_id);
        node
    }
}

/// Stored attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Local name
    pub name_id: u32,
    /// Namespace prefix, or 0
    pub prefix_id: u32,
    /// Resolved namespace URI, or 0
    pub namespace_id: u32,
    /// Attribute value
    pub value_id: u32,
}

impl XmlAttribute {
    pub fn new(name_id: u32, value_id: u32) -> Self {
        XmlAttribute {
            name_id,
            prefix_id: 0,
            namespace_id: 0,
            value_id,
        }
    }
}

/// `xmlns` / `xmlns:prefix` declaration carried by an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    /// Declared prefix, 0 for the default namespace
    pub prefix_id: u32,
    /// Bound URI
    pub uri_id: u32,
}
