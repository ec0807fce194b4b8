//! DOM Module - Arena-based element tree
//!
//! Implements the tree the cursor walks over:
//! - Arena allocation for nodes
//! - NodeId (u32) indices as stable node handles
//! - String interning for names, URIs, values and text
//! - Namespace resolution at build time

pub mod builder;
pub mod namespace;
pub mod node;
pub mod strings;
pub mod tree;

use std::sync::Arc;

pub use builder::{BuildError, TreeBuilder};
pub use node::{MiscKind, NamespaceDecl, NodeId, NodeKind, TreeNode, XmlAttribute};
pub use strings::StringPool;
pub use tree::ElementTree;

/// Structural and content queries the cursor needs from a tree.
///
/// Every method except `contains` expects an ID that `contains` accepts.
pub trait TreeAccess {
    /// Whether `id` names a node of this tree
    fn contains(&self, id: NodeId) -> bool;

    /// Node classification
    fn kind(&self, id: NodeId) -> NodeKind;

    /// First child node
    fn first_child(&self, id: NodeId) -> Option<NodeId>;

    /// Next sibling, as seen by the node itself
    fn next_sibling(&self, id: NodeId) -> Option<NodeId>;

    fn has_children(&self, id: NodeId) -> bool {
        self.first_child(id).is_some()
    }

    /// Local name (PI target for processing instructions, "" for comments and text)
    fn local_name(&self, id: NodeId) -> &str;

    /// Namespace prefix
    fn prefix(&self, id: NodeId) -> Option<&str>;

    /// Resolved namespace URI
    fn namespace_uri(&self, id: NodeId) -> Option<&str>;

    /// Attributes, excluding namespace declarations
    fn attributes(&self, id: NodeId) -> &[XmlAttribute];

    /// Namespace declarations made on this node
    fn namespace_declarations(&self, id: NodeId) -> &[NamespaceDecl];

    /// Text of a leaf-text element or the body of a misc node
    fn text(&self, id: NodeId) -> Option<&str>;

    /// Resolve a string ID from an attribute or namespace declaration
    fn string(&self, id: u32) -> &str;
}

macro_rules! forward_tree_access {
    ($($ty:ty),*) => {$(
        impl<T: TreeAccess + ?Sized> TreeAccess for $ty {
            #[inline]
            fn contains(&self, id: NodeId) -> bool { (**self).contains(id) }
            #[inline]
            fn kind(&self, id: NodeId) -> NodeKind { (**self).kind(id) }
            #[inline]
            fn first_child(&self, id: NodeId) -> Option<NodeId> { (**self).first_child(id) }
            #[inline]
            fn next_sibling(&self, id: NodeId) -> Option<NodeId> { (**self).next_sibling(id) }
            #[inline]
            fn has_children(&self, id: NodeId) -> bool { (**self).has_children(id) }
            fn local_name(&self, id: NodeId) -> &str { (**self).local_name(id) }
            fn prefix(&self, id: NodeId) -> Option<&str> { (**self).prefix(id) }
            fn namespace_uri(&self, id: NodeId) -> Option<&str> { (**self).namespace_uri(id) }
            fn attributes(&self, id: NodeId) -> &[XmlAttribute] { (**self).attributes(id) }
            fn namespace_declarations(&self, id: NodeId) -> &[NamespaceDecl] { (**self).namespace_declarations(id) }
            fn text(&self, id: NodeId) -> Option<&str> { (**self).text(id) }
            fn string(&self, id: u32) -> &str { (**self).string(id) }
        }
    )*};
}

forward_tree_access!(&T, Arc<T>);

/// Post-order fold over the subtree rooted at `id`.
///
/// `combine` receives each node with the values already produced for its
/// children, in document order (empty for childless nodes). Uses an
/// explicit stack, so nesting depth is bounded only by memory.
pub fn fold_subtree<D, R, F>(tree: &D, id: NodeId, mut combine: F) -> R
where
    D: TreeAccess + ?Sized,
    F: FnMut(NodeId, Vec<R>) -> R,
{
    let mut open: Vec<(NodeId, Vec<R>)> = Vec::new();
    let mut current = id;
    loop {
        if let Some(child) = tree.first_child(current) {
            open.push((current, Vec::new()));
            current = child;
            continue;
        }

        let mut value = combine(current, Vec::new());
        loop {
            let Some((parent, children)) = open.last_mut() else {
                return value;
            };
            children.push(value);
            if let Some(sibling) = tree.next_sibling(current) {
                current = sibling;
                break;
            }
            current = *parent;
            value = combine(current, std::mem::take(children));
            open.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(tree: &ElementTree, id: NodeId) -> String {
        fold_subtree(tree, id, |node, children: Vec<String>| {
            format!("{}({})", tree.local_name(node), children.join(","))
        })
    }

    #[test]
    fn test_fold_subtree_order() {
        let mut b = TreeBuilder::new();
        let a = b.start_element("a", &[]).unwrap();
        b.leaf_text_element("b", &[], "x").unwrap();
        let c = b.start_element("c", &[]).unwrap();
        b.start_element("d", &[]).unwrap();
        b.end_element().unwrap();
        b.leaf_text_element("e", &[], "").unwrap();
        b.end_element().unwrap();
        b.end_element().unwrap();
        b.processing_instruction("after", None).unwrap();
        let tree = b.finish().unwrap();

        assert_eq!(render(&tree, a), "a(b(),c(d(),e()))");
        // The subtree root's own siblings are not visited
        assert_eq!(render(&tree, c), "c(d(),e())");
    }

    #[test]
    fn test_fold_subtree_deep_nesting() {
        let depth = 200_000;
        let mut b = TreeBuilder::new();
        let root = b.start_element("n", &[]).unwrap();
        for _ in 1..depth {
            b.start_element("n", &[]).unwrap();
        }
        for _ in 0..depth {
            b.end_element().unwrap();
        }
        let tree = b.finish().unwrap();

        let height = fold_subtree(&tree, root, |_, children: Vec<usize>| {
            children.into_iter().max().unwrap_or(0) + 1
        });
        assert_eq!(height, depth);
    }
}
