//! Tree Cursor
//!
//! A forward-only pull cursor over an already built element tree. The
//! API follows a streaming XML pull reader: the caller advances, descends
//! and skips, and reads the node under the cursor, even though the whole
//! tree is in memory.
//!
//! The cursor keeps a stack of node handles from the root it was built
//! over down to the current node. Opening and closing boundaries of the
//! same node share a stack top and differ only by [`CursorState`], so no
//! lookahead is needed and `depth()` is always `stack.len() - 1`.

pub mod error;
pub mod events;
pub mod state;

use std::borrow::Cow;

use tracing::{debug, trace};

use crate::dom::{NamespaceDecl, NodeId, NodeKind, TreeAccess, XmlAttribute};

pub use error::CursorError;
pub use events::{CursorEvent, Events};
pub use state::CursorState;

const NO_ATTRIBUTES: &[XmlAttribute] = &[];
const NO_NAMESPACES: &[NamespaceDecl] = &[];

/// Construction-time cursor configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorOptions {
    /// Surface comments, processing instructions and stray text instead
    /// of stepping over them
    pub include_misc_nodes: bool,
}

impl CursorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_misc_nodes(mut self, include: bool) -> Self {
        self.include_misc_nodes = include;
        self
    }
}

/// Stack and state, kept apart from the tree handle so navigation can
/// borrow the tree while mutating the stack.
#[derive(Debug)]
struct Traversal {
    root: NodeId,
    stack: Vec<NodeId>,
    state: CursorState,
    include_misc_nodes: bool,
}

impl Traversal {
    #[inline]
    fn top(&self) -> Option<NodeId> {
        self.stack.last().copied()
    }

    #[inline]
    fn filtering(&self) -> bool {
        self.state == CursorState::MiscNode && !self.include_misc_nodes
    }

    fn enter<A: TreeAccess>(&mut self, tree: &A, id: NodeId) {
        self.stack.push(id);
        self.state = CursorState::entering(tree.kind(id));
    }

    fn finish(&mut self) {
        self.stack.clear();
        self.state = CursorState::Eof;
    }

    /// Next position in document order. Returns false only when nothing is left.
    fn step_once<A: TreeAccess>(&mut self, tree: &A) -> bool {
        let from = self.state;
        let moved = match self.state {
            CursorState::Null => {
                self.enter(tree, self.root);
                true
            }
            CursorState::Start | CursorState::LeafStart => {
                match self.top().and_then(|top| tree.first_child(top)) {
                    Some(child) => self.enter(tree, child),
                    None => self.state = CursorState::End,
                }
                true
            }
            CursorState::End | CursorState::MiscNode => self.pop_to_next(tree),
            CursorState::Eof => false,
        };
        trace!(%from, to = %self.state, depth = self.stack.len(), "step");
        moved
    }

    /// Pop the top and expose its next sibling, or the parent's closing boundary
    fn pop_to_next<A: TreeAccess>(&mut self, tree: &A) -> bool {
        let popped = self.stack.pop();
        match popped {
            Some(id) if !self.stack.is_empty() => {
                match tree.next_sibling(id) {
                    Some(sibling) => self.enter(tree, sibling),
                    None => self.state = CursorState::End,
                }
                true
            }
            _ => {
                self.finish();
                false
            }
        }
    }

    /// Replace the top with its next sibling. The constructed root has no
    /// visible siblings, so stepping off it ends the traversal.
    ///
    /// Returns true when a sibling was entered.
    fn sibling_step<A: TreeAccess>(&mut self, tree: &A) -> bool {
        let from = self.state;
        if self.stack.len() <= 1 {
            self.finish();
            trace!(%from, to = %self.state, "sibling step off root");
            return false;
        }
        let entered = match self.stack.pop().and_then(|id| tree.next_sibling(id)) {
            Some(sibling) => {
                self.enter(tree, sibling);
                true
            }
            None => {
                self.state = CursorState::End;
                false
            }
        };
        trace!(%from, to = %self.state, depth = self.stack.len(), "sibling step");
        entered
    }

    fn skip_filtered<A: TreeAccess>(&mut self, tree: &A) {
        while self.filtering() {
            self.step_once(tree);
        }
    }

    /// Sibling steps until an element (or anything, when misc nodes are shown)
    fn skip_filtered_siblings<A: TreeAccess>(&mut self, tree: &A) -> bool {
        while self.filtering() {
            if !self.sibling_step(tree) {
                return false;
            }
        }
        true
    }

    fn advance<A: TreeAccess>(&mut self, tree: &A) -> bool {
        self.step_once(tree);
        self.skip_filtered(tree);
        self.state != CursorState::Eof
    }

    fn descend<A: TreeAccess>(&mut self, tree: &A) -> bool {
        self.step_once(tree);
        if self.state == CursorState::End {
            return false;
        }
        self.skip_filtered_siblings(tree)
    }

    fn move_to_sibling<A: TreeAccess>(&mut self, tree: &A) -> bool {
        self.sibling_step(tree) && self.skip_filtered_siblings(tree)
    }

    fn skip_subtree<A: TreeAccess>(&mut self, tree: &A) {
        match self.state {
            CursorState::Start | CursorState::LeafStart => {
                self.sibling_step(tree);
            }
            CursorState::End | CursorState::MiscNode => {
                self.step_once(tree);
            }
            CursorState::Null | CursorState::Eof => return,
        }
        self.skip_filtered(tree);
    }
}

/// Pull cursor over a tree reachable through `T`.
///
/// `T` is usually `&ElementTree` or `Arc<ElementTree>`. The cursor never
/// mutates the tree; [`close`](TreeCursor::close) drops the handle.
pub struct TreeCursor<T: TreeAccess> {
    tree: Option<T>,
    walk: Traversal,
}

impl<T: TreeAccess> TreeCursor<T> {
    /// Create a cursor whose traversal is bounded by `root`
    pub fn new(tree: T, root: NodeId, options: CursorOptions) -> Result<Self, CursorError> {
        if !tree.contains(root) {
            return Err(CursorError::UnknownNode(root));
        }
        debug!(root, include_misc_nodes = options.include_misc_nodes, "cursor created");
        Ok(TreeCursor {
            tree: Some(tree),
            walk: Traversal {
                root,
                stack: Vec::new(),
                state: CursorState::Null,
                include_misc_nodes: options.include_misc_nodes,
            },
        })
    }

    /// Current traversal state (`Eof` once closed)
    #[inline]
    pub fn state(&self) -> CursorState {
        self.walk.state
    }

    #[inline]
    pub fn include_misc_nodes(&self) -> bool {
        self.walk.include_misc_nodes
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.tree.is_none()
    }

    /// The tree being walked
    pub fn tree(&self) -> Result<&T, CursorError> {
        self.tree.as_ref().ok_or(CursorError::Closed)
    }

    /// The node the cursor was constructed over
    pub fn root(&self) -> Result<NodeId, CursorError> {
        self.tree.as_ref().ok_or(CursorError::Closed)?;
        Ok(self.walk.root)
    }

    /// Tree handle and the node on top of the stack
    fn position(&self) -> Result<(&T, NodeId), CursorError> {
        let tree = self.tree.as_ref().ok_or(CursorError::Closed)?;
        match self.walk.state {
            state if state.has_node() => self.walk.top().map(|id| (tree, id)).ok_or(CursorError::EofState),
            CursorState::Null => Err(CursorError::NullState),
            _ => Err(CursorError::EofState),
        }
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Move to the next position in document order, skipping misc nodes
    /// unless they are shown. Returns false once the traversal is exhausted.
    pub fn advance(&mut self) -> Result<bool, CursorError> {
        let tree = self.tree.as_ref().ok_or(CursorError::Closed)?;
        Ok(self.walk.advance(tree))
    }

    /// Move to the first (element) child of the current element.
    ///
    /// Without one, the element is left at its closing boundary and false
    /// is returned.
    pub fn descend(&mut self) -> Result<bool, CursorError> {
        let tree = self.tree.as_ref().ok_or(CursorError::Closed)?;
        match self.walk.state {
            CursorState::Start | CursorState::LeafStart => Ok(self.walk.descend(tree)),
            CursorState::Eof => Ok(false),
            CursorState::Null => Err(CursorError::NullState),
            state => Err(CursorError::InvalidTransition { op: "descend", state }),
        }
    }

    /// Move to the next (element) sibling of the current node.
    ///
    /// When no sibling remains the parent is left at its closing boundary
    /// and false is returned. On the constructed root this ends the
    /// traversal.
    pub fn move_to_sibling(&mut self) -> Result<bool, CursorError> {
        let tree = self.tree.as_ref().ok_or(CursorError::Closed)?;
        match self.walk.state {
            CursorState::Null => Err(CursorError::NullState),
            CursorState::Eof => Ok(false),
            _ => Ok(self.walk.move_to_sibling(tree)),
        }
    }

    /// Leave the current subtree without visiting the rest of it
    pub fn skip_subtree(&mut self) -> Result<(), CursorError> {
        let tree = self.tree.as_ref().ok_or(CursorError::Closed)?;
        if self.walk.state == CursorState::Null {
            return Err(CursorError::NullState);
        }
        self.walk.skip_subtree(tree);
        Ok(())
    }

    /// Take the current node whole and move past its subtree.
    ///
    /// Elements are left at their closing boundary; misc nodes are skipped.
    pub fn load_current_node(&mut self) -> Result<NodeId, CursorError> {
        let (_, id) = self.position()?;
        match self.walk.state {
            CursorState::Start | CursorState::LeafStart => {
                self.walk.state = CursorState::End;
                Ok(id)
            }
            CursorState::MiscNode => {
                let tree = self.tree.as_ref().ok_or(CursorError::Closed)?;
                self.walk.skip_subtree(tree);
                Ok(id)
            }
            state => Err(CursorError::InvalidTransition {
                op: "load_current_node",
                state,
            }),
        }
    }

    /// Release the tree handle and the stack. Later operations fail with
    /// [`CursorError::Closed`].
    pub fn close(&mut self) {
        if self.tree.take().is_some() {
            debug!(root = self.walk.root, "cursor closed");
        }
        self.walk.stack = Vec::new();
        self.walk.state = CursorState::Eof;
    }

    /// Turn the cursor into an iterator of start/end/misc events
    pub fn events(self) -> Events<T> {
        Events::new(self)
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Handle of the node on top of the stack
    pub fn current_node(&self) -> Result<NodeId, CursorError> {
        self.position().map(|(_, id)| id)
    }

    /// Kind of the node on top of the stack
    pub fn node_kind(&self) -> Result<NodeKind, CursorError> {
        let (tree, id) = self.position()?;
        Ok(tree.kind(id))
    }

    /// Depth below the constructed root, which is 0
    pub fn depth(&self) -> Result<usize, CursorError> {
        self.position()?;
        Ok(self.walk.stack.len() - 1)
    }

    pub fn is_start_element(&self) -> Result<bool, CursorError> {
        self.position()?;
        Ok(self.walk.state.is_start())
    }

    pub fn is_end_element(&self) -> Result<bool, CursorError> {
        self.position()?;
        Ok(self.walk.state == CursorState::End)
    }

    pub fn is_misc_node(&self) -> Result<bool, CursorError> {
        self.position()?;
        Ok(self.walk.state == CursorState::MiscNode)
    }

    pub fn local_name(&self) -> Result<&str, CursorError> {
        let (tree, id) = self.position()?;
        Ok(tree.local_name(id))
    }

    pub fn namespace_uri(&self) -> Result<Option<&str>, CursorError> {
        let (tree, id) = self.position()?;
        Ok(tree.namespace_uri(id))
    }

    pub fn prefix(&self) -> Result<Option<&str>, CursorError> {
        let (tree, id) = self.position()?;
        Ok(tree.prefix(id))
    }

    /// Qualified name, `prefix:local` when prefixed
    pub fn name(&self) -> Result<Cow<'_, str>, CursorError> {
        let (tree, id) = self.position()?;
        Ok(match tree.prefix(id) {
            Some(prefix) => Cow::Owned(format!("{}:{}", prefix, tree.local_name(id))),
            None => Cow::Borrowed(tree.local_name(id)),
        })
    }

    /// Attributes of the current element; empty outside its opening boundary
    pub fn attributes(&self) -> Result<&[XmlAttribute], CursorError> {
        let (tree, id) = self.position()?;
        if self.walk.state.is_start() {
            Ok(tree.attributes(id))
        } else {
            Ok(NO_ATTRIBUTES)
        }
    }

    /// Attribute value by name; `p:name` matches on prefix and local name
    pub fn attribute_value(&self, name: &str) -> Result<Option<&str>, CursorError> {
        let attrs = self.attributes()?;
        let (tree, _) = self.position()?;
        let (prefix, local) = crate::dom::builder::split_qname(name);
        Ok(attrs
            .iter()
            .find(|attr| {
                let attr_prefix = (attr.prefix_id != 0).then(|| tree.string(attr.prefix_id));
                attr_prefix == prefix && tree.string(attr.name_id) == local
            })
            .map(|attr| tree.string(attr.value_id)))
    }

    /// Qualified attribute names with their values
    pub fn attribute_values(&self) -> Result<Vec<(Cow<'_, str>, &str)>, CursorError> {
        let attrs = self.attributes()?;
        let (tree, _) = self.position()?;
        Ok(attrs
            .iter()
            .map(|attr| {
                let local = tree.string(attr.name_id);
                let name = match attr.prefix_id {
                    0 => Cow::Borrowed(local),
                    p => Cow::Owned(format!("{}:{}", tree.string(p), local)),
                };
                (name, tree.string(attr.value_id))
            })
            .collect())
    }

    /// Namespace declarations of the current element; empty outside its opening boundary
    pub fn namespace_declarations(&self) -> Result<&[NamespaceDecl], CursorError> {
        let (tree, id) = self.position()?;
        if self.walk.state.is_start() {
            Ok(tree.namespace_declarations(id))
        } else {
            Ok(NO_NAMESPACES)
        }
    }

    /// Declarations as `(prefix, uri)`; the default namespace has prefix ""
    pub fn namespace_bindings(&self) -> Result<Vec<(&str, &str)>, CursorError> {
        let decls = self.namespace_declarations()?;
        let (tree, _) = self.position()?;
        Ok(decls
            .iter()
            .map(|decl| (tree.string(decl.prefix_id), tree.string(decl.uri_id)))
            .collect())
    }

    /// Inline text of a leaf-text element, "" for every other node
    pub fn text(&self) -> Result<&str, CursorError> {
        let (tree, id) = self.position()?;
        if tree.kind(id) == NodeKind::LeafTextElement {
            Ok(tree.text(id).unwrap_or(""))
        } else {
            Ok("")
        }
    }
}
