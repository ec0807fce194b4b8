//! ResourceArc Wrappers
//!
//! Persistent state for element trees and the cursors walking them.

use std::sync::{Arc, Mutex};

use rustler::ResourceArc;

use crate::cursor::{CursorError, CursorOptions, TreeCursor};
use crate::dom::{ElementTree, NodeId};

/// Wrapper for an ElementTree that can be stored in a ResourceArc.
/// The tree is immutable, so cursors share it without locking.
pub struct TreeResource {
    pub tree: Arc<ElementTree>,
}

impl TreeResource {
    pub fn new(tree: ElementTree) -> Self {
        TreeResource { tree: Arc::new(tree) }
    }
}

#[rustler::resource_impl]
impl rustler::Resource for TreeResource {}

/// Type alias for tree ResourceArc
pub type TreeRef = ResourceArc<TreeResource>;

/// Wrapper for a TreeCursor that can be stored in a ResourceArc.
/// The BEAM may call in from any scheduler thread, hence the Mutex.
pub struct CursorResource {
    pub inner: Mutex<TreeCursor<Arc<ElementTree>>>,
}

impl CursorResource {
    /// Create a cursor over `tree`, rooted at `root` or at the first
    /// top-level element
    pub fn new(tree: &TreeResource, root: Option<NodeId>, include_misc_nodes: bool) -> Result<Self, CursorError> {
        let root = match root {
            Some(id) => id,
            None => tree
                .tree
                .root_element()
                .or_else(|| tree.tree.top_level().next())
                .unwrap_or(0),
        };
        let options = CursorOptions::new().include_misc_nodes(include_misc_nodes);
        let cursor = TreeCursor::new(Arc::clone(&tree.tree), root, options)?;
        Ok(CursorResource {
            inner: Mutex::new(cursor),
        })
    }

    /// Run `f` against the locked cursor.
    ///
    /// # Errors
    ///
    /// Returns `"mutex_poisoned"` if the cursor mutex is poisoned, or the
    /// reason of the cursor error returned by `f`.
    pub fn with_cursor<F, R>(&self, f: F) -> Result<R, &'static str>
    where
        F: FnOnce(&mut TreeCursor<Arc<ElementTree>>) -> Result<R, CursorError>,
    {
        let mut guard = self.inner.lock().map_err(|_| "mutex_poisoned")?;
        f(&mut guard).map_err(|e| e.reason())
    }
}

#[rustler::resource_impl]
impl rustler::Resource for CursorResource {}

/// Type alias for cursor ResourceArc
pub type CursorRef = ResourceArc<CursorResource>;
