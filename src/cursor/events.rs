//! Cursor Event Stream
//!
//! Adapts a [`TreeCursor`] into an iterator of pull-reader style events.

use super::{CursorState, TreeCursor};
use crate::dom::{NodeId, TreeAccess};

/// One cursor position, as a pull parser would report it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorEvent {
    /// Opening boundary of an element or leaf-text element
    StartElement(NodeId),
    /// Closing boundary of an element
    EndElement(NodeId),
    /// Comment, processing instruction or stray text
    Misc(NodeId),
}

/// Iterator that advances the wrapped cursor until it is exhausted
pub struct Events<T: TreeAccess> {
    cursor: TreeCursor<T>,
}

impl<T: TreeAccess> Events<T> {
    pub(crate) fn new(cursor: TreeCursor<T>) -> Self {
        Events { cursor }
    }
}

impl<T: TreeAccess> Iterator for Events<T> {
    type Item = CursorEvent;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.cursor.advance().ok()? {
            return None;
        }
        let id = self.cursor.current_node().ok()?;
        match self.cursor.state() {
            CursorState::Start | CursorState::LeafStart => Some(CursorEvent::StartElement(id)),
            CursorState::End => Some(CursorEvent::EndElement(id)),
            CursorState::MiscNode => Some(CursorEvent::Misc(id)),
            CursorState::Null | CursorState::Eof => None,
        }
    }
}
