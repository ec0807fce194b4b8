//! Cursor traversal states

use std::fmt;

use crate::dom::NodeKind;

/// Position of the cursor relative to the node on top of its stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorState {
    /// Constructed, not advanced yet; no current node
    Null,
    /// At the opening boundary of an element
    Start,
    /// At the opening boundary of a leaf-text element
    LeafStart,
    /// At the closing boundary of the current node
    End,
    /// On a comment, processing instruction or stray text
    MiscNode,
    /// Traversal exhausted; stack empty
    Eof,
}

impl CursorState {
    /// State entered when a node of `kind` is pushed
    #[inline]
    pub fn entering(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Element => CursorState::Start,
            NodeKind::LeafTextElement => CursorState::LeafStart,
            NodeKind::Misc(_) => CursorState::MiscNode,
        }
    }

    /// `Start` or `LeafStart`
    #[inline]
    pub fn is_start(self) -> bool {
        matches!(self, CursorState::Start | CursorState::LeafStart)
    }

    /// A node is on top of the stack
    #[inline]
    pub fn has_node(self) -> bool {
        !matches!(self, CursorState::Null | CursorState::Eof)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CursorState::Null => "null",
            CursorState::Start => "start",
            CursorState::LeafStart => "leaf_start",
            CursorState::End => "end",
            CursorState::MiscNode => "misc_node",
            CursorState::Eof => "eof",
        }
    }
}

impl fmt::Display for CursorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MiscKind;

    #[test]
    fn test_entering() {
        assert_eq!(CursorState::entering(NodeKind::Element), CursorState::Start);
        assert_eq!(CursorState::entering(NodeKind::LeafTextElement), CursorState::LeafStart);
        assert_eq!(
            CursorState::entering(NodeKind::Misc(MiscKind::ProcessingInstruction)),
            CursorState::MiscNode
        );
    }

    #[test]
    fn test_classification() {
        assert!(CursorState::Start.is_start());
        assert!(CursorState::LeafStart.is_start());
        assert!(!CursorState::End.is_start());
        assert!(!CursorState::Null.has_node());
        assert!(!CursorState::Eof.has_node());
        assert!(CursorState::MiscNode.has_node());
        assert_eq!(CursorState::LeafStart.to_string(), "leaf_start");
    }
}
