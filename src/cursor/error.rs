//! Cursor error taxonomy
//!
//! Every variant is a contract violation by the caller. A failing
//! operation leaves the cursor exactly as it found it.

use thiserror::Error;

use super::state::CursorState;
use crate::dom::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    /// Read or navigation before the first `advance()`
    #[error("cursor has not been advanced yet")]
    NullState,
    /// Read after the traversal was exhausted
    #[error("cursor is past the end of the tree")]
    EofState,
    /// Operation not allowed in the current state
    #[error("`{op}` is not allowed in state {state}")]
    InvalidTransition { op: &'static str, state: CursorState },
    /// Any operation after `close()`
    #[error("cursor is closed")]
    Closed,
    /// Constructed with a root the tree does not contain
    #[error("node {0} is not part of the tree")]
    UnknownNode(NodeId),
}

impl CursorError {
    /// Short machine-readable reason, used as an atom at the NIF boundary
    pub fn reason(&self) -> &'static str {
        match self {
            CursorError::NullState => "null_state",
            CursorError::EofState => "eof_state",
            CursorError::InvalidTransition { .. } => "invalid_transition",
            CursorError::Closed => "closed",
            CursorError::UnknownNode(_) => "unknown_node",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_and_display() {
        let err = CursorError::InvalidTransition {
            op: "load_current_node",
            state: CursorState::End,
        };
        assert_eq!(err.reason(), "invalid_transition");
        assert_eq!(err.to_string(), "`load_current_node` is not allowed in state end");
        assert_eq!(CursorError::UnknownNode(7).to_string(), "node 7 is not part of the tree");
    }
}
