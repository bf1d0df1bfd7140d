//! Error types for diagram editing.

use thiserror::Error;

use crate::model::{BlockId, LanguageId, PortTypeId};

/// Result type alias using [`DiagramError`].
pub type Result<T> = std::result::Result<T, DiagramError>;

/// Reasons an edit is rejected. None of these are fatal: the diagram is left
/// exactly as it was before the attempt, and the `Display` text is what the
/// status bar shows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagramError {
    #[error("Block language '{block}' is different from diagram language '{diagram}'")]
    LanguageMismatch {
        diagram: LanguageId,
        block: LanguageId,
    },

    #[error("Block id {0} is already used in this diagram")]
    DuplicateBlockId(BlockId),

    #[error("Block {0} is not present in this diagram")]
    UnknownBlock(BlockId),

    #[error("No block ids left in this diagram")]
    IdsExhausted,

    #[error("Unknown block kind '{0}'")]
    UnknownTemplate(String),

    #[error("Block {block} has no {direction} port {index}")]
    PortOutOfRange {
        block: BlockId,
        direction: PortDirection,
        index: usize,
    },

    #[error("No connection is being drawn")]
    NoPendingConnection,

    #[error("Connector already exists")]
    DuplicateConnection,

    #[error("A block cannot be connected to itself")]
    SelfConnection,

    #[error("Recursive connection is not allowed")]
    RecursiveConnection,

    #[error("Connection types mismatch: {source_type} -> {sink_type}")]
    TypeMismatch {
        source_type: PortTypeId,
        sink_type: PortTypeId,
    },
}

/// Which side of a block a port index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

impl std::fmt::Display for PortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_human_readable() {
        assert_eq!(
            DiagramError::RecursiveConnection.to_string(),
            "Recursive connection is not allowed"
        );
        let e = DiagramError::PortOutOfRange {
            block: BlockId(3),
            direction: PortDirection::Input,
            index: 4,
        };
        assert_eq!(e.to_string(), "Block 3 has no input port 4");
        let e = DiagramError::TypeMismatch {
            source_type: "double".into(),
            sink_type: "image".into(),
        };
        assert!(e.to_string().contains("double -> image"));
    }
}
