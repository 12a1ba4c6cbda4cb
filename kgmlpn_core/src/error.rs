//! Error types for pathway loading, marking control and simulation.

use crate::node::NodeId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the pathway model.
///
/// Load errors are fatal: a loader either returns a complete `Pathway` or
/// one of these. Marking and step errors leave the marking untouched.
#[derive(Debug, Error)]
pub enum PathwayError {
    /// The KGML source does not exist
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The KGML source exists but could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required attribute is missing or unparsable (or the XML is broken)
    #[error("Malformed input at {context}: {reason}")]
    MalformedInput { context: String, reason: String },

    /// A relation or group member points at a node that was never loaded
    #[error("Dangling reference from {owner} to node {id}")]
    DanglingReference { owner: String, id: NodeId },

    /// A marking or knockout directive names a node absent from the graph
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// Applying a delta would drive a token count below zero
    #[error("Node {node} has {tokens} tokens and cannot be updated by {delta}")]
    NegativeTokenInvariant { node: NodeId, tokens: u64, delta: i128 },

    /// Applying a delta would push a token count past `u64::MAX`
    #[error("Node {node} has {tokens} tokens and cannot take {delta} more")]
    TokenOverflow { node: NodeId, tokens: u64, delta: i128 },

    /// The tokens of the whole net would not fit in a `u64`
    #[error("Marking would hold {total} tokens in total, more than u64::MAX")]
    TokenTotalOverflow { total: u128 },
}

impl PathwayError {
    /// Creates a malformed input error.
    pub fn malformed(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Creates a dangling reference error.
    pub fn dangling(owner: impl std::fmt::Display, id: NodeId) -> Self {
        Self::DanglingReference {
            owner: owner.to_string(),
            id,
        }
    }

    /// Returns true for errors that can only come out of the loader.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound(_)
                | Self::Io { .. }
                | Self::MalformedInput { .. }
                | Self::DanglingReference { .. }
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PathwayError>;
