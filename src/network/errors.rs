//! Error types for parsing, sampling, learning and comparing networks.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the network core.
///
/// Every variant signals a structural defect in the input description or
/// in the network itself; none of them is transient, so callers are not
/// expected to retry.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The description source could not be read.
    #[error("cannot read network description {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A block does not match the description grammar, or a row carries the
    /// wrong number of probabilities.
    #[error("format error: {0}")]
    Format(String),

    /// A probability block names a node that was never declared.
    #[error("reference error: {0}")]
    Reference(String),

    /// The dependency graph is not acyclic.
    #[error("cycle detected among nodes: {}", .unordered.join(", "))]
    Cycle { unordered: Vec<String> },

    /// A CPT row or a node is missing where the structure requires it.
    #[error("lookup error: {0}")]
    Lookup(String),
}

pub type Result<T> = std::result::Result<T, NetworkError>;
