//! Error taxonomy for the connection manager.
//!
//! Mirrors the distinction the core cares about: deterministic misuse is
//! surfaced to the caller as a typed error, environmental failures degrade
//! aggregate results instead of poisoning them. See [`crate::fleet`] and
//! [`crate::lifecycle`] for where each variant is produced.

use std::time::Duration;

/// Errors a [`crate::node::client::NodeClient`] can report for a single call.
#[derive(thiserror::Error, Debug)]
pub enum NodeClientError {
    #[error("connection error: {0}")]
    Connection(#[from] reqwest::Error),

    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error("daemon returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("container {0} not found")]
    NotFound(String),
}

impl NodeClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, NodeClientError::NotFound(_))
            || matches!(self, NodeClientError::Api { status: 404, .. })
    }
}

/// Top-level errors surfaced by [`crate::connection::Connection`]'s
/// upstream operations.
#[derive(thiserror::Error, Debug)]
pub enum ConnectionError {
    #[error("node {0} is not configured")]
    NoSuchNode(String),

    #[error("instance {0} not found on any configured node")]
    NoSuchInstance(String),

    #[error("node {node} out of capacity: used={used} requested={requested} total={total}")]
    NodeOutOfCapacity {
        node: String,
        used: u32,
        requested: u32,
        total: u32,
    },

    #[error("node {node} unreachable: {source}")]
    Unreachable {
        node: String,
        #[source]
        source: NodeClientError,
    },

    #[error("malformed container record from {node}: {reason}")]
    MalformedRecord { node: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ConnectionError>;
pub type NodeResult<T> = std::result::Result<T, NodeClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_matches_404_and_explicit_variant() {
        assert!(NodeClientError::NotFound("abc".into()).is_not_found());
        assert!(NodeClientError::Api { status: 404, message: "no such container".into() }.is_not_found());
        assert!(!NodeClientError::Api { status: 500, message: "oops".into() }.is_not_found());
    }

    #[test]
    fn connection_error_display_includes_node() {
        let err = ConnectionError::NodeOutOfCapacity {
            node: "node-1".into(),
            used: 9,
            requested: 2,
            total: 10,
        };
        assert!(err.to_string().contains("node-1"));
    }
}
