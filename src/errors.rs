use thiserror::Error;

use crate::domain::NodeId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Node '{node}' does not have children, cannot {action}")]
    NoChildren { node: String, action: &'static str },

    #[error("Index {index} out of bounds for node '{node}' with {len} children")]
    IndexOutOfBounds {
        node: String,
        index: usize,
        len: usize,
    },

    #[error("Node '{node}' already has parent '{parent}'")]
    AlreadyOwned { node: String, parent: String },

    #[error("Node '{0}' does not have a parent")]
    NoParent(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Cycle detected: '{0}' cannot become a descendant of itself")]
    CycleDetected(String),

    #[error("Invalid node handle: {0}")]
    InvalidHandle(NodeId),

    #[error("Illegal iterator state: {0}")]
    IteratorState(&'static str),

    #[error("Config error: {message}")]
    Config { message: String },
}

pub type TreeResult<T> = Result<T, TreeError>;
