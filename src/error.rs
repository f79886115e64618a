use crate::engine::NodeId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid operand for {op}: {reason}")]
    InvalidOperand { op: &'static str, reason: String },

    #[error("Node {0} is derived from other nodes and its value cannot be changed")]
    ImmutableNode(NodeId),

    #[error("Invalid width: {what} must be at least 1")]
    InvalidWidth { what: &'static str },

    #[error("Input width mismatch: expected {expected}, got {actual}")]
    InputWidth { expected: usize, actual: usize },

    #[error("Cannot train on an empty dataset")]
    EmptyDataset,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
