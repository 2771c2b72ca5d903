//! Network construction and validation errors.

use thiserror::Error;

pub type NetworkResult<T> = Result<T, NetworkError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("Duplicate {what} name: {name}")]
    DuplicateName { what: &'static str, name: String },

    #[error("Link {link} refers to non-existent node index {node}")]
    InvalidNodeRef { link: String, node: usize },

    #[error("Link {link} connects node {node} to itself")]
    SelfLoop { link: String, node: String },

    #[error("Invalid value for {entity}.{field}: {reason}")]
    InvalidValue {
        entity: String,
        field: &'static str,
        reason: String,
    },

    #[error("Node {node} refers to unknown pattern index {pattern}")]
    UnknownPattern { node: String, pattern: usize },

    #[error("Network has no reservoir or tank to fix the hydraulic head")]
    NoFixedHead,

    #[error("Network has no junctions")]
    NoJunctions,

    #[error("Junction {node} is not connected to any reservoir or tank")]
    Disconnected { node: String },

    #[error("{what} not found: {name}")]
    NotFound { what: &'static str, name: String },
}
