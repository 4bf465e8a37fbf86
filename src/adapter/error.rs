//! Adapter error taxonomy

use super::cast::CoercionError;
use crate::tree::TreeError;
use thiserror::Error;

/// Errors raised while building adapters or dispatching calls on them.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Bad interface, resource or service binding. Raised at creation for
    /// interfaces and at first access for service bindings.
    #[error("Invalid adapter spec: {0}")]
    InvalidAdapterSpec(String),

    #[error("No such accessor: {0}")]
    NoSuchAccessor(String),

    #[error(transparent)]
    Coercion(#[from] CoercionError),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

impl AdapterError {
    /// Short variant name, used where an error is recorded instead of raised.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAdapterSpec(_) => "InvalidAdapterSpec",
            Self::NoSuchAccessor(_) => "NoSuchAccessor",
            Self::Coercion(_) => "CoercionError",
            Self::NotImplemented(_) => "NotImplemented",
            Self::ResourceNotFound(_) => "ResourceNotFound",
            Self::InvalidArguments(_) => "InvalidArguments",
        }
    }
}

impl From<TreeError> for AdapterError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::NotFound(path) => Self::ResourceNotFound(path),
            other => Self::InvalidAdapterSpec(other.to_string()),
        }
    }
}

/// Result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;
