//! Error types shared across the trackwire crates.

use crate::state::RecordState;
use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the record model, the session and its transports.
#[derive(Debug, Error)]
pub enum Error {
    /// Credentials missing or rejected by the server.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Non-success response, or an exception reported by the server.
    #[error("server error: {0}")]
    Server(String),

    /// Connection-level failure before any response arrived.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("non-unique value detected: {0}")]
    NotUnique(String),

    /// No record type is registered under the requested name.
    #[error("entity type {entity_type:?} not recognised")]
    UnrecognisedEntityType { entity_type: String },

    #[error("invalid transition from {current} to {target} state for entity {identity}")]
    InvalidStateTransition {
        current: RecordState,
        target: RecordState,
        identity: String,
    },

    #[error("cannot modify value of immutable {attribute:?} attribute")]
    ImmutableAttribute { attribute: String },

    #[error("cannot modify immutable collection bound to {attribute:?}")]
    ImmutableCollection { attribute: String },

    #[error("item {item} already exists in collection bound to {attribute:?}")]
    DuplicateItemInCollection { item: String, attribute: String },

    /// Malformed query expression.
    #[error("failed to parse: {0}")]
    Parse(String),

    #[error("no attribute {attribute:?} on entity type {record_type:?}")]
    UnknownAttribute {
        record_type: String,
        attribute: String,
    },

    #[error("missing required value for primary key attribute {attribute:?} on {record_type}")]
    MissingPrimaryKey {
        record_type: String,
        attribute: String,
    },

    #[error("composite primary keys not supported for {record_type}")]
    CompositePrimaryKey { record_type: String },

    #[error("invalid value for {attribute:?}: {reason}")]
    InvalidValue { attribute: String, reason: String },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Accessor(#[from] AccessorError),
}

impl Error {
    /// Returns true if this error came from the remote call boundary.
    ///
    /// A failed commit leaves the session's pending work intact, so callers
    /// may retry after any of these.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Error::Authentication(_) | Error::Server(_) | Error::Transport(_)
        )
    }
}

/// Failures at the file/blob storage boundary.
#[derive(Debug, Error)]
pub enum AccessorError {
    #[error("operation {operation} unsupported")]
    UnsupportedOperation { operation: String },

    #[error("cannot {operation} {resource_identifier}: permission denied")]
    PermissionDenied {
        operation: String,
        resource_identifier: String,
    },

    #[error("operation {operation} failed: {details}")]
    OperationFailed { operation: String, details: String },

    #[error("resource identifier is invalid: {0}")]
    InvalidResourceIdentifier(String),

    #[error("could not determine filesystem path from resource identifier: {0}")]
    FilesystemPath(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("parent resource is missing: {0}")]
    ParentResourceNotFound(String),

    #[error("resource invalid: {0}")]
    ResourceInvalid(String),

    #[error("container is not empty: {0}")]
    ContainerNotEmpty(String),
}

impl AccessorError {
    /// Returns the resource identifier the failure refers to, if any.
    pub fn resource_identifier(&self) -> Option<&str> {
        match self {
            AccessorError::UnsupportedOperation { .. }
            | AccessorError::OperationFailed { .. } => None,
            AccessorError::PermissionDenied {
                resource_identifier,
                ..
            } => Some(resource_identifier),
            AccessorError::InvalidResourceIdentifier(id)
            | AccessorError::FilesystemPath(id)
            | AccessorError::ResourceNotFound(id)
            | AccessorError::ParentResourceNotFound(id)
            | AccessorError::ResourceInvalid(id)
            | AccessorError::ContainerNotEmpty(id) => Some(id),
        }
    }
}
