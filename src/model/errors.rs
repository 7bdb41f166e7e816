//! Object store errors

use thiserror::Error;

/// Result type for store construction and loading
pub type StoreResult<T> = Result<T, StoreError>;

/// Object store errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    // Construction errors
    #[error("Duplicate distinguished name: {0}")]
    DuplicateDistinguishedName(String),

    #[error("Unknown object id: {0}")]
    UnknownObject(u32),

    // Loading errors
    #[error("Edge from '{from}' targets unknown object '{target}'")]
    UnknownEdgeTarget { from: String, target: String },

    #[error("Object '{dn}': {source}")]
    UnknownMethod {
        dn: String,
        #[source]
        source: super::method::UnknownMethod,
    },

    #[error("Invalid GUID '{0}'")]
    InvalidGuid(String),

    #[error("Invalid object file: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Parse(e.to_string())
    }
}
