//! Error types for the clinical records store.
//!
//! This module defines all error types used throughout the crate, following a
//! hierarchy that separates resource errors, validation errors, search errors
//! and backend errors.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Resource state errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Search operation errors
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors related to resource state.
///
/// Lookups never produce `NotFound`; they return `Ok(None)`. These variants
/// are raised by operations that require the record to exist.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The requested record was not found.
    #[error("resource not found: {resource_type}/{id}")]
    NotFound { resource_type: String, id: String },

    /// A record with the given UUID already exists.
    #[error("resource already exists: {resource_type}/{id}")]
    AlreadyExists { resource_type: String, id: String },
}

/// Errors related to resource validation.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The resource failed validation.
    #[error("invalid resource: {message}")]
    InvalidResource { message: String },

    /// Missing required field.
    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },

    /// A reference could not be parsed or resolved.
    #[error("invalid reference: {reference}: {message}")]
    InvalidReference { reference: String, message: String },

    /// The id in the resource body does not match the id of the request.
    #[error("resource id {body_id} does not match {expected_id}")]
    IdMismatch {
        expected_id: String,
        body_id: String,
    },
}

/// Errors related to search operations.
#[derive(Error, Debug)]
pub enum SearchError {
    /// A search literal could not be parsed.
    #[error("invalid search parameter {parameter}: {message}")]
    InvalidParameter { parameter: String, message: String },

    /// A unique result was requested but several rows matched.
    #[error("expected a unique result, found {count}")]
    NonUniqueResult { count: usize },
}

/// Backend-specific errors.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection acquisition failed.
    #[error("connection to {backend_name} failed: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Query execution failed.
    #[error("query failed on {backend_name}: {message}")]
    QueryFailed {
        backend_name: String,
        message: String,
    },

    /// Serialization of a stored value failed.
    #[error("serialization error: {message}")]
    SerializationError { message: String },

    /// Any other backend failure.
    #[error("{backend_name} internal error: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for StorageError {
    fn from(err: r2d2::Error) -> Self {
        StorageError::Backend(BackendError::ConnectionFailed {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
        })
    }
}
