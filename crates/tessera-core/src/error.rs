//! Error types for registry construction and queries.

use thiserror::Error;

/// Errors raised while building or querying a [`Registry`](crate::Registry).
///
/// Construction errors are fatal: a registry is either built completely or
/// not at all.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Two descriptors disagree about a type, a property or a namespace prefix.
    #[error("schema conflict: {0}")]
    Conflict(String),

    /// A qualified type name that the registry does not know.
    #[error("unknown type `{0}`")]
    UnknownType(String),

    /// An attempt to instantiate a type marked abstract.
    #[error("type `{0}` is abstract and cannot be instantiated")]
    AbstractType(String),

    /// A descriptor that is well-formed JSON but structurally unusable.
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// A descriptor document that could not be deserialized.
    #[error("malformed descriptor: {0}")]
    Json(#[from] serde_json::Error),
}
