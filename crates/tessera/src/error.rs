//! Error types for Tessera operations.
//!
//! This module provides the main error type [`TesseraError`] which wraps
//! the error conditions that can occur while loading descriptors and mapping
//! documents.

use std::io;

use thiserror::Error;

use tessera_core::SchemaError;
use tessera_xml::{ErrorKind, MappingError};

/// The main error type for Tessera operations.
///
/// # Diagnostic Variants
///
/// The `Read` variant keeps the document text next to the structured
/// diagnostics so their byte spans can be rendered as source snippets.
#[derive(Debug, Error)]
pub enum TesseraError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("{err}")]
    Read { err: MappingError, src: String },

    #[error("{0}")]
    Write(MappingError),
}

impl TesseraError {
    /// Create a new `Read` error with the associated document text.
    pub fn new_read_error(err: MappingError, src: impl Into<String>) -> Self {
        Self::Read {
            err,
            src: src.into(),
        }
    }

    /// The category of a mapping failure, `None` for I/O and schema errors.
    pub fn kind(&self) -> Option<ErrorKind> {
        self.mapping_error().map(MappingError::kind)
    }

    /// Every id a failed read could not resolve.
    pub fn unresolved_ids(&self) -> &[String] {
        self.mapping_error()
            .map(MappingError::unresolved_ids)
            .unwrap_or_default()
    }

    fn mapping_error(&self) -> Option<&MappingError> {
        match self {
            Self::Read { err, .. } | Self::Write(err) => Some(err),
            Self::Io(_) | Self::Schema(_) => None,
        }
    }
}
