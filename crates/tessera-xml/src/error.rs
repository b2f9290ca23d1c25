//! Error and diagnostic system for the Tessera XML mapper.
//!
//! This module provides an error handling system with:
//! - Error codes for documentation and searchability
//! - Labeled byte spans pointing into the source document
//! - Severity levels, so lenient reads can report what they tolerated
//! - Diagnostic collector for accumulating warnings next to a fatal error
//!
//! # Overview
//!
//! The error system is built around the [`Diagnostic`] type, which represents
//! a single error or warning message with optional error code, source
//! locations, and help text. Failed reads and writes return a
//! [`MappingError`] wrapping the diagnostics; its [`ErrorKind`] tells markup
//! problems, registry mismatches and dangling references apart.
//!
//! # Example
//!
//! ```
//! # use tessera_xml::error::{Diagnostic, ErrorCode};
//! # use tessera_xml::Span;
//!
//! let span = Span::new(100..120);
//! let original_span = Span::new(50..70);
//!
//! let diag = Diagnostic::error("id `Decision_1` is used by two elements")
//!     .with_code(ErrorCode::E105)
//!     .with_label(span, "duplicate id")
//!     .with_secondary_label(original_span, "first used here")
//!     .with_help("ids must be unique within a document");
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod label;
mod mapping_error;

pub(crate) use collector::DiagnosticCollector;
pub(crate) use mapping_error::Result;

pub use diagnostic::{Diagnostic, Severity};
pub use error_code::ErrorCode;
pub use label::Label;
pub use mapping_error::{ErrorKind, MappingError};
