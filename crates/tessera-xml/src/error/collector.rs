//! Warnings gathered over one read.
//!
//! Lenient reads keep going past content they tolerate. The collector holds
//! those warnings until the read ends, and a fatal error carries them along so
//! callers see everything that went wrong up to that point.

use crate::error::{Diagnostic, MappingError};

#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    warnings: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `diagnostic` as a warning, whatever severity it was raised with.
    pub fn tolerate(&mut self, diagnostic: Diagnostic) {
        self.warnings.push(diagnostic.into_warning());
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// End a successful read.
    pub fn into_warnings(self) -> Vec<Diagnostic> {
        self.warnings
    }

    /// End the read with a fatal error, preceded by the warnings so far.
    pub fn fail(self, error: Diagnostic) -> MappingError {
        MappingError::new(self.with_error(error))
    }

    /// End the read with the dangling-reference error for `missing` ids.
    pub fn dangling(self, error: Diagnostic, missing: Vec<String>) -> MappingError {
        MappingError::dangling(self.with_error(error), missing)
    }

    fn with_error(self, error: Diagnostic) -> Vec<Diagnostic> {
        let mut diagnostics = self.warnings;
        diagnostics.push(error);
        diagnostics
    }
}
