//! The MappingError type returned by failed reads and writes.

use std::fmt;

use crate::error::Diagnostic;

/// A type alias for `Result<T, Diagnostic>`.
pub type Result<T> = std::result::Result<T, Diagnostic>;

/// Broad category of a [`MappingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The markup is not well-formed.
    Parse,
    /// The markup or the instance graph does not fit the registry.
    Validation,
    /// References name ids no element in the document carries.
    DanglingReference,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Parse => write!(f, "parse error"),
            ErrorKind::Validation => write!(f, "validation error"),
            ErrorKind::DanglingReference => write!(f, "dangling reference"),
        }
    }
}

/// Error type for reads and writes.
///
/// Wraps one or more diagnostics. Warnings gathered before the failure are
/// kept next to the error that ended the operation.
#[derive(Debug)]
pub struct MappingError {
    diagnostics: Vec<Diagnostic>,
    unresolved: Vec<String>,
}

impl MappingError {
    /// Create a new mapping error from diagnostics.
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            diagnostics,
            unresolved: Vec::new(),
        }
    }

    /// Create a dangling reference error listing the missing ids.
    pub(crate) fn dangling(diagnostics: Vec<Diagnostic>, unresolved: Vec<String>) -> Self {
        Self {
            diagnostics,
            unresolved,
        }
    }

    /// The category of the first error diagnostic.
    pub fn kind(&self) -> ErrorKind {
        self.diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.severity().is_error())
            .find_map(Diagnostic::code)
            .map(|code| code.kind())
            .unwrap_or(ErrorKind::Validation)
    }

    /// Get all diagnostics in this error.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Every id that could not be resolved, deduplicated, in document order.
    ///
    /// Empty unless [`kind`](Self::kind) is [`ErrorKind::DanglingReference`].
    pub fn unresolved_ids(&self) -> &[String] {
        &self.unresolved
    }
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut errors = self
            .diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.severity().is_error());
        if let Some(first) = errors.next() {
            write!(f, "{}", first)?;
            let more = errors.count();
            if more > 0 {
                write!(f, " (+{} more)", more)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for MappingError {}

impl From<Diagnostic> for MappingError {
    fn from(diagnostic: Diagnostic) -> Self {
        Self::new(vec![diagnostic])
    }
}

impl From<Vec<Diagnostic>> for MappingError {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self::new(diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_mapping_error_from_diagnostic() {
        let err: MappingError = Diagnostic::error("test error").with_code(ErrorCode::E100).into();

        assert_eq!(err.diagnostics().len(), 1);
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.unresolved_ids().is_empty());
    }

    #[test]
    fn test_kind_ignores_warnings() {
        let err: MappingError = vec![
            Diagnostic::warning("tolerated").with_code(ErrorCode::E101),
            Diagnostic::error("broken").with_code(ErrorCode::E001),
        ]
        .into();

        assert_eq!(err.kind(), ErrorKind::Parse);
        assert_eq!(err.to_string(), "error[E001]: broken");
    }

    #[test]
    fn test_display_multiple() {
        let err: MappingError = vec![
            Diagnostic::error("first error"),
            Diagnostic::error("second error"),
            Diagnostic::error("third error"),
        ]
        .into();

        assert_eq!(err.to_string(), "error: first error (+2 more)");
    }

    #[test]
    fn test_dangling_carries_ids() {
        let err = MappingError::dangling(
            vec![Diagnostic::error("unresolved").with_code(ErrorCode::E200)],
            vec!["a".to_string(), "b".to_string()],
        );

        assert_eq!(err.kind(), ErrorKind::DanglingReference);
        assert_eq!(err.unresolved_ids(), ["a", "b"]);
    }
}
