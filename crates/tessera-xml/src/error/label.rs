//! Messages pinned to byte ranges of the source document.

use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    /// The offending markup itself.
    Primary,
    /// Markup elsewhere that explains the problem.
    Context,
}

/// A message attached to a [`Span`] of the document.
///
/// Each diagnostic points its primary label at the markup that caused it.
/// Context labels mark related locations, such as the element that already
/// claimed a duplicated id.
#[derive(Debug, Clone)]
pub struct Label {
    role: Role,
    span: Span,
    message: String,
}

impl Label {
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Self::new(Role::Primary, span, message)
    }

    pub fn secondary(span: Span, message: impl Into<String>) -> Self {
        Self::new(Role::Context, span, message)
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_primary(&self) -> bool {
        self.role == Role::Primary
    }

    pub fn is_secondary(&self) -> bool {
        self.role == Role::Context
    }

    /// The markup this label covers in `src`.
    ///
    /// `None` when the span lies outside `src` or splits a character, which
    /// happens when the label belongs to another document.
    pub fn snippet<'s>(&self, src: &'s str) -> Option<&'s str> {
        src.get(self.span.start()..self.span.end())
    }

    fn new(role: Role, span: Span, message: impl Into<String>) -> Self {
        Self {
            role,
            span,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_covers_markup() {
        let src = r##"<f:Edge source="#n1"/>"##;
        let label = Label::primary(Span::new(8..20), "no element has id `n1`");

        assert!(label.is_primary());
        assert_eq!(label.snippet(src), Some(r##"source="#n1""##));
    }

    #[test]
    fn test_snippet_outside_source() {
        let label = Label::secondary(Span::new(40..48), "first used here");

        assert!(label.is_secondary());
        assert_eq!(label.snippet("<f:Graph/>"), None);

        let split = Label::primary(Span::new(5..7), "inside a character");
        assert_eq!(split.snippet("<f:Ré/>"), None);
    }
}
