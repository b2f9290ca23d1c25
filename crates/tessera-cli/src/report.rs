//! Rendering of mapping problems through miette.
//!
//! Read diagnostics carry spans into the document and are shown with
//! snippets. Write diagnostics describe an object graph, so they render as
//! bare messages, as do schema and I/O failures.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, GraphicalReportHandler, LabeledSpan, SourceSpan};

use tessera::{Diagnostic, Severity, TesseraError};

/// One renderable problem.
#[derive(Debug)]
pub struct Report<'a> {
    subject: Subject<'a>,
}

#[derive(Debug)]
enum Subject<'a> {
    /// A read diagnostic and the document it points into.
    InDocument { diagnostic: &'a Diagnostic, src: &'a str },
    /// A write diagnostic.
    InGraph(&'a Diagnostic),
    Failure(&'a TesseraError),
}

impl<'a> Report<'a> {
    fn diagnostic(&self) -> Option<&'a Diagnostic> {
        match self.subject {
            Subject::InDocument { diagnostic, .. } | Subject::InGraph(diagnostic) => Some(diagnostic),
            Subject::Failure(_) => None,
        }
    }
}

/// Reports for a failed run, one per diagnostic the mapper produced.
pub fn failure(err: &TesseraError) -> Vec<Report<'_>> {
    match err {
        TesseraError::Read { err, src } => in_document(err.diagnostics(), src),
        TesseraError::Write(err) => err
            .diagnostics()
            .iter()
            .map(|diagnostic| Report {
                subject: Subject::InGraph(diagnostic),
            })
            .collect(),
        _ => vec![Report {
            subject: Subject::Failure(err),
        }],
    }
}

/// Reports for the warnings of a read that succeeded.
pub fn warnings<'a>(warnings: &'a [Diagnostic], src: &'a str) -> Vec<Report<'a>> {
    in_document(warnings, src)
}

/// Render `report` with snippets, falling back to its message alone.
pub fn render(report: &Report<'_>) -> String {
    let mut out = String::new();
    match GraphicalReportHandler::new().render_report(&mut out, report) {
        Ok(()) => out,
        Err(_) => report.to_string(),
    }
}

fn in_document<'a>(diagnostics: &'a [Diagnostic], src: &'a str) -> Vec<Report<'a>> {
    diagnostics
        .iter()
        .map(|diagnostic| Report {
            subject: Subject::InDocument { diagnostic, src },
        })
        .collect()
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.subject {
            Subject::InDocument { diagnostic, .. } | Subject::InGraph(diagnostic) => {
                f.write_str(diagnostic.message())
            }
            Subject::Failure(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for Report<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.subject {
            Subject::Failure(err) => std::error::Error::source(err),
            _ => None,
        }
    }
}

impl MietteDiagnostic for Report<'_> {
    fn code<'b>(&'b self) -> Option<Box<dyn fmt::Display + 'b>> {
        if let Subject::Failure(err) = self.subject {
            let area = match err {
                TesseraError::Io(_) => "tessera::io",
                TesseraError::Schema(_) => "tessera::schema",
                TesseraError::Read { .. } => "tessera::read",
                TesseraError::Write(_) => "tessera::write",
            };
            return Some(Box::new(area));
        }
        let code = self.diagnostic()?.code()?;
        Some(Box::new(code))
    }

    fn severity(&self) -> Option<miette::Severity> {
        let severity = match self.diagnostic().map(Diagnostic::severity) {
            Some(Severity::Warning) => miette::Severity::Warning,
            Some(Severity::Error) | None => miette::Severity::Error,
        };
        Some(severity)
    }

    fn help<'b>(&'b self) -> Option<Box<dyn fmt::Display + 'b>> {
        let help = self.diagnostic()?.help()?;
        Some(Box::new(help))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match &self.subject {
            Subject::InDocument { src, .. } => Some(src as &dyn miette::SourceCode),
            _ => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let Subject::InDocument { diagnostic, .. } = self.subject else {
            return None;
        };
        if diagnostic.labels().is_empty() {
            return None;
        }

        Some(Box::new(diagnostic.labels().iter().map(|label| {
            let span = SourceSpan::new(label.span().start().into(), label.span().len());
            let message = Some(label.message().to_string());
            if label.is_primary() {
                LabeledSpan::new_primary_with_span(message, span)
            } else {
                LabeledSpan::new_with_span(message, span)
            }
        })))
    }
}

#[cfg(test)]
mod tests {
    use tessera::{ErrorCode, MappingError, SchemaError, Span};

    use super::*;

    #[test]
    fn test_read_failure_keeps_warnings_and_snippets() {
        let src = r##"<a x:flag="" ref="#b"/>"##;
        let diagnostics = vec![
            Diagnostic::warning("unknown attribute `x:flag`")
                .with_code(ErrorCode::E101)
                .with_label(Span::new(3..11), "kept as an extension attribute"),
            Diagnostic::error("unresolved reference `b`")
                .with_code(ErrorCode::E200)
                .with_label(Span::new(13..21), "no element has this id"),
        ];
        let err = TesseraError::new_read_error(MappingError::from(diagnostics), src);

        let reports = failure(&err);

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].severity(), Some(miette::Severity::Warning));
        assert_eq!(reports[1].to_string(), "unresolved reference `b`");
        assert_eq!(reports[1].code().map(|code| code.to_string()).as_deref(), Some("E200"));
        assert!(reports[1].source_code().is_some());

        let rendered = render(&reports[1]);
        assert!(rendered.contains("unresolved reference `b`"));
        assert!(rendered.contains("no element has this id"));
    }

    #[test]
    fn test_write_failure_has_no_snippet() {
        let diagnostic = Diagnostic::error("referenced instance has no id")
            .with_code(ErrorCode::E301)
            .with_label(Span::new(0..1), "unused");
        let err = TesseraError::Write(MappingError::from(diagnostic));

        let reports = failure(&err);

        assert_eq!(reports.len(), 1);
        assert!(reports[0].source_code().is_none());
        assert!(reports[0].labels().is_none());
        assert!(render(&reports[0]).contains("referenced instance has no id"));
    }

    #[test]
    fn test_schema_failure_is_a_single_report() {
        let err = TesseraError::Schema(SchemaError::UnknownType("dmn:Missing".to_string()));

        let reports = failure(&err);

        assert_eq!(reports.len(), 1);
        assert_eq!(
            reports[0].code().map(|code| code.to_string()).as_deref(),
            Some("tessera::schema")
        );
        assert_eq!(reports[0].severity(), Some(miette::Severity::Error));
    }

    #[test]
    fn test_secondary_labels_point_at_first_use() {
        let src = r#"<a id="x"/><b id="x"/>"#;
        let diagnostics = [Diagnostic::warning("id `x` is used by two elements")
            .with_label(Span::new(14..20), "duplicate id")
            .with_secondary_label(Span::new(3..9), "first used here")];

        let reports = warnings(&diagnostics, src);

        let labels: Vec<_> = reports[0].labels().unwrap().collect();
        assert_eq!(labels.len(), 2);
        assert!(labels[0].primary());
        assert!(!labels[1].primary());
        assert_eq!(labels[1].label(), Some("first used here"));
    }
}
