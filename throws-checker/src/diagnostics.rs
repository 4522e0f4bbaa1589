//! Lint diagnostics.

use std::fmt;
use throws_ast::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    UncaughtThrow,
    UnsafeAssignment,
    UnsafeOverride,
    ConflictingAnnotations,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::UncaughtThrow => "uncaught_throw",
            DiagnosticCode::UnsafeAssignment => "unsafe_assignment",
            DiagnosticCode::UnsafeOverride => "unsafe_override",
            DiagnosticCode::ConflictingAnnotations => "conflicting_annotations",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            DiagnosticCode::ConflictingAnnotations => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub span: Span,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.code.as_str(), self.message, self.span)
    }
}

/// Collects diagnostics during a lint pass.
#[derive(Debug, Default)]
pub struct DiagnosticReporter {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        DiagnosticReporter::default()
    }

    pub fn report(&mut self, code: DiagnosticCode, span: Span, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic { code, span, message: message.into() });
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.code.severity() == Severity::Error)
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_severities() {
        assert_eq!(DiagnosticCode::UncaughtThrow.as_str(), "uncaught_throw");
        assert_eq!(DiagnosticCode::UncaughtThrow.severity(), Severity::Error);
        assert_eq!(
            DiagnosticCode::ConflictingAnnotations.severity(),
            Severity::Warning
        );
    }

    #[test]
    fn reporter_tracks_errors() {
        let mut reporter = DiagnosticReporter::new();
        assert!(!reporter.has_errors());
        reporter.report(
            DiagnosticCode::ConflictingAnnotations,
            Span::synthetic(),
            "Conflicting throws annotations on this element",
        );
        assert!(!reporter.has_errors());
        reporter.report(
            DiagnosticCode::UnsafeAssignment,
            Span::synthetic(),
            "This assignment is potentially unsafe",
        );
        assert!(reporter.has_errors());
        assert_eq!(reporter.diagnostics().len(), 2);
    }
}
