//! Diagnostics and the shared error sink (ambient; §4.8)
//!
//! `Diagnostic` follows the teacher's hand-rolled `Display`/`std::error::Error`
//! pattern (`codegen/error.rs`'s `CodeGenError`) rather than reaching for
//! `thiserror`: this crate's own errors are few and fixed, so a manual impl
//! keeps the dependency footprint aligned with the teacher.

use std::fmt;

use crate::node::{NodeId, Span};

/// The fixed semantic diagnostic taxonomy (§7). Lexical/parse errors are the
/// external parser's concern and never appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    DeclaredIdent,
    UndeclaredIdent,
    IncompatibleAssignment,
    NonReferenceableLeft,
    NonReferenceableExpression,
    IncompatibleOperator,
    BooleanRequired,
    NonArrayInIndex,
    NonIntegerIndex,
    IsNotCallable,
    IsNotFunction,
    NumberOfParameters,
    IncompatibleParameter,
    ReadWriteRequireBasic,
    IncompatibleReturn,
    NoMainProperlyDeclared,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DiagnosticKind::DeclaredIdent => "declared_ident",
            DiagnosticKind::UndeclaredIdent => "undeclared_ident",
            DiagnosticKind::IncompatibleAssignment => "incompatible_assignment",
            DiagnosticKind::NonReferenceableLeft => "non_referenceable_left",
            DiagnosticKind::NonReferenceableExpression => "non_referenceable_expression",
            DiagnosticKind::IncompatibleOperator => "incompatible_operator",
            DiagnosticKind::BooleanRequired => "boolean_required",
            DiagnosticKind::NonArrayInIndex => "non_array_in_index",
            DiagnosticKind::NonIntegerIndex => "non_integer_index",
            DiagnosticKind::IsNotCallable => "is_not_callable",
            DiagnosticKind::IsNotFunction => "is_not_function",
            DiagnosticKind::NumberOfParameters => "number_of_parameters",
            DiagnosticKind::IncompatibleParameter => "incompatible_parameter",
            DiagnosticKind::ReadWriteRequireBasic => "read_write_require_basic",
            DiagnosticKind::IncompatibleReturn => "incompatible_return",
            DiagnosticKind::NoMainProperlyDeclared => "no_main_properly_declared",
        };
        write!(f, "{text}")
    }
}

/// One reported semantic error: its kind, a human-readable message, and the
/// node (and, when available, the span copied from it) it was raised
/// against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub node: NodeId,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, node: NodeId) -> Self {
        Diagnostic {
            kind,
            message: message.into(),
            node,
            span: None,
        }
    }

    pub fn with_span(mut self, span: Option<Span>) -> Self {
        self.span = span;
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(span) => write!(f, "{span}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for Diagnostic {}

/// Accumulates diagnostics raised by SymbolPass and TypeCheckPass, shared
/// between the two via `&mut` (§4.8) so every error flows through one
/// taxonomy and one sort order.
#[derive(Debug, Default)]
pub struct ErrorSink {
    diagnostics: Vec<Diagnostic>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(
        &mut self,
        kind: DiagnosticKind,
        message: impl Into<String>,
        node: NodeId,
        span: Option<Span>,
    ) {
        self.diagnostics
            .push(Diagnostic::new(kind, message, node).with_span(span));
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Diagnostics sorted by source position, stable so ties (including
    /// unpositioned diagnostics, which sort last) preserve report order.
    pub fn into_sorted(mut self) -> Vec<Diagnostic> {
        self.diagnostics.sort_by_key(|d| match d.span {
            Some(span) => (0u8, span.line, span.column),
            None => (1u8, usize::MAX, usize::MAX),
        });
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sink_reports_no_diagnostics() {
        let sink = ErrorSink::new();
        assert!(sink.is_empty());
        assert_eq!(sink.len(), 0);
    }

    #[test]
    fn report_adds_a_diagnostic() {
        let mut sink = ErrorSink::new();
        sink.report(
            DiagnosticKind::UndeclaredIdent,
            "undeclared name `x`",
            NodeId(0),
            None,
        );
        assert!(!sink.is_empty());
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn into_sorted_orders_by_line_then_column() {
        let mut sink = ErrorSink::new();
        sink.report(
            DiagnosticKind::UndeclaredIdent,
            "second",
            NodeId(1),
            Some(Span::new(2, 0, 1)),
        );
        sink.report(
            DiagnosticKind::UndeclaredIdent,
            "first",
            NodeId(0),
            Some(Span::new(1, 5, 1)),
        );
        let sorted = sink.into_sorted();
        assert_eq!(sorted[0].message, "first");
        assert_eq!(sorted[1].message, "second");
    }

    #[test]
    fn unpositioned_diagnostics_sort_last_and_keep_relative_order() {
        let mut sink = ErrorSink::new();
        sink.report(DiagnosticKind::NoMainProperlyDeclared, "no main", NodeId(0), None);
        sink.report(
            DiagnosticKind::UndeclaredIdent,
            "positioned",
            NodeId(1),
            Some(Span::new(0, 0, 1)),
        );
        sink.report(DiagnosticKind::NoMainProperlyDeclared, "also no main", NodeId(2), None);
        let sorted = sink.into_sorted();
        assert_eq!(sorted[0].message, "positioned");
        assert_eq!(sorted[1].message, "no main");
        assert_eq!(sorted[2].message, "also no main");
    }

    #[test]
    fn display_includes_span_when_present() {
        let with_span = Diagnostic::new(DiagnosticKind::BooleanRequired, "need bool", NodeId(0))
            .with_span(Some(Span::new(0, 0, 1)));
        assert_eq!(with_span.to_string(), "1:1: need bool");

        let without_span = Diagnostic::new(DiagnosticKind::BooleanRequired, "need bool", NodeId(0));
        assert_eq!(without_span.to_string(), "need bool");
    }
}
