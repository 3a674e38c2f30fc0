//! Diagnostic records produced by the front end
//!
//! Lexical and syntax problems live in the tree as error nodes and are
//! collected into [`Diagnostic`]s after parsing. Resolution problems are
//! pushed directly while the resolver walks the tree. Either way the
//! record shape is the same: a kind, a primary span and zero or more
//! related declaration nodes.
//!
//! [`InternalError`] is different: it signals a bug in the compiler, not
//! bad input, and aborts the compilation.

use std::fmt;

use smallvec::SmallVec;
use thiserror::Error;

use crate::parser::ast::NodeId;
use crate::parser::token::{LexErrors, Span, TokenKind, TokenSet};

/// Syntax error kinds. One per error node.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SyntaxError {
    #[error("expected {expected}, found {found}")]
    Expected { expected: TokenSet, found: TokenKind },

    #[error("expected expression, found {found}")]
    ExpectedExpression { found: TokenKind },

    #[error("{0}")]
    Lexical(LexErrors),

    #[error("unnamed variable cannot have an initializer")]
    IllegalUnnamedInitializer,

    #[error("assignments cannot be chained")]
    ChainedAssignment,

    #[error("only a simple statement may follow 'do'")]
    IllegalDoStatement,

    #[error("only variable, struct and function declarations are allowed at top level")]
    IllegalTopLevelStatement,

    #[error("a function literal cannot be invoked directly")]
    InvokedFunctionLiteral,

    #[error("internal compiler error: {0}")]
    Internal(&'static str),

    /// A child failed; carries no message of its own.
    #[error("")]
    Bubble,
}

impl SyntaxError {
    pub fn is_bubble(&self) -> bool {
        matches!(self, SyntaxError::Bubble)
    }
}

/// Resolution error kinds, with their substituted arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("cannot find '{name}' in this scope")]
    UnresolvedIdentifier { name: String },

    #[error("no member '{name}' on type '{owner}'")]
    UnresolvedMember { name: String, owner: String },

    #[error("cannot find type '{name}' in this scope")]
    UnresolvedType { name: String },

    #[error("variable '{name}' is already defined in this scope")]
    DuplicateVariable { name: String },

    #[error("struct '{name}' is already defined in this scope")]
    DuplicateStruct { name: String },

    #[error("function '{name}' with signature '{signature}' is already defined in this scope")]
    DuplicateFunction { name: String, signature: String },

    #[error("mismatched types in {context}: expected '{expected}', found '{found}'")]
    TypeMismatch {
        context: &'static str,
        expected: String,
        found: String,
    },

    #[error("operator '{op}' cannot be applied to '{ty}'")]
    InvalidOperand { op: &'static str, ty: String },

    #[error("expression has no value")]
    NoValue,

    #[error("expected {expected} argument(s), found {found}")]
    ArgumentCount { expected: String, found: usize },

    #[error("expected {expected} return value(s), found {found}")]
    ReturnCount { expected: usize, found: usize },

    #[error("call to '{name}' is ambiguous between {count} overloads")]
    AmbiguousCall { name: String, count: usize },

    #[error("no overload of '{name}' accepts ({args})")]
    NoMatchingOverload { name: String, args: String },

    #[error("reference to '{name}' is ambiguous")]
    AmbiguousReference { name: String },

    #[error("no function '{name}' with signature '{signature}'")]
    NoSignatureMatch { name: String, signature: String },

    #[error("'{name}' is a type, not a value")]
    NotAValue { name: String },

    #[error("'{ty}' is not a function")]
    NotCallable { ty: String },

    #[error("cannot dereference non-pointer type '{ty}'")]
    NotPointer { ty: String },

    #[error("array length must be an integer literal")]
    ArrayLength,

    #[error("cannot index non-array type '{ty}'")]
    NotArray { ty: String },

    #[error("type '{ty}' has no members")]
    NoMembers { ty: String },

    #[error("left side of assignment is not assignable")]
    NotAssignable,

    #[error("'break' outside of a loop")]
    BreakOutsideLoop,

    #[error("'continue' outside of a loop")]
    ContinueOutsideLoop,

    #[error("'return' outside of a function")]
    ReturnOutsideFunction,
}

/// Unrecoverable compiler bug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("resolver reached unexpected {what} node")]
    UnexpectedNode { what: &'static str },

    #[error("parser reported internal error: {0}")]
    Parser(&'static str),
}

/// Error returned by [`crate::Session::compile`].
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("internal compiler error: {0}")]
    Internal(#[from] InternalError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticKind {
    Lexical(LexErrors),
    Syntax(SyntaxError),
    Semantic(SemanticError),
}

impl DiagnosticKind {
    /// Phase label used when rendering.
    pub fn phase(&self) -> &'static str {
        match self {
            DiagnosticKind::Lexical(_) => "lexical error",
            DiagnosticKind::Syntax(_) => "syntax error",
            DiagnosticKind::Semantic(_) => "error",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::Lexical(errors) => write!(f, "{}", errors),
            DiagnosticKind::Syntax(error) => write!(f, "{}", error),
            DiagnosticKind::Semantic(error) => write!(f, "{}", error),
        }
    }
}

/// Secondary location attached to a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Related {
    Node(NodeId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub span: Span,
    pub related: SmallVec<[Related; 1]>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, span: Span) -> Self {
        Self {
            kind,
            span,
            related: SmallVec::new(),
        }
    }

    pub fn semantic(error: SemanticError, span: Span) -> Self {
        Self::new(DiagnosticKind::Semantic(error), span)
    }

    pub fn with_related(mut self, related: Related) -> Self {
        self.related.push(related);
        self
    }

    pub fn semantic_error(&self) -> Option<&SemanticError> {
        match &self.kind {
            DiagnosticKind::Semantic(error) => Some(error),
            _ => None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.phase(), self.kind)
    }
}

/// Ordered list of collected diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    list: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::trace!(span = ?diagnostic.span, "{}", diagnostic);
        self.list.push(diagnostic);
    }

    pub fn semantic(&mut self, error: SemanticError, span: Span) {
        self.push(Diagnostic::semantic(error, span));
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.list.iter()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.list
    }

    pub fn contains(&self, diagnostic: &Diagnostic) -> bool {
        self.list.contains(diagnostic)
    }

    /// Stable sort by primary span start.
    pub fn sort_by_position(&mut self) {
        self.list.sort_by_key(|diagnostic| diagnostic.span.start);
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_message_lists_alternatives() {
        let error = SyntaxError::Expected {
            expected: TokenSet::of(&[TokenKind::Comma, TokenKind::RParen]),
            found: TokenKind::Semicolon,
        };
        assert_eq!(error.to_string(), "expected ',' or ')', found ';'");
    }

    #[test]
    fn test_diagnostic_display_includes_phase() {
        let diagnostic = Diagnostic::semantic(
            SemanticError::UnresolvedIdentifier {
                name: "x".to_string(),
            },
            Span::new(3, 4),
        );
        assert_eq!(
            diagnostic.to_string(),
            "error: cannot find 'x' in this scope"
        );

        let lexical = Diagnostic::new(
            DiagnosticKind::Lexical(LexErrors::UNTERMINATED_STRING),
            Span::new(0, 1),
        );
        assert_eq!(lexical.to_string(), "lexical error: unterminated string");
    }
}
