//! Compilation session
//!
//! A [`Session`] owns everything one compilation produces: the syntax
//! tree, the scope and type tables, the newline index and the collected
//! diagnostics. Nothing outlives it and nothing is shared between
//! sessions.
//!
//! ```text
//! Source → Scanner → Parser → AST + scopes + pending types
//!        → resolve_all (types) → Resolver → Diagnostics
//! ```

use tracing::{debug, instrument};

use crate::diagnostics::{
    CompileError, Diagnostic, DiagnosticKind, Diagnostics, InternalError, SyntaxError,
};
use crate::parser::ast::{Ast, NodeId};
use crate::parser::lexer::{LineIndex, SourceLocation};
use crate::parser::token::Span;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::symbols::scope::ScopeTable;
use crate::symbols::types::{CoercionRules, NumericWidening, Strict, TypeTable};

/// Which implicit conversions are allowed where a value flows into a
/// declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoercionPolicy {
    /// Lossless numeric widening
    #[default]
    Widening,
    /// No implicit conversions
    Strict,
}

impl CoercionPolicy {
    fn rules(self) -> &'static dyn CoercionRules {
        match self {
            CoercionPolicy::Widening => &NumericWidening,
            CoercionPolicy::Strict => &Strict,
        }
    }
}

/// Compilation options
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub coercion: CoercionPolicy,
    /// Limit on the diagnostics returned by [`Session::visible_diagnostics`].
    /// Collection itself is never truncated.
    pub max_diagnostics: Option<usize>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_coercion(mut self, coercion: CoercionPolicy) -> Self {
        self.coercion = coercion;
        self
    }

    pub fn with_max_diagnostics(mut self, max: usize) -> Self {
        self.max_diagnostics = Some(max);
        self
    }
}

/// One compilation of one source text
#[derive(Debug)]
pub struct Session<'src> {
    source: &'src str,
    options: Options,
    ast: Ast<'src>,
    root: NodeId,
    scopes: ScopeTable<'src>,
    types: TypeTable<'src>,
    lines: LineIndex,
    diagnostics: Diagnostics,
    types_resolved: bool,
}

impl<'src> Session<'src> {
    /// Scan, parse and resolve `source`.
    ///
    /// Bad input never makes this fail: lexical, syntax and resolution
    /// problems end up in [`Session::diagnostics`]. An `Err` means the
    /// compiler itself hit a broken invariant.
    #[instrument(skip_all, fields(bytes = source.len()))]
    pub fn compile(source: &'src str, options: Options) -> Result<Self, CompileError> {
        let mut scopes = ScopeTable::new();
        let mut types = TypeTable::new(&mut scopes);

        let mut parser = Parser::new(source, &mut scopes, &mut types);
        let (root, parsed) = parser.parse_program();
        let (ast, lines) = parser.finish();

        let mut diagnostics = Diagnostics::new();
        for (node, error) in ast.syntax_errors(root) {
            let kind = match error {
                SyntaxError::Internal(what) => return Err(InternalError::Parser(what).into()),
                SyntaxError::Lexical(errors) => DiagnosticKind::Lexical(errors),
                other => DiagnosticKind::Syntax(other),
            };
            diagnostics.push(Diagnostic::new(kind, ast.span(node)));
        }
        // lexical errors skipped during recovery are collected at the end
        diagnostics.sort_by_position();

        let types_resolved = types.resolve_all(&scopes, &ast, &mut diagnostics);

        let mut session = Session {
            source,
            options,
            ast,
            root,
            scopes,
            types,
            lines,
            diagnostics,
            types_resolved,
        };

        // resolution still runs after failed types to report as much as possible
        session.resolve()?;

        debug!(
            parsed,
            types_resolved,
            diagnostics = session.diagnostics.len(),
            "compiled"
        );
        Ok(session)
    }

    /// Run the resolve pass (again). Diagnostics that were already
    /// collected are not repeated; returns how many new ones were found.
    pub fn resolve(&mut self) -> Result<usize, CompileError> {
        let rules = self.options.coercion.rules();
        let found =
            Resolver::new(&mut self.ast, &mut self.scopes, &mut self.types, rules).run(self.root)?;

        let mut added = 0;
        for diagnostic in found {
            if !self.diagnostics.contains(&diagnostic) {
                self.diagnostics.push(diagnostic);
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn ast(&self) -> &Ast<'src> {
        &self.ast
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn scopes(&self) -> &ScopeTable<'src> {
        &self.scopes
    }

    pub fn types(&self) -> &TypeTable<'src> {
        &self.types
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.lines
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Diagnostics up to the configured limit.
    pub fn visible_diagnostics(&self) -> &[Diagnostic] {
        let all = self.diagnostics.as_slice();
        match self.options.max_diagnostics {
            Some(max) if max < all.len() => &all[..max],
            _ => all,
        }
    }

    /// Whether every pending type resolved.
    pub fn types_resolved(&self) -> bool {
        self.types_resolved
    }

    /// Whether the program compiled without any diagnostic.
    pub fn success(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Line and column of the start of `span`.
    pub fn location(&self, span: Span) -> SourceLocation {
        self.lines.location(span.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_program() {
        let session = Session::compile(
            "fn add(a i32, b i32) -> i32 { return a + b; }\nvar x i32 = add(1, 2);",
            Options::new(),
        )
        .expect("no internal error");
        assert!(session.success(), "{:?}", session.diagnostics());
        assert!(session.types_resolved());
    }

    #[test]
    fn test_diagnostics_are_ordered_and_located() {
        let session = Session::compile(
            "fn main() {\n  var a i32 = $;\n  var b bool = 1;\n}",
            Options::new(),
        )
        .expect("no internal error");
        let diagnostics = session.diagnostics().as_slice();
        assert_eq!(diagnostics.len(), 2, "{:?}", diagnostics);
        assert!(matches!(diagnostics[0].kind, DiagnosticKind::Lexical(_)));
        assert_eq!(session.location(diagnostics[0].span).line, 2);
        assert_eq!(session.location(diagnostics[1].span).line, 3);
    }

    #[test]
    fn test_strict_coercion() {
        let source = "var a i64 = 1;";
        let widening = Session::compile(source, Options::new()).expect("no internal error");
        assert!(widening.success());

        let strict = Session::compile(source, Options::new().with_coercion(CoercionPolicy::Strict))
            .expect("no internal error");
        assert_eq!(strict.diagnostics().len(), 1);
    }

    #[test]
    fn test_visible_diagnostics_are_limited() {
        let session = Session::compile(
            "var a i32 = true; var b i32 = true; var c i32 = true;",
            Options::new().with_max_diagnostics(2),
        )
        .expect("no internal error");
        assert_eq!(session.diagnostics().len(), 3);
        assert_eq!(session.visible_diagnostics().len(), 2);
    }
}
