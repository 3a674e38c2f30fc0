//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing
//! infrastructure: token helpers, error-node construction, the shared
//! panic-mode recovery primitive and the program entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses recursive descent with the following organization:
//! - This module: Parser struct, helper methods, recovery and coordination
//! - `declarations`: variable, struct and function declarations, types and
//!   function headers
//! - `statements`: blocks, control flow and simple statements
//! - `expressions`: precedence climbing, unary, postfix and primary forms
//!
//! # Error Recovery
//!
//! Parse functions never fail with a Rust error. A failing production
//! returns an [`Node::Error`] in place of the node it tried to build,
//! carrying whatever children it had already parsed. A construct whose
//! child failed wraps it in a [`SyntaxError::Bubble`] node and returns
//! immediately; list constructs (program items, block statements, struct
//! members, parameters and call arguments) are the only places that skip
//! tokens to get back in sync, via [`Parser::recover`].
//!
//! Parser methods are split across multiple files using `impl Parser`
//! blocks, allowing each module to extend the Parser with related
//! functionality while maintaining access to the shared parser state.

use tracing::{debug, instrument, trace};

use crate::diagnostics::SyntaxError;
use crate::parser::ast::{Ast, Node, NodeId};
use crate::parser::lexer::{LineIndex, Scanner};
use crate::parser::token::{Span, Token, TokenKind, TokenSet};
use crate::symbols::scope::{ScopeId, ScopeTable};
use crate::symbols::types::TypeTable;

/// Tokens that can begin an expression.
pub(crate) const EXPRESSION_START: TokenSet = TokenSet::of(&[
    TokenKind::IntLiteral,
    TokenKind::FloatLiteral,
    TokenKind::BoolLiteral,
    TokenKind::StringLiteral,
    TokenKind::Identifier,
    TokenKind::LParen,
    TokenKind::Fn,
    TokenKind::Plus,
    TokenKind::Minus,
    TokenKind::Bang,
    TokenKind::Caret,
    TokenKind::At,
]);

/// Tokens that can begin a statement.
pub(crate) const STATEMENT_START: TokenSet = EXPRESSION_START.union(TokenSet::of(&[
    TokenKind::Var,
    TokenKind::Struct,
    TokenKind::LBrace,
    TokenKind::If,
    TokenKind::While,
    TokenKind::Return,
    TokenKind::Break,
    TokenKind::Continue,
]));

/// Separators of comma lists closed by `)`.
pub(crate) const LIST_SEPARATORS: TokenSet = TokenSet::of(&[TokenKind::Comma, TokenKind::RParen]);

/// Whether the parser is in step with the token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SyncState {
    Clean,
    /// An error was reported and tokens still need to be skipped.
    Panicking,
    /// Recovery already consumed the `;` ending the current statement.
    Terminated,
}

/// Result of [`Parser::recover`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Recovery {
    /// A designated token was found at depth zero and consumed.
    Recovered(TokenKind),
    /// A depth-zero `;` was found and consumed.
    Terminated,
    /// An unmatched closing bracket was found; it is not consumed.
    Stopped(TokenKind),
    Eof,
}

/// What a comma list does after one of its items failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListRecovery {
    /// Keep going; the consumed separator or closer is given.
    Continue(TokenKind),
    /// Give up on the list and bubble the failure up.
    Abort,
}

/// Recursive descent parser producing an arena AST
pub struct Parser<'src, 'ctx> {
    pub(crate) scanner: Scanner<'src>,
    pub(crate) ast: Ast<'src>,
    pub(crate) scopes: &'ctx mut ScopeTable<'src>,
    pub(crate) types: &'ctx mut TypeTable<'src>,
    /// Scope new declarations go into
    pub(crate) scope: ScopeId,
    pub(crate) sync: SyncState,
    /// Error tokens skipped during recovery, reported from the program root
    skipped: Vec<NodeId>,
}

impl<'src, 'ctx> Parser<'src, 'ctx> {
    pub fn new(
        source: &'src str,
        scopes: &'ctx mut ScopeTable<'src>,
        types: &'ctx mut TypeTable<'src>,
    ) -> Self {
        Self {
            scanner: Scanner::new(source),
            ast: Ast::new(source),
            scopes,
            types,
            scope: ScopeId::GLOBAL,
            sync: SyncState::Clean,
            skipped: Vec::new(),
        }
    }

    /// Parse the entire program. Returns the root node and whether the
    /// tree is free of error nodes.
    #[instrument(skip_all)]
    pub fn parse_program(&mut self) -> (NodeId, bool) {
        let mut items = Vec::new();

        while !self.check(TokenKind::Eof) {
            let before = self.scanner.tokens_consumed();
            let item = self.parse_top_level();
            let failed = self.ast.is_error(item);
            items.push(item);
            if failed {
                self.recover_statement(before, TokenSet::EMPTY);
            }
        }
        items.append(&mut self.skipped);

        let root = self.ast.alloc(
            Node::Program {
                items,
                scope: ScopeId::GLOBAL,
            },
            Span::new(0, self.scanner.source().len()),
        );
        let errors = self.ast.syntax_errors(root).len();
        debug!(
            tokens = self.scanner.tokens_consumed(),
            nodes = self.ast.len(),
            scopes = self.scopes.len(),
            errors,
            "parsed program"
        );

        (root, errors == 0)
    }

    /// Hand over the tree and the newline index.
    pub fn finish(self) -> (Ast<'src>, LineIndex) {
        (self.ast, self.scanner.into_line_index())
    }

    // ===== Token helpers =====

    pub(crate) fn peek(&mut self, n: usize) -> TokenKind {
        self.scanner.peek(n)
    }

    pub(crate) fn check(&mut self, kind: TokenKind) -> bool {
        self.peek(0) == kind
    }

    pub(crate) fn advance(&mut self) -> Token<'src> {
        self.scanner.consume()
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> Option<Token<'src>> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) -> Result<Token<'src>, SyntaxError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(TokenSet::of(&[kind])))
        }
    }

    /// Error describing the current token when one of `expected` was
    /// wanted. Error tokens report their lexical problem instead.
    pub(crate) fn unexpected(&mut self, expected: TokenSet) -> SyntaxError {
        let lexeme = *self.scanner.peek_lexeme(0);
        if lexeme.is_error() {
            SyntaxError::Lexical(lexeme.errors)
        } else {
            SyntaxError::Expected {
                expected,
                found: lexeme.kind,
            }
        }
    }

    /// Start offset of the next token.
    pub(crate) fn start(&mut self) -> u32 {
        self.scanner.peek_lexeme(0).span.start
    }

    /// Span from `start` to the end of the last consumed token.
    pub(crate) fn span_from(&mut self, start: u32) -> Span {
        let end = self.scanner.prev_end();
        if end > start {
            Span { start, end }
        } else {
            // nothing consumed yet: point at the offending token
            self.scanner.peek_lexeme(0).span
        }
    }

    pub(crate) fn finish_node(&mut self, node: Node, start: u32) -> NodeId {
        let span = self.span_from(start);
        self.ast.alloc(node, span)
    }

    // ===== Error nodes =====

    /// Report a new syntax error. The parser is out of sync afterwards.
    pub(crate) fn error(&mut self, kind: SyntaxError, start: u32, children: Vec<NodeId>) -> NodeId {
        trace!(%kind, "syntax error");
        self.sync = SyncState::Panicking;
        self.finish_node(Node::Error { kind, children }, start)
    }

    /// Report a syntax error at a token that was just consumed to make
    /// progress. The parser stays in sync.
    pub(crate) fn error_consumed(&mut self, kind: SyntaxError, start: u32) -> NodeId {
        let node = self.error(kind, start, Vec::new());
        self.sync = SyncState::Clean;
        node
    }

    /// Wrap children of a failed construct without adding a message.
    pub(crate) fn bubble(&mut self, start: u32, children: Vec<NodeId>) -> NodeId {
        self.finish_node(
            Node::Error {
                kind: SyntaxError::Bubble,
                children,
            },
            start,
        )
    }

    pub(crate) fn is_error(&self, node: NodeId) -> bool {
        self.ast.is_error(node)
    }

    // ===== Recovery =====

    /// Skip tokens until one of `targets` or a `;` appears outside any
    /// bracket opened during the skip, or until an unmatched closer.
    pub(crate) fn recover(&mut self, targets: TokenSet) -> Recovery {
        // paren, bracket, brace
        let mut depth = [0usize; 3];

        loop {
            let kind = self.peek(0);
            let nested = depth.iter().any(|d| *d > 0);

            let outcome = match kind {
                TokenKind::Eof => Some(Recovery::Eof),
                _ if !nested && targets.contains(kind) => {
                    self.advance();
                    Some(Recovery::Recovered(kind))
                }
                TokenKind::Semicolon if !nested => {
                    self.advance();
                    Some(Recovery::Terminated)
                }
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                    depth[bracket_index(kind)] += 1;
                    None
                }
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    let level = &mut depth[bracket_index(kind)];
                    if *level == 0 {
                        Some(Recovery::Stopped(kind))
                    } else {
                        *level -= 1;
                        None
                    }
                }
                _ => None,
            };

            if let Some(outcome) = outcome {
                trace!(?outcome, %targets, "recovered");
                return outcome;
            }

            let token = self.advance();
            if token.lexeme.is_error() {
                let node = self.ast.alloc(
                    Node::Error {
                        kind: SyntaxError::Lexical(token.lexeme.errors),
                        children: Vec::new(),
                    },
                    token.span(),
                );
                self.skipped.push(node);
            }
        }
    }

    /// Get back in sync after a failed item of a statement-like list
    /// (program items, block statements, struct members). `before` is the
    /// consumed-token count when the item started; if neither the item nor
    /// the recovery consumed anything, one token is skipped so the list
    /// always advances.
    pub(crate) fn recover_statement(&mut self, before: u32, targets: TokenSet) {
        match self.sync {
            SyncState::Clean => {}
            SyncState::Terminated => self.sync = SyncState::Clean,
            SyncState::Panicking => {
                self.recover(targets);
                self.sync = SyncState::Clean;
            }
        }

        let stalled = self.scanner.tokens_consumed() == before;
        if stalled && !matches!(self.peek(0), TokenKind::RBrace | TokenKind::Eof) {
            self.advance();
        }
    }

    /// Get back in sync after a failed item of a comma list closed by `)`.
    pub(crate) fn recover_list(&mut self) -> ListRecovery {
        if self.sync == SyncState::Terminated {
            return ListRecovery::Abort;
        }
        match self.recover(LIST_SEPARATORS) {
            Recovery::Recovered(kind) => {
                self.sync = SyncState::Clean;
                ListRecovery::Continue(kind)
            }
            Recovery::Terminated => {
                self.sync = SyncState::Terminated;
                ListRecovery::Abort
            }
            Recovery::Stopped(_) | Recovery::Eof => {
                self.sync = SyncState::Panicking;
                ListRecovery::Abort
            }
        }
    }

    /// Run `f` with `scope` as the current declaration scope.
    pub(crate) fn in_scope<T>(&mut self, scope: ScopeId, f: impl FnOnce(&mut Self) -> T) -> T {
        let outer = std::mem::replace(&mut self.scope, scope);
        let result = f(self);
        self.scope = outer;
        result
    }
}

fn bracket_index(kind: TokenKind) -> usize {
    match kind {
        TokenKind::LParen | TokenKind::RParen => 0,
        TokenKind::LBracket | TokenKind::RBracket => 1,
        _ => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::scope::{Symbol, SymbolFilter};

    fn with_parser<T>(source: &str, f: impl FnOnce(&mut Parser<'_, '_>) -> T) -> T {
        let mut scopes = ScopeTable::new();
        let mut types = TypeTable::new(&mut scopes);
        let mut parser = Parser::new(source, &mut scopes, &mut types);
        f(&mut parser)
    }

    #[test]
    fn test_parse_simple_function() {
        with_parser("fn main() -> i32 { return 0; }", |parser| {
            let (root, success) = parser.parse_program();
            assert!(success);

            let Node::Program { items, .. } = parser.ast.node(root).clone() else {
                panic!("expected program");
            };
            assert_eq!(items.len(), 1);
            match parser.ast.node(items[0]) {
                Node::FuncDefn { name, header, .. } => {
                    assert_eq!(parser.ast.text(*name), "main");
                    assert!(header.params.is_empty());
                    assert_eq!(header.returns.len(), 1);
                }
                other => panic!("expected function definition, got {:?}", other),
            }
            let found = parser
                .scopes
                .lookup(ScopeId::GLOBAL, "main", SymbolFilter::FUNC, false);
            assert!(matches!(found.as_slice(), [(_, Symbol::Func(_))]));
        });
    }

    #[test]
    fn test_recover_tracks_nesting() {
        with_parser("a (b, c; d) e, f", |parser| {
            assert_eq!(parser.recover(LIST_SEPARATORS), Recovery::Recovered(TokenKind::Comma));
            assert_eq!(parser.peek(0), TokenKind::Identifier);
            assert_eq!(parser.advance().text(), "f");
        });
    }

    #[test]
    fn test_recover_stops_at_unmatched_closer() {
        with_parser("a b } c", |parser| {
            assert_eq!(
                parser.recover(TokenSet::EMPTY),
                Recovery::Stopped(TokenKind::RBrace)
            );
            assert_eq!(parser.peek(0), TokenKind::RBrace);
        });
    }

    #[test]
    fn test_recover_terminates_at_semicolon() {
        with_parser("a [;] b; c", |parser| {
            assert_eq!(parser.recover(LIST_SEPARATORS), Recovery::Terminated);
            assert_eq!(parser.advance().text(), "c");
        });
        with_parser("a b", |parser| {
            assert_eq!(parser.recover(LIST_SEPARATORS), Recovery::Eof);
        });
    }

    #[test]
    fn test_stray_closers_at_top_level_are_consumed() {
        with_parser(") ] } var x i32;", |parser| {
            let (root, success) = parser.parse_program();
            assert!(!success);
            assert_eq!(parser.ast.syntax_errors(root).len(), 3);
            assert!(parser
                .scopes
                .lookup_first(ScopeId::GLOBAL, "x", SymbolFilter::VAR, false)
                .is_some());
        });
    }
}
