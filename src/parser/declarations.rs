//! Declaration parsing implementation
//!
//! This module handles parsing of declarations and the type grammar:
//!
//! - Variables: `var x i32 = 1;`
//! - Structs: `struct Point { x i32; y i32 = 0; }`
//! - Functions: `fn add(a i32, b i32 = 1) -> i32 { ... }`
//! - Types: `i32`, `^Point`, `[4]^u8`, `fn(i32) -> bool`
//!
//! Declarations register their symbol in the current scope as soon as
//! their node exists, so later code can find them without a separate
//! collection pass.
//!
//! # Function Headers
//!
//! The parameter-list grammar is shared by four contexts, selected with
//! [`HeaderMode`]: named definitions, function literals, function types
//! and function symbols by signature (`fn(name = i32, bool)`).
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use smallvec::SmallVec;

use crate::diagnostics::SyntaxError;
use crate::parser::ast::{FuncHeader, Node, NodeId, SymbolRef, TokenRef};
use crate::parser::parse::{ListRecovery, Parser};
use crate::parser::token::{Span, TokenKind, TokenSet};
use crate::symbols::scope::{ScopeKind, Symbol};
use crate::symbols::types::{PendingId, PendingModifier};

/// Tokens that can begin a type.
pub(crate) const TYPE_START: TokenSet = TokenSet::of(&[
    TokenKind::Identifier,
    TokenKind::LBracket,
    TokenKind::Caret,
    TokenKind::Fn,
]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeaderMode {
    /// `fn name(params) -> returns { ... }`
    Definition,
    /// `fn(params) -> returns { ... }` in expression position
    Literal,
    /// `fn(types) -> returns` in type position
    TypeSignature,
    /// `fn(name = types) -> returns` in expression position
    SymbolSignature,
}

impl HeaderMode {
    /// Whether parameters become `VarDecl` nodes.
    fn declares(self) -> bool {
        matches!(self, HeaderMode::Definition | HeaderMode::Literal)
    }
}

/// A parsed function header.
pub(crate) struct Header {
    /// Referenced name, only for [`HeaderMode::SymbolSignature`]
    pub name: Option<TokenRef>,
    pub params: Vec<NodeId>,
    pub returns: Vec<NodeId>,
    /// Pending type of the whole function
    pub pending: PendingId,
}

/// One parsed parameter or return value.
struct Param {
    decl: Option<NodeId>,
    pending: PendingId,
}

impl<'src, 'ctx> Parser<'src, 'ctx> {
    /// Parse `var IDENT type [= expr] ;`
    pub(crate) fn parse_var_statement(&mut self) -> NodeId {
        let start = self.start();
        self.advance(); // 'var'

        let name = match self.expect(TokenKind::Identifier) {
            Ok(token) => self.ast.claim(token),
            Err(err) => return self.error(err, start, Vec::new()),
        };
        let decl = match self.parse_var_rest(start, name) {
            Ok(decl) => decl,
            Err(failed) => return failed,
        };

        match self.expect(TokenKind::Semicolon) {
            Ok(_) => decl,
            Err(err) => self.error(err, start, vec![decl]),
        }
    }

    /// Type and initializer of a named declaration; defines the symbol.
    fn parse_var_rest(&mut self, start: u32, name: TokenRef) -> Result<NodeId, NodeId> {
        let pending = match self.parse_type() {
            Ok(pending) => pending,
            Err(failed) => return Err(self.bubble(start, vec![failed])),
        };

        let init = if self.eat(TokenKind::Eq).is_some() {
            let value = self.parse_expression();
            if self.is_error(value) {
                return Err(self.bubble(start, vec![value]));
            }
            Some(value)
        } else {
            None
        };

        let ty = self.types.slot_for(pending);
        let decl = self.finish_node(
            Node::VarDecl {
                name: Some(name),
                ty,
                init,
                scope: self.scope,
            },
            start,
        );
        self.scopes
            .define(self.scope, self.ast.text(name), Symbol::Var(decl));
        Ok(decl)
    }

    /// Parse `struct IDENT { members }`
    pub(crate) fn parse_struct(&mut self) -> NodeId {
        let start = self.start();
        self.advance(); // 'struct'

        let name = match self.expect(TokenKind::Identifier) {
            Ok(token) => self.ast.claim(token),
            Err(err) => return self.error(err, start, Vec::new()),
        };
        if let Err(err) = self.expect(TokenKind::LBrace) {
            return self.error(err, start, Vec::new());
        }

        let scope = self.scopes.push(ScopeKind::Struct, self.scope);
        let members = self.in_scope(scope, |parser| {
            let mut members = Vec::new();
            while !parser.check(TokenKind::RBrace) && !parser.check(TokenKind::Eof) {
                let before = parser.scanner.tokens_consumed();
                let member = parser.parse_member();
                let failed = parser.is_error(member);
                members.push(member);
                if failed {
                    parser.recover_statement(before, TokenSet::of(&[TokenKind::Semicolon]));
                }
            }
            members
        });

        if let Err(err) = self.expect(TokenKind::RBrace) {
            return self.error(err, start, members);
        }

        let node = self.finish_node(
            Node::StructDefn {
                name,
                members,
                scope,
            },
            start,
        );
        self.scopes
            .define(self.scope, self.ast.text(name), Symbol::Struct(node));
        node
    }

    /// Parse struct member `IDENT type [= expr] ;`
    fn parse_member(&mut self) -> NodeId {
        let start = self.start();

        let name = match self.expect(TokenKind::Identifier) {
            Ok(token) => self.ast.claim(token),
            Err(err) => return self.error(err, start, Vec::new()),
        };
        let decl = match self.parse_var_rest(start, name) {
            Ok(decl) => decl,
            Err(failed) => return failed,
        };

        match self.expect(TokenKind::Semicolon) {
            Ok(_) => decl,
            Err(err) => self.error(err, start, vec![decl]),
        }
    }

    /// Parse `fn IDENT header block`
    pub(crate) fn parse_function(&mut self) -> NodeId {
        let start = self.start();
        self.advance(); // 'fn'

        let name = match self.expect(TokenKind::Identifier) {
            Ok(token) => self.ast.claim(token),
            Err(err) => return self.error(err, start, Vec::new()),
        };

        let scope = self.scopes.push(ScopeKind::CodeBlock, self.scope);
        let parsed = self.in_scope(scope, |parser| {
            let header = parser.parse_func_header(HeaderMode::Definition, start, SmallVec::new())?;
            let body = parser.parse_block(Some(scope));
            if parser.is_error(body) {
                let mut children = header.params;
                children.extend(header.returns);
                children.push(body);
                return Err(parser.bubble(start, children));
            }
            Ok((header, body))
        });
        let (header, body) = match parsed {
            Ok(parsed) => parsed,
            Err(failed) => return failed,
        };

        let ty = self.types.slot_for(header.pending);
        let node = self.finish_node(
            Node::FuncDefn {
                name,
                header: FuncHeader {
                    params: header.params,
                    returns: header.returns,
                    scope,
                    ty,
                },
                body,
            },
            start,
        );
        self.scopes
            .define(self.scope, self.ast.text(name), Symbol::Func(node));
        node
    }

    /// Parse `fn header block` in expression position.
    pub(crate) fn parse_function_literal(&mut self) -> NodeId {
        let start = self.start();
        self.advance(); // 'fn'

        let scope = self.scopes.push(ScopeKind::CodeBlock, self.scope);
        let parsed = self.in_scope(scope, |parser| {
            let header = parser.parse_func_header(HeaderMode::Literal, start, SmallVec::new())?;
            let body = parser.parse_block(Some(scope));
            if parser.is_error(body) {
                let mut children = header.params;
                children.extend(header.returns);
                children.push(body);
                return Err(parser.bubble(start, children));
            }
            Ok((header, body))
        });
        let (header, body) = match parsed {
            Ok(parsed) => parsed,
            Err(failed) => return failed,
        };

        let ty = self.types.slot_for(header.pending);
        self.finish_node(
            Node::FuncLiteral {
                header: FuncHeader {
                    params: header.params,
                    returns: header.returns,
                    scope,
                    ty,
                },
                body,
            },
            start,
        )
    }

    /// Parse `fn(name = types) -> returns` in expression position.
    pub(crate) fn parse_function_symbol(&mut self) -> NodeId {
        let start = self.start();
        self.advance(); // 'fn'

        let parsed = self.parse_func_header(HeaderMode::SymbolSignature, start, SmallVec::new());
        let header = match parsed {
            Ok(header) => header,
            Err(failed) => return failed,
        };
        let Some(name) = header.name else {
            return self.error(
                SyntaxError::Internal("symbol signature without a name"),
                start,
                Vec::new(),
            );
        };

        let signature = self.types.slot_for(header.pending);
        self.finish_node(
            Node::Symbol {
                name,
                scope: self.scope,
                signature: Some(signature),
                state: SymbolRef::unresolved(),
            },
            start,
        )
    }

    /// Parse a function header after the `fn` keyword (and name, for
    /// definitions): `( params ) [ -> returns ]`. `start` is the offset of
    /// the enclosing construct, `modifiers` apply to the function type.
    pub(crate) fn parse_func_header(
        &mut self,
        mode: HeaderMode,
        start: u32,
        modifiers: SmallVec<[PendingModifier; 2]>,
    ) -> Result<Header, NodeId> {
        if let Err(err) = self.expect(TokenKind::LParen) {
            return Err(self.error(err, start, Vec::new()));
        }

        let mut name = None;
        if mode == HeaderMode::SymbolSignature {
            name = match self.expect(TokenKind::Identifier) {
                Ok(token) => Some(self.ast.claim(token)),
                Err(err) => return Err(self.error(err, start, Vec::new())),
            };
            if let Err(err) = self.expect(TokenKind::Eq) {
                return Err(self.error(err, start, Vec::new()));
            }
        }

        let (params, param_types) = self.parse_param_list(mode, start, true)?;

        let (returns, return_types) = if self.eat(TokenKind::Arrow).is_some() {
            if self.eat(TokenKind::LParen).is_some() {
                match self.parse_param_list(mode, start, false) {
                    Ok(parsed) => parsed,
                    Err(failed) => return Err(self.bubble(start, with(params, failed))),
                }
            } else {
                match self.parse_param(mode, false) {
                    Ok(param) => (param.decl.into_iter().collect(), vec![param.pending]),
                    Err(failed) => return Err(self.bubble(start, with(params, failed))),
                }
            }
        } else {
            (Vec::new(), Vec::new())
        };

        let span = self.span_from(start);
        let pending = self.types.register_pending_func_type(
            self.scope,
            modifiers,
            param_types,
            return_types,
            span,
        );

        Ok(Header {
            name,
            params,
            returns,
            pending,
        })
    }

    /// Comma separated parameters up to and including the closing `)`.
    /// The opening `(` (and for symbol signatures, `name =`) has been
    /// consumed.
    fn parse_param_list(
        &mut self,
        mode: HeaderMode,
        start: u32,
        define: bool,
    ) -> Result<(Vec<NodeId>, Vec<PendingId>), NodeId> {
        let mut decls = Vec::new();
        let mut pendings = Vec::new();

        if self.eat(TokenKind::RParen).is_some() {
            return Ok((decls, pendings));
        }

        loop {
            let failed = match self.parse_param(mode, define) {
                Ok(param) => {
                    decls.extend(param.decl);
                    pendings.push(param.pending);
                    if self.eat(TokenKind::Comma).is_some() {
                        continue;
                    }
                    if self.eat(TokenKind::RParen).is_some() {
                        return Ok((decls, pendings));
                    }
                    let err = self.unexpected(crate::parser::parse::LIST_SEPARATORS);
                    let at = self.start();
                    self.error(err, at, Vec::new())
                }
                Err(failed) => failed,
            };

            decls.push(failed);
            match self.recover_list() {
                ListRecovery::Continue(TokenKind::Comma) => continue,
                ListRecovery::Continue(_) => return Ok((decls, pendings)),
                ListRecovery::Abort => return Err(self.bubble(start, decls)),
            }
        }
    }

    /// Parse `[IDENT] type [= expr]`. Only definitions accept a default
    /// value; elsewhere a `=` is left for the caller to reject.
    fn parse_param(&mut self, mode: HeaderMode, define: bool) -> Result<Param, NodeId> {
        let start = self.start();

        let named = mode != HeaderMode::SymbolSignature
            && self.check(TokenKind::Identifier)
            && TYPE_START.contains(self.peek(1));
        let name = if named {
            let token = self.advance();
            Some(self.ast.claim(token))
        } else {
            None
        };

        let pending = match self.parse_type() {
            Ok(pending) => pending,
            Err(failed) => return Err(self.bubble(start, vec![failed])),
        };

        let mut init = None;
        if mode == HeaderMode::Definition && self.eat(TokenKind::Eq).is_some() {
            let value = self.parse_expression();
            if self.is_error(value) {
                return Err(self.bubble(start, vec![value]));
            }
            if name.is_none() {
                return Err(self.error(SyntaxError::IllegalUnnamedInitializer, start, vec![value]));
            }
            init = Some(value);
        }

        if !mode.declares() {
            return Ok(Param {
                decl: None,
                pending,
            });
        }

        let ty = self.types.slot_for(pending);
        let decl = self.finish_node(
            Node::VarDecl {
                name,
                ty,
                init,
                scope: self.scope,
            },
            start,
        );
        if let (Some(name), true) = (name, define) {
            self.scopes
                .define(self.scope, self.ast.text(name), Symbol::Var(decl));
        }

        Ok(Param {
            decl: Some(decl),
            pending,
        })
    }

    /// Parse `{ "^" | "[" [expr] "]" } ( IDENT | "fn" header )` and register
    /// it as a pending type in the current scope.
    pub(crate) fn parse_type(&mut self) -> Result<PendingId, NodeId> {
        let start = self.start();
        let mut modifiers: SmallVec<[PendingModifier; 2]> = SmallVec::new();

        loop {
            match self.peek(0) {
                TokenKind::Caret => {
                    self.advance();
                    modifiers.push(PendingModifier::Pointer);
                }
                TokenKind::LBracket => {
                    self.advance();
                    if self.eat(TokenKind::RBracket).is_some() {
                        modifiers.push(PendingModifier::Array(None));
                        continue;
                    }
                    let length = self.parse_expression();
                    if self.is_error(length) {
                        return Err(self.bubble(start, vec![length]));
                    }
                    if let Err(err) = self.expect(TokenKind::RBracket) {
                        return Err(self.error(err, start, vec![length]));
                    }
                    modifiers.push(PendingModifier::Array(Some(length)));
                }
                _ => break,
            }
        }

        match self.peek(0) {
            TokenKind::Identifier => {
                let token = self.advance();
                let span = Span {
                    start,
                    end: token.span().end,
                };
                Ok(self.types.register_pending_non_func_type(
                    self.scope,
                    token.text(),
                    modifiers,
                    span,
                ))
            }
            TokenKind::Fn => {
                self.advance();
                let header = self.parse_func_header(HeaderMode::TypeSignature, start, modifiers)?;
                Ok(header.pending)
            }
            _ => {
                let err = self.unexpected(TYPE_START);
                Err(self.error(err, start, Vec::new()))
            }
        }
    }
}

fn with(mut nodes: Vec<NodeId>, node: NodeId) -> Vec<NodeId> {
    nodes.push(node);
    nodes
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::Node;
    use crate::parser::parse::Parser;
    use crate::symbols::scope::{ScopeId, ScopeTable, Symbol, SymbolFilter};
    use crate::symbols::types::TypeTable;

    #[test]
    fn test_parse_struct() {
        let mut scopes = ScopeTable::new();
        let mut types = TypeTable::new(&mut scopes);
        let mut parser = Parser::new("struct Point { x i32; y i32 = 0; }", &mut scopes, &mut types);
        let (_, success) = parser.parse_program();
        assert!(success);

        let (ast, _) = parser.finish();
        let found = scopes.lookup_first(ScopeId::GLOBAL, "Point", SymbolFilter::TYPE, false);
        let Some((_, Symbol::Struct(node))) = found else {
            panic!("struct not registered");
        };
        match ast.node(node) {
            Node::StructDefn { members, scope, .. } => {
                assert_eq!(members.len(), 2);
                assert_eq!(scopes.get(*scope).bindings("x").len(), 1);
                assert_eq!(scopes.get(*scope).bindings("y").len(), 1);
            }
            other => panic!("expected struct, got {:?}", other),
        }
        // members are not visible outside the struct
        assert!(scopes
            .lookup_first(ScopeId::GLOBAL, "x", SymbolFilter::VAR, true)
            .is_none());
    }

    #[test]
    fn test_unnamed_parameter_with_default_is_rejected() {
        let mut scopes = ScopeTable::new();
        let mut types = TypeTable::new(&mut scopes);
        let mut parser = Parser::new("fn f(i32 = 1) {}", &mut scopes, &mut types);
        let (root, success) = parser.parse_program();
        assert!(!success);
        let errors = parser.ast.syntax_errors(root);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].1,
            crate::diagnostics::SyntaxError::IllegalUnnamedInitializer
        );
    }

    #[test]
    fn test_parameters_are_defined_in_function_scope() {
        let mut scopes = ScopeTable::new();
        let mut types = TypeTable::new(&mut scopes);
        let mut parser = Parser::new(
            "fn f(a i32, b ^[3]i32, fn(i32) -> bool) -> (i32, bool) {}",
            &mut scopes,
            &mut types,
        );
        let (root, success) = parser.parse_program();
        assert!(success, "{:?}", parser.ast.syntax_errors(root));
        let (ast, _) = parser.finish();

        let Some((_, Symbol::Func(func))) =
            scopes.lookup_first(ScopeId::GLOBAL, "f", SymbolFilter::FUNC, false)
        else {
            panic!("function not registered");
        };
        let Node::FuncDefn { header, .. } = ast.node(func) else {
            panic!("expected function");
        };
        assert_eq!(header.params.len(), 3);
        assert_eq!(header.returns.len(), 2);
        assert!(scopes
            .lookup_first(header.scope, "a", SymbolFilter::VAR, false)
            .is_some());
        assert!(scopes
            .lookup_first(header.scope, "b", SymbolFilter::VAR, false)
            .is_some());
    }
}
