//! Statement parsing implementation
//!
//! This module handles parsing of all statement types:
//!
//! - Declarations: `var`, `struct` and named `fn` (see `declarations`)
//! - Control flow: `if`/`else`, `while`
//! - Jump statements: `return`, `break`, `continue`
//! - Compound statements: `{ ... }`
//! - Expression statements and assignments: `f(x);`, `a += 1;`
//!
//! # Grammar
//!
//! ```text
//! statement ::= var_decl ";" | struct_defn | func_defn | block
//!             | if_stmt | while_stmt | return_stmt
//!             | break_stmt | continue_stmt | expr [ assign_op expr ] ";"
//! body      ::= block | "do" simple_stmt
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::diagnostics::SyntaxError;
use crate::parser::ast::{AssignOp, Node, NodeId};
use crate::parser::parse::{Parser, SyncState, EXPRESSION_START, STATEMENT_START};
use crate::parser::token::{TokenKind, TokenSet};
use crate::symbols::scope::{ScopeId, ScopeKind};

impl<'src, 'ctx> Parser<'src, 'ctx> {
    /// Parse one program item. Only declarations are allowed here.
    pub(crate) fn parse_top_level(&mut self) -> NodeId {
        let start = self.start();

        match self.peek(0) {
            TokenKind::Var => self.parse_var_statement(),
            TokenKind::Struct => self.parse_struct(),
            TokenKind::Fn if self.peek(1) == TokenKind::Identifier => self.parse_function(),
            kind if STATEMENT_START.contains(kind) => {
                let statement = self.parse_statement();
                if self.is_error(statement) {
                    return statement;
                }
                let node =
                    self.error(SyntaxError::IllegalTopLevelStatement, start, vec![statement]);
                self.sync = SyncState::Clean;
                node
            }
            _ => {
                let err = self.unexpected(TokenSet::of(&[
                    TokenKind::Var,
                    TokenKind::Struct,
                    TokenKind::Fn,
                ]));
                self.advance();
                self.error_consumed(err, start)
            }
        }
    }

    /// Parse a statement inside a block.
    pub(crate) fn parse_statement(&mut self) -> NodeId {
        let start = self.start();

        match self.peek(0) {
            TokenKind::Var => self.parse_var_statement(),
            TokenKind::Struct => self.parse_struct(),
            TokenKind::Fn if self.peek(1) == TokenKind::Identifier => self.parse_function(),
            TokenKind::LBrace => self.parse_block(None),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => self.parse_jump(Node::Break),
            TokenKind::Continue => self.parse_jump(Node::Continue),
            kind if STATEMENT_START.contains(kind) => self.parse_expression_statement(),
            TokenKind::RBrace | TokenKind::Eof => {
                let err = self.unexpected(STATEMENT_START);
                self.error(err, start, Vec::new())
            }
            _ => {
                let err = self.unexpected(STATEMENT_START);
                self.advance();
                self.error_consumed(err, start)
            }
        }
    }

    /// Parse `{ statements }`. Without `scope` a fresh block scope is
    /// pushed; function bodies pass the scope holding their parameters.
    pub(crate) fn parse_block(&mut self, scope: Option<ScopeId>) -> NodeId {
        let start = self.start();
        if let Err(err) = self.expect(TokenKind::LBrace) {
            return self.error(err, start, Vec::new());
        }

        let scope = scope.unwrap_or_else(|| self.scopes.push(ScopeKind::CodeBlock, self.scope));
        let statements = self.in_scope(scope, |parser| {
            let mut statements = Vec::new();
            while !parser.check(TokenKind::RBrace) && !parser.check(TokenKind::Eof) {
                let before = parser.scanner.tokens_consumed();
                let statement = parser.parse_statement();
                let failed = parser.is_error(statement);
                statements.push(statement);
                if failed {
                    parser.recover_statement(before, TokenSet::EMPTY);
                }
            }
            statements
        });

        if let Err(err) = self.expect(TokenKind::RBrace) {
            return self.error(err, start, statements);
        }
        self.finish_node(Node::Block { statements, scope }, start)
    }

    /// Body of `if` and `while`: a block, or `do` and one simple statement.
    fn parse_body(&mut self) -> NodeId {
        let start = self.start();
        match self.peek(0) {
            TokenKind::LBrace => self.parse_block(None),
            TokenKind::Do => {
                self.advance();
                let simple = match self.peek(0) {
                    TokenKind::Return | TokenKind::Break | TokenKind::Continue => true,
                    TokenKind::Fn => self.peek(1) != TokenKind::Identifier,
                    kind => EXPRESSION_START.contains(kind),
                };
                if simple {
                    return self.parse_statement();
                }
                // declarations here must not bind into the enclosing scope
                let detached = self.scopes.push(ScopeKind::CodeBlock, self.scope);
                let statement = self.in_scope(detached, |parser| parser.parse_statement());
                if self.is_error(statement) {
                    return statement;
                }
                let node = self.error(SyntaxError::IllegalDoStatement, start, vec![statement]);
                self.sync = SyncState::Clean;
                node
            }
            _ => {
                let err = self.unexpected(TokenSet::of(&[TokenKind::LBrace, TokenKind::Do]));
                self.error(err, start, Vec::new())
            }
        }
    }

    /// Parse `if expr body [else (if ... | body)]`
    fn parse_if(&mut self) -> NodeId {
        let start = self.start();
        self.advance(); // 'if'

        let condition = self.parse_expression();
        if self.is_error(condition) {
            return self.bubble(start, vec![condition]);
        }
        let then_branch = self.parse_body();
        if self.is_error(then_branch) {
            return self.bubble(start, vec![condition, then_branch]);
        }

        let else_branch = if self.eat(TokenKind::Else).is_some() {
            let branch = if self.check(TokenKind::If) {
                self.parse_if()
            } else {
                self.parse_body()
            };
            if self.is_error(branch) {
                return self.bubble(start, vec![condition, then_branch, branch]);
            }
            Some(branch)
        } else {
            None
        };

        self.finish_node(
            Node::If {
                condition,
                then_branch,
                else_branch,
            },
            start,
        )
    }

    /// Parse `while expr body`
    fn parse_while(&mut self) -> NodeId {
        let start = self.start();
        self.advance(); // 'while'

        let condition = self.parse_expression();
        if self.is_error(condition) {
            return self.bubble(start, vec![condition]);
        }
        let body = self.parse_body();
        if self.is_error(body) {
            return self.bubble(start, vec![condition, body]);
        }
        self.finish_node(Node::While { condition, body }, start)
    }

    /// Parse `return [expr {, expr}] ;`
    fn parse_return(&mut self) -> NodeId {
        let start = self.start();
        self.advance(); // 'return'

        let mut values = Vec::new();
        if !self.check(TokenKind::Semicolon) {
            loop {
                let value = self.parse_expression();
                let failed = self.is_error(value);
                values.push(value);
                if failed {
                    return self.bubble(start, values);
                }
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }

        match self.expect(TokenKind::Semicolon) {
            Ok(_) => self.finish_node(Node::Return { values }, start),
            Err(err) => self.error(err, start, values),
        }
    }

    /// Parse `break ;` or `continue ;`
    fn parse_jump(&mut self, node: Node) -> NodeId {
        let start = self.start();
        self.advance();
        match self.expect(TokenKind::Semicolon) {
            Ok(_) => self.finish_node(node, start),
            Err(err) => self.error(err, start, Vec::new()),
        }
    }

    /// Parse `expr [assign_op expr] ;`
    fn parse_expression_statement(&mut self) -> NodeId {
        let start = self.start();

        let expr = self.parse_expression();
        if self.is_error(expr) {
            return self.bubble(start, vec![expr]);
        }

        let node = match assign_op(self.peek(0)) {
            Some(op) => {
                self.advance();
                let value = self.parse_expression();
                if self.is_error(value) {
                    return self.bubble(start, vec![expr, value]);
                }
                if assign_op(self.peek(0)).is_some() {
                    self.advance();
                    return self.error(SyntaxError::ChainedAssignment, start, vec![expr, value]);
                }
                Node::Assign {
                    op,
                    target: expr,
                    value,
                }
            }
            None => Node::ExprStmt { expr },
        };

        match self.expect(TokenKind::Semicolon) {
            Ok(_) => self.finish_node(node, start),
            Err(err) => {
                let children = node.children().to_vec();
                self.error(err, start, children)
            }
        }
    }
}

fn assign_op(kind: TokenKind) -> Option<AssignOp> {
    match kind {
        TokenKind::Eq => Some(AssignOp::Assign),
        TokenKind::PlusEq => Some(AssignOp::Add),
        TokenKind::MinusEq => Some(AssignOp::Sub),
        TokenKind::StarEq => Some(AssignOp::Mul),
        TokenKind::SlashEq => Some(AssignOp::Div),
        TokenKind::PercentEq => Some(AssignOp::Rem),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::diagnostics::SyntaxError;
    use crate::parser::ast::{Node, NodeId};
    use crate::parser::parse::Parser;
    use crate::symbols::scope::ScopeTable;
    use crate::symbols::types::TypeTable;

    /// Parse `source` as a program and return its syntax errors.
    fn errors(source: &str) -> Vec<SyntaxError> {
        let mut scopes = ScopeTable::new();
        let mut types = TypeTable::new(&mut scopes);
        let mut parser = Parser::new(source, &mut scopes, &mut types);
        let (root, _) = parser.parse_program();
        parser
            .ast
            .syntax_errors(root)
            .into_iter()
            .map(|(_, error)| error)
            .collect()
    }

    fn body_of_main(source: &str, f: impl FnOnce(&Parser<'_, '_>, &[NodeId])) {
        let mut scopes = ScopeTable::new();
        let mut types = TypeTable::new(&mut scopes);
        let mut parser = Parser::new(source, &mut scopes, &mut types);
        let (root, success) = parser.parse_program();
        assert!(success, "{:?}", parser.ast.syntax_errors(root));

        let Node::Program { items, .. } = parser.ast.node(root) else {
            panic!("expected program");
        };
        let Node::FuncDefn { body, .. } = parser.ast.node(items[0]) else {
            panic!("expected function");
        };
        let Node::Block { statements, .. } = parser.ast.node(*body) else {
            panic!("expected block");
        };
        f(&parser, statements);
    }

    #[test]
    fn test_control_flow() {
        body_of_main(
            "fn main() {
                var i i32 = 0;
                while i < 10 do i += 1;
                if i == 10 { return; } else if i > 10 do break; else { continue; }
            }",
            |parser, statements| {
                assert_eq!(statements.len(), 3);
                assert!(matches!(parser.ast.node(statements[1]), Node::While { .. }));
                let Node::If { else_branch, .. } = parser.ast.node(statements[2]) else {
                    panic!("expected if");
                };
                let else_branch = else_branch.expect("else branch");
                assert!(matches!(parser.ast.node(else_branch), Node::If { .. }));
            },
        );
    }

    #[test]
    fn test_return_multiple_values() {
        body_of_main("fn main() { return 1, 2; }", |parser, statements| {
            let Node::Return { values } = parser.ast.node(statements[0]) else {
                panic!("expected return");
            };
            assert_eq!(values.len(), 2);
        });
    }

    #[test]
    fn test_chained_assignment() {
        assert_eq!(
            errors("fn main() { a = b = c; var ok i32; }"),
            vec![SyntaxError::ChainedAssignment]
        );
    }

    #[test]
    fn test_illegal_do_statement() {
        assert_eq!(
            errors("fn main() { if true do var x i32; }"),
            vec![SyntaxError::IllegalDoStatement]
        );
        assert_eq!(
            errors("fn main() { while true do { } }"),
            vec![SyntaxError::IllegalDoStatement]
        );
    }

    #[test]
    fn test_illegal_top_level_statement() {
        assert_eq!(
            errors("x = 1; fn main() {}"),
            vec![SyntaxError::IllegalTopLevelStatement]
        );
    }

    #[test]
    fn test_missing_semicolon_reports_once() {
        let found = errors("fn main() { var a i32 = 1 var b i32; b = 2; }");
        assert_eq!(found.len(), 1);
        assert!(matches!(found[0], SyntaxError::Expected { .. }));
    }

    #[test]
    fn test_stray_closer_inside_block() {
        let found = errors("fn main() { ) var a i32; } fn other() {}");
        assert_eq!(found.len(), 1);
    }
}
