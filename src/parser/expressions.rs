//! Expression parsing implementation
//!
//! This module handles parsing of all expression types using precedence climbing:
//!
//! - Binary operators: arithmetic, comparison, bitwise and `#and`/`#or`/`#xor`
//! - Unary operators: `+`, `-`, `!`, `^` (address-of) and `@` (dereference)
//! - Postfix operations: member access, `@`, subscripts and calls
//! - Primary expressions: literals, names, groups and function expressions
//!
//! # Operator Precedence (lowest to highest)
//!
//! 1. Logical OR/XOR (`#or`, `#xor`)
//! 2. Logical AND (`#and`)
//! 3. Bitwise OR (`|`)
//! 4. Bitwise XOR (`^`)
//! 5. Bitwise AND (`&`)
//! 6. Equality (`==`, `!=`)
//! 7. Relational (`<`, `<=`, `>`, `>=`)
//! 8. Additive (`+`, `-`)
//! 9. Multiplicative (`*`, `/`, `%`)
//! 10. Unary (prefix operators)
//! 11. Postfix (`.`, `@`, `[]`, `()`)
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use tracing::trace;

use crate::diagnostics::SyntaxError;
use crate::parser::ast::{BinaryOp, Node, NodeId, SymbolRef, UnaryOp};
use crate::parser::parse::{ListRecovery, Parser, LIST_SEPARATORS};
use crate::parser::token::TokenKind;

/// Binary operator tiers, loosest first.
const TIERS: &[&[(TokenKind, BinaryOp)]] = &[
    &[(TokenKind::HashOr, BinaryOp::Or), (TokenKind::HashXor, BinaryOp::Xor)],
    &[(TokenKind::HashAnd, BinaryOp::And)],
    &[(TokenKind::Pipe, BinaryOp::BitOr)],
    &[(TokenKind::Caret, BinaryOp::BitXor)],
    &[(TokenKind::Amp, BinaryOp::BitAnd)],
    &[(TokenKind::EqEq, BinaryOp::Eq), (TokenKind::BangEq, BinaryOp::Ne)],
    &[
        (TokenKind::Lt, BinaryOp::Lt),
        (TokenKind::LtEq, BinaryOp::Le),
        (TokenKind::Gt, BinaryOp::Gt),
        (TokenKind::GtEq, BinaryOp::Ge),
    ],
    &[(TokenKind::Plus, BinaryOp::Add), (TokenKind::Minus, BinaryOp::Sub)],
    &[
        (TokenKind::Star, BinaryOp::Mul),
        (TokenKind::Slash, BinaryOp::Div),
        (TokenKind::Percent, BinaryOp::Rem),
    ],
];

impl<'src, 'ctx> Parser<'src, 'ctx> {
    pub(crate) fn parse_expression(&mut self) -> NodeId {
        self.parse_binary(0)
    }

    /// Left-associative binary operators of `tier` and tighter.
    fn parse_binary(&mut self, tier: usize) -> NodeId {
        let Some(operators) = TIERS.get(tier) else {
            return self.parse_unary();
        };

        let start = self.start();
        let mut left = self.parse_binary(tier + 1);
        if self.is_error(left) {
            return left;
        }

        loop {
            let kind = self.peek(0);
            let Some(&(_, op)) = operators.iter().find(|(token, _)| *token == kind) else {
                return left;
            };
            self.advance();

            let right = self.parse_binary(tier + 1);
            if self.is_error(right) {
                return self.bubble(start, vec![left, right]);
            }
            left = self.finish_node(Node::Binary { op, left, right }, start);
        }
    }

    fn parse_unary(&mut self) -> NodeId {
        let start = self.start();
        let op = match self.peek(0) {
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Negate),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Caret => Some(UnaryOp::AddressOf),
            TokenKind::At => None,
            _ => return self.parse_postfix(),
        };
        self.advance();

        let operand = self.parse_unary();
        if self.is_error(operand) {
            return self.bubble(start, vec![operand]);
        }

        let node = match op {
            Some(op) => Node::Unary { op, operand },
            None => Node::Deref { operand },
        };
        self.finish_node(node, start)
    }

    fn parse_postfix(&mut self) -> NodeId {
        let start = self.start();
        let mut expr = self.parse_primary();
        if self.is_error(expr) {
            return expr;
        }

        loop {
            match self.peek(0) {
                TokenKind::Dot => {
                    self.advance();
                    let name = match self.expect(TokenKind::Identifier) {
                        Ok(token) => self.ast.claim(token),
                        Err(err) => return self.error(err, start, vec![expr]),
                    };
                    expr = self.finish_node(
                        Node::Member {
                            owner: expr,
                            name,
                            state: SymbolRef::unresolved(),
                        },
                        start,
                    );
                }
                TokenKind::At => {
                    self.advance();
                    expr = self.finish_node(Node::Deref { operand: expr }, start);
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expression();
                    if self.is_error(index) {
                        return self.bubble(start, vec![expr, index]);
                    }
                    if let Err(err) = self.expect(TokenKind::RBracket) {
                        return self.error(err, start, vec![expr, index]);
                    }
                    expr = self.finish_node(Node::Subscript { array: expr, index }, start);
                }
                TokenKind::LParen => {
                    if matches!(self.ast.node(expr), Node::FuncLiteral { .. }) {
                        return self.error(SyntaxError::InvokedFunctionLiteral, start, vec![expr]);
                    }
                    expr = self.parse_call(start, expr);
                    if self.is_error(expr) {
                        return expr;
                    }
                }
                _ => return expr,
            }
        }
    }

    /// Parse `( args )` after `callee`.
    fn parse_call(&mut self, start: u32, callee: NodeId) -> NodeId {
        self.advance(); // '('

        let mut args = Vec::new();
        let mut closed = self.eat(TokenKind::RParen).is_some();

        while !closed {
            let arg = self.parse_expression();
            let failed = if self.is_error(arg) {
                Some(arg)
            } else {
                args.push(arg);
                if self.eat(TokenKind::Comma).is_some() {
                    continue;
                }
                if self.eat(TokenKind::RParen).is_some() {
                    closed = true;
                    continue;
                }
                let err = self.unexpected(LIST_SEPARATORS);
                let at = self.start();
                Some(self.error(err, at, Vec::new()))
            };

            args.extend(failed);
            match self.recover_list() {
                ListRecovery::Continue(TokenKind::Comma) => {}
                ListRecovery::Continue(_) => closed = true,
                ListRecovery::Abort => {
                    let mut children = vec![callee];
                    children.extend(args);
                    return self.bubble(start, children);
                }
            }
        }

        self.finish_node(Node::Call { callee, args }, start)
    }

    fn parse_primary(&mut self) -> NodeId {
        let start = self.start();

        match self.peek(0) {
            TokenKind::IntLiteral
            | TokenKind::FloatLiteral
            | TokenKind::BoolLiteral
            | TokenKind::StringLiteral => {
                let token = self.advance();
                let token = self.ast.claim(token);
                self.finish_node(Node::Literal { token }, start)
            }
            TokenKind::Identifier => {
                let token = self.advance();
                let name = self.ast.claim(token);
                self.finish_node(
                    Node::Symbol {
                        name,
                        scope: self.scope,
                        signature: None,
                        state: SymbolRef::unresolved(),
                    },
                    start,
                )
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression();
                if self.is_error(inner) {
                    return self.bubble(start, vec![inner]);
                }
                if let Err(err) = self.expect(TokenKind::RParen) {
                    return self.error(err, start, vec![inner]);
                }
                self.finish_node(Node::Group { inner }, start)
            }
            TokenKind::Fn => {
                if self.is_function_symbol() {
                    self.parse_function_symbol()
                } else {
                    self.parse_function_literal()
                }
            }
            TokenKind::Error => {
                let token = self.advance();
                self.error(SyntaxError::Lexical(token.lexeme.errors), start, Vec::new())
            }
            found => self.error(SyntaxError::ExpectedExpression { found }, start, Vec::new()),
        }
    }

    /// Decide whether the `fn` at the current position starts a function
    /// symbol (`fn(name = ...)`) rather than a function literal: scan ahead
    /// and look for a `=` inside the parameter parentheses.
    fn is_function_symbol(&mut self) -> bool {
        // make sure the 'fn' itself is buffered before speculating
        self.peek(0);

        let fn_keyword = self.scanner.next_token_speculative();
        debug_assert_eq!(fn_keyword.kind, TokenKind::Fn);

        let mut depth = 0usize;
        let symbol = loop {
            let lexeme = self.scanner.next_token_speculative();
            match lexeme.kind {
                TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        break false;
                    }
                }
                TokenKind::Eq if depth >= 1 => break true,
                TokenKind::LBrace | TokenKind::Semicolon | TokenKind::Eof => break false,
                _ if depth == 0 => break false,
                _ => {}
            }
        };

        self.scanner.backtrack();
        trace!(symbol, "function expression lookahead");
        symbol
    }
}

#[cfg(test)]
mod tests {
    use crate::diagnostics::SyntaxError;
    use crate::parser::ast::{BinaryOp, Node, NodeId, UnaryOp};
    use crate::parser::parse::Parser;
    use crate::symbols::scope::ScopeTable;
    use crate::symbols::types::TypeTable;

    fn with_expression<T>(source: &str, f: impl FnOnce(&Parser<'_, '_>, NodeId) -> T) -> T {
        let mut scopes = ScopeTable::new();
        let mut types = TypeTable::new(&mut scopes);
        let mut parser = Parser::new(source, &mut scopes, &mut types);
        let expr = parser.parse_expression();
        f(&parser, expr)
    }

    #[test]
    fn test_precedence() {
        with_expression("1 + 2 * 3", |parser, expr| {
            let Node::Binary { op, right, .. } = parser.ast.node(expr) else {
                panic!("expected binary");
            };
            assert_eq!(*op, BinaryOp::Add);
            assert!(matches!(
                parser.ast.node(*right),
                Node::Binary {
                    op: BinaryOp::Mul,
                    ..
                }
            ));
        });
    }

    #[test]
    fn test_left_associativity() {
        with_expression("a - b - c", |parser, expr| {
            let Node::Binary { op, left, .. } = parser.ast.node(expr) else {
                panic!("expected binary");
            };
            assert_eq!(*op, BinaryOp::Sub);
            assert!(matches!(
                parser.ast.node(*left),
                Node::Binary {
                    op: BinaryOp::Sub,
                    ..
                }
            ));
        });
    }

    #[test]
    fn test_logical_operators_bind_loosest() {
        with_expression("a == b #and c | d", |parser, expr| {
            assert!(matches!(
                parser.ast.node(expr),
                Node::Binary {
                    op: BinaryOp::And,
                    ..
                }
            ));
        });
    }

    #[test]
    fn test_caret_is_prefix_address_and_infix_xor() {
        with_expression("^a ^ b", |parser, expr| {
            let Node::Binary { op, left, .. } = parser.ast.node(expr) else {
                panic!("expected binary");
            };
            assert_eq!(*op, BinaryOp::BitXor);
            assert!(matches!(
                parser.ast.node(*left),
                Node::Unary {
                    op: UnaryOp::AddressOf,
                    ..
                }
            ));
        });
    }

    #[test]
    fn test_postfix_chain() {
        with_expression("p@.next[0](1, 2)", |parser, expr| {
            let Node::Call { callee, args } = parser.ast.node(expr) else {
                panic!("expected call");
            };
            assert_eq!(args.len(), 2);
            let Node::Subscript { array, .. } = parser.ast.node(*callee) else {
                panic!("expected subscript");
            };
            let Node::Member { owner, .. } = parser.ast.node(*array) else {
                panic!("expected member");
            };
            assert!(matches!(parser.ast.node(*owner), Node::Deref { .. }));
        });
    }

    #[test]
    fn test_negative_literal() {
        with_expression("-2147483648", |parser, expr| {
            assert!(matches!(parser.ast.node(expr), Node::Literal { .. }));
        });
        with_expression("a -1", |parser, expr| {
            assert!(matches!(
                parser.ast.node(expr),
                Node::Binary {
                    op: BinaryOp::Sub,
                    ..
                }
            ));
        });
    }

    #[test]
    fn test_missing_operand() {
        with_expression("1 +", |parser, expr| {
            let errors = parser.ast.syntax_errors(expr);
            assert_eq!(errors.len(), 1);
            assert!(matches!(errors[0].1, SyntaxError::ExpectedExpression { .. }));
        });
    }

    #[test]
    fn test_function_symbol_and_literal() {
        with_expression("fn(f = i32, bool) -> i32", |parser, expr| {
            let Node::Symbol { signature, .. } = parser.ast.node(expr) else {
                panic!("expected symbol, got {:?}", parser.ast.node(expr));
            };
            assert!(signature.is_some());
            assert_eq!(parser.ast.name_of(expr), Some("f"));
        });
        with_expression("fn(x i32) -> i32 { return x; }", |parser, expr| {
            assert!(matches!(parser.ast.node(expr), Node::FuncLiteral { .. }));
        });
        with_expression("fn(x [4]i32) {}", |parser, expr| {
            assert!(matches!(parser.ast.node(expr), Node::FuncLiteral { .. }));
        });
    }

    #[test]
    fn test_invoked_function_literal() {
        with_expression("fn(x i32) {}(1)", |parser, expr| {
            let errors = parser.ast.syntax_errors(expr);
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].1, SyntaxError::InvokedFunctionLiteral);
        });
    }

    #[test]
    fn test_call_argument_recovery() {
        with_expression("f(1, +, 3)", |parser, expr| {
            let Node::Call { args, .. } = parser.ast.node(expr) else {
                panic!("expected call, got {:?}", parser.ast.node(expr));
            };
            assert_eq!(args.len(), 3);
            assert_eq!(parser.ast.syntax_errors(expr).len(), 1);
        });
    }
}
