//! AST definitions and storage
//!
//! Nodes live in one arena per compilation and refer to each other by
//! [`NodeId`]. Source spans and resolved expression types are side tables
//! keyed by node id, so node payloads stay small. Identifier and literal
//! tokens are claimed into the tree's own token list and referenced by
//! [`TokenRef`].

use la_arena::{Arena, ArenaMap, Idx};
use smallvec::SmallVec;

use crate::diagnostics::SyntaxError;
use crate::parser::token::{Span, Token};
use crate::symbols::scope::{ScopeId, Symbol};
use crate::symbols::types::{TypeId, TypeSlotId};

pub type NodeId = Idx<Node>;

/// Index of a token claimed by the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenRef(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Plus,
    Negate,
    Not,
    AddressOf,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
            UnaryOp::AddressOf => "^",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Arithmetic
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    // Comparison
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    // Bitwise
    BitAnd,
    BitXor,
    BitOr,
    // Logical
    And,
    Or,
    Xor,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::And => "#and",
            BinaryOp::Or => "#or",
            BinaryOp::Xor => "#xor",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem | BinaryOp::Add | BinaryOp::Sub
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, BinaryOp::BitAnd | BinaryOp::BitXor | BinaryOp::BitOr)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::Xor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl AssignOp {
    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Rem => "%=",
        }
    }
}

/// Resolution state of a symbol or member expression. Starts out
/// `Unresolved` and moves to one of the other variants exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolRef {
    /// Candidates gathered so far (empty before the resolver has run)
    Unresolved(SmallVec<[Symbol; 2]>),
    Var(NodeId),
    Func(NodeId),
    MemberVar(NodeId),
}

impl SymbolRef {
    pub fn unresolved() -> Self {
        SymbolRef::Unresolved(SmallVec::new())
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, SymbolRef::Unresolved(_))
    }

    /// Declaration node once resolved.
    pub fn declaration(&self) -> Option<NodeId> {
        match self {
            SymbolRef::Unresolved(_) => None,
            SymbolRef::Var(node) | SymbolRef::Func(node) | SymbolRef::MemberVar(node) => {
                Some(*node)
            }
        }
    }
}

/// Parameter and return declarations shared by function definitions and
/// function literals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncHeader {
    /// `VarDecl` nodes
    pub params: Vec<NodeId>,
    /// `VarDecl` nodes
    pub returns: Vec<NodeId>,
    /// Scope holding the parameters; also the body's scope.
    pub scope: ScopeId,
    /// The function's own type.
    pub ty: TypeSlotId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Program {
        items: Vec<NodeId>,
        scope: ScopeId,
    },
    /// Failed construct, keeping whatever children parsed successfully.
    Error {
        kind: SyntaxError,
        children: Vec<NodeId>,
    },

    // Expressions
    Literal {
        token: TokenRef,
    },
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    Group {
        inner: NodeId,
    },
    Symbol {
        name: TokenRef,
        /// Scope the name is used in.
        scope: ScopeId,
        /// Set for `fn(name = T, ...)` references.
        signature: Option<TypeSlotId>,
        state: SymbolRef,
    },
    Member {
        owner: NodeId,
        name: TokenRef,
        state: SymbolRef,
    },
    Deref {
        operand: NodeId,
    },
    Subscript {
        array: NodeId,
        index: NodeId,
    },
    Call {
        callee: NodeId,
        args: Vec<NodeId>,
    },
    FuncLiteral {
        header: FuncHeader,
        body: NodeId,
    },

    // Statements
    ExprStmt {
        expr: NodeId,
    },
    Assign {
        op: AssignOp,
        target: NodeId,
        value: NodeId,
    },
    /// Variable, parameter, return value or struct member declaration.
    VarDecl {
        name: Option<TokenRef>,
        ty: TypeSlotId,
        init: Option<NodeId>,
        scope: ScopeId,
    },
    StructDefn {
        name: TokenRef,
        members: Vec<NodeId>,
        /// The struct's member scope.
        scope: ScopeId,
    },
    FuncDefn {
        name: TokenRef,
        header: FuncHeader,
        body: NodeId,
    },
    If {
        condition: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    },
    While {
        condition: NodeId,
        body: NodeId,
    },
    Block {
        statements: Vec<NodeId>,
        scope: ScopeId,
    },
    Return {
        values: Vec<NodeId>,
    },
    Break,
    Continue,
}

impl Node {
    pub fn is_error(&self) -> bool {
        matches!(self, Node::Error { .. })
    }

    /// Short name of the node kind, for logs and internal errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Program { .. } => "program",
            Node::Error { .. } => "error",
            Node::Literal { .. } => "literal",
            Node::Unary { .. } => "unary",
            Node::Binary { .. } => "binary",
            Node::Group { .. } => "group",
            Node::Symbol { .. } => "symbol",
            Node::Member { .. } => "member",
            Node::Deref { .. } => "deref",
            Node::Subscript { .. } => "subscript",
            Node::Call { .. } => "call",
            Node::FuncLiteral { .. } => "function literal",
            Node::ExprStmt { .. } => "expression statement",
            Node::Assign { .. } => "assignment",
            Node::VarDecl { .. } => "variable declaration",
            Node::StructDefn { .. } => "struct definition",
            Node::FuncDefn { .. } => "function definition",
            Node::If { .. } => "if",
            Node::While { .. } => "while",
            Node::Block { .. } => "block",
            Node::Return { .. } => "return",
            Node::Break => "break",
            Node::Continue => "continue",
        }
    }

    /// Direct children in source order.
    pub fn children(&self) -> SmallVec<[NodeId; 4]> {
        let mut out = SmallVec::new();
        match self {
            Node::Program { items: list, .. }
            | Node::Error { children: list, .. }
            | Node::Block {
                statements: list, ..
            }
            | Node::Return { values: list }
            | Node::StructDefn { members: list, .. } => out.extend_from_slice(list),
            Node::Literal { .. } | Node::Symbol { .. } | Node::Break | Node::Continue => {}
            Node::Unary { operand, .. } | Node::Deref { operand } => out.push(*operand),
            Node::Binary { left, right, .. } => {
                out.push(*left);
                out.push(*right);
            }
            Node::Group { inner } => out.push(*inner),
            Node::Member { owner, .. } => out.push(*owner),
            Node::Subscript { array, index } => {
                out.push(*array);
                out.push(*index);
            }
            Node::Call { callee, args } => {
                out.push(*callee);
                out.extend_from_slice(args);
            }
            Node::FuncLiteral { header, body } | Node::FuncDefn { header, body, .. } => {
                out.extend_from_slice(&header.params);
                out.extend_from_slice(&header.returns);
                out.push(*body);
            }
            Node::ExprStmt { expr } => out.push(*expr),
            Node::Assign { target, value, .. } => {
                out.push(*target);
                out.push(*value);
            }
            Node::VarDecl { init, .. } => out.extend(*init),
            Node::If {
                condition,
                then_branch,
                else_branch,
            } => {
                out.push(*condition);
                out.push(*then_branch);
                out.extend(*else_branch);
            }
            Node::While { condition, body } => {
                out.push(*condition);
                out.push(*body);
            }
        }
        out
    }
}

/// Arena-backed syntax tree for one compilation unit.
#[derive(Debug)]
pub struct Ast<'src> {
    source: &'src str,
    nodes: Arena<Node>,
    spans: ArenaMap<NodeId, Span>,
    types: ArenaMap<NodeId, TypeId>,
    tokens: Vec<Token<'src>>,
}

impl<'src> Ast<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            nodes: Arena::new(),
            spans: ArenaMap::default(),
            types: ArenaMap::default(),
            tokens: Vec::new(),
        }
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    pub fn alloc(&mut self, node: Node, span: Span) -> NodeId {
        let id = self.nodes.alloc(node);
        self.spans.insert(id, span);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes.iter()
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.spans.get(id).copied().unwrap_or_default()
    }

    pub fn is_error(&self, id: NodeId) -> bool {
        self.node(id).is_error()
    }

    /// Take ownership of a committed token.
    pub fn claim(&mut self, token: Token<'src>) -> TokenRef {
        let id = TokenRef(self.tokens.len() as u32);
        self.tokens.push(token);
        id
    }

    pub fn token(&self, token: TokenRef) -> &Token<'src> {
        &self.tokens[token.0 as usize]
    }

    pub fn text(&self, token: TokenRef) -> &'src str {
        self.tokens[token.0 as usize].text()
    }

    pub fn claimed_tokens(&self) -> &[Token<'src>] {
        &self.tokens
    }

    /// Record the resolved type of an expression.
    pub fn set_type(&mut self, id: NodeId, ty: TypeId) {
        self.types.insert(id, ty);
    }

    pub fn type_of(&self, id: NodeId) -> Option<TypeId> {
        self.types.get(id).copied()
    }

    /// Resolution state of a symbol or member expression.
    pub fn symbol_ref(&self, id: NodeId) -> Option<&SymbolRef> {
        match self.node(id) {
            Node::Symbol { state, .. } | Node::Member { state, .. } => Some(state),
            _ => None,
        }
    }

    /// Name of a declaration or symbol node.
    pub fn name_of(&self, id: NodeId) -> Option<&'src str> {
        match self.node(id) {
            Node::Symbol { name, .. }
            | Node::Member { name, .. }
            | Node::StructDefn { name, .. }
            | Node::FuncDefn { name, .. } => Some(self.text(*name)),
            Node::VarDecl { name, .. } => name.map(|name| self.text(name)),
            _ => None,
        }
    }

    /// Every error node under `root` that carries its own message, in
    /// source order. Bubble nodes are walked through but not reported.
    pub fn syntax_errors(&self, root: NodeId) -> Vec<(NodeId, SyntaxError)> {
        let mut errors = Vec::new();
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if let Node::Error { kind, .. } = node {
                if !kind.is_bubble() {
                    errors.push((id, *kind));
                }
            }
            stack.extend(node.children().into_iter().rev());
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::token::{LexErrors, Lexeme, LiteralValue, TokenId, TokenKind};

    fn token(text: &str, start: usize) -> Token<'_> {
        Token {
            id: TokenId(start as u32),
            lexeme: Lexeme {
                kind: TokenKind::IntLiteral,
                span: Span::new(start, start + text.len()),
                text,
                value: LiteralValue::Int(1),
                errors: LexErrors::empty(),
            },
        }
    }

    #[test]
    fn test_side_tables_are_keyed_by_node() {
        let mut ast = Ast::new("1 + 1");
        let one = ast.claim(token("1", 0));
        let left = ast.alloc(Node::Literal { token: one }, Span::new(0, 1));
        let two = ast.claim(token("1", 4));
        let right = ast.alloc(Node::Literal { token: two }, Span::new(4, 5));
        let sum = ast.alloc(
            Node::Binary {
                op: BinaryOp::Add,
                left,
                right,
            },
            Span::new(0, 5),
        );

        assert_eq!(ast.span(sum), Span::new(0, 5));
        assert_eq!(ast.node(sum).children().as_slice(), &[left, right]);
        assert_eq!(ast.type_of(sum), None);
        ast.set_type(sum, TypeId::I32);
        assert_eq!(ast.type_of(sum), Some(TypeId::I32));
        assert_eq!(ast.text(two), "1");
    }

    #[test]
    fn test_syntax_errors_skip_bubbles() {
        let mut ast = Ast::new("");
        let inner = ast.alloc(
            Node::Error {
                kind: SyntaxError::ChainedAssignment,
                children: vec![],
            },
            Span::new(0, 1),
        );
        let bubble = ast.alloc(
            Node::Error {
                kind: SyntaxError::Bubble,
                children: vec![inner],
            },
            Span::new(0, 2),
        );
        let root = ast.alloc(
            Node::Program {
                items: vec![bubble],
                scope: ScopeId::GLOBAL,
            },
            Span::new(0, 2),
        );

        let errors = ast.syntax_errors(root);
        assert_eq!(errors, vec![(inner, SyntaxError::ChainedAssignment)]);
    }
}
