use quill::diagnostics::SyntaxError;
use quill::parser::ast::{Ast, Node, NodeId};
use quill::parser::lexer::LineIndex;
use quill::parser::token::{Span, TokenKind};
use quill::parser::Parser;
use quill::symbols::{ScopeId, ScopeTable, SymbolFilter, TypeTable};

struct Parsed<'src> {
    ast: Ast<'src>,
    root: NodeId,
    lines: LineIndex,
    scopes: ScopeTable<'src>,
}

impl<'src> Parsed<'src> {
    fn items(&self) -> &[NodeId] {
        match self.ast.node(self.root) {
            Node::Program { items, .. } => items,
            other => panic!("root is {:?}", other),
        }
    }

    fn errors(&self) -> Vec<(NodeId, SyntaxError)> {
        self.ast.syntax_errors(self.root)
    }

    fn line_of(&self, node: NodeId) -> usize {
        self.lines.location(self.ast.span(node).start).line
    }
}

fn parse(source: &str) -> Parsed<'_> {
    let mut scopes = ScopeTable::new();
    let mut types = TypeTable::new(&mut scopes);
    let mut parser = Parser::new(source, &mut scopes, &mut types);
    let (root, _) = parser.parse_program();
    let (ast, lines) = parser.finish();
    Parsed {
        ast,
        root,
        lines,
        scopes,
    }
}

#[test]
fn test_dangling_operator_is_missing_expression() {
    let parsed = parse("var x i32 = 1 +");
    let errors = parsed.errors();
    assert!(
        errors.iter().any(|(_, error)| matches!(
            error,
            SyntaxError::ExpectedExpression {
                found: TokenKind::Eof
            }
        )),
        "{:?}",
        errors
    );

    // the failed binary keeps its left operand and covers the operator
    let (literal, _) = parsed
        .ast
        .iter()
        .find(|(_, node)| matches!(node, Node::Literal { .. }))
        .expect("literal");
    assert_eq!(parsed.ast.span(literal), Span::new(12, 13));
    let covering = parsed.ast.iter().find(|(_, node)| match node {
        Node::Error { children, .. } => children.contains(&literal),
        _ => false,
    });
    let (binary, _) = covering.expect("error node over the binary");
    assert!(parsed.ast.span(binary).end >= 15);
}

#[test]
fn test_errors_in_separate_functions_are_all_reported() {
    let parsed = parse("fn a() { ) }\nfn b() { ) }\nfn c() {}");
    let errors = parsed.errors();
    assert_eq!(errors.len(), 2, "{:?}", errors);
    assert_eq!(parsed.line_of(errors[0].0), 1);
    assert_eq!(parsed.line_of(errors[1].0), 2);

    let last = *parsed.items().last().expect("items");
    assert_eq!(parsed.ast.name_of(last), Some("c"));
}

#[test]
fn test_function_literal_and_symbol() {
    let parsed = parse(
        "var f fn(i32) -> i32 = fn(x i32) -> i32 { return x; };\n\
         var g fn(i32) -> i32 = fn(f = i32) -> i32;",
    );
    assert!(parsed.errors().is_empty(), "{:?}", parsed.errors());

    let init = |item: NodeId| match parsed.ast.node(item) {
        Node::VarDecl {
            init: Some(init), ..
        } => parsed.ast.node(*init),
        other => panic!("expected initialized variable, found {:?}", other),
    };
    let items = parsed.items();
    assert!(matches!(init(items[0]), Node::FuncLiteral { .. }));
    assert!(matches!(
        init(items[1]),
        Node::Symbol {
            signature: Some(_),
            ..
        }
    ));
}

#[test]
fn test_declarations_enter_scopes() {
    let parsed = parse(
        "struct Point { x i32; y i32; }\n\
         fn main() { var p Point; }\n\
         fn main(code i32) {}",
    );
    assert!(parsed.errors().is_empty(), "{:?}", parsed.errors());

    let global = ScopeId::GLOBAL;
    let lookup = |name, filter| parsed.scopes.lookup(global, name, filter, false).len();
    assert_eq!(lookup("Point", SymbolFilter::TYPE), 1);
    assert_eq!(lookup("main", SymbolFilter::FUNC), 2);
    assert_eq!(lookup("p", SymbolFilter::VAR), 0);

    let Node::StructDefn { scope, .. } = parsed.ast.node(parsed.items()[0]) else {
        panic!("expected struct");
    };
    assert_eq!(parsed.scopes.get(*scope).len(), 2);
    assert_eq!(parsed.scopes.parent(*scope), Some(global));
}

#[test]
fn test_unbalanced_input_terminates() {
    let source = format!("fn main() {{ var x i32 = {}; }}", "(".repeat(64));
    let parsed = parse(&source);
    assert!(!parsed.errors().is_empty());
}

#[test]
fn test_illegal_do_statement_binds_nothing() {
    let parsed = parse("fn main() { if true do var x i32; var y i32; }");
    let errors: Vec<SyntaxError> = parsed.errors().into_iter().map(|(_, e)| e).collect();
    assert_eq!(errors, vec![SyntaxError::IllegalDoStatement]);

    let Node::FuncDefn { body, .. } = parsed.ast.node(parsed.items()[0]) else {
        panic!("expected function");
    };
    let Node::Block { scope, .. } = parsed.ast.node(*body) else {
        panic!("expected body block");
    };
    let lookup = |name| parsed.scopes.lookup(*scope, name, SymbolFilter::VAR, true).len();
    assert_eq!(lookup("x"), 0);
    assert_eq!(lookup("y"), 1);
}
