use quill::parser::lexer::{scan_raw, tokenize, Cursor, Scanner};
use quill::parser::token::{LexErrors, LiteralValue, TokenKind};

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source).iter().map(|lexeme| lexeme.kind).collect()
}

#[test]
fn test_tokens_cover_all_non_trivia_text() {
    let source = "fn add(a i32, b i32) -> i32 {\n    // sum\n    return a + b; /* done */\n}";
    let joined: String = tokenize(source).iter().map(|lexeme| lexeme.text).collect();
    assert_eq!(joined, "fnadd(ai32,bi32)->i32{returna+b;}");
}

#[test]
fn test_min_i32_literal_is_a_single_token() {
    let tokens = tokenize("var x i32 = -2147483648;");
    let literal = tokens[4];
    assert_eq!(literal.kind, TokenKind::IntLiteral);
    assert_eq!(literal.text, "-2147483648");
    assert!(literal.errors.is_empty());
    assert_eq!(literal.value, LiteralValue::Int(-2147483648));
    assert_eq!(tokens[5].kind, TokenKind::Semicolon);
}

#[test]
fn test_dangling_operator_scans_cleanly() {
    let tokens = tokenize("1 +");
    assert_eq!(
        tokens.iter().map(|lexeme| lexeme.kind).collect::<Vec<_>>(),
        vec![TokenKind::IntLiteral, TokenKind::Plus, TokenKind::Eof]
    );
    assert_eq!(tokens[0].span.start, 0);
    assert_eq!(tokens[1].span.start, 2);
}

#[test]
fn test_nested_block_comment_spans_to_outer_close() {
    let source = "/* a /* b */ c */";
    let (comment, cursor) = scan_raw(source, Cursor::start());
    assert_eq!(comment.kind, TokenKind::Comment);
    assert_eq!(comment.span.end as usize, source.len());
    assert!(comment.errors.is_empty());

    let (eof, _) = scan_raw(source, cursor);
    assert_eq!(eof.kind, TokenKind::Eof);

    assert_eq!(kinds("x /* a /* b */ c */ y").len(), 3);
}

#[test]
fn test_keywords_and_hash_operators() {
    assert_eq!(
        kinds("while a #and b do break;"),
        vec![
            TokenKind::While,
            TokenKind::Identifier,
            TokenKind::HashAnd,
            TokenKind::Identifier,
            TokenKind::Do,
            TokenKind::Break,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_lexical_errors_are_tokens() {
    let tokens = tokenize("var s string = \"open\nvar t i32;");
    let string = tokens[4];
    assert_eq!(string.kind, TokenKind::Error);
    assert!(string.errors.contains(LexErrors::MULTILINE_STRING));
}

#[test]
fn test_scanner_lookahead_and_speculation() {
    let mut scanner = Scanner::new("fn(f = i32) x");
    assert_eq!(scanner.peek(0), TokenKind::Fn);
    assert_eq!(scanner.peek(3), TokenKind::Eq);

    let mut seen = Vec::new();
    loop {
        let lexeme = scanner.next_token_speculative();
        seen.push(lexeme.kind);
        if lexeme.kind == TokenKind::Eof {
            break;
        }
    }
    scanner.backtrack();
    assert_eq!(seen.len(), 8);

    // speculation left the committed stream untouched
    let first = scanner.consume();
    assert_eq!(first.kind(), TokenKind::Fn);
    assert_eq!(scanner.tokens_consumed(), 1);
}

#[test]
fn test_backtrack_restarts_speculation_at_committed_position() {
    let mut scanner = Scanner::new("a b c d");
    assert_eq!(scanner.consume().text(), "a");

    assert_eq!(scanner.next_token_speculative().text, "b");
    assert_eq!(scanner.next_token_speculative().text, "c");
    scanner.backtrack();

    // a fresh speculative scan starts over, not where the last one stopped
    assert_eq!(scanner.next_token_speculative().text, "b");
    scanner.backtrack();
    assert_eq!(scanner.consume().text(), "b");
    assert_eq!(scanner.peek(0), TokenKind::Identifier);
}
