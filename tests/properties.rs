use proptest::prelude::*;
use quill::parser::lexer::tokenize;
use quill::parser::token::TokenKind;
use quill::{Options, Session};

/// Fragments that make parser-shaped input more likely than random bytes.
const FRAGMENTS: &[&str] = &[
    "fn", "struct", "var", "if", "else", "while", "do", "return", "break", "continue", "x",
    "f", "i32", "f64", "bool", "1", "-2", "3.5", "true", "\"s\"", "(", ")", "[", "]", "{", "}",
    ",", ";", ".", "@", "^", "+", "-", "*", "=", "+=", "==", "<", "->", "#and ", "#or ",
];

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn scanner_progresses_and_terminates(s in ".{0,200}") {
        let lexemes = tokenize(&s);
        let mut last_end = 0u32;

        prop_assert!(lexemes.len() <= s.len() + 1, "too many tokens for {:?}", s);
        for lexeme in &lexemes {
            prop_assert!(lexeme.span.start <= lexeme.span.end);
            prop_assert!(lexeme.span.start >= last_end, "token moved backwards in {:?}", s);
            prop_assert!(lexeme.span.end as usize <= s.len());
            last_end = lexeme.span.end;
        }
        prop_assert_eq!(lexemes.last().map(|lexeme| lexeme.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn tokens_reproduce_non_whitespace_text(s in "[a-z0-9_#@^+*%&|!=<>(){}\\[\\];,. \t\n-]{0,120}") {
        let joined: String = tokenize(&s).iter().map(|lexeme| lexeme.text).collect();
        let expected: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        prop_assert_eq!(joined, expected);
    }

    #[test]
    fn compile_terminates_on_arbitrary_input(s in ".{0,200}") {
        prop_assert!(Session::compile(&s, Options::new()).is_ok());
    }

    #[test]
    fn compile_terminates_on_token_soup(
        parts in prop::collection::vec(prop::sample::select(FRAGMENTS), 0..60)
    ) {
        let source = parts.join(" ");
        prop_assert!(Session::compile(&source, Options::new()).is_ok(), "{:?}", source);
    }
}
