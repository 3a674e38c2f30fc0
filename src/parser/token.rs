//! Token model shared by the scanner and the parser
//!
//! A [`Lexeme`] is what the scanner produces: a kind, a byte span, the
//! borrowed source slice and either a decoded literal value or a set of
//! [`LexErrors`]. Once the parser consumes a lexeme from the committed
//! stream it becomes a [`Token`], which adds a dense id. Tokens referenced
//! by AST nodes are claimed into the AST's token arena and never change
//! afterwards.

use std::fmt;

/// Byte range in the source text (end exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span {
            start: start as u32,
            end: end as u32,
        }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn cover(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Closed set of token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TokenKind {
    // Literals
    IntLiteral,
    FloatLiteral,
    BoolLiteral,
    StringLiteral,

    Identifier,

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Dot,
    Arrow, // ->
    At,    // @

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Amp,
    Pipe,
    Bang,
    Eq,
    EqEq,
    BangEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,

    // Logical operators spelled with a hash prefix
    HashAnd,
    HashOr,
    HashXor,

    // Keywords
    Fn,
    Struct,
    Var,
    If,
    Else,
    While,
    Do,
    Return,
    Break,
    Continue,

    /// Trivia, only produced by raw scanning.
    Comment,
    Eof,
    Error,
}

impl TokenKind {
    pub const COUNT: usize = TokenKind::Error as usize + 1;

    const ALL: [TokenKind; TokenKind::COUNT] = [
        TokenKind::IntLiteral,
        TokenKind::FloatLiteral,
        TokenKind::BoolLiteral,
        TokenKind::StringLiteral,
        TokenKind::Identifier,
        TokenKind::LParen,
        TokenKind::RParen,
        TokenKind::LBracket,
        TokenKind::RBracket,
        TokenKind::LBrace,
        TokenKind::RBrace,
        TokenKind::Comma,
        TokenKind::Semicolon,
        TokenKind::Dot,
        TokenKind::Arrow,
        TokenKind::At,
        TokenKind::Plus,
        TokenKind::Minus,
        TokenKind::Star,
        TokenKind::Slash,
        TokenKind::Percent,
        TokenKind::Caret,
        TokenKind::Amp,
        TokenKind::Pipe,
        TokenKind::Bang,
        TokenKind::Eq,
        TokenKind::EqEq,
        TokenKind::BangEq,
        TokenKind::Lt,
        TokenKind::LtEq,
        TokenKind::Gt,
        TokenKind::GtEq,
        TokenKind::PlusEq,
        TokenKind::MinusEq,
        TokenKind::StarEq,
        TokenKind::SlashEq,
        TokenKind::PercentEq,
        TokenKind::HashAnd,
        TokenKind::HashOr,
        TokenKind::HashXor,
        TokenKind::Fn,
        TokenKind::Struct,
        TokenKind::Var,
        TokenKind::If,
        TokenKind::Else,
        TokenKind::While,
        TokenKind::Do,
        TokenKind::Return,
        TokenKind::Break,
        TokenKind::Continue,
        TokenKind::Comment,
        TokenKind::Eof,
        TokenKind::Error,
    ];

    /// Reserved word lookup for a scanned identifier.
    pub fn keyword(text: &str) -> Option<TokenKind> {
        let kind = match text {
            "fn" => TokenKind::Fn,
            "struct" => TokenKind::Struct,
            "var" => TokenKind::Var,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "return" => TokenKind::Return,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "true" | "false" => TokenKind::BoolLiteral,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::IntLiteral
                | TokenKind::FloatLiteral
                | TokenKind::BoolLiteral
                | TokenKind::StringLiteral
        )
    }

    /// Whether a token of this kind can end an operand. A `-` following
    /// such a token is a binary minus, never the sign of a literal.
    pub fn ends_operand(self) -> bool {
        self.is_literal()
            || matches!(
                self,
                TokenKind::Identifier | TokenKind::RParen | TokenKind::RBracket | TokenKind::At
            )
    }

    pub fn is_trivia(self) -> bool {
        self == TokenKind::Comment
    }

    /// Human readable description used in diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::IntLiteral => "integer literal",
            TokenKind::FloatLiteral => "float literal",
            TokenKind::BoolLiteral => "bool literal",
            TokenKind::StringLiteral => "string literal",
            TokenKind::Identifier => "identifier",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Comma => "','",
            TokenKind::Semicolon => "';'",
            TokenKind::Dot => "'.'",
            TokenKind::Arrow => "'->'",
            TokenKind::At => "'@'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::Caret => "'^'",
            TokenKind::Amp => "'&'",
            TokenKind::Pipe => "'|'",
            TokenKind::Bang => "'!'",
            TokenKind::Eq => "'='",
            TokenKind::EqEq => "'=='",
            TokenKind::BangEq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::LtEq => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::GtEq => "'>='",
            TokenKind::PlusEq => "'+='",
            TokenKind::MinusEq => "'-='",
            TokenKind::StarEq => "'*='",
            TokenKind::SlashEq => "'/='",
            TokenKind::PercentEq => "'%='",
            TokenKind::HashAnd => "'#and'",
            TokenKind::HashOr => "'#or'",
            TokenKind::HashXor => "'#xor'",
            TokenKind::Fn => "'fn'",
            TokenKind::Struct => "'struct'",
            TokenKind::Var => "'var'",
            TokenKind::If => "'if'",
            TokenKind::Else => "'else'",
            TokenKind::While => "'while'",
            TokenKind::Do => "'do'",
            TokenKind::Return => "'return'",
            TokenKind::Break => "'break'",
            TokenKind::Continue => "'continue'",
            TokenKind::Comment => "comment",
            TokenKind::Eof => "end of file",
            TokenKind::Error => "invalid token",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Set of token kinds, used for "expected one of" diagnostics and as
/// panic-mode recovery sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TokenSet(u64);

impl TokenSet {
    pub const EMPTY: TokenSet = TokenSet(0);

    pub const fn of(kinds: &[TokenKind]) -> TokenSet {
        let mut bits = 0u64;
        let mut i = 0;
        while i < kinds.len() {
            bits |= 1 << kinds[i] as u8;
            i += 1;
        }
        TokenSet(bits)
    }

    pub const fn with(self, kind: TokenKind) -> TokenSet {
        TokenSet(self.0 | 1 << kind as u8)
    }

    pub const fn union(self, other: TokenSet) -> TokenSet {
        TokenSet(self.0 | other.0)
    }

    pub const fn contains(self, kind: TokenKind) -> bool {
        self.0 & (1 << kind as u8) != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = TokenKind> {
        TokenKind::ALL.into_iter().filter(move |kind| self.contains(*kind))
    }
}

impl fmt::Display for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<&str> = self.iter().map(TokenKind::describe).collect();
        match kinds.as_slice() {
            [] => write!(f, "nothing"),
            [only] => write!(f, "{}", only),
            [init @ .., last] => write!(f, "{} or {}", init.join(", "), last),
        }
    }
}

bitflags::bitflags! {
    /// Lexical error conditions. Several can be present on one error token.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LexErrors: u16 {
        const INVALID_CHAR = 1 << 0;
        const UNTERMINATED_STRING = 1 << 1;
        const MULTILINE_STRING = 1 << 2;
        const UNTERMINATED_BLOCK_COMMENT = 1 << 3;
        const NON_DECIMAL_FLOAT = 1 << 4;
        const MISSING_DIGITS = 1 << 5;
        const MULTIPLE_DECIMAL_POINTS = 1 << 6;
        const UNKNOWN_HASH_KEYWORD = 1 << 7;
        const INVALID_DIGIT = 1 << 8;
        const INT_OUT_OF_RANGE = 1 << 9;
    }
}

impl LexErrors {
    const MESSAGES: [(LexErrors, &'static str); 10] = [
        (LexErrors::INVALID_CHAR, "invalid character"),
        (LexErrors::UNTERMINATED_STRING, "unterminated string"),
        (LexErrors::MULTILINE_STRING, "string literal spans multiple lines"),
        (LexErrors::UNTERMINATED_BLOCK_COMMENT, "unterminated block comment"),
        (LexErrors::NON_DECIMAL_FLOAT, "decimal point in a non-decimal literal"),
        (LexErrors::MISSING_DIGITS, "no digits after base prefix"),
        (LexErrors::MULTIPLE_DECIMAL_POINTS, "more than one decimal point"),
        (LexErrors::UNKNOWN_HASH_KEYWORD, "unknown '#' keyword"),
        (LexErrors::INVALID_DIGIT, "digit not valid for the literal's base"),
        (LexErrors::INT_OUT_OF_RANGE, "integer literal out of range"),
    ];
}

impl fmt::Display for LexErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("no error");
        }
        let present = LexErrors::MESSAGES
            .iter()
            .filter(|(flag, _)| self.contains(*flag));
        for (index, (_, message)) in present.enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            f.write_str(message)?;
        }
        Ok(())
    }
}

/// Decoded value of a literal token.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LiteralValue {
    #[default]
    None,
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// One lexical unit as produced by the scanner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lexeme<'src> {
    pub kind: TokenKind,
    pub span: Span,
    /// Source slice backing the token.
    pub text: &'src str,
    pub value: LiteralValue,
    pub errors: LexErrors,
}

impl<'src> Lexeme<'src> {
    pub fn is_error(&self) -> bool {
        self.kind == TokenKind::Error
    }
}

/// Dense, sequential id of a committed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(pub u32);

/// A lexeme taken from the committed token stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'src> {
    pub id: TokenId,
    pub lexeme: Lexeme<'src>,
}

impl<'src> Token<'src> {
    pub fn kind(&self) -> TokenKind {
        self.lexeme.kind
    }

    pub fn span(&self) -> Span {
        self.lexeme.span
    }

    pub fn text(&self) -> &'src str {
        self.lexeme.text
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            TokenKind::Identifier => write!(f, "identifier '{}'", self.text()),
            kind if kind.is_literal() => write!(f, "{} {}", kind, self.text()),
            kind => write!(f, "{}", kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_set_membership() {
        let set = TokenSet::of(&[TokenKind::Comma, TokenKind::RParen]);
        assert!(set.contains(TokenKind::Comma));
        assert!(set.contains(TokenKind::RParen));
        assert!(!set.contains(TokenKind::Semicolon));
        assert!(set.with(TokenKind::Semicolon).contains(TokenKind::Semicolon));
        assert_eq!(set.to_string(), "',' or ')'");
    }

    #[test]
    fn test_every_kind_fits_in_token_set() {
        assert!(TokenKind::COUNT <= 64);
        for kind in TokenKind::ALL {
            assert!(TokenSet::of(&[kind]).contains(kind));
        }
    }

    #[test]
    fn test_lex_errors_accumulate() {
        let mut errors = LexErrors::empty();
        errors |= LexErrors::MULTILINE_STRING;
        errors.insert(LexErrors::UNTERMINATED_STRING);
        assert!(errors.contains(LexErrors::MULTILINE_STRING));
        assert!(errors.contains(LexErrors::UNTERMINATED_STRING));
        assert!(!errors.contains(LexErrors::INVALID_CHAR));
        assert_eq!(
            errors.to_string(),
            "unterminated string; string literal spans multiple lines"
        );
    }
}
