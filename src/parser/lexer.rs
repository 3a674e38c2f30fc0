//! Scanner (lexer) for Quill source code
//!
//! Converts raw source text into [`Lexeme`]s. Scanning itself is a pure
//! function of the source and a [`Cursor`]: [`scan_raw`] returns the next
//! lexeme (comments included) together with the advanced cursor, and
//! [`scan`] does the same while skipping trivia. Nothing is mutated, so the
//! same cursor can be scanned from any number of times.
//!
//! The committed token stream lives in [`Scanner`], which owns the real
//! cursor, the newline index, a bounded lookahead buffer and a bounded
//! buffer of recently consumed tokens. Speculative lookahead runs on a
//! second cursor next to the committed one; [`Scanner::backtrack`] drops
//! it and the committed stream is exactly as it was.

use std::collections::VecDeque;

use crate::parser::token::{LexErrors, Lexeme, LiteralValue, Span, Token, TokenId, TokenKind};

/// Maximum number of tokens the parser may peek ahead.
pub const LOOK_MAX: usize = 16;

/// Number of consumed tokens kept for error messages and disambiguation.
pub const PREV_MAX: usize = 16;

/// 1-based line and column of a byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Append-only table of newline offsets.
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    newlines: Vec<u32>,
    /// Offset up to which the source has been recorded.
    recorded: usize,
}

impl LineIndex {
    /// Build the complete index of a source text in one go.
    pub fn from_source(source: &str) -> Self {
        let mut index = LineIndex::default();
        index.record(source.as_bytes(), source.len());
        index
    }

    /// Record the newlines between the last recorded offset and `to`.
    pub fn record(&mut self, bytes: &[u8], to: usize) {
        let to = to.min(bytes.len());
        if to <= self.recorded {
            return;
        }
        for (offset, byte) in bytes[self.recorded..to].iter().enumerate() {
            if *byte == b'\n' {
                self.newlines.push((self.recorded + offset) as u32);
            }
        }
        self.recorded = to;
    }

    /// Count of newlines strictly before `offset`, plus one.
    pub fn line_of(&self, offset: u32) -> usize {
        self.newlines.partition_point(|&newline| newline < offset) + 1
    }

    pub fn location(&self, offset: u32) -> SourceLocation {
        let line = self.line_of(offset);
        let line_start = if line == 1 {
            0
        } else {
            self.newlines[line - 2] + 1
        };
        SourceLocation::new(line, (offset - line_start) as usize + 1)
    }

    pub fn line_count(&self) -> usize {
        self.newlines.len() + 1
    }
}

/// Scan position plus the kind of the last significant lexeme before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pos: usize,
    last: TokenKind,
}

impl Cursor {
    pub fn start() -> Self {
        Cursor {
            pos: 0,
            last: TokenKind::Eof,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Cursor::start()
    }
}

/// Scan the next lexeme, comments included.
pub fn scan_raw<'src>(source: &'src str, cursor: Cursor) -> (Lexeme<'src>, Cursor) {
    let mut lexer = Lexer::new(source, cursor.pos);
    let lexeme = lexer.next_lexeme(cursor.last);
    let last = if lexeme.kind.is_trivia() {
        cursor.last
    } else {
        lexeme.kind
    };
    (
        lexeme,
        Cursor {
            pos: lexer.position,
            last,
        },
    )
}

/// Scan the next significant lexeme, skipping comments.
pub fn scan<'src>(source: &'src str, mut cursor: Cursor) -> (Lexeme<'src>, Cursor) {
    loop {
        let (lexeme, next) = scan_raw(source, cursor);
        cursor = next;
        if !lexeme.kind.is_trivia() {
            return (lexeme, cursor);
        }
    }
}

/// Scan the whole input, returning every significant lexeme including the
/// final end-of-file marker.
pub fn tokenize(source: &str) -> Vec<Lexeme<'_>> {
    let mut lexemes = Vec::new();
    let mut cursor = Cursor::start();
    loop {
        let (lexeme, next) = scan(source, cursor);
        cursor = next;
        lexemes.push(lexeme);
        if lexeme.kind == TokenKind::Eof {
            return lexemes;
        }
    }
}

/// Single-token lexer over a byte position.
struct Lexer<'src> {
    source: &'src str,
    bytes: &'src [u8],
    position: usize,
    start: usize,
}

impl<'src> Lexer<'src> {
    fn new(source: &'src str, position: usize) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            position,
            start: position,
        }
    }

    fn next_lexeme(&mut self, last: TokenKind) -> Lexeme<'src> {
        self.skip_whitespace();
        self.start = self.position;

        let Some(ch) = self.advance() else {
            return self.lexeme(TokenKind::Eof);
        };

        match ch {
            b'"' => self.string_literal(),
            b'0'..=b'9' => self.number_literal(false),
            b'-' if !last.ends_operand() && self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                self.number_literal(true)
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier_or_keyword(),
            b'#' => self.hash_keyword(),

            b'/' => match self.peek() {
                Some(b'/') => self.line_comment(),
                Some(b'*') => self.block_comment(),
                Some(b'=') => self.advance_with(TokenKind::SlashEq),
                _ => self.lexeme(TokenKind::Slash),
            },
            b'+' => self.with_eq(TokenKind::PlusEq, TokenKind::Plus),
            b'-' => match self.peek() {
                Some(b'=') => self.advance_with(TokenKind::MinusEq),
                Some(b'>') => self.advance_with(TokenKind::Arrow),
                _ => self.lexeme(TokenKind::Minus),
            },
            b'*' => self.with_eq(TokenKind::StarEq, TokenKind::Star),
            b'%' => self.with_eq(TokenKind::PercentEq, TokenKind::Percent),
            b'=' => self.with_eq(TokenKind::EqEq, TokenKind::Eq),
            b'!' => self.with_eq(TokenKind::BangEq, TokenKind::Bang),
            b'<' => self.with_eq(TokenKind::LtEq, TokenKind::Lt),
            b'>' => self.with_eq(TokenKind::GtEq, TokenKind::Gt),
            b'^' => self.lexeme(TokenKind::Caret),
            b'&' => self.lexeme(TokenKind::Amp),
            b'|' => self.lexeme(TokenKind::Pipe),
            b'@' => self.lexeme(TokenKind::At),
            b'.' => self.lexeme(TokenKind::Dot),
            b'(' => self.lexeme(TokenKind::LParen),
            b')' => self.lexeme(TokenKind::RParen),
            b'[' => self.lexeme(TokenKind::LBracket),
            b']' => self.lexeme(TokenKind::RBracket),
            b'{' => self.lexeme(TokenKind::LBrace),
            b'}' => self.lexeme(TokenKind::RBrace),
            b',' => self.lexeme(TokenKind::Comma),
            b';' => self.lexeme(TokenKind::Semicolon),

            _ => {
                // keep the slice on a char boundary for non-ASCII input
                while !self.source.is_char_boundary(self.position) {
                    self.position += 1;
                }
                self.error(LexErrors::INVALID_CHAR)
            }
        }
    }

    /// Parse string literal. Errors accumulate; scanning continues to the
    /// closing quote or the end of input.
    fn string_literal(&mut self) -> Lexeme<'src> {
        let mut errors = LexErrors::empty();

        loop {
            match self.advance() {
                None => {
                    errors |= LexErrors::UNTERMINATED_STRING;
                    break;
                }
                Some(b'"') => break,
                Some(b'\n') => errors |= LexErrors::MULTILINE_STRING,
                Some(b'\\') => match self.advance() {
                    None => {
                        errors |= LexErrors::UNTERMINATED_STRING;
                        break;
                    }
                    Some(b'\n') => errors |= LexErrors::MULTILINE_STRING,
                    Some(_) => {}
                },
                Some(_) => {}
            }
        }

        if errors.is_empty() {
            self.lexeme(TokenKind::StringLiteral)
        } else {
            self.error(errors)
        }
    }

    /// Parse numeric literal. The leading digit (or the sign) has already
    /// been consumed.
    fn number_literal(&mut self, negative: bool) -> Lexeme<'src> {
        let mut errors = LexErrors::empty();
        let mut radix = 10;

        // Base prefix is only recognised after a leading zero
        let first_digit = if negative {
            self.position
        } else {
            self.position - 1
        };
        if self.bytes[first_digit] == b'0' {
            let prefix = self.bytes.get(first_digit + 1).copied();
            let prefixed_radix = match prefix {
                Some(b'x') => Some(16),
                Some(b'o') => Some(8),
                Some(b'b') => Some(2),
                _ => None,
            };
            if let Some(prefixed) = prefixed_radix {
                radix = prefixed;
                self.position = first_digit + 2;
            }
        }
        let digits_start = if radix == 10 {
            first_digit
        } else {
            self.position
        };
        if radix == 10 && negative {
            // the first digit has not been consumed yet
            self.advance();
        }

        let mut digit_count = if radix == 10 { 1 } else { 0 };
        let mut decimal_points = 0;
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_alphanumeric() || c == b'_' => {
                    if (c as char).is_digit(radix) {
                        digit_count += 1;
                    } else {
                        errors |= LexErrors::INVALID_DIGIT;
                    }
                    self.advance();
                }
                Some(b'.') if self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit()) => {
                    decimal_points += 1;
                    self.advance();
                }
                _ => break,
            }
        }

        if decimal_points > 0 && radix != 10 {
            errors |= LexErrors::NON_DECIMAL_FLOAT;
        }
        if decimal_points > 1 {
            errors |= LexErrors::MULTIPLE_DECIMAL_POINTS;
        }
        if digit_count == 0 {
            errors |= LexErrors::MISSING_DIGITS;
        }
        if !errors.is_empty() {
            return self.error(errors);
        }

        if decimal_points == 1 {
            let text = &self.source[self.start..self.position];
            return match text.parse::<f64>() {
                Ok(value) => self.literal(TokenKind::FloatLiteral, LiteralValue::Float(value)),
                Err(_) => self.error(LexErrors::INVALID_DIGIT),
            };
        }

        let digits = &self.source[digits_start..self.position];
        let magnitude = match u64::from_str_radix(digits, radix) {
            Ok(magnitude) => magnitude,
            Err(_) => return self.error(LexErrors::INT_OUT_OF_RANGE),
        };
        let value = if negative {
            if magnitude > i64::MAX as u64 + 1 {
                return self.error(LexErrors::INT_OUT_OF_RANGE);
            }
            (magnitude as i64).wrapping_neg()
        } else {
            match i64::try_from(magnitude) {
                Ok(value) => value,
                Err(_) => return self.error(LexErrors::INT_OUT_OF_RANGE),
            }
        };

        self.literal(TokenKind::IntLiteral, LiteralValue::Int(value))
    }

    /// Parse identifier or keyword
    fn identifier_or_keyword(&mut self) -> Lexeme<'src> {
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_') {
            self.advance();
        }

        let text = &self.source[self.start..self.position];
        match TokenKind::keyword(text) {
            Some(TokenKind::BoolLiteral) => {
                self.literal(TokenKind::BoolLiteral, LiteralValue::Bool(text == "true"))
            }
            Some(keyword) => self.lexeme(keyword),
            None => self.lexeme(TokenKind::Identifier),
        }
    }

    /// `#and`, `#or` and `#xor`, each of which must be followed by whitespace.
    fn hash_keyword(&mut self) -> Lexeme<'src> {
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_') {
            self.advance();
        }

        let word = &self.source[self.start + 1..self.position];
        let followed_by_space = matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n'));
        let kind = match word {
            "and" => TokenKind::HashAnd,
            "or" => TokenKind::HashOr,
            "xor" => TokenKind::HashXor,
            _ => return self.error(LexErrors::UNKNOWN_HASH_KEYWORD),
        };

        if followed_by_space {
            self.lexeme(kind)
        } else {
            self.error(LexErrors::UNKNOWN_HASH_KEYWORD)
        }
    }

    /// `// text` runs to the end of the line; `//marker` (no space after
    /// the slashes) ends at the next whitespace.
    fn line_comment(&mut self) -> Lexeme<'src> {
        self.advance(); // second '/'
        let full_line = matches!(self.peek(), None | Some(b' ' | b'\t' | b'\r' | b'\n'));

        while let Some(ch) = self.peek() {
            let stop = if full_line {
                ch == b'\n'
            } else {
                ch.is_ascii_whitespace()
            };
            if stop {
                break;
            }
            self.advance();
        }

        self.lexeme(TokenKind::Comment)
    }

    /// Skip nested block comment (/* ... /* ... */ ... */)
    fn block_comment(&mut self) -> Lexeme<'src> {
        self.advance(); // '*'
        let mut depth = 1usize;

        while depth > 0 {
            match (self.peek(), self.peek_ahead(1)) {
                (None, _) => return self.error(LexErrors::UNTERMINATED_BLOCK_COMMENT),
                (Some(b'/'), Some(b'*')) => {
                    depth += 1;
                    self.position += 2;
                }
                (Some(b'*'), Some(b'/')) => {
                    depth -= 1;
                    self.position += 2;
                }
                _ => {
                    self.advance();
                }
            }
        }

        self.lexeme(TokenKind::Comment)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.advance();
        }
    }

    fn with_eq(&mut self, with: TokenKind, without: TokenKind) -> Lexeme<'src> {
        if self.peek() == Some(b'=') {
            self.advance_with(with)
        } else {
            self.lexeme(without)
        }
    }

    fn advance_with(&mut self, kind: TokenKind) -> Lexeme<'src> {
        self.advance();
        self.lexeme(kind)
    }

    fn lexeme(&self, kind: TokenKind) -> Lexeme<'src> {
        self.literal(kind, LiteralValue::None)
    }

    fn literal(&self, kind: TokenKind, value: LiteralValue) -> Lexeme<'src> {
        Lexeme {
            kind,
            span: Span::new(self.start, self.position),
            text: &self.source[self.start..self.position],
            value,
            errors: LexErrors::empty(),
        }
    }

    fn error(&self, errors: LexErrors) -> Lexeme<'src> {
        Lexeme {
            errors,
            ..self.lexeme(TokenKind::Error)
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.position).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<u8> {
        self.bytes.get(self.position + n).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.position += 1;
        Some(ch)
    }
}

/// Position of an in-progress speculative scan.
#[derive(Debug, Clone, Copy)]
struct Speculation {
    /// Number of buffered lookahead tokens already replayed.
    replayed: usize,
    cursor: Cursor,
}

/// The committed token stream.
pub struct Scanner<'src> {
    source: &'src str,
    cursor: Cursor,
    lines: LineIndex,
    lookahead: VecDeque<Lexeme<'src>>,
    previous: VecDeque<Token<'src>>,
    next_id: u32,
    speculation: Option<Speculation>,
}

impl<'src> Scanner<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            cursor: Cursor::start(),
            lines: LineIndex::default(),
            lookahead: VecDeque::with_capacity(LOOK_MAX),
            previous: VecDeque::with_capacity(PREV_MAX),
            next_id: 0,
            speculation: None,
        }
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Scan one more lexeme into the lookahead buffer.
    fn produce_next_token(&mut self) {
        let (lexeme, next) = scan(self.source, self.cursor);
        self.lines.record(self.source.as_bytes(), next.pos);
        self.cursor = next;
        self.lookahead.push_back(lexeme);
    }

    fn fill(&mut self, n: usize) {
        debug_assert!(n < LOOK_MAX, "lookahead of {} exceeds LOOK_MAX", n);
        while self.lookahead.len() <= n {
            self.produce_next_token();
        }
    }

    /// Kind of the token `n` positions ahead, without consuming anything.
    pub fn peek(&mut self, n: usize) -> TokenKind {
        self.peek_lexeme(n).kind
    }

    pub fn peek_lexeme(&mut self, n: usize) -> &Lexeme<'src> {
        let n = n.min(LOOK_MAX - 1);
        self.fill(n);
        &self.lookahead[n]
    }

    /// Take the next token off the stream. At the end of input this keeps
    /// returning end-of-file tokens.
    pub fn consume(&mut self) -> Token<'src> {
        debug_assert!(self.speculation.is_none(), "consume during speculation");
        self.fill(0);
        let lexeme = self.lookahead.pop_front().unwrap_or(Lexeme {
            kind: TokenKind::Eof,
            span: Span::new(self.source.len(), self.source.len()),
            text: "",
            value: LiteralValue::None,
            errors: LexErrors::empty(),
        });
        let token = Token {
            id: TokenId(self.next_id),
            lexeme,
        };
        self.next_id += 1;

        if self.previous.len() == PREV_MAX {
            self.previous.pop_back();
        }
        self.previous.push_front(token);
        token
    }

    /// The `n`th most recently consumed token (0 is the last one).
    pub fn prev(&self, n: usize) -> Option<&Token<'src>> {
        self.previous.get(n)
    }

    /// End offset of the last consumed token, or 0 before the first one.
    pub fn prev_end(&self) -> u32 {
        self.previous.front().map_or(0, |token| token.span().end)
    }

    pub fn tokens_consumed(&self) -> u32 {
        self.next_id
    }

    /// Next lexeme of the speculative scan. The first call after a
    /// backtrack starts at the committed position. Committed state is never
    /// touched.
    pub fn next_token_speculative(&mut self) -> Lexeme<'src> {
        let committed = self.cursor;
        let speculation = self.speculation.get_or_insert(Speculation {
            replayed: 0,
            cursor: committed,
        });
        if let Some(buffered) = self.lookahead.get(speculation.replayed) {
            speculation.replayed += 1;
            return *buffered;
        }
        let (lexeme, next) = scan(self.source, speculation.cursor);
        speculation.cursor = next;
        lexeme
    }

    /// Discard all speculative progress.
    pub fn backtrack(&mut self) {
        self.speculation = None;
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.lines
    }

    /// Finish scanning and hand over the newline index. Any unscanned rest
    /// of the input is recorded first.
    pub fn into_line_index(mut self) -> LineIndex {
        self.lines.record(self.source.as_bytes(), self.source.len());
        self.lines
    }
}
