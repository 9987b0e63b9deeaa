//! Tokenizer for the supported C# fragment.
//!
//! The lexer is hand-written. Every token owns the trivia (whitespace,
//! comments, preprocessor directives) that precedes it, so concatenating
//! `leading + text` across the stream reproduces the input byte-for-byte.
//! A final [`TokenKind::Eof`] token carries the file's trailing trivia.
//!
//! Generic argument lists are left to the parser: `>` is always lexed as a
//! single token (never `>>`), so `List<List<int>>` closes cleanly.

use thiserror::Error;

// ============================================================================
// Tokens
// ============================================================================

/// Lexical class of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword (keywords are not distinguished at this level).
    Identifier,
    /// Integer literal, including hex and suffixed forms.
    IntLiteral,
    /// Floating-point or decimal literal.
    RealLiteral,
    /// String literal: regular, verbatim, or interpolated.
    StringLiteral,
    /// Character literal.
    CharLiteral,
    /// Operator or punctuation.
    Punct,
    /// End of file; owns trailing trivia.
    Eof,
}

/// One lexed token plus the trivia that precedes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub leading: String,
    /// 1-indexed line of the first character of `text`.
    pub line: u32,
    /// 1-indexed column of the first character of `text`.
    pub col: u32,
}

impl Token {
    /// Returns true if the token's text equals `text`.
    pub fn is(&self, text: &str) -> bool {
        self.text == text
    }

    /// Returns true for identifier/keyword tokens.
    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Lexer failure with source location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("unterminated string literal at {line}:{col}")]
    UnterminatedString { line: u32, col: u32 },

    #[error("unterminated character literal at {line}:{col}")]
    UnterminatedChar { line: u32, col: u32 },

    #[error("unterminated block comment at {line}:{col}")]
    UnterminatedComment { line: u32, col: u32 },

    #[error("unexpected character '{ch}' at {line}:{col}")]
    UnexpectedChar { ch: char, line: u32, col: u32 },
}

impl TokenizeError {
    /// Source line of the failure.
    pub fn line(&self) -> u32 {
        match self {
            Self::UnterminatedString { line, .. }
            | Self::UnterminatedChar { line, .. }
            | Self::UnterminatedComment { line, .. }
            | Self::UnexpectedChar { line, .. } => *line,
        }
    }

    /// Source column of the failure.
    pub fn col(&self) -> u32 {
        match self {
            Self::UnterminatedString { col, .. }
            | Self::UnterminatedChar { col, .. }
            | Self::UnterminatedComment { col, .. }
            | Self::UnexpectedChar { col, .. } => *col,
        }
    }
}

// ============================================================================
// Lexer
// ============================================================================

/// Multi-character operators, longest first so greedy matching is correct.
/// `>>` and `>>=` are intentionally absent; see the module docs.
const MULTI_PUNCT: &[&str] = &[
    "??=", "<<=", "?.", "??", "=>", "==", "!=", "<=", ">=", "&&", "||", "+=", "-=", "*=", "/=",
    "%=", "&=", "|=", "^=", "++", "--", "<<", "::",
];

const SINGLE_PUNCT: &str = "(){}[];,.:?=<>+-*/%!&|^~";

struct Lexer<'s> {
    src: &'s str,
    pos: usize,
    line: u32,
    col: u32,
}

impl<'s> Lexer<'s> {
    fn new(src: &'s str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.rest().chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn starts_with(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    fn advance_str(&mut self, s: &str) {
        for _ in s.chars() {
            self.advance();
        }
    }

    /// Consume whitespace, comments, and preprocessor directives.
    fn scan_trivia(&mut self) -> Result<&'s str, TokenizeError> {
        let start = self.pos;
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_second() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_second() == Some('*') => {
                    let (line, col) = (self.line, self.col);
                    self.advance();
                    self.advance();
                    loop {
                        if self.starts_with("*/") {
                            self.advance();
                            self.advance();
                            break;
                        }
                        if self.advance().is_none() {
                            return Err(TokenizeError::UnterminatedComment { line, col });
                        }
                    }
                }
                Some('#') => {
                    // Preprocessor directive: opaque to the rewriter.
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
        Ok(&self.src[start..self.pos])
    }

    fn scan_identifier(&mut self) -> &'s str {
        let start = self.pos;
        if self.peek() == Some('@') {
            self.advance();
        }
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        &self.src[start..self.pos]
    }

    fn scan_number(&mut self) -> (TokenKind, &'s str) {
        let start = self.pos;
        let mut kind = TokenKind::IntLiteral;
        if self.starts_with("0x") || self.starts_with("0X") {
            self.advance();
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_hexdigit() || c == '_' {
                    self.advance();
                } else {
                    break;
                }
            }
        } else {
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() || c == '_' {
                    self.advance();
                } else {
                    break;
                }
            }
            if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
                kind = TokenKind::RealLiteral;
                self.advance();
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() || c == '_' {
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                let save = (self.pos, self.line, self.col);
                kind = TokenKind::RealLiteral;
                self.advance();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.advance();
                }
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                        self.advance();
                    }
                } else {
                    // Not an exponent after all (e.g. `1.Equals`).
                    (self.pos, self.line, self.col) = save;
                    kind = TokenKind::IntLiteral;
                }
            }
        }
        // Numeric suffixes.
        while let Some(c) = self.peek() {
            match c {
                'f' | 'F' | 'd' | 'D' | 'm' | 'M' => {
                    kind = TokenKind::RealLiteral;
                    self.advance();
                }
                'u' | 'U' | 'l' | 'L' => {
                    self.advance();
                }
                _ => break,
            }
        }
        (kind, &self.src[start..self.pos])
    }

    fn scan_string(&mut self, verbatim: bool) -> Result<&'s str, TokenizeError> {
        let start = self.pos;
        let (line, col) = (self.line, self.col);
        // Consume the optional $/@ prefix in either order, then the quote.
        while matches!(self.peek(), Some('$' | '@')) {
            self.advance();
        }
        debug_assert_eq!(self.peek(), Some('"'));
        self.advance();
        loop {
            match self.peek() {
                None => return Err(TokenizeError::UnterminatedString { line, col }),
                Some('"') if verbatim => {
                    self.advance();
                    if self.peek() == Some('"') {
                        // Doubled quote inside a verbatim string.
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') if !verbatim => {
                    self.advance();
                    if self.advance().is_none() {
                        return Err(TokenizeError::UnterminatedString { line, col });
                    }
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        Ok(&self.src[start..self.pos])
    }

    fn scan_char(&mut self) -> Result<&'s str, TokenizeError> {
        let start = self.pos;
        let (line, col) = (self.line, self.col);
        self.advance(); // opening quote
        loop {
            match self.peek() {
                None | Some('\n') => return Err(TokenizeError::UnterminatedChar { line, col }),
                Some('\'') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    if self.advance().is_none() {
                        return Err(TokenizeError::UnterminatedChar { line, col });
                    }
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        Ok(&self.src[start..self.pos])
    }
}

/// Tokenize C# source, attaching all trivia to the token that follows it.
pub fn tokenize(src: &str) -> Result<Vec<Token>, TokenizeError> {
    let mut lexer = Lexer::new(src);
    let mut tokens = Vec::new();
    loop {
        let leading = lexer.scan_trivia()?;
        let (line, col) = (lexer.line, lexer.col);
        let Some(ch) = lexer.peek() else {
            tokens.push(Token {
                kind: TokenKind::Eof,
                text: String::new(),
                leading: leading.to_string(),
                line,
                col,
            });
            return Ok(tokens);
        };

        let (kind, text) = if ch.is_alphabetic() || ch == '_' || ch == '@' {
            // `@"` and `@$"` begin verbatim strings, not identifiers.
            if ch == '@'
                && (lexer.peek_second() == Some('"')
                    || (lexer.peek_second() == Some('$') && lexer.rest()[2..].starts_with('"')))
            {
                (TokenKind::StringLiteral, lexer.scan_string(true)?)
            } else {
                (TokenKind::Identifier, lexer.scan_identifier())
            }
        } else if ch.is_ascii_digit() {
            lexer.scan_number()
        } else if ch == '"' {
            (TokenKind::StringLiteral, lexer.scan_string(false)?)
        } else if ch == '$' {
            let verbatim = lexer.peek_second() == Some('@');
            if lexer.peek_second() == Some('"') || verbatim {
                (TokenKind::StringLiteral, lexer.scan_string(verbatim)?)
            } else {
                return Err(TokenizeError::UnexpectedChar { ch, line, col });
            }
        } else if ch == '\'' {
            (TokenKind::CharLiteral, lexer.scan_char()?)
        } else if let Some(op) = MULTI_PUNCT.iter().find(|op| lexer.starts_with(op)) {
            lexer.advance_str(op);
            (TokenKind::Punct, *op)
        } else if SINGLE_PUNCT.contains(ch) {
            lexer.advance();
            (TokenKind::Punct, &lexer.src[lexer.pos - ch.len_utf8()..lexer.pos])
        } else {
            return Err(TokenizeError::UnexpectedChar { ch, line, col });
        };

        tokens.push(Token {
            kind,
            text: text.to_string(),
            leading: leading.to_string(),
            line,
            col,
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
