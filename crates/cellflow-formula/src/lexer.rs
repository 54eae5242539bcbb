//! Formula tokenizer
//!
//! Turns formula text into a flat token stream. Every token records the byte
//! offset where it starts so parse errors can point into the original text.

use crate::error::{ParseError, ParseErrorKind};
use cellflow_core::{CellAddress, CellError};

/// Token kinds produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(CellError),

    // Identifiers and references
    /// Function name (or an unknown bare name)
    Identifier(String),
    /// A1-style cell address, already validated against the grid
    CellRef(CellAddress),
    /// Sheet qualifier including the trailing `!`, quotes removed
    SheetPrefix(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Ampersand,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Colon,
    Comma,

    // Delimiters
    LeftParen,
    RightParen,

    Eof,
}

impl TokenKind {
    /// Short human-readable description for error messages
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::Text(s) => format!("string \"{}\"", s),
            TokenKind::Boolean(b) => format!("boolean {}", if *b { "TRUE" } else { "FALSE" }),
            TokenKind::Error(e) => format!("error {}", e),
            TokenKind::Identifier(name) => format!("name '{}'", name),
            TokenKind::CellRef(addr) => format!("reference {}", addr),
            TokenKind::SheetPrefix(sheet) => format!("sheet '{}'", sheet),
            TokenKind::Plus => "'+'".into(),
            TokenKind::Minus => "'-'".into(),
            TokenKind::Star => "'*'".into(),
            TokenKind::Slash => "'/'".into(),
            TokenKind::Caret => "'^'".into(),
            TokenKind::Ampersand => "'&'".into(),
            TokenKind::Equal => "'='".into(),
            TokenKind::NotEqual => "'<>'".into(),
            TokenKind::Less => "'<'".into(),
            TokenKind::LessEqual => "'<='".into(),
            TokenKind::Greater => "'>'".into(),
            TokenKind::GreaterEqual => "'>='".into(),
            TokenKind::Colon => "':'".into(),
            TokenKind::Comma => "','".into(),
            TokenKind::LeftParen => "'('".into(),
            TokenKind::RightParen => "')'".into(),
            TokenKind::Eof => "end of formula".into(),
        }
    }
}

/// A token and the byte offset where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

/// Tokenize formula text from the beginning.
///
/// The result always ends with a single [`TokenKind::Eof`] token.
///
/// # Example
/// ```rust
/// use cellflow_formula::lexer::{tokenize, TokenKind};
///
/// let tokens = tokenize("1+A1").unwrap();
/// assert_eq!(tokens.len(), 4);
/// assert_eq!(tokens[1].kind, TokenKind::Plus);
/// assert_eq!(tokens[2].position, 2);
/// ```
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(source, 0).run()
}

/// Character scanner over formula text
pub(crate) struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Start scanning `input` at byte offset `start`
    pub(crate) fn new(input: &'a str, start: usize) -> Self {
        Self { input, pos: start }
    }

    pub(crate) fn run(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let position = self.pos;
            let kind = self.scan_token()?;
            let done = kind == TokenKind::Eof;
            tokens.push(Token { kind, position });
            if done {
                return Ok(tokens);
            }
        }
    }

    fn scan_token(&mut self) -> Result<TokenKind, ParseError> {
        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(TokenKind::Eof),
        };

        let single = match c {
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '*' => Some(TokenKind::Star),
            '/' => Some(TokenKind::Slash),
            '^' => Some(TokenKind::Caret),
            '&' => Some(TokenKind::Ampersand),
            '=' => Some(TokenKind::Equal),
            ':' => Some(TokenKind::Colon),
            ',' => Some(TokenKind::Comma),
            '(' => Some(TokenKind::LeftParen),
            ')' => Some(TokenKind::RightParen),
            _ => None,
        };
        if let Some(kind) = single {
            self.advance();
            return Ok(kind);
        }

        match c {
            '<' => {
                self.advance();
                if self.eat('=') {
                    Ok(TokenKind::LessEqual)
                } else if self.eat('>') {
                    Ok(TokenKind::NotEqual)
                } else {
                    Ok(TokenKind::Less)
                }
            }
            '>' => {
                self.advance();
                if self.eat('=') {
                    Ok(TokenKind::GreaterEqual)
                } else {
                    Ok(TokenKind::Greater)
                }
            }
            '"' => self.scan_string(),
            '\'' => self.scan_quoted_sheet(),
            '#' => self.scan_error_literal(),
            c if c.is_ascii_digit()
                || (c == '.' && self.peek_char_at(1).map_or(false, |d| d.is_ascii_digit())) =>
            {
                self.scan_number()
            }
            c if c.is_ascii_alphabetic() || c == '_' || c == '$' => self.scan_identifier_or_ref(),
            other => Err(ParseError::new(
                ParseErrorKind::InvalidCharacter,
                self.pos,
                format!("invalid character '{}'", other),
            )),
        }
    }

    fn scan_string(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        self.advance(); // opening quote

        let mut s = String::new();
        loop {
            match self.peek_char() {
                Some('"') => {
                    self.advance();
                    // "" is an escaped quote
                    if self.eat('"') {
                        s.push('"');
                    } else {
                        return Ok(TokenKind::Text(s));
                    }
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
                None => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnterminatedString,
                        start,
                        "unterminated string literal",
                    ))
                }
            }
        }
    }

    fn scan_quoted_sheet(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        self.advance(); // opening quote

        let mut name = String::new();
        loop {
            match self.peek_char() {
                Some('\'') => {
                    self.advance();
                    if !self.eat('\'') {
                        break;
                    }
                    name.push('\'');
                }
                Some(c) => {
                    name.push(c);
                    self.advance();
                }
                None => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnterminatedString,
                        start,
                        "unterminated sheet name",
                    ))
                }
            }
        }

        if name.is_empty() {
            return Err(ParseError::new(
                ParseErrorKind::InvalidReference,
                start,
                "empty sheet name",
            ));
        }
        if !self.eat('!') {
            return Err(ParseError::new(
                ParseErrorKind::InvalidReference,
                self.pos,
                format!("expected '!' after sheet name '{}'", name),
            ));
        }
        Ok(TokenKind::SheetPrefix(name))
    }

    fn scan_error_literal(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        self.advance(); // '#'
        while self.peek_char().map_or(false, |c| {
            c.is_ascii_alphanumeric() || c == '/' || c == '?' || c == '!'
        }) {
            self.advance();
        }

        let text = &self.input[start..self.pos];
        CellError::from_str(text)
            .map(TokenKind::Error)
            .ok_or_else(|| {
                ParseError::new(
                    ParseErrorKind::UnknownName,
                    start,
                    format!("unknown error literal '{}'", text),
                )
            })
    }

    fn scan_number(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;

        self.skip_digits();
        if self.eat('.') {
            self.skip_digits();
        }

        // Only treat 'e' as an exponent when digits follow
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let digits_at = match self.peek_char_at(1) {
                Some('+' | '-') => 2,
                _ => 1,
            };
            if self
                .peek_char_at(digits_at)
                .map_or(false, |c| c.is_ascii_digit())
            {
                for _ in 0..digits_at {
                    self.advance();
                }
                self.skip_digits();
            }
        }

        let text = &self.input[start..self.pos];
        match text.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(TokenKind::Number(n)),
            _ => Err(ParseError::new(
                ParseErrorKind::UnexpectedToken,
                start,
                format!("invalid number '{}'", text),
            )),
        }
    }

    fn scan_identifier_or_ref(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        while self.peek_char().map_or(false, |c| {
            c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.'
        }) {
            self.advance();
        }
        let text = &self.input[start..self.pos];

        if self.eat('!') {
            return Ok(TokenKind::SheetPrefix(text.to_string()));
        }

        let is_call = self.peek_char() == Some('(');
        if !is_call {
            if text.eq_ignore_ascii_case("TRUE") {
                return Ok(TokenKind::Boolean(true));
            }
            if text.eq_ignore_ascii_case("FALSE") {
                return Ok(TokenKind::Boolean(false));
            }
            // LOG10(...) is a call, LOG10 alone is a reference
            if looks_like_cell_reference(text) {
                return CellAddress::parse(text)
                    .map(TokenKind::CellRef)
                    .map_err(|e| {
                        ParseError::new(ParseErrorKind::InvalidReference, start, e.to_string())
                    });
            }
        }

        Ok(TokenKind::Identifier(text.to_string()))
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_digits(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }
}

/// `[$]letters[$]digits` with nothing else
fn looks_like_cell_reference(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;

    if bytes.get(i) == Some(&b'$') {
        i += 1;
    }
    let letter_start = i;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    if i == letter_start {
        return false;
    }

    if bytes.get(i) == Some(&b'$') {
        i += 1;
    }
    let digit_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }

    i > digit_start && i == bytes.len()
}
