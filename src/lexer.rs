use std::rc::Rc;

use thiserror::Error;
use tracing::warn;

use crate::ast::{Literal, Location, Token, TokenKind};

/// Lexical errors. Scanning continues after each one so a single pass can
/// surface several problems.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("Unexpected character '{ch}'.")]
    UnexpectedCharacter { ch: char, location: Location },

    #[error("Unterminated string.")]
    UnterminatedString { location: Location },

    #[error("Expected end comment marker but reached end of file.")]
    UnterminatedComment { location: Location },

    #[error("Invalid escape sequence '\\{ch}'.")]
    InvalidEscape { ch: char, location: Location },

    #[error("Invalid number literal '{text}'.")]
    InvalidNumber { text: String, location: Location },
}

impl LexError {
    pub fn location(&self) -> Location {
        match self {
            LexError::UnexpectedCharacter { location, .. }
            | LexError::UnterminatedString { location }
            | LexError::UnterminatedComment { location }
            | LexError::InvalidEscape { location, .. }
            | LexError::InvalidNumber { location, .. } => *location,
        }
    }
}

/// Tokens and errors from one lexing pass.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Program,
    /// Scanning an embedded `${ ... }` expression. `depth` counts unmatched
    /// `{` seen inside it.
    Interpolation { depth: usize },
}

pub struct Lexer {
    input: Rc<[char]>,
    position: usize,
    location: Location,
    start: usize,
    start_location: Location,
    mode: Mode,
    /// Set when an interpolation reaches its closing `}`
    closed: bool,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self::at(input.chars().collect(), 0, Location::default(), Mode::Program)
    }

    fn at(input: Rc<[char]>, position: usize, location: Location, mode: Mode) -> Self {
        Lexer {
            input,
            position,
            location,
            start: position,
            start_location: location,
            mode,
            closed: false,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Scans the whole input. The token list always ends with `Eof`.
    pub fn scan_tokens(mut self) -> ScanResult {
        self.run();
        ScanResult {
            tokens: self.tokens,
            errors: self.errors,
        }
    }

    fn run(&mut self) {
        while !self.is_at_end() {
            if self.mode == (Mode::Interpolation { depth: 0 }) && self.current_char() == Some('}')
            {
                self.closed = true;
                return;
            }
            self.start = self.position;
            self.start_location = self.location;
            self.scan_token();
        }

        match self.mode {
            Mode::Program => {
                self.start = self.position;
                self.start_location = self.location;
                self.add_token(TokenKind::Eof);
            }
            Mode::Interpolation { .. } => {
                warn!(location = %self.location, "unmatched interpolation brace at end of input");
            }
        }
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current_char()?;
        self.position += 1;
        self.location.offset += ch.len_utf8();
        if ch == '\n' {
            self.location.line += 1;
            self.location.column = 1;
        } else {
            self.location.column += 1;
        }
        Some(ch)
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.current_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn lexeme(&self) -> String {
        self.input[self.start..self.position].iter().collect()
    }

    fn add_token(&mut self, kind: TokenKind) {
        self.add_literal(kind, None);
    }

    fn add_literal(&mut self, kind: TokenKind, literal: Option<Literal>) {
        let lexeme = self.lexeme();
        self.tokens
            .push(Token::new(kind, lexeme, literal, self.start_location));
    }

    fn mark_start(&mut self) {
        self.start = self.position;
        self.start_location = self.location;
    }

    fn scan_token(&mut self) {
        let Some(ch) = self.advance() else {
            return;
        };

        match ch {
            '(' => self.add_token(TokenKind::LeftParen),
            ')' => self.add_token(TokenKind::RightParen),
            '{' => {
                if let Mode::Interpolation { depth } = &mut self.mode {
                    *depth += 1;
                }
                self.add_token(TokenKind::LeftBrace)
            }
            '}' => {
                if let Mode::Interpolation { depth } = &mut self.mode {
                    *depth -= 1;
                }
                self.add_token(TokenKind::RightBrace)
            }
            '[' => self.add_token(TokenKind::LeftSquare),
            ']' => self.add_token(TokenKind::RightSquare),
            ',' => self.add_token(TokenKind::Comma),
            '.' => self.add_token(TokenKind::Dot),
            '-' => self.add_token(TokenKind::Minus),
            '+' => self.add_token(TokenKind::Plus),
            ';' => self.add_token(TokenKind::Semicolon),
            '*' => self.add_token(TokenKind::Star),
            '?' => self.add_token(TokenKind::QuestionMark),
            ':' => self.add_token(TokenKind::Colon),
            '/' => {
                if self.match_char('/') {
                    while self.current_char().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                } else if self.match_char('*') {
                    self.block_comment();
                } else {
                    self.add_token(TokenKind::Slash)
                }
            }
            '!' => {
                let kind = if self.match_char('=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                };
                self.add_token(kind)
            }
            '=' => {
                let kind = if self.match_char('=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                };
                self.add_token(kind)
            }
            '>' => {
                let kind = if self.match_char('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                };
                self.add_token(kind)
            }
            '<' => {
                let kind = if self.match_char('=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                };
                self.add_token(kind)
            }
            '"' => self.read_string(),
            ' ' | '\r' | '\t' | '\n' => {}
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.read_identifier(),
            ch => self.errors.push(LexError::UnexpectedCharacter {
                ch,
                location: self.start_location,
            }),
        }
    }

    /// Consumes a `/* ... */` comment; the opening marker is already consumed.
    /// Comments nest.
    fn block_comment(&mut self) {
        let mut depth = 1;
        while depth > 0 {
            match self.advance() {
                None => {
                    self.errors.push(LexError::UnterminatedComment {
                        location: self.location,
                    });
                    return;
                }
                Some('/') if self.match_char('*') => depth += 1,
                Some('*') if self.match_char('/') => depth -= 1,
                Some(_) => {}
            }
        }
    }

    fn read_identifier(&mut self) {
        while self
            .current_char()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }

        let text = self.lexeme();
        match TokenKind::keyword(&text) {
            Some(kind) => self.add_token(kind),
            None => self.add_literal(TokenKind::Identifier, Some(Literal::String(text))),
        }
    }

    fn read_number(&mut self) {
        while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.current_char() == Some('.') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
        {
            self.advance();
            while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = self.lexeme();
        match text.parse::<f64>() {
            Ok(n) => self.add_literal(TokenKind::Number, Some(Literal::Number(n))),
            Err(_) => self.errors.push(LexError::InvalidNumber {
                text,
                location: self.start_location,
            }),
        }
    }

    /// Scans a string literal; the opening quote is already consumed.
    ///
    /// Emits `StringStart`, then literal segments separated by
    /// `InterpStart .. InterpEnd` runs, then `StringEnd`. A segment is
    /// emitted before every interpolation and before the closing quote even
    /// when empty.
    fn read_string(&mut self) {
        let string_start = self.start_location;
        self.add_token(TokenKind::StringStart);
        self.mark_start();

        let mut value = String::new();
        loop {
            match self.current_char() {
                None => {
                    self.push_segment(&mut value);
                    self.errors.push(LexError::UnterminatedString {
                        location: string_start,
                    });
                    return;
                }
                Some('"') => break,
                Some('\\') => {
                    let escape_location = self.location;
                    self.advance();
                    let Some(escaped) = self.advance() else {
                        continue;
                    };
                    match unescape(escaped) {
                        Some(c) => value.push(c),
                        None => self.errors.push(LexError::InvalidEscape {
                            ch: escaped,
                            location: escape_location,
                        }),
                    }
                }
                Some('$') if self.peek_char(1) == Some('{') => {
                    self.push_segment(&mut value);

                    self.mark_start();
                    self.advance();
                    self.advance();
                    self.add_token(TokenKind::InterpStart);

                    if !self.interpolate() {
                        continue;
                    }

                    self.mark_start();
                    self.advance();
                    self.add_token(TokenKind::InterpEnd);
                    self.mark_start();
                }
                Some(c) => {
                    self.advance();
                    value.push(c);
                }
            }
        }

        self.push_segment(&mut value);

        self.mark_start();
        self.advance();
        self.add_token(TokenKind::StringEnd);
    }

    fn push_segment(&mut self, value: &mut String) {
        let literal = Literal::String(std::mem::take(value));
        self.add_literal(TokenKind::String, Some(literal));
    }

    /// Runs a nested lexer over the embedded expression starting at the
    /// current position and splices its tokens into this one. Returns true
    /// when the nested lexer stopped at the matching `}`, which is left
    /// unconsumed.
    fn interpolate(&mut self) -> bool {
        let mut nested = Lexer::at(
            Rc::clone(&self.input),
            self.position,
            self.location,
            Mode::Interpolation { depth: 0 },
        );
        nested.run();

        self.tokens.append(&mut nested.tokens);
        self.errors.append(&mut nested.errors);
        self.position = nested.position;
        self.location = nested.location;
        nested.closed
    }
}

fn unescape(ch: char) -> Option<char> {
    match ch {
        '"' => Some('"'),
        '\\' => Some('\\'),
        '{' => Some('{'),
        'n' => Some('\n'),
        't' => Some('\t'),
        _ => None,
    }
}

#[test]
fn test_keywords() {
    let kinds: Vec<TokenKind> = Lexer::new("and or true false nil")
        .scan_tokens()
        .tokens
        .into_iter()
        .map(|t| t.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::And,
            TokenKind::Or,
            TokenKind::True,
            TokenKind::False,
            TokenKind::Nil,
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_interpolation_resumes_after_brace() {
    let result = Lexer::new("\"a${x}b\"").scan_tokens();
    assert!(result.errors.is_empty());
    let kinds: Vec<TokenKind> = result.tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::StringStart,
            TokenKind::String,
            TokenKind::InterpStart,
            TokenKind::Identifier,
            TokenKind::InterpEnd,
            TokenKind::String,
            TokenKind::StringEnd,
            TokenKind::Eof
        ]
    );
    assert_eq!(result.tokens[5].literal, Some(Literal::String("b".into())));
}
