use std::fmt;

/// Position of a token or error in the source text.
///
/// `offset` is a byte offset; `line` and `column` start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(offset: usize, line: u32, column: u32) -> Self {
        Location {
            offset,
            line,
            column,
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Location::new(0, 1, 1)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}, col {}]", self.line, self.column)
    }
}

/// Kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Single-character punctuation
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftSquare,
    RightSquare,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,
    /// `?`, first half of the ternary operator
    QuestionMark,
    /// `:`, second half of the ternary operator
    Colon,

    // One or two character operators
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Literals
    Identifier,
    /// A literal segment of a string. Its literal value has escapes applied.
    String,
    Number,

    // String structure
    /// Opening `"` of a string literal
    StringStart,
    /// Closing `"` of a string literal
    StringEnd,
    /// `${` opening an embedded expression
    InterpStart,
    /// `}` closing an embedded expression
    InterpEnd,

    // Keywords
    And,
    Break,
    Class,
    Continue,
    Else,
    False,
    Fun,
    For,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    /// End of input
    Eof,
}

impl TokenKind {
    /// Looks up the keyword spelled by `ident`.
    pub fn keyword(ident: &str) -> Option<TokenKind> {
        let kind = match ident {
            "and" => TokenKind::And,
            "break" => TokenKind::Break,
            "class" => TokenKind::Class,
            "continue" => TokenKind::Continue,
            "else" => TokenKind::Else,
            "false" => TokenKind::False,
            "for" => TokenKind::For,
            "fun" => TokenKind::Fun,
            "if" => TokenKind::If,
            "nil" => TokenKind::Nil,
            "or" => TokenKind::Or,
            "print" => TokenKind::Print,
            "return" => TokenKind::Return,
            "super" => TokenKind::Super,
            "this" => TokenKind::This,
            "true" => TokenKind::True,
            "var" => TokenKind::Var,
            "while" => TokenKind::While,
            _ => return None,
        };
        Some(kind)
    }
}

/// Literal payload carried by `Number` and `String` tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
}

/// A token produced by the lexer. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text the token was scanned from
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub location: Location,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        lexeme: impl Into<String>,
        literal: Option<Literal>,
        location: Location,
    ) -> Self {
        Token {
            kind,
            lexeme: lexeme.into(),
            literal,
            location,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.literal {
            Some(Literal::Number(n)) => write!(f, "{:?} {} {}", self.kind, self.lexeme, n),
            Some(Literal::String(s)) => write!(f, "{:?} {} {:?}", self.kind, self.lexeme, s),
            None => write!(f, "{:?} {}", self.kind, self.lexeme),
        }
    }
}
