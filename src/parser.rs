use std::mem;
use std::rc::Rc;

use thiserror::Error;

use crate::{
    ast::{
        BinOp, Expr, ExprId, FunctionDecl, Literal, LiteralValue, Location, LogicalOp, Statement,
        Token, TokenKind, UnaryOp,
    },
    precedence::OperatorTable,
    stack::ensure_sufficient_stack,
};

/// Maximum number of arguments in a call, and of parameters in a declaration.
pub const MAX_ARGUMENTS: usize = 255;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// A required token was missing
    #[error("{message}")]
    Expected {
        message: &'static str,
        found: String,
        location: Location,
    },

    #[error("Unexpected token '{found}'.")]
    UnexpectedToken { found: String, location: Location },

    #[error("Invalid assignment target, expected identifier on left hand side of '='.")]
    InvalidAssignmentTarget { location: Location },

    #[error("Can't have more than {MAX_ARGUMENTS} arguments.")]
    TooManyArguments { location: Location },

    #[error("Can't have more than {MAX_ARGUMENTS} parameters.")]
    TooManyParameters { location: Location },

    /// `class`, `this` and `super` are reserved for an object system that
    /// does not exist yet
    #[error("Classes are not supported.")]
    Unsupported { keyword: String, location: Location },
}

impl ParseError {
    pub fn location(&self) -> Location {
        match self {
            ParseError::Expected { location, .. }
            | ParseError::UnexpectedToken { location, .. }
            | ParseError::InvalidAssignmentTarget { location }
            | ParseError::TooManyArguments { location }
            | ParseError::TooManyParameters { location }
            | ParseError::Unsupported { location, .. } => *location,
        }
    }

    fn unexpected(token: &Token) -> Self {
        ParseError::UnexpectedToken {
            found: describe(token),
            location: token.location,
        }
    }
}

fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::Eof => "end of input".to_string(),
        _ => token.lexeme.clone(),
    }
}

/// Precedence-climbing parser over a token list.
///
/// Statements use recursive descent; expressions use binding powers looked up
/// in the [`OperatorTable`] handed to [`Parser::new`].
pub struct Parser<'t> {
    tokens: Vec<Token>,
    current: usize,
    operators: &'t OperatorTable,
    next_id: u32,
    errors: Vec<ParseError>,
}

impl<'t> Parser<'t> {
    pub fn new(mut tokens: Vec<Token>, operators: &'t OperatorTable) -> Self {
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let location = tokens.last().map(|t| t.location).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", None, location));
        }
        Parser {
            tokens,
            current: 0,
            operators,
            next_id: 0,
            errors: Vec::new(),
        }
    }

    /// Starts numbering `Variable`/`Assign` nodes at `first`. An interpreter
    /// session uses this to keep ids unique across successive programs.
    pub fn with_first_id(mut self, first: ExprId) -> Self {
        self.next_id = first.0;
        self
    }

    /// The id the next `Variable`/`Assign` node would receive.
    pub fn next_id(&self) -> ExprId {
        ExprId(self.next_id)
    }

    fn fresh_id(&mut self) -> ExprId {
        let id = ExprId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Parses a whole program.
    ///
    /// Errors do not stop the parse: the parser skips to the next statement
    /// boundary and keeps going, so every independent syntax error is
    /// returned.
    pub fn parse(&mut self) -> Result<Vec<Statement>, Vec<ParseError>> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        if self.errors.is_empty() {
            Ok(statements)
        } else {
            Err(mem::take(&mut self.errors))
        }
    }

    /// Parses a single expression that must span all tokens.
    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let expr = self.expression()?;
        if !self.is_at_end() {
            return Err(ParseError::unexpected(self.peek()));
        }
        match self.errors.pop() {
            Some(err) => Err(err),
            None => Ok(expr),
        }
    }

    // ------------------------------------------------------------------
    // Token cursor
    // ------------------------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
            self.previous().clone()
        } else {
            self.peek().clone()
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &'static str) -> Result<Token, ParseError> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        let token = self.peek();
        Err(ParseError::Expected {
            message,
            found: describe(token),
            location: token.location,
        })
    }

    /// Discards tokens until a statement boundary: just after a `;`, or at a
    /// keyword that starts a statement.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }

            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn declaration(&mut self) -> Option<Statement> {
        let result = ensure_sufficient_stack(|| {
            if self.match_kind(TokenKind::Var) {
                self.var_declaration()
            } else if self.match_kind(TokenKind::Fun) {
                self.function_declaration()
            } else if self.check(TokenKind::Class) {
                let token = self.peek();
                Err(ParseError::Unsupported {
                    keyword: token.lexeme.clone(),
                    location: token.location,
                })
            } else {
                self.statement()
            }
        });

        match result {
            Ok(stmt) => Some(stmt),
            Err(err) => {
                self.errors.push(err);
                self.synchronize();
                None
            }
        }
    }

    fn statement(&mut self) -> Result<Statement, ParseError> {
        match self.peek().kind {
            TokenKind::Print => {
                self.advance();
                self.print_statement()
            }
            TokenKind::LeftBrace => {
                self.advance();
                Ok(Statement::Block(self.block()?))
            }
            TokenKind::If => {
                self.advance();
                self.if_statement()
            }
            TokenKind::While => {
                self.advance();
                self.while_statement()
            }
            TokenKind::For => {
                self.advance();
                self.for_statement()
            }
            TokenKind::Break => {
                let keyword = self.advance();
                self.consume(TokenKind::Semicolon, "Expect ';' after 'break'.")?;
                Ok(Statement::Break(keyword))
            }
            TokenKind::Continue => {
                let keyword = self.advance();
                self.consume(TokenKind::Semicolon, "Expect ';' after 'continue'.")?;
                Ok(Statement::Continue(keyword))
            }
            TokenKind::Return => {
                let keyword = self.advance();
                self.return_statement(keyword)
            }
            _ => self.expression_statement(),
        }
    }

    fn var_declaration(&mut self) -> Result<Statement, ParseError> {
        let name = self.consume(TokenKind::Identifier, "Expect variable name.")?;

        let initializer = if self.match_kind(TokenKind::Equal) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenKind::Semicolon,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Statement::Var { name, initializer })
    }

    fn function_declaration(&mut self) -> Result<Statement, ParseError> {
        let name = self.consume(TokenKind::Identifier, "Expect function name.")?;
        self.consume(TokenKind::LeftParen, "Expect '(' after function name.")?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= MAX_ARGUMENTS {
                    self.errors.push(ParseError::TooManyParameters {
                        location: self.peek().location,
                    });
                }
                params.push(self.consume(TokenKind::Identifier, "Expect parameter name.")?);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.")?;

        self.consume(TokenKind::LeftBrace, "Expect '{' before function body.")?;
        let body = self.block()?;

        Ok(Statement::Function(Rc::new(FunctionDecl { name, params, body })))
    }

    /// Parses the statements of a block; the `{` is already consumed.
    fn block(&mut self) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();

        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        self.consume(TokenKind::RightBrace, "Expect '}' at end of block.")?;
        Ok(statements)
    }

    fn print_statement(&mut self) -> Result<Statement, ParseError> {
        let value = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
        Ok(Statement::Print(value))
    }

    fn expression_statement(&mut self) -> Result<Statement, ParseError> {
        let value = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
        Ok(Statement::Expression(value))
    }

    fn if_statement(&mut self) -> Result<Statement, ParseError> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_kind(TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Statement, ParseError> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after condition.")?;

        let body = Box::new(self.statement()?);
        Ok(Statement::While {
            condition,
            body,
            increment: None,
        })
    }

    /// Desugars `for (init; condition; update) body` into
    /// `{ init; while (condition) body }` with `update` attached to the loop
    /// so it also runs after a `continue`.
    fn for_statement(&mut self) -> Result<Statement, ParseError> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_kind(TokenKind::Semicolon) {
            None
        } else if self.match_kind(TokenKind::Var) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if self.check(TokenKind::Semicolon) {
            Expr::Literal(LiteralValue::Boolean(true))
        } else {
            self.expression()?
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if self.check(TokenKind::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::RightParen, "Expect ')' after for clauses.")?;

        let body = Box::new(self.statement()?);
        let looped = Statement::While {
            condition,
            body,
            increment,
        };

        Ok(match initializer {
            Some(init) => Statement::Block(vec![init, looped]),
            None => looped,
        })
    }

    fn return_statement(&mut self, keyword: Token) -> Result<Statement, ParseError> {
        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after return value.")?;
        Ok(Statement::Return { keyword, value })
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.expr_bp(0)
    }

    /// Parses an expression whose operators all bind at least as tightly as
    /// `min_bp`.
    fn expr_bp(&mut self, min_bp: u16) -> Result<Expr, ParseError> {
        ensure_sufficient_stack(|| {
            let mut lhs = self.parse_primary()?;

            loop {
                let kind = self.peek().kind;
                if kind == TokenKind::Eof {
                    break;
                }

                if let Some(op) = self.operators.postfix(kind) {
                    if op.lbp.unwrap_or(0) < min_bp {
                        break;
                    }
                    self.advance();
                    lhs = self.parse_postfix(kind, lhs)?;
                    continue;
                }

                let Some(op) = self.operators.infix(kind) else {
                    break;
                };
                let (Some(lbp), Some(rbp)) = (op.lbp, op.rbp) else {
                    break;
                };
                if lbp < min_bp {
                    break;
                }

                let operator = self.advance();
                lhs = self.parse_infix(lhs, operator, rbp)?;
            }

            Ok(lhs)
        })
    }

    /// Parse primary expressions: literals, names, groups, prefix operators,
    /// strings and interpolation markers.
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Class | TokenKind::This | TokenKind::Super => {
                return Err(ParseError::Unsupported {
                    keyword: token.lexeme,
                    location: token.location,
                });
            }
            TokenKind::Number
            | TokenKind::String
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Nil
            | TokenKind::Identifier
            | TokenKind::LeftParen
            | TokenKind::InterpStart
            | TokenKind::StringStart => {}
            kind if self.operators.prefix(kind).is_some() => {}
            _ => return Err(ParseError::unexpected(&token)),
        }
        self.advance();

        let expr = match token.kind {
            TokenKind::Number => match token.literal {
                Some(Literal::Number(n)) => Expr::Literal(LiteralValue::Number(n)),
                _ => return Err(ParseError::unexpected(&token)),
            },
            TokenKind::String => match token.literal {
                Some(Literal::String(s)) => Expr::Literal(LiteralValue::String(s)),
                _ => return Err(ParseError::unexpected(&token)),
            },
            TokenKind::True => Expr::Literal(LiteralValue::Boolean(true)),
            TokenKind::False => Expr::Literal(LiteralValue::Boolean(false)),
            TokenKind::Nil => Expr::Literal(LiteralValue::Nil),
            TokenKind::Identifier => Expr::Variable {
                id: self.fresh_id(),
                name: token,
            },
            TokenKind::LeftParen => {
                let inner = self.expression()?;
                self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;
                Expr::Grouping(Box::new(inner))
            }
            TokenKind::InterpStart => {
                let inner = self.expression()?;
                self.consume(
                    TokenKind::InterpEnd,
                    "Expect '}' after interpolated expression.",
                )?;
                Expr::TemplateLiteral(Box::new(inner))
            }
            TokenKind::StringStart => self.parse_string()?,
            kind => {
                let (Some(op), Some(unary)) =
                    (self.operators.prefix(kind), UnaryOp::from_token(kind))
                else {
                    return Err(ParseError::unexpected(&token));
                };
                let right = self.expr_bp(op.rbp.unwrap_or(0))?;
                Expr::Unary {
                    op: unary,
                    operator: token,
                    right: Box::new(right),
                }
            }
        };

        Ok(expr)
    }

    /// Assembles a `StringStart .. StringEnd` run. Without interpolation the
    /// run collapses into a single string literal.
    fn parse_string(&mut self) -> Result<Expr, ParseError> {
        let mut parts = Vec::new();
        let mut is_template = false;

        while !self.match_kind(TokenKind::StringEnd) {
            if self.is_at_end() {
                return Err(ParseError::Expected {
                    message: "Expect '\"' at end of string.",
                    found: describe(self.peek()),
                    location: self.peek().location,
                });
            }
            let part = self.expression()?;
            if matches!(part, Expr::TemplateLiteral(_)) {
                is_template = true;
            }
            parts.push(part);
        }

        if is_template {
            return Ok(Expr::StringTemplate(parts));
        }

        let mut text = String::new();
        for part in parts {
            match part {
                Expr::Literal(LiteralValue::String(s)) => text.push_str(&s),
                _ => return Err(ParseError::unexpected(self.previous())),
            }
        }
        Ok(Expr::Literal(LiteralValue::String(text)))
    }

    /// Finishes a postfix operator whose token was just consumed.
    fn parse_postfix(&mut self, kind: TokenKind, lhs: Expr) -> Result<Expr, ParseError> {
        match kind {
            TokenKind::LeftParen => self.finish_call(lhs),
            TokenKind::LeftSquare => {
                let index = self.expression()?;
                let bracket =
                    self.consume(TokenKind::RightSquare, "Expect ']' after array index.")?;
                Ok(Expr::ArrayAccess {
                    array: Box::new(lhs),
                    bracket,
                    index: Box::new(index),
                })
            }
            _ => Err(ParseError::unexpected(self.previous())),
        }
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr, ParseError> {
        let mut arguments = Vec::new();

        if !self.check(TokenKind::RightParen) {
            // Arguments bind tighter than the comma operator
            let min_bp = self.operators.infix_lbp(TokenKind::Comma) + 1;
            loop {
                if arguments.len() >= MAX_ARGUMENTS {
                    self.errors.push(ParseError::TooManyArguments {
                        location: self.peek().location,
                    });
                }
                arguments.push(self.expr_bp(min_bp)?);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }

        let paren = self.consume(TokenKind::RightParen, "Expect ')' after arguments.")?;
        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    /// Finishes an infix operator whose token was just consumed.
    fn parse_infix(&mut self, lhs: Expr, operator: Token, rbp: u16) -> Result<Expr, ParseError> {
        match operator.kind {
            TokenKind::QuestionMark => {
                let then_branch = self.expression()?;
                self.consume(TokenKind::Colon, "Expect ':' in ternary expression.")?;
                let else_branch = self.expr_bp(rbp)?;
                Ok(Expr::Ternary {
                    condition: Box::new(lhs),
                    question: operator,
                    then_branch: Box::new(then_branch),
                    else_branch: Box::new(else_branch),
                })
            }
            TokenKind::Equal => {
                let Expr::Variable { name, .. } = lhs else {
                    return Err(ParseError::InvalidAssignmentTarget {
                        location: operator.location,
                    });
                };
                let value = self.expr_bp(rbp)?;
                Ok(Expr::Assign {
                    id: self.fresh_id(),
                    name,
                    value: Box::new(value),
                })
            }
            kind => {
                let right = Box::new(self.expr_bp(rbp)?);
                let left = Box::new(lhs);
                if let Some(op) = LogicalOp::from_token(kind) {
                    return Ok(Expr::Logical {
                        left,
                        op,
                        operator,
                        right,
                    });
                }
                match BinOp::from_token(kind) {
                    Some(op) => Ok(Expr::Binary {
                        left,
                        op,
                        operator,
                        right,
                    }),
                    None => Err(ParseError::unexpected(&operator)),
                }
            }
        }
    }
}
