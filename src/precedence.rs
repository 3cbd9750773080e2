//! Operator precedence table consumed by the parser.
//!
//! Operators are registered weakest first. Each registration takes the next
//! one or two values from a counter, so precedence levels never collide and
//! the parser never hard-codes precedence:
//!
//! | shape          | left binding power | right binding power |
//! |----------------|--------------------|---------------------|
//! | left infix     | `n`                | `n + 1`             |
//! | right infix    | `n + 1`            | `n`                 |
//! | prefix         | none               | `n`                 |
//! | postfix        | `n`                | none                |
//!
//! Prefix and postfix registrations burn a second value so the next level
//! still starts on an odd number.

use std::collections::HashMap;

use crate::ast::TokenKind;

/// Binding powers of one operator. A missing side means the operator does
/// not take an operand there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operator {
    pub kind: TokenKind,
    pub lbp: Option<u16>,
    pub rbp: Option<u16>,
}

#[derive(Debug, Clone, Default)]
pub struct OperatorTable {
    infix: HashMap<TokenKind, Operator>,
    prefix: HashMap<TokenKind, Operator>,
    postfix: HashMap<TokenKind, Operator>,
}

impl OperatorTable {
    pub fn builder() -> OperatorTableBuilder {
        OperatorTableBuilder {
            power: 1,
            table: OperatorTable::default(),
        }
    }

    /// The language's operators, weakest to strongest.
    pub fn standard() -> Self {
        use TokenKind::*;

        Self::builder()
            .left_infix(&[Comma])
            .right_infix(&[Equal])
            .right_infix(&[QuestionMark])
            .left_infix(&[Or])
            .left_infix(&[And])
            .left_infix(&[BangEqual, EqualEqual])
            .left_infix(&[Greater, GreaterEqual, Less, LessEqual])
            .left_infix(&[Plus, Minus])
            .left_infix(&[Star, Slash])
            .prefix(&[Bang, Minus])
            .postfix(&[LeftSquare])
            .postfix(&[LeftParen])
            .build()
    }

    pub fn infix(&self, kind: TokenKind) -> Option<Operator> {
        self.infix.get(&kind).copied()
    }

    pub fn prefix(&self, kind: TokenKind) -> Option<Operator> {
        self.prefix.get(&kind).copied()
    }

    pub fn postfix(&self, kind: TokenKind) -> Option<Operator> {
        self.postfix.get(&kind).copied()
    }

    /// Left binding power of an infix operator, 0 when `kind` is not one.
    pub fn infix_lbp(&self, kind: TokenKind) -> u16 {
        self.infix(kind).and_then(|op| op.lbp).unwrap_or(0)
    }
}

pub struct OperatorTableBuilder {
    power: u16,
    table: OperatorTable,
}

impl OperatorTableBuilder {
    fn next_power(&mut self) -> u16 {
        let power = self.power;
        self.power += 1;
        power
    }

    pub fn left_infix(mut self, kinds: &[TokenKind]) -> Self {
        let lbp = self.next_power();
        let rbp = self.next_power();
        for &kind in kinds {
            self.table.infix.insert(
                kind,
                Operator {
                    kind,
                    lbp: Some(lbp),
                    rbp: Some(rbp),
                },
            );
        }
        self
    }

    pub fn right_infix(mut self, kinds: &[TokenKind]) -> Self {
        let rbp = self.next_power();
        let lbp = self.next_power();
        for &kind in kinds {
            self.table.infix.insert(
                kind,
                Operator {
                    kind,
                    lbp: Some(lbp),
                    rbp: Some(rbp),
                },
            );
        }
        self
    }

    pub fn prefix(mut self, kinds: &[TokenKind]) -> Self {
        let rbp = self.next_power();
        for &kind in kinds {
            self.table.prefix.insert(
                kind,
                Operator {
                    kind,
                    lbp: None,
                    rbp: Some(rbp),
                },
            );
        }
        self.next_power();
        self
    }

    pub fn postfix(mut self, kinds: &[TokenKind]) -> Self {
        let lbp = self.next_power();
        for &kind in kinds {
            self.table.postfix.insert(
                kind,
                Operator {
                    kind,
                    lbp: Some(lbp),
                    rbp: None,
                },
            );
        }
        self.next_power();
        self
    }

    pub fn build(self) -> OperatorTable {
        self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_increase_monotonically() {
        let table = OperatorTable::standard();
        let comma = table.infix(TokenKind::Comma).unwrap();
        let plus = table.infix(TokenKind::Plus).unwrap();
        let star = table.infix(TokenKind::Star).unwrap();

        assert_eq!((comma.lbp, comma.rbp), (Some(1), Some(2)));
        assert!(plus.lbp < star.lbp);
        assert!(plus.rbp < star.lbp);
    }

    #[test]
    fn test_right_associative_encoding() {
        let table = OperatorTable::standard();
        let assign = table.infix(TokenKind::Equal).unwrap();
        assert_eq!((assign.lbp, assign.rbp), (Some(4), Some(3)));
        assert!(assign.lbp > assign.rbp);
    }

    #[test]
    fn test_minus_is_both_prefix_and_infix() {
        let table = OperatorTable::standard();
        let prefix = table.prefix(TokenKind::Minus).unwrap();
        let infix = table.infix(TokenKind::Minus).unwrap();

        assert_eq!(prefix.lbp, None);
        assert!(prefix.rbp > infix.lbp);
    }

    #[test]
    fn test_postfix_binds_tightest() {
        let table = OperatorTable::standard();
        let call = table.postfix(TokenKind::LeftParen).unwrap();
        let index = table.postfix(TokenKind::LeftSquare).unwrap();
        let negate = table.prefix(TokenKind::Bang).unwrap();

        assert_eq!(call.rbp, None);
        assert!(index.lbp > negate.rbp);
        assert!(call.lbp > index.lbp);
    }

    #[test]
    fn test_non_operators_are_absent() {
        let table = OperatorTable::standard();
        assert!(table.infix(TokenKind::Semicolon).is_none());
        assert!(table.prefix(TokenKind::Plus).is_none());
        assert_eq!(table.infix_lbp(TokenKind::Identifier), 0);
    }
}
