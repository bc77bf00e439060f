//! Recursive-descent parser for the filter DSL (§4.5). Side-effect free:
//! identifiers are validated as they're consumed so the compiler can walk
//! the resulting AST and collect params without re-checking anything.

use super::ast::{CompareOp, Expr, Literal};
use super::lexer::{Lexer, Token, TokenKind};
use crate::error::FaucetError;
use crate::identifier::validate_identifier_at;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn parse(input: &str) -> Result<Expr, FaucetError> {
        let tokens = Lexer::new(input).tokenize()?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        parser.expect_eof()?;
        Ok(expr)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn expect_eof(&self) -> Result<(), FaucetError> {
        if matches!(self.peek().kind, TokenKind::Eof) {
            Ok(())
        } else {
            Err(parse_error("trailing input after expression", self.peek().position))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, FaucetError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek().kind, TokenKind::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, FaucetError> {
        let mut left = self.parse_not()?;
        while matches!(self.peek().kind, TokenKind::And) {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, FaucetError> {
        if matches!(self.peek().kind, TokenKind::Not) {
            self.advance();
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, FaucetError> {
        if matches!(self.peek().kind, TokenKind::LParen) {
            self.advance();
            let expr = self.parse_or()?;
            self.expect(TokenKind::RParen, "expected ')'")?;
            return Ok(expr);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, FaucetError> {
        let ident_token = self.advance();
        let ident = match ident_token.kind {
            TokenKind::Ident(name) => {
                validate_identifier_at(&name, ident_token.position)?;
                name
            }
            _ => {
                return Err(parse_error(
                    "expected an identifier",
                    ident_token.position,
                ));
            }
        };

        match &self.peek().kind {
            TokenKind::In => {
                self.advance();
                self.expect(TokenKind::LParen, "expected '(' after IN")?;
                let mut values = Vec::new();
                loop {
                    values.push(self.parse_literal()?);
                    if matches!(self.peek().kind, TokenKind::Comma) {
                        self.advance();
                        continue;
                    }
                    break;
                }
                self.expect(TokenKind::RParen, "expected ')' to close IN list")?;
                Ok(Expr::In { ident, values })
            }
            TokenKind::Is => {
                self.advance();
                let negated = if matches!(self.peek().kind, TokenKind::Not) {
                    self.advance();
                    true
                } else {
                    false
                };
                self.expect(TokenKind::Null, "expected NULL after IS")?;
                Ok(Expr::IsNull { ident, negated })
            }
            TokenKind::Between => {
                self.advance();
                let low = self.parse_literal()?;
                self.expect(TokenKind::And, "expected AND in BETWEEN")?;
                let high = self.parse_literal()?;
                Ok(Expr::Between { ident, low, high })
            }
            TokenKind::Not => {
                self.advance();
                self.expect(TokenKind::Like, "expected LIKE after NOT")?;
                let pattern = self.expect_string("expected string literal after LIKE")?;
                Ok(Expr::Like {
                    ident,
                    pattern,
                    negated: true,
                })
            }
            TokenKind::Like => {
                self.advance();
                let pattern = self.expect_string("expected string literal after LIKE")?;
                Ok(Expr::Like {
                    ident,
                    pattern,
                    negated: false,
                })
            }
            TokenKind::Contains => {
                self.advance();
                let substring = self.expect_string("expected string literal after CONTAINS")?;
                Ok(Expr::Contains { ident, substring })
            }
            TokenKind::Eq
            | TokenKind::NotEq
            | TokenKind::Lt
            | TokenKind::Lte
            | TokenKind::Gt
            | TokenKind::Gte => {
                let op = self.parse_op();
                let value = self.parse_literal()?;
                Ok(Expr::Compare { ident, op, value })
            }
            _ => Err(parse_error(
                "expected a comparison operator, IN, IS, BETWEEN, LIKE or CONTAINS",
                self.peek().position,
            )),
        }
    }

    fn parse_op(&mut self) -> CompareOp {
        match self.advance().kind {
            TokenKind::Eq => CompareOp::Eq,
            TokenKind::NotEq => CompareOp::NotEq,
            TokenKind::Lt => CompareOp::Lt,
            TokenKind::Lte => CompareOp::Lte,
            TokenKind::Gt => CompareOp::Gt,
            TokenKind::Gte => CompareOp::Gte,
            _ => unreachable!("caller only dispatches on comparison-operator tokens"),
        }
    }

    fn parse_literal(&mut self) -> Result<Literal, FaucetError> {
        let token = self.advance();
        match token.kind {
            TokenKind::String(s) => Ok(Literal::String(s)),
            TokenKind::Number(n) => Ok(Literal::Number(n)),
            TokenKind::True => Ok(Literal::Bool(true)),
            TokenKind::False => Ok(Literal::Bool(false)),
            TokenKind::Null => Ok(Literal::Null),
            _ => Err(parse_error("expected a literal value", token.position)),
        }
    }

    fn expect_string(&mut self, message: &str) -> Result<String, FaucetError> {
        let token = self.advance();
        match token.kind {
            TokenKind::String(s) => Ok(s),
            _ => Err(parse_error(message, token.position)),
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<(), FaucetError> {
        if self.peek().kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(parse_error(message, self.peek().position))
        }
    }
}

fn parse_error(message: impl Into<String>, position: usize) -> FaucetError {
    FaucetError::invalid_argument_at(message.into(), position)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_comparison() {
        let expr = Parser::parse("age > 21").unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                ident: "age".into(),
                op: CompareOp::Gt,
                value: Literal::Number(21.0),
            }
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = Parser::parse("a = 1 OR b = 2 AND c = 3").unwrap();
        match expr {
            Expr::Or(lhs, rhs) => {
                assert!(matches!(*lhs, Expr::Compare { .. }));
                assert!(matches!(*rhs, Expr::And(_, _)));
            }
            other => panic!("expected Or at top level, got {other:?}"),
        }
    }

    #[test]
    fn not_binds_tighter_than_and() {
        let expr = Parser::parse("NOT a = 1 AND b = 2").unwrap();
        match expr {
            Expr::And(lhs, _) => assert!(matches!(*lhs, Expr::Not(_))),
            other => panic!("expected And at top level, got {other:?}"),
        }
    }

    #[test]
    fn parentheses_override_precedence() {
        let expr = Parser::parse("a = 1 AND (b = 2 OR c = 3)").unwrap();
        match expr {
            Expr::And(_, rhs) => assert!(matches!(*rhs, Expr::Or(_, _))),
            other => panic!("expected And at top level, got {other:?}"),
        }
    }

    #[test]
    fn parses_in_list() {
        let expr = Parser::parse("status IN ('active', 'pending')").unwrap();
        match expr {
            Expr::In { ident, values } => {
                assert_eq!(ident, "status");
                assert_eq!(values.len(), 2);
            }
            other => panic!("expected In, got {other:?}"),
        }
    }

    #[test]
    fn parses_is_not_null() {
        let expr = Parser::parse("deleted_at IS NOT NULL").unwrap();
        assert_eq!(
            expr,
            Expr::IsNull {
                ident: "deleted_at".into(),
                negated: true,
            }
        );
    }

    #[test]
    fn parses_between() {
        let expr = Parser::parse("age BETWEEN 18 AND 65").unwrap();
        assert_eq!(
            expr,
            Expr::Between {
                ident: "age".into(),
                low: Literal::Number(18.0),
                high: Literal::Number(65.0),
            }
        );
    }

    #[test]
    fn parses_contains() {
        let expr = Parser::parse("name CONTAINS 'abc'").unwrap();
        assert_eq!(
            expr,
            Expr::Contains {
                ident: "name".into(),
                substring: "abc".into(),
            }
        );
    }

    #[test]
    fn rejects_bad_identifier_with_position() {
        let err = Parser::parse("users; DROP = 1").unwrap_err();
        assert!(err.position().is_some());
    }

    #[test]
    fn rejects_missing_operand() {
        assert!(Parser::parse("age >").is_err());
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(Parser::parse("age = 1 extra").is_err());
    }
}
