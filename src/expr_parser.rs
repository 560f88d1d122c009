// SPDX-License-Identifier: Apache-2.0

//! Recursive-descent parser for constraint expressions.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! or_expr   ::= and_expr (("or" | "||") and_expr)*
//! and_expr  ::= not_expr (("and" | "&&") not_expr)*
//! not_expr  ::= ("not" | "!") not_expr | cmp_expr
//! cmp_expr  ::= add_expr (("<=" | "<" | ">=" | ">" | "==" | "!=") add_expr)*
//! add_expr  ::= mul_expr (("+" | "-") mul_expr)*
//! mul_expr  ::= unary (("*" | "/") unary)*
//! unary     ::= ("-" | "+") unary | primary
//! primary   ::= number | identifier | "(" or_expr ")"
//! ```
//!
//! The parser is deliberately untyped: `x0 + (x1 < 2)` parses fine and is
//! rejected later by the lowering pass, which produces a better diagnostic
//! than a grammar-level failure would.

use crate::expr::{BinOp, Expr, UnaryOp};

/// Parses a complete expression, requiring that the whole input is consumed.
pub fn parse_expression(input: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(input);
    let expr = parser.parse_or_expr()?;
    if !parser.at_eof() {
        return Err(ParseError::new(format!(
            "unexpected trailing input: {:?}",
            parser.rest()
        )));
    }
    Ok(expr)
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseError {
    msg: String,
}

impl ParseError {
    fn new(msg: String) -> Self {
        Self { msg }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl std::error::Error for ParseError {}

pub struct Parser {
    chars: Vec<char>,
    offset: usize,
}

impl Parser {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            offset: 0,
        }
    }

    fn rest(&self) -> String {
        self.chars[self.offset..].iter().collect::<String>()
    }

    fn at_eof(&mut self) -> bool {
        self.drop_whitespace();
        self.offset >= self.chars.len()
    }

    fn drop_whitespace(&mut self) {
        while let Some(c) = self.peekc() {
            if c == ' ' || c == '\t' || c == '\r' || c == '\n' {
                self.offset += 1;
            } else {
                break;
            }
        }
    }

    fn peekc(&self) -> Option<char> {
        self.chars.get(self.offset).copied()
    }

    fn popc(&mut self) -> Option<char> {
        let c = self.peekc();
        self.offset += 1;
        c
    }

    fn peek_is(&self, s: &str) -> bool {
        for (i, c) in s.chars().enumerate() {
            let char_index = self.offset + i;
            if char_index >= self.chars.len() {
                return false;
            }
            if self.chars[char_index] != c {
                return false;
            }
        }
        true
    }

    fn try_drop(&mut self, s: &str) -> bool {
        self.drop_whitespace();
        if self.peek_is(s) {
            self.offset += s.chars().count();
            true
        } else {
            false
        }
    }

    fn is_ident_start(c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_'
    }

    fn is_ident_rest(c: char) -> bool {
        Self::is_ident_start(c) || c.is_ascii_digit()
    }

    fn peek_keyword_is(&self, kw: &str) -> bool {
        if !self.peek_is(kw) {
            return false;
        }
        let next_index = self.offset + kw.chars().count();
        if next_index >= self.chars.len() {
            return true;
        }
        !Self::is_ident_rest(self.chars[next_index])
    }

    fn try_drop_keyword(&mut self, kw: &str) -> bool {
        self.drop_whitespace();
        if self.peek_keyword_is(kw) {
            self.offset += kw.chars().count();
            true
        } else {
            false
        }
    }

    fn drop_or_error(&mut self, s: &str, ctx: &str) -> Result<(), ParseError> {
        if self.try_drop(s) {
            Ok(())
        } else {
            Err(ParseError::new(format!(
                "expected {:?} in {}; rest: {:?}",
                s,
                ctx,
                self.rest()
            )))
        }
    }

    fn pop_identifier_or_error(&mut self) -> Result<String, ParseError> {
        self.drop_whitespace();
        let mut identifier = String::new();
        while let Some(c) = self.peekc() {
            let valid = if identifier.is_empty() {
                Self::is_ident_start(c)
            } else {
                Self::is_ident_rest(c)
            };
            if !valid {
                break;
            }
            self.popc();
            identifier.push(c);
        }
        if identifier.is_empty() {
            return Err(ParseError::new(format!(
                "expected identifier; rest: {:?}",
                self.rest()
            )));
        }
        Ok(identifier)
    }

    /// Pops a decimal float literal: digits, optional fraction, optional
    /// exponent. The exponent marker is only consumed when a well-formed
    /// exponent actually follows, so `1e` parses as the number `1` followed
    /// by the identifier `e`.
    fn pop_number_or_error(&mut self) -> Result<f64, ParseError> {
        self.drop_whitespace();
        let mut text = String::new();
        while let Some(c) = self.peekc() {
            if c.is_ascii_digit() {
                text.push(c);
                self.popc();
            } else {
                break;
            }
        }
        if self.peek_is(".") {
            text.push('.');
            self.popc();
            while let Some(c) = self.peekc() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.popc();
                } else {
                    break;
                }
            }
        }
        if let Some(marker) = self.peekc() {
            if marker == 'e' || marker == 'E' {
                let mut lookahead = self.offset + 1;
                if matches!(self.chars.get(lookahead), Some('+') | Some('-')) {
                    lookahead += 1;
                }
                if matches!(self.chars.get(lookahead), Some(c) if c.is_ascii_digit()) {
                    text.push(marker);
                    self.popc();
                    if let Some(sign) = self.peekc() {
                        if sign == '+' || sign == '-' {
                            text.push(sign);
                            self.popc();
                        }
                    }
                    while let Some(c) = self.peekc() {
                        if c.is_ascii_digit() {
                            text.push(c);
                            self.popc();
                        } else {
                            break;
                        }
                    }
                }
            }
        }
        if text.is_empty() {
            return Err(ParseError::new(format!(
                "expected number; rest: {:?}",
                self.rest()
            )));
        }
        text.parse::<f64>().map_err(|e| {
            ParseError::new(format!("invalid numeric literal {:?}: {}", text, e))
        })
    }

    pub fn parse_or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_and_expr()?;
        loop {
            if self.try_drop_keyword("or") || self.try_drop("||") {
                let rhs = self.parse_and_expr()?;
                lhs = Expr::binary(BinOp::Or, lhs, rhs);
            } else {
                return Ok(lhs);
            }
        }
    }

    fn parse_and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_not_expr()?;
        loop {
            if self.try_drop_keyword("and") || self.try_drop("&&") {
                let rhs = self.parse_not_expr()?;
                lhs = Expr::binary(BinOp::And, lhs, rhs);
            } else {
                return Ok(lhs);
            }
        }
    }

    fn parse_not_expr(&mut self) -> Result<Expr, ParseError> {
        self.drop_whitespace();
        if self.try_drop_keyword("not") {
            let operand = self.parse_not_expr()?;
            return Ok(Expr::unary(UnaryOp::Not, operand));
        }
        // A lone '!' is negation; "!=" belongs to the comparison level.
        if self.peek_is("!") && !self.peek_is("!=") {
            self.popc();
            let operand = self.parse_not_expr()?;
            return Ok(Expr::unary(UnaryOp::Not, operand));
        }
        self.parse_cmp_expr()
    }

    fn parse_cmp_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_add_expr()?;
        loop {
            // Two-character operators must be tried before their prefixes.
            let op = if self.try_drop("<=") {
                BinOp::Le
            } else if self.try_drop(">=") {
                BinOp::Ge
            } else if self.try_drop("==") {
                BinOp::Eq
            } else if self.try_drop("!=") {
                BinOp::Ne
            } else if self.try_drop("<") {
                BinOp::Lt
            } else if self.try_drop(">") {
                BinOp::Gt
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_add_expr()?;
            // Chained comparisons parse left-associated here and are
            // rejected with a targeted message during lowering.
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn parse_add_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_mul_expr()?;
        loop {
            let op = if self.try_drop("+") {
                BinOp::Add
            } else if self.try_drop("-") {
                BinOp::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_mul_expr()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn parse_mul_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary_expr()?;
        loop {
            let op = if self.try_drop("*") {
                BinOp::Mul
            } else if self.try_drop("/") {
                BinOp::Div
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_unary_expr()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, ParseError> {
        if self.try_drop("-") {
            let operand = self.parse_unary_expr()?;
            return Ok(Expr::unary(UnaryOp::Neg, operand));
        }
        // Unary plus is accepted and dropped.
        if self.try_drop("+") {
            return self.parse_unary_expr();
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        self.drop_whitespace();
        if self.try_drop("(") {
            let inner = self.parse_or_expr()?;
            self.drop_or_error(")", "parenthesized expression")?;
            return Ok(inner);
        }
        match self.peekc() {
            Some(c) if c.is_ascii_digit() || c == '.' => {
                let value = self.pop_number_or_error()?;
                Ok(Expr::Number(value))
            }
            Some(c) if Self::is_ident_start(c) => {
                let name = self.pop_identifier_or_error()?;
                if name == "and" || name == "or" || name == "not" {
                    return Err(ParseError::new(format!(
                        "keyword {:?} cannot be used as an operand; rest: {:?}",
                        name,
                        self.rest()
                    )));
                }
                Ok(Expr::Var(name))
            }
            Some(c) => Err(ParseError::new(format!(
                "expected expression, got {:?}; rest: {:?}",
                c,
                self.rest()
            ))),
            None => Err(ParseError::new("expected expression, got EOF".to_string())),
        }
    }
}
