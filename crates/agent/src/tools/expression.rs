//! Arithmetic expression evaluator
//!
//! Accepted characters: digits, `+ - * / ( ) .` and space. Grammar:
//!
//! ```text
//! expr   := term (("+" | "-") term)*
//! term   := unary (("*" | "/" | "//") unary)*
//! unary  := ("+" | "-") unary | power
//! power  := atom ("**" unary)?
//! atom   := number | "(" expr ")"
//! ```
//!
//! Integers stay integral until they overflow, `/` always yields a float.

use serde_json::Value;
use thiserror::Error;

const ALLOWED: &str = "0123456789+-*/(). ";
const MAX_DEPTH: usize = 200;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("invalid character '{0}' in expression")]
    InvalidCharacter(char),

    #[error("invalid syntax: {0}")]
    Syntax(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("0 cannot be raised to a negative power")]
    ZeroNegativePower,

    #[error("result is a complex number")]
    Complex,

    #[error("result is not a finite number")]
    NotFinite,

    #[error("expression is nested too deeply")]
    TooDeep,
}

/// Evaluated number
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Number::Int(i) => i == 0,
            Number::Float(f) => f == 0.0,
        }
    }

    pub fn to_json(self) -> Value {
        match self {
            Number::Int(i) => Value::from(i),
            Number::Float(f) => Value::from(f),
        }
    }
}

/// Reject any character outside the allow-list before parsing
pub fn check_characters(expression: &str) -> Result<(), ExprError> {
    match expression.chars().find(|c| !ALLOWED.contains(*c)) {
        Some(c) => Err(ExprError::InvalidCharacter(c)),
        None => Ok(()),
    }
}

/// Evaluate an arithmetic expression
pub fn evaluate(expression: &str) -> Result<Number, ExprError> {
    check_characters(expression)?;
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos < tokens.len() {
        return Err(ExprError::Syntax(format!(
            "unexpected '{}'",
            tokens[parser.pos]
        )));
    }
    match value {
        Number::Float(f) if !f.is_finite() => Err(ExprError::NotFinite),
        other => Ok(other),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(Number),
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    DoubleStar,
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Num(Number::Int(i)) => write!(f, "{}", i),
            Token::Num(Number::Float(x)) => write!(f, "{}", x),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::DoubleSlash => f.write_str("//"),
            Token::DoubleStar => f.write_str("**"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::DoubleStar);
                i += 2;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                tokens.push(Token::DoubleSlash);
                i += 2;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                tokens.push(Token::Num(parse_number(&literal)?));
            }
            other => return Err(ExprError::InvalidCharacter(other)),
        }
    }

    Ok(tokens)
}

fn parse_number(literal: &str) -> Result<Number, ExprError> {
    let invalid = || ExprError::Syntax(format!("invalid number '{}'", literal));

    if literal.contains('.') {
        if literal == "." || literal.matches('.').count() > 1 {
            return Err(invalid());
        }
        return literal.parse::<f64>().map(Number::Float).map_err(|_| invalid());
    }

    if literal.len() > 1 && literal.starts_with('0') && literal.chars().any(|c| c != '0') {
        return Err(ExprError::Syntax(
            "leading zeros in integer literals are not permitted".to_string(),
        ));
    }

    match literal.parse::<i64>() {
        Ok(i) => Ok(Number::Int(i)),
        Err(_) => literal.parse::<f64>().map(Number::Float).map_err(|_| invalid()),
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn enter(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            Err(ExprError::TooDeep)
        } else {
            Ok(())
        }
    }

    fn expr(&mut self) -> Result<Number, ExprError> {
        let mut left = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    left = add(left, self.term()?);
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    left = sub(left, self.term()?);
                }
                _ => return Ok(left),
            }
        }
    }

    fn term(&mut self) -> Result<Number, ExprError> {
        let mut left = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    left = mul(left, self.unary()?);
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    left = div(left, self.unary()?)?;
                }
                Some(Token::DoubleSlash) => {
                    self.pos += 1;
                    left = floor_div(left, self.unary()?)?;
                }
                _ => return Ok(left),
            }
        }
    }

    fn unary(&mut self) -> Result<Number, ExprError> {
        self.enter()?;
        let value = match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()?
            }
            Some(Token::Minus) => {
                self.pos += 1;
                negate(self.unary()?)
            }
            _ => self.power()?,
        };
        self.depth -= 1;
        Ok(value)
    }

    fn power(&mut self) -> Result<Number, ExprError> {
        let base = self.atom()?;
        if self.peek() == Some(&Token::DoubleStar) {
            self.pos += 1;
            let exponent = self.unary()?;
            return pow(base, exponent);
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Number, ExprError> {
        match self.advance() {
            Some(Token::Num(n)) => Ok(*n),
            Some(Token::LParen) => {
                self.enter()?;
                let value = self.expr()?;
                match self.advance() {
                    Some(Token::RParen) => {
                        self.depth -= 1;
                        Ok(value)
                    }
                    _ => Err(ExprError::Syntax("'(' was never closed".to_string())),
                }
            }
            Some(other) => Err(ExprError::Syntax(format!("unexpected '{}'", other))),
            None => Err(ExprError::Syntax("unexpected end of expression".to_string())),
        }
    }
}

fn add(a: Number, b: Number) -> Number {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_add(y)
            .map(Number::Int)
            .unwrap_or(Number::Float(x as f64 + y as f64)),
        _ => Number::Float(a.as_f64() + b.as_f64()),
    }
}

fn sub(a: Number, b: Number) -> Number {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_sub(y)
            .map(Number::Int)
            .unwrap_or(Number::Float(x as f64 - y as f64)),
        _ => Number::Float(a.as_f64() - b.as_f64()),
    }
}

fn mul(a: Number, b: Number) -> Number {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_mul(y)
            .map(Number::Int)
            .unwrap_or(Number::Float(x as f64 * y as f64)),
        _ => Number::Float(a.as_f64() * b.as_f64()),
    }
}

fn div(a: Number, b: Number) -> Result<Number, ExprError> {
    if b.is_zero() {
        return Err(ExprError::DivisionByZero);
    }
    Ok(Number::Float(a.as_f64() / b.as_f64()))
}

fn floor_div(a: Number, b: Number) -> Result<Number, ExprError> {
    if b.is_zero() {
        return Err(ExprError::DivisionByZero);
    }
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => match x.checked_div_euclid(y) {
            Some(_) => {
                let q = x / y;
                // Round toward negative infinity
                let floored = if (x % y != 0) && ((x < 0) != (y < 0)) {
                    q - 1
                } else {
                    q
                };
                Ok(Number::Int(floored))
            }
            None => Ok(Number::Float((x as f64 / y as f64).floor())),
        },
        _ => Ok(Number::Float((a.as_f64() / b.as_f64()).floor())),
    }
}

fn negate(a: Number) -> Number {
    match a {
        Number::Int(x) => x
            .checked_neg()
            .map(Number::Int)
            .unwrap_or(Number::Float(-(x as f64))),
        Number::Float(f) => Number::Float(-f),
    }
}

fn pow(base: Number, exponent: Number) -> Result<Number, ExprError> {
    if base.is_zero() && exponent.as_f64() < 0.0 {
        return Err(ExprError::ZeroNegativePower);
    }

    if let (Number::Int(b), Number::Int(e)) = (base, exponent) {
        if e >= 0 {
            if let Some(value) = u32::try_from(e).ok().and_then(|e| b.checked_pow(e)) {
                return Ok(Number::Int(value));
            }
        }
        return finite(Number::Float((b as f64).powf(e as f64)));
    }

    let (b, e) = (base.as_f64(), exponent.as_f64());
    if b < 0.0 && e.fract() != 0.0 {
        return Err(ExprError::Complex);
    }
    finite(Number::Float(b.powf(e)))
}

fn finite(n: Number) -> Result<Number, ExprError> {
    match n {
        Number::Float(f) if !f.is_finite() => Err(ExprError::NotFinite),
        other => Ok(other),
    }
}
