//! Category rule evaluation
//!
//! A category matches a transaction when any of its three rule forms signals
//! true: the free-text `filter` expression, `filterOptions.includesOneOf`
//! (any key contained) or `filterOptions.includesAllOf` (every key
//! contained). "Contained" always means a case-insensitive substring check
//! against the JSON text of the whole transaction.
//!
//! The expression language is a closed interpreter, not a script engine.
//! Rules are authored by non-programmers, so the word operators `and`/`or`
//! are first-class (the symbolic `&&`/`||` are accepted too):
//!
//! ```text
//! includes("rewe") or includes("edeka")
//! includesOneOf("netflix", "spotify") and entry.value > -50
//! not includes("storno") and value < 0
//! ```
//!
//! Primitives: `includes(key)`, `includesOneOf(key, ...)`, transaction field
//! access (bare or `entry.`-prefixed), comparisons, `not`, parentheses.
//!
//! A malformed expression never aborts a classification pass; the failure is
//! logged per category and the category simply does not match.

use std::fmt;

use thiserror::Error;
use tracing::warn;

use crate::error::LedgerError;
use crate::models::{Category, Transaction};

/// Rule parse or evaluation failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("Unexpected character '{0}' in rule")]
    UnexpectedChar(char),
    #[error("Unterminated string literal")]
    UnterminatedString,
    #[error("Unexpected end of rule")]
    UnexpectedEnd,
    #[error("Unexpected token: {0}")]
    UnexpectedToken(String),
    #[error("Unknown transaction field: {0}")]
    UnknownField(String),
    #[error("{0} expects {1}")]
    BadArity(&'static str, &'static str),
    #[error("Cannot compare {0} and {1}")]
    TypeMismatch(&'static str, &'static str),
    #[error("Ordering comparison is only defined for numbers")]
    TextOrdering,
}

impl From<RuleError> for LedgerError {
    fn from(err: RuleError) -> Self {
        Self::Rule(err.to_string())
    }
}

/// Decide boolean match of one category's rules against one transaction
pub fn matches(transaction: &Transaction, category: &Category) -> bool {
    let haystack = haystack(transaction);

    let mut matched = false;

    if !category.filter.trim().is_empty() {
        match evaluate(&category.filter, transaction, &haystack) {
            Ok(value) => matched = value,
            Err(err) => {
                warn!(
                    category = %category.name,
                    rule = %category.filter,
                    %err,
                    "Failed to evaluate category filter"
                );
            }
        }
    }

    let options = &category.filter_options;
    if !matched && !options.includes_one_of.is_empty() {
        matched = options
            .includes_one_of
            .iter()
            .any(|key| includes(&haystack, key));
    }
    if !matched && !options.includes_all_of.is_empty() {
        matched = options
            .includes_all_of
            .iter()
            .all(|key| includes(&haystack, key));
    }

    matched
}

/// The case-insensitive textual form of a whole transaction
///
/// Serializing a transaction cannot fail, but the signature of
/// `serde_json::to_string` does not know that; an empty haystack on the
/// unreachable path just means nothing matches.
fn haystack(transaction: &Transaction) -> String {
    serde_json::to_string(transaction)
        .unwrap_or_default()
        .to_lowercase()
}

/// True iff the transaction text contains `key`, case-insensitively
///
/// An empty key never matches.
fn includes(haystack: &str, key: &str) -> bool {
    !key.is_empty() && haystack.contains(&key.to_lowercase())
}

/// Evaluate a rule expression against one transaction
pub fn evaluate(rule: &str, transaction: &Transaction, haystack: &str) -> Result<bool, RuleError> {
    let tokens = tokenize(rule)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(RuleError::UnexpectedToken(format!(
            "{}",
            parser.tokens[parser.pos]
        )));
    }
    eval(&expr, transaction, haystack)
}

// === Tokens ===

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Str(String),
    Num(f64),
    Ident(String),
    LParen,
    RParen,
    Comma,
    Dot,
    Minus,
    And,
    Or,
    Not,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    True,
    False,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Str(s) => write!(f, "\"{}\"", s),
            Token::Num(n) => write!(f, "{}", n),
            Token::Ident(name) => write!(f, "{}", name),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::Minus => write!(f, "-"),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::Not => write!(f, "not"),
            Token::Eq => write!(f, "=="),
            Token::Ne => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Le => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Ge => write!(f, ">="),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
        }
    }
}

fn tokenize(rule: &str) -> Result<Vec<Token>, RuleError> {
    let mut tokens = Vec::new();
    let mut chars = rule.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some(ch) if ch == quote => break,
                        Some('\\') => match chars.next() {
                            Some(escaped) => text.push(escaped),
                            None => return Err(RuleError::UnterminatedString),
                        },
                        Some(ch) => text.push(ch),
                        None => return Err(RuleError::UnterminatedString),
                    }
                }
                tokens.push(Token::Str(text));
            }
            '&' => {
                chars.next();
                if chars.next_if_eq(&'&').is_none() {
                    return Err(RuleError::UnexpectedChar('&'));
                }
                tokens.push(Token::And);
            }
            '|' => {
                chars.next();
                if chars.next_if_eq(&'|').is_none() {
                    return Err(RuleError::UnexpectedChar('|'));
                }
                tokens.push(Token::Or);
            }
            '=' => {
                chars.next();
                if chars.next_if_eq(&'=').is_none() {
                    return Err(RuleError::UnexpectedChar('='));
                }
                // "===" from copy-pasted JavaScript means the same thing here
                chars.next_if_eq(&'=');
                tokens.push(Token::Eq);
            }
            '!' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    chars.next_if_eq(&'=');
                    tokens.push(Token::Ne);
                } else {
                    tokens.push(Token::Not);
                }
            }
            '<' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Le);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '>' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Ge);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            _ if c.is_ascii_digit() => {
                let mut number = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        number.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value: f64 = number
                    .parse()
                    .map_err(|_| RuleError::UnexpectedToken(number.clone()))?;
                tokens.push(Token::Num(value));
            }
            _ if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match ident.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "true" => Token::True,
                    "false" => Token::False,
                    _ => Token::Ident(ident),
                });
            }
            _ => return Err(RuleError::UnexpectedChar(c)),
        }
    }

    Ok(tokens)
}

// === AST ===

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Literal(bool),
    Includes(String),
    IncludesOneOf(Vec<String>),
    Compare {
        lhs: Operand,
        op: CmpOp,
        rhs: Operand,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Field(Field),
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Date,
    RecipientSender,
    Kind,
    Description,
    Balance,
    Value,
    Currency,
}

impl Field {
    fn parse(name: &str) -> Result<Self, RuleError> {
        match name {
            "date" => Ok(Self::Date),
            "recipientSender" => Ok(Self::RecipientSender),
            "type" => Ok(Self::Kind),
            "description" => Ok(Self::Description),
            "balance" => Ok(Self::Balance),
            "value" => Ok(Self::Value),
            "currency" => Ok(Self::Currency),
            _ => Err(RuleError::UnknownField(name.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

// === Parser ===

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, RuleError> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token.ok_or(RuleError::UnexpectedEnd)
    }

    fn expect(&mut self, expected: Token) -> Result<(), RuleError> {
        let token = self.next()?;
        if token == expected {
            Ok(())
        } else {
            Err(RuleError::UnexpectedToken(token.to_string()))
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, RuleError> {
        let mut expr = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.next()?;
            let rhs = self.parse_and()?;
            expr = Expr::Or(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr, RuleError> {
        let mut expr = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.next()?;
            let rhs = self.parse_not()?;
            expr = Expr::And(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_not(&mut self) -> Result<Expr, RuleError> {
        if self.peek() == Some(&Token::Not) {
            self.next()?;
            Ok(Expr::Not(Box::new(self.parse_not()?)))
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, RuleError> {
        match self.peek().ok_or(RuleError::UnexpectedEnd)? {
            Token::LParen => {
                self.next()?;
                let expr = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::True => {
                self.next()?;
                Ok(Expr::Literal(true))
            }
            Token::False => {
                self.next()?;
                Ok(Expr::Literal(false))
            }
            Token::Ident(name) if name == "includes" && self.is_call() => {
                self.next()?;
                let args = self.parse_string_args()?;
                match <[String; 1]>::try_from(args) {
                    Ok([key]) => Ok(Expr::Includes(key)),
                    Err(_) => Err(RuleError::BadArity("includes", "exactly one string")),
                }
            }
            Token::Ident(name) if name == "includesOneOf" && self.is_call() => {
                self.next()?;
                let args = self.parse_string_args()?;
                if args.is_empty() {
                    return Err(RuleError::BadArity("includesOneOf", "at least one string"));
                }
                Ok(Expr::IncludesOneOf(args))
            }
            _ => self.parse_comparison(),
        }
    }

    fn is_call(&self) -> bool {
        self.tokens.get(self.pos + 1) == Some(&Token::LParen)
    }

    fn parse_string_args(&mut self) -> Result<Vec<String>, RuleError> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.next()?;
            return Ok(args);
        }
        loop {
            match self.next()? {
                Token::Str(s) => args.push(s),
                other => return Err(RuleError::UnexpectedToken(other.to_string())),
            }
            match self.next()? {
                Token::Comma => continue,
                Token::RParen => break,
                other => return Err(RuleError::UnexpectedToken(other.to_string())),
            }
        }
        Ok(args)
    }

    fn parse_comparison(&mut self) -> Result<Expr, RuleError> {
        let lhs = self.parse_operand()?;
        let op = match self.next()? {
            Token::Eq => CmpOp::Eq,
            Token::Ne => CmpOp::Ne,
            Token::Lt => CmpOp::Lt,
            Token::Le => CmpOp::Le,
            Token::Gt => CmpOp::Gt,
            Token::Ge => CmpOp::Ge,
            other => return Err(RuleError::UnexpectedToken(other.to_string())),
        };
        let rhs = self.parse_operand()?;
        Ok(Expr::Compare { lhs, op, rhs })
    }

    fn parse_operand(&mut self) -> Result<Operand, RuleError> {
        match self.next()? {
            Token::Minus => match self.next()? {
                Token::Num(n) => Ok(Operand::Number(-n)),
                other => Err(RuleError::UnexpectedToken(other.to_string())),
            },
            Token::Num(n) => Ok(Operand::Number(n)),
            Token::Str(s) => Ok(Operand::Text(s)),
            Token::Ident(name) if name == "entry" => {
                self.expect(Token::Dot)?;
                match self.next()? {
                    Token::Ident(field) => Ok(Operand::Field(Field::parse(&field)?)),
                    other => Err(RuleError::UnexpectedToken(other.to_string())),
                }
            }
            Token::Ident(name) => Ok(Operand::Field(Field::parse(&name)?)),
            other => Err(RuleError::UnexpectedToken(other.to_string())),
        }
    }
}

// === Evaluation ===

enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "text",
        }
    }
}

fn eval(expr: &Expr, transaction: &Transaction, haystack: &str) -> Result<bool, RuleError> {
    match expr {
        Expr::Or(lhs, rhs) => {
            Ok(eval(lhs, transaction, haystack)? || eval(rhs, transaction, haystack)?)
        }
        Expr::And(lhs, rhs) => {
            Ok(eval(lhs, transaction, haystack)? && eval(rhs, transaction, haystack)?)
        }
        Expr::Not(inner) => Ok(!eval(inner, transaction, haystack)?),
        Expr::Literal(value) => Ok(*value),
        Expr::Includes(key) => Ok(includes(haystack, key)),
        Expr::IncludesOneOf(keys) => Ok(keys.iter().any(|key| includes(haystack, key))),
        Expr::Compare { lhs, op, rhs } => {
            compare(resolve(lhs, transaction), resolve(rhs, transaction), *op)
        }
    }
}

fn resolve(operand: &Operand, transaction: &Transaction) -> Value {
    match operand {
        Operand::Number(n) => Value::Number(*n),
        Operand::Text(s) => Value::Text(s.clone()),
        Operand::Field(field) => match field {
            Field::Date => Value::Text(transaction.date.to_string()),
            Field::RecipientSender => Value::Text(transaction.recipient_sender.clone()),
            Field::Kind => Value::Text(transaction.kind.clone()),
            Field::Description => Value::Text(transaction.description.clone()),
            Field::Balance => Value::Number(transaction.balance.as_units()),
            Field::Value => Value::Number(transaction.value.as_units()),
            Field::Currency => Value::Text(transaction.currency.clone()),
        },
    }
}

fn compare(lhs: Value, rhs: Value, op: CmpOp) -> Result<bool, RuleError> {
    match (&lhs, &rhs) {
        (Value::Number(a), Value::Number(b)) => Ok(match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
        }),
        (Value::Text(a), Value::Text(b)) => match op {
            CmpOp::Eq => Ok(a == b),
            CmpOp::Ne => Ok(a != b),
            _ => Err(RuleError::TextOrdering),
        },
        _ => Err(RuleError::TypeMismatch(lhs.kind(), rhs.kind())),
    }
}
