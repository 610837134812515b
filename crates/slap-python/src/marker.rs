//! PEP 508 environment markers.
//!
//! Markers are parsed into a [`MarkerTree`] by a small recursive-descent
//! parser and evaluated by walking the tree. The grammar is deliberately
//! closed:
//!
//! ```text
//! expr     := and_expr ("or" and_expr)*
//! and_expr := atom ("and" atom)*
//! atom     := "(" expr ")" | operand cmp operand
//! operand  := variable | 'string' | "string"
//! cmp      := "==" | "!=" | "<" | "<=" | ">" | ">="
//! ```
//!
//! `extra` is a pseudo-variable: `extra == "docs"` tests membership of
//! `"docs"` in the extras set supplied at evaluation time.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::pep508::Pep508Environment;
use crate::version::Version;

/// Environment variables that may appear in a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerVariable {
    PythonVersion,
    PythonFullVersion,
    OsName,
    SysPlatform,
    PlatformRelease,
    PlatformSystem,
    PlatformMachine,
    PlatformPythonImplementation,
    ImplementationName,
    ImplementationVersion,
}

impl MarkerVariable {
    pub const ALL: [MarkerVariable; 10] = [
        MarkerVariable::PythonVersion,
        MarkerVariable::PythonFullVersion,
        MarkerVariable::OsName,
        MarkerVariable::SysPlatform,
        MarkerVariable::PlatformRelease,
        MarkerVariable::PlatformSystem,
        MarkerVariable::PlatformMachine,
        MarkerVariable::PlatformPythonImplementation,
        MarkerVariable::ImplementationName,
        MarkerVariable::ImplementationVersion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MarkerVariable::PythonVersion => "python_version",
            MarkerVariable::PythonFullVersion => "python_full_version",
            MarkerVariable::OsName => "os_name",
            MarkerVariable::SysPlatform => "sys_platform",
            MarkerVariable::PlatformRelease => "platform_release",
            MarkerVariable::PlatformSystem => "platform_system",
            MarkerVariable::PlatformMachine => "platform_machine",
            MarkerVariable::PlatformPythonImplementation => "platform_python_implementation",
            MarkerVariable::ImplementationName => "implementation_name",
            MarkerVariable::ImplementationVersion => "implementation_version",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|variable| variable.as_str() == name)
    }
}

/// Comparison operator inside a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Equal => "==",
            CompareOp::NotEqual => "!=",
            CompareOp::Less => "<",
            CompareOp::LessEqual => "<=",
            CompareOp::Greater => ">",
            CompareOp::GreaterEqual => ">=",
        }
    }

    fn apply<T: Ord + ?Sized>(self, left: &T, right: &T) -> bool {
        match self {
            CompareOp::Equal => left == right,
            CompareOp::NotEqual => left != right,
            CompareOp::Less => left < right,
            CompareOp::LessEqual => left <= right,
            CompareOp::Greater => left > right,
            CompareOp::GreaterEqual => left >= right,
        }
    }
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerOperand {
    Variable(MarkerVariable),
    Extra,
    Literal(String),
}

/// A single `operand op operand` comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerExpression {
    pub lhs: MarkerOperand,
    pub op: CompareOp,
    pub rhs: MarkerOperand,
}

/// A parsed marker expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerTree {
    And(Vec<MarkerTree>),
    Or(Vec<MarkerTree>),
    Compare(MarkerExpression),
}

impl MarkerTree {
    /// Parse a marker string.
    pub fn parse(marker: &str) -> Result<Self> {
        let tokens = tokenize(marker)?;
        let mut parser = Parser {
            source: marker,
            tokens,
            pos: 0,
        };
        let tree = parser.parse_or()?;
        if let Some((token, offset)) = parser.peek() {
            return Err(parser.error(
                format!("unexpected {}", token.describe()),
                *offset,
            ));
        }
        Ok(tree)
    }

    /// Evaluate the marker against `env`.
    ///
    /// `extras` is the set that `extra == "..."` is tested against. Passing
    /// `None` makes any use of `extra` an error. Every operand of `and`/`or`
    /// is evaluated so that invalid sub-expressions are always reported.
    pub fn evaluate(&self, env: &Pep508Environment, extras: Option<&BTreeSet<String>>) -> Result<bool> {
        match self {
            MarkerTree::And(children) => {
                let mut result = true;
                for child in children {
                    result &= child.evaluate(env, extras)?;
                }
                Ok(result)
            }
            MarkerTree::Or(children) => {
                let mut result = false;
                for child in children {
                    result |= child.evaluate(env, extras)?;
                }
                Ok(result)
            }
            MarkerTree::Compare(expression) => expression.evaluate(env, extras),
        }
    }
}

impl FromStr for MarkerTree {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl MarkerExpression {
    fn evaluate(&self, env: &Pep508Environment, extras: Option<&BTreeSet<String>>) -> Result<bool> {
        let invalid = |reason: String| Error::InvalidMarker {
            marker: self.to_string(),
            reason,
        };

        let other = match (&self.lhs, &self.rhs) {
            (MarkerOperand::Extra, MarkerOperand::Extra) => {
                return Err(invalid("cannot compare 'extra' with itself".to_string()));
            }
            (MarkerOperand::Extra, other) | (other, MarkerOperand::Extra) => Some(other),
            _ => None,
        };

        if let Some(other) = other {
            let extras = extras.ok_or_else(|| {
                invalid("marker 'extra' is not available in this context".to_string())
            })?;
            let value = resolve(other, env);
            return match self.op {
                CompareOp::Equal => Ok(extras.contains(value)),
                CompareOp::NotEqual => Ok(!extras.contains(value)),
                op => Err(invalid(format!(
                    "operator '{}' is not supported with 'extra'",
                    op.as_str()
                ))),
            };
        }

        let left = resolve(&self.lhs, env);
        let right = resolve(&self.rhs, env);
        match (Version::parse(left), Version::parse(right)) {
            (Ok(left), Ok(right)) => Ok(self.op.apply(&left, &right)),
            _ => Ok(self.op.apply(left, right)),
        }
    }
}

fn resolve<'a>(operand: &'a MarkerOperand, env: &'a Pep508Environment) -> &'a str {
    match operand {
        MarkerOperand::Variable(variable) => env.get(*variable),
        MarkerOperand::Literal(value) => value,
        MarkerOperand::Extra => "extra",
    }
}

impl fmt::Display for MarkerOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerOperand::Variable(variable) => f.write_str(variable.as_str()),
            MarkerOperand::Extra => f.write_str("extra"),
            MarkerOperand::Literal(value) if value.contains('"') => write!(f, "'{value}'"),
            MarkerOperand::Literal(value) => write!(f, "\"{value}\""),
        }
    }
}

impl fmt::Display for MarkerExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.op.as_str(), self.rhs)
    }
}

impl fmt::Display for MarkerTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerTree::Compare(expression) => expression.fmt(f),
            MarkerTree::Or(children) => {
                for (index, child) in children.iter().enumerate() {
                    if index > 0 {
                        f.write_str(" or ")?;
                    }
                    child.fmt(f)?;
                }
                Ok(())
            }
            MarkerTree::And(children) => {
                for (index, child) in children.iter().enumerate() {
                    if index > 0 {
                        f.write_str(" and ")?;
                    }
                    if matches!(child, MarkerTree::Or(_)) {
                        write!(f, "({child})")?;
                    } else {
                        child.fmt(f)?;
                    }
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Op(CompareOp),
    And,
    Or,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier '{name}'"),
            Token::Str(value) => format!("string '{value}'"),
            Token::Op(op) => format!("operator '{}'", op.as_str()),
            Token::And => "'and'".to_string(),
            Token::Or => "'or'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>> {
    let error = |reason: String, offset: usize| Error::InvalidMarker {
        marker: source.to_string(),
        reason: format!("{reason} at '{}'", &source[offset..]),
    };

    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push((Token::LParen, offset));
            }
            ')' => {
                chars.next();
                tokens.push((Token::RParen, offset));
            }
            '\'' | '"' => {
                chars.next();
                let start = offset + c.len_utf8();
                let end = loop {
                    match chars.next() {
                        Some((index, ch)) if ch == c => break index,
                        Some(_) => continue,
                        None => return Err(error("unterminated string".to_string(), offset)),
                    }
                };
                tokens.push((Token::Str(source[start..end].to_string()), offset));
            }
            '=' | '!' | '<' | '>' => {
                chars.next();
                let followed_by_eq = chars.next_if(|&(_, next)| next == '=').is_some();
                let op = match (c, followed_by_eq) {
                    ('=', true) => CompareOp::Equal,
                    ('!', true) => CompareOp::NotEqual,
                    ('<', true) => CompareOp::LessEqual,
                    ('>', true) => CompareOp::GreaterEqual,
                    ('<', false) => CompareOp::Less,
                    ('>', false) => CompareOp::Greater,
                    _ => return Err(error(format!("unsupported operator '{c}'"), offset)),
                };
                tokens.push((Token::Op(op), offset));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = offset;
                while let Some(&(index, ch)) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
                        end = index + ch.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let word = &source[offset..end];
                let token = match word {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" | "in" => {
                        return Err(error(format!("unsupported operator '{word}'"), offset));
                    }
                    _ => Token::Ident(word.to_string()),
                };
                tokens.push((token, offset));
            }
            other => return Err(error(format!("unexpected character '{other}'"), offset)),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&(Token, usize)> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<(Token, usize)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, reason: String, offset: usize) -> Error {
        Error::InvalidMarker {
            marker: self.source.to_string(),
            reason: format!("{reason} at '{}'", &self.source[offset..]),
        }
    }

    fn end_of_input(&self, expected: &str) -> Error {
        Error::InvalidMarker {
            marker: self.source.to_string(),
            reason: format!("expected {expected}, found end of marker"),
        }
    }

    fn parse_or(&mut self) -> Result<MarkerTree> {
        let mut children = vec![self.parse_and()?];
        while matches!(self.peek(), Some((Token::Or, _))) {
            self.next();
            children.push(self.parse_and()?);
        }
        Ok(if children.len() == 1 {
            children.remove(0)
        } else {
            MarkerTree::Or(children)
        })
    }

    fn parse_and(&mut self) -> Result<MarkerTree> {
        let mut children = vec![self.parse_atom()?];
        while matches!(self.peek(), Some((Token::And, _))) {
            self.next();
            children.push(self.parse_atom()?);
        }
        Ok(if children.len() == 1 {
            children.remove(0)
        } else {
            MarkerTree::And(children)
        })
    }

    fn parse_atom(&mut self) -> Result<MarkerTree> {
        if matches!(self.peek(), Some((Token::LParen, _))) {
            self.next();
            let inner = self.parse_or()?;
            return match self.next() {
                Some((Token::RParen, _)) => Ok(inner),
                Some((token, offset)) => {
                    Err(self.error(format!("expected ')', found {}", token.describe()), offset))
                }
                None => Err(self.end_of_input("')'")),
            };
        }

        let lhs = self.parse_operand()?;
        let op = match self.next() {
            Some((Token::Op(op), _)) => op,
            Some((token, offset)) => {
                return Err(self.error(
                    format!("expected comparison operator, found {}", token.describe()),
                    offset,
                ));
            }
            None => return Err(self.end_of_input("a comparison operator")),
        };
        let rhs = self.parse_operand()?;

        if let Some((Token::Op(_), offset)) = self.peek() {
            return Err(self.error(
                "multiple comparison operators are not supported".to_string(),
                *offset,
            ));
        }

        Ok(MarkerTree::Compare(MarkerExpression { lhs, op, rhs }))
    }

    fn parse_operand(&mut self) -> Result<MarkerOperand> {
        match self.next() {
            Some((Token::Str(value), _)) => Ok(MarkerOperand::Literal(value)),
            Some((Token::Ident(name), offset)) => {
                if name == "extra" {
                    return Ok(MarkerOperand::Extra);
                }
                MarkerVariable::from_name(&name)
                    .map(MarkerOperand::Variable)
                    .ok_or_else(|| self.error(format!("unknown marker variable '{name}'"), offset))
            }
            Some((token, offset)) => Err(self.error(
                format!("expected a variable or string, found {}", token.describe()),
                offset,
            )),
            None => Err(self.end_of_input("a variable or string")),
        }
    }
}
