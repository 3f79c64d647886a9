//! Predicate expression parser
//!
//! Parses SQL-style filter strings such as `region in ('ca','gb','us')`.
//!
//! Grammar:
//!
//! ```text
//! expr    := and ( OR and )*
//! and     := unary ( AND unary )*
//! unary   := NOT unary | primary
//! primary := '(' expr ')' | column test
//! test    := [NOT] IN '(' literal (',' literal)* ')'
//!          | IS [NOT] NULL
//!          | op literal
//! ```

use super::types::{CompareOp, Literal, Predicate};
use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

/// One token per match, anchored at the current position
static TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*(?:(?P<str>'(?:[^']|'')*')|(?P<num>-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?)|(?P<op><>|!=|<=|>=|=|<|>)|(?P<punct>[(),])|(?P<ident>[A-Za-z_][A-Za-z0-9_.]*|"[^"]+"|`[^`]+`))"#,
    )
    .unwrap()
});

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Str(String),
    Num(String),
    Op(CompareOp),
    LParen,
    RParen,
    Comma,
    Ident(String),
    /// Quoted identifiers never act as keywords
    Quoted(String),
}

/// Parse a predicate expression
pub fn parse_predicate(input: &str) -> Result<Predicate> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(Error::invalid_predicate(input, "empty predicate"));
    }

    let mut parser = Parser {
        input,
        tokens,
        pos: 0,
    };
    let predicate = parser.expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.error(format!(
            "unexpected token {:?}",
            parser.tokens[parser.pos]
        )));
    }
    Ok(predicate)
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut rest = input;

    while !rest.trim_start().is_empty() {
        let caps = TOKEN_REGEX.captures(rest).ok_or_else(|| {
            Error::invalid_predicate(
                input,
                format!("unexpected input at '{}'", rest.trim_start()),
            )
        })?;

        let token = if let Some(m) = caps.name("str") {
            let raw = m.as_str();
            Token::Str(raw[1..raw.len() - 1].replace("''", "'"))
        } else if let Some(m) = caps.name("num") {
            Token::Num(m.as_str().to_string())
        } else if let Some(m) = caps.name("op") {
            Token::Op(match m.as_str() {
                "=" => CompareOp::Eq,
                "!=" | "<>" => CompareOp::NotEq,
                "<" => CompareOp::Lt,
                "<=" => CompareOp::LtEq,
                ">" => CompareOp::Gt,
                _ => CompareOp::GtEq,
            })
        } else if let Some(m) = caps.name("punct") {
            match m.as_str() {
                "(" => Token::LParen,
                ")" => Token::RParen,
                _ => Token::Comma,
            }
        } else if let Some(m) = caps.name("ident") {
            let raw = m.as_str();
            if raw.starts_with('"') || raw.starts_with('`') {
                Token::Quoted(raw[1..raw.len() - 1].to_string())
            } else {
                Token::Ident(raw.to_string())
            }
        } else {
            return Err(Error::invalid_predicate(input, "unrecognised token"));
        };

        tokens.push(token);
        rest = &rest[caps.get(0).map_or(rest.len(), |m| m.end())..];
    }

    Ok(tokens)
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, message: impl Into<String>) -> Error {
        Error::invalid_predicate(self.input, message)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(format!("expected {keyword}")))
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        match self.next() {
            Some(ref t) if t == expected => Ok(()),
            Some(t) => Err(self.error(format!("expected {expected:?}, found {t:?}"))),
            None => Err(self.error(format!("expected {expected:?}, found end of input"))),
        }
    }

    fn expr(&mut self) -> Result<Predicate> {
        let mut children = vec![self.and()?];
        while self.eat_keyword("or") {
            children.push(self.and()?);
        }
        Ok(if children.len() == 1 {
            children.remove(0)
        } else {
            Predicate::Or(children)
        })
    }

    fn and(&mut self) -> Result<Predicate> {
        let mut children = vec![self.unary()?];
        while self.eat_keyword("and") {
            children.push(self.unary()?);
        }
        Ok(if children.len() == 1 {
            children.remove(0)
        } else {
            Predicate::And(children)
        })
    }

    fn unary(&mut self) -> Result<Predicate> {
        if self.eat_keyword("not") {
            return Ok(Predicate::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Predicate> {
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name) | Token::Quoted(name)) => self.test(name),
            Some(t) => Err(self.error(format!("expected a column name, found {t:?}"))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn test(&mut self, column: String) -> Result<Predicate> {
        if self.eat_keyword("is") {
            let negated = self.eat_keyword("not");
            self.expect_keyword("null")?;
            return Ok(Predicate::IsNull { column, negated });
        }

        let negated = self.eat_keyword("not");
        if self.eat_keyword("in") {
            self.expect(&Token::LParen)?;
            let mut values = vec![self.literal()?];
            while self.peek() == Some(&Token::Comma) {
                self.pos += 1;
                values.push(self.literal()?);
            }
            self.expect(&Token::RParen)?;
            return Ok(Predicate::In {
                column,
                values,
                negated,
            });
        }
        if negated {
            return Err(self.error("expected IN after NOT"));
        }

        match self.next() {
            Some(Token::Op(op)) => Ok(Predicate::Compare {
                column,
                op,
                value: self.literal()?,
            }),
            Some(t) => Err(self.error(format!("expected an operator after '{column}', found {t:?}"))),
            None => Err(self.error(format!("expected an operator after '{column}'"))),
        }
    }

    fn literal(&mut self) -> Result<Literal> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Literal::Str(s)),
            Some(Token::Num(n)) => {
                if let Ok(i) = n.parse::<i64>() {
                    Ok(Literal::Int(i))
                } else {
                    n.parse::<f64>()
                        .map(Literal::Float)
                        .map_err(|_| self.error(format!("invalid number '{n}'")))
                }
            }
            Some(Token::Ident(s)) if s.eq_ignore_ascii_case("true") => Ok(Literal::Bool(true)),
            Some(Token::Ident(s)) if s.eq_ignore_ascii_case("false") => Ok(Literal::Bool(false)),
            Some(Token::Ident(s)) if s.eq_ignore_ascii_case("null") => Ok(Literal::Null),
            Some(t) => Err(self.error(format!("expected a literal, found {t:?}"))),
            None => Err(self.error("expected a literal, found end of input")),
        }
    }
}
