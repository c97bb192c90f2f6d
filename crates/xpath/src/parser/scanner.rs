//! Hand-written XPath 1.0 tokenizer.
//!
//! Lexical disambiguation (XPath 1.0 §3.7) happens here with one token of
//! lookahead: `*` and `and`/`or`/`div`/`mod` are operators only right after
//! a token that can end an operand, a name followed by `(` is a function
//! name or node type, and a name followed by `::` is an axis.

use compact_str::CompactString;
use std::sync::Arc;

use crate::engine::runtime::{Error, ErrorCode};
use crate::parser::ast::Axis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Eof,
    Slash,
    DoubleSlash,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    DotDot,
    At,
    Comma,
    Pipe,
    Plus,
    Minus,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Multiply,
    And,
    Or,
    Div,
    Mod,
    /// `$qname`
    Variable,
    Literal,
    Number,
    /// `name::`
    Axis,
    /// `comment`, `text`, `processing-instruction` or `node` before `(`.
    NodeType,
    /// `qname` before `(`.
    FunctionName,
    /// `qname`, `prefix:*` or `*`.
    NameTest,
}

impl TokenKind {
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Eof => "end of input",
            TokenKind::Slash => "'/'",
            TokenKind::DoubleSlash => "'//'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Dot => "'.'",
            TokenKind::DotDot => "'..'",
            TokenKind::At => "'@'",
            TokenKind::Comma => "','",
            TokenKind::Pipe => "'|'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Eq => "'='",
            TokenKind::NotEq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::Le => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::Ge => "'>='",
            TokenKind::Multiply => "'*'",
            TokenKind::And => "'and'",
            TokenKind::Or => "'or'",
            TokenKind::Div => "'div'",
            TokenKind::Mod => "'mod'",
            TokenKind::Variable => "variable reference",
            TokenKind::Literal => "string literal",
            TokenKind::Number => "number",
            TokenKind::Axis => "axis name",
            TokenKind::NodeType => "node type test",
            TokenKind::FunctionName => "function name",
            TokenKind::NameTest => "name test",
        }
    }

    /// Whether an operand may end with this token (§3.7 "preceding token").
    fn ends_operand(self) -> bool {
        matches!(
            self,
            TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::Dot
                | TokenKind::DotDot
                | TokenKind::Variable
                | TokenKind::Literal
                | TokenKind::Number
                | TokenKind::NameTest
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    None,
    Text(CompactString),
    Number(f64),
    Name {
        prefix: Option<CompactString>,
        local: CompactString,
    },
    Axis(Axis),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: TokenValue,
    /// Byte offset of the token's first character.
    pub start: usize,
}

const NODE_TYPE_NAMES: [&str; 4] = ["comment", "text", "processing-instruction", "node"];

fn is_name_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_numeric() || matches!(c, '-' | '.' | '\u{B7}') || c.is_alphanumeric()
}

pub struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    token: Token,
    prev: Option<TokenKind>,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            token: Token {
                kind: TokenKind::Eof,
                value: TokenValue::None,
                start: 0,
            },
            prev: None,
        }
    }

    pub fn token(&self) -> TokenKind {
        self.token.kind
    }

    pub fn value(&self) -> &TokenValue {
        &self.token.value
    }

    pub fn current(&self) -> &Token {
        &self.token
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if matches!(c, ' ' | '\t' | '\r' | '\n') {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn error(&self, start: usize, msg: impl Into<String>) -> Error {
        Error::from_code(ErrorCode::XPST0003, msg).at(start)
    }

    /// Consume the next token. Returns `Ok(false)` at end of input.
    pub fn advance(&mut self) -> Result<bool, Error> {
        self.skip_whitespace();
        let start = self.pos;
        let operand_before = self.prev.is_some_and(TokenKind::ends_operand);
        let Some(c) = self.peek() else {
            self.set(TokenKind::Eof, TokenValue::None, start);
            return Ok(false);
        };
        let kind = match c {
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            '@' => self.single(TokenKind::At),
            ',' => self.single(TokenKind::Comma),
            '|' => self.single(TokenKind::Pipe),
            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '=' => self.single(TokenKind::Eq),
            '/' => {
                self.bump();
                if self.peek() == Some('/') {
                    self.bump();
                    TokenKind::DoubleSlash
                } else {
                    TokenKind::Slash
                }
            }
            '!' => {
                self.bump();
                if self.peek() != Some('=') {
                    return Err(self.error(start, "expected '=' after '!'"));
                }
                self.bump();
                TokenKind::NotEq
            }
            '<' | '>' => {
                self.bump();
                let eq = self.peek() == Some('=');
                if eq {
                    self.bump();
                }
                match (c, eq) {
                    ('<', false) => TokenKind::Lt,
                    ('<', true) => TokenKind::Le,
                    ('>', false) => TokenKind::Gt,
                    _ => TokenKind::Ge,
                }
            }
            '.' => match self.peek_at(1) {
                Some('.') => {
                    self.pos += 2;
                    TokenKind::DotDot
                }
                Some(d) if d.is_ascii_digit() => return self.number(start),
                _ => self.single(TokenKind::Dot),
            },
            '"' | '\'' => return self.literal(start, c),
            '$' => {
                self.bump();
                if !self.peek().is_some_and(is_name_start) {
                    return Err(self.error(start, "expected variable name after '$'"));
                }
                let (prefix, local) = self.qname(start, false)?;
                self.set(TokenKind::Variable, TokenValue::Name { prefix, local }, start);
                return Ok(true);
            }
            '*' => {
                self.bump();
                if operand_before {
                    TokenKind::Multiply
                } else {
                    self.set(
                        TokenKind::NameTest,
                        TokenValue::Name {
                            prefix: None,
                            local: CompactString::const_new("*"),
                        },
                        start,
                    );
                    return Ok(true);
                }
            }
            d if d.is_ascii_digit() => return self.number(start),
            n if is_name_start(n) => return self.name(start, operand_before),
            other => {
                return Err(self.error(start, format!("unexpected character '{other}'")));
            }
        };
        self.set(kind, TokenValue::None, start);
        Ok(true)
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }

    fn set(&mut self, kind: TokenKind, value: TokenValue, start: usize) {
        self.prev = Some(kind);
        self.token = Token { kind, value, start };
    }

    fn ncname(&mut self) -> &'a str {
        let begin = self.pos;
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        &self.src[begin..self.pos]
    }

    /// `NCName (':' (NCName | '*'))?`; the wildcard form only when `allow_star`.
    fn qname(
        &mut self,
        start: usize,
        allow_star: bool,
    ) -> Result<(Option<CompactString>, CompactString), Error> {
        let first = self.ncname();
        if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
            match self.peek_at(1) {
                Some('*') if allow_star => {
                    self.pos += 2;
                    return Ok((Some(first.into()), CompactString::const_new("*")));
                }
                Some(c) if is_name_start(c) => {
                    self.pos += 1;
                    let local = self.ncname();
                    return Ok((Some(first.into()), local.into()));
                }
                _ => return Err(self.error(start, format!("malformed qualified name '{first}:'"))),
            }
        }
        Ok((None, first.into()))
    }

    fn name(&mut self, start: usize, operand_before: bool) -> Result<bool, Error> {
        let (prefix, local) = self.qname(start, true)?;
        if operand_before {
            let kind = match (prefix.is_none(), local.as_str()) {
                (true, "and") => TokenKind::And,
                (true, "or") => TokenKind::Or,
                (true, "div") => TokenKind::Div,
                (true, "mod") => TokenKind::Mod,
                _ => {
                    return Err(self
                        .error(start, format!("expected an operator, found '{local}'"))
                        .expecting(["'and'", "'or'", "'div'", "'mod'", "'*'"]));
                }
            };
            self.set(kind, TokenValue::None, start);
            return Ok(true);
        }
        let name_end = self.pos;
        self.skip_whitespace();
        let next = self.peek();
        let kind = if local == "*" {
            TokenKind::NameTest
        } else if next == Some('(') {
            if prefix.is_none() && NODE_TYPE_NAMES.contains(&local.as_str()) {
                TokenKind::NodeType
            } else {
                TokenKind::FunctionName
            }
        } else if next == Some(':') && self.peek_at(1) == Some(':') {
            if prefix.is_some() {
                return Err(self.error(start, "axis names cannot be prefixed"));
            }
            let Some(axis) = Axis::from_name(&local) else {
                return Err(self.error(start, format!("unknown axis '{local}'")));
            };
            self.pos += 2;
            self.set(TokenKind::Axis, TokenValue::Axis(axis), start);
            return Ok(true);
        } else {
            TokenKind::NameTest
        };
        if kind == TokenKind::NameTest {
            // Keep trailing whitespace unconsumed so offsets of later errors stay exact.
            self.pos = name_end;
        }
        let value = match kind {
            TokenKind::NodeType => TokenValue::Text(local),
            _ => TokenValue::Name { prefix, local },
        };
        self.set(kind, value, start);
        Ok(true)
    }

    fn number(&mut self, start: usize) -> Result<bool, Error> {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') && self.peek_at(1) != Some('.') {
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text = &self.src[start..self.pos];
        let n: f64 = text
            .parse()
            .or_else(|_| format!("0{text}").parse())
            .map_err(|e: core::num::ParseFloatError| {
                self.error(start, format!("malformed number '{text}'"))
                    .with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
            })?;
        self.set(TokenKind::Number, TokenValue::Number(n), start);
        Ok(true)
    }

    fn literal(&mut self, start: usize, quote: char) -> Result<bool, Error> {
        self.bump();
        let body_start = self.pos;
        match self.src[body_start..].find(quote) {
            Some(len) => {
                let body = &self.src[body_start..body_start + len];
                self.pos = body_start + len + 1;
                self.set(TokenKind::Literal, TokenValue::Text(body.into()), start);
                Ok(true)
            }
            None => {
                self.pos = self.src.len();
                Err(self.error(start, "unterminated string literal"))
            }
        }
    }
}
