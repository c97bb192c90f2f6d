//! Recursive-descent parser for XPath 1.0.
//!
//! One method per precedence level; parsing builds the expression tree
//! directly. Namespace prefixes are resolved against the [`StaticContext`]
//! and core-function arities are checked while parsing, so a successfully
//! parsed tree is ready to evaluate.

pub mod ast;
pub mod scanner;

use std::sync::Arc;

use crate::engine::functions::core_function;
use crate::engine::runtime::{Error, ErrorCode, StaticContext};
use crate::xdm::{ExpandedName, ReturnType};
use ast::{ArithOp, Axis, CompareOp, Expr, NodeTest, Step};
use compact_str::CompactString;
use scanner::{Scanner, Token, TokenKind, TokenValue};

/// Tokens that may start a step.
const STEP_START: [&str; 6] = ["name test", "node type test", "axis name", "'@'", "'.'", "'..'"];
/// Tokens that may start any operand.
const OPERAND_START: [&str; 12] = [
    "number",
    "string literal",
    "variable reference",
    "'('",
    "function name",
    "'-'",
    "'/'",
    "'//'",
    "name test",
    "node type test",
    "axis name",
    "'@'",
];
/// Tokens that may follow a complete expression. `[` is absent: any place a
/// predicate could start has already consumed it.
const OPERATORS: [&str; 16] = [
    "'or'", "'and'", "'='", "'!='", "'<'", "'<='", "'>'", "'>='", "'+'", "'-'", "'*'", "'div'",
    "'mod'", "'|'", "'/'", "'//'",
];

struct Parser<'a> {
    scanner: Scanner<'a>,
    tok: Token,
    static_ctx: &'a StaticContext,
}

/// Parse `text` into an expression tree.
pub fn parse(text: &str, static_ctx: &StaticContext) -> Result<Expr, Error> {
    let mut parser = Parser::new(text, static_ctx)?;
    if parser.tok.kind == TokenKind::Eof {
        return Err(parser.unexpected(&OPERAND_START));
    }
    let expr = parser.parse_expr()?;
    if parser.tok.kind != TokenKind::Eof {
        let mut expected: Vec<&str> = OPERATORS.to_vec();
        expected.push("end of input");
        return Err(parser.unexpected(&expected));
    }
    Ok(expr)
}

fn dos_step() -> Arc<Step> {
    Arc::new(Step::new(Axis::DescendantOrSelf, NodeTest::AnyNode))
}

impl<'a> Parser<'a> {
    fn new(text: &'a str, static_ctx: &'a StaticContext) -> Result<Self, Error> {
        let mut scanner = Scanner::new(text);
        scanner.advance()?;
        let tok = scanner.current().clone();
        Ok(Self {
            scanner,
            tok,
            static_ctx,
        })
    }

    fn advance(&mut self) -> Result<(), Error> {
        self.scanner.advance()?;
        self.tok = self.scanner.current().clone();
        Ok(())
    }

    fn unexpected(&self, expected: &[&str]) -> Error {
        let found = match &self.tok.value {
            TokenValue::Name { prefix: Some(p), local } => format!("'{p}:{local}'"),
            TokenValue::Name { prefix: None, local } => format!("'{local}'"),
            TokenValue::Text(t) if self.tok.kind == TokenKind::Literal => format!("\"{t}\""),
            TokenValue::Text(t) => format!("'{t}'"),
            _ => self.tok.kind.describe().to_string(),
        };
        Error::from_code(ErrorCode::XPST0003, format!("invalid XPath syntax: unexpected {found}"))
            .at(self.tok.start)
            .expecting(expected.iter().copied())
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), Error> {
        if self.tok.kind != kind {
            return Err(self.unexpected(&[kind.describe()]));
        }
        self.advance()
    }

    fn resolve_prefix(&self, prefix: &str) -> Result<String, Error> {
        self.static_ctx
            .resolve_prefix(prefix)
            .map(str::to_string)
            .ok_or_else(|| {
                Error::from_code(
                    ErrorCode::XPST0081,
                    format!("namespace prefix '{prefix}' is not declared"),
                )
                .at(self.tok.start)
            })
    }

    fn expanded_name(&self, prefix: Option<&CompactString>, local: &str) -> Result<ExpandedName, Error> {
        let ns_uri = prefix.map(|p| self.resolve_prefix(p)).transpose()?;
        Ok(ExpandedName::new(ns_uri, local))
    }

    fn require_node_set(&self, expr: &Expr, at: usize) -> Result<(), Error> {
        let rt = expr.return_type();
        if rt.is_scalar() {
            return Err(Error::from_code(
                ErrorCode::XPTY0004,
                format!("expression of type {rt:?} used where a node-set is required"),
            )
            .at(at));
        }
        Ok(())
    }

    /// Expr ::= OrExpr
    fn parse_expr(&mut self) -> Result<Expr, Error> {
        self.parse_or()
    }

    /// OrExpr ::= AndExpr ('or' AndExpr)*
    fn parse_or(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_and()?;
        while self.tok.kind == TokenKind::Or {
            self.advance()?;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// AndExpr ::= EqualityExpr ('and' EqualityExpr)*
    fn parse_and(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_equality()?;
        while self.tok.kind == TokenKind::And {
            self.advance()?;
            let right = self.parse_equality()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// EqualityExpr ::= RelationalExpr (('=' | '!=') RelationalExpr)*
    fn parse_equality(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.tok.kind {
                TokenKind::Eq => CompareOp::Eq,
                TokenKind::NotEq => CompareOp::Ne,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.parse_relational()?;
            left = Expr::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    /// RelationalExpr ::= AdditiveExpr (('<' | '>' | '<=' | '>=') AdditiveExpr)*
    fn parse_relational(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.tok.kind {
                TokenKind::Lt => CompareOp::Lt,
                TokenKind::Le => CompareOp::Le,
                TokenKind::Gt => CompareOp::Gt,
                TokenKind::Ge => CompareOp::Ge,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.parse_additive()?;
            left = Expr::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    /// AdditiveExpr ::= MultiplicativeExpr (('+' | '-') MultiplicativeExpr)*
    fn parse_additive(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.tok.kind {
                TokenKind::Plus => ArithOp::Add,
                TokenKind::Minus => ArithOp::Sub,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.parse_multiplicative()?;
            left = Expr::Arithmetic {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    /// MultiplicativeExpr ::= UnaryExpr (('*' | 'div' | 'mod') UnaryExpr)*
    fn parse_multiplicative(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.tok.kind {
                TokenKind::Multiply => ArithOp::Mul,
                TokenKind::Div => ArithOp::Div,
                TokenKind::Mod => ArithOp::Mod,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.parse_unary()?;
            left = Expr::Arithmetic {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    /// UnaryExpr ::= UnionExpr | '-' UnaryExpr
    fn parse_unary(&mut self) -> Result<Expr, Error> {
        if self.tok.kind == TokenKind::Minus {
            self.advance()?;
            let operand = self.parse_unary()?;
            return Ok(Expr::Negate(Box::new(operand)));
        }
        self.parse_union()
    }

    /// UnionExpr ::= PathExpr ('|' PathExpr)*
    fn parse_union(&mut self) -> Result<Expr, Error> {
        let start = self.tok.start;
        let mut left = self.parse_path()?;
        while self.tok.kind == TokenKind::Pipe {
            self.require_node_set(&left, start)?;
            self.advance()?;
            let right_start = self.tok.start;
            let right = self.parse_path()?;
            self.require_node_set(&right, right_start)?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.tok.kind,
            TokenKind::NameTest
                | TokenKind::NodeType
                | TokenKind::Axis
                | TokenKind::At
                | TokenKind::Dot
                | TokenKind::DotDot
        )
    }

    fn starts_filter(&self) -> bool {
        matches!(
            self.tok.kind,
            TokenKind::Literal
                | TokenKind::Number
                | TokenKind::Variable
                | TokenKind::LParen
                | TokenKind::FunctionName
        )
    }

    /// PathExpr ::= LocationPath
    ///            | FilterExpr
    ///            | FilterExpr '/' RelativeLocationPath
    ///            | FilterExpr '//' RelativeLocationPath
    fn parse_path(&mut self) -> Result<Expr, Error> {
        match self.tok.kind {
            TokenKind::Slash => {
                self.advance()?;
                if !self.starts_step() {
                    return Ok(Expr::Root);
                }
                let step = self.parse_step()?;
                self.parse_path_tail(Expr::Path {
                    left: Box::new(Expr::Root),
                    step,
                })
            }
            TokenKind::DoubleSlash => {
                self.advance()?;
                let step = self.parse_step()?;
                let descend = Expr::Path {
                    left: Box::new(Expr::Root),
                    step: dos_step(),
                };
                self.parse_path_tail(Expr::Path {
                    left: Box::new(descend),
                    step,
                })
            }
            _ if self.starts_filter() => {
                let start = self.tok.start;
                let filter = self.parse_filter()?;
                if matches!(self.tok.kind, TokenKind::Slash | TokenKind::DoubleSlash) {
                    self.require_node_set(&filter, start)?;
                    return self.parse_path_tail(filter);
                }
                Ok(filter)
            }
            _ if self.starts_step() => {
                let step = self.parse_step()?;
                self.parse_path_tail(Expr::Step(step))
            }
            _ => Err(self.unexpected(&OPERAND_START)),
        }
    }

    /// ('/' Step | '//' Step)*
    fn parse_path_tail(&mut self, mut expr: Expr) -> Result<Expr, Error> {
        loop {
            match self.tok.kind {
                TokenKind::Slash => {
                    self.advance()?;
                    let step = self.parse_step()?;
                    expr = Expr::Path {
                        left: Box::new(expr),
                        step,
                    };
                }
                TokenKind::DoubleSlash => {
                    self.advance()?;
                    let step = self.parse_step()?;
                    let descend = Expr::Path {
                        left: Box::new(expr),
                        step: dos_step(),
                    };
                    expr = Expr::Path {
                        left: Box::new(descend),
                        step,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Step ::= AxisSpecifier NodeTest Predicate* | '.' | '..'
    fn parse_step(&mut self) -> Result<Arc<Step>, Error> {
        let axis = match self.tok.kind {
            TokenKind::Dot => {
                self.advance()?;
                return Ok(Arc::new(Step::new(Axis::SelfAxis, NodeTest::AnyNode)));
            }
            TokenKind::DotDot => {
                self.advance()?;
                return Ok(Arc::new(Step::new(Axis::Parent, NodeTest::AnyNode)));
            }
            TokenKind::At => {
                self.advance()?;
                Axis::Attribute
            }
            TokenKind::Axis => {
                let TokenValue::Axis(axis) = self.tok.value else {
                    return Err(self.unexpected(&STEP_START));
                };
                self.advance()?;
                axis
            }
            TokenKind::NameTest | TokenKind::NodeType => Axis::Child,
            _ => return Err(self.unexpected(&STEP_START)),
        };
        let test = self.parse_node_test()?;
        let mut step = Step::new(axis, test);
        step.predicates = self.parse_predicates()?;
        Ok(Arc::new(step))
    }

    /// NodeTest ::= NameTest | NodeType '(' ')' | 'processing-instruction' '(' Literal ')'
    fn parse_node_test(&mut self) -> Result<NodeTest, Error> {
        match (&self.tok.kind, &self.tok.value) {
            (TokenKind::NameTest, TokenValue::Name { prefix, local }) => {
                let test = match (prefix, local.as_str()) {
                    (None, "*") => NodeTest::Principal,
                    (Some(p), "*") => NodeTest::NamespaceWildcard(self.resolve_prefix(p)?),
                    (Some(p), l) => NodeTest::Name {
                        ns_uri: self.resolve_prefix(p)?,
                        local: l.to_string(),
                    },
                    (None, l) => NodeTest::Name {
                        ns_uri: String::new(),
                        local: l.to_string(),
                    },
                };
                self.advance()?;
                Ok(test)
            }
            (TokenKind::NodeType, TokenValue::Text(name)) => {
                let name = name.clone();
                self.advance()?;
                self.expect(TokenKind::LParen)?;
                let test = match name.as_str() {
                    "node" => NodeTest::AnyNode,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => {
                        let target = match (&self.tok.kind, &self.tok.value) {
                            (TokenKind::Literal, TokenValue::Text(t)) => Some(t.to_string()),
                            _ => None,
                        };
                        if target.is_some() {
                            self.advance()?;
                        }
                        NodeTest::ProcessingInstruction(target)
                    }
                };
                self.expect(TokenKind::RParen)?;
                Ok(test)
            }
            _ => Err(self.unexpected(&["name test", "node type test"])),
        }
    }

    /// Predicate* ::= ('[' Expr ']')*
    fn parse_predicates(&mut self) -> Result<Vec<Arc<Expr>>, Error> {
        let mut predicates = Vec::new();
        while self.tok.kind == TokenKind::LBracket {
            self.advance()?;
            let expr = self.parse_expr()?;
            self.expect(TokenKind::RBracket)?;
            predicates.push(Arc::new(expr));
        }
        Ok(predicates)
    }

    /// FilterExpr ::= PrimaryExpr Predicate*
    fn parse_filter(&mut self) -> Result<Expr, Error> {
        let start = self.tok.start;
        let primary = self.parse_primary()?;
        if self.tok.kind != TokenKind::LBracket {
            return Ok(primary);
        }
        self.require_node_set(&primary, start)?;
        let predicates = self.parse_predicates()?;
        Ok(Expr::Filter {
            base: Box::new(primary),
            predicates,
        })
    }

    /// PrimaryExpr ::= VariableReference | '(' Expr ')' | Literal | Number | FunctionCall
    fn parse_primary(&mut self) -> Result<Expr, Error> {
        match (&self.tok.kind, &self.tok.value) {
            (TokenKind::Variable, TokenValue::Name { prefix, local }) => {
                let name = self.expanded_name(prefix.as_ref(), local)?;
                self.advance()?;
                Ok(Expr::Variable(name))
            }
            (TokenKind::LParen, _) => {
                self.advance()?;
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            (TokenKind::Literal, TokenValue::Text(t)) => {
                let lit = Expr::Literal(t.to_string());
                self.advance()?;
                Ok(lit)
            }
            (TokenKind::Number, TokenValue::Number(n)) => {
                let num = Expr::Number(*n);
                self.advance()?;
                Ok(num)
            }
            (TokenKind::FunctionName, _) => self.parse_function_call(),
            _ => Err(self.unexpected(&OPERAND_START)),
        }
    }

    /// FunctionCall ::= FunctionName '(' (Argument (',' Argument)*)? ')'
    fn parse_function_call(&mut self) -> Result<Expr, Error> {
        let start = self.tok.start;
        let name = match &self.tok.value {
            TokenValue::Name { prefix, local } => self.expanded_name(prefix.as_ref(), local)?,
            _ => return Err(self.unexpected(&["function name"])),
        };
        self.advance()?;
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        let mut arg_starts = Vec::new();
        if self.tok.kind != TokenKind::RParen {
            loop {
                arg_starts.push(self.tok.start);
                args.push(self.parse_expr()?);
                if self.tok.kind != TokenKind::Comma {
                    break;
                }
                self.advance()?;
            }
        }
        if self.tok.kind != TokenKind::RParen {
            return Err(self.unexpected(&["','", "')'"]));
        }
        self.advance()?;

        if name.ns_uri.is_some() {
            return Ok(Expr::FunctionCall {
                name,
                args,
                return_type: ReturnType::Any,
            });
        }
        let Some(core) = core_function(&name.local) else {
            return Ok(Expr::FunctionCall {
                name,
                args,
                return_type: ReturnType::Any,
            });
        };
        if args.len() < core.min_arity || core.max_arity.is_some_and(|m| args.len() > m) {
            return Err(Error::from_code(
                ErrorCode::XPST0017,
                format!("function {}() called with {} argument(s)", name.local, args.len()),
            )
            .at(start));
        }
        for &i in core.node_set_args {
            if let (Some(arg), Some(&at)) = (args.get(i), arg_starts.get(i)) {
                self.require_node_set(arg, at)?;
            }
        }
        Ok(match name.local.as_str() {
            "position" => Expr::Position,
            "last" => Expr::Last,
            _ => Expr::FunctionCall {
                name,
                args,
                return_type: core.return_type,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(src: &str) -> String {
        parse(src, &StaticContext::default()).unwrap().to_string()
    }

    #[test]
    fn abbreviations_expand() {
        assert_eq!(render("//a"), "/descendant-or-self::node()/child::a");
        assert_eq!(render("../@x"), "parent::node()/attribute::x");
        assert_eq!(render("a//b"), "child::a/descendant-or-self::node()/child::b");
        assert_eq!(render("."), "self::node()");
    }

    #[test]
    fn precedence_ladder() {
        assert_eq!(render("1 + 2 * 3"), "(1 + (2 * 3))");
        assert_eq!(render("a or b and c = d"), "(child::a or (child::b and (child::c = child::d)))");
        assert_eq!(render("-1 - -2"), "(-(1) - -(2))");
        assert_eq!(render("1 - 2 - 3"), "((1 - 2) - 3)");
        assert_eq!(render("- a | b"), "-((child::a | child::b))");
    }

    #[test]
    fn filter_and_step_predicates_keep_order() {
        assert_eq!(render("(a)[1][@x]"), "(child::a)[1][attribute::x]");
        assert_eq!(render("a[2][last()]"), "child::a[2][last()]");
    }
}
