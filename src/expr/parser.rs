//! Recursive-descent parser producing the expression tree

use super::CompileError;
use super::lexer::{Token, TokenKind};
use super::value::Value;
use regex::Regex;

/// Binary comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
}

impl BinaryOp {
    pub(super) const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Contains => "contains",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::Matches => "matches",
        }
    }
}

#[derive(Debug, Clone)]
pub(super) enum Expr {
    Literal(Value),
    List(Vec<Expr>),
    Ident(String),
    Member(Box<Expr>, String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// `matches` with a literal pattern, compiled up front
    Regex(Box<Expr>, Regex),
}

/// Deepest nesting of groups, negations and operator chains accepted
pub const MAX_DEPTH: usize = 128;

pub(super) fn parse(tokens: Vec<Token>) -> Result<Expr, CompileError> {
    let mut parser = Parser {
        tokens,
        index: 0,
        depth: 0,
    };
    let expr = parser.or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(CompileError::UnexpectedToken {
            found: token.kind.to_string(),
            pos: token.pos,
        }),
    }
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn peek_ident(&self, offset: usize) -> Option<&str> {
        match self.tokens.get(self.index + offset).map(|t| &t.kind) {
            Some(TokenKind::Ident(name)) => Some(name),
            _ => None,
        }
    }

    fn pos(&self) -> usize {
        self.peek().map_or(0, |t| t.pos)
    }

    /// Count one more level of tree depth at `pos`
    fn nest(&mut self, pos: usize) -> Result<(), CompileError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CompileError::TooDeep { pos });
        }
        Ok(())
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    fn expect(&mut self, expected: &TokenKind) -> Result<(), CompileError> {
        match self.advance() {
            Some(token) if &token.kind == expected => Ok(()),
            Some(token) => Err(CompileError::UnexpectedToken {
                found: token.kind.to_string(),
                pos: token.pos,
            }),
            None => Err(CompileError::UnexpectedEnd),
        }
    }

    fn or(&mut self) -> Result<Expr, CompileError> {
        let depth = self.depth;
        let mut left = self.and()?;
        while matches!(self.peek_kind(), Some(TokenKind::OrOr)) || self.peek_ident(0) == Some("or")
        {
            self.nest(self.pos())?;
            self.advance();
            let right = self.and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, CompileError> {
        let depth = self.depth;
        let mut left = self.equality()?;
        while matches!(self.peek_kind(), Some(TokenKind::AndAnd))
            || self.peek_ident(0) == Some("and")
        {
            self.nest(self.pos())?;
            self.advance();
            let right = self.equality()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, CompileError> {
        let depth = self.depth;
        let mut left = self.relational()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::EqEq) => BinaryOp::Eq,
                Some(TokenKind::NotEq) => BinaryOp::Ne,
                _ => break,
            };
            self.nest(self.pos())?;
            self.advance();
            let right = self.relational()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn relational_op(&self) -> Option<(BinaryOp, usize)> {
        let op = match self.peek_kind()? {
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Le => BinaryOp::Le,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Ge => BinaryOp::Ge,
            TokenKind::Ident(name) => match name.as_str() {
                "in" => BinaryOp::In,
                "not" if self.peek_ident(1) == Some("in") => return Some((BinaryOp::NotIn, 2)),
                "contains" => BinaryOp::Contains,
                "startsWith" => BinaryOp::StartsWith,
                "endsWith" => BinaryOp::EndsWith,
                "matches" => BinaryOp::Matches,
                _ => return None,
            },
            _ => return None,
        };
        Some((op, 1))
    }

    fn relational(&mut self) -> Result<Expr, CompileError> {
        let depth = self.depth;
        let mut left = self.unary()?;
        while let Some((op, width)) = self.relational_op() {
            self.nest(self.pos())?;
            self.index += width;
            let right = self.unary()?;
            left = match (op, right) {
                (BinaryOp::Matches, Expr::Literal(Value::Str(pattern))) => {
                    let regex = Regex::new(&pattern).map_err(|e| CompileError::InvalidRegex {
                        pattern: pattern.clone(),
                        message: e.to_string(),
                    })?;
                    Expr::Regex(Box::new(left), regex)
                }
                (op, right) => Expr::Binary(op, Box::new(left), Box::new(right)),
            };
        }
        self.depth = depth;
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, CompileError> {
        if matches!(self.peek_kind(), Some(TokenKind::Bang)) || self.peek_ident(0) == Some("not") {
            self.nest(self.pos())?;
            self.advance();
            let operand = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(operand)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, CompileError> {
        let depth = self.depth;
        let mut expr = self.primary()?;
        while matches!(self.peek_kind(), Some(TokenKind::Dot)) {
            self.nest(self.pos())?;
            self.advance();
            match self.advance() {
                Some(Token {
                    kind: TokenKind::Ident(field),
                    ..
                }) => expr = Expr::Member(Box::new(expr), field),
                Some(token) => {
                    return Err(CompileError::UnexpectedToken {
                        found: token.kind.to_string(),
                        pos: token.pos,
                    });
                }
                None => return Err(CompileError::UnexpectedEnd),
            }
        }
        self.depth = depth;
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, CompileError> {
        let Some(token) = self.advance() else {
            return Err(CompileError::UnexpectedEnd);
        };

        match token.kind {
            TokenKind::Int(n) => Ok(Expr::Literal(Value::Int(n))),
            TokenKind::Str(s) => Ok(Expr::Literal(Value::Str(s))),
            TokenKind::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" | "nil" => Ok(Expr::Literal(Value::Null)),
                "and" | "or" | "in" | "not" | "contains" | "startsWith" | "endsWith"
                | "matches" => Err(CompileError::UnexpectedToken {
                    found: name,
                    pos: token.pos,
                }),
                _ => Ok(Expr::Ident(name)),
            },
            TokenKind::LParen => {
                self.nest(token.pos)?;
                let inner = self.or()?;
                self.expect(&TokenKind::RParen)?;
                self.depth -= 1;
                Ok(inner)
            }
            TokenKind::LBracket => {
                self.nest(token.pos)?;
                let mut items = Vec::new();
                if !matches!(self.peek_kind(), Some(TokenKind::RBracket)) {
                    loop {
                        items.push(self.or()?);
                        if matches!(self.peek_kind(), Some(TokenKind::Comma)) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RBracket)?;
                self.depth -= 1;
                Ok(Expr::List(items))
            }
            other => Err(CompileError::UnexpectedToken {
                found: other.to_string(),
                pos: token.pos,
            }),
        }
    }
}
