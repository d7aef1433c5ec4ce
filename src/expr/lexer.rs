//! Tokenizer for filter expressions

use super::CompileError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum TokenKind {
    Ident(String),
    Int(i64),
    Str(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Bang,
    AndAnd,
    OrOr,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "{name}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
            Self::LBracket => write!(f, "["),
            Self::RBracket => write!(f, "]"),
            Self::Comma => write!(f, ","),
            Self::Dot => write!(f, "."),
            Self::Bang => write!(f, "!"),
            Self::AndAnd => write!(f, "&&"),
            Self::OrOr => write!(f, "||"),
            Self::EqEq => write!(f, "=="),
            Self::NotEq => write!(f, "!="),
            Self::Lt => write!(f, "<"),
            Self::Le => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::Ge => write!(f, ">="),
        }
    }
}

/// A token and its byte offset in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Token {
    pub kind: TokenKind,
    pub pos: usize,
}

pub(super) fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        let kind = match ch {
            '(' => single(&mut chars, TokenKind::LParen),
            ')' => single(&mut chars, TokenKind::RParen),
            '[' => single(&mut chars, TokenKind::LBracket),
            ']' => single(&mut chars, TokenKind::RBracket),
            ',' => single(&mut chars, TokenKind::Comma),
            '.' => single(&mut chars, TokenKind::Dot),
            '!' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '=').is_some() {
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            '=' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '=').is_none() {
                    return Err(CompileError::UnexpectedChar { ch: '=', pos });
                }
                TokenKind::EqEq
            }
            '<' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '=').is_some() {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '=').is_some() {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '&' | '|' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == ch).is_none() {
                    return Err(CompileError::UnexpectedChar { ch, pos });
                }
                if ch == '&' {
                    TokenKind::AndAnd
                } else {
                    TokenKind::OrOr
                }
            }
            '"' | '\'' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        None => return Err(CompileError::UnterminatedString { pos }),
                        Some((_, c)) if c == ch => break,
                        Some((escape_pos, '\\')) => match chars.next() {
                            Some((_, 'n')) => value.push('\n'),
                            Some((_, 't')) => value.push('\t'),
                            Some((_, c @ ('\\' | '"' | '\''))) => value.push(c),
                            Some((_, c)) => {
                                return Err(CompileError::InvalidEscape { ch: c, pos: escape_pos });
                            }
                            None => return Err(CompileError::UnterminatedString { pos }),
                        },
                        Some((_, c)) => value.push(c),
                    }
                }
                TokenKind::Str(value)
            }
            c if c.is_ascii_digit() => {
                let mut text = String::new();
                while let Some((_, d)) = chars.next_if(|&(_, d)| d.is_ascii_digit() || d == '_') {
                    if d != '_' {
                        text.push(d);
                    }
                }
                let n = text
                    .parse::<i64>()
                    .map_err(|_| CompileError::InvalidNumber { text, pos })?;
                TokenKind::Int(n)
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some((_, d)) = chars.next_if(|&(_, d)| d.is_alphanumeric() || d == '_') {
                    name.push(d);
                }
                TokenKind::Ident(name)
            }
            other => return Err(CompileError::UnexpectedChar { ch: other, pos }),
        };

        tokens.push(Token { kind, pos });
    }

    Ok(tokens)
}

fn single(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    kind: TokenKind,
) -> TokenKind {
    chars.next();
    kind
}
