//! Filter expressions over pull request metadata
//!
//! A [`Predicate`] is compiled once per run and evaluated for every pull
//! request against an [`EvalContext`]. The language is a small subset of the
//! `expr` language: boolean logic (`&&`, `||`, `!`, `and`, `or`, `not`),
//! comparisons (`==`, `!=`, `<`, `<=`, `>`, `>=`), membership (`in`,
//! `not in`, `contains`), string tests (`startsWith`, `endsWith`,
//! `matches`), list literals and dotted field access.
//!
//! ```
//! use run_ci::expr::{EvalContext, Predicate, Value};
//!
//! let predicate = Predicate::compile(r#"draft == false && !("wip" in labels)"#).unwrap();
//! let ctx: EvalContext = [
//!     ("draft", Value::Bool(false)),
//!     ("labels", Value::from(vec!["bug"])),
//! ]
//! .into_iter()
//! .collect();
//! assert!(predicate.evaluate(&ctx).unwrap());
//! ```

mod eval;
mod lexer;
mod parser;
mod value;

pub use parser::MAX_DEPTH;
pub use value::{EvalContext, Value};

use thiserror::Error;

/// Expression could not be compiled
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompileError {
    /// Character not valid anywhere in an expression
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar {
        /// The character
        ch: char,
        /// Byte offset
        pos: usize,
    },

    /// String literal without closing quote
    #[error("unterminated string starting at position {pos}")]
    UnterminatedString {
        /// Byte offset of the opening quote
        pos: usize,
    },

    /// Unknown backslash escape in a string literal
    #[error("invalid escape '\\{ch}' at position {pos}")]
    InvalidEscape {
        /// The escaped character
        ch: char,
        /// Byte offset of the backslash
        pos: usize,
    },

    /// Integer literal out of range
    #[error("invalid number '{text}' at position {pos}")]
    InvalidNumber {
        /// Literal text
        text: String,
        /// Byte offset
        pos: usize,
    },

    /// Token in a place the grammar does not allow
    #[error("unexpected '{found}' at position {pos}")]
    UnexpectedToken {
        /// Rendered token
        found: String,
        /// Byte offset
        pos: usize,
    },

    /// Input ended in the middle of an expression
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// Nesting or operator chains exceed [`MAX_DEPTH`]
    #[error("expression nested too deeply at position {pos}")]
    TooDeep {
        /// Byte offset where the limit was hit
        pos: usize,
    },

    /// Literal `matches` pattern is not a valid regex
    #[error("invalid regex {pattern:?}: {message}")]
    InvalidRegex {
        /// The pattern
        pattern: String,
        /// Regex compiler message
        message: String,
    },
}

/// Expression failed for one particular context
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvalError {
    /// Reference to a name the context does not define
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    /// Reference to a missing field of a map
    #[error("undefined field '{0}'")]
    UndefinedField(String),

    /// Field access on something that is not a map
    #[error("cannot access field '{field}' of {kind}")]
    NotAMap {
        /// Requested field
        field: String,
        /// Kind of the target value
        kind: &'static str,
    },

    /// Operator applied to unsupported operand kinds
    #[error("operator '{op}' is not defined for {left} and {right}")]
    TypeMismatch {
        /// Operator symbol
        op: &'static str,
        /// Left operand kind
        left: &'static str,
        /// Right operand kind
        right: &'static str,
    },

    /// Logical operator or final result was not a boolean
    #[error("'{op}' expects a bool, got {kind}")]
    NotBoolean {
        /// Operator (or `result` for the whole expression)
        op: &'static str,
        /// Kind that was found
        kind: &'static str,
    },

    /// Dynamic `matches` pattern is not a valid regex
    #[error("invalid regex {pattern:?}: {message}")]
    InvalidRegex {
        /// The pattern
        pattern: String,
        /// Regex compiler message
        message: String,
    },
}

/// A compiled, immutable filter
///
/// Safe to share across candidates: evaluation only reads the tree and the
/// context it is given.
#[derive(Debug, Clone)]
pub struct Predicate {
    source: String,
    root: Option<parser::Expr>,
}

impl Predicate {
    /// Compile an expression
    ///
    /// An empty or whitespace-only source selects every pull request.
    pub fn compile(source: &str) -> Result<Self, CompileError> {
        if source.trim().is_empty() {
            return Ok(Self::always());
        }
        let tokens = lexer::tokenize(source)?;
        let root = parser::parse(tokens)?;
        Ok(Self {
            source: source.to_string(),
            root: Some(root),
        })
    }

    /// A predicate that accepts everything
    pub const fn always() -> Self {
        Self {
            source: String::new(),
            root: None,
        }
    }

    /// Whether this predicate accepts everything without looking at the context
    pub const fn is_always(&self) -> bool {
        self.root.is_none()
    }

    /// Original source text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against a context
    pub fn evaluate(&self, ctx: &EvalContext) -> Result<bool, EvalError> {
        let Some(root) = &self.root else {
            return Ok(true);
        };
        match eval::eval(root, ctx)? {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::NotBoolean {
                op: "result",
                kind: other.kind(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PullRequest;

    fn pr() -> PullRequest {
        PullRequest {
            number: 42,
            html_url: "https://github.com/o/r/pull/42".to_string(),
            title: "WIP: add retries".to_string(),
            head_ref: "feat/retries".to_string(),
            head_sha: "h42".to_string(),
            base_ref: "main".to_string(),
            base_sha: "b42".to_string(),
            author: "octocat".to_string(),
            labels: vec!["enhancement".to_string(), "ci".to_string()],
            is_draft: false,
        }
    }

    fn check(source: &str) -> Result<bool, EvalError> {
        Predicate::compile(source)
            .unwrap()
            .evaluate(&EvalContext::from_pull_request(&pr()))
    }

    #[test]
    fn test_empty_source_accepts_everything() {
        let predicate = Predicate::compile("   ").unwrap();
        assert!(predicate.is_always());
        assert_eq!(predicate.evaluate(&EvalContext::default()), Ok(true));
    }

    #[test]
    fn test_draft_filter() {
        assert_eq!(check("draft == false"), Ok(true));
        assert_eq!(check("draft"), Ok(false));
        assert_eq!(check("!draft && not draft"), Ok(true));
    }

    #[test]
    fn test_membership_and_strings() {
        assert_eq!(check(r#""ci" in labels"#), Ok(true));
        assert_eq!(check(r#""wip" not in labels"#), Ok(true));
        assert_eq!(check(r#"labels contains "enhancement""#), Ok(true));
        assert_eq!(check(r#"title startsWith "WIP""#), Ok(true));
        assert_eq!(check(r#"head endsWith "retries""#), Ok(true));
        assert_eq!(check(r#"title contains "retries""#), Ok(true));
        assert_eq!(check(r#"author in ["octocat", "hubot"]"#), Ok(true));
    }

    #[test]
    fn test_matches_regex() {
        assert_eq!(check(r#"head matches "^feat/""#), Ok(true));
        assert_eq!(check(r#"base matches "^release-\\d+$""#), Ok(false));
    }

    #[test]
    fn test_comparisons_and_precedence() {
        assert_eq!(check("number > 40 && number <= 42"), Ok(true));
        assert_eq!(check("number < 10 || base == 'main' && !draft"), Ok(true));
        assert_eq!(check("(number < 10 || base == 'main') && draft"), Ok(false));
    }

    #[test]
    fn test_member_access() {
        assert_eq!(check("pr.number == number"), Ok(true));
        assert_eq!(
            check("pr.milestone == null"),
            Err(EvalError::UndefinedField("milestone".to_string()))
        );
        assert!(matches!(
            check("title.length == 3"),
            Err(EvalError::NotAMap { .. })
        ));
    }

    #[test]
    fn test_undefined_variable_is_eval_error() {
        assert_eq!(
            check("reviewers == 2"),
            Err(EvalError::UndefinedVariable("reviewers".to_string()))
        );
    }

    #[test]
    fn test_short_circuit_skips_right_side() {
        assert_eq!(check("draft && undefined_name"), Ok(false));
        assert_eq!(check("!draft || undefined_name"), Ok(true));
    }

    #[test]
    fn test_type_errors() {
        assert!(matches!(
            check("number < 'ten'"),
            Err(EvalError::TypeMismatch { op: "<", .. })
        ));
        assert_eq!(
            check("title"),
            Err(EvalError::NotBoolean {
                op: "result",
                kind: "string"
            })
        );
    }

    #[test]
    fn test_compile_errors() {
        assert_eq!(
            Predicate::compile("draft ==").unwrap_err(),
            CompileError::UnexpectedEnd
        );
        assert!(matches!(
            Predicate::compile("draft == false)"),
            Err(CompileError::UnexpectedToken { pos: 14, .. })
        ));
        assert!(matches!(
            Predicate::compile(r#"title matches "(""#),
            Err(CompileError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn test_deep_nesting_is_compile_error() {
        let negations = format!("{}true", "!".repeat(20_000));
        assert_eq!(
            Predicate::compile(&negations).unwrap_err(),
            CompileError::TooDeep { pos: MAX_DEPTH }
        );

        let groups = format!("{}true{}", "(".repeat(20_000), ")".repeat(20_000));
        assert_eq!(
            Predicate::compile(&groups).unwrap_err(),
            CompileError::TooDeep { pos: MAX_DEPTH }
        );

        let chain = vec!["true"; 5_000].join(" && ");
        assert!(matches!(
            Predicate::compile(&chain),
            Err(CompileError::TooDeep { .. })
        ));

        let within = format!("{}true", "!".repeat(100));
        let ctx = EvalContext::from_pull_request(&pr());
        assert_eq!(Predicate::compile(&within).unwrap().evaluate(&ctx), Ok(true));
    }

    #[test]
    fn test_evaluation_is_repeatable() {
        let predicate = Predicate::compile(r#""ci" in labels && number == 42"#).unwrap();
        let ctx = EvalContext::from_pull_request(&pr());
        let first = predicate.evaluate(&ctx);
        for _ in 0..3 {
            assert_eq!(predicate.evaluate(&ctx), first);
        }
    }
}
