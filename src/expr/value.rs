//! Values and the read-only evaluation context

use crate::types::PullRequest;
use std::collections::BTreeMap;

/// A value an expression can produce or look up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// `null`
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// String
    Str(String),
    /// List of values
    List(Vec<Value>),
    /// Named fields, reachable with `.`
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Type name for error messages
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// Read-only variables visible to a filter expression
///
/// Built once per pull request. There is no way to change a context after it
/// has been built, so evaluation can never leak state between candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvalContext {
    vars: BTreeMap<String, Value>,
}

impl EvalContext {
    /// Build the documented context for a pull request
    ///
    /// Top-level names: `number`, `title`, `draft`, `author`, `labels`,
    /// `base`, `head`, `base_sha`, `head_sha`, and `pr` (a map holding the
    /// same fields).
    pub fn from_pull_request(pr: &PullRequest) -> Self {
        let fields: BTreeMap<String, Value> = [
            ("number", Value::Int(i64::try_from(pr.number).unwrap_or(i64::MAX))),
            ("title", Value::from(pr.title.as_str())),
            ("draft", Value::Bool(pr.is_draft)),
            ("author", Value::from(pr.author.as_str())),
            ("labels", Value::from(pr.labels.clone())),
            ("base", Value::from(pr.base_ref.as_str())),
            ("head", Value::from(pr.head_ref.as_str())),
            ("base_sha", Value::from(pr.base_sha.as_str())),
            ("head_sha", Value::from(pr.head_sha.as_str())),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();

        let mut vars = fields.clone();
        vars.insert("pr".to_string(), Value::Map(fields));
        Self { vars }
    }

    /// Look up a top-level variable
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Names of all top-level variables
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for EvalContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
