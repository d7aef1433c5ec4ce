//! Tree-walking evaluation against an [`EvalContext`]

use super::EvalError;
use super::parser::{BinaryOp, Expr};
use super::value::{EvalContext, Value};
use regex::Regex;

pub(super) fn eval(expr: &Expr, ctx: &EvalContext) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::List(items) => items
            .iter()
            .map(|item| eval(item, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Expr::Ident(name) => ctx
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
        Expr::Member(target, field) => match eval(target, ctx)? {
            Value::Map(mut fields) => fields
                .remove(field)
                .ok_or_else(|| EvalError::UndefinedField(field.clone())),
            other => Err(EvalError::NotAMap {
                field: field.clone(),
                kind: other.kind(),
            }),
        },
        Expr::Not(operand) => Ok(Value::Bool(!as_bool(&eval(operand, ctx)?, "not")?)),
        // Short-circuit so a guard on the left can protect the right side.
        Expr::And(left, right) => {
            if !as_bool(&eval(left, ctx)?, "&&")? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(as_bool(&eval(right, ctx)?, "&&")?))
        }
        Expr::Or(left, right) => {
            if as_bool(&eval(left, ctx)?, "||")? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(as_bool(&eval(right, ctx)?, "||")?))
        }
        Expr::Binary(op, left, right) => {
            let left = eval(left, ctx)?;
            let right = eval(right, ctx)?;
            binary(*op, &left, &right).map(Value::Bool)
        }
        Expr::Regex(target, regex) => match eval(target, ctx)? {
            Value::Str(s) => Ok(Value::Bool(regex.is_match(&s))),
            other => Err(EvalError::TypeMismatch {
                op: BinaryOp::Matches.symbol(),
                left: other.kind(),
                right: "string",
            }),
        },
    }
}

fn as_bool(value: &Value, op: &'static str) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(EvalError::NotBoolean {
            op,
            kind: other.kind(),
        }),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    let mismatch = || EvalError::TypeMismatch {
        op: op.symbol(),
        left: left.kind(),
        right: right.kind(),
    };

    match op {
        BinaryOp::Eq => Ok(left == right),
        BinaryOp::Ne => Ok(left != right),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (left, right) {
                (Value::Int(a), Value::Int(b)) => a.cmp(b),
                (Value::Str(a), Value::Str(b)) => a.cmp(b),
                _ => return Err(mismatch()),
            };
            Ok(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            })
        }
        BinaryOp::In | BinaryOp::NotIn => {
            let found = membership(left, right).ok_or_else(mismatch)?;
            Ok(if op == BinaryOp::In { found } else { !found })
        }
        BinaryOp::Contains => membership(right, left).ok_or_else(mismatch),
        BinaryOp::StartsWith | BinaryOp::EndsWith => match (left, right) {
            (Value::Str(a), Value::Str(b)) => Ok(if op == BinaryOp::StartsWith {
                a.starts_with(b.as_str())
            } else {
                a.ends_with(b.as_str())
            }),
            _ => Err(mismatch()),
        },
        BinaryOp::Matches => match (left, right) {
            (Value::Str(s), Value::Str(pattern)) => {
                let regex = Regex::new(pattern).map_err(|e| EvalError::InvalidRegex {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
                Ok(regex.is_match(s))
            }
            _ => Err(mismatch()),
        },
    }
}

/// `needle in haystack`; `None` when the combination has no meaning
fn membership(needle: &Value, haystack: &Value) -> Option<bool> {
    match (needle, haystack) {
        (_, Value::List(items)) => Some(items.contains(needle)),
        (Value::Str(n), Value::Str(h)) => Some(h.contains(n.as_str())),
        (Value::Str(key), Value::Map(fields)) => Some(fields.contains_key(key)),
        _ => None,
    }
}
