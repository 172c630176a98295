//! Expression evaluation
//!
//! Expressions are evaluated in one go. The only exceptions are the two
//! suspension forms, `Yield` and `YieldFrom`, which may appear solely as the
//! outermost expression of a statement. When the statement is re-entered after
//! a resume, the suspension node picks up `resume_value` instead of
//! evaluating its operand again.

use super::errors::{kinds, Envelope};
use super::types::{BinaryOp, Expr, Val};
use super::vm::Host;
use std::collections::HashMap;

/// Result of evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub enum EvalResult {
    /// Expression produced a value
    Value { v: Val },
    /// Expression hit a suspension point
    Suspend { v: Val },
    /// Expression hit a delegation point
    Delegate { target: Val },
    /// Expression raised an envelope
    Throw { error: Envelope },
}

macro_rules! value_or_return {
    ($result:expr) => {
        match $result {
            EvalResult::Value { v } => v,
            other => return other,
        }
    };
}

fn throw(kind: &str, message: impl Into<String>) -> EvalResult {
    EvalResult::Throw {
        error: Envelope::with_message(kind, message),
    }
}

/// Evaluate an expression in statement position
pub fn eval_stmt_expr(
    expr: &Expr,
    env: &HashMap<String, Val>,
    resume_value: &mut Option<Val>,
    host: &mut dyn Host,
) -> EvalResult {
    match expr {
        Expr::Yield { value } => {
            if let Some(v) = resume_value.take() {
                return EvalResult::Value { v };
            }
            let v = match value {
                Some(inner) => value_or_return!(eval_expr(inner, env, host)),
                None => Val::Null,
            };
            EvalResult::Suspend { v }
        }

        Expr::YieldFrom { inner } => {
            if let Some(v) = resume_value.take() {
                return EvalResult::Value { v };
            }
            let target = value_or_return!(eval_expr(inner, env, host));
            EvalResult::Delegate { target }
        }

        _ => eval_expr(expr, env, host),
    }
}

/// Evaluate an expression in nested position, where suspension is not allowed
pub fn eval_expr(expr: &Expr, env: &HashMap<String, Val>, host: &mut dyn Host) -> EvalResult {
    match expr {
        Expr::LitNull => EvalResult::Value { v: Val::Null },

        Expr::LitBool { v } => EvalResult::Value { v: Val::Bool(*v) },

        Expr::LitNum { v } => EvalResult::Value { v: Val::Num(*v) },

        Expr::LitStr { v } => EvalResult::Value {
            v: Val::Str(v.clone()),
        },

        Expr::List { elements } => {
            let mut items = Vec::with_capacity(elements.len());
            for element in elements {
                items.push(value_or_return!(eval_expr(element, env, host)));
            }
            EvalResult::Value { v: Val::List(items) }
        }

        Expr::Ident { name } => match env.get(name) {
            Some(v) => EvalResult::Value { v: v.clone() },
            None => throw(
                kinds::UNDEFINED_VARIABLE,
                format!("Variable '{}' is not defined", name),
            ),
        },

        Expr::Member { object, property } => {
            let object = value_or_return!(eval_expr(object, env, host));
            member(&object, property)
        }

        Expr::Binary { op, left, right } => {
            let left = value_or_return!(eval_expr(left, env, host));
            match op {
                BinaryOp::And if !left.is_truthy() => EvalResult::Value { v: Val::Bool(false) },
                BinaryOp::Or if left.is_truthy() => EvalResult::Value { v: Val::Bool(true) },
                BinaryOp::And | BinaryOp::Or => {
                    let right = value_or_return!(eval_expr(right, env, host));
                    EvalResult::Value {
                        v: Val::Bool(right.is_truthy()),
                    }
                }
                _ => {
                    let right = value_or_return!(eval_expr(right, env, host));
                    binary(*op, left, right)
                }
            }
        }

        Expr::Not { inner } => {
            let v = value_or_return!(eval_expr(inner, env, host));
            EvalResult::Value {
                v: Val::Bool(!v.is_truthy()),
            }
        }

        Expr::Error { kind, payload } => {
            let payload = match payload {
                Some(p) => value_or_return!(eval_expr(p, env, host)),
                None => Val::Null,
            };
            EvalResult::Value {
                v: Val::Error(Box::new(Envelope::new(kind.clone(), payload))),
            }
        }

        Expr::Spawn { computation, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(value_or_return!(eval_expr(arg, env, host)));
            }
            match host.spawn(computation, values) {
                Ok(v) => EvalResult::Value { v },
                Err(error) => EvalResult::Throw { error },
            }
        }

        Expr::Yield { .. } | Expr::YieldFrom { .. } => throw(
            kinds::INVALID_CONTROL,
            "Suspension must be the outermost expression of a statement",
        ),
    }
}

fn member(object: &Val, property: &str) -> EvalResult {
    match (object, property) {
        (Val::Obj(map), _) => match map.get(property) {
            Some(v) => EvalResult::Value { v: v.clone() },
            None => throw(
                kinds::TYPE_ERROR,
                format!("Property '{}' not found", property),
            ),
        },
        (Val::Error(envelope), "kind") => EvalResult::Value {
            v: Val::Str(envelope.kind.clone()),
        },
        (Val::Error(envelope), "payload") => EvalResult::Value {
            v: envelope.payload.clone(),
        },
        (Val::List(items), "length") => EvalResult::Value {
            v: Val::Num(items.len() as f64),
        },
        (Val::Str(s), "length") => EvalResult::Value {
            v: Val::Num(s.chars().count() as f64),
        },
        (other, _) => throw(
            kinds::TYPE_ERROR,
            format!(
                "Cannot access property '{}' on {} value",
                property,
                other.type_name()
            ),
        ),
    }
}

fn binary(op: BinaryOp, left: Val, right: Val) -> EvalResult {
    let v = match (op, left, right) {
        (BinaryOp::Eq, l, r) => Val::Bool(l == r),
        (BinaryOp::Ne, l, r) => Val::Bool(l != r),

        (BinaryOp::Add, Val::Num(l), Val::Num(r)) => Val::Num(l + r),
        (BinaryOp::Add, Val::Str(l), Val::Str(r)) => Val::Str(l + &r),
        (BinaryOp::Add, Val::List(mut l), Val::List(r)) => {
            l.extend(r);
            Val::List(l)
        }
        (BinaryOp::Sub, Val::Num(l), Val::Num(r)) => Val::Num(l - r),
        (BinaryOp::Mul, Val::Num(l), Val::Num(r)) => Val::Num(l * r),

        (BinaryOp::Lt, Val::Num(l), Val::Num(r)) => Val::Bool(l < r),
        (BinaryOp::Le, Val::Num(l), Val::Num(r)) => Val::Bool(l <= r),
        (BinaryOp::Gt, Val::Num(l), Val::Num(r)) => Val::Bool(l > r),
        (BinaryOp::Ge, Val::Num(l), Val::Num(r)) => Val::Bool(l >= r),
        (BinaryOp::Lt, Val::Str(l), Val::Str(r)) => Val::Bool(l < r),
        (BinaryOp::Le, Val::Str(l), Val::Str(r)) => Val::Bool(l <= r),
        (BinaryOp::Gt, Val::Str(l), Val::Str(r)) => Val::Bool(l > r),
        (BinaryOp::Ge, Val::Str(l), Val::Str(r)) => Val::Bool(l >= r),

        (op, l, r) => {
            return throw(
                kinds::TYPE_ERROR,
                format!(
                    "Unsupported operand types for {:?}: {} and {}",
                    op,
                    l.type_name(),
                    r.type_name()
                ),
            )
        }
    };
    EvalResult::Value { v }
}
