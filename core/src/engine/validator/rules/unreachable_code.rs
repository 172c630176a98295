//! Rule: Unreachable Code
//!
//! Warns about statements in a block that follow a statement which always
//! transfers control away: `return`, `raise`, `break` or `continue`.

use crate::engine::types::{Computation, Stmt};

use super::super::{ValidationError, ValidationRule};

pub struct UnreachableCodeRule;

impl ValidationRule for UnreachableCodeRule {
    fn id(&self) -> &'static str {
        "unreachable-code"
    }

    fn description(&self) -> &'static str {
        "statements after return, raise, break or continue never run"
    }

    fn validate(&self, computation: &Computation) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        walk(&computation.body, &mut |after| {
            errors.push(ValidationError::warning(
                &computation.name,
                format!("unreachable code after '{}'", after),
                self.id(),
            ));
        });
        errors
    }
}

fn walk(stmt: &Stmt, report: &mut dyn FnMut(&str)) {
    match stmt {
        Stmt::Block { body } => {
            for (i, stmt) in body.iter().enumerate() {
                walk(stmt, report);
                if let Some(keyword) = terminator(stmt) {
                    if i + 1 < body.len() {
                        report(keyword);
                    }
                    break;
                }
            }
        }

        Stmt::If { then_s, else_s, .. } => {
            walk(then_s, report);
            if let Some(else_stmt) = else_s {
                walk(else_stmt, report);
            }
        }

        Stmt::While { body, .. } => walk(body, report),

        Stmt::Try {
            body,
            handlers,
            finally_s,
        } => {
            walk(body, report);
            for handler in handlers {
                walk(&handler.body, report);
            }
            if let Some(finally_stmt) = finally_s {
                walk(finally_stmt, report);
            }
        }

        _ => {}
    }
}

fn terminator(stmt: &Stmt) -> Option<&'static str> {
    match stmt {
        Stmt::Return { .. } => Some("return"),
        Stmt::Raise { .. } => Some("raise"),
        Stmt::Break => Some("break"),
        Stmt::Continue => Some("continue"),
        _ => None,
    }
}
