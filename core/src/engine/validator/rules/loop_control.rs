//! Rule: Loop Control
//!
//! Reports an error for `break` or `continue` with no enclosing `while`.
//! Handlers and finally clauses inside a loop still count as inside it.

use crate::engine::types::{Computation, Stmt};

use super::super::{ValidationError, ValidationRule};

pub struct LoopControlRule;

impl ValidationRule for LoopControlRule {
    fn id(&self) -> &'static str {
        "loop-control"
    }

    fn description(&self) -> &'static str {
        "break and continue must appear inside a while loop"
    }

    fn validate(&self, computation: &Computation) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        check(&computation.body, false, &mut |keyword| {
            errors.push(ValidationError::error(
                &computation.name,
                format!("'{}' outside of a loop", keyword),
                self.id(),
            ));
        });
        errors
    }
}

fn check(stmt: &Stmt, in_loop: bool, report: &mut dyn FnMut(&str)) {
    match stmt {
        Stmt::Break if !in_loop => report("break"),
        Stmt::Continue if !in_loop => report("continue"),

        Stmt::While { body, .. } => check(body, true, report),

        Stmt::If { then_s, else_s, .. } => {
            check(then_s, in_loop, report);
            if let Some(else_stmt) = else_s {
                check(else_stmt, in_loop, report);
            }
        }

        Stmt::Try {
            body,
            handlers,
            finally_s,
        } => {
            check(body, in_loop, report);
            for handler in handlers {
                check(&handler.body, in_loop, report);
            }
            if let Some(finally_stmt) = finally_s {
                check(finally_stmt, in_loop, report);
            }
        }

        Stmt::Block { body } => {
            for stmt in body {
                check(stmt, in_loop, report);
            }
        }

        _ => {}
    }
}
