//! Rule: Nested Suspension
//!
//! Reports an error when `yield` or `yield from` appears inside an expression
//! rather than as the outermost expression of a statement.
//!
//! # Valid
//!
//! ```text
//! yield 1
//! let x = yield 1
//! x = yield from spawn inner()
//! return yield from [1, 2]
//! report yield "ready"
//! ```
//!
//! # Invalid
//!
//! ```text
//! let x = (yield 1) + 1          // yield inside binary op
//! [yield 1]                      // yield inside list
//! if (yield 1) { }               // yield in condition
//! yield (yield 1)                // yield inside yield
//! ```

use crate::engine::types::{Computation, Expr, Stmt};

use super::super::{ValidationError, ValidationRule};

const MESSAGE: &str = "yield must be the outermost expression of a statement";

/// Rule that checks for suspension points nested inside other expressions.
pub struct NestedSuspensionRule;

impl ValidationRule for NestedSuspensionRule {
    fn id(&self) -> &'static str {
        "nested-suspension"
    }

    fn description(&self) -> &'static str {
        "yield and yield from must be at statement level, not nested in expressions"
    }

    fn validate(&self, computation: &Computation) -> Vec<ValidationError> {
        let mut checker = Checker {
            computation: &computation.name,
            rule_id: self.id(),
            errors: Vec::new(),
        };
        checker.stmt(&computation.body);
        checker.errors
    }
}

struct Checker<'a> {
    computation: &'a str,
    rule_id: &'static str,
    errors: Vec<ValidationError>,
}

impl Checker<'_> {
    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            // These allow a suspension as the outermost expression
            Stmt::Expr { expr } | Stmt::Assign { expr, .. } => self.top_level(expr),
            Stmt::Report { value } => self.top_level(value),
            Stmt::Raise { error } => self.top_level(error),
            Stmt::Let { init, .. } | Stmt::Return { value: init } => {
                if let Some(expr) = init {
                    self.top_level(expr);
                }
            }

            // These don't
            Stmt::If {
                test,
                then_s,
                else_s,
            } => {
                self.nested(test);
                self.stmt(then_s);
                if let Some(else_stmt) = else_s {
                    self.stmt(else_stmt);
                }
            }

            Stmt::While { test, body } => {
                self.nested(test);
                self.stmt(body);
            }

            Stmt::Try {
                body,
                handlers,
                finally_s,
            } => {
                self.stmt(body);
                for handler in handlers {
                    self.stmt(&handler.body);
                }
                if let Some(finally_stmt) = finally_s {
                    self.stmt(finally_stmt);
                }
            }

            Stmt::Block { body } => {
                for stmt in body {
                    self.stmt(stmt);
                }
            }

            Stmt::Break | Stmt::Continue => {}
        }
    }

    /// The outermost suspension is fine; its operand is checked as nested
    fn top_level(&mut self, expr: &Expr) {
        match expr {
            Expr::Yield { value } => {
                if let Some(inner) = value {
                    self.nested(inner);
                }
            }
            Expr::YieldFrom { inner } => self.nested(inner),
            _ => self.nested(expr),
        }
    }

    fn nested(&mut self, expr: &Expr) {
        match expr {
            Expr::Yield { value } => {
                self.report();
                if let Some(inner) = value {
                    self.nested(inner);
                }
            }

            Expr::YieldFrom { inner } => {
                self.report();
                self.nested(inner);
            }

            Expr::Binary { left, right, .. } => {
                self.nested(left);
                self.nested(right);
            }

            Expr::Not { inner } => self.nested(inner),

            Expr::Member { object, .. } => self.nested(object),

            Expr::List { elements } => {
                for element in elements {
                    self.nested(element);
                }
            }

            Expr::Spawn { args, .. } => {
                for arg in args {
                    self.nested(arg);
                }
            }

            Expr::Error { payload, .. } => {
                if let Some(payload) = payload {
                    self.nested(payload);
                }
            }

            Expr::Ident { .. }
            | Expr::LitBool { .. }
            | Expr::LitNum { .. }
            | Expr::LitStr { .. }
            | Expr::LitNull => {}
        }
    }

    fn report(&mut self) {
        self.errors
            .push(ValidationError::error(self.computation, MESSAGE, self.rule_id));
    }
}
