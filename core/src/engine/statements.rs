//! Statement execution handlers
//!
//! Each statement type has its own handler. A handler either finishes its
//! statement and pops the activation, pushes child activations, or sets
//! `vm.control` and leaves the activation in place so it can be re-entered
//! after a resume or unwound after a throw.

use super::errors::{kinds, Envelope};
use super::expressions::{eval_expr, eval_stmt_expr, EvalResult};
use super::types::{ActivationKind, Control, Expr, Handler, Stmt, TryPhase, Val};
use super::vm::{push_stmt, Host, Step, Vm};

/* ===================== Helpers ===================== */

/// Evaluate an expression where a suspension may be outermost
///
/// Returns None when the statement must stop here; `vm.control` then says why.
fn eval_in_stmt(vm: &mut Vm, expr: &Expr, host: &mut dyn Host) -> Option<Val> {
    let result = eval_stmt_expr(expr, &vm.env, &mut vm.resume_value, host);
    settle(vm, result)
}

/// Evaluate a condition, where suspension is not allowed
fn eval_condition(vm: &mut Vm, expr: &Expr, host: &mut dyn Host) -> Option<bool> {
    let result = eval_expr(expr, &vm.env, host);
    settle(vm, result).map(|v| v.is_truthy())
}

fn settle(vm: &mut Vm, result: EvalResult) -> Option<Val> {
    match result {
        EvalResult::Value { v } => Some(v),
        EvalResult::Suspend { v } => {
            vm.control = Control::Yield(v);
            None
        }
        EvalResult::Delegate { target } => {
            vm.control = Control::Delegate(target);
            None
        }
        EvalResult::Throw { error } => {
            vm.control = Control::Throw(error);
            None
        }
    }
}

fn set_top_kind(vm: &mut Vm, kind: ActivationKind) {
    if let Some(top) = vm.activations.last_mut() {
        top.kind = kind;
    }
}

/* ===================== Statement Handlers ===================== */

/// Execute Block statement
pub fn execute_block(vm: &mut Vm, idx: usize, body: &[Stmt]) -> Step {
    // Block complete, pop activation
    let Some(child) = body.get(idx) else {
        vm.activations.pop();
        return Step::Continue;
    };

    set_top_kind(vm, ActivationKind::Block { idx: idx + 1 });
    push_stmt(vm, child);

    Step::Continue
}

/// Execute Let statement
pub fn execute_let(vm: &mut Vm, name: &str, init: Option<&Expr>, host: &mut dyn Host) -> Step {
    let value = match init {
        Some(expr) => match eval_in_stmt(vm, expr, host) {
            Some(v) => v,
            None => return Step::Continue,
        },
        None => Val::Null,
    };

    vm.env.insert(name.to_string(), value);
    vm.activations.pop();
    Step::Continue
}

/// Execute Assign statement
pub fn execute_assign(vm: &mut Vm, name: &str, expr: &Expr, host: &mut dyn Host) -> Step {
    let Some(value) = eval_in_stmt(vm, expr, host) else {
        return Step::Continue;
    };

    if !vm.env.contains_key(name) {
        vm.control = Control::Throw(Envelope::with_message(
            kinds::UNDEFINED_VARIABLE,
            format!("Cannot assign to undeclared variable '{}'", name),
        ));
        return Step::Continue;
    }

    vm.env.insert(name.to_string(), value);
    vm.activations.pop();
    Step::Continue
}

/// Execute Expr statement
pub fn execute_expr(vm: &mut Vm, expr: &Expr, host: &mut dyn Host) -> Step {
    if eval_in_stmt(vm, expr, host).is_some() {
        vm.activations.pop();
    }
    Step::Continue
}

/// Execute Report statement
pub fn execute_report(vm: &mut Vm, value: &Expr, host: &mut dyn Host) -> Step {
    if let Some(v) = eval_in_stmt(vm, value, host) {
        host.report(v);
        vm.activations.pop();
    }
    Step::Continue
}

/// Execute If statement
///
/// The If activation is replaced by the chosen branch.
pub fn execute_if(
    vm: &mut Vm,
    test: &Expr,
    then_s: &Stmt,
    else_s: Option<&Stmt>,
    host: &mut dyn Host,
) -> Step {
    let Some(cond) = eval_condition(vm, test, host) else {
        return Step::Continue;
    };

    vm.activations.pop();
    if cond {
        push_stmt(vm, then_s);
    } else if let Some(else_stmt) = else_s {
        push_stmt(vm, else_stmt);
    }
    Step::Continue
}

/// Execute While statement
///
/// The While activation stays below its body and re-checks the test each
/// time the body finishes.
pub fn execute_while(vm: &mut Vm, test: &Expr, body: &Stmt, host: &mut dyn Host) -> Step {
    let Some(cond) = eval_condition(vm, test, host) else {
        return Step::Continue;
    };

    if cond {
        push_stmt(vm, body);
    } else {
        vm.activations.pop();
    }
    Step::Continue
}

/// Execute Break statement
pub fn execute_break(vm: &mut Vm) -> Step {
    vm.control = Control::Break;
    vm.activations.pop();
    Step::Continue
}

/// Execute Continue statement
pub fn execute_continue(vm: &mut Vm) -> Step {
    vm.control = Control::Continue;
    vm.activations.pop();
    Step::Continue
}

/// Execute Return statement
pub fn execute_return(vm: &mut Vm, value: Option<&Expr>, host: &mut dyn Host) -> Step {
    let v = match value {
        Some(expr) => match eval_in_stmt(vm, expr, host) {
            Some(v) => v,
            None => return Step::Continue,
        },
        None => Val::Null,
    };

    vm.control = Control::Return(v);
    vm.activations.pop();
    Step::Continue
}

/// Execute Raise statement
pub fn execute_raise(vm: &mut Vm, error: &Expr, host: &mut dyn Host) -> Step {
    let Some(v) = eval_in_stmt(vm, error, host) else {
        return Step::Continue;
    };

    let envelope = match v {
        Val::Error(envelope) => *envelope,
        Val::Str(kind) => Envelope::of_kind(kind),
        other => Envelope::with_message(
            kinds::TYPE_ERROR,
            format!("Cannot raise a {} value", other.type_name()),
        ),
    };

    // Leave the activation in place; unwinding pops it
    vm.control = Control::Throw(envelope);
    Step::Continue
}

/// Execute Try statement (normal flow only; throws are routed by unwinding)
pub fn execute_try(
    vm: &mut Vm,
    phase: TryPhase,
    pending: Option<Box<Control>>,
    body: &Stmt,
    finally_s: Option<&Stmt>,
) -> Step {
    match phase {
        TryPhase::Enter => {
            set_top_kind(
                vm,
                ActivationKind::Try {
                    phase: TryPhase::Body,
                    pending: None,
                },
            );
            push_stmt(vm, body);
        }

        TryPhase::Body | TryPhase::Handler => match finally_s {
            Some(finally_stmt) => enter_finally(vm, None, finally_stmt),
            None => {
                vm.activations.pop();
            }
        },

        TryPhase::Finally => {
            vm.activations.pop();
            if let Some(control) = pending {
                vm.control = *control;
            }
        }
    }

    Step::Continue
}

/* ===================== Unwinding Targets ===================== */

/// Switch the top Try activation into a matched handler
pub fn enter_handler(vm: &mut Vm, handler: &Handler, envelope: Envelope) {
    if let Some(name) = &handler.bind {
        vm.env.insert(name.clone(), Val::Error(Box::new(envelope)));
    }
    vm.control = Control::None;
    set_top_kind(
        vm,
        ActivationKind::Try {
            phase: TryPhase::Handler,
            pending: None,
        },
    );
    push_stmt(vm, &handler.body);
}

/// Switch the top Try activation into its finally clause
///
/// `pending` is the control flow to re-establish once the clause finishes.
pub fn enter_finally(vm: &mut Vm, pending: Option<Control>, finally_s: &Stmt) {
    vm.control = Control::None;
    set_top_kind(
        vm,
        ActivationKind::Try {
            phase: TryPhase::Finally,
            pending: pending.map(Box::new),
        },
    );
    push_stmt(vm, finally_s);
}
