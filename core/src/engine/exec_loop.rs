//! Core execution loop
//!
//! This module contains the step() function - the heart of the interpreter.
//! It processes one activation at a time, advancing phases and managing the
//! activation stack.
//!
//! ## Function Organization
//! 1. run_for() - Driver (calls step repeatedly under a budget)
//! 2. step() - Main execution loop (dispatches to statement handlers)
//! 3. unwind() - Routes break/continue/return/throw to their targets

use super::errors::{kinds, Envelope};
use super::statements::{
    enter_finally, enter_handler, execute_assign, execute_block, execute_break, execute_continue,
    execute_expr, execute_if, execute_let, execute_raise, execute_report, execute_return,
    execute_try, execute_while,
};
use super::types::{ActivationKind, Control, Stmt, TryPhase};
use super::vm::{Host, Step, Vm};

/* ===================== Public API ===================== */

/// Run at most `budget` steps
///
/// Returns `Step::Continue` when the budget ran out before the VM halted.
pub fn run_for(vm: &mut Vm, host: &mut dyn Host, budget: u64) -> Step {
    for _ in 0..budget {
        if step(vm, host) == Step::Done {
            return Step::Done;
        }
    }
    Step::Continue
}

/// Execute one step of the VM
pub fn step(vm: &mut Vm, host: &mut dyn Host) -> Step {
    match vm.control {
        Control::None => {}
        Control::Yield(_) | Control::Delegate(_) => return Step::Done,
        _ => return unwind(vm),
    }

    // Get top activation (if any)
    let Some(idx) = vm.activations.len().checked_sub(1) else {
        // No activations left - execution complete
        return Step::Done;
    };

    // Clone what we need (to avoid borrow checker issues)
    let (kind, node) = {
        let a = &vm.activations[idx];
        (a.kind.clone(), a.node.clone())
    };

    match (kind, node) {
        (ActivationKind::Block { idx }, Stmt::Block { body }) => execute_block(vm, idx, &body),

        (ActivationKind::Let, Stmt::Let { name, init }) => {
            execute_let(vm, &name, init.as_ref(), host)
        }

        (ActivationKind::Assign, Stmt::Assign { name, expr }) => {
            execute_assign(vm, &name, &expr, host)
        }

        (ActivationKind::Expr, Stmt::Expr { expr }) => execute_expr(vm, &expr, host),

        (ActivationKind::Report, Stmt::Report { value }) => execute_report(vm, &value, host),

        (
            ActivationKind::If,
            Stmt::If {
                test,
                then_s,
                else_s,
            },
        ) => execute_if(vm, &test, &then_s, else_s.as_deref(), host),

        (ActivationKind::While, Stmt::While { test, body }) => {
            execute_while(vm, &test, &body, host)
        }

        (ActivationKind::Break, Stmt::Break) => execute_break(vm),

        (ActivationKind::Continue, Stmt::Continue) => execute_continue(vm),

        (ActivationKind::Return, Stmt::Return { value }) => {
            execute_return(vm, value.as_ref(), host)
        }

        (ActivationKind::Raise, Stmt::Raise { error }) => execute_raise(vm, &error, host),

        (
            ActivationKind::Try { phase, pending },
            Stmt::Try {
                body, finally_s, ..
            },
        ) => execute_try(vm, phase, pending, &body, finally_s.as_deref()),

        // Only reachable through a hand-edited snapshot
        (kind, _) => {
            vm.control = Control::Throw(Envelope::with_message(
                kinds::INVALID_CONTROL,
                format!("Activation {:?} does not match its statement", kind),
            ));
            Step::Continue
        }
    }
}

/* ===================== Control Flow ===================== */

/// Unwind the stack while control flow is active
///
/// Pops activations until one of them takes over the control flow:
/// - While consumes Break and Continue
/// - Try in its body phase catches a Throw whose kind a handler accepts
/// - Try in its body or handler phase runs its finally clause first,
///   parking the control flow until the clause completes
///
/// With nothing left to pop, the control flow becomes the body's result.
fn unwind(vm: &mut Vm) -> Step {
    loop {
        let Some(idx) = vm.activations.len().checked_sub(1) else {
            return Step::Done;
        };

        let kind = vm.activations[idx].kind.clone();
        match kind {
            ActivationKind::While => match vm.control {
                Control::Break => {
                    vm.activations.pop();
                    vm.control = Control::None;
                    return Step::Continue;
                }
                Control::Continue => {
                    vm.control = Control::None;
                    return Step::Continue;
                }
                _ => {
                    vm.activations.pop();
                }
            },

            ActivationKind::Try { phase, .. }
                if matches!(phase, TryPhase::Body | TryPhase::Handler) =>
            {
                let Stmt::Try {
                    handlers,
                    finally_s,
                    ..
                } = vm.activations[idx].node.clone()
                else {
                    vm.activations.pop();
                    continue;
                };

                if phase == TryPhase::Body {
                    if let Control::Throw(envelope) = &vm.control {
                        if let Some(handler) = handlers.iter().find(|h| h.matches(&envelope.kind))
                        {
                            let envelope = envelope.clone();
                            enter_handler(vm, handler, envelope);
                            return Step::Continue;
                        }
                    }
                }

                match finally_s {
                    Some(finally_stmt) => {
                        let pending = std::mem::take(&mut vm.control);
                        enter_finally(vm, Some(pending), &finally_stmt);
                        return Step::Continue;
                    }
                    None => {
                        vm.activations.pop();
                    }
                }
            }

            _ => {
                vm.activations.pop();
            }
        }
    }
}
