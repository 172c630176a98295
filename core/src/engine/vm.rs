//! Interpreter state for one body
//!
//! The VM holds all execution state of a single Frame:
//! - activations: Stack of active statements
//! - env: Flat variable environment
//! - control: Current control flow state (return, throw, yield, etc.)
//! - resume_value: Value waiting to be picked up by the paused suspension point

use super::errors::Envelope;
use super::types::{Activation, ActivationKind, Control, Stmt, TryPhase, Val};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/* ===================== Host ===================== */

/// Services a body needs from the engine while it runs
pub trait Host {
    /// Create a Frame from a registered computation and return its handle
    fn spawn(&mut self, computation: &str, args: Vec<Val>) -> Result<Val, Envelope>;

    /// Deliver a value to the driver
    fn report(&mut self, value: Val);
}

/* ===================== VM ===================== */

/// Virtual Machine state
///
/// This contains everything needed to pause and resume a body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vm {
    /// Stack of activations
    pub activations: Vec<Activation>,

    /// Variables visible to the body
    pub env: HashMap<String, Val>,

    /// Current control flow state
    pub control: Control,

    /// Result for the pending suspension point
    pub resume_value: Option<Val>,
}

impl Vm {
    /// Create a new VM with a program
    ///
    /// The program is pushed as the root activation; nothing runs until the
    /// first step.
    pub fn new(program: Stmt, env: HashMap<String, Val>) -> Self {
        let mut vm = Vm {
            activations: vec![],
            env,
            control: Control::None,
            resume_value: None,
        };

        push_stmt(&mut vm, &program);

        vm
    }

    /// Supply the result of the pending suspension point
    ///
    /// Returns false when the VM is not paused.
    pub fn resume(&mut self, value: Val) -> bool {
        if !self.control.is_halted() {
            return false;
        }
        self.control = Control::None;
        self.resume_value = Some(value);
        true
    }

    /// Raise an envelope at the current position
    ///
    /// On a paused VM this is the suspension point; on a fresh VM it happens
    /// before the first statement runs.
    pub fn throw(&mut self, envelope: Envelope) {
        self.resume_value = None;
        self.control = Control::Throw(envelope);
    }

    /// Drop all execution state of a finished body
    pub fn discard(&mut self) {
        self.activations.clear();
        self.env.clear();
        self.control = Control::None;
        self.resume_value = None;
    }
}

/* ===================== Activation Management ===================== */

/// Push a new activation for a statement onto the stack
pub fn push_stmt(vm: &mut Vm, stmt: &Stmt) {
    let kind = match stmt {
        Stmt::Block { .. } => ActivationKind::Block { idx: 0 },
        Stmt::Let { .. } => ActivationKind::Let,
        Stmt::Assign { .. } => ActivationKind::Assign,
        Stmt::Expr { .. } => ActivationKind::Expr,
        Stmt::Report { .. } => ActivationKind::Report,
        Stmt::If { .. } => ActivationKind::If,
        Stmt::While { .. } => ActivationKind::While,
        Stmt::Break => ActivationKind::Break,
        Stmt::Continue => ActivationKind::Continue,
        Stmt::Return { .. } => ActivationKind::Return,
        Stmt::Raise { .. } => ActivationKind::Raise,
        Stmt::Try { .. } => ActivationKind::Try {
            phase: TryPhase::Enter,
            pending: None,
        },
    };

    vm.activations.push(Activation {
        kind,
        node: stmt.clone(),
    });
}

/* ===================== Step Result ===================== */

/// Result of executing one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Continue to next step
    Continue,
    /// Execution halted (finished, suspended, or delegating)
    Done,
}
