//! Control flow and activation types

use super::ast::Stmt;
use super::phase::TryPhase;
use super::values::Val;
use crate::engine::errors::Envelope;
use serde::{Deserialize, Serialize};

/* ===================== Control Flow ===================== */

/// Control flow state
///
/// Break, Continue, Return and Throw make the interpreter unwind the
/// activation stack. Yield and Delegate halt it: the body stays paused at the
/// current activation until the engine resumes it or raises into it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Control {
    #[default]
    None,
    Break,
    Continue,
    Return(Val),
    Throw(Envelope),
    /// Paused at a suspension point with the yielded value
    Yield(Val),
    /// Paused at a delegation point with the delegation target
    Delegate(Val),
}

impl Control {
    /// True when the body is paused rather than unwinding
    pub fn is_halted(&self) -> bool {
        matches!(self, Control::Yield(_) | Control::Delegate(_))
    }
}

/* ===================== Activations ===================== */

/// Activation kind - the type and state of a statement being executed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum ActivationKind {
    Block {
        idx: usize,
    },
    Let,
    Assign,
    Expr,
    Report,
    If,
    While,
    Break,
    Continue,
    Return,
    Raise,
    Try {
        phase: TryPhase,
        /// Control parked while the finally clause runs
        #[serde(default)]
        pending: Option<Box<Control>>,
    },
}

/// One entry of the activation stack
///
/// The stack replaces the native call stack, so a paused body is plain data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activation {
    #[serde(flatten)]
    pub kind: ActivationKind,

    /// The statement this activation executes
    pub node: Stmt,
}
