//! Type definitions for the engine
//!
//! - Body nodes (Stmt, Expr, Computation)
//! - Runtime values (Val)
//! - Control flow (Control, Activation, ActivationKind)
//! - Phases for multi-step statements

pub mod ast;
pub mod control;
pub mod phase;
pub mod values;

pub use ast::{BinaryOp, Computation, Expr, Handler, Stmt};
pub use control::{Activation, ActivationKind, Control};
pub use phase::TryPhase;
pub use values::Val;
