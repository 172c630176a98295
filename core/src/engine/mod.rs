//! Suspend/resume engine
//!
//! A computation body is a tree of statements run by a stack-driven
//! interpreter, one activation per statement, so a body can stop at any
//! suspension point and be held until a driver resumes it, raises into it, or
//! closes it. The [`Engine`] owns every Frame and routes driver operations
//! through delegation chains to the innermost Frame.
//!
//! ## Module layout
//! - `types` - body nodes, runtime values, control flow
//! - `vm`, `exec_loop`, `statements`, `expressions` - the interpreter
//! - `frame`, `coroutine`, `delegation` - Frames and the driver operations
//! - `errors` - envelopes, injection forms, driver-facing errors
//! - `outbox` - values reported by bodies
//! - `validator` - static checks run before a body is accepted

pub mod coroutine;
mod delegation;
pub mod errors;
pub mod exec_loop;
pub mod expressions;
pub mod frame;
pub mod outbox;
pub mod statements;
pub mod types;
pub mod validator;
pub mod vm;

pub use coroutine::Engine;
pub use errors::{kinds, EngineError, Envelope, Injection};
pub use frame::{FrameId, FrameStatus, Outcome};
pub use outbox::Report;
pub use types::{BinaryOp, Computation, Expr, Handler, Stmt, Val};
pub use vm::{Host, Vm};

#[cfg(test)]
mod tests;
