//! Validation Rules
//!
//! Each file in this module contains one validation rule:
//!
//! - `nested_suspension.rs` - `yield`/`yield from` nested inside other expressions
//! - `loop_control.rs` - `break`/`continue` outside of a loop
//! - `unreachable_code.rs` - Statements after `return`, `raise`, `break` or `continue`

mod loop_control;
mod nested_suspension;
mod unreachable_code;

pub use loop_control::LoopControlRule;
pub use nested_suspension::NestedSuspensionRule;
pub use unreachable_code::UnreachableCodeRule;
