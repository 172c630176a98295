//! Execution phase enums
//!
//! Only `Try` needs more than one phase; every other statement finishes in a
//! single step or is re-entered from its own start after a resume.

use serde::{Deserialize, Serialize};

/// Execution phase for Try statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TryPhase {
    /// Body not pushed yet
    Enter = 0,
    /// Executing the guarded body
    Body = 1,
    /// Executing a matched handler
    Handler = 2,
    /// Executing the finally clause
    Finally = 3,
}
