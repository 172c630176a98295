//! Exception envelopes and engine errors
//!
//! An [`Envelope`] is what bodies raise and catch and what drivers inject. The
//! engine routes envelopes but never looks inside their payloads.
//! [`EngineError`] is the driver-facing error for misuse of the engine itself.

use super::frame::FrameId;
use super::types::Val;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Envelope kinds raised by the engine itself
pub mod kinds {
    /// Injected at the suspension point by `close`
    pub const CANCELLATION: &str = "Cancellation";
    pub const EXHAUSTED: &str = "Exhausted";
    pub const ALREADY_RUNNING: &str = "AlreadyRunning";
    pub const LEAKED_SUSPENSION: &str = "LeakedSuspensionOnClose";
    pub const UNDEFINED_VARIABLE: &str = "UndefinedVariable";
    pub const TYPE_ERROR: &str = "TypeError";
    pub const UNKNOWN_COMPUTATION: &str = "UnknownComputation";
    pub const STEP_BUDGET_EXCEEDED: &str = "StepBudgetExceeded";
    pub const DELEGATION_DEPTH_EXCEEDED: &str = "DelegationDepthExceeded";
    /// break/continue escaping every loop, or a misplaced suspension
    pub const INVALID_CONTROL: &str = "InvalidControl";
}

/* ===================== Envelope ===================== */

/// Tagged error value: a caller-defined kind plus an opaque payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub kind: String,
    #[serde(default)]
    pub payload: Val,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, payload: Val) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Envelope with a `Null` payload
    pub fn of_kind(kind: impl Into<String>) -> Self {
        Self::new(kind, Val::Null)
    }

    /// Envelope carrying a human-readable message as its payload
    pub fn with_message(kind: &str, message: impl Into<String>) -> Self {
        Self::new(kind, Val::Str(message.into()))
    }

    pub fn cancellation() -> Self {
        Self::of_kind(kinds::CANCELLATION)
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Val::Null => write!(f, "{}", self.kind),
            payload => write!(f, "{}({})", self.kind, payload),
        }
    }
}

/* ===================== Injection ===================== */

/// The accepted argument forms of `Engine::inject`
///
/// All forms normalize to one [`Envelope`]:
/// - a bare kind gets a `Null` payload, so it equals the kind with an explicit
///   `Null` payload
/// - a kind whose payload is already an envelope of that same kind uses that
///   envelope as-is
#[derive(Debug, Clone, PartialEq)]
pub enum Injection {
    Kind(String),
    KindWithPayload(String, Val),
    Envelope(Envelope),
}

impl Injection {
    pub fn into_envelope(self) -> Envelope {
        match self {
            Injection::Kind(kind) => Envelope::of_kind(kind),
            Injection::KindWithPayload(kind, Val::Error(envelope)) if envelope.kind == kind => {
                *envelope
            }
            Injection::KindWithPayload(kind, payload) => Envelope::new(kind, payload),
            Injection::Envelope(envelope) => envelope,
        }
    }
}

impl From<&str> for Injection {
    fn from(kind: &str) -> Self {
        Injection::Kind(kind.to_string())
    }
}

impl From<String> for Injection {
    fn from(kind: String) -> Self {
        Injection::Kind(kind)
    }
}

impl From<(&str, Val)> for Injection {
    fn from((kind, payload): (&str, Val)) -> Self {
        Injection::KindWithPayload(kind.to_string(), payload)
    }
}

impl From<(String, Val)> for Injection {
    fn from((kind, payload): (String, Val)) -> Self {
        Injection::KindWithPayload(kind, payload)
    }
}

impl From<Envelope> for Injection {
    fn from(envelope: Envelope) -> Self {
        Injection::Envelope(envelope)
    }
}

/* ===================== Engine Errors ===================== */

/// Errors reported to the driver for misuse of the engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("{0} has already finished")]
    Exhausted(FrameId),

    #[error("{0} is already running")]
    AlreadyRunning(FrameId),

    #[error("{0} suspended while being closed")]
    LeakedSuspensionOnClose(FrameId),

    #[error("{0} has not been started")]
    NotStarted(FrameId),

    #[error("{0} has already been started")]
    AlreadyStarted(FrameId),

    #[error("{0} can only be bound before it starts")]
    NotCreated(FrameId),

    #[error("unknown frame: {0}")]
    UnknownFrame(FrameId),

    #[error("unknown computation: '{0}'")]
    UnknownComputation(String),

    #[error("computation '{computation}' takes {expected} arguments, got {got}")]
    ArityMismatch {
        computation: String,
        expected: usize,
        got: usize,
    },

    #[error("computation '{name}' failed validation: {}", errors.join("; "))]
    InvalidComputation { name: String, errors: Vec<String> },
}

impl EngineError {
    /// The envelope used when this error surfaces inside a body
    pub fn to_envelope(&self) -> Envelope {
        let kind = match self {
            EngineError::Exhausted(_) => kinds::EXHAUSTED,
            EngineError::AlreadyRunning(_) => kinds::ALREADY_RUNNING,
            EngineError::LeakedSuspensionOnClose(_) => kinds::LEAKED_SUSPENSION,
            EngineError::UnknownComputation(_) => kinds::UNKNOWN_COMPUTATION,
            EngineError::ArityMismatch { .. } | EngineError::UnknownFrame(_) => kinds::TYPE_ERROR,
            EngineError::NotStarted(_)
            | EngineError::AlreadyStarted(_)
            | EngineError::NotCreated(_)
            | EngineError::InvalidComputation { .. } => kinds::INVALID_CONTROL,
        };
        Envelope::with_message(kind, self.to_string())
    }
}
