//! Frames: suspended computations owned by the engine
//!
//! A Frame is an arena slot holding one body's interpreter state plus the
//! lifecycle bookkeeping the engine checks on every operation.

use super::errors::Envelope;
use super::types::Val;
use super::vm::Vm;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a Frame (index into the engine arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(pub(crate) usize);

impl FrameId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

/// Frame lifecycle status
///
/// Transitions: Created -> Running -> {Suspended, Completed, Failed} and
/// Suspended -> Running -> ... . Completed and Failed are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameStatus {
    Created,
    Suspended,
    Running,
    Completed,
    Failed,
}

impl FrameStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, FrameStatus::Completed | FrameStatus::Failed)
    }
}

impl fmt::Display for FrameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameStatus::Created => "created",
            FrameStatus::Suspended => "suspended",
            FrameStatus::Running => "running",
            FrameStatus::Completed => "completed",
            FrameStatus::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Result of one engine operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Outcome {
    Suspended(Val),
    Completed(Val),
    Failed(Envelope),
}

impl Outcome {
    pub fn is_suspended(&self) -> bool {
        matches!(self, Outcome::Suspended(_))
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_suspended()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Suspended(v) => write!(f, "suspended {}", v),
            Outcome::Completed(v) => write!(f, "completed {}", v),
            Outcome::Failed(e) => write!(f, "failed {}", e),
        }
    }
}

/// Arena record for one Frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct FrameRecord {
    /// Name of the computation the Frame was created from
    pub name: String,
    pub status: FrameStatus,
    pub vm: Vm,
    /// Inner Frame this one is currently delegating to
    pub delegate: Option<FrameId>,
    /// Outer Frame currently delegating to this one
    pub delegator: Option<FrameId>,
    pub result: Option<Val>,
    pub failure: Option<Envelope>,
}

impl FrameRecord {
    pub fn new(name: String, vm: Vm) -> Self {
        Self {
            name,
            status: FrameStatus::Created,
            vm,
            delegate: None,
            delegator: None,
            result: None,
            failure: None,
        }
    }

    pub fn complete(&mut self, value: Val) {
        self.status = FrameStatus::Completed;
        self.result = Some(value);
        self.failure = None;
        self.vm.discard();
    }

    pub fn fail(&mut self, envelope: Envelope) {
        self.status = FrameStatus::Failed;
        self.failure = Some(envelope);
        self.result = None;
        self.vm.discard();
    }

    /// The recorded outcome of a finished Frame
    pub fn terminal_outcome(&self) -> Option<Outcome> {
        match self.status {
            FrameStatus::Completed => Some(Outcome::Completed(
                self.result.clone().unwrap_or_default(),
            )),
            FrameStatus::Failed => self.failure.clone().map(Outcome::Failed),
            _ => None,
        }
    }
}
