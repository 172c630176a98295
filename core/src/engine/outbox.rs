//! Outbox for values bodies hand to the driver
//!
//! Bodies never print. A `Report` statement records the value here, tagged
//! with the Frame that produced it, and the driver drains the log after each
//! operation.

use super::frame::FrameId;
use super::types::Val;
use serde::{Deserialize, Serialize};

/// One reported value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub frame: FrameId,
    pub value: Val,
}

/// Ordered log of reports across all Frames of an engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Outbox {
    reports: Vec<Report>,
}

impl Outbox {
    pub fn push(&mut self, frame: FrameId, value: Val) {
        self.reports.push(Report { frame, value });
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    /// Take every report recorded so far
    pub fn drain(&mut self) -> Vec<Report> {
        std::mem::take(&mut self.reports)
    }
}
