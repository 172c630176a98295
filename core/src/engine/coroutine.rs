//! Coroutine engine
//!
//! The [`Engine`] owns every Frame in an arena and exposes the driver
//! operations. Each public operation first checks the Frame's status against
//! its transition table, then hands the Frame to the delegation driver, which
//! routes the operation to the innermost active Frame of the chain.
//!
//! | operation | Created       | Suspended      | Running        | Completed / Failed |
//! |-----------|---------------|----------------|----------------|--------------------|
//! | start     | run           | AlreadyStarted | AlreadyRunning | Exhausted          |
//! | resume    | NotStarted    | run            | AlreadyRunning | Exhausted          |
//! | inject    | raise & fail  | run            | AlreadyRunning | Exhausted          |
//! | close     | mark closed   | unwind chain   | AlreadyRunning | replay outcome     |

use super::errors::{kinds, EngineError, Envelope, Injection};
use super::exec_loop::run_for;
use super::frame::{FrameId, FrameRecord, FrameStatus, Outcome};
use super::outbox::{Outbox, Report};
use super::types::{Computation, Control, Stmt, Val};
use super::validator::validate_computation;
use super::vm::{Host, Step, Vm};
use crate::config::EngineConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, trace, warn};

/// What the driver asks a single body to do next
#[derive(Debug, Clone)]
pub(crate) enum Signal {
    Start,
    Send(Val),
    Throw(Envelope),
}

/// Where a single body stopped
#[derive(Debug, Clone)]
pub(crate) enum BodyStep {
    Yielded(Val),
    Delegating(Val),
    Completed(Val),
    Failed(Envelope),
}

/// The suspend/resume engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Engine {
    pub(crate) frames: Vec<FrameRecord>,
    pub(crate) registry: HashMap<String, Computation>,
    pub(crate) outbox: Outbox,
    pub(crate) settings: EngineConfig,
}

impl Engine {
    pub fn new(settings: EngineConfig) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &EngineConfig {
        &self.settings
    }

    /* ===================== Registry & Creation ===================== */

    /// Make a computation available to `spawn` and to `Spawn` expressions
    pub fn register(&mut self, computation: Computation) -> Result<(), EngineError> {
        self.check_computation(&computation)?;
        debug!(computation = %computation.name, "registered computation");
        self.registry.insert(computation.name.clone(), computation);
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registry.contains_key(name)
    }

    /// Create a Frame in the `Created` state
    pub fn create(&mut self, computation: &Computation) -> Result<FrameId, EngineError> {
        self.create_with(computation, HashMap::new())
    }

    /// Create a Frame with initial variable bindings
    pub fn create_with(
        &mut self,
        computation: &Computation,
        bindings: HashMap<String, Val>,
    ) -> Result<FrameId, EngineError> {
        self.check_computation(computation)?;
        Ok(self.alloc(
            computation.name.clone(),
            computation.body.clone(),
            bindings,
        ))
    }

    /// Create a Frame from a registered computation, binding `args` to its
    /// parameters
    pub fn spawn(&mut self, name: &str, args: Vec<Val>) -> Result<FrameId, EngineError> {
        let computation = self
            .registry
            .get(name)
            .ok_or_else(|| EngineError::UnknownComputation(name.to_string()))?;

        if computation.params.len() != args.len() {
            return Err(EngineError::ArityMismatch {
                computation: name.to_string(),
                expected: computation.params.len(),
                got: args.len(),
            });
        }

        let bindings = computation.params.iter().cloned().zip(args).collect();
        let body = computation.body.clone();
        Ok(self.alloc(name.to_string(), body, bindings))
    }

    /// Set a variable of a Frame that has not started yet
    pub fn bind(
        &mut self,
        id: FrameId,
        name: impl Into<String>,
        value: Val,
    ) -> Result<(), EngineError> {
        let record = self.record_mut(id)?;
        if record.status != FrameStatus::Created {
            return Err(EngineError::NotCreated(id));
        }
        record.vm.env.insert(name.into(), value);
        Ok(())
    }

    pub(crate) fn alloc(
        &mut self,
        name: String,
        body: Stmt,
        bindings: HashMap<String, Val>,
    ) -> FrameId {
        let id = FrameId(self.frames.len());
        trace!(frame = %id, computation = %name, "frame created");
        self.frames
            .push(FrameRecord::new(name, Vm::new(body, bindings)));
        id
    }

    fn check_computation(&self, computation: &Computation) -> Result<(), EngineError> {
        if !self.settings.validate {
            return Ok(());
        }

        let (errors, warnings): (Vec<_>, Vec<_>) = validate_computation(computation)
            .into_iter()
            .partition(|e| e.is_error());

        for warning in &warnings {
            warn!(computation = %computation.name, "{}", warning);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(EngineError::InvalidComputation {
                name: computation.name.clone(),
                errors: errors.iter().map(|e| e.to_string()).collect(),
            })
        }
    }

    /* ===================== Driver Operations ===================== */

    /// Run a `Created` Frame until its first outcome
    pub fn start(&mut self, id: FrameId) -> Result<Outcome, EngineError> {
        match self.record(id)?.status {
            FrameStatus::Created => {}
            FrameStatus::Suspended => return Err(EngineError::AlreadyStarted(id)),
            FrameStatus::Running => return Err(EngineError::AlreadyRunning(id)),
            FrameStatus::Completed | FrameStatus::Failed => {
                return Err(EngineError::Exhausted(id))
            }
        }

        debug!(frame = %id, "start");
        Ok(self.drive(id, Signal::Start))
    }

    /// Supply `value` as the result of the pending suspension point
    pub fn resume(&mut self, id: FrameId, value: Val) -> Result<Outcome, EngineError> {
        match self.record(id)?.status {
            FrameStatus::Suspended => {}
            FrameStatus::Created => return Err(EngineError::NotStarted(id)),
            FrameStatus::Running => return Err(EngineError::AlreadyRunning(id)),
            FrameStatus::Completed | FrameStatus::Failed => {
                return Err(EngineError::Exhausted(id))
            }
        }

        debug!(frame = %id, value = %value, "resume");
        Ok(self.drive(id, Signal::Send(value)))
    }

    /// Raise an envelope at the pending suspension point
    ///
    /// On a `Created` Frame the envelope is raised before any of the body
    /// runs, so the Frame fails with it.
    pub fn inject(
        &mut self,
        id: FrameId,
        injection: impl Into<Injection>,
    ) -> Result<Outcome, EngineError> {
        match self.record(id)?.status {
            FrameStatus::Created | FrameStatus::Suspended => {}
            FrameStatus::Running => return Err(EngineError::AlreadyRunning(id)),
            FrameStatus::Completed | FrameStatus::Failed => {
                return Err(EngineError::Exhausted(id))
            }
        }

        let envelope = injection.into().into_envelope();
        debug!(frame = %id, kind = %envelope.kind, "inject");
        Ok(self.drive(id, Signal::Throw(envelope)))
    }

    /// Force termination, unwinding the whole delegation chain
    ///
    /// A finished Frame replays its recorded outcome. A Frame that never
    /// started is marked completed without running. Otherwise every Frame of
    /// the chain receives `Cancellation` at its suspension point, innermost
    /// first.
    pub fn close(&mut self, id: FrameId) -> Result<Outcome, EngineError> {
        let record = self.record(id)?;
        match record.status {
            FrameStatus::Suspended => {}
            FrameStatus::Running => return Err(EngineError::AlreadyRunning(id)),
            FrameStatus::Created => {
                debug!(frame = %id, "closed before start");
                self.frames[id.0].complete(Val::Null);
                return Ok(Outcome::Completed(Val::Null));
            }
            FrameStatus::Completed | FrameStatus::Failed => {
                return Ok(record
                    .terminal_outcome()
                    .unwrap_or(Outcome::Completed(Val::Null)));
            }
        }

        debug!(frame = %id, "close");
        self.close_chain(id)
    }

    /* ===================== Queries ===================== */

    pub fn status(&self, id: FrameId) -> Result<FrameStatus, EngineError> {
        Ok(self.record(id)?.status)
    }

    /// Completion value of a `Completed` Frame
    pub fn result(&self, id: FrameId) -> Result<Option<&Val>, EngineError> {
        Ok(self.record(id)?.result.as_ref())
    }

    /// Failure envelope of a `Failed` Frame
    pub fn failure(&self, id: FrameId) -> Result<Option<&Envelope>, EngineError> {
        Ok(self.record(id)?.failure.as_ref())
    }

    /// Name of the computation a Frame runs
    pub fn name_of(&self, id: FrameId) -> Result<&str, EngineError> {
        Ok(&self.record(id)?.name)
    }

    /// Inner Frame this Frame is delegating to, if any
    pub fn delegate_of(&self, id: FrameId) -> Result<Option<FrameId>, EngineError> {
        Ok(self.record(id)?.delegate)
    }

    /// The Frame followed by every Frame it is transitively delegating to
    pub fn delegation_chain(&self, id: FrameId) -> Result<Vec<FrameId>, EngineError> {
        let mut chain = vec![id];
        let mut current = self.record(id)?;
        while let Some(inner) = current.delegate {
            chain.push(inner);
            current = self.record(inner)?;
        }
        Ok(chain)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn reports(&self) -> &[Report] {
        self.outbox.reports()
    }

    /// Take every report recorded so far
    pub fn drain_reports(&mut self) -> Vec<Report> {
        self.outbox.drain()
    }

    pub(crate) fn record(&self, id: FrameId) -> Result<&FrameRecord, EngineError> {
        self.frames.get(id.0).ok_or(EngineError::UnknownFrame(id))
    }

    fn record_mut(&mut self, id: FrameId) -> Result<&mut FrameRecord, EngineError> {
        self.frames.get_mut(id.0).ok_or(EngineError::UnknownFrame(id))
    }

    /* ===================== Running One Body ===================== */

    /// Run a single body (ignoring delegation) until it stops
    ///
    /// The caller has already checked that `id` exists and may run.
    pub(crate) fn run_body(&mut self, id: FrameId, signal: Signal) -> BodyStep {
        let budget = self.settings.step_budget;

        let mut vm = {
            let record = &mut self.frames[id.0];
            record.status = FrameStatus::Running;
            std::mem::take(&mut record.vm)
        };

        match signal {
            Signal::Start => {}
            Signal::Send(value) => {
                vm.resume(value);
            }
            Signal::Throw(envelope) => vm.throw(envelope),
        }

        {
            let mut host = BodyHost {
                engine: self,
                frame: id,
            };
            if run_for(&mut vm, &mut host, budget) == Step::Continue {
                warn!(frame = %id, budget, "step budget exhausted");
                let envelope = Envelope::with_message(
                    kinds::STEP_BUDGET_EXCEEDED,
                    format!("Body ran {} steps without suspending", budget),
                );
                vm.throw(envelope.clone());
                if run_for(&mut vm, &mut host, budget) == Step::Continue {
                    // Cleanup ran away as well; abandon the body
                    vm.activations.clear();
                    vm.control = Control::Throw(envelope);
                }
            }
        }

        let step = classify(&mut vm);
        let record = &mut self.frames[id.0];
        record.vm = vm;
        match &step {
            BodyStep::Yielded(_) | BodyStep::Delegating(_) => {
                record.status = FrameStatus::Suspended;
            }
            BodyStep::Completed(value) => record.complete(value.clone()),
            BodyStep::Failed(envelope) => record.fail(envelope.clone()),
        }
        trace!(frame = %id, status = %record.status, "body stopped");
        step
    }
}

/// Read the stop reason off a halted VM
fn classify(vm: &mut Vm) -> BodyStep {
    match &vm.control {
        Control::Yield(v) => return BodyStep::Yielded(v.clone()),
        Control::Delegate(target) => return BodyStep::Delegating(target.clone()),
        _ => {}
    }

    match std::mem::take(&mut vm.control) {
        Control::Return(v) => BodyStep::Completed(v),
        Control::Throw(envelope) => BodyStep::Failed(envelope),
        Control::Break | Control::Continue => BodyStep::Failed(Envelope::with_message(
            kinds::INVALID_CONTROL,
            "break/continue outside of a loop",
        )),
        _ => BodyStep::Completed(Val::Null),
    }
}

/* ===================== Host ===================== */

/// Engine services available to the body of one Frame
struct BodyHost<'a> {
    engine: &'a mut Engine,
    frame: FrameId,
}

impl Host for BodyHost<'_> {
    fn spawn(&mut self, computation: &str, args: Vec<Val>) -> Result<Val, Envelope> {
        self.engine
            .spawn(computation, args)
            .map(Val::Frame)
            .map_err(|e| e.to_envelope())
    }

    fn report(&mut self, value: Val) {
        info!(frame = %self.frame, value = %value, "report");
        self.engine.outbox.push(self.frame, value);
    }
}
