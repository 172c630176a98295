//! Delegation driver
//!
//! A Frame suspended at `YieldFrom` is linked to its inner Frame. Every
//! operation on the outer Frame is routed to the innermost active Frame of
//! the chain. When an inner Frame finishes, the driver pops it and resumes
//! (or raises into) the next Frame out, iterating instead of recursing so the
//! chain can be arbitrarily deep.

use super::coroutine::{BodyStep, Engine, Signal};
use super::errors::{kinds, EngineError, Envelope};
use super::frame::{FrameId, FrameStatus, Outcome};
use super::types::{Expr, Stmt, Val};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

impl Engine {
    /// Deliver `signal` to the innermost Frame under `root` and keep driving
    /// until the chain suspends or `root` itself finishes
    pub(crate) fn drive(&mut self, root: FrameId, signal: Signal) -> Outcome {
        let (mut chain, mut signal) = self.active_chain(root, signal);

        loop {
            let top = chain[chain.len() - 1];

            match self.run_body(top, signal) {
                BodyStep::Yielded(value) => {
                    trace!(frame = %top, depth = chain.len(), "chain suspended");
                    return Outcome::Suspended(value);
                }

                BodyStep::Delegating(target) => match self.link(top, target, &chain) {
                    Ok((inner, first)) => {
                        chain.push(inner);
                        signal = first;
                    }
                    Err(envelope) => {
                        debug!(frame = %top, kind = %envelope.kind, "delegation rejected");
                        signal = Signal::Throw(envelope);
                    }
                },

                BodyStep::Completed(value) => {
                    chain.pop();
                    let Some(&outer) = chain.last() else {
                        return Outcome::Completed(value);
                    };
                    self.unlink(outer);
                    signal = Signal::Send(value);
                }

                BodyStep::Failed(envelope) => {
                    chain.pop();
                    let Some(&outer) = chain.last() else {
                        return Outcome::Failed(envelope);
                    };
                    self.unlink(outer);
                    signal = Signal::Throw(envelope);
                }
            }
        }
    }

    /// Walk delegation links down from `root`
    ///
    /// An inner Frame that finished while linked (someone drove it directly)
    /// is dropped from the chain, and the delegating Frame gets `Exhausted`
    /// instead of the requested signal.
    fn active_chain(&mut self, root: FrameId, signal: Signal) -> (Vec<FrameId>, Signal) {
        let mut chain = vec![root];
        let mut current = root;

        while let Some(inner) = self.frames[current.0].delegate {
            if self.frames[inner.0].status.is_terminal() {
                warn!(outer = %current, inner = %inner, "delegate finished outside its chain");
                self.unlink(current);
                return (chain, Signal::Throw(EngineError::Exhausted(inner).to_envelope()));
            }
            chain.push(inner);
            current = inner;
        }

        (chain, signal)
    }

    /// Install the link for a `YieldFrom` and pick the inner Frame's first
    /// signal
    fn link(
        &mut self,
        outer: FrameId,
        target: Val,
        chain: &[FrameId],
    ) -> Result<(FrameId, Signal), Envelope> {
        let inner = match target {
            Val::Frame(id) if id.0 < self.frames.len() => id,
            Val::Frame(id) => return Err(EngineError::UnknownFrame(id).to_envelope()),
            Val::List(items) => self.list_frame(items),
            other => {
                return Err(Envelope::with_message(
                    kinds::TYPE_ERROR,
                    format!("Cannot delegate to a {} value", other.type_name()),
                ))
            }
        };

        let ancestors = self.ancestors(chain[0]);
        if chain.contains(&inner) || ancestors.contains(&inner) {
            return Err(EngineError::AlreadyRunning(inner).to_envelope());
        }

        let record = &self.frames[inner.0];
        let first = match record.status {
            FrameStatus::Created => Signal::Start,
            FrameStatus::Suspended => Signal::Send(Val::Null),
            FrameStatus::Running => return Err(EngineError::AlreadyRunning(inner).to_envelope()),
            FrameStatus::Completed | FrameStatus::Failed => {
                return Err(EngineError::Exhausted(inner).to_envelope())
            }
        };
        if record.delegator.is_some() {
            return Err(EngineError::AlreadyRunning(inner).to_envelope());
        }

        let depth = ancestors.len() + chain.len();
        if depth > self.settings.max_delegation_depth {
            return Err(Envelope::with_message(
                kinds::DELEGATION_DEPTH_EXCEEDED,
                format!(
                    "Delegation chain would exceed {} links",
                    self.settings.max_delegation_depth
                ),
            ));
        }

        self.frames[outer.0].delegate = Some(inner);
        self.frames[inner.0].delegator = Some(outer);
        trace!(outer = %outer, inner = %inner, depth, "delegation linked");
        Ok((inner, first))
    }

    /// Remove the link from `outer` to its delegate
    pub(crate) fn unlink(&mut self, outer: FrameId) {
        if let Some(inner) = self.frames[outer.0].delegate.take() {
            let record = &mut self.frames[inner.0];
            if record.delegator == Some(outer) {
                record.delegator = None;
            }
        }
    }

    /// Frames currently delegating to `frame`, nearest first
    fn ancestors(&self, frame: FrameId) -> Vec<FrameId> {
        let mut ancestors = Vec::new();
        let mut current = frame;
        while let Some(outer) = self.frames[current.0].delegator {
            ancestors.push(outer);
            current = outer;
        }
        ancestors
    }

    /// Wrap a list in a Frame that yields each item in order
    fn list_frame(&mut self, items: Vec<Val>) -> FrameId {
        let mut env = HashMap::with_capacity(items.len());
        let mut body = Vec::with_capacity(items.len());

        for (i, item) in items.into_iter().enumerate() {
            let name = format!("${}", i);
            env.insert(name.clone(), item);
            body.push(Stmt::Expr {
                expr: Expr::Yield {
                    value: Some(Box::new(Expr::Ident { name })),
                },
            });
        }

        self.alloc("<list>".to_string(), Stmt::Block { body }, env)
    }

    /* ===================== Close ===================== */

    /// Unwind every Frame of the chain under `root`, innermost first
    ///
    /// Each Frame receives `Cancellation` at its suspension point, or the
    /// failure its inner Frame produced while cleaning up. A Frame that
    /// suspends again instead of finishing is failed with
    /// `LeakedSuspensionOnClose`. The close reports the first such Frame when
    /// `root` itself ends up failed with it.
    pub(crate) fn close_chain(&mut self, root: FrameId) -> Result<Outcome, EngineError> {
        let chain = self.closing_chain(root);

        let mut pending: Option<Envelope> = None;
        let mut leaked: Option<FrameId> = None;
        let mut outcome = Outcome::Completed(Val::Null);

        for &frame in chain.iter().rev() {
            self.unlink(frame);
            let envelope = pending.take().unwrap_or_else(Envelope::cancellation);
            debug!(frame = %frame, kind = %envelope.kind, "closing frame");

            outcome = match self.drive(frame, Signal::Throw(envelope)) {
                Outcome::Suspended(_) => {
                    warn!(frame = %frame, "frame suspended while closing");
                    let envelope = EngineError::LeakedSuspensionOnClose(frame).to_envelope();
                    self.unlink(frame);
                    self.frames[frame.0].fail(envelope.clone());
                    leaked.get_or_insert(frame);
                    pending = Some(envelope.clone());
                    Outcome::Failed(envelope)
                }
                Outcome::Failed(envelope) if envelope.is_kind(kinds::CANCELLATION) => {
                    self.frames[frame.0].complete(Val::Null);
                    Outcome::Completed(Val::Null)
                }
                Outcome::Failed(envelope) => {
                    pending = Some(envelope.clone());
                    Outcome::Failed(envelope)
                }
                completed => completed,
            };
        }

        // A leak handled by an outer Frame yields that Frame's outcome
        let root_leaked = matches!(
            &outcome,
            Outcome::Failed(envelope) if envelope.is_kind(kinds::LEAKED_SUSPENSION)
        );
        match leaked {
            Some(frame) if root_leaked => Err(EngineError::LeakedSuspensionOnClose(frame)),
            _ => Ok(outcome),
        }
    }

    /// The suspended chain under `root`, dropping a finished tail
    fn closing_chain(&mut self, root: FrameId) -> Vec<FrameId> {
        let mut chain = vec![root];
        let mut current = root;

        while let Some(inner) = self.frames[current.0].delegate {
            if self.frames[inner.0].status.is_terminal() {
                self.unlink(current);
                break;
            }
            chain.push(inner);
            current = inner;
        }

        chain
    }
}
