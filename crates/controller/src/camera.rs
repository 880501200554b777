//! Camera motion arbiter.
//!
//! Every move/animate command hands its reply cell to the engine inside the
//! transition's completion callback. The callback resolves `true` when the
//! transition finishes and `false` when it is cancelled, whether by a newer
//! transition or by teardown. The arbiter only keeps weak references so that
//! dispose can force-resolve whatever the engine never settled.

use std::sync::{Arc, Weak};
use std::time::Duration;

use engine::{CameraUpdate, MapEngine, TransitionCallback, TransitionOutcome};
use parking_lot::Mutex;
use runtime::{MailboxClosed, MailboxSender};
use serde_json::Value;

use crate::controller::Signal;
use crate::error::CommandError;
use crate::protocol::PendingReply;

/// Shared slot holding the reply of one deferred command.
pub(crate) type ReplyCell = Arc<Mutex<Option<PendingReply>>>;

pub(crate) fn reply_cell(reply: PendingReply) -> ReplyCell {
    Arc::new(Mutex::new(Some(reply)))
}

/// Empties `cell`. The lock is released before the reply is returned.
pub(crate) fn take_reply(cell: &ReplyCell) -> Option<PendingReply> {
    cell.lock().take()
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TransitionMode {
    Move,
    Animate(Option<Duration>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRequest {
    pub update: CameraUpdate,
    pub mode: TransitionMode,
}

impl TransitionRequest {
    pub fn jump(update: CameraUpdate) -> Self {
        Self {
            update,
            mode: TransitionMode::Move,
        }
    }

    pub fn animate(update: CameraUpdate, duration: Option<Duration>) -> Self {
        Self {
            update,
            mode: TransitionMode::Animate(duration),
        }
    }
}

#[derive(Default)]
pub struct CameraArbiter {
    pending: Vec<Weak<Mutex<Option<PendingReply>>>>,
}

impl CameraArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues `request` against the engine. The reply is resolved later, from
    /// the mailbox, once the engine settles the transition.
    pub(crate) fn submit(
        &mut self,
        engine: &mut dyn MapEngine,
        request: TransitionRequest,
        cell: ReplyCell,
        mailbox: &MailboxSender<Signal>,
    ) {
        self.prune();
        self.pending.push(Arc::downgrade(&cell));

        let tx = mailbox.clone();
        let done = TransitionCallback::new(move |outcome| {
            if let Err(MailboxClosed(Signal::TransitionSettled { cell, outcome })) =
                tx.post(Signal::TransitionSettled { cell, outcome })
            {
                settle_cell(&cell, outcome);
            }
        });

        tracing::debug!(mode = ?request.mode, update = ?request.update, "camera transition submitted");
        match request.mode {
            TransitionMode::Move => engine.move_camera(request.update, done),
            TransitionMode::Animate(duration) => {
                engine.animate_camera(request.update, duration, done)
            }
        }
    }

    pub(crate) fn settle(&mut self, cell: &ReplyCell, outcome: TransitionOutcome) {
        settle_cell(cell, outcome);
        self.prune();
    }

    /// Transitions whose reply has not been resolved yet.
    pub fn in_flight(&self) -> usize {
        self.pending
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|cell| cell.lock().is_some())
            .count()
    }

    /// Resolves every still-pending transition reply with `Disposed`.
    pub fn abandon_all(&mut self) -> usize {
        let mut abandoned = 0;
        for weak in self.pending.drain(..) {
            let reply = weak.upgrade().and_then(|cell| take_reply(&cell));
            if let Some(reply) = reply {
                reply.fail(CommandError::disposed());
                abandoned += 1;
            }
        }
        abandoned
    }

    fn prune(&mut self) {
        self.pending
            .retain(|weak| weak.upgrade().is_some_and(|cell| cell.lock().is_some()));
    }
}

fn settle_cell(cell: &ReplyCell, outcome: TransitionOutcome) {
    if let Some(reply) = take_reply(cell) {
        tracing::debug!(id = ?reply.id(), ?outcome, "camera transition settled");
        reply.succeed(Value::Bool(outcome == TransitionOutcome::Finished));
    }
}
