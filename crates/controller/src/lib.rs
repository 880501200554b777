//! Per-map control plane between an embedding host and a map engine.
//!
//! [`MapController`] owns one engine and serves one host. Host commands go
//! through [`MapController::dispatch`] and always produce exactly one
//! [`Reply`]; engine signals and completion callbacks are marshalled onto the
//! controller through a mailbox and drained by [`MapController::pump`].

pub mod camera;
pub mod config;
pub mod controller;
pub mod drag;
pub mod emitter;
pub mod error;
pub mod lifecycle;
pub mod options;
pub mod protocol;
pub mod router;

mod handlers;
#[cfg(test)]
mod scenarios;

pub use config::{ConfigError, ControllerConfig};
pub use controller::MapController;
pub use drag::{DragPhase, GestureDisposition};
pub use error::{CommandError, ErrorKind};
pub use lifecycle::{Phase, Requirement};
pub use protocol::{
    Command, HostChannel, HostError, HostEvent, PendingReply, RecordingHost, Reply, ReplyOutcome,
};
