//! Host-facing wire types.
//!
//! - Commands (host → controller): `{id, method, arguments}`
//! - Replies (controller → host): `{id, success}` or `{id, error}`
//! - Events (controller → host, unsolicited): `{method, arguments}`

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use runtime::{EventBus, Metrics};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::{CommandError, ErrorKind};

pub type SharedMetrics = Arc<Mutex<Metrics>>;

/// One host command. Consumed exactly once by the router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl Command {
    pub fn new(id: u64, method: impl Into<String>, arguments: Value) -> Self {
        Self {
            id,
            method: method.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReplyOutcome {
    Success(Value),
    Error(CommandError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub id: u64,
    #[serde(flatten)]
    pub outcome: ReplyOutcome,
}

impl Reply {
    pub fn value(&self) -> Option<&Value> {
        match &self.outcome {
            ReplyOutcome::Success(v) => Some(v),
            ReplyOutcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&CommandError> {
        match &self.outcome {
            ReplyOutcome::Success(_) => None,
            ReplyOutcome::Error(e) => Some(e),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error().map(|e| e.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error("host is detached")]
    Detached,
    #[error("transport error: {0}")]
    Transport(String),
}

/// The channel back to the embedding host.
pub trait HostChannel: Send + Sync {
    fn reply(&self, reply: Reply);
    fn emit(&self, event: HostEvent) -> Result<(), HostError>;
}

/// Single-use completion slot for one command.
///
/// `resolve` consumes the slot, so a second resolution does not compile. A
/// slot dropped unresolved answers with `Disposed` on its own.
pub struct PendingReply {
    target: Option<ReplyTarget>,
}

struct ReplyTarget {
    id: u64,
    method: String,
    host: Arc<dyn HostChannel>,
    metrics: SharedMetrics,
}

impl ReplyTarget {
    fn send(self, outcome: Result<Value, CommandError>) {
        let key = match &outcome {
            Ok(_) => "replies.ok".to_string(),
            Err(e) => format!("replies.{}", e.kind.as_str()),
        };
        self.metrics.lock().inc_counter(key, 1);
        let outcome = match outcome {
            Ok(v) => ReplyOutcome::Success(v),
            Err(e) => {
                tracing::debug!(id = self.id, method = %self.method, error = %e, "command failed");
                ReplyOutcome::Error(e)
            }
        };
        self.host.reply(Reply {
            id: self.id,
            outcome,
        });
    }
}

impl PendingReply {
    pub(crate) fn new(
        command: &Command,
        host: Arc<dyn HostChannel>,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            target: Some(ReplyTarget {
                id: command.id,
                method: command.method.clone(),
                host,
                metrics,
            }),
        }
    }

    pub fn id(&self) -> Option<u64> {
        self.target.as_ref().map(|t| t.id)
    }

    pub fn resolve(mut self, outcome: Result<Value, CommandError>) {
        if let Some(target) = self.target.take() {
            target.send(outcome);
        }
    }

    pub fn succeed(self, value: Value) {
        self.resolve(Ok(value));
    }

    pub fn fail(self, error: CommandError) {
        self.resolve(Err(error));
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        if let Some(target) = self.target.take() {
            tracing::warn!(id = target.id, method = %target.method, "reply abandoned");
            target.send(Err(CommandError::new(ErrorKind::Disposed, "reply abandoned")));
        }
    }
}

impl std::fmt::Debug for PendingReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingReply").field("id", &self.id()).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DragEventType {
    Start,
    Drag,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointerEvent {
    pub x: f64,
    pub y: f64,
    pub lng: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureTapEvent {
    pub x: f64,
    pub y: f64,
    pub lng: f64,
    pub lat: f64,
    pub id: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDragEvent {
    pub id: Value,
    pub x: f64,
    pub y: f64,
    pub origin_lng: f64,
    pub origin_lat: f64,
    pub current_lng: f64,
    pub current_lat: f64,
    pub delta_lng: f64,
    pub delta_lat: f64,
    pub event_type: DragEventType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLocation {
    /// `[lat, lng]`.
    pub position: [f64; 2],
    pub speed: f64,
    pub altitude: f64,
    pub bearing: f64,
    pub horizontal_accuracy: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical_accuracy: Option<f64>,
    pub timestamp: i64,
}

impl From<engine::Location> for UserLocation {
    fn from(loc: engine::Location) -> Self {
        Self {
            position: [loc.position.latitude, loc.position.longitude],
            speed: loc.speed,
            altitude: loc.altitude,
            bearing: loc.bearing,
            horizontal_accuracy: loc.horizontal_accuracy,
            vertical_accuracy: loc.vertical_accuracy,
            timestamp: loc.timestamp_ms,
        }
    }
}

/// Unsolicited controller → host messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", content = "arguments")]
pub enum HostEvent {
    #[serde(rename = "map#onStyleLoaded")]
    StyleLoaded,
    #[serde(rename = "camera#onMoveStarted")]
    CameraMoveStarted {
        #[serde(rename = "isGesture")]
        is_gesture: bool,
    },
    #[serde(rename = "camera#onMove")]
    CameraMove { position: Value },
    #[serde(rename = "camera#onIdle")]
    CameraIdle { position: Value },
    #[serde(rename = "map#onIdle")]
    MapIdle,
    #[serde(rename = "map#onMapClick")]
    MapClick(PointerEvent),
    #[serde(rename = "feature#onTap")]
    FeatureTap(FeatureTapEvent),
    #[serde(rename = "map#onMapLongClick")]
    MapLongClick(PointerEvent),
    #[serde(rename = "feature#onDrag")]
    FeatureDrag(FeatureDragEvent),
    #[serde(rename = "map#onUserLocationUpdated")]
    UserLocationUpdated {
        #[serde(rename = "userLocation")]
        user_location: UserLocation,
    },
    #[serde(rename = "map#onCameraTrackingChanged")]
    CameraTrackingChanged { mode: i64 },
    #[serde(rename = "map#onCameraTrackingDismissed")]
    CameraTrackingDismissed,
}

impl HostEvent {
    pub fn method(&self) -> &'static str {
        match self {
            Self::StyleLoaded => "map#onStyleLoaded",
            Self::CameraMoveStarted { .. } => "camera#onMoveStarted",
            Self::CameraMove { .. } => "camera#onMove",
            Self::CameraIdle { .. } => "camera#onIdle",
            Self::MapIdle => "map#onIdle",
            Self::MapClick(_) => "map#onMapClick",
            Self::FeatureTap(_) => "feature#onTap",
            Self::MapLongClick(_) => "map#onMapLongClick",
            Self::FeatureDrag(_) => "feature#onDrag",
            Self::UserLocationUpdated { .. } => "map#onUserLocationUpdated",
            Self::CameraTrackingChanged { .. } => "map#onCameraTrackingChanged",
            Self::CameraTrackingDismissed => "map#onCameraTrackingDismissed",
        }
    }
}

/// In-memory host that records everything it receives.
///
/// Clones share their buffers. `detach` makes later emissions fail the way a
/// host that went away would.
#[derive(Clone, Default)]
pub struct RecordingHost {
    replies: EventBus<Reply>,
    events: EventBus<HostEvent>,
    detached: Arc<AtomicBool>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replies(&self) -> Vec<Reply> {
        self.replies.events()
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.events.events()
    }

    pub fn take_replies(&self) -> Vec<Reply> {
        self.replies.drain()
    }

    pub fn take_events(&self) -> Vec<HostEvent> {
        self.events.drain()
    }

    /// Replies for one command id, in arrival order.
    pub fn replies_for(&self, id: u64) -> Vec<Reply> {
        self.replies
            .events()
            .into_iter()
            .filter(|r| r.id == id)
            .collect()
    }

    pub fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }
}

impl HostChannel for RecordingHost {
    fn reply(&self, reply: Reply) {
        self.replies.emit(reply);
    }

    fn emit(&self, event: HostEvent) -> Result<(), HostError> {
        if self.detached.load(Ordering::Acquire) {
            return Err(HostError::Detached);
        }
        self.events.emit(event);
        Ok(())
    }
}
