use std::sync::Arc;

use foundation::LatLng;

use crate::settings::{Location, TrackingMode};

/// Identifies one style load request. Later requests supersede earlier ones.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StyleRequestId(pub u64);

/// Unsolicited signals raised by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    MapReady,
    StyleLoaded(StyleRequestId),
    CameraMoveStarted { gesture: bool },
    CameraMove,
    CameraIdle,
    DidBecomeIdle,
    MapClick(LatLng),
    MapLongClick(LatLng),
    UserLocation(Location),
    CameraTrackingChanged(TrackingMode),
    CameraTrackingDismissed,
}

/// Receives engine events. May be called from any thread.
pub type EngineListener = Arc<dyn Fn(EngineEvent) + Send + Sync>;
