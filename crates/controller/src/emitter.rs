//! Unsolicited controller → host events.

use std::sync::Arc;

use engine::{EngineEvent, Feature, MapEngine};
use foundation::{LatLng, ScreenPoint};
use serde_json::Value;
use tracing::{debug, warn};

use crate::hit_test::{InteractiveLayers, hit_test};
use crate::protocol::{
    FeatureTapEvent, HostChannel, HostEvent, PointerEvent, SharedMetrics, UserLocation,
};

/// Forwards events to the host. Emission failures are logged and dropped;
/// there is no reply channel to report them on.
pub struct EventEmitter {
    host: Arc<dyn HostChannel>,
    metrics: SharedMetrics,
}

/// Controller state the forwarding rules depend on.
pub struct Forwarding<'a> {
    pub track_camera_position: bool,
    pub location_active: bool,
    pub interactive: &'a InteractiveLayers,
    pub hit_radius: f64,
}

impl EventEmitter {
    pub fn new(host: Arc<dyn HostChannel>, metrics: SharedMetrics) -> Self {
        Self { host, metrics }
    }

    pub fn emit(&self, event: HostEvent) {
        let method = event.method();
        match self.host.emit(event) {
            Ok(()) => {
                self.metrics.lock().inc_counter("events.emitted", 1);
            }
            Err(err) => {
                warn!(method, error = %err, "dropping host event");
                self.metrics.lock().inc_counter("events.dropped", 1);
            }
        }
    }

    /// Translates one engine signal. Lifecycle signals (`MapReady`,
    /// `StyleLoaded`) are handled by the controller, not here.
    pub fn forward(&self, engine: &dyn MapEngine, event: &EngineEvent, state: Forwarding<'_>) {
        match event {
            EngineEvent::CameraMoveStarted { gesture } => {
                self.emit(HostEvent::CameraMoveStarted {
                    is_gesture: *gesture,
                });
            }
            EngineEvent::CameraMove => {
                if state.track_camera_position {
                    self.emit(HostEvent::CameraMove {
                        position: pose(engine),
                    });
                }
            }
            EngineEvent::CameraIdle => {
                self.emit(HostEvent::CameraIdle {
                    position: pose(engine),
                });
            }
            EngineEvent::DidBecomeIdle => self.emit(HostEvent::MapIdle),
            EngineEvent::MapClick(at) => {
                let pointer = pointer(engine, *at);
                let point = ScreenPoint::new(pointer.x, pointer.y);
                match hit_test(engine, state.interactive, point, state.hit_radius) {
                    Some(feature) => self.emit(HostEvent::FeatureTap(tap(pointer, &feature))),
                    None => self.emit(HostEvent::MapClick(pointer)),
                }
            }
            EngineEvent::MapLongClick(at) => {
                self.emit(HostEvent::MapLongClick(pointer(engine, *at)));
            }
            EngineEvent::UserLocation(location) => {
                if state.location_active {
                    self.emit(HostEvent::UserLocationUpdated {
                        user_location: UserLocation::from(*location),
                    });
                }
            }
            EngineEvent::CameraTrackingChanged(mode) => {
                self.emit(HostEvent::CameraTrackingChanged { mode: mode.code() });
            }
            EngineEvent::CameraTrackingDismissed => self.emit(HostEvent::CameraTrackingDismissed),
            EngineEvent::MapReady | EngineEvent::StyleLoaded(_) => {
                debug!(?event, "lifecycle signal is not forwarded directly");
            }
        }
    }
}

fn pose(engine: &dyn MapEngine) -> Value {
    codec::geo::camera_position_to_json(&engine.camera_position())
}

fn pointer(engine: &dyn MapEngine, at: LatLng) -> PointerEvent {
    let p = engine.to_screen_location(at);
    PointerEvent {
        x: p.x,
        y: p.y,
        lng: at.longitude,
        lat: at.latitude,
    }
}

fn tap(pointer: PointerEvent, feature: &Feature) -> FeatureTapEvent {
    FeatureTapEvent {
        x: pointer.x,
        y: pointer.y,
        lng: pointer.lng,
        lat: pointer.lat,
        id: feature.id.clone().unwrap_or(Value::Null),
    }
}
