//! Feature-drag gesture state machine.
//!
//! Turns one-finger move gestures that start on a draggable feature into a
//! `start` / `drag` / `end` sequence. Anything else falls through to camera
//! panning.

use engine::{Feature, MapEngine};
use foundation::{LatLng, ScreenPoint};
use serde_json::Value;

use crate::hit_test::{InteractiveLayers, hit_test};
use crate::protocol::{DragEventType, FeatureDragEvent};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Dragging,
}

/// Whether the gesture detector should suppress its default camera pan.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GestureDisposition {
    Claimed,
    PassThrough,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub feature_id: Value,
    pub origin: LatLng,
    pub previous: LatLng,
}

/// Result of feeding one gesture callback to the machine.
#[derive(Debug, Clone, PartialEq)]
pub struct DragStep {
    pub disposition: GestureDisposition,
    pub event: Option<FeatureDragEvent>,
}

impl DragStep {
    fn pass() -> Self {
        Self {
            disposition: GestureDisposition::PassThrough,
            event: None,
        }
    }

    fn claimed(event: Option<FeatureDragEvent>) -> Self {
        Self {
            disposition: GestureDisposition::Claimed,
            event,
        }
    }
}

#[derive(Debug)]
pub struct DragMachine {
    enabled: bool,
    hit_radius: f64,
    session: Option<DragSession>,
}

impl DragMachine {
    pub fn new(enabled: bool, hit_radius: f64) -> Self {
        Self {
            enabled,
            hit_radius,
            session: None,
        }
    }

    pub fn phase(&self) -> DragPhase {
        match self.session {
            Some(_) => DragPhase::Dragging,
            None => DragPhase::Idle,
        }
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    /// Drops the session without emitting anything.
    pub fn cancel(&mut self) {
        if self.session.take().is_some() {
            tracing::debug!("drag session cancelled");
        }
    }

    /// Disables the machine for good, e.g. on dispose.
    pub fn detach(&mut self) {
        self.cancel();
        self.enabled = false;
    }

    pub fn on_move_begin(
        &mut self,
        engine: &dyn MapEngine,
        layers: &InteractiveLayers,
        focal: ScreenPoint,
        pointers: u32,
        fresh_press: bool,
    ) -> DragStep {
        if self.session.is_some() {
            return DragStep::claimed(None);
        }
        if !self.enabled || !fresh_press || pointers != 1 {
            return DragStep::pass();
        }
        let Some(feature) = hit_test(engine, layers, focal, self.hit_radius) else {
            return DragStep::pass();
        };
        if !feature.is_draggable() {
            return DragStep::pass();
        }
        let at = engine.from_screen_location(focal);
        let session = DragSession {
            feature_id: feature_id(&feature),
            origin: at,
            previous: at,
        };
        tracing::debug!(feature = %session.feature_id, "drag started");
        let event = drag_event(&session, focal, at, DragEventType::Start);
        self.session = Some(session);
        DragStep::claimed(Some(event))
    }

    pub fn on_move(&mut self, engine: &dyn MapEngine, focal: ScreenPoint, pointers: u32) -> DragStep {
        if self.session.is_none() {
            return DragStep::pass();
        }
        if pointers > 1 {
            self.cancel();
            return DragStep::pass();
        }
        let current = engine.from_screen_location(focal);
        match self.session.as_mut() {
            Some(session) => {
                let event = drag_event(session, focal, current, DragEventType::Drag);
                session.previous = current;
                DragStep::claimed(Some(event))
            }
            None => DragStep::pass(),
        }
    }

    pub fn on_move_end(&mut self, engine: &dyn MapEngine, focal: ScreenPoint) -> DragStep {
        let Some(session) = self.session.take() else {
            return DragStep::pass();
        };
        let current = engine.from_screen_location(focal);
        tracing::debug!(feature = %session.feature_id, "drag ended");
        DragStep::claimed(Some(drag_event(&session, focal, current, DragEventType::End)))
    }
}

fn feature_id(feature: &Feature) -> Value {
    feature.id.clone().unwrap_or(Value::Null)
}

fn drag_event(
    session: &DragSession,
    focal: ScreenPoint,
    current: LatLng,
    event_type: DragEventType,
) -> FeatureDragEvent {
    let (delta_lat, delta_lng) = current.delta_from(session.previous);
    FeatureDragEvent {
        id: session.feature_id.clone(),
        x: focal.x,
        y: focal.y,
        origin_lng: session.origin.longitude,
        origin_lat: session.origin.latitude,
        current_lng: current.longitude,
        current_lat: current.latitude,
        delta_lng,
        delta_lat,
        event_type,
    }
}
