use std::time::Duration;

use foundation::{CameraPosition, LatLng, LatLngBounds, LatLngQuad, ScreenPoint};
use serde_json::Value;

use crate::camera::{CameraUpdate, TransitionCallback};
use crate::error::EngineError;
use crate::event::{EngineListener, StyleRequestId};
use crate::feature::{Feature, FeatureCollection};
use crate::settings::{Location, RenderMode, TrackingMode, UiSetting};
use crate::style::{ImageData, LayerKind, LayerSpec, SourceSpec, StyleSource};

/// Completes a last-known-location request.
pub type LocationCallback = Box<dyn FnOnce(Result<Option<Location>, EngineError>) + Send>;
/// Completes an ambient cache invalidation.
pub type CacheCallback = Box<dyn FnOnce(Result<(), EngineError>) + Send>;

/// Screen area for a rendered-feature query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryRegion {
    Point(ScreenPoint),
    Rect(foundation::ScreenRect),
}

/// Operations the controller needs from a map-rendering engine.
///
/// Style-mutating operations are only issued while a style is loaded;
/// the engine does not have to guard against calls in other states.
pub trait MapEngine: Send {
    // Lifecycle.

    /// Registers the receiver for unsolicited engine events. `MapReady` is
    /// raised once the engine can accept camera and projection calls.
    fn attach(&mut self, listener: EngineListener);
    /// Starts loading a style. Completion is signalled by
    /// `EngineEvent::StyleLoaded(id)`.
    fn load_style(&mut self, id: StyleRequestId, source: &StyleSource);
    /// Releases engine resources. No events are raised afterwards.
    fn teardown(&mut self);
    /// Whether `teardown` cancels transitions still in flight. Engines that
    /// return `false` simply drop their callbacks.
    fn cancels_on_teardown(&self) -> bool {
        true
    }

    // Camera.

    fn camera_position(&self) -> CameraPosition;
    fn move_camera(&mut self, update: CameraUpdate, done: TransitionCallback);
    fn animate_camera(
        &mut self,
        update: CameraUpdate,
        duration: Option<Duration>,
        done: TransitionCallback,
    );
    /// Pans by a pixel offset without a transition.
    fn scroll_by(&mut self, dx: f64, dy: f64);

    // Projection.

    fn to_screen_location(&self, point: LatLng) -> ScreenPoint;
    fn from_screen_location(&self, point: ScreenPoint) -> LatLng;
    fn visible_region(&self) -> LatLngQuad;
    fn meters_per_pixel_at_latitude(&self, latitude: f64) -> f64;

    // Settings.

    fn apply_ui(&mut self, setting: UiSetting);
    fn set_zoom_preference(&mut self, min: Option<f64>, max: Option<f64>);
    fn set_camera_target_bounds(&mut self, bounds: Option<LatLngBounds>);

    // Style.

    fn add_source(&mut self, id: &str, spec: SourceSpec) -> Result<(), EngineError>;
    fn remove_source(&mut self, id: &str) -> Result<(), EngineError>;
    fn set_geojson(&mut self, id: &str, data: FeatureCollection) -> Result<(), EngineError>;
    /// Inserts a layer on top, or directly below `below` when given.
    fn add_layer(&mut self, spec: LayerSpec, below: Option<&str>) -> Result<(), EngineError>;
    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError>;
    /// Layer ids in draw order, bottom first.
    fn layer_ids(&self) -> Vec<String>;
    fn layer_kind(&self, id: &str) -> Option<LayerKind>;
    fn set_layer_filter(&mut self, id: &str, filter: Option<Value>) -> Result<(), EngineError>;
    fn layer_filter(&self, id: &str) -> Result<Option<Value>, EngineError>;
    fn set_layer_visibility(&mut self, id: &str, visible: bool) -> Result<(), EngineError>;
    fn add_image(&mut self, name: &str, image: ImageData) -> Result<(), EngineError>;
    /// `None` restores the style's own labels.
    fn set_language(&mut self, language: Option<&str>);

    // Queries.

    fn query_rendered_features(
        &self,
        region: QueryRegion,
        layer_ids: &[String],
        filter: Option<&Value>,
    ) -> Vec<Feature>;
    fn query_source_features(
        &self,
        source_id: &str,
        source_layer: Option<&str>,
        filter: Option<&Value>,
    ) -> Result<Vec<Feature>, EngineError>;

    // Location.

    fn set_location_component(&mut self, enabled: bool);
    fn set_tracking_mode(&mut self, mode: TrackingMode);
    fn set_render_mode(&mut self, mode: RenderMode);
    /// Starts or stops delivery of `EngineEvent::UserLocation`.
    fn set_location_updates(&mut self, enabled: bool);
    fn last_location(&mut self, done: LocationCallback);

    // Offline cache.

    fn invalidate_ambient_cache(&mut self, done: CacheCallback);
}
