//! In-memory engine with a web-mercator camera and GeoJSON-backed feature
//! queries.
//!
//! Everything asynchronous is driven explicitly through [`SimDriver`]: style
//! loads complete on `complete_style_loads`, animations progress on `advance`,
//! and taps, pans and location fixes are injected by hand. Events and
//! completion callbacks are always invoked with the state lock released.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use foundation::math::mercator;
use foundation::{
    CameraPosition, EdgeInsets, LatLng, LatLngBounds, LatLngQuad, ScreenPoint, ScreenRect,
};
use parking_lot::Mutex;
use serde_json::Value;

use crate::camera::{CameraUpdate, TransitionCallback};
use crate::error::EngineError;
use crate::event::{EngineEvent, EngineListener, StyleRequestId};
use crate::feature::{Feature, FeatureCollection};
use crate::filter;
use crate::port::{CacheCallback, LocationCallback, MapEngine, QueryRegion};
use crate::settings::{Location, RenderMode, TrackingMode, UiSetting};
use crate::style::{
    GeoJsonData, GeoJsonOptions, ImageData, LayerKind, LayerSpec, SourceSpec, StyleSource,
    TileSource,
};

pub const DEFAULT_MIN_ZOOM: f64 = 0.0;
pub const DEFAULT_MAX_ZOOM: f64 = 25.5;
pub const MAX_TILT: f64 = 60.0;
pub const DEFAULT_ANIMATION: Duration = Duration::from_millis(300);

/// Half-size of the pixel window used for point queries.
const POINT_QUERY_SLOP: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Viewport size in physical pixels.
    pub viewport: (f64, f64),
    pub camera: CameraPosition,
    /// Raise `MapReady` as soon as a listener attaches.
    pub ready_on_attach: bool,
    pub cancels_on_teardown: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            viewport: (1080.0, 1920.0),
            camera: CameraPosition::default(),
            ready_on_attach: true,
            cancels_on_teardown: true,
        }
    }
}

#[derive(Debug, Clone)]
struct SimSource {
    spec: SourceSpec,
    features: Option<FeatureCollection>,
}

#[derive(Debug, Clone)]
struct SimLayer {
    spec: LayerSpec,
    visible: bool,
}

struct Transition {
    from: CameraPosition,
    to: CameraPosition,
    total: Duration,
    elapsed: Duration,
    done: TransitionCallback,
}

#[derive(Default)]
struct Outbox {
    events: Vec<EngineEvent>,
    finished: Vec<TransitionCallback>,
    cancelled: Vec<TransitionCallback>,
}

impl Outbox {
    fn flush(self, listener: Option<EngineListener>) {
        for cb in self.cancelled {
            cb.cancel();
        }
        for cb in self.finished {
            cb.finish();
        }
        if let Some(listener) = listener {
            for event in self.events {
                listener(event);
            }
        }
    }
}

struct SimState {
    listener: Option<EngineListener>,
    ready: bool,
    torn_down: bool,
    viewport: (f64, f64),
    camera: CameraPosition,
    padding: EdgeInsets,
    min_zoom: f64,
    max_zoom: f64,
    target_bounds: Option<LatLngBounds>,
    pending_styles: Vec<(StyleRequestId, StyleSource)>,
    style: Option<StyleSource>,
    sources: BTreeMap<String, SimSource>,
    layers: Vec<SimLayer>,
    images: BTreeMap<String, ImageData>,
    language: Option<String>,
    ui: Vec<UiSetting>,
    transition: Option<Transition>,
    orphaned: Vec<TransitionCallback>,
    location_enabled: bool,
    location_updates: bool,
    tracking_mode: TrackingMode,
    render_mode: RenderMode,
    last_location: Option<Location>,
    cache_fails: bool,
    cache_invalidations: u32,
    faulty: bool,
}

impl SimState {
    fn new(config: &SimConfig) -> Self {
        Self {
            listener: None,
            ready: config.ready_on_attach,
            torn_down: false,
            viewport: config.viewport,
            camera: config.camera,
            padding: EdgeInsets::default(),
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            target_bounds: None,
            pending_styles: Vec::new(),
            style: None,
            sources: BTreeMap::new(),
            layers: Vec::new(),
            images: BTreeMap::new(),
            language: None,
            ui: Vec::new(),
            transition: None,
            orphaned: Vec::new(),
            location_enabled: false,
            location_updates: false,
            tracking_mode: TrackingMode::None,
            render_mode: RenderMode::Normal,
            last_location: None,
            cache_fails: false,
            cache_invalidations: 0,
            faulty: false,
        }
    }

    fn emit(&self, out: &mut Outbox, event: EngineEvent) {
        if !self.torn_down {
            out.events.push(event);
        }
    }

    /// Screen position of the camera target, shifted by the content insets.
    fn anchor(&self) -> (f64, f64) {
        let (w, h) = self.viewport;
        let p = self.padding;
        (
            (w + f64::from(p.left) - f64::from(p.right)) / 2.0,
            (h + f64::from(p.top) - f64::from(p.bottom)) / 2.0,
        )
    }

    fn to_screen(&self, camera: &CameraPosition, point: LatLng) -> ScreenPoint {
        let (ax, ay) = self.anchor();
        let (cx, cy) = mercator::project(camera.target, camera.zoom);
        let (px, py) = mercator::project(point, camera.zoom);
        ScreenPoint::new(ax + px - cx, ay + py - cy)
    }

    fn from_screen(&self, camera: &CameraPosition, point: ScreenPoint) -> LatLng {
        let (ax, ay) = self.anchor();
        let (cx, cy) = mercator::project(camera.target, camera.zoom);
        mercator::unproject(cx + point.x - ax, cy + point.y - ay, camera.zoom)
    }

    fn constrain(&self, mut pose: CameraPosition) -> CameraPosition {
        pose.zoom = pose.zoom.clamp(self.min_zoom, self.max_zoom);
        pose.tilt = pose.tilt.clamp(0.0, MAX_TILT);
        pose.bearing = pose.bearing.rem_euclid(360.0);
        if let Some(bounds) = &self.target_bounds {
            pose.target = bounds.clamp(pose.target);
        }
        pose
    }

    /// Resolves an update against the current pose. Padding updates are
    /// applied to the state directly.
    fn resolve(&mut self, update: &CameraUpdate) -> CameraPosition {
        let current = self.camera;
        let pose = match update {
            CameraUpdate::NewCameraPosition(spec) => spec.apply_to(current),
            CameraUpdate::NewLatLng(target) => CameraPosition {
                target: *target,
                ..current
            },
            CameraUpdate::NewLatLngZoom { target, zoom } => CameraPosition {
                target: *target,
                zoom: *zoom,
                ..current
            },
            CameraUpdate::NewLatLngBounds { bounds, padding } => CameraPosition {
                target: bounds.center(),
                zoom: self.fit_zoom(bounds, *padding),
                bearing: 0.0,
                tilt: 0.0,
            },
            CameraUpdate::ZoomBy { amount, focus } => {
                let zoom = current.zoom + amount;
                match focus {
                    Some(focus) => self.zoom_around(*focus, zoom),
                    None => CameraPosition { zoom, ..current },
                }
            }
            CameraUpdate::ZoomIn => CameraPosition {
                zoom: current.zoom + 1.0,
                ..current
            },
            CameraUpdate::ZoomOut => CameraPosition {
                zoom: current.zoom - 1.0,
                ..current
            },
            CameraUpdate::ZoomTo(zoom) => CameraPosition {
                zoom: *zoom,
                ..current
            },
            CameraUpdate::BearingTo(bearing) => CameraPosition {
                bearing: *bearing,
                ..current
            },
            CameraUpdate::TiltTo(tilt) => CameraPosition {
                tilt: *tilt,
                ..current
            },
            CameraUpdate::PaddingTo(insets) => {
                self.padding = *insets;
                current
            }
        };
        self.constrain(pose)
    }

    fn fit_zoom(&self, bounds: &LatLngBounds, padding: EdgeInsets) -> f64 {
        let (w, h) = self.viewport;
        let avail_w = (w - f64::from(padding.left) - f64::from(padding.right)).max(1.0);
        let avail_h = (h - f64::from(padding.top) - f64::from(padding.bottom)).max(1.0);
        let (x0, y0) = mercator::project(
            LatLng::new(bounds.north(), bounds.west()),
            0.0,
        );
        let (x1, y1) = mercator::project(
            LatLng::new(bounds.south(), bounds.east()),
            0.0,
        );
        let span_w = (x1 - x0).abs().max(f64::EPSILON);
        let span_h = (y1 - y0).abs().max(f64::EPSILON);
        (avail_w / span_w).min(avail_h / span_h).log2()
    }

    /// Zooms so that the coordinate under `focus` stays under `focus`.
    fn zoom_around(&self, focus: ScreenPoint, zoom: f64) -> CameraPosition {
        let zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        let anchor_geo = self.from_screen(&self.camera, focus);
        let (ax, ay) = self.anchor();
        let (fx, fy) = mercator::project(anchor_geo, zoom);
        let target = mercator::unproject(fx - (focus.x - ax), fy - (focus.y - ay), zoom);
        CameraPosition {
            target,
            zoom,
            ..self.camera
        }
    }

    fn cancel_transition(&mut self, out: &mut Outbox) {
        if let Some(t) = self.transition.take() {
            out.cancelled.push(t.done);
        }
    }

    /// Moves the camera immediately, raising the usual move/idle signals.
    fn jump(&mut self, out: &mut Outbox, pose: CameraPosition, gesture: bool) {
        self.emit(out, EngineEvent::CameraMoveStarted { gesture });
        self.camera = pose;
        self.emit(out, EngineEvent::CameraMove);
        self.emit(out, EngineEvent::CameraIdle);
        self.emit(out, EngineEvent::DidBecomeIdle);
    }

    fn advance(&mut self, out: &mut Outbox, dt: Duration) {
        let Some(t) = self.transition.as_mut() else {
            return;
        };
        t.elapsed += dt;
        if t.elapsed >= t.total {
            let Some(t) = self.transition.take() else {
                return;
            };
            self.camera = t.to;
            out.finished.push(t.done);
            self.emit(out, EngineEvent::CameraMove);
            self.emit(out, EngineEvent::CameraIdle);
            self.emit(out, EngineEvent::DidBecomeIdle);
        } else {
            let f = t.elapsed.as_secs_f64() / t.total.as_secs_f64();
            let lerp = |a: f64, b: f64| a + (b - a) * f;
            let pose = CameraPosition {
                target: LatLng::new(
                    lerp(t.from.target.latitude, t.to.target.latitude),
                    lerp(t.from.target.longitude, t.to.target.longitude),
                ),
                zoom: lerp(t.from.zoom, t.to.zoom),
                bearing: lerp(t.from.bearing, t.to.bearing),
                tilt: lerp(t.from.tilt, t.to.tilt),
            };
            self.camera = pose;
            self.emit(out, EngineEvent::CameraMove);
        }
    }

    fn load_style_document(&mut self, source: &StyleSource) {
        self.sources.clear();
        self.layers.clear();
        self.images.clear();
        let StyleSource::Json(text) = source else {
            return;
        };
        let Ok(doc) = serde_json::from_str::<Value>(text) else {
            tracing::warn!("sim engine: style json does not parse");
            return;
        };
        if let Some(sources) = doc.get("sources").and_then(Value::as_object) {
            for (id, src) in sources {
                let spec = match src.get("type").and_then(Value::as_str) {
                    Some("geojson") => {
                        let data = match src.get("data") {
                            Some(Value::String(uri)) => GeoJsonData::Uri(uri.clone()),
                            Some(inline) => match FeatureCollection::from_json(inline) {
                                Ok(fc) => GeoJsonData::Inline(fc),
                                Err(err) => {
                                    tracing::warn!(%err, source = %id, "sim engine: inline geojson ignored");
                                    GeoJsonData::Inline(FeatureCollection::default())
                                }
                            },
                            None => GeoJsonData::Inline(FeatureCollection::default()),
                        };
                        SourceSpec::GeoJson {
                            data,
                            options: GeoJsonOptions::default(),
                        }
                    }
                    _ => SourceSpec::Vector(TileSource::Url(
                        src.get("url")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                    )),
                };
                self.sources.insert(id.clone(), SimSource::from_spec(spec));
            }
        }
        if let Some(layers) = doc.get("layers").and_then(Value::as_array) {
            for layer in layers {
                let Some(id) = layer.get("id").and_then(Value::as_str) else {
                    continue;
                };
                let kind = layer
                    .get("type")
                    .and_then(Value::as_str)
                    .and_then(LayerKind::parse)
                    .unwrap_or(LayerKind::Background);
                let source = layer.get("source").and_then(Value::as_str).unwrap_or_default();
                let mut spec = LayerSpec::new(id, source, kind);
                spec.filter = layer.get("filter").cloned();
                self.layers.push(SimLayer {
                    spec,
                    visible: true,
                });
            }
        }
    }

    fn layer_mut(&mut self, id: &str) -> Result<&mut SimLayer, EngineError> {
        self.layers
            .iter_mut()
            .find(|l| l.spec.id == id)
            .ok_or_else(|| EngineError::LayerNotFound(id.to_string()))
    }

    fn query_rendered(
        &self,
        region: QueryRegion,
        layer_ids: &[String],
        filter: Option<&Value>,
    ) -> Vec<Feature> {
        let rect = match region {
            QueryRegion::Point(p) => ScreenRect::around(p, POINT_QUERY_SLOP),
            QueryRegion::Rect(r) => r,
        };
        let mut out = Vec::new();
        for layer in self.layers.iter().rev() {
            if !layer.visible || (!layer_ids.is_empty() && !layer_ids.contains(&layer.spec.id)) {
                continue;
            }
            let Some(features) = self
                .sources
                .get(&layer.spec.source)
                .and_then(|s| s.features.as_ref())
            else {
                continue;
            };
            for feature in &features.features {
                if let Some(lf) = &layer.spec.filter
                    && !filter::matches(lf, feature)
                {
                    continue;
                }
                if let Some(qf) = filter
                    && !filter::matches(qf, feature)
                {
                    continue;
                }
                let hit = feature.positions().into_iter().any(|(lon, lat)| {
                    rect.contains(self.to_screen(&self.camera, LatLng::from_lon_lat(lon, lat)))
                });
                if hit {
                    out.push(feature.clone());
                }
            }
        }
        out
    }
}

impl SimSource {
    fn from_spec(spec: SourceSpec) -> Self {
        let features = match &spec {
            SourceSpec::GeoJson {
                data: GeoJsonData::Inline(fc),
                ..
            } => Some(fc.clone()),
            SourceSpec::GeoJson { .. } => Some(FeatureCollection::default()),
            _ => None,
        };
        Self { spec, features }
    }
}

type Shared = Arc<Mutex<SimState>>;

/// Runs `f` under the state lock, then delivers whatever it queued.
fn with_state<R>(shared: &Shared, f: impl FnOnce(&mut SimState, &mut Outbox) -> R) -> R {
    let mut out = Outbox::default();
    let (result, listener) = {
        let mut state = shared.lock();
        let result = f(&mut state, &mut out);
        (result, state.listener.clone())
    };
    out.flush(listener);
    result
}

/// The engine half handed to the controller.
pub struct SimEngine {
    shared: Shared,
    cancels_on_teardown: bool,
}

impl SimEngine {
    pub fn new(config: SimConfig) -> (Self, SimDriver) {
        let shared = Arc::new(Mutex::new(SimState::new(&config)));
        let engine = Self {
            shared: Arc::clone(&shared),
            cancels_on_teardown: config.cancels_on_teardown,
        };
        (engine, SimDriver { shared })
    }

    fn read<R>(&self, f: impl FnOnce(&SimState) -> R) -> R {
        f(&self.shared.lock())
    }

    fn fault(&self, op: &str) {
        if self.read(|s| s.faulty) {
            panic!("sim engine fault in {op}");
        }
    }
}

impl MapEngine for SimEngine {
    fn attach(&mut self, listener: EngineListener) {
        with_state(&self.shared, |s, out| {
            s.listener = Some(listener);
            if s.ready {
                s.emit(out, EngineEvent::MapReady);
            }
        });
    }

    fn load_style(&mut self, id: StyleRequestId, source: &StyleSource) {
        tracing::debug!(request = id.0, "sim engine: style load queued");
        self.shared.lock().pending_styles.push((id, source.clone()));
    }

    fn teardown(&mut self) {
        let cancels = self.cancels_on_teardown;
        with_state(&self.shared, |s, out| {
            if let Some(t) = s.transition.take() {
                if cancels {
                    out.cancelled.push(t.done);
                } else {
                    s.orphaned.push(t.done);
                }
            }
            s.torn_down = true;
            s.location_updates = false;
            s.pending_styles.clear();
            s.listener = None;
        });
    }

    fn cancels_on_teardown(&self) -> bool {
        self.cancels_on_teardown
    }

    fn camera_position(&self) -> CameraPosition {
        self.read(|s| s.camera)
    }

    fn move_camera(&mut self, update: CameraUpdate, done: TransitionCallback) {
        self.fault("move_camera");
        with_state(&self.shared, |s, out| {
            s.cancel_transition(out);
            let pose = s.resolve(&update);
            s.jump(out, pose, false);
            out.finished.push(done);
        });
    }

    fn animate_camera(
        &mut self,
        update: CameraUpdate,
        duration: Option<Duration>,
        done: TransitionCallback,
    ) {
        self.fault("animate_camera");
        with_state(&self.shared, |s, out| {
            s.cancel_transition(out);
            let to = s.resolve(&update);
            s.emit(out, EngineEvent::CameraMoveStarted { gesture: false });
            s.transition = Some(Transition {
                from: s.camera,
                to,
                total: duration.unwrap_or(DEFAULT_ANIMATION),
                elapsed: Duration::ZERO,
                done,
            });
        });
    }

    fn scroll_by(&mut self, dx: f64, dy: f64) {
        with_state(&self.shared, |s, out| {
            s.cancel_transition(out);
            let (ax, ay) = s.anchor();
            let target = s.from_screen(&s.camera, ScreenPoint::new(ax - dx, ay - dy));
            let pose = s.constrain(CameraPosition {
                target,
                ..s.camera
            });
            s.jump(out, pose, false);
        });
    }

    fn to_screen_location(&self, point: LatLng) -> ScreenPoint {
        self.read(|s| s.to_screen(&s.camera, point))
    }

    fn from_screen_location(&self, point: ScreenPoint) -> LatLng {
        self.read(|s| s.from_screen(&s.camera, point))
    }

    fn visible_region(&self) -> LatLngQuad {
        self.read(|s| {
            let (w, h) = s.viewport;
            let at = |x, y| s.from_screen(&s.camera, ScreenPoint::new(x, y));
            LatLngQuad {
                corners: [at(0.0, 0.0), at(w, 0.0), at(w, h), at(0.0, h)],
            }
        })
    }

    fn meters_per_pixel_at_latitude(&self, latitude: f64) -> f64 {
        self.read(|s| mercator::meters_per_pixel(latitude, s.camera.zoom))
    }

    fn apply_ui(&mut self, setting: UiSetting) {
        self.shared.lock().ui.push(setting);
    }

    fn set_zoom_preference(&mut self, min: Option<f64>, max: Option<f64>) {
        let mut s = self.shared.lock();
        s.min_zoom = min.unwrap_or(DEFAULT_MIN_ZOOM);
        s.max_zoom = max.unwrap_or(DEFAULT_MAX_ZOOM);
    }

    fn set_camera_target_bounds(&mut self, bounds: Option<LatLngBounds>) {
        let mut s = self.shared.lock();
        s.target_bounds = bounds;
        s.camera = s.constrain(s.camera);
    }

    fn add_source(&mut self, id: &str, spec: SourceSpec) -> Result<(), EngineError> {
        let mut s = self.shared.lock();
        if s.sources.contains_key(id) {
            return Err(EngineError::DuplicateSource(id.to_string()));
        }
        s.sources.insert(id.to_string(), SimSource::from_spec(spec));
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<(), EngineError> {
        let mut s = self.shared.lock();
        if s.layers.iter().any(|l| l.spec.source == id) {
            return Err(EngineError::Failure(format!("source '{id}' is in use")));
        }
        s.sources
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| EngineError::SourceNotFound(id.to_string()))
    }

    fn set_geojson(&mut self, id: &str, data: FeatureCollection) -> Result<(), EngineError> {
        let mut s = self.shared.lock();
        let source = s
            .sources
            .get_mut(id)
            .ok_or_else(|| EngineError::SourceNotFound(id.to_string()))?;
        let SourceSpec::GeoJson { options, .. } = &source.spec else {
            return Err(EngineError::Failure(format!(
                "source '{id}' is not a geojson source"
            )));
        };
        source.spec = SourceSpec::GeoJson {
            data: GeoJsonData::Inline(data.clone()),
            options: options.clone(),
        };
        source.features = Some(data);
        Ok(())
    }

    fn add_layer(&mut self, spec: LayerSpec, below: Option<&str>) -> Result<(), EngineError> {
        let mut s = self.shared.lock();
        if s.layers.iter().any(|l| l.spec.id == spec.id) {
            return Err(EngineError::DuplicateLayer(spec.id));
        }
        let index = match below {
            Some(below) => s
                .layers
                .iter()
                .position(|l| l.spec.id == below)
                .ok_or_else(|| EngineError::LayerNotFound(below.to_string()))?,
            None => s.layers.len(),
        };
        s.layers.insert(
            index,
            SimLayer {
                spec,
                visible: true,
            },
        );
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError> {
        let mut s = self.shared.lock();
        let before = s.layers.len();
        s.layers.retain(|l| l.spec.id != id);
        if s.layers.len() == before {
            return Err(EngineError::LayerNotFound(id.to_string()));
        }
        Ok(())
    }

    fn layer_ids(&self) -> Vec<String> {
        self.read(|s| s.layers.iter().map(|l| l.spec.id.clone()).collect())
    }

    fn layer_kind(&self, id: &str) -> Option<LayerKind> {
        self.read(|s| {
            s.layers
                .iter()
                .find(|l| l.spec.id == id)
                .map(|l| l.spec.kind)
        })
    }

    fn set_layer_filter(&mut self, id: &str, filter: Option<Value>) -> Result<(), EngineError> {
        let mut s = self.shared.lock();
        let layer = s.layer_mut(id)?;
        if !layer.spec.kind.supports_filter() {
            return Err(EngineError::Failure(format!(
                "layer '{id}' does not support filters"
            )));
        }
        layer.spec.filter = filter;
        Ok(())
    }

    fn layer_filter(&self, id: &str) -> Result<Option<Value>, EngineError> {
        self.read(|s| {
            s.layers
                .iter()
                .find(|l| l.spec.id == id)
                .map(|l| l.spec.filter.clone())
                .ok_or_else(|| EngineError::LayerNotFound(id.to_string()))
        })
    }

    fn set_layer_visibility(&mut self, id: &str, visible: bool) -> Result<(), EngineError> {
        let mut s = self.shared.lock();
        s.layer_mut(id)?.visible = visible;
        Ok(())
    }

    fn add_image(&mut self, name: &str, image: ImageData) -> Result<(), EngineError> {
        self.shared.lock().images.insert(name.to_string(), image);
        Ok(())
    }

    fn set_language(&mut self, language: Option<&str>) {
        self.shared.lock().language = language.map(str::to_string);
    }

    fn query_rendered_features(
        &self,
        region: QueryRegion,
        layer_ids: &[String],
        filter: Option<&Value>,
    ) -> Vec<Feature> {
        self.read(|s| s.query_rendered(region, layer_ids, filter))
    }

    fn query_source_features(
        &self,
        source_id: &str,
        _source_layer: Option<&str>,
        filter: Option<&Value>,
    ) -> Result<Vec<Feature>, EngineError> {
        self.read(|s| {
            let source = s
                .sources
                .get(source_id)
                .ok_or_else(|| EngineError::SourceNotFound(source_id.to_string()))?;
            Ok(source
                .features
                .iter()
                .flat_map(|fc| fc.features.iter())
                .filter(|f| filter.is_none_or(|expr| filter::matches(expr, f)))
                .cloned()
                .collect())
        })
    }

    fn set_location_component(&mut self, enabled: bool) {
        self.shared.lock().location_enabled = enabled;
    }

    fn set_tracking_mode(&mut self, mode: TrackingMode) {
        self.shared.lock().tracking_mode = mode;
    }

    fn set_render_mode(&mut self, mode: RenderMode) {
        self.shared.lock().render_mode = mode;
    }

    fn set_location_updates(&mut self, enabled: bool) {
        self.shared.lock().location_updates = enabled;
    }

    fn last_location(&mut self, done: LocationCallback) {
        self.fault("last_location");
        let result = self.read(|s| {
            if s.location_enabled {
                Ok(s.last_location)
            } else {
                Err(EngineError::Unavailable("location component"))
            }
        });
        done(result);
    }

    fn invalidate_ambient_cache(&mut self, done: CacheCallback) {
        self.fault("invalidate_ambient_cache");
        let result = {
            let mut s = self.shared.lock();
            s.cache_invalidations += 1;
            if s.cache_fails {
                Err(EngineError::Failure("ambient cache is unavailable".into()))
            } else {
                Ok(())
            }
        };
        done(result);
    }
}

/// Test-side handle for driving a [`SimEngine`] and inspecting its state.
#[derive(Clone)]
pub struct SimDriver {
    shared: Shared,
}

impl SimDriver {
    /// Raises `MapReady` now, or on attach when no listener is registered yet.
    pub fn make_ready(&self) {
        with_state(&self.shared, |s, out| {
            if !s.ready {
                s.ready = true;
                if s.listener.is_some() {
                    s.emit(out, EngineEvent::MapReady);
                }
            }
        });
    }

    pub fn pending_style_loads(&self) -> Vec<StyleRequestId> {
        self.shared.lock().pending_styles.iter().map(|(id, _)| *id).collect()
    }

    /// Completes every queued style load in request order.
    pub fn complete_style_loads(&self) -> usize {
        with_state(&self.shared, |s, out| {
            let pending = std::mem::take(&mut s.pending_styles);
            let count = pending.len();
            for (id, source) in pending {
                s.load_style_document(&source);
                s.style = Some(source);
                s.emit(out, EngineEvent::StyleLoaded(id));
            }
            count
        })
    }

    /// Progresses the in-flight animation by `dt`.
    pub fn advance(&self, dt: Duration) {
        with_state(&self.shared, |s, out| s.advance(out, dt));
    }

    /// Runs the in-flight animation to completion.
    pub fn settle(&self) {
        self.advance(Duration::from_secs(3600));
    }

    pub fn has_transition(&self) -> bool {
        self.shared.lock().transition.is_some()
    }

    pub fn tap(&self, point: ScreenPoint) {
        with_state(&self.shared, |s, out| {
            let at = s.from_screen(&s.camera, point);
            s.emit(out, EngineEvent::MapClick(at));
        });
    }

    pub fn long_press(&self, point: ScreenPoint) {
        with_state(&self.shared, |s, out| {
            let at = s.from_screen(&s.camera, point);
            s.emit(out, EngineEvent::MapLongClick(at));
        });
    }

    /// A one-finger pan gesture. Dismisses camera tracking if active.
    pub fn pan(&self, dx: f64, dy: f64) {
        with_state(&self.shared, |s, out| {
            s.cancel_transition(out);
            if s.tracking_mode != TrackingMode::None {
                s.tracking_mode = TrackingMode::None;
                s.emit(out, EngineEvent::CameraTrackingDismissed);
                s.emit(out, EngineEvent::CameraTrackingChanged(TrackingMode::None));
            }
            let (ax, ay) = s.anchor();
            let target = s.from_screen(&s.camera, ScreenPoint::new(ax - dx, ay - dy));
            let pose = s.constrain(CameraPosition {
                target,
                ..s.camera
            });
            s.jump(out, pose, true);
        });
    }

    /// Records a fix and forwards it while updates are enabled.
    pub fn push_location(&self, location: Location) {
        with_state(&self.shared, |s, out| {
            s.last_location = Some(location);
            if s.location_updates {
                s.emit(out, EngineEvent::UserLocation(location));
            }
        });
    }

    pub fn set_cache_failure(&self, fails: bool) {
        self.shared.lock().cache_fails = fails;
    }

    /// Makes the camera, location and cache calls panic.
    pub fn set_faulty(&self, faulty: bool) {
        self.shared.lock().faulty = faulty;
    }

    /// Raises an arbitrary event.
    pub fn emit(&self, event: EngineEvent) {
        with_state(&self.shared, |s, out| s.emit(out, event));
    }

    pub fn camera(&self) -> CameraPosition {
        self.shared.lock().camera
    }

    pub fn padding(&self) -> EdgeInsets {
        self.shared.lock().padding
    }

    pub fn zoom_preference(&self) -> (f64, f64) {
        let s = self.shared.lock();
        (s.min_zoom, s.max_zoom)
    }

    pub fn target_bounds(&self) -> Option<LatLngBounds> {
        self.shared.lock().target_bounds
    }

    pub fn loaded_style(&self) -> Option<StyleSource> {
        self.shared.lock().style.clone()
    }

    pub fn ui_settings(&self) -> Vec<UiSetting> {
        self.shared.lock().ui.clone()
    }

    pub fn source(&self, id: &str) -> Option<SourceSpec> {
        self.shared.lock().sources.get(id).map(|s| s.spec.clone())
    }

    pub fn source_features(&self, id: &str) -> Option<FeatureCollection> {
        self.shared
            .lock()
            .sources
            .get(id)
            .and_then(|s| s.features.clone())
    }

    pub fn layer(&self, id: &str) -> Option<LayerSpec> {
        self.shared
            .lock()
            .layers
            .iter()
            .find(|l| l.spec.id == id)
            .map(|l| l.spec.clone())
    }

    pub fn layer_visible(&self, id: &str) -> Option<bool> {
        self.shared
            .lock()
            .layers
            .iter()
            .find(|l| l.spec.id == id)
            .map(|l| l.visible)
    }

    pub fn image(&self, name: &str) -> Option<ImageData> {
        self.shared.lock().images.get(name).cloned()
    }

    pub fn language(&self) -> Option<String> {
        self.shared.lock().language.clone()
    }

    pub fn location_enabled(&self) -> bool {
        self.shared.lock().location_enabled
    }

    pub fn location_updates(&self) -> bool {
        self.shared.lock().location_updates
    }

    pub fn tracking_mode(&self) -> TrackingMode {
        self.shared.lock().tracking_mode
    }

    pub fn render_mode(&self) -> RenderMode {
        self.shared.lock().render_mode
    }

    pub fn cache_invalidations(&self) -> u32 {
        self.shared.lock().cache_invalidations
    }

    pub fn is_torn_down(&self) -> bool {
        self.shared.lock().torn_down
    }

    /// Transition callbacks kept past teardown by an engine that does not
    /// cancel on teardown.
    pub fn orphaned_transitions(&self) -> usize {
        self.shared.lock().orphaned.len()
    }
}
