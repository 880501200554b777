//! Map configuration applied from options bags (`map#update`, creation
//! parameters) and the location component state that goes with it.

use codec::MapOptions;
use engine::{GestureKind, Gravity, MapEngine, RenderMode, TrackingMode, UiSetting};
use foundation::{EdgeInsets, LatLngBounds};
use tracing::debug;

use crate::lifecycle::Lifecycle;

#[derive(Debug, Default)]
pub struct MapSettings {
    /// Options received before the map was ready.
    pending: Option<MapOptions>,
    track_camera_position: bool,
    my_location_enabled: bool,
    location_active: bool,
    tracking_mode: TrackingMode,
    render_mode: RenderMode,
    zoom: (Option<f64>, Option<f64>),
    target_bounds: Option<LatLngBounds>,
    compass_gravity: Gravity,
    compass_margins: Option<(i32, i32)>,
    attribution_gravity: Gravity,
    attribution_margins: Option<(i32, i32)>,
}

impl MapSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track_camera_position(&self) -> bool {
        self.track_camera_position
    }

    pub fn my_location_enabled(&self) -> bool {
        self.my_location_enabled
    }

    /// Whether the engine location component is on and updates flow.
    pub fn location_active(&self) -> bool {
        self.location_active
    }

    pub fn tracking_mode(&self) -> TrackingMode {
        self.tracking_mode
    }

    pub fn target_bounds(&self) -> Option<LatLngBounds> {
        self.target_bounds
    }

    /// Applies `options` now, or stores them until the map is ready.
    pub fn update(&mut self, engine: &mut dyn MapEngine, lifecycle: &Lifecycle, options: MapOptions) {
        if let Some(track) = options.track_camera_position {
            self.track_camera_position = track;
        }
        if !lifecycle.is_map_ready() {
            debug!("map not ready, storing options");
            let pending = self.pending.get_or_insert_with(MapOptions::default);
            let zoom = match (pending.min_max_zoom, options.min_max_zoom) {
                (Some((min, max)), Some((new_min, new_max))) => {
                    Some((new_min.or(min), new_max.or(max)))
                }
                (old, new) => new.or(old),
            };
            pending.merge(options);
            pending.min_max_zoom = zoom;
            return;
        }
        self.apply(engine, lifecycle.is_style_ready(), options);
    }

    pub fn on_map_ready(&mut self, engine: &mut dyn MapEngine) {
        if let Some(options) = self.pending.take() {
            debug!("applying stored options");
            self.apply(engine, false, options);
        }
    }

    /// Style reloads reset style-bound engine state.
    pub fn on_style_loaded(&mut self, engine: &mut dyn MapEngine) {
        if self.target_bounds.is_some() {
            engine.set_camera_target_bounds(self.target_bounds);
        }
        if self.my_location_enabled {
            self.activate_location(engine);
        }
    }

    pub fn on_tracking_dismissed(&mut self) {
        self.tracking_mode = TrackingMode::None;
    }

    pub fn set_tracking_mode(&mut self, engine: &mut dyn MapEngine, mode: TrackingMode) {
        self.tracking_mode = mode;
        if self.location_active {
            engine.set_tracking_mode(mode);
        }
    }

    /// Stops location delivery and turns the component off.
    pub fn deactivate_location(&mut self, engine: &mut dyn MapEngine) {
        if self.location_active {
            engine.set_location_updates(false);
            engine.set_location_component(false);
            self.location_active = false;
            debug!("location component deactivated");
        }
    }

    fn activate_location(&mut self, engine: &mut dyn MapEngine) {
        engine.set_location_component(true);
        engine.set_tracking_mode(self.tracking_mode);
        engine.set_render_mode(self.render_mode);
        engine.set_location_updates(true);
        self.location_active = true;
        debug!(mode = ?self.tracking_mode, "location component activated");
    }

    fn apply(&mut self, engine: &mut dyn MapEngine, style_ready: bool, o: MapOptions) {
        if let Some(bounds) = o.camera_target_bounds {
            self.target_bounds = bounds;
            engine.set_camera_target_bounds(bounds);
        }
        if let Some(enabled) = o.compass_enabled {
            engine.apply_ui(UiSetting::CompassEnabled(enabled));
        }
        if let Some((min, max)) = o.min_max_zoom {
            self.zoom = (min.or(self.zoom.0), max.or(self.zoom.1));
            engine.set_zoom_preference(self.zoom.0, self.zoom.1);
        }
        for (kind, enabled) in [
            (GestureKind::Rotate, o.rotate_gestures),
            (GestureKind::Scroll, o.scroll_gestures),
            (GestureKind::Tilt, o.tilt_gestures),
            (GestureKind::Zoom, o.zoom_gestures),
        ] {
            if let Some(enabled) = enabled {
                engine.apply_ui(UiSetting::Gesture(kind, enabled));
            }
        }

        if let Some(mode) = o.my_location_tracking_mode {
            self.set_tracking_mode(engine, mode);
        }
        if let Some(mode) = o.my_location_render_mode {
            self.render_mode = mode;
            if self.location_active {
                engine.set_render_mode(mode);
            }
        }
        if let Some(enabled) = o.my_location_enabled
            && enabled != self.my_location_enabled
        {
            self.my_location_enabled = enabled;
            if !enabled {
                self.deactivate_location(engine);
            } else if style_ready {
                self.activate_location(engine);
            }
        }

        if let Some((x, y)) = o.logo_margins {
            engine.apply_ui(UiSetting::LogoMargins(EdgeInsets::new(x, 0, 0, y)));
        }
        if let Some(gravity) = o.compass_gravity {
            self.compass_gravity = gravity;
            engine.apply_ui(UiSetting::CompassGravity(gravity));
        }
        if let Some(margins) = o.compass_margins.or(o.compass_gravity.and(self.compass_margins)) {
            self.compass_margins = Some(margins);
            let insets = self.compass_gravity.margins(margins.0, margins.1);
            engine.apply_ui(UiSetting::CompassMargins(insets));
        }
        if let Some(gravity) = o.attribution_gravity {
            self.attribution_gravity = gravity;
            engine.apply_ui(UiSetting::AttributionGravity(gravity));
        }
        if let Some(margins) = o
            .attribution_margins
            .or(o.attribution_gravity.and(self.attribution_margins))
        {
            self.attribution_margins = Some(margins);
            let insets = self.attribution_gravity.margins(margins.0, margins.1);
            engine.apply_ui(UiSetting::AttributionMargins(insets));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MapSettings;
    use crate::lifecycle::Lifecycle;
    use codec::MapOptions;
    use engine::sim::{SimConfig, SimEngine};
    use engine::{Gravity, TrackingMode, UiSetting};
    use foundation::EdgeInsets;
    use serde_json::json;

    fn ready_lifecycle(style: bool) -> Lifecycle {
        let mut lc = Lifecycle::new();
        lc.on_map_ready();
        if style {
            let id = lc.begin_style_load();
            lc.on_style_loaded(id);
        }
        lc
    }

    fn opts(v: serde_json::Value) -> MapOptions {
        MapOptions::parse(&v, 1.0).unwrap()
    }

    #[test]
    fn options_before_ready_are_applied_on_ready() {
        let (mut engine, driver) = SimEngine::new(SimConfig::default());
        let mut settings = MapSettings::new();
        settings.update(&mut engine, &Lifecycle::new(), opts(json!({"compassEnabled": false})));
        assert!(driver.ui_settings().is_empty());
        settings.on_map_ready(&mut engine);
        assert_eq!(driver.ui_settings(), vec![UiSetting::CompassEnabled(false)]);
    }

    #[test]
    fn zoom_preference_merges_with_stored_bounds() {
        let (mut engine, driver) = SimEngine::new(SimConfig::default());
        let mut settings = MapSettings::new();
        let lc = ready_lifecycle(false);
        settings.update(&mut engine, &lc, opts(json!({"minMaxZoomPreference": [3.0, 12.0]})));
        settings.update(&mut engine, &lc, opts(json!({"minMaxZoomPreference": [null, 15.0]})));
        assert_eq!(driver.zoom_preference(), (3.0, 15.0));
    }

    #[test]
    fn margins_follow_current_gravity() {
        let (mut engine, driver) = SimEngine::new(SimConfig::default());
        let mut settings = MapSettings::new();
        let lc = ready_lifecycle(false);
        settings.update(&mut engine, &lc, opts(json!({"compassViewMargins": [4, 8]})));
        settings.update(&mut engine, &lc, opts(json!({"compassViewPosition": 2})));
        let ui = driver.ui_settings();
        assert_eq!(ui[0], UiSetting::CompassMargins(EdgeInsets::new(0, 8, 4, 0)));
        assert_eq!(ui[1], UiSetting::CompassGravity(Gravity::BottomLeft));
        assert_eq!(ui[2], UiSetting::CompassMargins(EdgeInsets::new(4, 0, 0, 8)));
    }

    #[test]
    fn location_activates_once_style_is_loaded() {
        let (mut engine, driver) = SimEngine::new(SimConfig::default());
        let mut settings = MapSettings::new();
        settings.update(
            &mut engine,
            &ready_lifecycle(false),
            opts(json!({"myLocationEnabled": true, "myLocationTrackingMode": 1})),
        );
        assert!(!driver.location_enabled());
        settings.on_style_loaded(&mut engine);
        assert!(driver.location_enabled());
        assert!(driver.location_updates());
        assert_eq!(driver.tracking_mode(), TrackingMode::Tracking);

        settings.deactivate_location(&mut engine);
        assert!(!driver.location_updates());
        assert!(!settings.location_active());
    }
}
