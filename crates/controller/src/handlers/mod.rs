//! Command handlers, grouped by the part of the engine they drive.

mod camera;
mod layer;
mod location;
mod map;
mod query;
mod source;

use std::collections::HashMap;

use engine::{FeatureCollection, MapEngine, StyleSource};

use crate::config::ControllerConfig;
use crate::hit_test::InteractiveLayers;
use crate::lifecycle::{EngineAccess, Lifecycle};
use crate::options::MapSettings;
use crate::router::Router;

/// What a handler may touch while it runs.
pub(crate) struct Ctx<'a> {
    pub access: EngineAccess<'a>,
    pub config: &'a ControllerConfig,
    pub lifecycle: &'a mut Lifecycle,
    pub settings: &'a mut MapSettings,
    pub interactive: &'a mut InteractiveLayers,
    /// Last collection pushed to each GeoJSON source.
    pub geojson: &'a mut HashMap<String, FeatureCollection>,
    /// Style requested before the map was ready.
    pub pending_style: &'a mut Option<StyleSource>,
}

impl Ctx<'_> {
    pub fn engine(&mut self) -> &mut dyn MapEngine {
        self.access.engine()
    }

    pub fn density(&self) -> f64 {
        self.config.pixel_ratio
    }

    /// Starts loading `source`, or parks it until the map is ready.
    pub fn set_style(&mut self, source: StyleSource) {
        if !self.lifecycle.is_map_ready() {
            tracing::debug!("map not ready, deferring style load");
            *self.pending_style = Some(source);
            return;
        }
        let id = self.lifecycle.begin_style_load();
        tracing::info!(request = id.0, "loading style");
        self.geojson.clear();
        self.interactive.clear();
        self.engine().load_style(id, &source);
    }
}

pub(crate) fn routes() -> Router {
    let mut router = Router::default();
    map::register(&mut router);
    camera::register(&mut router);
    query::register(&mut router);
    source::register(&mut router);
    layer::register(&mut router);
    location::register(&mut router);
    router
}
