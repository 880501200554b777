//! End-to-end controller behaviour against the in-memory engine.

use std::sync::Arc;
use std::time::Duration;

use engine::sim::{SimConfig, SimDriver, SimEngine};
use engine::{EngineEvent, Location, TrackingMode, UiSetting};
use foundation::{CameraPosition, LatLng, ScreenPoint};
use pretty_assertions::{assert_eq, assert_ne};
use serde_json::{Value, json};

use crate::config::ControllerConfig;
use crate::controller::{MapController, State};
use crate::drag::{DragPhase, GestureDisposition};
use crate::error::{CommandError, ErrorKind};
use crate::handlers::Ctx;
use crate::hit_test::InteractiveLayers;
use crate::lifecycle::{Lifecycle, Phase, Requirement};
use crate::options::MapSettings;
use crate::protocol::{Command, DragEventType, HostEvent, RecordingHost, Reply};
use crate::router::{Outcome, Router};

struct Harness {
    controller: MapController,
    driver: SimDriver,
    host: RecordingHost,
    next_id: u64,
}

fn sim_config() -> SimConfig {
    SimConfig {
        camera: CameraPosition {
            target: LatLng::new(48.0, 11.0),
            zoom: 10.0,
            ..CameraPosition::default()
        },
        ..SimConfig::default()
    }
}

impl Harness {
    fn with(config: ControllerConfig, sim: SimConfig) -> Self {
        let (engine, driver) = SimEngine::new(sim);
        let host = RecordingHost::new();
        let controller =
            MapController::new(config, Box::new(engine), Arc::new(host.clone())).unwrap();
        Self {
            controller,
            driver,
            host,
            next_id: 1,
        }
    }

    /// Map ready, style load requested but not finished.
    fn awaiting_style() -> Self {
        Self::with(ControllerConfig::default(), sim_config())
    }

    fn ready() -> Self {
        let mut h = Self::awaiting_style();
        h.finish_style_load();
        h.host.take_events();
        h
    }

    fn finish_style_load(&mut self) {
        self.driver.complete_style_loads();
        self.controller.pump();
    }

    fn send(&mut self, method: &str, args: Value) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.controller.dispatch(Command::new(id, method, args));
        id
    }

    /// Sends a command that must be answered synchronously.
    fn call(&mut self, method: &str, args: Value) -> Reply {
        let id = self.send(method, args);
        let replies = self.host.replies_for(id);
        assert_eq!(replies.len(), 1, "{method} should reply exactly once");
        replies[0].clone()
    }

    fn ok(&mut self, method: &str, args: Value) -> Value {
        let reply = self.call(method, args);
        match reply.value() {
            Some(v) => v.clone(),
            None => panic!("{method} failed: {:?}", reply.error()),
        }
    }

    fn err(&mut self, method: &str, args: Value) -> ErrorKind {
        let reply = self.call(method, args);
        reply.error_kind().unwrap_or_else(|| panic!("{method} unexpectedly succeeded"))
    }

    fn screen_to_lat_lng(&mut self, x: f64, y: f64) -> LatLng {
        let v = self.ok("map#toLatLng", json!({"x": x, "y": y}));
        LatLng::new(v["latitude"].as_f64().unwrap(), v["longitude"].as_f64().unwrap())
    }

    fn add_points(&mut self, source: &str, points: &[(&str, LatLng, bool)]) {
        let features: Vec<Value> = points
            .iter()
            .map(|(id, at, draggable)| {
                json!({
                    "type": "Feature",
                    "id": id,
                    "properties": {"draggable": draggable},
                    "geometry": {"type": "Point", "coordinates": [at.longitude, at.latitude]},
                })
            })
            .collect();
        let geojson = json!({"type": "FeatureCollection", "features": features}).to_string();
        self.ok("source#addGeoJson", json!({"sourceId": source, "geojson": geojson}));
    }

    fn add_interactive_layer(&mut self, layer: &str, source: &str) {
        self.ok(
            "symbolLayer#add",
            json!({"layerId": layer, "sourceId": source, "enableInteraction": true}),
        );
    }

    fn drag_events(&self) -> Vec<crate::protocol::FeatureDragEvent> {
        self.host
            .events()
            .into_iter()
            .filter_map(|e| match e {
                HostEvent::FeatureDrag(d) => Some(d),
                _ => None,
            })
            .collect()
    }
}

fn geojson_points() -> String {
    json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "id": 1,
            "properties": {},
            "geometry": {"type": "Point", "coordinates": [11.0, 48.0]},
        }],
    })
    .to_string()
}

#[test]
fn every_command_gets_exactly_one_reply() {
    let mut h = Harness::awaiting_style();
    let commands = [
        ("map#waitForMap", json!({})),
        ("map#nope", json!({})),
        ("camera#move", json!({})),
        ("camera#move", json!({"cameraUpdate": ["spin"]})),
        ("camera#move", json!({"cameraUpdate": ["scrollBy", 10, 10]})),
        ("source#addGeoJson", json!({"sourceId": "pts", "geojson": geojson_points()})),
        ("map#getTelemetryEnabled", Value::Null),
    ];
    for (method, args) in commands {
        h.call(method, args);
    }
    h.finish_style_load();
    for (method, args) in [
        ("source#addGeoJson", json!({"sourceId": "pts", "geojson": "{not json"})),
        ("style#removeSource", json!({"sourceId": "missing"})),
        ("style#getLayerIds", json!({})),
    ] {
        h.call(method, args);
    }
    let replies = h.host.replies();
    assert_eq!(replies.len(), 10);
    let kinds: Vec<Option<ErrorKind>> = replies.iter().map(Reply::error_kind).collect();
    assert_eq!(
        kinds,
        vec![
            None,
            Some(ErrorKind::Unimplemented),
            Some(ErrorKind::MalformedArgument),
            Some(ErrorKind::UnrecognizedCameraUpdate),
            None,
            Some(ErrorKind::StyleNotReady),
            None,
            Some(ErrorKind::MalformedArgument),
            Some(ErrorKind::EngineReportedFailure),
            None,
        ]
    );
    assert_eq!(h.controller.transitions_in_flight(), 0);
}

fn explode(_: &mut Ctx<'_>, _: &Value) -> Result<Outcome, CommandError> {
    panic!("engine handle vanished")
}

#[test]
fn handler_panics_become_engine_failures() {
    let (engine, _driver) = SimEngine::new(SimConfig::default());
    let mut state = State {
        config: ControllerConfig::default(),
        lifecycle: Lifecycle::new(),
        engine: Box::new(engine),
        settings: MapSettings::new(),
        interactive: InteractiveLayers::new(),
        geojson: Default::default(),
        pending_style: None,
    };
    let mut router = Router::default();
    router.route("test#explode", Requirement::None, explode);
    let err = router
        .dispatch(&mut state, &Command::new(1, "test#explode", Value::Null))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::EngineReportedFailure);
    assert_eq!(err.message, "engine handle vanished");
}

#[test]
fn engine_panics_after_the_handler_still_reply() {
    let mut h = Harness::ready();
    h.ok("map#update", json!({"options": {"myLocationEnabled": true}}));
    h.driver.set_faulty(true);

    let ids = [
        h.send("camera#animate", json!({"cameraUpdate": ["zoomTo", 3]})),
        h.send("camera#move", json!({"cameraUpdate": ["zoomIn"]})),
        h.send("map#invalidateAmbientCache", json!({})),
        h.send("locationComponent#getLastLocation", json!({})),
    ];
    assert_eq!(h.controller.transitions_in_flight(), 0);
    h.controller.pump();
    for id in ids {
        let replies = h.host.replies_for(id);
        assert_eq!(replies.len(), 1, "command {id}");
        let err = replies[0].error().cloned().unwrap_or_else(|| panic!("command {id} succeeded"));
        assert_eq!(err.kind, ErrorKind::EngineReportedFailure);
        assert!(err.message.contains("sim engine fault"), "{}", err.message);
    }

    h.driver.set_faulty(false);
    assert_eq!(h.ok("camera#move", json!({"cameraUpdate": ["zoomIn"]})), json!(true));
}

#[test]
fn style_commands_are_gated_until_the_style_loads() {
    let mut h = Harness::awaiting_style();
    assert_eq!(h.controller.phase(), Phase::AwaitingStyle);
    let args = json!({"sourceId": "pts", "geojson": geojson_points()});
    assert_eq!(h.err("source#addGeoJson", args.clone()), ErrorKind::StyleNotReady);
    assert_eq!(
        h.err("symbolLayer#add", json!({"layerId": "l", "sourceId": "pts"})),
        ErrorKind::StyleNotReady
    );
    assert_eq!(h.err("style#getLayerIds", json!({})), ErrorKind::StyleNotReady);
    assert!(h.driver.source("pts").is_none());

    h.finish_style_load();
    assert_eq!(h.host.events(), vec![HostEvent::StyleLoaded]);
    assert_eq!(h.ok("source#addGeoJson", args), Value::Null);
    assert!(h.driver.source("pts").is_some());
}

#[test]
fn superseded_style_load_is_not_reported() {
    let mut h = Harness::ready();
    h.ok("map#setStyle", json!({"styleString": "{\"version\": 8, \"layers\": []}"}));
    h.ok("map#setStyle", json!({"styleString": "https://example.com/style.json"}));
    assert_eq!(h.controller.phase(), Phase::AwaitingStyle);
    assert_eq!(h.driver.pending_style_loads().len(), 2);
    h.finish_style_load();
    assert_eq!(h.host.events(), vec![HostEvent::StyleLoaded]);
    assert_eq!(h.controller.phase(), Phase::Ready);
}

#[test]
fn wait_for_map_resolves_on_readiness() {
    let sim = SimConfig {
        ready_on_attach: false,
        ..sim_config()
    };
    let mut h = Harness::with(ControllerConfig::default(), sim);
    let id = h.send("map#waitForMap", json!({}));
    assert!(h.host.replies_for(id).is_empty());
    assert_eq!(h.err("camera#move", json!({"cameraUpdate": ["zoomIn"]})), ErrorKind::MapNotReady);

    h.driver.make_ready();
    h.controller.pump();
    assert_eq!(h.host.replies_for(id)[0].value(), Some(&Value::Null));
    assert_eq!(h.controller.phase(), Phase::AwaitingStyle);
    assert_eq!(h.ok("map#waitForMap", json!({})), Value::Null);
}

#[test]
fn overlapping_animations_each_resolve_once() {
    let mut h = Harness::ready();
    let ids: Vec<u64> = (0..5)
        .map(|i| {
            h.send(
                "camera#animate",
                json!({"cameraUpdate": ["zoomTo", 5.0 + f64::from(i)], "duration": 300}),
            )
        })
        .collect();
    assert_eq!(h.controller.transitions_in_flight(), 1);
    h.driver.settle();
    h.controller.pump();

    let outcomes: Vec<Value> = ids
        .iter()
        .map(|id| {
            let replies = h.host.replies_for(*id);
            assert_eq!(replies.len(), 1);
            replies[0].value().cloned().unwrap()
        })
        .collect();
    assert_eq!(
        outcomes,
        vec![json!(false), json!(false), json!(false), json!(false), json!(true)]
    );
    assert_eq!(h.driver.camera().zoom, 9.0);
}

#[test]
fn newer_animation_cancels_the_older_one() {
    let mut h = Harness::ready();
    let first = h.send(
        "camera#animate",
        json!({"cameraUpdate": {"type": "zoomTo", "zoom": 10}, "duration": 300}),
    );
    let second = h.send("camera#animate", json!({"cameraUpdate": {"type": "zoomTo", "zoom": 5}}));
    assert_eq!(h.host.replies_for(first)[0].value(), Some(&json!(false)));
    assert!(h.host.replies_for(second).is_empty());

    h.driver.advance(Duration::from_millis(150));
    h.controller.pump();
    assert!(h.host.replies_for(second).is_empty());
    h.driver.settle();
    h.controller.pump();
    assert_eq!(h.host.replies_for(second)[0].value(), Some(&json!(true)));
}

#[test]
fn move_replies_once_and_scroll_is_synchronous() {
    let mut h = Harness::ready();
    assert_eq!(h.ok("camera#move", json!({"cameraUpdate": ["zoomTo", 12]})), json!(true));
    assert_eq!(h.driver.camera().zoom, 12.0);
    let before = h.driver.camera().target;
    assert_eq!(
        h.ok("camera#move", json!({"cameraUpdate": ["scrollBy", 50, 0]})),
        json!(true)
    );
    assert_ne!(h.driver.camera().target, before);
}

#[test]
fn click_reports_the_topmost_interactive_feature() {
    let mut h = Harness::ready();
    let p = ScreenPoint::new(300.0, 400.0);
    let at = h.screen_to_lat_lng(p.x, p.y);
    h.add_points("low", &[("bottom", at, false)]);
    h.add_points("high", &[("top", at, false)]);
    h.add_interactive_layer("l1", "low");
    h.add_interactive_layer("l2", "high");

    h.driver.tap(p);
    h.controller.pump();
    let events = h.host.take_events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        HostEvent::FeatureTap(tap) => assert_eq!(tap.id, json!("top")),
        other => panic!("expected a feature tap, got {other:?}"),
    }

    h.driver.tap(ScreenPoint::new(900.0, 1500.0));
    h.controller.pump();
    assert!(matches!(h.host.take_events()[..], [HostEvent::MapClick(_)]));

    h.driver.long_press(p);
    h.controller.pump();
    assert!(matches!(h.host.take_events()[..], [HostEvent::MapLongClick(_)]));
}

#[test]
fn removed_layers_stop_being_interactive() {
    let mut h = Harness::ready();
    h.add_points("pts", &[("a", LatLng::new(48.0, 11.0), false)]);
    h.add_interactive_layer("l", "pts");
    assert!(h.controller.is_interactive("l"));
    h.ok("style#removeLayer", json!({"layerId": "l"}));
    assert!(!h.controller.is_interactive("l"));
}

#[test]
fn drag_emits_start_drag_end_with_incremental_deltas() {
    let mut h = Harness::ready();
    let at = h.screen_to_lat_lng(100.0, 100.0);
    h.add_points("pins", &[("pin", at, true)]);
    h.add_interactive_layer("pins", "pins");

    let begin = h.controller.on_move_begin(ScreenPoint::new(100.0, 100.0), 1, true);
    assert_eq!(begin, GestureDisposition::Claimed);
    h.controller.on_move(ScreenPoint::new(110.0, 105.0), 1);
    h.controller.on_move(ScreenPoint::new(120.0, 110.0), 1);
    h.controller.on_move_end(ScreenPoint::new(120.0, 110.0));

    let events = h.drag_events();
    let phases: Vec<DragEventType> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(
        phases,
        vec![
            DragEventType::Start,
            DragEventType::Drag,
            DragEventType::Drag,
            DragEventType::End
        ]
    );
    assert_eq!((events[0].x, events[0].y), (100.0, 100.0));
    let end = &events[3];
    assert_eq!((end.x, end.y), (120.0, 110.0));
    assert_eq!(end.id, json!("pin"));

    let sum_lng: f64 = events.iter().map(|e| e.delta_lng).sum();
    let sum_lat: f64 = events.iter().map(|e| e.delta_lat).sum();
    assert!((sum_lng - (end.current_lng - end.origin_lng)).abs() < 1e-9);
    assert!((sum_lat - (end.current_lat - end.origin_lat)).abs() < 1e-9);
    assert!(events[1].delta_lng > 0.0 && events[2].delta_lng > 0.0);
    assert_eq!(h.controller.drag_phase(), DragPhase::Idle);
}

#[test]
fn only_one_drag_session_at_a_time() {
    let mut h = Harness::ready();
    let at = h.screen_to_lat_lng(100.0, 100.0);
    h.add_points("pins", &[("pin", at, true)]);
    h.add_interactive_layer("pins", "pins");

    h.controller.on_move_begin(ScreenPoint::new(100.0, 100.0), 1, true);
    let again = h.controller.on_move_begin(ScreenPoint::new(101.0, 101.0), 1, true);
    assert_eq!(again, GestureDisposition::Claimed);
    assert_eq!(h.drag_events().len(), 1);
    assert_eq!(h.controller.drag_phase(), DragPhase::Dragging);
}

#[test]
fn second_finger_cancels_drag_without_end() {
    let mut h = Harness::ready();
    let at = h.screen_to_lat_lng(100.0, 100.0);
    h.add_points("pins", &[("pin", at, true)]);
    h.add_interactive_layer("pins", "pins");

    h.controller.on_move_begin(ScreenPoint::new(100.0, 100.0), 1, true);
    h.controller.on_move(ScreenPoint::new(105.0, 100.0), 1);
    let cancel = h.controller.on_move(ScreenPoint::new(110.0, 100.0), 2);
    assert_eq!(cancel, GestureDisposition::PassThrough);
    h.controller.on_move_end(ScreenPoint::new(110.0, 100.0));

    let phases: Vec<DragEventType> = h.drag_events().iter().map(|e| e.event_type).collect();
    assert_eq!(phases, vec![DragEventType::Start, DragEventType::Drag]);
    assert_eq!(h.controller.drag_phase(), DragPhase::Idle);
}

#[test]
fn update_returns_pose_only_when_tracking() {
    let mut h = Harness::ready();
    assert_eq!(h.ok("map#update", json!({"options": {"compassEnabled": true}})), Value::Null);
    assert!(h.driver.ui_settings().contains(&UiSetting::CompassEnabled(true)));

    let pose = h.ok("map#update", json!({"options": {"trackCameraPosition": true}}));
    assert_eq!(pose["zoom"], json!(10.0));
    assert_eq!(pose["target"], json!([48.0, 11.0]));
}

#[test]
fn camera_move_events_follow_tracking_toggle() {
    let mut h = Harness::ready();
    h.ok("camera#move", json!({"cameraUpdate": ["zoomIn"]}));
    let methods: Vec<&str> = h.host.take_events().iter().map(HostEvent::method).collect();
    assert!(!methods.contains(&"camera#onMove"));
    assert!(methods.contains(&"camera#onIdle"));

    h.ok("map#update", json!({"options": {"trackCameraPosition": true}}));
    h.ok("camera#move", json!({"cameraUpdate": ["zoomOut"]}));
    let methods: Vec<&str> = h.host.take_events().iter().map(HostEvent::method).collect();
    assert!(methods.contains(&"camera#onMove"));
}

#[test]
fn set_feature_replaces_by_id() {
    let mut h = Harness::ready();
    h.add_points("pts", &[("a", LatLng::new(48.0, 11.0), false)]);
    let moved = json!({
        "type": "Feature",
        "id": "a",
        "properties": {"moved": true},
        "geometry": {"type": "Point", "coordinates": [11.5, 48.5]},
    });
    h.ok(
        "source#setFeature",
        json!({"sourceId": "pts", "geojsonFeature": moved.to_string()}),
    );
    let data = h.driver.source_features("pts").unwrap();
    assert_eq!(data.features.len(), 1);
    assert_eq!(data.features[0].properties["moved"], json!(true));

    assert_eq!(
        h.err("source#setFeature", json!({"sourceId": "nope", "geojsonFeature": moved.to_string()})),
        ErrorKind::EngineReportedFailure
    );
}

#[test]
fn filters_need_a_filterable_layer() {
    let mut h = Harness::ready();
    h.ok(
        "style#addSource",
        json!({"sourceId": "sat", "properties": {"type": "raster", "url": "https://tiles/sat.json"}}),
    );
    h.ok("rasterLayer#add", json!({"layerId": "sat", "sourceId": "sat"}));
    assert_eq!(
        h.err("style#setFilter", json!({"layerId": "sat", "filter": "[\"has\", \"x\"]"})),
        ErrorKind::UnsupportedLayerOperation
    );

    h.add_points("pts", &[("a", LatLng::new(48.0, 11.0), false)]);
    h.ok("circleLayer#add", json!({"layerId": "dots", "sourceId": "pts"}));
    h.ok("style#setFilter", json!({"layerId": "dots", "filter": "[\"has\", \"x\"]"}));
    assert_eq!(
        h.ok("style#getFilter", json!({"layerId": "dots"})),
        json!({"filter": ["has", "x"]})
    );
    assert_eq!(
        h.ok("style#getLayerIds", json!({})),
        json!({"layers": ["sat", "dots"]})
    );
}

#[test]
fn location_requests_fail_fast_when_disabled() {
    let mut h = Harness::ready();
    assert_eq!(
        h.err("locationComponent#getLastLocation", json!({})),
        ErrorKind::EngineReportedFailure
    );

    h.ok("map#update", json!({"options": {"myLocationEnabled": true}}));
    assert!(h.driver.location_updates());
    let fix = Location {
        position: LatLng::new(48.1, 11.2),
        altitude: 520.0,
        speed: 1.5,
        bearing: 90.0,
        horizontal_accuracy: 5.0,
        vertical_accuracy: None,
        timestamp_ms: 1_700_000_000_000,
    };
    h.driver.push_location(fix);
    h.controller.pump();
    assert!(matches!(
        h.host.take_events()[..],
        [HostEvent::UserLocationUpdated { .. }]
    ));
    assert_eq!(
        h.ok("locationComponent#getLastLocation", json!({})),
        json!({"latitude": 48.1, "longitude": 11.2, "altitude": 520.0})
    );
}

#[test]
fn tracking_dismissal_resets_mode() {
    let mut h = Harness::ready();
    h.ok(
        "map#update",
        json!({"options": {"myLocationEnabled": true, "myLocationTrackingMode": 1}}),
    );
    assert_eq!(h.driver.tracking_mode(), TrackingMode::Tracking);
    h.driver.pan(40.0, 0.0);
    h.controller.pump();
    let methods: Vec<&str> = h.host.events().iter().map(HostEvent::method).collect();
    assert!(methods.contains(&"map#onCameraTrackingDismissed"));
    assert!(methods.contains(&"map#onCameraTrackingChanged"));
    assert!(h.host.events().contains(&HostEvent::CameraMoveStarted { is_gesture: true }));
}

#[test]
fn ambient_cache_failures_are_reported() {
    let mut h = Harness::ready();
    assert_eq!(h.ok("map#invalidateAmbientCache", json!({})), Value::Null);
    h.driver.set_cache_failure(true);
    assert_eq!(
        h.err("map#invalidateAmbientCache", json!({})),
        ErrorKind::EngineReportedFailure
    );
    assert_eq!(h.driver.cache_invalidations(), 2);
}

#[test]
fn options_before_ready_apply_on_ready() {
    let config = ControllerConfig {
        initial_options: Some(json!({"minMaxZoomPreference": [2.0, 14.0]})),
        ..ControllerConfig::default()
    };
    let sim = SimConfig {
        ready_on_attach: false,
        ..sim_config()
    };
    let mut h = Harness::with(config, sim);
    h.ok("map#update", json!({"options": {"compassEnabled": false}}));
    assert!(h.driver.ui_settings().is_empty());

    h.driver.make_ready();
    h.controller.pump();
    assert_eq!(h.driver.zoom_preference(), (2.0, 14.0));
    assert!(h.driver.ui_settings().contains(&UiSetting::CompassEnabled(false)));
    assert_eq!(h.driver.pending_style_loads().len(), 1);
}

#[test]
fn dispose_resolves_everything_pending() {
    let sim = SimConfig {
        cancels_on_teardown: false,
        ..sim_config()
    };
    let mut h = Harness::with(ControllerConfig::default(), sim);
    h.finish_style_load();
    h.ok("map#update", json!({"options": {"myLocationEnabled": true}}));
    let animating = h.send("camera#animate", json!({"cameraUpdate": ["zoomTo", 3]}));

    h.controller.dispose();
    assert_eq!(
        h.host.replies_for(animating)[0].error_kind(),
        Some(ErrorKind::Disposed)
    );
    assert_eq!(h.driver.orphaned_transitions(), 1);
    assert!(!h.driver.location_updates());
    assert!(h.driver.is_torn_down());
    assert_eq!(h.controller.phase(), Phase::Disposed);
    assert_eq!(h.err("map#waitForMap", json!({})), ErrorKind::Disposed);

    h.controller.dispose();
    assert_eq!(h.host.replies_for(animating).len(), 1);
}

#[test]
fn commands_after_dispose_are_disposed() {
    let mut h = Harness::ready();
    h.controller.dispose();
    assert_eq!(h.err("map#nope", json!({})), ErrorKind::Disposed);
    assert_eq!(h.err("map#toScreenLocation", json!({})), ErrorKind::Disposed);
}

#[test]
fn dispose_lets_cancelling_engines_settle_transitions() {
    let mut h = Harness::ready();
    let animating = h.send("camera#animate", json!({"cameraUpdate": ["zoomTo", 3]}));
    h.controller.dispose();
    assert_eq!(h.host.replies_for(animating)[0].value(), Some(&json!(false)));
}

#[test]
fn dispose_fails_map_waiters() {
    let sim = SimConfig {
        ready_on_attach: false,
        ..sim_config()
    };
    let mut h = Harness::with(ControllerConfig::default(), sim);
    let id = h.send("map#waitForMap", json!({}));
    h.controller.dispose();
    assert_eq!(h.host.replies_for(id)[0].error_kind(), Some(ErrorKind::Disposed));
}

#[test]
fn events_after_host_detach_are_dropped() {
    let mut h = Harness::ready();
    h.host.detach();
    h.driver.emit(EngineEvent::DidBecomeIdle);
    h.controller.pump();
    assert!(h.host.events().is_empty());
    let snapshot = h.controller.metrics();
    assert!(snapshot.counters.contains(&("events.dropped".to_string(), 1)));
}

#[test]
fn metrics_count_commands_and_outcomes() {
    let mut h = Harness::ready();
    h.ok("map#getTelemetryEnabled", json!({}));
    h.err("map#unknown", json!({}));
    let counters = h.controller.metrics().counters;
    assert!(counters.contains(&("commands.dispatched".to_string(), 2)));
    assert!(counters.contains(&("replies.ok".to_string(), 1)));
    assert!(counters.contains(&("replies.unimplemented".to_string(), 1)));
}

#[test]
fn projection_round_trips_through_commands() {
    let mut h = Harness::ready();
    let p = h.ok("map#toScreenLocation", json!({"latitude": 48.0, "longitude": 11.0}));
    let back = h.screen_to_lat_lng(p["x"].as_f64().unwrap(), p["y"].as_f64().unwrap());
    assert!((back.latitude - 48.0).abs() < 1e-9);
    assert!((back.longitude - 11.0).abs() < 1e-9);

    let batch = h.ok(
        "map#toScreenLocationBatch",
        json!({"coordinates": [48.0, 11.0, 48.0, 11.0]}),
    );
    assert_eq!(batch, json!([p["x"], p["y"], p["x"], p["y"]]));

    let region = h.ok("map#getVisibleRegion", json!({}));
    assert!(region["sw"][0].as_f64().unwrap() < region["ne"][0].as_f64().unwrap());
    let mpp = h.ok("map#getMetersPerPixelAtLatitude", json!({"latitude": 48.0}));
    assert!(mpp["metersperpixel"].as_f64().unwrap() > 0.0);
}

#[test]
fn queries_return_serialized_features() {
    let mut h = Harness::ready();
    h.add_points("pts", &[("a", LatLng::new(48.0, 11.0), false)]);
    h.ok("circleLayer#add", json!({"layerId": "dots", "sourceId": "pts"}));
    let p = h.ok("map#toScreenLocation", json!({"latitude": 48.0, "longitude": 11.0}));
    let rendered = h.ok(
        "map#queryRenderedFeatures",
        json!({"x": p["x"], "y": p["y"], "layerIds": ["dots"]}),
    );
    let features = rendered["features"].as_array().unwrap();
    assert_eq!(features.len(), 1);
    let feature: Value = serde_json::from_str(features[0].as_str().unwrap()).unwrap();
    assert_eq!(feature["id"], json!("a"));

    let source = h.ok(
        "map#querySourceFeatures",
        json!({"sourceId": "pts", "filter": ["has", "nope"]}),
    );
    assert_eq!(source, json!({"features": []}));
}
