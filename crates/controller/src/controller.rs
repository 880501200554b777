//! The per-map controller actor.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use codec::MapOptions;
use codec::style::style_source;
use engine::{
    EngineError, EngineEvent, FeatureCollection, Location, MapEngine, RenderMode, StyleSource,
    TrackingMode, TransitionOutcome,
};
use foundation::ScreenPoint;
use parking_lot::Mutex;
use runtime::{Mailbox, MailboxClosed, Metrics, MetricsSnapshot, Waker};
use serde_json::{Value, json};
use tracing::{debug, error, trace, warn};

use crate::camera::{CameraArbiter, ReplyCell, reply_cell, take_reply};
use crate::config::{ConfigError, ControllerConfig};
use crate::drag::{DragMachine, DragPhase, DragStep, GestureDisposition};
use crate::emitter::{EventEmitter, Forwarding};
use crate::error::CommandError;
use crate::handlers::{self, Ctx};
use crate::hit_test::InteractiveLayers;
use crate::lifecycle::{EngineAccess, Lifecycle, Phase, Requirement};
use crate::options::MapSettings;
use crate::protocol::{Command, HostChannel, HostEvent, PendingReply, SharedMetrics};
use crate::router::{Deferred, Outcome, Router, panic_message};

/// Work marshalled onto the controller from engine threads.
pub(crate) enum Signal {
    Engine(EngineEvent),
    TransitionSettled {
        cell: ReplyCell,
        outcome: TransitionOutcome,
    },
    LastLocation {
        cell: ReplyCell,
        result: Result<Option<Location>, EngineError>,
    },
    AmbientCache {
        cell: ReplyCell,
        result: Result<(), EngineError>,
    },
}

/// Everything command handlers can reach.
pub(crate) struct State {
    pub config: ControllerConfig,
    pub lifecycle: Lifecycle,
    pub engine: Box<dyn MapEngine>,
    pub settings: MapSettings,
    pub interactive: InteractiveLayers,
    pub geojson: HashMap<String, FeatureCollection>,
    pub pending_style: Option<StyleSource>,
}

impl State {
    pub fn ctx(&mut self, requirement: Requirement) -> Result<Ctx<'_>, CommandError> {
        let access =
            EngineAccess::acquire(&self.lifecycle, requirement, self.engine.as_mut())?;
        Ok(Ctx {
            access,
            config: &self.config,
            lifecycle: &mut self.lifecycle,
            settings: &mut self.settings,
            interactive: &mut self.interactive,
            geojson: &mut self.geojson,
            pending_style: &mut self.pending_style,
        })
    }
}

/// One map controller, serving one host and owning one engine.
///
/// All methods must be called from a single execution context. Engine
/// callbacks arriving on other threads are queued and handled by [`pump`],
/// which [`dispatch`] runs before and after every command.
///
/// [`pump`]: MapController::pump
/// [`dispatch`]: MapController::dispatch
pub struct MapController {
    state: State,
    router: Router,
    arbiter: CameraArbiter,
    drag: DragMachine,
    emitter: EventEmitter,
    host: Arc<dyn HostChannel>,
    metrics: SharedMetrics,
    mailbox: Mailbox<Signal>,
    map_waiters: Vec<PendingReply>,
}

impl MapController {
    pub fn new(
        config: ControllerConfig,
        mut engine: Box<dyn MapEngine>,
        host: Arc<dyn HostChannel>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut initial = MapOptions {
            track_camera_position: Some(config.track_camera_position),
            my_location_enabled: Some(config.my_location_enabled),
            my_location_tracking_mode: TrackingMode::from_code(config.my_location_tracking_mode),
            my_location_render_mode: RenderMode::from_code(config.my_location_render_mode),
            ..MapOptions::default()
        };
        if let Some(bag) = &config.initial_options {
            initial.merge(MapOptions::parse(bag, config.pixel_ratio)?);
        }
        let style = match initial.style_string.take() {
            Some(text) => style_source(&text)?,
            None => style_source(&config.initial_style)?,
        };

        let lifecycle = Lifecycle::new();
        let mut settings = MapSettings::new();
        settings.update(engine.as_mut(), &lifecycle, initial);

        let mailbox = Mailbox::new();
        let tx = mailbox.sender();
        engine.attach(Arc::new(move |event| {
            if tx.post(Signal::Engine(event)).is_err() {
                trace!("engine signal after close dropped");
            }
        }));

        let metrics: SharedMetrics = Arc::new(Mutex::new(Metrics::new()));
        let mut controller = Self {
            drag: DragMachine::new(config.drag_enabled, config.hit_radius_px),
            state: State {
                config,
                lifecycle,
                engine,
                settings,
                interactive: InteractiveLayers::new(),
                geojson: HashMap::new(),
                pending_style: Some(style),
            },
            router: handlers::routes(),
            arbiter: CameraArbiter::new(),
            emitter: EventEmitter::new(Arc::clone(&host), Arc::clone(&metrics)),
            host,
            metrics,
            mailbox,
            map_waiters: Vec::new(),
        };
        controller.pump();
        Ok(controller)
    }

    pub fn phase(&self) -> Phase {
        self.state.lifecycle.phase()
    }

    pub fn drag_phase(&self) -> DragPhase {
        self.drag.phase()
    }

    pub fn is_interactive(&self, layer_id: &str) -> bool {
        self.state.interactive.contains(layer_id)
    }

    pub fn transitions_in_flight(&self) -> usize {
        self.arbiter.in_flight()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.lock().snapshot()
    }

    /// Runs `waker` whenever an engine thread queues work for [`pump`].
    ///
    /// [`pump`]: MapController::pump
    pub fn set_waker(&self, waker: Waker) {
        self.mailbox.set_waker(waker);
    }

    /// Handles one host command. Exactly one reply is sent for it, either
    /// before this returns or later from [`pump`](MapController::pump).
    pub fn dispatch(&mut self, command: Command) {
        self.pump();
        self.metrics.lock().inc_counter("commands.dispatched", 1);
        debug!(id = command.id, method = %command.method, "dispatch");
        let reply = PendingReply::new(&command, Arc::clone(&self.host), Arc::clone(&self.metrics));
        match self.router.dispatch(&mut self.state, &command) {
            Ok(Outcome::Value(value)) => reply.succeed(value),
            Ok(Outcome::Deferred(deferred)) => self.defer_guarded(&command, deferred, reply),
            Err(err) => reply.fail(err),
        }
        self.pump();
    }

    /// Drains queued engine signals and completions. Returns how many were
    /// handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(signal) = self.mailbox.pop() {
            self.handle_signal(signal);
            handled += 1;
        }
        if handled > 0 {
            let in_flight = i64::try_from(self.arbiter.in_flight()).unwrap_or(i64::MAX);
            self.metrics.lock().set_gauge("camera.in_flight", in_flight);
        }
        handled
    }

    pub fn on_move_begin(
        &mut self,
        focal: ScreenPoint,
        pointers: u32,
        fresh_press: bool,
    ) -> GestureDisposition {
        if !self.state.lifecycle.is_style_ready() {
            return GestureDisposition::PassThrough;
        }
        let step = self.drag.on_move_begin(
            self.state.engine.as_ref(),
            &self.state.interactive,
            focal,
            pointers,
            fresh_press,
        );
        self.finish_step(step)
    }

    pub fn on_move(&mut self, focal: ScreenPoint, pointers: u32) -> GestureDisposition {
        let step = self.drag.on_move(self.state.engine.as_ref(), focal, pointers);
        self.finish_step(step)
    }

    pub fn on_move_end(&mut self, focal: ScreenPoint) -> GestureDisposition {
        let step = self.drag.on_move_end(self.state.engine.as_ref(), focal);
        self.finish_step(step)
    }

    /// Tears the controller down. Idempotent. Every reply still pending is
    /// resolved before this returns.
    pub fn dispose(&mut self) {
        if !self.state.lifecycle.dispose() {
            return;
        }
        self.state.settings.deactivate_location(self.state.engine.as_mut());
        self.drag.detach();
        self.state.engine.teardown();
        self.pump();

        let abandoned = self.arbiter.abandon_all();
        if abandoned > 0 {
            warn!(abandoned, "camera transitions left unsettled by the engine");
        }
        for waiter in self.map_waiters.drain(..) {
            waiter.fail(CommandError::disposed());
        }
        self.mailbox.close();
        self.pump();
    }

    fn finish_step(&mut self, step: DragStep) -> GestureDisposition {
        if let Some(event) = step.event {
            self.emitter.emit(HostEvent::FeatureDrag(event));
        }
        step.disposition
    }

    /// Runs the engine side of a deferred command. An engine panic resolves
    /// the reply with `EngineReportedFailure` unless a callback already did.
    fn defer_guarded(&mut self, command: &Command, deferred: Deferred, reply: PendingReply) {
        let cell = reply_cell(reply);
        let issued = catch_unwind(AssertUnwindSafe(|| self.defer(deferred, Arc::clone(&cell))));
        if let Err(payload) = issued {
            let message = panic_message(payload.as_ref());
            error!(method = %command.method, %message, "engine panicked");
            if let Some(reply) = take_reply(&cell) {
                reply.fail(CommandError::engine(message));
            }
        }
    }

    fn defer(&mut self, deferred: Deferred, cell: ReplyCell) {
        match deferred {
            Deferred::MapReady => {
                let Some(reply) = take_reply(&cell) else {
                    return;
                };
                if self.state.lifecycle.is_map_ready() {
                    reply.succeed(Value::Null);
                } else {
                    self.map_waiters.push(reply);
                }
            }
            Deferred::Transition(request) => {
                let tx = self.mailbox.sender();
                self.arbiter
                    .submit(self.state.engine.as_mut(), request, cell, &tx);
            }
            Deferred::LastLocation => {
                let tx = self.mailbox.sender();
                self.state.engine.last_location(Box::new(move |result| {
                    if let Err(MailboxClosed(Signal::LastLocation { cell, result })) =
                        tx.post(Signal::LastLocation { cell, result })
                    {
                        finish_last_location(&cell, result);
                    }
                }));
            }
            Deferred::AmbientCache => {
                let tx = self.mailbox.sender();
                self.state.engine.invalidate_ambient_cache(Box::new(move |result| {
                    if let Err(MailboxClosed(Signal::AmbientCache { cell, result })) =
                        tx.post(Signal::AmbientCache { cell, result })
                    {
                        finish_ambient_cache(&cell, result);
                    }
                }));
            }
        }
    }

    fn handle_signal(&mut self, signal: Signal) {
        match signal {
            Signal::Engine(event) => self.on_engine_event(event),
            Signal::TransitionSettled { cell, outcome } => self.arbiter.settle(&cell, outcome),
            Signal::LastLocation { cell, result } => finish_last_location(&cell, result),
            Signal::AmbientCache { cell, result } => finish_ambient_cache(&cell, result),
        }
    }

    fn on_engine_event(&mut self, event: EngineEvent) {
        if self.state.lifecycle.is_disposed() {
            trace!(?event, "engine signal after dispose ignored");
            return;
        }
        debug!(?event, "engine signal");
        match event {
            EngineEvent::MapReady => self.on_map_ready(),
            EngineEvent::StyleLoaded(id) => {
                if self.state.lifecycle.on_style_loaded(id) {
                    self.state.settings.on_style_loaded(self.state.engine.as_mut());
                    self.emitter.emit(HostEvent::StyleLoaded);
                }
            }
            event => {
                if matches!(event, EngineEvent::CameraTrackingDismissed) {
                    self.state.settings.on_tracking_dismissed();
                }
                let state = Forwarding {
                    track_camera_position: self.state.settings.track_camera_position(),
                    location_active: self.state.settings.location_active(),
                    interactive: &self.state.interactive,
                    hit_radius: self.state.config.hit_radius_px,
                };
                self.emitter.forward(self.state.engine.as_ref(), &event, state);
            }
        }
    }

    fn on_map_ready(&mut self) {
        if !self.state.lifecycle.on_map_ready() {
            return;
        }
        self.state.settings.on_map_ready(self.state.engine.as_mut());
        if let Some(style) = self.state.pending_style.take()
            && let Ok(mut ctx) = self.state.ctx(Requirement::None)
        {
            ctx.set_style(style);
        }
        for waiter in self.map_waiters.drain(..) {
            waiter.succeed(Value::Null);
        }
    }
}

impl Drop for MapController {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn finish_last_location(cell: &ReplyCell, result: Result<Option<Location>, EngineError>) {
    let Some(reply) = take_reply(cell) else {
        return;
    };
    match result {
        Ok(Some(location)) => reply.succeed(json!({
            "latitude": location.position.latitude,
            "longitude": location.position.longitude,
            "altitude": location.altitude,
        })),
        Ok(None) => reply.fail(CommandError::engine("no location fix is available")),
        Err(err) => reply.fail(err.into()),
    }
}

fn finish_ambient_cache(cell: &ReplyCell, result: Result<(), EngineError>) {
    let Some(reply) = take_reply(cell) else {
        return;
    };
    match result {
        Ok(()) => reply.succeed(Value::Null),
        Err(err) => reply.fail(err.into()),
    }
}
