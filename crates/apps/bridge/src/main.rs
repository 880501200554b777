//! Hosts one map controller over stdin/stdout.
//!
//! Every stdin line is one JSON document: a host command
//! (`{"id", "method", "arguments"}`), a move-gesture callback
//! (`{"gesture": "begin" | "move" | "end", ...}`) or a simulator input
//! (`{"sim": "tap" | "longPress" | "pan" | "location" | "cacheFailure", ...}`).
//! Replies and events are written to stdout, one per line. Logs go to stderr.

mod input;
mod transport;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use controller::{ConfigError, ControllerConfig, HostChannel, MapController};
use engine::sim::{SimConfig, SimDriver, SimEngine};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::input::{Inbound, rejection};
use crate::transport::{LineHost, write_lines};

#[derive(Parser, Debug)]
#[command(author, version, about = "JSON-lines bridge for one simulated map controller")]
struct Args {
    /// Controller config as JSON; flags below override its fields.
    #[arg(long, env = "MAP_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Initial style: URL, file path, asset path or inline JSON.
    #[arg(long, env = "MAP_BRIDGE_STYLE")]
    style: Option<String>,

    #[arg(long, env = "MAP_BRIDGE_PIXEL_RATIO")]
    pixel_ratio: Option<f64>,

    /// Device language for `map#matchMapLanguageWithDeviceDefault`.
    #[arg(long, env = "MAP_BRIDGE_LOCALE")]
    locale: Option<String>,

    #[arg(long, env = "MAP_BRIDGE_HIT_RADIUS")]
    hit_radius: Option<f64>,

    /// Disable feature dragging.
    #[arg(long)]
    no_drag: bool,

    /// Viewport width in device pixels.
    #[arg(long, env = "MAP_BRIDGE_WIDTH", default_value_t = 1080.0)]
    width: f64,

    /// Viewport height in device pixels.
    #[arg(long, env = "MAP_BRIDGE_HEIGHT", default_value_t = 1920.0)]
    height: f64,

    /// Simulated frame interval. Style loads complete and animations advance
    /// once per frame.
    #[arg(long, env = "MAP_BRIDGE_FRAME_MS", default_value_t = 16)]
    frame_ms: u64,
}

#[derive(Debug, Error)]
enum BridgeError {
    #[error("cannot read config {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("frame interval must be positive")]
    FrameInterval,
}

impl Args {
    fn controller_config(&self) -> Result<ControllerConfig, BridgeError> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| BridgeError::ReadConfig {
                    path: path.clone(),
                    source,
                })?;
                ControllerConfig::from_json(&text)?
            }
            None => ControllerConfig::default(),
        };
        if let Some(style) = &self.style {
            config.initial_style = style.clone();
        }
        if let Some(ratio) = self.pixel_ratio {
            config.pixel_ratio = ratio;
        }
        if let Some(locale) = &self.locale {
            config.locale = locale.clone();
        }
        if let Some(radius) = self.hit_radius {
            config.hit_radius_px = radius;
        }
        if self.no_drag {
            config.drag_enabled = false;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "bridge failed to start");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), BridgeError> {
    if args.frame_ms == 0 {
        return Err(BridgeError::FrameInterval);
    }
    let config = args.controller_config()?;
    let (engine, driver) = SimEngine::new(SimConfig {
        viewport: (args.width, args.height),
        ..SimConfig::default()
    });

    let (host, lines_out) = LineHost::new();
    let host = Arc::new(host);
    let writer = tokio::spawn(write_lines(lines_out, tokio::io::stdout()));
    let mut controller = MapController::new(config, Box::new(engine), host.clone())?;
    info!(phase = ?controller.phase(), "controller started");

    let wake = Arc::new(Notify::new());
    let notify = Arc::clone(&wake);
    controller.set_waker(Arc::new(move || notify.notify_one()));

    let frame = Duration::from_millis(args.frame_ms);
    let mut frames = tokio::time::interval(frame);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = stdin.next_line() => match line {
                Ok(Some(line)) => handle_line(&mut controller, &driver, &host, &line),
                Ok(None) => {
                    info!("stdin closed");
                    break;
                }
                Err(err) => {
                    warn!(%err, "stdin read failed");
                    break;
                }
            },
            () = wake.notified() => {
                controller.pump();
            }
            _ = frames.tick() => {
                driver.complete_style_loads();
                driver.advance(frame);
                controller.pump();
            }
            _ = &mut shutdown => {
                info!("interrupted");
                break;
            }
        }
    }

    controller.dispose();
    let snapshot = controller.metrics();
    for (name, value) in &snapshot.counters {
        info!(counter = %name, value, "metrics");
    }
    for (name, value) in &snapshot.gauges {
        info!(gauge = %name, value, "metrics");
    }
    drop(controller);
    drop(host);

    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(%err, "stdout closed early"),
        Err(err) => warn!(%err, "writer task failed"),
    }
    Ok(())
}

fn handle_line(controller: &mut MapController, driver: &SimDriver, host: &LineHost, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    match serde_json::from_str::<Inbound>(line) {
        Ok(Inbound::Command(command)) => controller.dispatch(command),
        Ok(Inbound::Gesture(gesture)) => {
            let disposition = gesture.apply(controller);
            debug!(?gesture, ?disposition, "gesture");
        }
        Ok(Inbound::Sim(action)) => {
            action.apply(driver);
            controller.pump();
        }
        Err(err) => match rejection(line) {
            Some(reply) => {
                warn!(id = reply.id, %err, "rejecting malformed command");
                host.reply(reply);
            }
            None => warn!(%err, line, "ignoring malformed input line"),
        },
    }
}
