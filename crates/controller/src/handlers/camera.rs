use std::time::Duration;

use codec::value::{opt_i64, require};
use codec::{CameraCommand, CodecError, camera_command};
use serde_json::{Value, json};

use super::Ctx;
use crate::camera::TransitionRequest;
use crate::error::CommandError;
use crate::lifecycle::Requirement;
use crate::router::{Deferred, Outcome, Router};

pub(super) fn register(router: &mut Router) {
    router.route("camera#move", Requirement::Map, move_camera);
    router.route("camera#animate", Requirement::Map, animate_camera);
}

fn move_camera(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    match camera_command(require(args, "cameraUpdate")?, ctx.density())? {
        CameraCommand::ScrollBy { dx, dy } => scroll(ctx, dx, dy),
        CameraCommand::Update(update) => Ok(Outcome::Deferred(Deferred::Transition(
            TransitionRequest::jump(update),
        ))),
    }
}

fn animate_camera(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let command = camera_command(require(args, "cameraUpdate")?, ctx.density())?;
    let duration = opt_i64(args, "duration")?
        .map(|ms| {
            u64::try_from(ms)
                .map(Duration::from_millis)
                .map_err(|_| CodecError::out_of_range("duration", format!("{ms} ms")))
        })
        .transpose()?;
    match command {
        CameraCommand::ScrollBy { dx, dy } => scroll(ctx, dx, dy),
        CameraCommand::Update(update) => Ok(Outcome::Deferred(Deferred::Transition(
            TransitionRequest::animate(update, duration),
        ))),
    }
}

/// Immediate pan outside the arbiter. No engine callback is involved.
fn scroll(ctx: &mut Ctx<'_>, dx: f64, dy: f64) -> Result<Outcome, CommandError> {
    ctx.engine().scroll_by(dx, dy);
    Ok(json!(true).into())
}
