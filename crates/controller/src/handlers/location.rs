use codec::CodecError;
use codec::value::req_i64;
use engine::TrackingMode;
use serde_json::Value;

use super::Ctx;
use crate::error::CommandError;
use crate::lifecycle::Requirement;
use crate::router::{Deferred, Outcome, Router};

pub(super) fn register(router: &mut Router) {
    router.route(
        "map#updateMyLocationTrackingMode",
        Requirement::None,
        update_tracking_mode,
    );
    router.route(
        "locationComponent#getLastLocation",
        Requirement::Style,
        last_location,
    );
}

fn update_tracking_mode(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let code = req_i64(args, "mode")?;
    let mode = TrackingMode::from_code(code)
        .ok_or_else(|| CodecError::out_of_range("mode", format!("{code} not in 0..=3")))?;
    ctx.settings.set_tracking_mode(ctx.access.engine(), mode);
    Ok(Outcome::empty())
}

/// Fails fast while the location component is off; the engine would never
/// answer.
fn last_location(ctx: &mut Ctx<'_>, _: &Value) -> Result<Outcome, CommandError> {
    if !ctx.settings.location_active() {
        return Err(CommandError::engine("the location component is not enabled"));
    }
    Ok(Outcome::Deferred(Deferred::LastLocation))
}
