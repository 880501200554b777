use std::time::Duration;

use codec::MapOptions;
use codec::geo::camera_position_to_json;
use codec::style::style_source;
use codec::value::{as_object, opt_bool, req_f64, req_i64, req_str, require};
use engine::CameraUpdate;
use foundation::{EdgeInsets, LatLng, LatLngBounds};
use serde_json::{Value, json};

use super::Ctx;
use crate::camera::TransitionRequest;
use crate::error::CommandError;
use crate::lifecycle::Requirement;
use crate::router::{Deferred, Outcome, Router};

const CAMERA_BOUNDS_EASE: Duration = Duration::from_millis(200);

pub(super) fn register(router: &mut Router) {
    router.route("map#waitForMap", Requirement::None, wait_for_map);
    router.route("map#update", Requirement::None, update);
    router.route("map#setStyle", Requirement::None, set_style);
    router.route("map#setTelemetryEnabled", Requirement::None, set_telemetry);
    router.route("map#getTelemetryEnabled", Requirement::None, telemetry_enabled);
    router.route("map#invalidateAmbientCache", Requirement::None, invalidate_ambient_cache);
    router.route(
        "map#matchMapLanguageWithDeviceDefault",
        Requirement::Style,
        match_language,
    );
    router.route("map#setMapLanguage", Requirement::Style, set_language);
    router.route("map#updateContentInsets", Requirement::Map, update_content_insets);
    router.route("map#setCameraBounds", Requirement::Map, set_camera_bounds);
}

fn wait_for_map(ctx: &mut Ctx<'_>, _: &Value) -> Result<Outcome, CommandError> {
    if ctx.lifecycle.is_map_ready() {
        return Ok(Outcome::empty());
    }
    Ok(Outcome::Deferred(Deferred::MapReady))
}

/// Applies an options bag. Replies with the camera pose when position
/// tracking is on, `null` otherwise.
fn update(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let mut options = MapOptions::parse(require(args, "options")?, ctx.density())?;
    if let Some(style) = options.style_string.take() {
        ctx.set_style(style_source(&style)?);
    }
    let lifecycle = &*ctx.lifecycle;
    ctx.settings.update(ctx.access.engine(), lifecycle, options);

    if ctx.settings.track_camera_position() && ctx.lifecycle.is_map_ready() {
        let pose = ctx.engine().camera_position();
        return Ok(camera_position_to_json(&pose).into());
    }
    Ok(Outcome::empty())
}

fn set_style(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let source = style_source(req_str(args, "styleString")?)?;
    ctx.set_style(source);
    Ok(Outcome::empty())
}

// Telemetry is not collected; the commands exist for host compatibility.
fn set_telemetry(_: &mut Ctx<'_>, _: &Value) -> Result<Outcome, CommandError> {
    Ok(Outcome::empty())
}

fn telemetry_enabled(_: &mut Ctx<'_>, _: &Value) -> Result<Outcome, CommandError> {
    Ok(json!(false).into())
}

fn invalidate_ambient_cache(_: &mut Ctx<'_>, _: &Value) -> Result<Outcome, CommandError> {
    Ok(Outcome::Deferred(Deferred::AmbientCache))
}

fn match_language(ctx: &mut Ctx<'_>, _: &Value) -> Result<Outcome, CommandError> {
    let locale = ctx.config.locale.clone();
    let language = locale.split(['-', '_']).next().unwrap_or(&locale).to_string();
    ctx.engine().set_language(Some(&language));
    Ok(Outcome::empty())
}

fn set_language(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let language = req_str(args, "language")?;
    ctx.engine().set_language(Some(language));
    Ok(Outcome::empty())
}

fn update_content_insets(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let bounds = require(args, "bounds")?;
    as_object(bounds, "bounds")?;
    let density = ctx.density();
    let side = |name: &str| -> Result<i32, CommandError> {
        Ok((req_f64(bounds, name)? * density) as i32)
    };
    let insets = EdgeInsets::new(side("left")?, side("top")?, side("right")?, side("bottom")?);
    let update = CameraUpdate::PaddingTo(insets);
    let request = if opt_bool(args, "animated")?.unwrap_or(false) {
        TransitionRequest::animate(update, None)
    } else {
        TransitionRequest::jump(update)
    };
    Ok(Outcome::Deferred(Deferred::Transition(request)))
}

fn set_camera_bounds(_: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let bounds = LatLngBounds::from_corners(
        LatLng::new(req_f64(args, "south")?, req_f64(args, "west")?),
        LatLng::new(req_f64(args, "north")?, req_f64(args, "east")?),
    );
    let padding = i32::try_from(req_i64(args, "padding")?).map_err(|_| {
        codec::CodecError::out_of_range("padding", "does not fit in 32 bits")
    })?;
    let update = CameraUpdate::NewLatLngBounds {
        bounds,
        padding: EdgeInsets::uniform(padding),
    };
    Ok(Outcome::Deferred(Deferred::Transition(TransitionRequest::animate(
        update,
        Some(CAMERA_BOUNDS_EASE),
    ))))
}
