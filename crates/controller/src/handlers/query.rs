//! Projection and feature queries. All of them are pure reads of the current
//! camera pose and rendered state.

use codec::geo::lat_lng_to_json;
use codec::style::filter_value;
use codec::value::{as_f64, opt_f64, opt_str, req_array, req_f64, req_str, string_list};
use engine::{Feature, QueryRegion};
use foundation::{LatLng, ScreenPoint, ScreenRect};
use serde_json::{Value, json};

use super::Ctx;
use crate::error::CommandError;
use crate::lifecycle::Requirement;
use crate::router::{Outcome, Router};

pub(super) fn register(router: &mut Router) {
    router.route("map#toScreenLocation", Requirement::Map, to_screen_location);
    router.route("map#toScreenLocationBatch", Requirement::Map, to_screen_location_batch);
    router.route("map#toLatLng", Requirement::Map, to_lat_lng);
    router.route("map#getVisibleRegion", Requirement::Map, visible_region);
    router.route(
        "map#getMetersPerPixelAtLatitude",
        Requirement::Map,
        meters_per_pixel,
    );
    router.route("map#queryRenderedFeatures", Requirement::Map, query_rendered);
    router.route("map#querySourceFeatures", Requirement::Style, query_source);
}

fn to_screen_location(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let at = LatLng::new(req_f64(args, "latitude")?, req_f64(args, "longitude")?);
    let p = ctx.engine().to_screen_location(at);
    Ok(json!({"x": p.x, "y": p.y}).into())
}

/// `coordinates` is a flat `[lat, lng, lat, lng, ...]` list; the reply is a
/// flat `[x, y, x, y, ...]` list.
fn to_screen_location_batch(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let flat = req_array(args, "coordinates")?;
    if flat.len() % 2 != 0 {
        return Err(codec::CodecError::wrong_type("coordinates", "lat/lng pairs").into());
    }
    let engine = ctx.engine();
    let mut out = Vec::with_capacity(flat.len());
    for pair in flat.chunks_exact(2) {
        let at = LatLng::new(
            as_f64(&pair[0], "coordinates")?,
            as_f64(&pair[1], "coordinates")?,
        );
        let p = engine.to_screen_location(at);
        out.push(json!(p.x));
        out.push(json!(p.y));
    }
    Ok(Value::Array(out).into())
}

fn to_lat_lng(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let p = ScreenPoint::new(req_f64(args, "x")?, req_f64(args, "y")?);
    let at = ctx.engine().from_screen_location(p);
    Ok(json!({"latitude": at.latitude, "longitude": at.longitude}).into())
}

fn visible_region(ctx: &mut Ctx<'_>, _: &Value) -> Result<Outcome, CommandError> {
    let quad = ctx.engine().visible_region();
    let [_, top_right, _, bottom_left] = quad.corners;
    Ok(json!({
        "sw": lat_lng_to_json(bottom_left),
        "ne": lat_lng_to_json(top_right),
    })
    .into())
}

fn meters_per_pixel(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let latitude = req_f64(args, "latitude")?;
    let mpp = ctx.engine().meters_per_pixel_at_latitude(latitude);
    Ok(json!({"metersperpixel": mpp}).into())
}

fn query_rendered(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let region = match opt_f64(args, "x")? {
        Some(x) => QueryRegion::Point(ScreenPoint::new(x, req_f64(args, "y")?)),
        None => QueryRegion::Rect(ScreenRect::new(
            req_f64(args, "left")?,
            req_f64(args, "top")?,
            req_f64(args, "right")?,
            req_f64(args, "bottom")?,
        )),
    };
    let layer_ids = string_list(args, "layerIds")?;
    let filter = filter_value(args, "filter")?;
    let features = ctx
        .engine()
        .query_rendered_features(region, &layer_ids, filter.as_ref());
    Ok(features_reply(&features))
}

fn query_source(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let source = req_str(args, "sourceId")?;
    let source_layer = opt_str(args, "sourceLayerId")?;
    let filter = filter_value(args, "filter")?;
    let features = ctx
        .engine()
        .query_source_features(source, source_layer, filter.as_ref())?;
    Ok(features_reply(&features))
}

/// Features are serialized as GeoJSON text, one string per feature.
fn features_reply(features: &[Feature]) -> Outcome {
    let encoded: Vec<Value> = features
        .iter()
        .map(|f| Value::String(f.to_json().to_string()))
        .collect();
    json!({"features": encoded}).into()
}
