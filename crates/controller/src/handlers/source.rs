use codec::style::{feature, feature_collection, image_bytes, image_source_corners, source_spec};
use codec::value::{opt_bool, opt_i64, req_str, require};
use engine::{GeoJsonData, GeoJsonOptions, ImageContent, ImageData, SourceSpec};
use serde_json::Value;

use super::Ctx;
use crate::error::CommandError;
use crate::lifecycle::Requirement;
use crate::router::{Outcome, Router};

pub(super) fn register(router: &mut Router) {
    router.route("source#addGeoJson", Requirement::Style, add_geojson);
    router.route("source#setGeoJson", Requirement::Style, set_geojson);
    router.route("source#setFeature", Requirement::Style, set_feature);
    router.route("style#addSource", Requirement::Style, add_source);
    router.route("style#removeSource", Requirement::Style, remove_source);
    router.route("style#addImageSource", Requirement::Style, add_image_source);
    router.route("style#addImage", Requirement::Style, add_image);
}

fn add_geojson(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let id = req_str(args, "sourceId")?;
    let data = feature_collection(req_str(args, "geojson")?, "geojson")?;
    let spec = SourceSpec::GeoJson {
        data: GeoJsonData::Inline(data.clone()),
        options: GeoJsonOptions::default(),
    };
    ctx.engine().add_source(id, spec)?;
    ctx.geojson.insert(id.to_string(), data);
    Ok(Outcome::empty())
}

fn set_geojson(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let id = req_str(args, "sourceId")?;
    let data = feature_collection(req_str(args, "geojson")?, "geojson")?;
    ctx.engine().set_geojson(id, data.clone())?;
    ctx.geojson.insert(id.to_string(), data);
    Ok(Outcome::empty())
}

/// Replaces one feature, matched by id, in the last collection pushed to the
/// source and pushes the result.
fn set_feature(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let id = req_str(args, "sourceId")?;
    let replacement = feature(req_str(args, "geojsonFeature")?, "geojsonFeature")?;
    let Some(data) = ctx.geojson.get_mut(id) else {
        return Err(CommandError::engine(format!("no GeoJSON data known for source '{id}'")));
    };
    if !data.replace(replacement) {
        tracing::debug!(source = id, "setFeature matched no feature id");
    }
    let data = data.clone();
    ctx.engine().set_geojson(id, data)?;
    Ok(Outcome::empty())
}

fn add_source(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let id = req_str(args, "sourceId")?;
    let spec = source_spec(require(args, "properties")?)?;
    let inline = match &spec {
        SourceSpec::GeoJson {
            data: GeoJsonData::Inline(fc),
            ..
        } => Some(fc.clone()),
        _ => None,
    };
    ctx.engine().add_source(id, spec)?;
    if let Some(fc) = inline {
        ctx.geojson.insert(id.to_string(), fc);
    }
    Ok(Outcome::empty())
}

fn remove_source(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let id = req_str(args, "sourceId")?;
    ctx.engine().remove_source(id)?;
    ctx.geojson.remove(id);
    Ok(Outcome::empty())
}

fn add_image_source(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let id = req_str(args, "imageSourceId")?;
    let coordinates = image_source_corners(require(args, "coordinates")?)?;
    let bytes = image_bytes(require(args, "bytes")?, "bytes", opt_i64(args, "length")?)?;
    let spec = SourceSpec::Image {
        coordinates,
        content: ImageContent::Bytes(bytes),
    };
    ctx.engine().add_source(id, spec)?;
    Ok(Outcome::empty())
}

fn add_image(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let name = req_str(args, "name")?;
    let bytes = image_bytes(require(args, "bytes")?, "bytes", opt_i64(args, "length")?)?;
    let sdf = opt_bool(args, "sdf")?.unwrap_or(false);
    ctx.engine().add_image(name, ImageData { bytes, sdf })?;
    Ok(Outcome::empty())
}
