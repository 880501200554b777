use codec::style::{filter_expression, layer_spec};
use codec::value::{opt_bool, opt_f64, opt_str, req_bool, req_str};
use engine::{EngineError, LayerKind, LayerSpec};
use serde_json::{Value, json};

use super::Ctx;
use crate::error::{CommandError, ErrorKind};
use crate::lifecycle::Requirement;
use crate::router::{Outcome, Router};

pub(super) fn register(router: &mut Router) {
    router.route("symbolLayer#add", Requirement::Style, add_symbol_layer);
    router.route("lineLayer#add", Requirement::Style, add_line_layer);
    router.route("fillLayer#add", Requirement::Style, add_fill_layer);
    router.route("circleLayer#add", Requirement::Style, add_circle_layer);
    router.route("rasterLayer#add", Requirement::Style, add_raster_layer);
    router.route("hillshadeLayer#add", Requirement::Style, add_hillshade_layer);
    router.route("layer#setVisibility", Requirement::Style, set_visibility);
    router.route("style#addLayer", Requirement::Style, add_image_layer);
    router.route("style#addLayerBelow", Requirement::Style, add_image_layer);
    router.route("style#removeLayer", Requirement::Style, remove_layer);
    router.route("style#setFilter", Requirement::Style, set_filter);
    router.route("style#getFilter", Requirement::Style, get_filter);
    router.route("style#getLayerIds", Requirement::Style, layer_ids);
}

fn add_symbol_layer(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    add_layer(ctx, args, LayerKind::Symbol)
}

fn add_line_layer(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    add_layer(ctx, args, LayerKind::Line)
}

fn add_fill_layer(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    add_layer(ctx, args, LayerKind::Fill)
}

fn add_circle_layer(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    add_layer(ctx, args, LayerKind::Circle)
}

fn add_raster_layer(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    add_layer(ctx, args, LayerKind::Raster)
}

fn add_hillshade_layer(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    add_layer(ctx, args, LayerKind::Hillshade)
}

/// Shared `*Layer#add` path. Only feature layers can opt into interaction.
fn add_layer(ctx: &mut Ctx<'_>, args: &Value, kind: LayerKind) -> Result<Outcome, CommandError> {
    let spec = layer_spec(args, kind)?;
    let below = opt_str(args, "belowLayerId")?;
    let interactive =
        kind.supports_filter() && opt_bool(args, "enableInteraction")?.unwrap_or(false);
    let id = spec.id.clone();
    ctx.engine().add_layer(spec, below)?;
    if interactive {
        ctx.interactive.insert(id);
    }
    Ok(Outcome::empty())
}

/// `style#addLayer` / `style#addLayerBelow`: a raster layer over an image
/// source.
fn add_image_layer(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let mut spec = LayerSpec::new(
        req_str(args, "imageLayerId")?,
        req_str(args, "imageSourceId")?,
        LayerKind::Raster,
    );
    spec.min_zoom = opt_f64(args, "minzoom")?;
    spec.max_zoom = opt_f64(args, "maxzoom")?;
    let below = opt_str(args, "belowLayerId")?;
    ctx.engine().add_layer(spec, below)?;
    Ok(Outcome::empty())
}

fn remove_layer(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let id = req_str(args, "layerId")?;
    ctx.engine().remove_layer(id)?;
    ctx.interactive.remove(id);
    Ok(Outcome::empty())
}

fn set_visibility(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let id = req_str(args, "layerId")?;
    let visible = req_bool(args, "visible")?;
    ctx.engine().set_layer_visibility(id, visible)?;
    Ok(Outcome::empty())
}

fn filterable(ctx: &mut Ctx<'_>, id: &str) -> Result<(), CommandError> {
    let kind = ctx
        .engine()
        .layer_kind(id)
        .ok_or_else(|| EngineError::LayerNotFound(id.to_string()))?;
    if !kind.supports_filter() {
        return Err(CommandError::new(
            ErrorKind::UnsupportedLayerOperation,
            format!("layer '{id}' of kind {kind:?} does not support filters"),
        ));
    }
    Ok(())
}

fn set_filter(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let id = req_str(args, "layerId")?;
    let filter = filter_expression(Some(req_str(args, "filter")?), "filter")?;
    filterable(ctx, id)?;
    ctx.engine().set_layer_filter(id, filter)?;
    Ok(Outcome::empty())
}

fn get_filter(ctx: &mut Ctx<'_>, args: &Value) -> Result<Outcome, CommandError> {
    let id = req_str(args, "layerId")?;
    filterable(ctx, id)?;
    let filter = ctx.engine().layer_filter(id)?;
    Ok(json!({"filter": filter}).into())
}

fn layer_ids(ctx: &mut Ctx<'_>, _: &Value) -> Result<Outcome, CommandError> {
    Ok(json!({"layers": ctx.engine().layer_ids()}).into())
}
