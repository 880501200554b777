use engine::CameraUpdate;
use foundation::EdgeInsets;
use serde_json::{Map, Value};

use crate::error::CodecError;
use crate::geo::{bounds, camera_spec, fractional_pixels, lat_lng, pixels, screen_point};
use crate::value::{as_f64, as_str};

/// A parsed camera command.
#[derive(Debug, Clone, PartialEq)]
pub enum CameraCommand {
    /// Goes through the camera arbiter.
    Update(CameraUpdate),
    /// Immediate relative pan in device pixels. Never produces a callback.
    ScrollBy { dx: f64, dy: f64 },
}

/// Positional (`["zoomTo", 10]`) or named (`{"type": "zoomTo", "zoom": 10}`)
/// arguments of one camera update.
enum Args<'a> {
    List(&'a [Value]),
    Object(&'a Map<String, Value>),
}

impl<'a> Args<'a> {
    fn get(&self, index: usize, name: &str) -> Option<&'a Value> {
        let v = match self {
            Self::List(items) => items.get(index),
            Self::Object(map) => map.get(name),
        };
        v.filter(|v| !v.is_null())
    }

    fn require(&self, index: usize, name: &str) -> Result<&'a Value, CodecError> {
        self.get(index, name)
            .ok_or_else(|| CodecError::Missing(format!("cameraUpdate.{name}")))
    }

    fn f64(&self, index: usize, name: &str) -> Result<f64, CodecError> {
        as_f64(self.require(index, name)?, &format!("cameraUpdate.{name}"))
    }
}

/// Parses a host camera update. `density` scales pixel arguments.
pub fn camera_command(v: &Value, density: f64) -> Result<CameraCommand, CodecError> {
    let (kind, args) = match v {
        Value::Array(items) => {
            let Some(first) = items.first() else {
                return Err(CodecError::Missing("cameraUpdate.type".into()));
            };
            (as_str(first, "cameraUpdate.type")?, Args::List(items))
        }
        Value::Object(map) => {
            let kind = map
                .get("type")
                .ok_or_else(|| CodecError::Missing("cameraUpdate.type".into()))?;
            (as_str(kind, "cameraUpdate.type")?, Args::Object(map))
        }
        _ => return Err(CodecError::wrong_type("cameraUpdate", "a list or map")),
    };
    let field = |name: &str| format!("cameraUpdate.{name}");

    let update = match kind {
        "newCameraPosition" => CameraUpdate::NewCameraPosition(camera_spec(
            args.require(1, "cameraPosition")?,
            &field("cameraPosition"),
        )?),
        "newLatLng" => {
            CameraUpdate::NewLatLng(lat_lng(args.require(1, "latLng")?, &field("latLng"))?)
        }
        "newLatLngBounds" => {
            let inset = |index, name: &str| pixels(args.require(index, name)?, &field(name), density);
            CameraUpdate::NewLatLngBounds {
                bounds: bounds(args.require(1, "bounds")?, &field("bounds"))?,
                padding: EdgeInsets::new(
                    inset(2, "left")?,
                    inset(3, "top")?,
                    inset(4, "right")?,
                    inset(5, "bottom")?,
                ),
            }
        }
        "newLatLngZoom" => CameraUpdate::NewLatLngZoom {
            target: lat_lng(args.require(1, "latLng")?, &field("latLng"))?,
            zoom: args.f64(2, "zoom")?,
        },
        "scrollBy" => {
            return Ok(CameraCommand::ScrollBy {
                dx: fractional_pixels(args.require(1, "dx")?, &field("dx"), density)?,
                dy: fractional_pixels(args.require(2, "dy")?, &field("dy"), density)?,
            });
        }
        "zoomBy" => CameraUpdate::ZoomBy {
            amount: args.f64(1, "amount")?,
            focus: args
                .get(2, "focus")
                .map(|f| screen_point(f, &field("focus"), density))
                .transpose()?,
        },
        "zoomIn" => CameraUpdate::ZoomIn,
        "zoomOut" => CameraUpdate::ZoomOut,
        "zoomTo" => CameraUpdate::ZoomTo(args.f64(1, "zoom")?),
        "bearingTo" => CameraUpdate::BearingTo(args.f64(1, "bearing")?),
        "tiltTo" => CameraUpdate::TiltTo(args.f64(1, "tilt")?),
        other => return Err(CodecError::UnknownCameraUpdate(other.to_string())),
    };
    Ok(CameraCommand::Update(update))
}
