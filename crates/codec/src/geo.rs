//! Coordinates, bounds, pixels and camera poses.
//!
//! Host coordinate pairs are `[lat, lng]`. GeoJSON-style inputs use
//! `[lng, lat]` and go through the `lng_lat*` functions instead.

use foundation::{CameraPosition, CameraSpec, LatLng, LatLngBounds, ScreenPoint};
use serde_json::{Value, json};

use crate::error::CodecError;
use crate::value::{as_array, as_f64, optional};

fn pair(v: &Value, field: &str) -> Result<(f64, f64), CodecError> {
    match as_array(v, field)? {
        [a, b, ..] => Ok((as_f64(a, field)?, as_f64(b, field)?)),
        _ => Err(CodecError::wrong_type(field, "a coordinate pair")),
    }
}

/// `[lat, lng]`.
pub fn lat_lng(v: &Value, field: &str) -> Result<LatLng, CodecError> {
    let (lat, lng) = pair(v, field)?;
    Ok(LatLng::new(lat, lng))
}

/// `[lng, lat]`.
pub fn lng_lat(v: &Value, field: &str) -> Result<LatLng, CodecError> {
    let (lng, lat) = pair(v, field)?;
    Ok(LatLng::from_lon_lat(lng, lat))
}

pub fn lat_lng_list(v: &Value, field: &str) -> Result<Vec<LatLng>, CodecError> {
    as_array(v, field)?.iter().map(|p| lat_lng(p, field)).collect()
}

pub fn lng_lat_list(v: &Value, field: &str) -> Result<Vec<LatLng>, CodecError> {
    as_array(v, field)?.iter().map(|p| lng_lat(p, field)).collect()
}

/// Two opposite `[lat, lng]` corners, in either order.
pub fn bounds(v: &Value, field: &str) -> Result<LatLngBounds, CodecError> {
    match as_array(v, field)? {
        [a, b] => Ok(LatLngBounds::from_corners(lat_lng(a, field)?, lat_lng(b, field)?)),
        _ => Err(CodecError::wrong_type(field, "two corner coordinates")),
    }
}

/// Logical pixels scaled by `density`, truncated to whole device pixels.
pub fn pixels(v: &Value, field: &str, density: f64) -> Result<i32, CodecError> {
    Ok(fractional_pixels(v, field, density)? as i32)
}

pub fn fractional_pixels(v: &Value, field: &str, density: f64) -> Result<f64, CodecError> {
    Ok(as_f64(v, field)? * density)
}

/// `[x, y]` in logical pixels.
pub fn screen_point(v: &Value, field: &str, density: f64) -> Result<ScreenPoint, CodecError> {
    match as_array(v, field)? {
        [x, y, ..] => Ok(ScreenPoint::new(
            f64::from(pixels(x, field, density)?),
            f64::from(pixels(y, field, density)?),
        )),
        _ => Err(CodecError::wrong_type(field, "an [x, y] pair")),
    }
}

/// `{bearing?, target, tilt?, zoom?}`.
pub fn camera_spec(v: &Value, field: &str) -> Result<CameraSpec, CodecError> {
    let target_field = format!("{field}.target");
    let target = match optional(v, "target") {
        Some(t) => lat_lng(t, &target_field)?,
        None => return Err(CodecError::Missing(target_field)),
    };
    let opt = |key: &str| -> Result<Option<f64>, CodecError> {
        optional(v, key)
            .map(|x| as_f64(x, &format!("{field}.{key}")))
            .transpose()
    };
    Ok(CameraSpec {
        target: Some(target),
        zoom: opt("zoom")?,
        bearing: opt("bearing")?,
        tilt: opt("tilt")?,
    })
}

pub fn lat_lng_to_json(p: LatLng) -> Value {
    json!([p.latitude, p.longitude])
}

pub fn camera_position_to_json(pose: &CameraPosition) -> Value {
    json!({
        "bearing": pose.bearing,
        "target": lat_lng_to_json(pose.target),
        "tilt": pose.tilt,
        "zoom": pose.zoom,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        bounds, camera_position_to_json, camera_spec, lat_lng, lng_lat, lng_lat_list, pixels,
        screen_point,
    };
    use crate::error::CodecError;
    use foundation::{CameraPosition, LatLng, ScreenPoint};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn both_pair_orderings_are_distinct() {
        let v = json!([10.0, 20.0]);
        assert_eq!(lat_lng(&v, "p").unwrap(), LatLng::new(10.0, 20.0));
        assert_eq!(lng_lat(&v, "p").unwrap(), LatLng::new(20.0, 10.0));
        let quad = lng_lat_list(&json!([[1.0, 2.0], [3.0, 4.0]]), "c").unwrap();
        assert_eq!(quad[1], LatLng::new(4.0, 3.0));
    }

    #[test]
    fn bounds_accept_any_corner_order() {
        let b = bounds(&json!([[10.0, 20.0], [-10.0, -20.0]]), "b").unwrap();
        assert_eq!(b.south_west, LatLng::new(-10.0, -20.0));
        assert!(bounds(&json!([[1.0, 2.0]]), "b").is_err());
    }

    #[test]
    fn pixels_scale_by_density_and_truncate() {
        assert_eq!(pixels(&json!(10.7), "px", 2.0).unwrap(), 21);
        assert_eq!(
            screen_point(&json!([5, 6]), "focus", 3.0).unwrap(),
            ScreenPoint::new(15.0, 18.0)
        );
    }

    #[test]
    fn camera_spec_requires_target_only() {
        let spec = camera_spec(&json!({"target": [1.0, 2.0], "zoom": 3.0}), "cameraPosition").unwrap();
        assert_eq!(spec.target, Some(LatLng::new(1.0, 2.0)));
        assert_eq!(spec.zoom, Some(3.0));
        assert_eq!(spec.bearing, None);
        assert_eq!(
            camera_spec(&json!({"zoom": 3.0}), "cameraPosition"),
            Err(CodecError::Missing("cameraPosition.target".into()))
        );
    }

    #[test]
    fn camera_position_serializes_target_as_lat_lng() {
        let pose = CameraPosition {
            target: LatLng::new(1.5, -2.5),
            zoom: 4.0,
            bearing: 30.0,
            tilt: 0.0,
        };
        assert_eq!(
            camera_position_to_json(&pose),
            json!({"bearing": 30.0, "target": [1.5, -2.5], "tilt": 0.0, "zoom": 4.0})
        );
    }
}
