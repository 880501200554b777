//! Style strings, source and layer properties, filters and image payloads.

use base64::Engine as _;
use engine::{
    Feature, FeatureCollection, GeoJsonData, GeoJsonOptions, ImageContent, LayerKind, LayerSpec,
    SourceSpec, StyleSource, TileSet, TileSource,
};
use foundation::LatLngQuad;
use serde_json::{Map, Value};

use crate::error::CodecError;
use crate::geo::{lat_lng_list, lng_lat_list};
use crate::value::{
    as_array, as_f64, as_i64, as_object, opt_bool, opt_f64, opt_i64, opt_str, optional, req_str,
    require,
};

/// Classifies a style string by its leading characters.
pub fn style_source(text: &str) -> Result<StyleSource, CodecError> {
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return Err(CodecError::out_of_range("styleString", "must not be empty"));
    }
    Ok(if trimmed.starts_with('{') || trimmed.starts_with('[') {
        StyleSource::Json(text.to_string())
    } else if text.starts_with('/') {
        StyleSource::Uri(format!("file://{text}"))
    } else if ["http://", "https://", "mapbox://"]
        .iter()
        .any(|scheme| text.starts_with(scheme))
    {
        StyleSource::Uri(text.to_string())
    } else {
        StyleSource::Asset(text.to_string())
    })
}

fn tile_set(props: &Value) -> Result<Option<TileSet>, CodecError> {
    let Some(tiles) = optional(props, "tiles") else {
        return Ok(None);
    };
    let tiles = as_array(tiles, "tiles")?
        .iter()
        .map(|t| {
            t.as_str()
                .map(str::to_string)
                .ok_or_else(|| CodecError::wrong_type("tiles", "a list of strings"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let bounds = optional(props, "bounds")
        .map(|b| match as_array(b, "bounds")? {
            [w, s, e, n] => Ok([
                as_f64(w, "bounds")?,
                as_f64(s, "bounds")?,
                as_f64(e, "bounds")?,
                as_f64(n, "bounds")?,
            ]),
            _ => Err(CodecError::wrong_type("bounds", "[west, south, east, north]")),
        })
        .transpose()?;
    Ok(Some(TileSet {
        tiles,
        bounds,
        scheme: opt_str(props, "scheme")?.map(str::to_string),
        min_zoom: opt_f64(props, "minzoom")?,
        max_zoom: opt_f64(props, "maxzoom")?,
        attribution: opt_str(props, "attribution")?.map(str::to_string),
    }))
}

/// `url` wins over an inline tile set.
fn tile_source(props: &Value) -> Result<TileSource, CodecError> {
    if let Some(url) = opt_str(props, "url")? {
        return Ok(TileSource::Url(url.to_string()));
    }
    tile_set(props)?
        .map(TileSource::TileSet)
        .ok_or_else(|| CodecError::Missing("url".into()))
}

fn geojson_options(props: &Value) -> Result<GeoJsonOptions, CodecError> {
    Ok(GeoJsonOptions {
        buffer: opt_i64(props, "buffer")?,
        cluster: opt_bool(props, "cluster")?,
        cluster_max_zoom: opt_i64(props, "clusterMaxZoom")?,
        cluster_radius: opt_i64(props, "clusterRadius")?,
        line_metrics: opt_bool(props, "lineMetrics")?,
        max_zoom: opt_i64(props, "maxZoom")?,
        min_zoom: opt_i64(props, "minZoom")?,
        tolerance: opt_f64(props, "tolerance")?,
    })
}

pub fn quad(corners: Vec<foundation::LatLng>, field: &str) -> Result<LatLngQuad, CodecError> {
    let corners: [foundation::LatLng; 4] = corners
        .try_into()
        .map_err(|_| CodecError::wrong_type(field, "four corner coordinates"))?;
    Ok(LatLngQuad { corners })
}

/// Source properties for `style#addSource`, keyed by the style-spec `type`.
pub fn source_spec(props: &Value) -> Result<SourceSpec, CodecError> {
    as_object(props, "properties")?;
    let kind = req_str(props, "type")?;
    Ok(match kind {
        "vector" => SourceSpec::Vector(tile_source(props)?),
        "raster" => SourceSpec::Raster {
            tiles: tile_source(props)?,
            tile_size: opt_i64(props, "tileSize")?
                .map(|s| {
                    u32::try_from(s).map_err(|_| CodecError::out_of_range("tileSize", s.to_string()))
                })
                .transpose()?,
        },
        "raster-dem" => SourceSpec::RasterDem(tile_source(props)?),
        "image" => SourceSpec::Image {
            coordinates: quad(
                lng_lat_list(require(props, "coordinates")?, "coordinates")?,
                "coordinates",
            )?,
            content: ImageContent::Url(req_str(props, "url")?.to_string()),
        },
        "geojson" => SourceSpec::GeoJson {
            data: match require(props, "data")? {
                Value::String(uri) => GeoJsonData::Uri(uri.clone()),
                inline => GeoJsonData::Inline(
                    FeatureCollection::from_json(inline)
                        .map_err(|e| CodecError::invalid("data", e))?,
                ),
            },
            options: geojson_options(props)?,
        },
        other => {
            return Err(CodecError::out_of_range(
                "type",
                format!("unknown source type '{other}'"),
            ));
        }
    })
}

/// Image source corners for `style#addImageSource`, given as `[lat, lng]`.
pub fn image_source_corners(v: &Value) -> Result<LatLngQuad, CodecError> {
    quad(lat_lng_list(v, "coordinates")?, "coordinates")
}

/// Layer paint/layout properties. String values holding JSON (expressions,
/// arrays, numbers) are decoded; other strings are kept as literals.
pub fn layer_properties(v: Option<&Value>) -> Result<Map<String, Value>, CodecError> {
    let Some(v) = v.filter(|v| !v.is_null()) else {
        return Ok(Map::new());
    };
    Ok(as_object(v, "properties")?
        .iter()
        .map(|(key, value)| {
            let decoded = match value {
                Value::String(text) => {
                    serde_json::from_str::<Value>(text).unwrap_or_else(|_| value.clone())
                }
                other => other.clone(),
            };
            (key.clone(), decoded)
        })
        .collect())
}

/// A filter passed as JSON text. Absent and the literal `null` both mean
/// "no filter".
pub fn filter_expression(text: Option<&str>, field: &str) -> Result<Option<Value>, CodecError> {
    let Some(text) = text else {
        return Ok(None);
    };
    let value: Value = serde_json::from_str(text).map_err(|e| CodecError::invalid(field, e))?;
    match value {
        Value::Null => Ok(None),
        Value::Array(_) | Value::Bool(_) => Ok(Some(value)),
        _ => Err(CodecError::wrong_type(field, "a filter expression")),
    }
}

/// A filter passed as an already-structured list.
pub fn filter_value(args: &Value, field: &str) -> Result<Option<Value>, CodecError> {
    match optional(args, field) {
        None => Ok(None),
        Some(v @ Value::Array(_)) => Ok(Some(v.clone())),
        Some(Value::String(text)) => filter_expression(Some(text), field),
        Some(_) => Err(CodecError::wrong_type(field, "a filter expression")),
    }
}

/// Image bytes, given either as a list of byte values or as base64 text.
/// When `length` is given the payload is truncated to it.
pub fn image_bytes(v: &Value, field: &str, length: Option<i64>) -> Result<Vec<u8>, CodecError> {
    let mut bytes = match v {
        Value::String(text) => base64::engine::general_purpose::STANDARD
            .decode(text)
            .map_err(|e| CodecError::invalid(field, e))?,
        Value::Array(items) => items
            .iter()
            .map(|b| {
                let n = as_i64(b, field)?;
                u8::try_from(n)
                    .map_err(|_| CodecError::out_of_range(field, format!("{n} is not a byte")))
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(CodecError::wrong_type(field, "bytes")),
    };
    if let Some(length) = length {
        let length = usize::try_from(length)
            .map_err(|_| CodecError::out_of_range("length", length.to_string()))?;
        if length > bytes.len() {
            return Err(CodecError::out_of_range(
                "length",
                format!("{length} exceeds {} available bytes", bytes.len()),
            ));
        }
        bytes.truncate(length);
    }
    Ok(bytes)
}

pub fn feature_collection(text: &str, field: &str) -> Result<FeatureCollection, CodecError> {
    FeatureCollection::parse(text).map_err(|e| CodecError::invalid(field, e))
}

pub fn feature(text: &str, field: &str) -> Result<Feature, CodecError> {
    let value: Value = serde_json::from_str(text).map_err(|e| CodecError::invalid(field, e))?;
    Feature::from_json(&value).map_err(|e| CodecError::invalid(field, e))
}

/// Arguments shared by the `*Layer#add` commands.
pub fn layer_spec(args: &Value, kind: LayerKind) -> Result<LayerSpec, CodecError> {
    let mut spec = LayerSpec::new(req_str(args, "layerId")?, req_str(args, "sourceId")?, kind);
    spec.source_layer = opt_str(args, "sourceLayer")?.map(str::to_string);
    spec.min_zoom = opt_f64(args, "minzoom")?;
    spec.max_zoom = opt_f64(args, "maxzoom")?;
    if kind.supports_filter() {
        spec.filter = filter_expression(opt_str(args, "filter")?, "filter")?;
    }
    spec.properties = layer_properties(optional(args, "properties"))?;
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::{
        filter_expression, image_bytes, layer_properties, layer_spec, source_spec, style_source,
    };
    use crate::error::CodecError;
    use engine::{GeoJsonData, ImageContent, LayerKind, SourceSpec, StyleSource, TileSource};
    use foundation::LatLng;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn style_strings_are_classified_by_prefix() {
        assert_eq!(
            style_source("{\"version\": 8}").unwrap(),
            StyleSource::Json("{\"version\": 8}".into())
        );
        assert_eq!(
            style_source("/sdcard/style.json").unwrap(),
            StyleSource::Uri("file:///sdcard/style.json".into())
        );
        assert_eq!(
            style_source("mapbox://styles/x").unwrap(),
            StyleSource::Uri("mapbox://styles/x".into())
        );
        assert_eq!(
            style_source("assets/style.json").unwrap(),
            StyleSource::Asset("assets/style.json".into())
        );
        assert!(style_source("").is_err());
    }

    #[test]
    fn vector_source_prefers_url() {
        let spec = source_spec(&json!({
            "type": "vector",
            "url": "https://tiles/x.json",
            "tiles": ["https://tiles/{z}/{x}/{y}.pbf"]
        }))
        .unwrap();
        assert_eq!(spec, SourceSpec::Vector(TileSource::Url("https://tiles/x.json".into())));
    }

    #[test]
    fn raster_tile_set_carries_options() {
        let spec = source_spec(&json!({
            "type": "raster",
            "tiles": ["https://t/{z}/{x}/{y}.png"],
            "bounds": [-10.0, -5.0, 10.0, 5.0],
            "maxzoom": 14,
            "tileSize": 256
        }))
        .unwrap();
        let SourceSpec::Raster { tiles: TileSource::TileSet(set), tile_size } = spec else {
            panic!("unexpected {spec:?}");
        };
        assert_eq!(tile_size, Some(256));
        assert_eq!(set.bounds, Some([-10.0, -5.0, 10.0, 5.0]));
        assert_eq!(set.max_zoom, Some(14.0));
    }

    #[test]
    fn image_source_corners_are_lng_lat() {
        let spec = source_spec(&json!({
            "type": "image",
            "url": "https://img/a.png",
            "coordinates": [[1.0, 2.0], [3.0, 2.0], [3.0, 0.0], [1.0, 0.0]]
        }))
        .unwrap();
        let SourceSpec::Image { coordinates, content } = spec else {
            panic!("unexpected {spec:?}");
        };
        assert_eq!(coordinates.corners[0], LatLng::new(2.0, 1.0));
        assert_eq!(content, ImageContent::Url("https://img/a.png".into()));
    }

    #[test]
    fn geojson_source_accepts_uri_or_inline() {
        let uri = source_spec(&json!({"type": "geojson", "data": "https://x/y.geojson"})).unwrap();
        assert!(matches!(uri, SourceSpec::GeoJson { data: GeoJsonData::Uri(_), .. }));
        let inline = source_spec(&json!({
            "type": "geojson",
            "data": {"type": "FeatureCollection", "features": []},
            "cluster": true
        }))
        .unwrap();
        let SourceSpec::GeoJson { options, .. } = inline else {
            panic!("unexpected {inline:?}");
        };
        assert_eq!(options.cluster, Some(true));
    }

    #[test]
    fn unknown_source_type_is_rejected() {
        let err = source_spec(&json!({"type": "video"})).unwrap_err();
        assert_eq!(err.field(), Some("type"));
    }

    #[test]
    fn filters_parse_from_text() {
        assert_eq!(filter_expression(None, "filter"), Ok(None));
        assert_eq!(filter_expression(Some("null"), "filter"), Ok(None));
        assert_eq!(
            filter_expression(Some(r#"["==", "kind", "cafe"]"#), "filter"),
            Ok(Some(json!(["==", "kind", "cafe"])))
        );
        assert!(matches!(
            filter_expression(Some("[oops"), "filter"),
            Err(CodecError::InvalidJson { .. })
        ));
    }

    #[test]
    fn layer_property_strings_are_decoded() {
        let props = layer_properties(Some(&json!({
            "circle-radius": "5",
            "circle-color": "red",
            "circle-opacity": ["get", "o"]
        })))
        .unwrap();
        assert_eq!(props["circle-radius"], json!(5));
        assert_eq!(props["circle-color"], json!("red"));
        assert_eq!(props["circle-opacity"], json!(["get", "o"]));
    }

    #[test]
    fn layer_spec_ignores_filter_for_raster() {
        let args = json!({"layerId": "r", "sourceId": "s", "filter": "[\"has\", \"x\"]"});
        assert_eq!(layer_spec(&args, LayerKind::Raster).unwrap().filter, None);
        assert!(layer_spec(&args, LayerKind::Fill).unwrap().filter.is_some());
    }

    #[test]
    fn image_bytes_from_list_or_base64() {
        assert_eq!(image_bytes(&json!([1, 2, 3, 4]), "bytes", Some(2)).unwrap(), vec![1, 2]);
        assert_eq!(image_bytes(&json!("AQID"), "bytes", None).unwrap(), vec![1, 2, 3]);
        assert!(image_bytes(&json!([300]), "bytes", None).is_err());
        assert!(image_bytes(&json!([1]), "bytes", Some(4)).is_err());
    }
}
