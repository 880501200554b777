use foundation::LatLngQuad;
use serde_json::{Map, Value};

use crate::feature::FeatureCollection;

/// Where a style document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleSource {
    /// Inline style JSON.
    Json(String),
    /// `http(s)://`, `mapbox://` or `file://` URI.
    Uri(String),
    /// Application asset resolved by the embedding host.
    Asset(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Symbol,
    Line,
    Fill,
    FillExtrusion,
    Circle,
    Heatmap,
    Raster,
    Hillshade,
    Background,
}

impl LayerKind {
    pub fn supports_filter(self) -> bool {
        matches!(
            self,
            Self::Symbol
                | Self::Line
                | Self::Fill
                | Self::FillExtrusion
                | Self::Circle
                | Self::Heatmap
        )
    }

    /// Style-spec `type` string.
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "symbol" => Self::Symbol,
            "line" => Self::Line,
            "fill" => Self::Fill,
            "fill-extrusion" => Self::FillExtrusion,
            "circle" => Self::Circle,
            "heatmap" => Self::Heatmap,
            "raster" => Self::Raster,
            "hillshade" => Self::Hillshade,
            "background" => Self::Background,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub id: String,
    pub source: String,
    pub kind: LayerKind,
    pub source_layer: Option<String>,
    pub min_zoom: Option<f64>,
    pub max_zoom: Option<f64>,
    pub filter: Option<Value>,
    pub properties: Map<String, Value>,
}

impl LayerSpec {
    pub fn new(id: impl Into<String>, source: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            kind,
            source_layer: None,
            min_zoom: None,
            max_zoom: None,
            filter: None,
            properties: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TileSet {
    pub tiles: Vec<String>,
    /// `[west, south, east, north]`.
    pub bounds: Option<[f64; 4]>,
    pub scheme: Option<String>,
    pub min_zoom: Option<f64>,
    pub max_zoom: Option<f64>,
    pub attribution: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TileSource {
    Url(String),
    TileSet(TileSet),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeoJsonOptions {
    pub buffer: Option<i64>,
    pub cluster: Option<bool>,
    pub cluster_max_zoom: Option<i64>,
    pub cluster_radius: Option<i64>,
    pub line_metrics: Option<bool>,
    pub max_zoom: Option<i64>,
    pub min_zoom: Option<i64>,
    pub tolerance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeoJsonData {
    Uri(String),
    Inline(FeatureCollection),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImageContent {
    Url(String),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceSpec {
    Vector(TileSource),
    Raster {
        tiles: TileSource,
        tile_size: Option<u32>,
    },
    RasterDem(TileSource),
    Image {
        coordinates: LatLngQuad,
        content: ImageContent,
    },
    GeoJson {
        data: GeoJsonData,
        options: GeoJsonOptions,
    },
}

/// Raw image bytes registered with the style. Decoding is the engine's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub sdf: bool,
}

#[cfg(test)]
mod tests {
    use super::LayerKind;

    #[test]
    fn raster_like_layers_reject_filters() {
        assert!(LayerKind::Circle.supports_filter());
        assert!(LayerKind::Heatmap.supports_filter());
        assert!(!LayerKind::Raster.supports_filter());
        assert!(!LayerKind::Hillshade.supports_filter());
        assert_eq!(LayerKind::parse("fill-extrusion"), Some(LayerKind::FillExtrusion));
        assert_eq!(LayerKind::parse("sky"), None);
    }
}
