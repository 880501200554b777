use serde_json::{Map, Value, json};

use crate::error::EngineError;

/// A GeoJSON feature. Geometry is kept as raw GeoJSON.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<Value>,
    pub properties: Map<String, Value>,
    pub geometry: Value,
}

impl Feature {
    pub fn new(id: impl Into<Value>, geometry: Value) -> Self {
        Self {
            id: Some(id.into()),
            properties: Map::new(),
            geometry,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// `true` only when the `draggable` property is the boolean `true`.
    pub fn is_draggable(&self) -> bool {
        matches!(self.properties.get("draggable"), Some(Value::Bool(true)))
    }

    pub fn from_json(value: &Value) -> Result<Self, EngineError> {
        let obj = value
            .as_object()
            .ok_or_else(|| EngineError::InvalidGeoJson("feature must be an object".into()))?;
        match obj.get("type").and_then(Value::as_str) {
            Some("Feature") => {}
            other => {
                return Err(EngineError::InvalidGeoJson(format!(
                    "expected type Feature, got {other:?}"
                )));
            }
        }
        let properties = match obj.get("properties") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(m)) => m.clone(),
            Some(_) => {
                return Err(EngineError::InvalidGeoJson(
                    "feature properties must be an object".into(),
                ));
            }
        };
        Ok(Self {
            id: obj.get("id").filter(|v| !v.is_null()).cloned(),
            properties,
            geometry: obj.get("geometry").cloned().unwrap_or(Value::Null),
        })
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".into(), json!("Feature"));
        if let Some(id) = &self.id {
            obj.insert("id".into(), id.clone());
        }
        obj.insert("properties".into(), Value::Object(self.properties.clone()));
        obj.insert("geometry".into(), self.geometry.clone());
        Value::Object(obj)
    }

    /// All `[lon, lat]` positions in the geometry, in document order.
    pub fn positions(&self) -> Vec<(f64, f64)> {
        let mut out = Vec::new();
        if let Some(coords) = self.geometry.get("coordinates") {
            collect_positions(coords, &mut out);
        }
        out
    }
}

fn collect_positions(v: &Value, out: &mut Vec<(f64, f64)>) {
    let Some(items) = v.as_array() else {
        return;
    };
    if let [Value::Number(lon), Value::Number(lat), ..] = items.as_slice()
        && let (Some(lon), Some(lat)) = (lon.as_f64(), lat.as_f64())
    {
        out.push((lon, lat));
        return;
    }
    for item in items {
        collect_positions(item, out);
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn from_json(value: &Value) -> Result<Self, EngineError> {
        let obj = value
            .as_object()
            .ok_or_else(|| EngineError::InvalidGeoJson("collection must be an object".into()))?;
        match obj.get("type").and_then(Value::as_str) {
            Some("FeatureCollection") => {}
            // A bare feature is accepted as a one-element collection.
            Some("Feature") => {
                return Ok(Self {
                    features: vec![Feature::from_json(value)?],
                });
            }
            other => {
                return Err(EngineError::InvalidGeoJson(format!(
                    "expected type FeatureCollection, got {other:?}"
                )));
            }
        }
        let features = obj
            .get("features")
            .and_then(Value::as_array)
            .ok_or_else(|| EngineError::InvalidGeoJson("missing features array".into()))?
            .iter()
            .map(Feature::from_json)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { features })
    }

    pub fn parse(text: &str) -> Result<Self, EngineError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| EngineError::InvalidGeoJson(e.to_string()))?;
        Self::from_json(&value)
    }

    pub fn to_json(&self) -> Value {
        json!({
            "type": "FeatureCollection",
            "features": self.features.iter().map(Feature::to_json).collect::<Vec<_>>(),
        })
    }

    /// Replaces the feature whose id equals `feature.id`.
    ///
    /// Returns `false` (and leaves the collection untouched) when no feature
    /// matches or `feature` has no id.
    pub fn replace(&mut self, feature: Feature) -> bool {
        let Some(id) = feature.id.as_ref() else {
            return false;
        };
        match self.features.iter_mut().find(|f| f.id.as_ref() == Some(id)) {
            Some(slot) => {
                *slot = feature;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Feature, FeatureCollection};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_collection_and_draggable_flag() {
        let fc = FeatureCollection::from_json(&json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "id": "a", "properties": {"draggable": true},
                 "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}},
                {"type": "Feature", "id": 7, "properties": {"draggable": "yes"},
                 "geometry": null}
            ]
        }))
        .unwrap();
        assert_eq!(fc.features.len(), 2);
        assert!(fc.features[0].is_draggable());
        assert!(!fc.features[1].is_draggable());
        assert_eq!(fc.features[0].positions(), vec![(1.0, 2.0)]);
    }

    #[test]
    fn rejects_wrong_type() {
        let err = FeatureCollection::from_json(&json!({"type": "Point"})).unwrap_err();
        assert!(err.to_string().contains("FeatureCollection"));
    }

    #[test]
    fn replace_swaps_matching_feature_by_id() {
        let point = json!({"type": "Point", "coordinates": [0.0, 0.0]});
        let mut fc = FeatureCollection {
            features: vec![Feature::new("a", point.clone()), Feature::new("b", point.clone())],
        };
        let moved = Feature::new("b", json!({"type": "Point", "coordinates": [5.0, 5.0]}));
        assert!(fc.replace(moved.clone()));
        assert_eq!(fc.features[1], moved);
        assert!(!fc.replace(Feature::new("zz", point)));
    }

    #[test]
    fn polygon_positions_are_flattened() {
        let f = Feature::new(
            1,
            json!({"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]]}),
        );
        assert_eq!(f.positions(), vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
    }
}
