use foundation::math::LngLat;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

#[derive(Debug)]
pub enum GeoJsonError {
    Parse(serde_json::Error),
    NotAFeatureCollection { found: String },
}

impl std::fmt::Display for GeoJsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeoJsonError::Parse(e) => write!(f, "GeoJSON parse error: {e}"),
            GeoJsonError::NotAFeatureCollection { found } => {
                write!(f, "expected GeoJSON FeatureCollection, found {found:?}")
            }
        }
    }
}

impl std::error::Error for GeoJsonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeoJsonError::Parse(e) => Some(e),
            GeoJsonError::NotAFeatureCollection { .. } => None,
        }
    }
}

/// A `[lon, lat, ...]` position. Extra ordinates (altitude) are dropped.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Vec<f64>")]
pub struct Position(pub LngLat);

impl TryFrom<Vec<f64>> for Position {
    type Error = String;

    fn try_from(v: Vec<f64>) -> Result<Self, Self::Error> {
        match v.as_slice() {
            [lng, lat, ..] => Ok(Position(LngLat::new(*lng, *lat))),
            _ => Err(format!("position needs [lon, lat], got {} values", v.len())),
        }
    }
}

pub type Ring = Vec<Position>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Polygons as lists of rings (outer ring first). Empty for non-areal kinds.
    pub fn polygons(&self) -> Vec<&[Ring]> {
        match self {
            Geometry::Polygon(rings) => vec![rings.as_slice()],
            Geometry::MultiPolygon(polys) => polys.iter().map(|p| p.as_slice()).collect(),
            _ => Vec::new(),
        }
    }
}

/// Geometry as found in the document. One bad geometry must not reject the
/// whole collection, so decoding failures are kept per feature.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum GeometrySlot {
    #[default]
    Missing,
    Valid(Geometry),
    Invalid(String),
}

impl GeometrySlot {
    pub fn geometry(&self) -> Option<&Geometry> {
        match self {
            GeometrySlot::Valid(g) => Some(g),
            _ => None,
        }
    }
}

fn lenient_geometry<'de, D>(deserializer: D) -> Result<GeometrySlot, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => GeometrySlot::Missing,
        Some(v) => match serde_json::from_value::<Geometry>(v) {
            Ok(g) => GeometrySlot::Valid(g),
            Err(e) => GeometrySlot::Invalid(e.to_string()),
        },
    })
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
    #[serde(default, deserialize_with = "lenient_geometry")]
    pub geometry: GeometrySlot,
}

impl Feature {
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.as_ref().and_then(|p| p.get(name))
    }

    /// Numeric property; strings and other JSON types do not coerce.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.property(name)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
    }
}

#[derive(Debug, Deserialize)]
struct RawCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn from_geojson_str(payload: &str) -> Result<Self, GeoJsonError> {
        let raw: RawCollection = serde_json::from_str(payload).map_err(GeoJsonError::Parse)?;
        Self::from_raw(raw)
    }

    pub fn from_geojson_value(value: Value) -> Result<Self, GeoJsonError> {
        let raw: RawCollection = serde_json::from_value(value).map_err(GeoJsonError::Parse)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawCollection) -> Result<Self, GeoJsonError> {
        if raw.kind != "FeatureCollection" {
            return Err(GeoJsonError::NotAFeatureCollection { found: raw.kind });
        }
        let invalid = raw
            .features
            .iter()
            .filter(|f| matches!(f.geometry, GeometrySlot::Invalid(_)))
            .count();
        if invalid > 0 {
            tracing::debug!(invalid, "features with undecodable geometry");
        }
        Ok(Self {
            features: raw.features,
        })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{FeatureCollection, GeoJsonError, Geometry, GeometrySlot};
    use foundation::math::LngLat;

    #[test]
    fn parses_demo_polygons() {
        let payload = include_str!("../../apps/viewer_web/assets/polygons.json");
        let collection = FeatureCollection::from_geojson_str(payload).expect("parse collection");
        assert_eq!(collection.len(), 6);
        for feature in &collection.features {
            let geometry = feature.geometry.geometry().expect("valid geometry");
            assert!(!geometry.polygons().is_empty(), "{} has no rings", geometry.kind());
        }
    }

    #[test]
    fn decodes_adjacently_tagged_geometry() {
        let payload = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"a": 1},
                 "geometry": {"type": "Point", "coordinates": [-71.0, 42.0, 12.0]}},
                {"type": "Feature", "properties": null, "geometry": null}
            ]
        }"#;
        let collection = FeatureCollection::from_geojson_str(payload).expect("parse");
        assert_eq!(
            collection.features[0].geometry,
            GeometrySlot::Valid(Geometry::Point(super::Position(LngLat::new(-71.0, 42.0))))
        );
        assert_eq!(collection.features[0].number("a"), Some(1.0));
        assert_eq!(collection.features[1].geometry, GeometrySlot::Missing);
        assert_eq!(collection.features[1].number("a"), None);
    }

    #[test]
    fn bad_geometry_stays_local_to_its_feature() {
        let payload = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Polygon", "coordinates": [[[0.0]]]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}}
            ]
        }"#;
        let collection = FeatureCollection::from_geojson_str(payload).expect("parse");
        assert!(matches!(collection.features[0].geometry, GeometrySlot::Invalid(_)));
        assert!(matches!(collection.features[1].geometry, GeometrySlot::Valid(_)));
    }

    #[test]
    fn rejects_non_collections() {
        let err = FeatureCollection::from_geojson_str(r#"{"type": "Feature"}"#)
            .expect_err("not a collection");
        assert!(matches!(err, GeoJsonError::NotAFeatureCollection { ref found } if found == "Feature"));

        let err = FeatureCollection::from_geojson_str("[1, 2").expect_err("broken json");
        assert!(matches!(err, GeoJsonError::Parse(_)));
    }
}
