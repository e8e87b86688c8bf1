//! Per-feature statistic records read from feature properties.

use std::fmt;

use foundation::math::LngLat;
use serde_json::Value;

use crate::geojson::{Feature, FeatureCollection};

pub const CENTROID_PROPERTY: &str = "centroid";
pub const DISPLAY_PROPERTY: &str = "r_coi_nat";
pub const STAT_PROPERTY: &str = "fraction_nonwhite";

/// Display-only scalar: shown verbatim, never used in computation.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayValue::Number(n) => write!(f, "{n}"),
            DisplayValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureError {
    MissingProperty { name: &'static str },
    InvalidCentroid { reason: String },
    NotANumber { name: &'static str, found: String },
    InvalidDisplayValue { found: String },
}

impl fmt::Display for FeatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureError::MissingProperty { name } => write!(f, "missing property {name:?}"),
            FeatureError::InvalidCentroid { reason } => write!(f, "invalid centroid: {reason}"),
            FeatureError::NotANumber { name, found } => {
                write!(f, "property {name:?} must be a number, found {found}")
            }
            FeatureError::InvalidDisplayValue { found } => {
                write!(f, "property {DISPLAY_PROPERTY:?} must be a number or string, found {found}")
            }
        }
    }
}

impl std::error::Error for FeatureError {}

/// One feature's statistics, validated and immutable after load.
#[derive(Debug, Clone, PartialEq)]
pub struct StatFeature {
    /// Position in the source collection.
    pub index: usize,
    pub centroid: LngLat,
    pub display: DisplayValue,
    /// Nominally 0-100; consumers clamp.
    pub fraction_nonwhite: f64,
}

impl StatFeature {
    pub fn from_feature(index: usize, feature: &Feature) -> Result<Self, FeatureError> {
        let centroid = parse_centroid(required(feature, CENTROID_PROPERTY)?)?;
        let display = parse_display(required(feature, DISPLAY_PROPERTY)?)?;
        let fraction_nonwhite = match required(feature, STAT_PROPERTY)? {
            Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
            _ => None,
        }
        .ok_or_else(|| FeatureError::NotANumber {
            name: STAT_PROPERTY,
            found: describe(feature.property(STAT_PROPERTY)),
        })?;

        Ok(Self {
            index,
            centroid,
            display,
            fraction_nonwhite,
        })
    }
}

/// One result per feature, in collection order.
pub fn stat_features(collection: &FeatureCollection) -> Vec<Result<StatFeature, FeatureError>> {
    collection
        .features
        .iter()
        .enumerate()
        .map(|(index, feature)| StatFeature::from_feature(index, feature))
        .collect()
}

fn required<'a>(feature: &'a Feature, name: &'static str) -> Result<&'a Value, FeatureError> {
    match feature.property(name) {
        None | Some(Value::Null) => Err(FeatureError::MissingProperty { name }),
        Some(v) => Ok(v),
    }
}

fn parse_centroid(value: &Value) -> Result<LngLat, FeatureError> {
    let arr = value.as_array().ok_or_else(|| FeatureError::InvalidCentroid {
        reason: format!("expected [lon, lat], found {}", describe(Some(value))),
    })?;
    let [lng, lat, ..] = arr.as_slice() else {
        return Err(FeatureError::InvalidCentroid {
            reason: format!("expected [lon, lat], found {} values", arr.len()),
        });
    };
    let (Some(lng), Some(lat)) = (lng.as_f64(), lat.as_f64()) else {
        return Err(FeatureError::InvalidCentroid {
            reason: "coordinates must be numbers".to_string(),
        });
    };

    let centroid = LngLat::new(lng, lat);
    if !centroid.is_projectable() {
        return Err(FeatureError::InvalidCentroid {
            reason: format!("latitude {lat} is outside the mercator range"),
        });
    }
    Ok(centroid)
}

fn parse_display(value: &Value) -> Result<DisplayValue, FeatureError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(DisplayValue::Number)
            .ok_or_else(|| FeatureError::InvalidDisplayValue { found: n.to_string() }),
        Value::String(s) => Ok(DisplayValue::Text(s.clone())),
        other => Err(FeatureError::InvalidDisplayValue {
            found: describe(Some(other)),
        }),
    }
}

fn describe(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(_)) => "a boolean".to_string(),
        Some(Value::Number(n)) => format!("number {n}"),
        Some(Value::String(s)) => format!("string {s:?}"),
        Some(Value::Array(a)) => format!("an array of {}", a.len()),
        Some(Value::Object(_)) => "an object".to_string(),
    }
}
