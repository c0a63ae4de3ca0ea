//! Coordinate extraction from heterogeneous API payloads
//!
//! The heat map and map pin endpoints may answer with keyed rows, positional
//! rows, or a list of plain scalars (a non-coordinate aggregate). Payloads are
//! classified once at the boundary, then mapped to points. Nothing here fails:
//! unusable input yields zero points.

use std::future::Future;

use serde::Serialize;
use serde_json::{Map, Value};

/// Intensity assigned to every point unless configured otherwise
pub const DEFAULT_INTENSITY: f64 = 0.6;

/// Position of latitude in a positional row
pub const LATITUDE_INDEX: usize = 4;

/// Position of longitude in a positional row
pub const LONGITUDE_INDEX: usize = 5;

/// Minimum row width for the positional shape
pub const MIN_POSITIONAL_FIELDS: usize = 5;

/// A weighted coordinate; latitude and longitude are always finite
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoordinatePoint {
    pub latitude: f64,
    pub longitude: f64,
    pub intensity: f64,
}

/// Structural variant of a points payload, decided by its first element
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PayloadShape<'a> {
    /// Objects carrying `latitude` and `longitude` fields
    Keyed(&'a [Value]),
    /// Arrays with latitude at index 4 and longitude at index 5
    Positional(&'a [Value]),
    /// Plain scalars: the backend returned an aggregate, not rows
    Scalars,
    /// Empty array
    Empty,
    /// Anything else
    Unrecognized,
}

impl<'a> PayloadShape<'a> {
    /// Classify a payload
    pub fn classify(payload: &'a Value) -> Self {
        let Some(rows) = payload.as_array() else {
            return PayloadShape::Unrecognized;
        };
        let Some(first) = rows.first() else {
            return PayloadShape::Empty;
        };

        match first {
            Value::Object(fields) if fields.contains_key("latitude") && fields.contains_key("longitude") => {
                PayloadShape::Keyed(rows)
            }
            Value::Array(fields) if fields.len() >= MIN_POSITIONAL_FIELDS => PayloadShape::Positional(rows),
            Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null => PayloadShape::Scalars,
            _ => PayloadShape::Unrecognized,
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            PayloadShape::Keyed(_) => "keyed",
            PayloadShape::Positional(_) => "positional",
            PayloadShape::Scalars => "scalars",
            PayloadShape::Empty => "empty",
            PayloadShape::Unrecognized => "unrecognized",
        }
    }
}

/// Parse a coordinate value; `None` unless it is a finite number
///
/// Numbers are taken as is, strings are parsed after trimming. Blank strings,
/// nulls and any other type are rejected rather than read as zero.
pub fn parse_coordinate(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Latitude/longitude of a keyed row
pub fn keyed_coordinates(fields: &Map<String, Value>) -> Option<(f64, f64)> {
    let latitude = parse_coordinate(fields.get("latitude")?)?;
    let longitude = parse_coordinate(fields.get("longitude")?)?;
    Some((latitude, longitude))
}

/// Latitude/longitude of a positional row
pub fn positional_coordinates(fields: &[Value]) -> Option<(f64, f64)> {
    let latitude = parse_coordinate(fields.get(LATITUDE_INDEX)?)?;
    let longitude = parse_coordinate(fields.get(LONGITUDE_INDEX)?)?;
    Some((latitude, longitude))
}

/// Which payload the points came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PointSource {
    Primary,
    Fallback,
}

/// Points together with their origin
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub points: Vec<CoordinatePoint>,
    pub source: PointSource,
}

/// Resolves payloads into coordinate points
#[derive(Debug, Clone, Copy)]
pub struct PointResolver {
    intensity: f64,
}

impl Default for PointResolver {
    fn default() -> Self {
        Self::new(DEFAULT_INTENSITY)
    }
}

impl PointResolver {
    pub fn new(intensity: f64) -> Self {
        Self { intensity }
    }

    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    /// Extract points from one payload, in input order
    pub fn resolve(&self, payload: &Value) -> Vec<CoordinatePoint> {
        let shape = PayloadShape::classify(payload);

        let coordinates: Vec<(f64, f64)> = match shape {
            PayloadShape::Keyed(rows) => rows
                .iter()
                .filter_map(|row| row.as_object().and_then(keyed_coordinates))
                .collect(),
            PayloadShape::Positional(rows) => rows
                .iter()
                .filter_map(|row| row.as_array().and_then(|fields| positional_coordinates(fields)))
                .collect(),
            PayloadShape::Scalars | PayloadShape::Empty | PayloadShape::Unrecognized => Vec::new(),
        };

        tracing::debug!("Resolved {} points from {} payload", coordinates.len(), shape.name());

        coordinates
            .into_iter()
            .map(|(latitude, longitude)| CoordinatePoint {
                latitude,
                longitude,
                intensity: self.intensity,
            })
            .collect()
    }

    /// Resolve the primary payload, falling back to a second source if empty
    ///
    /// `fallback` is only invoked when the primary payload yields no usable
    /// point. Its failure is returned to the caller.
    pub async fn resolve_with_fallback<F, Fut, E>(&self, primary: &Value, fallback: F) -> Result<Resolution, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        let points = self.resolve(primary);
        if !points.is_empty() {
            return Ok(Resolution {
                points,
                source: PointSource::Primary,
            });
        }

        tracing::info!("Primary payload had no coordinates, using fallback source");
        let secondary = fallback().await?;
        Ok(Resolution {
            points: self.resolve(&secondary),
            source: PointSource::Fallback,
        })
    }
}
