//! Map pin view

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::geo::{keyed_coordinates, positional_coordinates, PayloadShape};
use crate::{RefreshOutcome, SpaceView, SpaceViewId, ViewStatus, ViewerContext};

/// One marker on the map
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapPin {
    pub id: i64,
    pub complaint_type: String,
    pub descriptor_type: String,
    pub agency_name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl MapPin {
    /// Pin from a `[id, complaint, descriptor, agency, lat, lon]` row
    fn from_positional(fields: &[Value]) -> Option<Self> {
        let (latitude, longitude) = positional_coordinates(fields)?;
        Some(Self {
            id: fields.first().and_then(id_value).unwrap_or_default(),
            complaint_type: fields.get(1).map(text_value).unwrap_or_default(),
            descriptor_type: fields.get(2).map(text_value).unwrap_or_default(),
            agency_name: fields.get(3).map(text_value).unwrap_or_default(),
            latitude,
            longitude,
        })
    }

    /// Pin from a keyed record
    fn from_keyed(fields: &Map<String, Value>) -> Option<Self> {
        let (latitude, longitude) = keyed_coordinates(fields)?;
        let text = |key: &str| fields.get(key).map(text_value).unwrap_or_default();
        Some(Self {
            id: fields.get("id").and_then(id_value).unwrap_or_default(),
            complaint_type: text("complaintType"),
            descriptor_type: text("descriptorType"),
            agency_name: text("agencyName"),
            latitude,
            longitude,
        })
    }

    /// Zero coordinates mark an ungeocoded request
    fn is_placeable(&self) -> bool {
        self.latitude != 0.0 && self.longitude != 0.0
    }
}

fn id_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Convert a map-points payload into placeable pins
pub fn pins_from_payload(payload: &Value) -> Vec<MapPin> {
    let pins: Vec<MapPin> = match PayloadShape::classify(payload) {
        PayloadShape::Positional(rows) => rows
            .iter()
            .filter_map(|row| row.as_array().and_then(|fields| MapPin::from_positional(fields)))
            .collect(),
        PayloadShape::Keyed(rows) => rows
            .iter()
            .filter_map(|row| row.as_object().and_then(MapPin::from_keyed))
            .collect(),
        shape => {
            warn!("Map points payload has {} shape, no pins", shape.name());
            Vec::new()
        }
    };

    pins.into_iter().filter(MapPin::is_placeable).collect()
}

/// Map of individual service requests
pub struct MapView {
    id: SpaceViewId,
    title: String,
    limit: usize,
    pins: Vec<MapPin>,
    status: ViewStatus,
}

impl MapView {
    /// Create a new map view requesting at most `limit` pins
    pub fn new(title: impl Into<String>, limit: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            limit,
            pins: Vec::new(),
            status: ViewStatus::Idle,
        }
    }

    pub fn pins(&self) -> &[MapPin] {
        &self.pins
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[async_trait::async_trait]
impl SpaceView for MapView {
    fn id(&self) -> SpaceViewId {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn view_type(&self) -> &str {
        "MapView"
    }

    fn status(&self) -> &ViewStatus {
        &self.status
    }

    async fn refresh(&mut self, ctx: &ViewerContext) -> RefreshOutcome {
        let (filters, tag) = ctx.tagged_filters(0);
        let previous = std::mem::replace(&mut self.status, ViewStatus::Loading);

        let result = ctx.service.fetch_map_points(self.limit, &filters).await;

        if !ctx.is_current(tag, 0) {
            warn!("Discarding stale map pins (generation {})", tag.generation);
            self.status = previous;
            return RefreshOutcome::Stale;
        }

        match result {
            Ok(payload) => {
                self.pins = pins_from_payload(&payload);
                info!("Map loaded {} pins", self.pins.len());
                self.status = ViewStatus::Ready;
            }
            Err(e) => {
                self.pins.clear();
                self.status = ViewStatus::Failed(e.to_string());
            }
        }
        RefreshOutcome::Updated
    }

    fn snapshot(&self) -> Value {
        json!({
            "limit": self.limit,
            "pins": self.pins,
            "status": self.status,
        })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_pins() {
        let payload = json!([
            [1, "Noise", "Loud Music", "NYPD", 40.7, -73.9],
            ["2", "Heat", null, "HPD", "40.8", "-73.8"],
            [3, "Noise", "Loud Music", "NYPD", null, null],
            [4, "Noise", "Loud Music", "NYPD", 0, 0]
        ]);

        let pins = pins_from_payload(&payload);
        assert_eq!(pins.len(), 2);
        assert_eq!(pins[0].complaint_type, "Noise");
        assert_eq!(pins[1].id, 2);
        assert_eq!(pins[1].descriptor_type, "");
        assert_eq!(pins[1].longitude, -73.8);
    }

    #[test]
    fn test_keyed_pins() {
        let payload = json!([
            {"id": 9, "complaintType": "Rodent", "agencyName": "DOHMH", "latitude": 40.6, "longitude": -74.0}
        ]);

        let pins = pins_from_payload(&payload);
        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0].id, 9);
        assert_eq!(pins[0].agency_name, "DOHMH");
    }

    #[test]
    fn test_scalar_payload_has_no_pins() {
        assert!(pins_from_payload(&json!(["2025-11-30 00:00:00"])).is_empty());
        assert!(pins_from_payload(&json!({"error": "bad"})).is_empty());
    }
}
