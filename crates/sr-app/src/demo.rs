//! Demo mode for the report viewer
//! Generates a deterministic set of service requests served from memory

use chrono::{DateTime, Duration};
use sr_core::Record;
use sr_data::MemoryQueryClient;

/// Records generated by `--demo`
pub const DEMO_RECORDS: usize = 500;

const COMPLAINTS: [(&str, &str, &str); 6] = [
    ("Noise - Residential", "Loud Music/Party", "NYPD"),
    ("HEAT/HOT WATER", "ENTIRE BUILDING", "HPD"),
    ("Illegal Parking", "Blocked Hydrant", "NYPD"),
    ("Street Condition", "Pothole", "DOT"),
    ("Rodent", "Rat Sighting", "DOHMH"),
    ("Water System", "", "DEP"),
];

const BOROUGHS: [(&str, &str, f64, f64); 5] = [
    ("BRONX", "BRONX", 40.84, -73.88),
    ("BROOKLYN", "BROOKLYN", 40.65, -73.95),
    ("MANHATTAN", "NEW YORK", 40.78, -73.97),
    ("QUEENS", "JAMAICA", 40.70, -73.80),
    ("STATEN ISLAND", "STATEN ISLAND", 40.58, -74.15),
];

const CHANNELS: [&str; 4] = ["PHONE", "ONLINE", "MOBILE", "UNKNOWN"];
const LOCATION_TYPES: [&str; 3] = ["RESIDENTIAL BUILDING", "Street/Sidewalk", "Store/Commercial"];

/// 2025-01-01 00:00:00 UTC
const START_SECS: i64 = 1_735_689_600;

fn timestamp(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// One synthetic request; the same index always yields the same record
fn demo_record(index: usize) -> Record {
    // Skewed pick so chart slices differ in size
    let (complaint, descriptor, agency) = COMPLAINTS[(index * index + index / 3) % COMPLAINTS.len()];
    let (borough, city, lat, lon) = BOROUGHS[(index * 7 + index / 5) % BOROUGHS.len()];

    let created = START_SECS + (index as i64) * 5_437;
    let closed = (index % 4 != 0).then(|| created + Duration::hours(6 + (index % 48) as i64).num_seconds());

    // Every 25th request was never geocoded
    let jitter = ((index * 37) % 100) as f64 / 1000.0 - 0.05;
    let coordinates = (index % 25 != 24).then_some((lat + jitter, lon - jitter));

    Record {
        id: index as i64 + 1,
        complaint_type: complaint.to_string(),
        descriptor_type: descriptor.to_string(),
        agency_name: agency.to_string(),
        location_type: LOCATION_TYPES[index % LOCATION_TYPES.len()].to_string(),
        incident_address: format!("{} {} AVENUE", 100 + index % 900, (index % 12) + 1),
        incident_zip: format!("{}", 10_400 + (index * 13) % 300),
        address_type: if index % 9 == 0 { "INTERSECTION" } else { "ADDRESS" }.to_string(),
        city: city.to_string(),
        status: if closed.is_some() { "Closed" } else { "Open" }.to_string(),
        created_date: timestamp(created),
        closed_date: closed.map(timestamp).unwrap_or_default(),
        community_board: format!("{:02} {}", index % 12 + 1, borough),
        borough: borough.to_string(),
        open_data_channel_type: CHANNELS[(index / 2) % CHANNELS.len()].to_string(),
        latitude: coordinates.map(|c| c.0),
        longitude: coordinates.map(|c| c.1),
    }
}

/// Generate `count` demo records
pub fn demo_records(count: usize) -> Vec<Record> {
    (0..count).map(demo_record).collect()
}

/// In-memory client over the demo dataset
pub fn demo_client() -> MemoryQueryClient {
    MemoryQueryClient::new("demo", demo_records(DEMO_RECORDS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_records_are_deterministic() {
        assert_eq!(demo_records(50), demo_records(50));
        assert_eq!(demo_records(3)[0].created_date, "2025-01-01 00:00:00");
    }

    #[test]
    fn test_demo_records_cover_edge_cases() {
        let records = demo_records(DEMO_RECORDS);
        assert!(records.iter().any(|r| r.latitude.is_none()));
        assert!(records.iter().any(|r| r.descriptor_type.is_empty()));
        assert!(records.iter().any(|r| r.status == "Open"));
        assert!(records
            .iter()
            .filter_map(|r| r.latitude)
            .all(|lat| lat.is_finite() && lat != 0.0));
    }
}
