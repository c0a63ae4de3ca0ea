use serde::{Deserialize, Deserializer, Serialize};

/// Column names in table display order
pub const COLUMN_ORDER: [&str; 17] = [
    "id",
    "complaintType",
    "descriptorType",
    "agencyName",
    "locationType",
    "incidentAddress",
    "incidentZip",
    "addressType",
    "city",
    "status",
    "createdDate",
    "closedDate",
    "communityBoard",
    "borough",
    "openDataChannelType",
    "latitude",
    "longitude",
];

/// Columns offered as chart dimensions on the dashboard
pub const CATEGORICAL_COLUMNS: [&str; 8] = [
    "complaintType",
    "descriptorType",
    "agencyName",
    "locationType",
    "addressType",
    "city",
    "borough",
    "openDataChannelType",
];

/// Read `null` as the type's default; the API sends blank columns as null
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A single service request as returned by the query API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Record {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub complaint_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub descriptor_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub agency_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub location_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub incident_address: String,
    #[serde(deserialize_with = "null_as_default")]
    pub incident_zip: String,
    #[serde(deserialize_with = "null_as_default")]
    pub address_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub city: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub created_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub closed_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub community_board: String,
    #[serde(deserialize_with = "null_as_default")]
    pub borough: String,
    #[serde(deserialize_with = "null_as_default")]
    pub open_data_channel_type: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Record {
    /// Get the display value of a column by its wire name
    ///
    /// Returns `None` for columns the record does not have. Missing
    /// coordinates render as the empty string.
    pub fn field(&self, column: &str) -> Option<String> {
        let value = match column {
            "id" => self.id.to_string(),
            "complaintType" => self.complaint_type.clone(),
            "descriptorType" => self.descriptor_type.clone(),
            "agencyName" => self.agency_name.clone(),
            "locationType" => self.location_type.clone(),
            "incidentAddress" => self.incident_address.clone(),
            "incidentZip" => self.incident_zip.clone(),
            "addressType" => self.address_type.clone(),
            "city" => self.city.clone(),
            "status" => self.status.clone(),
            "createdDate" => self.created_date.clone(),
            "closedDate" => self.closed_date.clone(),
            "communityBoard" => self.community_board.clone(),
            "borough" => self.borough.clone(),
            "openDataChannelType" => self.open_data_channel_type.clone(),
            "latitude" => self.latitude.map(|v| v.to_string()).unwrap_or_default(),
            "longitude" => self.longitude.map(|v| v.to_string()).unwrap_or_default(),
            _ => return None,
        };
        Some(value)
    }

    /// Check whether a column name is part of the record schema
    pub fn has_column(column: &str) -> bool {
        COLUMN_ORDER.contains(&column)
    }
}
