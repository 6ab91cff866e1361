use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// A postcode/city pair, as returned by GeoNames or stored in the field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostalRecord {
    #[serde(deserialize_with = "postcode_string")]
    pub postcode: String,
    pub city: String,
}

impl PostalRecord {
    pub fn new(postcode: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            postcode: postcode.into(),
            city: city.into(),
        }
    }

    /// Both fields must be non-empty for a record to be offered or stored.
    pub fn is_valid(&self) -> bool {
        !self.postcode.is_empty() && !self.city.is_empty()
    }

    /// Composite dedup key. Case-sensitive, exactly as the upstream returned it.
    pub fn key(&self) -> (&str, &str) {
        (&self.postcode, &self.city)
    }
}

/// A label/value pair ready to be shown in a select input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayOption {
    pub label: String,
    pub value: PostalRecord,
}

/// Error report GeoNames embeds in an otherwise successful response,
/// e.g. when the daily credit limit is exceeded.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceStatus {
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub value: Option<String>,
}

impl ServiceStatus {
    pub fn describe(&self) -> String {
        format!(
            "GeoNames error {}: {}",
            self.value.as_deref().unwrap_or("?"),
            self.message.as_deref().unwrap_or("no message")
        )
    }
}

/// Response of `postalCodeSearchJSON`
#[derive(Debug, Default, Deserialize)]
pub struct PostalCodeSearchResponse {
    #[serde(default)]
    pub status: Option<ServiceStatus>,
    #[serde(rename = "postalCodes", default)]
    pub postal_codes: Vec<PostalCodeEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostalCodeEntry {
    #[serde(rename = "postalCode", default, deserialize_with = "lenient_string")]
    pub postal_code: Option<String>,
    #[serde(rename = "placeName", default, deserialize_with = "lenient_string")]
    pub place_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
}

impl PostalCodeEntry {
    /// City comes from `placeName`, falling back to `name` when that is missing or empty
    pub fn into_record(self) -> PostalRecord {
        let city = self
            .place_name
            .filter(|s| !s.is_empty())
            .or(self.name)
            .unwrap_or_default();
        PostalRecord {
            postcode: self.postal_code.unwrap_or_default(),
            city,
        }
    }
}

/// Response of `searchJSON`
#[derive(Debug, Default, Deserialize)]
pub struct GeneralSearchResponse {
    #[serde(default)]
    pub status: Option<ServiceStatus>,
    #[serde(default)]
    pub geonames: Vec<GeoNameEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeoNameEntry {
    #[serde(rename = "postalCode", default, deserialize_with = "lenient_string")]
    pub postal_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub postcode: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
}

impl GeoNameEntry {
    /// Places without any postal code are of no use to the picker.
    pub fn into_record(self) -> Option<PostalRecord> {
        let postcode = self
            .postal_code
            .filter(|s| !s.is_empty())
            .or(self.postcode)
            .filter(|s| !s.is_empty())?;
        Some(PostalRecord {
            postcode,
            city: self.name.unwrap_or_default(),
        })
    }
}

/// GeoNames is not consistent about scalar types; accept strings and numbers alike.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Stored postcodes were not always written as strings.
fn postcode_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected postcode string, found {}",
            other
        ))),
    }
}
