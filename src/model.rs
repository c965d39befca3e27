//! Park, live-spot and contact records as they arrive from the data source.
//!
//! Upstream JSON is loosely typed: numbers show up as strings, fields go
//! missing, collections contain nulls. Every field decodes leniently so that
//! one malformed record degrades to defaults instead of failing a batch.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tracing::debug;

use crate::mode::ModeBucket;
use crate::recency::parse_timestamp;

/// A POTA park.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Park {
    #[serde(default, deserialize_with = "lenient::string")]
    pub reference: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub longitude: Option<f64>,
    /// Lifetime activation count.
    #[serde(default, deserialize_with = "lenient::count")]
    pub activations: u64,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<String>,
    /// Fields the engine does not interpret (grid, locationDesc, ...), passed through.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Park {
    pub fn is_geolocated(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// A live spot of an activator on the air at a park.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationEvent {
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub reference: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub activator: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub frequency: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub mode: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub comments: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub spot_time: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ActivationEvent {
    pub fn bucket(&self) -> ModeBucket {
        ModeBucket::from_mode(self.mode.as_deref())
    }
}

/// A historical activation / contact record fed to the QSO aggregator.
///
/// The reference may arrive as `reference`, `park` or `ref`; the count as
/// `qsos` or `count`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub reference: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub park: Option<String>,
    #[serde(
        rename = "ref",
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub reference_alias: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qsos: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContactRecord {
    /// First non-empty of `reference`, `park`, `ref`.
    pub fn resolved_reference(&self) -> Option<&str> {
        [&self.reference, &self.park, &self.reference_alias]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|reference| !reference.is_empty())
    }

    /// `qsos` if present, else `count`; anything missing, non-numeric or
    /// below one counts as a single contact. Negative values are treated as
    /// malformed rather than as corrections that subtract.
    pub fn resolved_count(&self) -> u64 {
        self.qsos
            .as_ref()
            .or(self.count.as_ref())
            .and_then(value_as_f64)
            .filter(|n| n.is_finite() && *n >= 1.0)
            .map(|n| n as u64)
            .unwrap_or(1)
    }

    pub fn bucket(&self) -> ModeBucket {
        ModeBucket::from_mode(self.mode.as_deref())
    }
}

/// Decodes a JSON array into records, dropping entries that are not objects.
/// Anything other than an array yields no records.
pub fn decode_records<T: DeserializeOwned>(value: Value) -> Vec<T> {
    let Value::Array(items) = value else {
        return Vec::new();
    };

    let total = items.len();
    let records: Vec<T> = items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();

    if records.len() < total {
        debug!(total, skipped = total - records.len(), "Dropped malformed records");
    }

    records
}

/// Decodes a listing that is either a bare array or an object holding the
/// array under `key`.
pub fn decode_listing<T: DeserializeOwned>(value: Value, key: &str) -> Vec<T> {
    match value {
        Value::Object(mut map) => decode_records(map.remove(key).unwrap_or(Value::Null)),
        other => decode_records(other),
    }
}

/// Decodes a park listing, either a bare array or `{"parks": [...]}`.
pub fn decode_parks(value: Value) -> Vec<Park> {
    decode_listing(value, "parks")
}

/// Decodes activation records, either a bare array or `{"activations": [...]}`.
pub fn decode_contacts(value: Value) -> Vec<ContactRecord> {
    decode_listing(value, "activations")
}

/// Indexes live spots by park reference.
///
/// When several spots share a reference the latest parseable `spotTime`
/// wins. A spot without a usable time only replaces an entry that has none
/// either, in which case the later entry wins.
pub fn index_spots(spots: Vec<ActivationEvent>) -> HashMap<String, ActivationEvent> {
    let mut by_ref: HashMap<String, ActivationEvent> = HashMap::new();

    for spot in spots {
        let Some(reference) = spot.reference.clone().filter(|r| !r.is_empty()) else {
            continue;
        };

        let replace = match by_ref.get(&reference) {
            None => true,
            Some(existing) => {
                let existing_at = existing.spot_time.as_deref().and_then(parse_timestamp);
                let candidate_at = spot.spot_time.as_deref().and_then(parse_timestamp);
                match (existing_at, candidate_at) {
                    (Some(existing_at), Some(candidate_at)) => candidate_at >= existing_at,
                    (Some(_), None) => false,
                    (None, Some(_)) | (None, None) => true,
                }
            }
        };

        if replace {
            by_ref.insert(reference, spot);
        }
    }

    by_ref
}

/// References the user has activated, taken from their activation records.
pub fn activated_references(records: &[ContactRecord]) -> HashSet<String> {
    records
        .iter()
        .filter_map(ContactRecord::resolved_reference)
        .map(str::to_string)
        .collect()
}

pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn value_into_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Field decoders that never fail on a wrong type.
pub(crate) mod lenient {
    use std::collections::{HashMap, HashSet};

    use serde::{Deserialize, Deserializer, de::DeserializeOwned};
    use serde_json::Value;

    use super::{decode_records, value_as_f64, value_into_string};

    fn raw<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
        Option::<Value>::deserialize(deserializer)
    }

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(opt_string(deserializer)?.unwrap_or_default())
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(raw(deserializer)?.and_then(value_into_string))
    }

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Ok(raw(deserializer)?.as_ref().and_then(value_as_f64))
    }

    pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        Ok(number(deserializer)?
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n as u64)
            .unwrap_or(0))
    }

    /// Only a JSON boolean sets a flag; anything else leaves it unset.
    pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
        Ok(match raw(deserializer)? {
            Some(Value::Bool(b)) => Some(b),
            _ => None,
        })
    }

    pub fn records<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(raw(deserializer)?.map(decode_records).unwrap_or_default())
    }

    pub fn strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        Ok(match raw(deserializer)? {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        })
    }

    pub fn string_set<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashSet<String>, D::Error> {
        Ok(strings(deserializer)?.into_iter().collect())
    }

    /// A JSON object of records keyed by reference; entries that are not
    /// objects (including `null`) are dropped.
    pub fn record_map<'de, D, T>(deserializer: D) -> Result<HashMap<String, T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match raw(deserializer)? {
            Some(Value::Object(map)) => map
                .into_iter()
                .filter(|(_, value)| value.is_object())
                .filter_map(|(key, value)| Some((key, serde_json::from_value(value).ok()?)))
                .collect(),
            _ => HashMap::new(),
        })
    }

    pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        Ok(raw(deserializer)?
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default())
    }
}
