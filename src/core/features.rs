//! The 65-wide feature vector consumed by inference.
//!
//! Column order is fixed: `Min_Sec` first, then `D1` through `D64`. Every
//! producer and consumer in the crate goes through [`FEATURE_COLUMNS`] so
//! nothing downstream ever needs to reorder columns.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Number of breath-sensor channels per reading.
pub const CHANNEL_COUNT: usize = 64;

/// Number of features per vector (time + channels).
pub const FEATURE_COUNT: usize = CHANNEL_COUNT + 1;

/// Name of the normalized time column.
pub const TIME_COLUMN: &str = "Min_Sec";

/// Canonical feature column order.
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "Min_Sec", "D1", "D2", "D3", "D4", "D5", "D6", "D7", "D8", "D9", "D10", "D11", "D12", "D13",
    "D14", "D15", "D16", "D17", "D18", "D19", "D20", "D21", "D22", "D23", "D24", "D25", "D26",
    "D27", "D28", "D29", "D30", "D31", "D32", "D33", "D34", "D35", "D36", "D37", "D38", "D39",
    "D40", "D41", "D42", "D43", "D44", "D45", "D46", "D47", "D48", "D49", "D50", "D51", "D52",
    "D53", "D54", "D55", "D56", "D57", "D58", "D59", "D60", "D61", "D62", "D63", "D64",
];

/// Position of a named column within [`FEATURE_COLUMNS`].
pub fn column_index(name: &str) -> Option<usize> {
    FEATURE_COLUMNS.iter().position(|c| *c == name)
}

/// One patient's (or one request's) feature vector.
///
/// On the wire this is a flat JSON object with exactly the 65 named fields,
/// written in [`FEATURE_COLUMNS`] order.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>")]
pub struct FeatureVector {
    /// Normalized time in seconds
    pub min_sec: f64,
    /// Channel readings D1..D64
    pub channels: [f64; CHANNEL_COUNT],
}

impl FeatureVector {
    /// Build a vector from time and channel values.
    pub fn new(min_sec: f64, channels: [f64; CHANNEL_COUNT]) -> Self {
        Self { min_sec, channels }
    }

    /// Build a vector from values in canonical column order.
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        let mut channels = [0.0; CHANNEL_COUNT];
        channels.copy_from_slice(&values[1..]);
        Self {
            min_sec: values[0],
            channels,
        }
    }

    /// Values in canonical column order.
    pub fn values(&self) -> [f64; FEATURE_COUNT] {
        let mut values = [0.0; FEATURE_COUNT];
        values[0] = self.min_sec;
        values[1..].copy_from_slice(&self.channels);
        values
    }

    /// Look up a feature by column name.
    pub fn get(&self, name: &str) -> Option<f64> {
        column_index(name).map(|i| self.values()[i])
    }
}

/// Errors converting a field map into a [`FeatureVector`].
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureError {
    MissingField(&'static str),
    UnknownField(String),
}

impl std::fmt::Display for FeatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureError::MissingField(name) => write!(f, "missing field `{name}`"),
            FeatureError::UnknownField(name) => write!(f, "unknown field `{name}`"),
        }
    }
}

impl std::error::Error for FeatureError {}

impl TryFrom<BTreeMap<String, f64>> for FeatureVector {
    type Error = FeatureError;

    fn try_from(mut fields: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        let mut values = [0.0; FEATURE_COUNT];
        for (slot, name) in values.iter_mut().zip(FEATURE_COLUMNS) {
            *slot = fields
                .remove(name)
                .ok_or(FeatureError::MissingField(name))?;
        }
        if let Some(extra) = fields.into_keys().next() {
            return Err(FeatureError::UnknownField(extra));
        }
        Ok(Self::from_values(values))
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for (name, value) in FEATURE_COLUMNS.iter().zip(self.values()) {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FeatureVector {
        let mut channels = [0.0; CHANNEL_COUNT];
        for (i, c) in channels.iter_mut().enumerate() {
            *c = i as f64 + 1.0;
        }
        FeatureVector::new(45.0, channels)
    }

    #[test]
    fn test_column_order() {
        assert_eq!(FEATURE_COLUMNS.len(), 65);
        assert_eq!(FEATURE_COLUMNS[0], TIME_COLUMN);
        for i in 1..=CHANNEL_COUNT {
            assert_eq!(FEATURE_COLUMNS[i], format!("D{i}"));
        }
    }

    #[test]
    fn test_values_are_time_then_channels() {
        let v = sample();
        let values = v.values();
        assert_eq!(values[0], 45.0);
        assert_eq!(values[1], 1.0);
        assert_eq!(values[64], 64.0);
        assert_eq!(v.get("D10"), Some(10.0));
        assert_eq!(v.get("Min_Sec"), Some(45.0));
        assert_eq!(v.get("D65"), None);
    }

    #[test]
    fn test_json_uses_named_fields() {
        let json = serde_json::to_value(sample()).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 65);
        assert_eq!(obj["Min_Sec"], 45.0);
        assert_eq!(obj["D64"], 64.0);
    }

    #[test]
    fn test_json_keys_in_column_order() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.starts_with(r#"{"Min_Sec":45.0,"D1":1.0,"D2":2.0,"D3":3.0"#));
        assert!(json.ends_with(r#""D63":63.0,"D64":64.0}"#));

        let keys: Vec<usize> = FEATURE_COLUMNS
            .iter()
            .map(|name| json.find(&format!("\"{name}\":")).unwrap())
            .collect();
        assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_missing_field_rejected() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json.as_object_mut().unwrap().remove("D33");
        let err = serde_json::from_value::<FeatureVector>(json).unwrap_err();
        assert!(err.to_string().contains("D33"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json.as_object_mut()
            .unwrap()
            .insert("Patient_ID".to_string(), serde_json::json!(1.0));
        assert!(serde_json::from_value::<FeatureVector>(json).is_err());
    }

    #[test]
    fn test_non_numeric_rejected() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json["D1"] = serde_json::json!("high");
        assert!(serde_json::from_value::<FeatureVector>(json).is_err());
    }
}
