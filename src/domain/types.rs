//! Shared domain types.
//!
//! Records and assessments are serializable so the same types back the JSON
//! input/output of `credisense score` and the CSV paths of `credisense batch`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::{FeatureSchema, Profile};

/// A single raw value as it arrives from the input boundary.
///
/// Forms and files may hand over text; the assembler decides whether it is a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordValue {
    Number(f64),
    Text(String),
}

impl RecordValue {
    /// Interpret the value as a finite number.
    pub fn as_finite(&self) -> Option<f64> {
        let v = match self {
            RecordValue::Number(v) => *v,
            RecordValue::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        v.is_finite().then_some(v)
    }

    pub fn raw(&self) -> String {
        match self {
            RecordValue::Number(v) => v.to_string(),
            RecordValue::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for RecordValue {
    fn from(value: f64) -> Self {
        RecordValue::Number(value)
    }
}

impl From<&str> for RecordValue {
    fn from(value: &str) -> Self {
        RecordValue::Text(value.to_string())
    }
}

/// Field name → value mapping for one applicant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRecord {
    values: BTreeMap<String, RecordValue>,
}

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// A record with every field of `schema` at its documented default.
    pub fn defaults(schema: &FeatureSchema) -> Self {
        let mut record = Self::new();
        for f in schema.fields {
            record.set(f.name, f.default);
        }
        record
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<RecordValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&RecordValue> {
        self.values.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<RecordValue> {
        self.values.remove(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RecordValue)> {
        self.values.iter()
    }
}

impl<K: Into<String>, V: Into<RecordValue>> FromIterator<(K, V)> for FeatureRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (k, v) in iter {
            record.set(k, v);
        }
        record
    }
}

/// Ordered numeric values in schema order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector(pub Vec<f64>);

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Result of one pipeline run, as handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub label: i64,
    pub category: &'static str,
    /// Display-only position on a 0..=100 gauge.
    pub severity: u8,
    /// Per-class probabilities when the artifact exposes class margins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Vec<ClassProbability>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassProbability {
    pub label: i64,
    pub probability: f64,
}

/// A full run's configuration as understood by the front-ends.
///
/// This is derived from CLI flags (plus `.env` / defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub profile: Profile,
    pub model_path: PathBuf,
    /// Include per-class probabilities in the output.
    pub probabilities: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DIRECT_SCHEMA;

    #[test]
    fn record_value_parses_numeric_text() {
        assert_eq!(RecordValue::from(" 12.5 ").as_finite(), Some(12.5));
        assert_eq!(RecordValue::from("abc").as_finite(), None);
        assert_eq!(RecordValue::Number(f64::INFINITY).as_finite(), None);
        assert_eq!(RecordValue::Number(f64::NAN).as_finite(), None);
    }

    #[test]
    fn record_deserializes_mixed_json() {
        let record: FeatureRecord =
            serde_json::from_str(r#"{"tot_enq": 3, "enq_L3m": "2"}"#).unwrap();
        assert_eq!(record.get("tot_enq"), Some(&RecordValue::Number(3.0)));
        assert_eq!(record.get("enq_L3m"), Some(&RecordValue::Text("2".to_string())));
    }

    #[test]
    fn defaults_cover_every_field() {
        let record = FeatureRecord::defaults(&DIRECT_SCHEMA);
        assert_eq!(record.len(), DIRECT_SCHEMA.len());
        assert_eq!(
            record.get("NETMONTHLYINCOME").and_then(RecordValue::as_finite),
            Some(50_000.0)
        );
    }
}
