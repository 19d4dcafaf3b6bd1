//! Feature vector assembly.
//!
//! Projects a name → value record onto the schema's fixed field order. Range
//! checks are the input boundary's job (see [`validate_ranges`]); assembly only
//! guarantees that every field is present and numeric.

use crate::domain::{FeatureRecord, FeatureSchema, FeatureVector};
use crate::error::ScoreError;

/// Build the model-ordered vector for `record`.
///
/// Extra keys in the record are ignored.
pub fn assemble(
    record: &FeatureRecord,
    schema: &FeatureSchema,
) -> Result<FeatureVector, ScoreError> {
    let mut values = Vec::with_capacity(schema.len());
    for f in schema.fields {
        let raw = record.get(f.name).ok_or_else(|| ScoreError::MissingField {
            field: f.name.to_string(),
        })?;
        let value = raw.as_finite().ok_or_else(|| ScoreError::NonNumeric {
            field: f.name.to_string(),
            raw: raw.raw(),
        })?;
        values.push(value);
    }
    Ok(FeatureVector(values))
}

/// A field whose value falls outside its documented range.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeViolation {
    pub field: &'static str,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl std::fmt::Display for RangeViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} = {} is outside [{}, {}]",
            self.field, self.value, self.min, self.max
        )
    }
}

impl From<RangeViolation> for ScoreError {
    fn from(v: RangeViolation) -> Self {
        ScoreError::OutOfRange {
            field: v.field.to_string(),
            value: v.value,
            min: v.min,
            max: v.max,
        }
    }
}

/// Check every present, numeric field against its range.
///
/// Missing or non-numeric values are left to [`assemble`] to report.
pub fn validate_ranges(record: &FeatureRecord, schema: &FeatureSchema) -> Vec<RangeViolation> {
    schema
        .fields
        .iter()
        .filter_map(|f| {
            let value = record.get(f.name)?.as_finite()?;
            (!f.contains(value)).then_some(RangeViolation {
                field: f.name,
                value,
                min: f.min,
                max: f.max,
            })
        })
        .collect()
}
