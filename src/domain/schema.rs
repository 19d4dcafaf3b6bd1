//! Static feature schemas and the scoring profiles that pair them with a model.
//!
//! Field order is pinned here and must match the column order the paired model
//! was trained on. Reordering a schema is a model-breaking change.

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One input field of a schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDef {
    pub name: &'static str,
    /// Inclusive lower bound accepted at the input boundary.
    pub min: f64,
    /// Inclusive upper bound accepted at the input boundary.
    pub max: f64,
    /// Value pre-filled in the form.
    pub default: f64,
    /// Increment used by the interactive form.
    pub step: f64,
    pub description: &'static str,
}

impl FieldDef {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.default;
        }
        value.clamp(self.min, self.max)
    }
}

/// An ordered set of field definitions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSchema {
    pub name: &'static str,
    pub fields: &'static [FieldDef],
}

impl FeatureSchema {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }
}

const fn field(
    name: &'static str,
    min: f64,
    max: f64,
    default: f64,
    step: f64,
    description: &'static str,
) -> FieldDef {
    FieldDef {
        name,
        min,
        max,
        default,
        step,
        description,
    }
}

/// 12-field schema fed to the model unmodified.
pub const DIRECT_SCHEMA: FeatureSchema = FeatureSchema {
    name: "direct",
    fields: &[
        field(
            "Age_Oldest_TL",
            0.0,
            100.0,
            10.0,
            1.0,
            "The age of the oldest trade line (credit account) in years.",
        ),
        field(
            "enq_L3m",
            0.0,
            100.0,
            1.0,
            1.0,
            "The number of credit enquiries made in the last 3 months.",
        ),
        field(
            "time_since_recent_enq",
            0.0,
            100.0,
            1.0,
            1.0,
            "The time since the most recent credit enquiry, measured in months.",
        ),
        field(
            "num_std",
            0.0,
            100.0,
            1.0,
            1.0,
            "The number of standard trade lines; a measure of the variety of trade lines held.",
        ),
        field(
            "time_since_recent_payment",
            0.0,
            100.0,
            1.0,
            1.0,
            "The time since the most recent payment, measured in months.",
        ),
        field(
            "Time_With_Curr_Empr",
            0.0,
            100.0,
            1.0,
            1.0,
            "The time the borrower has been with their current employer, measured in months.",
        ),
        field(
            "NETMONTHLYINCOME",
            0.0,
            100_000.0,
            50_000.0,
            1_000.0,
            "The net monthly income of the borrower, measured in currency units.",
        ),
        field(
            "Age_Newest_TL",
            0.0,
            100.0,
            1.0,
            1.0,
            "The age of the newest trade line (credit account) in years.",
        ),
        field(
            "num_std_6mts",
            0.0,
            100.0,
            1.0,
            1.0,
            "The number of standard trade lines in the last 6 months.",
        ),
        field(
            "tot_enq",
            0.0,
            100.0,
            1.0,
            1.0,
            "The total number of credit enquiries made by the borrower.",
        ),
        field(
            "pct_PL_enq_L6m_of_ever",
            0.0,
            100.0,
            1.0,
            1.0,
            "Personal loan enquiries in the last 6 months as a percentage of all enquiries ever made.",
        ),
        field(
            "recent_level_of_deliq",
            0.0,
            10.0,
            0.0,
            1.0,
            "The recent level of delinquency, from 0 (none) to 10 (severe).",
        ),
    ],
};

/// 12-field enquiry/trade-line schema, used with pairwise-interaction expansion.
pub const ENQUIRY_SCHEMA: FeatureSchema = FeatureSchema {
    name: "enquiry",
    fields: &[
        field(
            "Tot_TL_closed_L12M",
            0.0,
            100.0,
            0.0,
            1.0,
            "Trade lines closed in the last 12 months.",
        ),
        field(
            "pct_tl_closed_L12M",
            0.0,
            1.0,
            0.0,
            0.05,
            "Fraction of all trade lines closed in the last 12 months.",
        ),
        field(
            "Tot_Missed_Pmnt",
            0.0,
            100.0,
            0.0,
            1.0,
            "Total number of missed payments across all trade lines.",
        ),
        field("CC_TL", 0.0, 100.0, 0.0, 1.0, "Number of credit card trade lines."),
        field("Home_TL", 0.0, 100.0, 0.0, 1.0, "Number of housing loan trade lines."),
        field("PL_TL", 0.0, 100.0, 0.0, 1.0, "Number of personal loan trade lines."),
        field("Secured_TL", 0.0, 100.0, 1.0, 1.0, "Number of secured trade lines."),
        field("Unsecured_TL", 0.0, 100.0, 1.0, 1.0, "Number of unsecured trade lines."),
        field("Other_TL", 0.0, 100.0, 0.0, 1.0, "Number of trade lines of any other product type."),
        field(
            "enq_L6m",
            0.0,
            100.0,
            1.0,
            1.0,
            "The number of credit enquiries made in the last 6 months.",
        ),
        field(
            "tot_enq",
            0.0,
            100.0,
            1.0,
            1.0,
            "The total number of credit enquiries made by the borrower.",
        ),
        field(
            "time_since_recent_enq",
            0.0,
            100.0,
            1.0,
            1.0,
            "The time since the most recent credit enquiry, measured in months.",
        ),
    ],
};

/// A versioned pairing of schema, expansion, and model contract.
///
/// Expansion is a property of the profile rather than an independent switch, so
/// an expander can never be applied to the direct schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Direct schema, no expansion, labels 1..=3.
    Direct,
    /// Enquiry/trade-line schema with pairwise interactions, labels 0..=3.
    Expanded,
}

impl Profile {
    pub const ALL: [Profile; 2] = [Profile::Direct, Profile::Expanded];

    pub fn schema(self) -> &'static FeatureSchema {
        match self {
            Profile::Direct => &DIRECT_SCHEMA,
            Profile::Expanded => &ENQUIRY_SCHEMA,
        }
    }

    pub fn expands(self) -> bool {
        matches!(self, Profile::Expanded)
    }

    /// Number of values the paired model consumes.
    pub fn input_arity(self) -> usize {
        let n = self.schema().len();
        if self.expands() {
            crate::math::expanded_len(n)
        } else {
            n
        }
    }

    pub fn default_model_path(self) -> PathBuf {
        match self {
            Profile::Direct => PathBuf::from("model.json"),
            Profile::Expanded => PathBuf::from("models").join("model.json"),
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Profile::Direct => "direct",
            Profile::Expanded => "expanded",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Profile::Direct => "Direct (12 features)",
            Profile::Expanded => "Expanded (12 features, pairwise interactions)",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn schemas_have_twelve_unique_fields() {
        for profile in Profile::ALL {
            let schema = profile.schema();
            assert_eq!(schema.len(), 12, "{}", schema.name);
            let unique: HashSet<_> = schema.fields.iter().map(|f| f.name).collect();
            assert_eq!(unique.len(), schema.len(), "duplicate field in {}", schema.name);
        }
    }

    #[test]
    fn defaults_lie_within_ranges() {
        for profile in Profile::ALL {
            for f in profile.schema().fields {
                assert!(f.min <= f.max, "{}", f.name);
                assert!(f.contains(f.default), "{} default out of range", f.name);
                assert!(f.step > 0.0, "{}", f.name);
            }
        }
    }

    #[test]
    fn direct_schema_order_is_pinned() {
        assert_eq!(
            DIRECT_SCHEMA.names(),
            vec![
                "Age_Oldest_TL",
                "enq_L3m",
                "time_since_recent_enq",
                "num_std",
                "time_since_recent_payment",
                "Time_With_Curr_Empr",
                "NETMONTHLYINCOME",
                "Age_Newest_TL",
                "num_std_6mts",
                "tot_enq",
                "pct_PL_enq_L6m_of_ever",
                "recent_level_of_deliq",
            ]
        );
    }

    #[test]
    fn profile_arity() {
        assert_eq!(Profile::Direct.input_arity(), 12);
        assert_eq!(Profile::Expanded.input_arity(), 78);
        assert!(!Profile::Direct.expands());
    }

    #[test]
    fn clamp_keeps_value_in_range() {
        let f = DIRECT_SCHEMA.field("recent_level_of_deliq").unwrap();
        assert_eq!(f.clamp(42.0), 10.0);
        assert_eq!(f.clamp(-1.0), 0.0);
        assert_eq!(f.clamp(f64::NAN), f.default);
    }
}
