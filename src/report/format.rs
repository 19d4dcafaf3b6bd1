//! Formatted terminal output.
//!
//! Formatting lives here so the pipeline stays free of presentation concerns and
//! output changes stay localized.

use crate::domain::{FeatureRecord, FeatureSchema, Profile, RecordValue, RiskAssessment};
use crate::models::{Classifier, ModelAdapter};

/// Width of the text severity gauge, in cells.
const GAUGE_WIDTH: usize = 40;

/// Field table for `credisense schema`.
pub fn format_schema(profile: Profile) -> String {
    let schema = profile.schema();
    let mut out = String::new();
    out.push_str(&format!("=== {} ===\n", profile.display_name()));
    out.push_str(&format!(
        "{:>2}  {:<26} {:>10} {:>10} {:>10}  description\n",
        "#", "field", "min", "max", "default"
    ));
    for (i, f) in schema.fields.iter().enumerate() {
        out.push_str(&format!(
            "{:>2}  {:<26} {:>10} {:>10} {:>10}  {}\n",
            i, f.name, f.min, f.max, f.default, f.description
        ));
    }
    if profile.expands() {
        out.push_str(&format!(
            "\nModel input: {} values ({} fields + pairwise interactions).\n",
            profile.input_arity(),
            schema.len()
        ));
    }
    out
}

/// Input summary table (field, value) in schema order.
pub fn format_record(record: &FeatureRecord, schema: &FeatureSchema) -> String {
    let mut out = String::from("User input summary:\n");
    for f in schema.fields {
        let value = match record.get(f.name) {
            Some(RecordValue::Number(v)) => format!("{v}"),
            Some(RecordValue::Text(s)) => s.clone(),
            None => "-".to_string(),
        };
        out.push_str(&format!("  {:<26} {value}\n", f.name));
    }
    out
}

/// Result block: label, category, gauge and optional class probabilities.
pub fn format_assessment(assessment: &RiskAssessment) -> String {
    let mut out = format!(
        "Prediction: {} ({})\n",
        assessment.label, assessment.category
    );
    out.push_str(&format!(
        "Severity:   {} {:>3}/100\n",
        severity_gauge(assessment.severity, GAUGE_WIDTH),
        assessment.severity
    ));
    if let Some(probs) = &assessment.probabilities {
        out.push_str("Class probabilities:\n");
        for p in probs {
            out.push_str(&format!("  {:>3}  {:>6.2}%\n", p.label, p.probability * 100.0));
        }
    }
    out
}

/// `[#####-----]` style gauge.
pub fn severity_gauge(severity: u8, width: usize) -> String {
    let width = width.max(1);
    let filled = (severity.min(100) as usize * width + 50) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

/// One-line model status for headers and `credisense check`.
pub fn format_model_status(adapter: &ModelAdapter) -> String {
    match (adapter.classifier(), adapter.load_error()) {
        (Some(model), _) => format!(
            "model: {} ({} inputs, classes {:?})",
            adapter.path().display(),
            model.n_features(),
            model.classes()
        ),
        (None, Some(err)) => format!("model unavailable: {err}"),
        (None, None) => format!("model unavailable: {}", adapter.path().display()),
    }
}
