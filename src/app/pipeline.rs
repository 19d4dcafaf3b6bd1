//! Shared scoring pipeline used by the CLI, batch, and TUI front-ends.
//!
//! assemble -> (expand) -> predict -> interpret
//!
//! The front-ends only collect input and render the resulting `RiskAssessment`.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::domain::{FeatureRecord, FeatureVector, Profile, RiskAssessment};
use crate::error::{AppError, ScoreError};
use crate::features::{assemble, validate_ranges};
use crate::io::BatchRow;
use crate::math::{expand_checked, interaction_names};
use crate::models::{Classifier, ModelAdapter};
use crate::report::RiskTable;

/// A profile bound to the process-wide model handle.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'a> {
    profile: Profile,
    adapter: &'a ModelAdapter,
    table: RiskTable,
}

impl<'a> Pipeline<'a> {
    /// Bind `adapter` to `profile`, failing fast if a loaded model cannot serve it.
    ///
    /// An adapter without a model is accepted: the pipeline then runs degraded and
    /// every score returns `ModelUnavailable`.
    pub fn new(profile: Profile, adapter: &'a ModelAdapter) -> Result<Self, AppError> {
        let table = RiskTable::for_profile(profile);
        if let Some(model) = adapter.classifier() {
            check_pairing(profile, model).map_err(|msg| {
                AppError::new(
                    2,
                    format!(
                        "Model '{}' does not match the {} profile: {msg}",
                        adapter.path().display(),
                        profile.tag()
                    ),
                )
            })?;
            let unknown: Vec<i64> = model
                .classes()
                .iter()
                .copied()
                .filter(|c| !table.contains(*c))
                .collect();
            if !unknown.is_empty() {
                warn!(
                    profile = profile.tag(),
                    labels = ?unknown,
                    "model emits labels outside the risk table; they will read as unknown"
                );
            }
        }
        Ok(Self {
            profile,
            adapter,
            table,
        })
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn adapter(&self) -> &'a ModelAdapter {
        self.adapter
    }

    pub fn risk_table(&self) -> RiskTable {
        self.table
    }

    /// The exact vector handed to the model for `record`.
    pub fn model_input(&self, record: &FeatureRecord) -> Result<FeatureVector, ScoreError> {
        let schema = self.profile.schema();
        let vector = assemble(record, schema)?;
        if !self.profile.expands() {
            return Ok(vector);
        }
        expand_checked(vector.as_slice(), schema.len()).map(FeatureVector)
    }

    /// Run the full pipeline for one record.
    pub fn score(
        &self,
        record: &FeatureRecord,
        with_probabilities: bool,
    ) -> Result<RiskAssessment, ScoreError> {
        let input = self.model_input(record)?;
        let label = self.adapter.predict(input.as_slice())?;
        let probabilities = if with_probabilities {
            Some(self.adapter.class_probabilities(input.as_slice())?)
        } else {
            None
        };

        let assessment = RiskAssessment {
            label,
            category: self.table.category(label),
            severity: self.table.severity(label),
            probabilities,
        };
        debug!(
            profile = self.profile.tag(),
            inputs = input.len(),
            label,
            category = assessment.category,
            "scored record"
        );
        Ok(assessment)
    }
}

/// Outcome for one row of a batch.
#[derive(Debug, Clone)]
pub struct ScoredRow {
    pub line: usize,
    pub outcome: Result<RiskAssessment, ScoreError>,
}

/// Score every row independently.
///
/// Rows are scored in parallel against the shared read-only model; output keeps
/// input order. A failing row never affects its neighbours. CSV cells bypass
/// the form's clamping, so each row is range-checked first and the first
/// violation becomes that row's error.
pub fn score_batch(
    pipeline: &Pipeline<'_>,
    rows: &[BatchRow],
    with_probabilities: bool,
) -> Vec<ScoredRow> {
    let schema = pipeline.profile().schema();
    rows.par_iter()
        .map(|row| {
            let outcome = match validate_ranges(&row.record, schema).into_iter().next() {
                Some(violation) => Err(ScoreError::from(violation)),
                None => pipeline.score(&row.record, with_probabilities),
            };
            ScoredRow {
                line: row.line,
                outcome,
            }
        })
        .collect()
}

/// Verify a classifier was trained for `profile`'s input contract.
pub fn check_pairing(profile: Profile, model: &dyn Classifier) -> Result<(), String> {
    if let Some(trained_for) = model.profile()
        && trained_for != profile
    {
        return Err(format!("artifact was exported for the {} profile", trained_for.tag()));
    }

    let expected = profile.input_arity();
    if model.n_features() != expected {
        return Err(format!(
            "model expects {} inputs, profile produces {expected}",
            model.n_features()
        ));
    }

    if let Some(names) = model.feature_names() {
        let schema_names = profile.schema().names();
        let expected_names = if profile.expands() {
            interaction_names(&schema_names)
        } else {
            schema_names.iter().map(|s| s.to_string()).collect()
        };
        if names.len() != expected_names.len() {
            return Err(format!(
                "model lists {} column names, profile produces {}",
                names.len(),
                expected_names.len()
            ));
        }
        if let Some(i) = (0..names.len()).find(|&i| names[i] != expected_names[i]) {
            return Err(format!(
                "input column {i} is '{}', expected '{}'",
                names[i], expected_names[i]
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DIRECT_SCHEMA, ENQUIRY_SCHEMA};
    use crate::models::{FORMAT_TAG, FORMAT_VERSION, Node, Tree, TreeEnsemble};
    use crate::report::UNKNOWN_RISK_LEVEL;

    /// Splits on income for the direct profile; labels 1..=3.
    fn direct_model() -> TreeEnsemble {
        TreeEnsemble {
            format: FORMAT_TAG.to_string(),
            version: FORMAT_VERSION,
            profile: Some(Profile::Direct),
            n_features: 12,
            feature_names: Some(DIRECT_SCHEMA.names().iter().map(|s| s.to_string()).collect()),
            classes: vec![1, 2, 3],
            base_score: vec![],
            trees: vec![
                Tree {
                    class_index: 0,
                    nodes: vec![Node::split(6, 30_000.0, 1, 2), Node::leaf(-1.0), Node::leaf(1.0)],
                },
                Tree {
                    class_index: 2,
                    nodes: vec![Node::split(11, 5.0, 1, 2), Node::leaf(0.0), Node::leaf(2.0)],
                },
            ],
        }
    }

    /// Uses the last interaction term (x10 * x11) of the expanded profile; labels 0..=3.
    fn expanded_model() -> TreeEnsemble {
        TreeEnsemble {
            format: FORMAT_TAG.to_string(),
            version: FORMAT_VERSION,
            profile: Some(Profile::Expanded),
            n_features: 78,
            feature_names: Some(interaction_names(&ENQUIRY_SCHEMA.names())),
            classes: vec![0, 1, 2, 3],
            base_score: vec![0.5, 0.0, 0.0, 0.0],
            trees: vec![Tree {
                class_index: 3,
                nodes: vec![Node::split(77, 50.0, 1, 2), Node::leaf(0.0), Node::leaf(3.0)],
            }],
        }
    }

    #[test]
    fn direct_defaults_score_end_to_end() {
        let adapter = ModelAdapter::with_classifier("model.json", direct_model());
        let pipeline = Pipeline::new(Profile::Direct, &adapter).unwrap();
        let record = FeatureRecord::defaults(&DIRECT_SCHEMA);

        assert_eq!(pipeline.model_input(&record).unwrap().len(), 12);
        let a = pipeline.score(&record, false).unwrap();
        assert!([1, 2, 3].contains(&a.label));
        assert!(["Low Risk", "Medium Risk", "High Risk"].contains(&a.category));
        assert_eq!(a.label, 1);
        assert_eq!(a.severity, 0);
        assert!(a.probabilities.is_none());

        let mut risky = record.clone();
        risky.set("recent_level_of_deliq", 9.0);
        risky.set("NETMONTHLYINCOME", 10_000.0);
        let a = pipeline.score(&risky, true).unwrap();
        assert_eq!((a.label, a.category, a.severity), (3, "High Risk", 100));
        assert_eq!(a.probabilities.map(|p| p.len()), Some(3));
    }

    #[test]
    fn expanded_record_feeds_seventy_eight_inputs() {
        let adapter = ModelAdapter::with_classifier("models/model.json", expanded_model());
        let pipeline = Pipeline::new(Profile::Expanded, &adapter).unwrap();

        let mut record = FeatureRecord::defaults(&ENQUIRY_SCHEMA);
        record.set("tot_enq", 10.0);
        record.set("time_since_recent_enq", 6.0);

        let input = pipeline.model_input(&record).unwrap();
        assert_eq!(input.len(), 78);
        assert_eq!(input.0[77], 60.0);

        let a = pipeline.score(&record, false).unwrap();
        assert_eq!(a.label, 3);
        assert_eq!(a.category, "High Risk of Default");
        assert_eq!(a.severity, 100);

        let calm = FeatureRecord::defaults(&ENQUIRY_SCHEMA);
        let a = pipeline.score(&calm, false).unwrap();
        assert_eq!((a.label, a.category), (0, "Very Low Risk of Default"));
    }

    #[test]
    fn missing_model_degrades_without_panicking() {
        let adapter = ModelAdapter::load("no/such/dir/model.json");
        let pipeline = Pipeline::new(Profile::Direct, &adapter).unwrap();
        let record = FeatureRecord::defaults(&DIRECT_SCHEMA);

        for _ in 0..2 {
            let err = pipeline.score(&record, false).unwrap_err();
            assert!(matches!(err, ScoreError::ModelUnavailable { .. }));
            assert!(!err.is_input_error());
        }
    }

    #[test]
    fn input_errors_do_not_poison_later_requests() {
        let adapter = ModelAdapter::with_classifier("model.json", direct_model());
        let pipeline = Pipeline::new(Profile::Direct, &adapter).unwrap();

        let mut bad = FeatureRecord::defaults(&DIRECT_SCHEMA);
        bad.remove("num_std");
        assert!(matches!(
            pipeline.score(&bad, false),
            Err(ScoreError::MissingField { .. })
        ));
        assert!(pipeline.score(&FeatureRecord::defaults(&DIRECT_SCHEMA), false).is_ok());
    }

    #[test]
    fn cross_pairing_fails_fast() {
        let adapter = ModelAdapter::with_classifier("model.json", direct_model());
        let err = Pipeline::new(Profile::Expanded, &adapter).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let mut untagged = direct_model();
        untagged.profile = None;
        untagged.feature_names = None;
        let err = check_pairing(Profile::Expanded, &untagged).unwrap_err();
        assert!(err.contains("78"), "{err}");
    }

    #[test]
    fn reordered_feature_names_are_rejected() {
        let mut model = direct_model();
        if let Some(names) = model.feature_names.as_mut() {
            names.swap(0, 1);
        }
        let err = check_pairing(Profile::Direct, &model).unwrap_err();
        assert!(err.contains("column 0"), "{err}");
    }

    #[test]
    fn batch_scores_rows_independently() {
        let adapter = ModelAdapter::with_classifier("model.json", direct_model());
        let pipeline = Pipeline::new(Profile::Direct, &adapter).unwrap();

        let good = FeatureRecord::defaults(&DIRECT_SCHEMA);
        let mut bad = good.clone();
        bad.set("tot_enq", "n/a");
        let rows: Vec<BatchRow> = (0..20)
            .map(|i| BatchRow {
                line: i + 2,
                record: if i % 5 == 3 { bad.clone() } else { good.clone() },
            })
            .collect();

        let scored = score_batch(&pipeline, &rows, false);
        assert_eq!(scored.len(), 20);
        for (i, s) in scored.iter().enumerate() {
            assert_eq!(s.line, i + 2);
            if i % 5 == 3 {
                assert!(matches!(s.outcome, Err(ScoreError::NonNumeric { .. })));
            } else {
                assert_eq!(s.outcome.as_ref().map(|a| a.label), Ok(1));
            }
        }
    }

    #[test]
    fn batch_rows_outside_field_ranges_are_rejected() {
        let adapter = ModelAdapter::with_classifier("model.json", direct_model());
        let pipeline = Pipeline::new(Profile::Direct, &adapter).unwrap();

        let mut wild = FeatureRecord::defaults(&DIRECT_SCHEMA);
        wild.set("NETMONTHLYINCOME", "-900000");
        wild.set("recent_level_of_deliq", "55");
        let rows = vec![
            BatchRow {
                line: 2,
                record: wild,
            },
            BatchRow {
                line: 3,
                record: FeatureRecord::defaults(&DIRECT_SCHEMA),
            },
        ];

        let scored = score_batch(&pipeline, &rows, false);
        match &scored[0].outcome {
            Err(err @ ScoreError::OutOfRange { field, value, .. }) => {
                assert_eq!(field, "NETMONTHLYINCOME");
                assert_eq!(*value, -900_000.0);
                assert!(err.is_input_error());
            }
            other => panic!("expected OutOfRange, got {other:?}"),
        }
        assert_eq!(scored[1].outcome.as_ref().map(|a| a.label), Ok(1));
    }

    #[test]
    fn bundled_demo_models_pair_with_their_profiles() {
        let demos = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos");
        for (profile, file, expected) in [
            (Profile::Direct, "direct_model.json", 1),
            (Profile::Expanded, "expanded_model.json", 0),
        ] {
            let adapter = ModelAdapter::load(demos.join(file));
            assert!(adapter.is_loaded(), "{file}: {:?}", adapter.load_error());
            let pipeline = Pipeline::new(profile, &adapter).unwrap();
            let a = pipeline
                .score(&FeatureRecord::defaults(profile.schema()), false)
                .unwrap();
            assert_eq!(a.label, expected, "{file}");
            assert!(pipeline.risk_table().contains(a.label));
        }
    }

    #[test]
    fn novel_labels_read_as_unknown() {
        let mut model = direct_model();
        model.classes = vec![1, 2, 7];
        let adapter = ModelAdapter::with_classifier("model.json", model);
        let pipeline = Pipeline::new(Profile::Direct, &adapter).unwrap();

        let mut record = FeatureRecord::defaults(&DIRECT_SCHEMA);
        record.set("recent_level_of_deliq", 9.0);
        record.set("NETMONTHLYINCOME", 10_000.0);
        let a = pipeline.score(&record, false).unwrap();
        assert_eq!(a.label, 7);
        assert_eq!(a.category, UNKNOWN_RISK_LEVEL);
        assert_eq!(a.severity, 100);
    }
}
