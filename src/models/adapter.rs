//! Model adapter: loads the artifact once and serves read-only predictions.
//!
//! Loading never aborts the process. A failed load is logged, recorded as a
//! [`ModelLoadError`], and leaves the adapter in a degraded state where every
//! prediction returns [`ScoreError::ModelUnavailable`] without touching a model.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info};

use crate::domain::ClassProbability;
use crate::error::ScoreError;
use crate::models::{Classifier, TreeEnsemble, softmax};

/// Why a model could not be loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadCause {
    /// The file could not be read.
    Io(String),
    /// The file is not a valid artifact document.
    Parse(String),
    /// The document parsed but is structurally unusable.
    Invalid(String),
}

/// Diagnostic for a failed load: path, cause, and the underlying error chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelLoadError {
    pub path: PathBuf,
    pub cause: LoadCause,
    /// Messages of the error's `source()` chain, outermost first.
    pub chain: Vec<String>,
    /// `Debug` form of the outermost error (OS error code, line and column).
    pub detail: String,
}

impl ModelLoadError {
    fn new(path: &Path, cause: LoadCause, err: &dyn std::error::Error) -> Self {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(inner) = source {
            chain.push(inner.to_string());
            source = inner.source();
        }
        Self {
            path: path.to_path_buf(),
            cause,
            chain,
            detail: format!("{err:?}"),
        }
    }

    /// Short reason suitable for a status line.
    pub fn reason(&self) -> &str {
        match &self.cause {
            LoadCause::Io(msg) | LoadCause::Parse(msg) | LoadCause::Invalid(msg) => msg,
        }
    }
}

impl std::fmt::Display for ModelLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.cause {
            LoadCause::Io(_) => "I/O error",
            LoadCause::Parse(_) => "parse error",
            LoadCause::Invalid(_) => "invalid artifact",
        };
        write!(
            f,
            "Error loading model from {}: {kind}: {}",
            self.path.display(),
            self.reason()
        )?;
        for inner in &self.chain {
            write!(f, "\n  caused by: {inner}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ModelLoadError {}

/// Read and validate a tree-ensemble artifact.
pub fn read_ensemble(path: &Path) -> Result<TreeEnsemble, ModelLoadError> {
    let text = fs::read_to_string(path)
        .map_err(|e| ModelLoadError::new(path, LoadCause::Io(e.to_string()), &e))?;
    let model: TreeEnsemble = serde_json::from_str(&text)
        .map_err(|e| ModelLoadError::new(path, LoadCause::Parse(e.to_string()), &e))?;
    model
        .validate()
        .map_err(|e| ModelLoadError::new(path, LoadCause::Invalid(e.to_string()), &e))?;
    Ok(model)
}

/// Process-scoped model handle.
///
/// Constructed once at startup and passed by reference into every pipeline run.
pub struct ModelAdapter {
    path: PathBuf,
    model: Option<Arc<dyn Classifier>>,
    load_error: Option<ModelLoadError>,
}

impl std::fmt::Debug for ModelAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelAdapter")
            .field("path", &self.path)
            .field("loaded", &self.model.is_some())
            .field("load_error", &self.load_error)
            .finish()
    }
}

impl ModelAdapter {
    /// Load the artifact at `path`, recording (not propagating) any failure.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match read_ensemble(path) {
            Ok(model) => {
                info!(
                    path = %path.display(),
                    trees = model.trees.len(),
                    n_features = model.n_features,
                    classes = ?model.classes,
                    "model loaded"
                );
                Self::with_classifier(path, model)
            }
            Err(err) => {
                error!(
                    path = %path.display(),
                    cause = ?err.cause,
                    chain = ?err.chain,
                    detail = %err.detail,
                    "{err}"
                );
                Self {
                    path: path.to_path_buf(),
                    model: None,
                    load_error: Some(err),
                }
            }
        }
    }

    /// Wrap an already-constructed classifier.
    pub fn with_classifier(path: impl AsRef<Path>, model: impl Classifier + 'static) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            model: Some(Arc::new(model)),
            load_error: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn load_error(&self) -> Option<&ModelLoadError> {
        self.load_error.as_ref()
    }

    pub fn classifier(&self) -> Option<&dyn Classifier> {
        self.model.as_deref()
    }

    fn require_model(&self) -> Result<&dyn Classifier, ScoreError> {
        self.model.as_deref().ok_or_else(|| ScoreError::ModelUnavailable {
            path: self.path.clone(),
            reason: self
                .load_error
                .as_ref()
                .map(|e| e.reason().to_string())
                .unwrap_or_else(|| "model not loaded".to_string()),
        })
    }

    /// Predict the label for a single row.
    pub fn predict(&self, row: &[f64]) -> Result<i64, ScoreError> {
        let model = self.require_model()?;
        if row.len() != model.n_features() {
            return Err(ScoreError::Prediction {
                reason: format!(
                    "model expects {} features, got {}",
                    model.n_features(),
                    row.len()
                ),
            });
        }
        model
            .predict_row(row)
            .map_err(|reason| ScoreError::Prediction { reason })
    }

    /// Predict for a single-row batch and return that row's label.
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<i64, ScoreError> {
        self.require_model()?;
        match rows {
            [row] => self.predict(row),
            _ => Err(ScoreError::DimensionMismatch {
                expected: 1,
                actual: rows.len(),
            }),
        }
    }

    /// Softmax over the class margins for a single row.
    pub fn class_probabilities(&self, row: &[f64]) -> Result<Vec<ClassProbability>, ScoreError> {
        let model = self.require_model()?;
        let scores = model
            .class_scores(row)
            .map_err(|reason| ScoreError::Prediction { reason })?;
        Ok(model
            .classes()
            .iter()
            .zip(softmax(&scores))
            .map(|(&label, probability)| ClassProbability { label, probability })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Node;
    use crate::models::ensemble::tests::tiny_model;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("credisense_{}_{name}", std::process::id()))
    }

    struct Failing;

    impl Classifier for Failing {
        fn n_features(&self) -> usize {
            2
        }
        fn classes(&self) -> &[i64] {
            &[1, 2, 3]
        }
        fn class_scores(&self, _row: &[f64]) -> Result<Vec<f64>, String> {
            Err("numerical failure".to_string())
        }
    }

    #[test]
    fn missing_file_leaves_adapter_degraded() {
        let adapter = ModelAdapter::load("definitely/not/here/model.json");
        assert!(!adapter.is_loaded());
        let err = adapter.load_error().unwrap();
        assert!(matches!(err.cause, LoadCause::Io(_)));
        assert!(err.to_string().contains("definitely/not/here/model.json"));
        assert!(err.detail.contains("NotFound"), "{}", err.detail);

        match adapter.predict(&[1.0, 2.0]) {
            Err(ScoreError::ModelUnavailable { path, .. }) => {
                assert_eq!(path, PathBuf::from("definitely/not/here/model.json"));
            }
            other => panic!("expected ModelUnavailable, got {other:?}"),
        }
        assert!(matches!(
            adapter.predict_batch(&[vec![1.0, 2.0]]),
            Err(ScoreError::ModelUnavailable { .. })
        ));
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let path = temp_path("corrupt.json");
        fs::write(&path, "{ not json").unwrap();
        let adapter = ModelAdapter::load(&path);
        let _ = fs::remove_file(&path);
        assert!(matches!(
            adapter.load_error().map(|e| &e.cause),
            Some(LoadCause::Parse(_))
        ));
        let detail = &adapter.load_error().unwrap().detail;
        assert!(detail.contains("line: 1"), "{detail}");
    }

    #[test]
    fn structurally_invalid_file_is_rejected() {
        let path = temp_path("invalid.json");
        let mut model = tiny_model();
        model.trees.clear();
        fs::write(&path, serde_json::to_string(&model).unwrap()).unwrap();
        let adapter = ModelAdapter::load(&path);
        let _ = fs::remove_file(&path);
        assert!(!adapter.is_loaded());
        assert!(matches!(
            adapter.load_error().map(|e| &e.cause),
            Some(LoadCause::Invalid(_))
        ));
    }

    #[test]
    fn loads_and_predicts_from_disk() {
        let path = temp_path("ok.json");
        fs::write(&path, serde_json::to_string_pretty(&tiny_model()).unwrap()).unwrap();
        let adapter = ModelAdapter::load(&path);
        let _ = fs::remove_file(&path);

        assert!(adapter.is_loaded());
        assert!(adapter.load_error().is_none());
        assert_eq!(adapter.predict(&[0.0, 0.0]).unwrap(), 1);
        assert_eq!(adapter.predict_batch(&[vec![8.0, 0.0]]).unwrap(), 3);
        assert_eq!(
            adapter.predict_batch(&[vec![8.0, 0.0], vec![0.0, 0.0]]),
            Err(ScoreError::DimensionMismatch {
                expected: 1,
                actual: 2
            })
        );

        let probs = adapter.class_probabilities(&[8.0, 0.0]).unwrap();
        assert_eq!(probs.len(), 3);
        assert_eq!(probs[2].label, 3);
        assert!((probs.iter().map(|p| p.probability).sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn invocation_failures_are_prediction_errors() {
        let adapter = ModelAdapter::with_classifier("stub", tiny_model());
        assert!(matches!(
            adapter.predict(&[1.0, 2.0, 3.0]),
            Err(ScoreError::Prediction { .. })
        ));
        assert!(matches!(
            adapter.predict_batch(&[]),
            Err(ScoreError::DimensionMismatch { expected: 1, actual: 0 })
        ));

        let mut broken = tiny_model();
        broken.trees[0].nodes = vec![Node::split(0, 5.0, 1, 9), Node::leaf(1.0)];
        let broken = ModelAdapter::with_classifier("stub", broken);
        assert!(matches!(
            broken.predict(&[50.0, 0.0]),
            Err(ScoreError::Prediction { .. })
        ));
        assert!(matches!(
            broken.class_probabilities(&[50.0, 0.0]),
            Err(ScoreError::Prediction { .. })
        ));

        let failing = ModelAdapter::with_classifier("stub", Failing);
        assert_eq!(
            failing.predict(&[1.0, 2.0]),
            Err(ScoreError::Prediction {
                reason: "numerical failure".to_string()
            })
        );
    }
}
