//! Classifier artifacts and the adapter that owns the loaded model.
//!
//! - `ensemble`: the JSON tree-ensemble format and its inference
//! - `adapter`: load-once, read-only handle used by every pipeline run

pub mod adapter;
pub mod ensemble;

pub use adapter::*;
pub use ensemble::*;

use crate::domain::Profile;

/// A trained classifier with a fixed input arity.
///
/// Implementations are immutable after construction, so a single instance can be
/// shared by reference across threads.
pub trait Classifier: Send + Sync {
    fn n_features(&self) -> usize;

    /// Class labels, in the order `class_scores` reports them.
    fn classes(&self) -> &[i64];

    /// Column names the model was trained on, if recorded.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// Profile the model was trained for, if recorded.
    fn profile(&self) -> Option<Profile> {
        None
    }

    /// One score (margin) per class.
    fn class_scores(&self, row: &[f64]) -> Result<Vec<f64>, String>;

    /// Label of the highest-scoring class. Ties go to the earlier class.
    fn predict_row(&self, row: &[f64]) -> Result<i64, String> {
        let scores = self.class_scores(row)?;
        let mut best: Option<(usize, f64)> = None;
        for (i, &s) in scores.iter().enumerate() {
            if best.is_none_or(|(_, b)| s > b) {
                best = Some((i, s));
            }
        }
        let (idx, _) = best.ok_or_else(|| "model produced no class scores".to_string())?;
        self.classes()
            .get(idx)
            .copied()
            .ok_or_else(|| format!("class index {idx} has no label"))
    }
}
