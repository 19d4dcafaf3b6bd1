//! Degree-2, interaction-only polynomial expansion.
//!
//! For inputs `x[0..n]` the output is:
//!
//! ```text
//! [x0, x1, ..., x(n-1), x0*x1, x0*x2, ..., x0*x(n-1), x1*x2, ..., x(n-2)*x(n-1)]
//! ```
//!
//! i.e. the original terms followed by every product of distinct features in
//! lexicographic `(i, j)` order with `i < j`. There are no squares and no bias
//! column. The paired model was trained on exactly this column order.

use crate::error::ScoreError;

/// Output length for `n` inputs: `n + n(n-1)/2`.
pub const fn expanded_len(n: usize) -> usize {
    n + n * n.saturating_sub(1) / 2
}

/// Expand `values` into first-order terms plus pairwise interactions.
pub fn expand_interactions(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut out = Vec::with_capacity(expanded_len(n));
    out.extend_from_slice(values);
    for i in 0..n {
        for j in (i + 1)..n {
            out.push(values[i] * values[j]);
        }
    }
    out
}

/// Expand after checking the input has the length the profile was trained on.
pub fn expand_checked(values: &[f64], expected: usize) -> Result<Vec<f64>, ScoreError> {
    if values.len() != expected {
        return Err(ScoreError::DimensionMismatch {
            expected,
            actual: values.len(),
        });
    }
    Ok(expand_interactions(values))
}

/// Column names matching [`expand_interactions`], joined the way
/// scikit-learn's `PolynomialFeatures` names them (`"a b"`).
pub fn interaction_names(names: &[&str]) -> Vec<String> {
    let n = names.len();
    let mut out: Vec<String> = names.iter().map(|s| s.to_string()).collect();
    out.reserve(expanded_len(n) - n);
    for i in 0..n {
        for j in (i + 1)..n {
            out.push(format!("{} {}", names[i], names[j]));
        }
    }
    out
}
