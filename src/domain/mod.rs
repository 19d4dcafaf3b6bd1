//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the static feature schemas and the `Profile` pairing (`schema`)
//! - input records, feature vectors, and assessments (`types`)

pub mod schema;
pub mod types;

pub use schema::*;
pub use types::*;
