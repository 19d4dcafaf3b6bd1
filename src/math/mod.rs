//! Numeric transforms applied between assembly and model invocation.

pub mod interactions;

pub use interactions::*;
