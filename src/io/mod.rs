//! Input/output helpers.
//!
//! - record input from JSON, `--set` assignments and batch CSV (`record`)
//! - batch result exports (`export`)

pub mod export;
pub mod record;

pub use export::*;
pub use record::*;
