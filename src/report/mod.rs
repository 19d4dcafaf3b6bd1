//! Reporting utilities: risk interpretation and formatted terminal output.

pub mod format;
pub mod interpret;

pub use format::*;
pub use interpret::*;
