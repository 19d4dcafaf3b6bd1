//! `credisense` library crate.
//!
//! The binary (`credisense`) is a thin wrapper around this library so that:
//!
//! - the scoring pipeline is testable without spawning processes or a terminal
//! - the same pipeline backs the form, one-shot scoring, and batch scoring

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod features;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
pub mod tui;
