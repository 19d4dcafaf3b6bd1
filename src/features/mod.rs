//! Record → vector assembly and input-boundary validation.

pub mod assemble;

pub use assemble::*;
