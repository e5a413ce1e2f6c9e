//! Data generation utilities.

pub mod synth;

pub use synth::*;
