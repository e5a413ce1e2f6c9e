//! Bayesian source-count estimation (Kraft–Burrows–Nousek).

pub mod kbn;

pub use kbn::*;
