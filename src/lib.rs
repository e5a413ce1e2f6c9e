//! `lc-merge` library crate.
//!
//! Bin merging and Bayesian rate confidence for light curves: combine
//! selected time bins (or energy-band upper-limit rows) into one aggregate
//! measurement, decide whether the aggregate is a significant detection or
//! an upper limit, and keep a dataset from ever mixing the two.
//!
//! The statistics follow Kraft, Burrows & Nousek (1991): confidence
//! intervals on a Poisson source rate with known background. The client
//! layers that fetch and parse the underlying tables live elsewhere; this
//! crate only consumes parsed rows and mutates caller-owned datasets in
//! place.

pub mod bayes;
pub mod data;
pub mod domain;
pub mod error;
pub mod math;
pub mod merge;
pub mod report;
