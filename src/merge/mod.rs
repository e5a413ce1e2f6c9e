//! Merge orchestration.
//!
//! Responsibilities:
//!
//! - validate row selections and aggregate raw columns (`aggregate`)
//! - classify aggregates as detections or upper limits (`classify`)
//! - apply remove/insert policy on light-curve datasets (`lightcurve`)
//! - merge upper-limit tables band by band (`bands`)

pub mod aggregate;
pub mod bands;
pub mod classify;
pub mod lightcurve;

pub use aggregate::*;
pub use bands::*;
pub use classify::*;
pub use lightcurve::*;
