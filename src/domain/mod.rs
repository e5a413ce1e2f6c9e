//! Domain types used throughout the merge pipeline.
//!
//! This module defines:
//!
//! - the tagged measurement model (`Kind`, `Measurement`, `Bin`)
//! - the caller-owned containers (`Dataset`, `LightCurve`)
//! - multi-band table rows (`Band`, `BandColumns`, `MultiBandRow`)
//! - the insertion policy enum (`InsertMode`)

pub mod types;

pub use types::*;
