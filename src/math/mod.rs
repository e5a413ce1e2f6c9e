//! Mathematical utilities: the count posterior and bracketed bisection.

pub mod posterior;
pub mod root;

pub use posterior::*;
pub use root::*;
