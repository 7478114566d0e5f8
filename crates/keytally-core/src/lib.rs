//! Shared vocabulary for the keytally keypad bridge.
//!
//! Everything the other crates agree on lives here: wire tokens and timings
//! in [`constants`], the validated button/layer/color types in [`types`] and
//! the small [`Error`] type returned when one of those types is built from
//! untrusted input.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
