//! cg-core: shared foundation for the control graph crates.
//!
//! Contains:
//! - units (uom time/frequency types + constructors for sample periods)
//! - numeric (Real + tolerances + float helpers)
//! - timing (tick duration accumulators)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod timing;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use units::*;
