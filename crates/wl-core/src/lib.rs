//! wl-core: shared foundation for waterleak.
//!
//! Contains:
//! - units (uom SI types + hydraulic constructors)
//! - numeric (tolerances + float helpers)
//! - ids (compact IDs for network objects)
//! - timing (wall-clock budgets)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod timing;
pub mod units;

pub use error::{WlError, WlResult};
pub use ids::*;
pub use numeric::*;
pub use timing::{Budget, Stopwatch};
pub use units::*;
