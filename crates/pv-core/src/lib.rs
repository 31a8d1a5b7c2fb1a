//! pv-core: shared foundation for pulseval.
//!
//! Contains:
//! - numeric (Real + tolerances + RMS and cycle arithmetic)
//! - ids (boundary subdomain ids, wall reserved)
//! - timing (named stopwatches reported at the end of a run)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod timing;

pub use error::{CoreError, CoreResult};
pub use ids::SubdomainId;
pub use numeric::*;
pub use timing::{TimeControl, WatchReport};
