//! Queue export.

mod snapshot;

pub use snapshot::*;
