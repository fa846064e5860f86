//! Schema snapshot building and data sampling.

#![deny(unsafe_code)]

mod sample;
mod snapshot;

pub use sample::{DEFAULT_SAMPLE_LIMIT, sample};
pub use snapshot::build_snapshot;
