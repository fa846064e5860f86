//! CLI library components for colmap.

pub mod logging;
pub mod review;
pub mod summary;
