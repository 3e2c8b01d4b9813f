//! CLI command implementations.

pub mod batch;
pub mod cache;
pub mod common;
pub mod exif;
pub mod lookup;
