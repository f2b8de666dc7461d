//! Infrastructure adapters and runtime bootstrap.

pub mod archive;
pub mod documents;
pub mod error;
pub mod scratch;
pub mod telemetry;
