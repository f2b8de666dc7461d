//! Application services: rendering, document rewriting, scheduling and the
//! pipeline that ties them to the container format.

pub mod error;
pub mod pipeline;
pub mod render;
pub mod scheduler;
pub mod transform;
