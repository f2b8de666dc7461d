//! Convert MathML in EPUB containers into inline SVG or embedded PNG.
//!
//! The crate is layered the same way the binary runs: [`infra`] owns the
//! container format, scratch directories and telemetry, [`application`]
//! owns rendering, document rewriting, scheduling and the pipeline driver,
//! and [`domain`] holds the plain data shared between them.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
