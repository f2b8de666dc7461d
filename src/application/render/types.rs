use std::io;

use thiserror::Error;

use crate::domain::DisplayMode;

/// Converts one math-markup fragment into SVG markup.
///
/// Implementations may keep mutable state between calls and are not assumed
/// to be thread-safe; the pipeline drives a single instance through
/// [`VectorFront`](super::VectorFront), which serialises every call.
pub trait VectorRenderer: Send + 'static {
    fn render_svg(&mut self, markup: &str, display: DisplayMode) -> Result<String, RenderError>;
}

impl<F> VectorRenderer for F
where
    F: FnMut(&str, DisplayMode) -> Result<String, RenderError> + Send + 'static,
{
    fn render_svg(&mut self, markup: &str, display: DisplayMode) -> Result<String, RenderError> {
        self(markup, display)
    }
}

/// Rasterises SVG markup into PNG bytes at the given upscaling factor.
pub trait RasterRenderer: Send + Sync + 'static {
    fn render_png(&self, svg: &str, scale: f32) -> Result<Vec<u8>, RenderError>;
}

impl<F> RasterRenderer for F
where
    F: Fn(&str, f32) -> Result<Vec<u8>, RenderError> + Send + Sync + 'static,
{
    fn render_png(&self, svg: &str, scale: f32) -> Result<Vec<u8>, RenderError> {
        self(svg, scale)
    }
}

/// Validated renderer output ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedMath {
    /// SVG markup starting at its root `<svg` tag.
    Vector(String),
    /// Base64-encoded PNG payload.
    Raster(String),
}

/// Failure converting a single math node. Never fatal to a document.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("renderer CLI unavailable: {0}")]
    NotFound(io::Error),
    #[error("failed to exchange data with renderer: {0}")]
    Io(io::Error),
    #[error("renderer CLI invocation failed (exit {exit_code:?}): {stderr}")]
    Cli {
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("renderer returned malformed output: {reason}")]
    Malformed { reason: String },
    #[error("vector renderer is no longer accepting work")]
    FrontClosed,
    #[error("render task aborted: {0}")]
    Aborted(String),
    #[error("{0}")]
    Other(String),
}

impl RenderError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Short machine-friendly label used in structured logs.
    pub fn code(&self) -> &'static str {
        match self {
            RenderError::NotFound(_) => "renderer_not_found",
            RenderError::Io(_) => "renderer_io",
            RenderError::Cli { .. } => "renderer_cli",
            RenderError::Malformed { .. } => "malformed_output",
            RenderError::FrontClosed => "front_closed",
            RenderError::Aborted(_) => "aborted",
            RenderError::Other(_) => "render_failed",
        }
    }
}
