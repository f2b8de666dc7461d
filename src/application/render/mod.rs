//! Math rendering collaborators and the facade the transformer talks to.
//!
//! The vector renderer sits behind [`VectorFront`] so a single stateful
//! instance serves every worker. The raster renderer is stateless and runs
//! on the blocking pool. [`MathRenderers::render`] checks the shape of what
//! comes back before the transformer embeds it.

mod runtime;
mod service;
mod types;

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::domain::{DisplayMode, OutputMode};

pub use runtime::VectorFront;
pub use service::{CommandRasterRenderer, CommandVectorRenderer};
pub use types::{RasterRenderer, RenderError, RenderedMath, VectorRenderer};

/// Default upscaling factor applied when rasterising SVG.
pub const DEFAULT_RASTER_SCALE: f32 = 2.0;

/// Renderer handles shared by every document worker.
#[derive(Clone)]
pub struct MathRenderers {
    vector: VectorFront,
    raster: Arc<dyn RasterRenderer>,
    raster_scale: f32,
}

impl MathRenderers {
    pub fn new(vector: VectorFront, raster: Arc<dyn RasterRenderer>, raster_scale: f32) -> Self {
        Self {
            vector,
            raster,
            raster_scale,
        }
    }

    /// Render one math node for the requested output mode.
    ///
    /// Raster output goes through the vector renderer first and rasterises
    /// the resulting SVG.
    pub async fn render(
        &self,
        markup: &str,
        display: DisplayMode,
        mode: OutputMode,
    ) -> Result<RenderedMath, RenderError> {
        let svg = self.vector.render(markup, display).await?;
        let svg = validate_svg(svg)?;

        match mode {
            OutputMode::Vector => Ok(RenderedMath::Vector(svg)),
            OutputMode::Raster => {
                let raster = Arc::clone(&self.raster);
                let scale = self.raster_scale;
                let png = tokio::task::spawn_blocking(move || raster.render_png(&svg, scale))
                    .await
                    .map_err(|err| RenderError::Aborted(err.to_string()))??;
                encode_png(&png).map(RenderedMath::Raster)
            }
        }
    }
}

/// Accept SVG output only when, after whitespace and an optional XML
/// declaration, it opens with an `<svg` tag. The returned string starts at
/// that tag.
pub(crate) fn validate_svg(svg: String) -> Result<String, RenderError> {
    let mut rest = svg.trim_start();
    if rest.starts_with("<?xml") {
        let end = rest
            .find("?>")
            .ok_or_else(|| RenderError::malformed("unterminated XML declaration"))?;
        rest = rest[end + 2..].trim_start();
    }

    let opens_svg = rest
        .get(..4)
        .is_some_and(|head| head.eq_ignore_ascii_case("<svg"))
        && rest[4..]
            .chars()
            .next()
            .is_some_and(|next| next.is_whitespace() || next == '>' || next == '/');
    if !opens_svg {
        return Err(RenderError::malformed("output does not start with <svg>"));
    }

    if rest.len() == svg.len() {
        Ok(svg)
    } else {
        Ok(rest.trim_end().to_string())
    }
}

/// Base64-encode PNG bytes, refusing empty payloads.
pub(crate) fn encode_png(png: &[u8]) -> Result<String, RenderError> {
    if png.is_empty() {
        return Err(RenderError::malformed("raster renderer returned no bytes"));
    }
    Ok(STANDARD.encode(png))
}
