//! Per-document rewriting of math nodes into rendered output.

mod scan;
mod style;
mod wrap;

use std::{
    io,
    path::{Path, PathBuf},
    time::Instant,
};

use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    application::render::{MathRenderers, RenderError, RenderedMath},
    domain::{ConversionResult, MathNode, OutputMode},
    infra::telemetry::{DOCUMENTS_CHANGED_TOTAL, NODE_FAILURES_TOTAL, NODES_CONVERTED_TOTAL},
};

pub use scan::scan_math_nodes;
pub use style::{BLOCK_CLASS, INLINE_CLASS, inject_styles};

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("failed to read document `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write document `{path}`: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Rewrite every math node in the document at `path` in place.
///
/// A node whose rendering fails is left exactly as it was. The file is only
/// written when at least one node converted, so documents without math (or
/// with nothing renderable) stay byte-identical. Documents that are not
/// UTF-8 are skipped with a warning.
pub async fn transform_document(
    path: &Path,
    mode: OutputMode,
    renderers: &MathRenderers,
) -> Result<ConversionResult, TransformError> {
    let started_at = Instant::now();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| TransformError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let document = match String::from_utf8(bytes) {
        Ok(document) => document,
        Err(err) => {
            warn!(
                target = "application::transform",
                op = "transform_document",
                path = %path.display(),
                valid_up_to = err.utf8_error().valid_up_to(),
                "Document is not UTF-8; leaving it unchanged"
            );
            return Ok(ConversionResult::unchanged());
        }
    };

    let nodes = scan_math_nodes(&document);
    if nodes.is_empty() {
        return Ok(ConversionResult::unchanged());
    }

    let mut rewritten = String::with_capacity(document.len());
    let mut cursor = 0;
    let mut converted = 0_usize;

    for (index, node) in nodes.iter().enumerate() {
        rewritten.push_str(&document[cursor..node.span.start]);
        match render_node(node, mode, renderers).await {
            Ok(html) => {
                rewritten.push_str(&html);
                converted += 1;
            }
            Err(err) => {
                counter!(NODE_FAILURES_TOTAL).increment(1);
                warn!(
                    target = "application::transform",
                    op = "transform_document",
                    path = %path.display(),
                    node = index,
                    error_code = err.code(),
                    error = %err,
                    "Math node left unconverted"
                );
                rewritten.push_str(&node.markup);
            }
        }
        cursor = node.span.end;
    }
    rewritten.push_str(&document[cursor..]);

    if converted == 0 {
        return Ok(ConversionResult::unchanged());
    }

    let output = inject_styles(&rewritten);
    tokio::fs::write(path, output.as_bytes())
        .await
        .map_err(|source| TransformError::Write {
            path: path.to_path_buf(),
            source,
        })?;

    counter!(NODES_CONVERTED_TOTAL).increment(converted as u64);
    counter!(DOCUMENTS_CHANGED_TOTAL).increment(1);
    debug!(
        target = "application::transform",
        op = "transform_document",
        path = %path.display(),
        nodes = nodes.len(),
        converted,
        elapsed_ms = started_at.elapsed().as_millis() as u64,
        "Document rewritten"
    );

    Ok(ConversionResult::converted(converted))
}

async fn render_node(
    node: &MathNode,
    mode: OutputMode,
    renderers: &MathRenderers,
) -> Result<String, RenderError> {
    let alt_text = node.alt_text.as_deref();
    let rendered = renderers.render(&node.markup, node.display, mode).await?;
    Ok(match rendered {
        RenderedMath::Vector(svg) => wrap::wrap_vector(&svg, node.display, alt_text),
        RenderedMath::Raster(payload) => wrap::wrap_raster(&payload, node.display, alt_text),
    })
}
