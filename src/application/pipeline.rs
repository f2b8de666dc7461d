//! End-to-end conversion of one container: extract, transform, repack.

use std::{
    fmt, io,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::Instant,
};

use metrics::histogram;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    application::{
        render::MathRenderers,
        scheduler::{SchedulerError, run_bounded},
        transform::{TransformError, transform_document},
    },
    config::PipelineSettings,
    domain::{ConversionResult, OutputMode, PipelineSummary},
    infra::{
        archive::{ArchiveError, extract_container, write_container},
        documents::discover_documents,
        scratch::ScratchArea,
        telemetry::PIPELINE_MS,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Extracting,
    Transforming,
    Repacking,
    Done,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::Extracting => "extracting",
            Phase::Transforming => "transforming",
            Phase::Repacking => "repacking",
            Phase::Done => "done",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input container {path} does not exist")]
    MissingInput { path: PathBuf },
    #[error("output path {path} is the input container")]
    OutputIsInput { path: PathBuf },
    #[error("failed to create scratch area: {0}")]
    Scratch(#[source] io::Error),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("failed to list documents: {0}")]
    Discover(#[from] walkdir::Error),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error("blocking task aborted: {0}")]
    Aborted(String),
    #[error("failed to transform {path}: {source}")]
    Transform {
        path: PathBuf,
        #[source]
        source: TransformError,
    },
}

/// Knobs for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub mode: OutputMode,
    pub concurrency: NonZeroUsize,
    pub scratch_dir: Option<PathBuf>,
}

impl From<&PipelineSettings> for PipelineConfig {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            mode: settings.mode,
            concurrency: settings.concurrency,
            scratch_dir: settings.scratch_dir.clone(),
        }
    }
}

pub struct Pipeline {
    renderers: MathRenderers,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(renderers: MathRenderers, config: PipelineConfig) -> Self {
        Self { renderers, config }
    }

    /// Convert the container at `input` and write the result to `output`.
    ///
    /// The scratch area is removed whether or not the run succeeds. Any
    /// failure aborts the run; there is no partial output.
    pub async fn run(&self, input: &Path, output: &Path) -> Result<PipelineSummary, PipelineError> {
        let started_at = Instant::now();
        info!(
            target = "application::pipeline",
            phase = %Phase::Init,
            input = %input.display(),
            output = %output.display(),
            mode = %self.config.mode,
            concurrency = self.config.concurrency.get(),
            "Starting conversion"
        );

        check_paths(input, output)?;
        let scratch =
            ScratchArea::create(self.config.scratch_dir.as_deref()).map_err(PipelineError::Scratch)?;

        let result = self.run_in(scratch.root(), input, output).await;
        scratch.close();

        let elapsed_ms = started_at.elapsed().as_secs_f64() * 1000.0;
        histogram!(PIPELINE_MS).record(elapsed_ms);

        match &result {
            Ok(summary) => info!(
                target = "application::pipeline",
                phase = %Phase::Done,
                documents = summary.documents,
                documents_changed = summary.documents_changed,
                nodes_converted = summary.nodes_converted,
                elapsed_ms = elapsed_ms as u64,
                "Conversion finished"
            ),
            Err(err) => warn!(
                target = "application::pipeline",
                error = %err,
                elapsed_ms = elapsed_ms as u64,
                "Conversion failed"
            ),
        }

        result
    }

    async fn run_in(
        &self,
        root: &Path,
        input: &Path,
        output: &Path,
    ) -> Result<PipelineSummary, PipelineError> {
        info!(
            target = "application::pipeline",
            phase = %Phase::Extracting,
            root = %root.display(),
            "Extracting container"
        );
        let stats = {
            let input = input.to_path_buf();
            let root = root.to_path_buf();
            tokio::task::spawn_blocking(move || extract_container(&input, &root))
                .await
                .map_err(|err| PipelineError::Aborted(err.to_string()))??
        };
        info!(
            target = "application::pipeline",
            phase = %Phase::Extracting,
            files = stats.files,
            directories = stats.directories,
            bytes = stats.bytes,
            "Container extracted"
        );

        let documents = {
            let root = root.to_path_buf();
            tokio::task::spawn_blocking(move || discover_documents(&root))
                .await
                .map_err(|err| PipelineError::Aborted(err.to_string()))??
        };
        info!(
            target = "application::pipeline",
            phase = %Phase::Transforming,
            documents = documents.len(),
            "Transforming documents"
        );

        let mode = self.config.mode;
        let renderers = self.renderers.clone();
        let results = run_bounded(
            documents.clone(),
            self.config.concurrency.get(),
            move |path: &PathBuf| {
                let path = path.clone();
                let renderers = renderers.clone();
                async move { transform_document(&path, mode, &renderers).await }
            },
        )
        .await?;
        let summary = summarize(root, &documents, results)?;

        info!(
            target = "application::pipeline",
            phase = %Phase::Repacking,
            output = %output.display(),
            "Repacking container"
        );
        let written = {
            let root = root.to_path_buf();
            let output = output.to_path_buf();
            tokio::task::spawn_blocking(move || write_container(&root, &output))
                .await
                .map_err(|err| PipelineError::Aborted(err.to_string()))??
        };
        info!(
            target = "application::pipeline",
            phase = %Phase::Repacking,
            entries = written.entries,
            bytes = written.bytes,
            "Container written"
        );

        Ok(summary)
    }
}

/// Fold per-document results in document order; the first failure wins.
fn summarize(
    root: &Path,
    documents: &[PathBuf],
    results: Vec<Result<ConversionResult, TransformError>>,
) -> Result<PipelineSummary, PipelineError> {
    let mut summary = PipelineSummary::default();
    for (path, result) in documents.iter().zip(results) {
        match result {
            Ok(result) => summary += result,
            Err(source) => {
                let path = path.strip_prefix(root).unwrap_or(path).to_path_buf();
                return Err(PipelineError::Transform { path, source });
            }
        }
    }
    Ok(summary)
}

fn check_paths(input: &Path, output: &Path) -> Result<(), PipelineError> {
    if !input.is_file() {
        return Err(PipelineError::MissingInput {
            path: input.to_path_buf(),
        });
    }

    let same = match (input.canonicalize(), output.canonicalize()) {
        (Ok(input), Ok(output)) => input == output,
        _ => input == output,
    };
    if same {
        return Err(PipelineError::OutputIsInput {
            path: output.to_path_buf(),
        });
    }
    Ok(())
}
