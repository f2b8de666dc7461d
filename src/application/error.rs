use std::error::Error as StdError;

use thiserror::Error;

use crate::{application::pipeline::PipelineError, config::LoadError, infra::error::InfraError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl AppError {
    /// Short machine-friendly label used in structured logs.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Infra(InfraError::Telemetry(_)) => "telemetry",
            AppError::Infra(InfraError::Io(_)) => "io",
            AppError::Pipeline(PipelineError::MissingInput { .. }) => "missing_input",
            AppError::Pipeline(PipelineError::OutputIsInput { .. }) => "output_is_input",
            AppError::Pipeline(PipelineError::Archive(err)) if err.is_unsafe_path() => {
                "unsafe_path"
            }
            AppError::Pipeline(PipelineError::Archive(_)) => "archive",
            AppError::Pipeline(PipelineError::Transform { .. }) => "transform",
            AppError::Pipeline(_) => "pipeline",
        }
    }

    /// The error message followed by every message in its source chain.
    pub fn messages(&self) -> Vec<String> {
        let mut messages = vec![self.to_string()];
        let mut current = self.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        messages
    }
}
