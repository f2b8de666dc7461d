//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{num::NonZeroUsize, path::PathBuf, str::FromStr, thread};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::{application::render::DEFAULT_RASTER_SCALE, domain::OutputMode};

pub use cli::{CliArgs, Command, ConvertArgs, ConvertOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "epubmath";
const ENV_PREFIX: &str = "EPUBMATH";
pub(crate) const DEFAULT_VECTOR_CLI_PATH: &str = "mathml2svg";
pub(crate) const DEFAULT_RASTER_CLI_PATH: &str = "rsvg-convert";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub render: RenderSettings,
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub vector_cli_path: PathBuf,
    pub raster_cli_path: PathBuf,
    pub raster_scale: f32,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub mode: OutputMode,
    pub concurrency: NonZeroUsize,
    pub scratch_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match &cli.command {
        Command::Convert(args) => raw.apply_convert_overrides(&args.overrides),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    render: RawRenderSettings,
    pipeline: RawPipelineSettings,
}

impl RawSettings {
    fn apply_convert_overrides(&mut self, overrides: &ConvertOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }

        if let Some(path) = overrides.vector_cli_path.as_ref() {
            self.render.vector_cli_path = Some(path.clone());
        }
        if let Some(path) = overrides.raster_cli_path.as_ref() {
            self.render.raster_cli_path = Some(path.clone());
        }
        if let Some(scale) = overrides.raster_scale {
            self.render.raster_scale = Some(scale);
        }

        if let Some(mode) = overrides.mode {
            self.pipeline.mode = Some(mode.as_str().to_string());
        }
        if let Some(concurrency) = overrides.concurrency {
            self.pipeline.concurrency = Some(concurrency);
        }
        if let Some(dir) = overrides.scratch_dir.as_ref() {
            self.pipeline.scratch_dir = Some(dir.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            render,
            pipeline,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let render = build_render_settings(render)?;
        let pipeline = build_pipeline_settings(pipeline)?;

        Ok(Self {
            logging,
            render,
            pipeline,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let vector_cli_path = render
        .vector_cli_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_VECTOR_CLI_PATH));
    if vector_cli_path.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "render.vector_cli_path",
            "path must not be empty",
        ));
    }

    let raster_cli_path = render
        .raster_cli_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RASTER_CLI_PATH));
    if raster_cli_path.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "render.raster_cli_path",
            "path must not be empty",
        ));
    }

    let raster_scale = render.raster_scale.unwrap_or(DEFAULT_RASTER_SCALE);
    if !raster_scale.is_finite() || raster_scale <= 0.0 {
        return Err(LoadError::invalid(
            "render.raster_scale",
            "must be a finite number greater than zero",
        ));
    }

    Ok(RenderSettings {
        vector_cli_path,
        raster_cli_path,
        raster_scale,
    })
}

fn build_pipeline_settings(pipeline: RawPipelineSettings) -> Result<PipelineSettings, LoadError> {
    let mode = match pipeline.mode {
        Some(mode) => OutputMode::from_str(&mode)
            .map_err(|reason| LoadError::invalid("pipeline.mode", reason))?,
        None => OutputMode::default(),
    };

    let concurrency = match pipeline.concurrency {
        Some(value) => NonZeroUsize::new(value)
            .ok_or_else(|| LoadError::invalid("pipeline.concurrency", "must be greater than zero"))?,
        None => default_concurrency(),
    };

    let scratch_dir = pipeline
        .scratch_dir
        .filter(|dir| !dir.as_os_str().is_empty());

    Ok(PipelineSettings {
        mode,
        concurrency,
        scratch_dir,
    })
}

fn default_concurrency() -> NonZeroUsize {
    thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    vector_cli_path: Option<PathBuf>,
    raster_cli_path: Option<PathBuf>,
    raster_scale: Option<f32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPipelineSettings {
    mode: Option<String>,
    concurrency: Option<usize>,
    scratch_dir: Option<PathBuf>,
}
