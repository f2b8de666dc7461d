use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use crate::domain::OutputMode;

/// Command-line arguments for the epubmath binary.
#[derive(Debug, Parser)]
#[command(
    name = "epubmath",
    version,
    about = "Render MathML in EPUB documents to SVG or PNG"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "EPUBMATH_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Convert every math node of an EPUB container and write a new container.
    Convert(ConvertArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ConvertArgs {
    /// Input EPUB container.
    #[arg(value_name = "INPUT", value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Output path; defaults to `<input-stem>.<mode>.epub` next to the input.
    #[arg(value_name = "OUTPUT", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ConvertOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ConvertOverrides {
    /// Output mode for converted math (vector|raster).
    #[arg(long = "mode", value_name = "MODE")]
    pub mode: Option<OutputMode>,

    /// Maximum number of documents transformed at once.
    #[arg(long = "concurrency", value_name = "COUNT")]
    pub concurrency: Option<usize>,

    /// Upscaling factor applied when rasterising SVG.
    #[arg(long = "raster-scale", value_name = "FACTOR")]
    pub raster_scale: Option<f32>,

    /// Override the MathML-to-SVG CLI executable.
    #[arg(long = "vector-cli", value_name = "PATH", value_hint = ValueHint::ExecutablePath)]
    pub vector_cli_path: Option<PathBuf>,

    /// Override the SVG-to-PNG CLI executable.
    #[arg(long = "raster-cli", value_name = "PATH", value_hint = ValueHint::ExecutablePath)]
    pub raster_cli_path: Option<PathBuf>,

    /// Parent directory for the per-run scratch area.
    #[arg(long = "scratch-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub scratch_dir: Option<PathBuf>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}
