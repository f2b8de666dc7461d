use std::{
    path::{Path, PathBuf},
    process,
    sync::Arc,
};

use epubmath::{
    application::{
        error::AppError,
        pipeline::{Pipeline, PipelineConfig},
        render::{CommandRasterRenderer, CommandVectorRenderer, MathRenderers, VectorFront},
    },
    config,
    domain::{OutputMode, PipelineSummary},
    infra::{error::InfraError, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let emit = || {
        error!(
            error = %error,
            error_code = error.code(),
            chain = ?error.messages(),
            "application error"
        );
    };

    if dispatcher::has_been_set() {
        emit();
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, emit);
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        config::Command::Convert(args) => run_convert(settings, args).await,
    }
}

async fn run_convert(settings: config::Settings, args: config::ConvertArgs) -> Result<(), AppError> {
    let mode = settings.pipeline.mode;
    let output = args
        .output
        .unwrap_or_else(|| default_output_path(&args.input, mode));

    let vector = VectorFront::spawn(CommandVectorRenderer::new(
        settings.render.vector_cli_path.clone(),
    ))
    .map_err(InfraError::from)?;
    let raster = Arc::new(CommandRasterRenderer::new(
        settings.render.raster_cli_path.clone(),
    ));
    let renderers = MathRenderers::new(vector, raster, settings.render.raster_scale);

    info!(
        target = "epubmath::convert",
        vector_cli = %settings.render.vector_cli_path.display(),
        raster_cli = %settings.render.raster_cli_path.display(),
        raster_scale = settings.render.raster_scale,
        "Renderers configured"
    );

    let pipeline = Pipeline::new(renderers, PipelineConfig::from(&settings.pipeline));
    let summary = pipeline.run(&args.input, &output).await?;

    println!("{}", summary_line(&summary, &output));
    Ok(())
}

/// `<input-stem>.<mode>.epub` in the input's directory.
fn default_output_path(input: &Path, mode: OutputMode) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}.{}.epub", mode.as_str()))
}

fn summary_line(summary: &PipelineSummary, output: &Path) -> String {
    format!(
        "converted {} math node(s) in {} of {} document(s); wrote {}",
        summary.nodes_converted,
        summary.documents_changed,
        summary.documents,
        output.display()
    )
}
