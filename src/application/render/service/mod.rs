//! Renderer adapters backed by external executables.
//!
//! Both adapters stage their input in a temporary file, run the configured
//! CLI with that path as the last argument and read the result from stdout.

mod raster;
mod vector;

use std::{
    ffi::OsString,
    io::{ErrorKind, Write},
    path::Path,
    process::{Command, Stdio},
    time::Instant,
};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

pub use raster::CommandRasterRenderer;
pub use vector::CommandVectorRenderer;

use super::types::RenderError;

/// Run `cli args… <input-file>` and return its stdout.
fn run_cli(
    op: &'static str,
    cli_path: &Path,
    args: &[OsString],
    input: &[u8],
    suffix: &str,
) -> Result<Vec<u8>, RenderError> {
    let started_at = Instant::now();

    let mut input_file = tempfile::Builder::new()
        .prefix("epubmath-render-")
        .suffix(suffix)
        .tempfile()
        .map_err(RenderError::Io)?;
    input_file.write_all(input).map_err(RenderError::Io)?;
    input_file.flush().map_err(RenderError::Io)?;

    let output = spawn(cli_path, args, &input_file).map_err(|err| {
        warn!(
            target = "application::render::cli",
            op,
            result = "error",
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            cli_path = %cli_path.display(),
            error_code = "spawn_cli",
            error = %err,
            "Failed to spawn renderer CLI"
        );
        if err.kind() == ErrorKind::NotFound {
            RenderError::NotFound(err)
        } else {
            RenderError::Io(err)
        }
    })?;

    if !output.status.success() {
        let exit_code = output.status.code();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        warn!(
            target = "application::render::cli",
            op,
            result = "error",
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            exit_code = exit_code.map(i64::from).unwrap_or(-1),
            error_code = "renderer_cli",
            stderr = %stderr,
            "Renderer CLI invocation failed"
        );
        return Err(RenderError::Cli { exit_code, stderr });
    }

    debug!(
        target = "application::render::cli",
        op,
        result = "ok",
        elapsed_ms = started_at.elapsed().as_millis() as u64,
        output_bytes = output.stdout.len(),
        "Renderer CLI finished"
    );
    Ok(output.stdout)
}

fn spawn(
    cli_path: &Path,
    args: &[OsString],
    input_file: &NamedTempFile,
) -> std::io::Result<std::process::Output> {
    Command::new(cli_path)
        .args(args)
        .arg(input_file.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
}
