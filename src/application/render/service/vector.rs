use std::{ffi::OsString, path::PathBuf};

use crate::{
    application::render::types::{RenderError, VectorRenderer},
    domain::DisplayMode,
};

use super::run_cli;

/// MathML-to-SVG renderer invoked as `<cli> [--display] <input.mml>`.
#[derive(Debug, Clone)]
pub struct CommandVectorRenderer {
    cli_path: PathBuf,
}

impl CommandVectorRenderer {
    pub fn new(cli_path: PathBuf) -> Self {
        Self { cli_path }
    }
}

impl VectorRenderer for CommandVectorRenderer {
    fn render_svg(&mut self, markup: &str, display: DisplayMode) -> Result<String, RenderError> {
        let mut args = Vec::new();
        if display.is_block() {
            args.push(OsString::from("--display"));
        }
        let stdout = run_cli(
            "vector::render_svg",
            &self.cli_path,
            &args,
            markup.as_bytes(),
            ".mml",
        )?;
        String::from_utf8(stdout)
            .map_err(|err| RenderError::malformed(format!("SVG output is not UTF-8: {err}")))
    }
}
