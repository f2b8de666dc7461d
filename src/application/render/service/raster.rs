use std::{ffi::OsString, path::PathBuf};

use crate::application::render::types::{RasterRenderer, RenderError};

use super::run_cli;

/// SVG-to-PNG renderer using the `rsvg-convert` calling convention:
/// `<cli> --zoom <scale> --format png <input.svg>` with PNG on stdout.
#[derive(Debug, Clone)]
pub struct CommandRasterRenderer {
    cli_path: PathBuf,
}

impl CommandRasterRenderer {
    pub fn new(cli_path: PathBuf) -> Self {
        Self { cli_path }
    }
}

impl RasterRenderer for CommandRasterRenderer {
    fn render_png(&self, svg: &str, scale: f32) -> Result<Vec<u8>, RenderError> {
        let args = [
            OsString::from("--zoom"),
            OsString::from(scale.to_string()),
            OsString::from("--format"),
            OsString::from("png"),
        ];
        run_cli(
            "raster::render_png",
            &self.cli_path,
            &args,
            svg.as_bytes(),
            ".svg",
        )
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::application::render::service::test_support::write_script;

    #[test]
    fn returns_stdout_bytes_and_passes_zoom() {
        let dir = TempDir::new().expect("temp dir");
        let args_path = dir.path().join("args.log");
        let script = write_script(
            dir.path(),
            "fake-rsvg-convert",
            &format!(
                "#!/bin/sh\necho \"$@\" > \"{}\"\nprintf 'PNGDATA'\n",
                args_path.display()
            ),
        );

        let renderer = CommandRasterRenderer::new(script);
        let png = renderer.render_png("<svg/>", 2.5).expect("png");

        assert_eq!(png, b"PNGDATA");
        let args = fs::read_to_string(args_path).expect("args");
        assert!(
            args.starts_with("--zoom 2.5 --format png "),
            "unexpected args: {args}"
        );
        assert!(args.trim_end().ends_with(".svg"), "unexpected args: {args}");
    }

    #[test]
    fn surfaces_cli_errors() {
        let dir = TempDir::new().expect("temp dir");
        let script = write_script(
            dir.path(),
            "fake-rsvg-convert",
            "#!/bin/sh\necho \"cannot parse svg\" >&2\nexit 1\n",
        );

        let renderer = CommandRasterRenderer::new(script);
        let err = renderer.render_png("<svg", 2.0).expect_err("cli failure");
        assert!(matches!(err, RenderError::Cli { exit_code: Some(1), .. }));
    }
}
