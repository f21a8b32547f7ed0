//! ImageMagick `convert` wrapper for the subprocess strategy.
//!
//! Each document gets a fresh [`ScratchDir`] (`tess_*` under the system temp
//! directory). `convert` writes `page-000.png`, `page-001.png`, … into it and
//! tesseract drops its `.txt` output next to each PNG. The directory and
//! everything in it is removed when the guard drops, whether the document
//! succeeded or not; removal errors are ignored.

use crate::config::RasterOptions;
use crate::error::BenchError;
use crate::pipeline::tool;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

/// Output pattern handed to `convert`; `%03d` is the 0-based page index.
pub const PAGE_PATTERN: &str = "page-%03d.png";

const INSTALL_HINT: &str =
    "Install ImageMagick (and Ghostscript for PDF input), or pass --convert-bin.";

/// A located `convert` executable.
#[derive(Debug, Clone)]
pub struct ConvertCommand {
    program: PathBuf,
}

impl ConvertCommand {
    /// Use `program` as-is, without checking it exists.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Resolve `program` on `PATH` first so a missing tool fails before any
    /// timing starts.
    pub fn locate(program: &Path) -> Result<Self, BenchError> {
        tool::locate(program, INSTALL_HINT).map(Self::new)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Rasterise `input` into `scratch`, one PNG per page.
    pub async fn rasterize(
        &self,
        opts: &RasterOptions,
        input: &Path,
        scratch: &ScratchDir,
    ) -> Result<(), BenchError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(convert_args(opts, input, &scratch.output_pattern()));
        tool::run_checked(cmd, "convert").await?;
        Ok(())
    }
}

/// The `convert` argument vector, options first, then input and output.
pub fn convert_args(opts: &RasterOptions, input: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-depth".into(),
        opts.depth.to_string().into(),
        "-density".into(),
        opts.density.to_string().into(),
        "-background".into(),
        opts.background.to_magick_arg().into(),
    ];
    if opts.remove_alpha {
        args.push("+matte".into());
    }
    if opts.grayscale {
        args.push("-colorspace".into());
        args.push("Gray".into());
    }
    args.push(input.into());
    args.push(output.into());
    args
}

/// Per-document scratch directory, removed on drop.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    pub fn new() -> Result<Self, BenchError> {
        let dir = TempDir::with_prefix("tess_")
            .map_err(|e| BenchError::io(std::env::temp_dir(), e))?;
        debug!("Created scratch dir {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn output_pattern(&self) -> PathBuf {
        self.dir.path().join(PAGE_PATTERN)
    }

    /// PNG files `convert` produced, in page order.
    pub fn page_images(&self) -> Result<Vec<PathBuf>, BenchError> {
        let entries =
            std::fs::read_dir(self.path()).map_err(|e| BenchError::io(self.path(), e))?;

        let mut pngs = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| BenchError::io(self.path(), e))?.path();
            if path.extension().is_some_and(|ext| ext == "png") {
                pngs.push(path);
            }
        }
        pngs.sort_by_key(|p| (page_index(p), p.clone()));
        Ok(pngs)
    }
}

/// Page number in `page-NNN.png`. `%03d` only pads to three digits, so
/// `page-1000.png` would sort before `page-101.png` as a plain string.
fn page_index(path: &Path) -> Option<u32> {
    path.file_stem()?
        .to_str()?
        .strip_prefix("page-")?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Background, SubprocessMethod};

    fn args_as_strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn current_preset_args() {
        let args = convert_args(
            &SubprocessMethod::Current.raster_options(),
            Path::new("doc.pdf"),
            Path::new("/tmp/tess_x/page-%03d.png"),
        );
        assert_eq!(
            args_as_strings(args),
            vec![
                "-depth", "4", "-density", "300", "-background", "white", "+matte", "doc.pdf",
                "/tmp/tess_x/page-%03d.png",
            ]
        );
    }

    #[test]
    fn grayscale_preset_adds_colorspace() {
        let args = args_as_strings(convert_args(
            &SubprocessMethod::Grayscale.raster_options(),
            Path::new("in.pdf"),
            Path::new("out.png"),
        ));
        let pos = args.iter().position(|a| a == "-colorspace").unwrap();
        assert_eq!(args[pos + 1], "Gray");
        assert_eq!(args[args.len() - 2..].to_vec(), vec!["in.pdf", "out.png"]);
    }

    #[test]
    fn custom_background_without_alpha_removal() {
        let opts = RasterOptions {
            depth: 8,
            density: 200,
            background: Background::Rgb(0, 0x80, 0xff),
            remove_alpha: false,
            grayscale: false,
        };
        let args = args_as_strings(convert_args(&opts, Path::new("a"), Path::new("b")));
        assert!(args.contains(&"#0080ff".to_string()));
        assert!(!args.contains(&"+matte".to_string()));
    }

    #[test]
    fn scratch_dir_lists_pngs_in_order_and_cleans_up() {
        let scratch = ScratchDir::new().unwrap();
        let root = scratch.path().to_path_buf();
        assert!(root
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("tess_"));

        for name in ["page-002.png", "page-000.png", "page-001.png", "page-000.txt"] {
            std::fs::write(root.join(name), b"x").unwrap();
        }
        let names: Vec<_> = scratch
            .page_images()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["page-000.png", "page-001.png", "page-002.png"]);

        drop(scratch);
        assert!(!root.exists());
    }

    #[test]
    fn pages_past_999_keep_numeric_order() {
        let scratch = ScratchDir::new().unwrap();
        for name in ["page-1000.png", "page-101.png", "page-100.png", "page-999.png"] {
            std::fs::write(scratch.path().join(name), b"x").unwrap();
        }
        let names: Vec<_> = scratch
            .page_images()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["page-100.png", "page-101.png", "page-999.png", "page-1000.png"]
        );
    }

    #[test]
    fn scratch_dirs_are_unique() {
        let a = ScratchDir::new().unwrap();
        let b = ScratchDir::new().unwrap();
        assert_ne!(a.path(), b.path());
    }
}
