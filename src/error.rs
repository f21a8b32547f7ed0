//! Error type for the ocr-bench library.
//!
//! A benchmark run has no notion of partial success: if one document fails to
//! rasterise or one OCR call exits non-zero, the numbers for the whole strategy
//! are meaningless. Every failure is therefore fatal and surfaces as
//! `Err(BenchError)` from [`crate::bench::run_benchmark`].
//!
//! The one class of failure that is *not* represented here is temp-file
//! cleanup: the subprocess strategy removes its scratch directory on drop and
//! ignores whatever the filesystem says about it.

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// All errors returned by the ocr-bench library.
#[derive(Debug, Error)]
pub enum BenchError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The glob pattern is syntactically invalid.
    #[error("Invalid input pattern '{pattern}': {detail}")]
    InvalidPattern { pattern: String, detail: String },

    /// The glob pattern matched no files.
    #[error("No input documents matched '{pattern}'\nCheck the pattern and the working directory.")]
    NoInputs { pattern: String },

    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── External tools ────────────────────────────────────────────────────
    /// An external command could not be located on `PATH`.
    #[error("Required tool '{tool}' was not found: {detail}\n{hint}")]
    ToolNotFound {
        tool: String,
        detail: String,
        hint: &'static str,
    },

    /// An external command ran but exited unsuccessfully.
    #[error("'{tool}' failed ({status}):\n{output}")]
    ToolFailed {
        tool: String,
        status: ExitStatus,
        output: String,
    },

    /// An external command could not be spawned or waited on.
    #[error("Failed to run '{tool}': {source}")]
    ToolSpawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    // ── PDF / image errors ────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// PNG or TIFF encoding of a normalised page failed.
    #[error("Encoding {format} failed: {detail}")]
    EncodeFailed { format: &'static str, detail: String },

    // ── Statistics ────────────────────────────────────────────────────────
    /// A summary was requested over a stage that recorded no samples.
    #[error("No timing samples recorded for the {stage} stage; cannot compute an average")]
    EmptySamples { stage: &'static str },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
The library strategies need a pdfium shared library. Either:\n\
  • install libpdfium somewhere on the system library path, or\n\
  • pass --pdfium-lib /path/to/dir (or set PDFIUM_LIB_PATH).\n"
    )]
    PdfiumBindingFailed(String),

    // ── I/O ───────────────────────────────────────────────────────────────
    /// Scratch I/O (temp dirs, OCR output files) failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BenchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BenchError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_inputs_display() {
        let e = BenchError::NoInputs {
            pattern: "./test_assets/*.pdf".into(),
        };
        assert!(e.to_string().contains("./test_assets/*.pdf"));
    }

    #[test]
    fn empty_samples_display() {
        let e = BenchError::EmptySamples { stage: "ocr" };
        let msg = e.to_string();
        assert!(msg.contains("ocr"), "got: {msg}");
        assert!(msg.contains("average"), "got: {msg}");
    }

    #[test]
    fn tool_not_found_display_includes_hint() {
        let e = BenchError::ToolNotFound {
            tool: "tesseract".into(),
            detail: "cannot find binary path".into(),
            hint: "Install tesseract-ocr.",
        };
        let msg = e.to_string();
        assert!(msg.contains("tesseract"));
        assert!(msg.contains("Install tesseract-ocr."));
    }

    #[test]
    fn io_helper_keeps_path() {
        let e = BenchError::io(
            "/tmp/x.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(e.to_string().contains("/tmp/x.txt"));
    }
}
