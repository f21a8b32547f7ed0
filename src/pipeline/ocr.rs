//! OCR stage: hand an image to tesseract and get text back.
//!
//! The benchmark only measures how long recognition takes; callers log the
//! text length and drop the text.

use crate::error::BenchError;
use crate::pipeline::tool;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

const INSTALL_HINT: &str = "Install tesseract-ocr with the required language data, or pass --tesseract-bin.";

/// Something that turns an image into text.
pub trait OcrEngine: Send + Sync {
    /// Recognise an image stored on disk.
    fn recognize_file(&self, image: &Path) -> impl Future<Output = Result<String, BenchError>> + Send;

    /// Recognise an encoded image (PNG, multi-page TIFF, …) held in memory.
    fn recognize_blob(&self, blob: &[u8]) -> impl Future<Output = Result<String, BenchError>> + Send;
}

/// [`OcrEngine`] that runs the `tesseract` command once per call.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    program: PathBuf,
    language: String,
}

impl TesseractCli {
    /// Use `program` as-is, without checking it exists.
    pub fn new(program: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            language: language.into(),
        }
    }

    /// Resolve `program` on `PATH` first so a missing tool fails before any
    /// timing starts.
    pub fn locate(program: &Path, language: &str) -> Result<Self, BenchError> {
        tool::locate(program, INSTALL_HINT).map(|p| Self::new(p, language))
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// `tesseract <image> <base> -l <lang>` writes `<base>.txt`.
    pub fn file_args(&self, image: &Path) -> (PathBuf, Vec<std::ffi::OsString>) {
        let base = image.with_extension("");
        let args = vec![
            image.as_os_str().to_owned(),
            base.as_os_str().to_owned(),
            "-l".into(),
            self.language.clone().into(),
        ];
        (base.with_extension("txt"), args)
    }

    /// `tesseract stdin stdout -l <lang>`.
    pub fn blob_args(&self) -> Vec<String> {
        vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.language.clone(),
        ]
    }
}

impl OcrEngine for TesseractCli {
    async fn recognize_file(&self, image: &Path) -> Result<String, BenchError> {
        let (text_path, args) = self.file_args(image);
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        tool::run_checked(cmd, "tesseract").await?;

        let text = tokio::fs::read_to_string(&text_path)
            .await
            .map_err(|e| BenchError::io(&text_path, e))?;
        debug!("tesseract {} → {} chars", image.display(), text.len());
        Ok(text)
    }

    async fn recognize_blob(&self, blob: &[u8]) -> Result<String, BenchError> {
        let spawn_err = |source| BenchError::ToolSpawn {
            tool: "tesseract".to_string(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(self.blob_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_err)?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| BenchError::Internal("tesseract stdin not captured".into()))?;

        // Feed stdin while draining stdout/stderr so neither pipe can fill up.
        let feed = async move {
            let result = stdin.write_all(blob).await;
            drop(stdin);
            result
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = tool::ensure_success("tesseract", output.map_err(spawn_err)?)?;
        // A closed pipe after a successful exit means tesseract stopped
        // reading early; the exit status already vouches for the result.
        if let Err(e) = fed {
            debug!("tesseract stdin closed early: {}", e);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("tesseract stderr: {}", stderr.trim());
        }
        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("tesseract blob ({} bytes) → {} chars", blob.len(), text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_args_follow_tesseract_convention() {
        let t = TesseractCli::new("tesseract", "eng");
        let (txt, args) = t.file_args(Path::new("/tmp/tess_a/page-001.png"));
        assert_eq!(txt, PathBuf::from("/tmp/tess_a/page-001.txt"));
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec!["/tmp/tess_a/page-001.png", "/tmp/tess_a/page-001", "-l", "eng"]
        );
    }

    #[test]
    fn blob_args_use_stdio() {
        let t = TesseractCli::new("tesseract", "deu+eng");
        assert_eq!(t.blob_args(), vec!["stdin", "stdout", "-l", "deu+eng"]);
        assert_eq!(t.language(), "deu+eng");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn blob_is_piped_through_stdin() {
        // Echo stdin back and ignore the tesseract arguments.
        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("fake-tesseract");
        std::fs::write(&script, "#!/bin/sh\ncat -\n").unwrap();
        make_executable(&script);

        let engine = TesseractCli::new(&script, "eng");
        let text = engine.recognize_blob(b"hello blob").await.unwrap();
        assert_eq!(text, "hello blob");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_engine_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("fake-tesseract");
        std::fs::write(&script, "#!/bin/sh\necho 'Failed loading language' >&2\nexit 1\n").unwrap();
        make_executable(&script);

        let engine = TesseractCli::new(&script, "xxx");
        let err = engine.recognize_blob(b"data").await.unwrap_err();
        match err {
            BenchError::ToolFailed { output, .. } => assert!(output.contains("Failed loading language")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[cfg(unix)]
    fn make_executable(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
}
