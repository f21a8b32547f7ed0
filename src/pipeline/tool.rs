//! Helpers shared by the external-command wrappers.

use crate::error::BenchError;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

/// Resolve `program` on `PATH` (or check an explicit path is executable).
pub fn locate(program: &Path, hint: &'static str) -> Result<PathBuf, BenchError> {
    which::which(program).map_err(|e| BenchError::ToolNotFound {
        tool: program.display().to_string(),
        detail: e.to_string(),
        hint,
    })
}

/// Run `cmd` to completion, failing on a non-zero exit status.
///
/// stdout and stderr are both captured; on failure they are joined into the
/// error so the tool's own diagnostic reaches the user.
pub async fn run_checked(mut cmd: Command, tool: &str) -> Result<Output, BenchError> {
    debug!("Running {:?}", cmd.as_std());
    let output = cmd
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| BenchError::ToolSpawn {
            tool: tool.to_string(),
            source,
        })?;
    ensure_success(tool, output)
}

pub(crate) fn ensure_success(tool: &str, output: Output) -> Result<Output, BenchError> {
    if output.status.success() {
        return Ok(output);
    }
    Err(BenchError::ToolFailed {
        tool: tool.to_string(),
        status: output.status,
        output: combined_output(&output),
    })
}

fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stderr);
    }
    text.trim_end().to_string()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn locate_missing_tool() {
        let err = locate(Path::new("definitely-not-a-real-tool-xyz"), "install it").unwrap_err();
        match err {
            BenchError::ToolNotFound { tool, hint, .. } => {
                assert_eq!(tool, "definitely-not-a-real-tool-xyz");
                assert_eq!(hint, "install it");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn locate_finds_sh() {
        assert!(locate(Path::new("sh"), "").is_ok());
    }

    #[tokio::test]
    async fn run_checked_reports_failure_output() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo out; echo err >&2; exit 3"]);
        let err = run_checked(cmd, "sh").await.unwrap_err();
        match err {
            BenchError::ToolFailed { status, output, .. } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(output, "out\nerr");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_checked_returns_stdout() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "printf hello"]);
        let out = run_checked(cmd, "sh").await.unwrap();
        assert_eq!(out.stdout, b"hello");
    }
}
