//! Async runner for external tool invocations.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use kino_common::{Error, Result};
use tokio::process::Command;

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    /// Standard output, lossy UTF-8.
    pub stdout: String,
    /// Standard error, lossy UTF-8.
    pub stderr: String,
}

/// Builder for a single external process run.
///
/// ```no_run
/// use kino_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> kino_common::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .args(["-v", "error", "-show_entries", "format=duration"])
///     .arg("/mnt/usb/Movies/Action/My_Clip.mp4")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Maximum execution time; the child is killed when it elapses.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tool`] if spawning fails, the process exits with a
    /// non-zero status (message includes stderr), or the timeout expires.
    pub async fn execute(&self) -> Result<ToolOutput> {
        let program_name = self
            .program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string());

        tracing::trace!(tool = %program_name, args = ?self.args, "Running tool");

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(Error::tool(
                    program_name,
                    format!("I/O error waiting for process: {e}"),
                ))
            }
            // The dropped future drops the child, which kills it.
            Err(_elapsed) => {
                return Err(Error::tool(
                    program_name,
                    format!("timed out after {:?}", self.timeout),
                ))
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();

        if !output.status.success() {
            return Err(Error::tool(
                program_name,
                format!("exited with status {}: {}", output.status, stderr.trim()),
            ));
        }

        Ok(ToolOutput {
            status: output.status,
            stdout,
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn execute_echo() {
        let output = ToolCommand::new(PathBuf::from("echo"))
            .arg("hello")
            .execute()
            .await;

        // Minimal environments may lack echo.
        if let Ok(out) = output {
            assert!(out.status.success());
            assert_eq!(out.stdout.trim(), "hello");
        }
    }

    #[tokio::test]
    async fn execute_nonexistent_tool() {
        let err = ToolCommand::new(PathBuf::from("nonexistent_tool_xyz_12345"))
            .execute()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to spawn"), "{err}");
    }

    #[tokio::test]
    async fn nonzero_exit_is_an_error() {
        let result = ToolCommand::new(PathBuf::from("false")).execute().await;
        assert!(matches!(result, Err(Error::Tool { .. })));
    }

    #[tokio::test]
    async fn streams_are_captured_separately() {
        let output = ToolCommand::new(PathBuf::from("sh"))
            .args(["-c", "echo warn >&2; echo 30.0"])
            .execute()
            .await;

        if let Ok(out) = output {
            assert_eq!(out.stdout, "30.0\n");
            assert_eq!(out.stderr, "warn\n");
        }
    }

    #[tokio::test]
    async fn timeout_fires() {
        let result = ToolCommand::new(PathBuf::from("sleep"))
            .arg("10")
            .timeout(Duration::from_millis(100))
            .execute()
            .await;
        let err = result.unwrap_err().to_string();
        assert!(
            err.contains("timed out") || err.contains("failed to spawn"),
            "unexpected error: {err}"
        );
    }
}
