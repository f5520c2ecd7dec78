//! Builder for executing external tool commands with timeout support.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;

use crate::{Error, Result};

/// Default command timeout: 6 hours. Two-pass encodes of long sources are slow.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(6 * 60 * 60);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl ToolOutput {
    /// Whether the process exited with status 0.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, if the process was not terminated by a signal.
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use passforge_av::ToolCommand;
///
/// # async fn example() -> passforge_av::Result<()> {
/// let output = ToolCommand::new("ffmpeg")
///     .arg("-hide_banner")
///     .arg("-version")
///     .output()
///     .await?;
/// if output.success() {
///     println!("{}", output.stdout);
/// }
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
    /// Create a new command for the given program path.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// The program that will be executed.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The argument vector, excluding the program.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// The configured time budget.
    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Run the command to completion and capture its output, whatever the
    /// exit status.
    ///
    /// The child is killed if the timeout expires.
    ///
    /// # Errors
    ///
    /// - [`Error::Launch`] if the process could not be spawned or waited on.
    /// - [`Error::Timeout`] if the process outlived its time budget.
    pub async fn output(&self) -> Result<ToolOutput> {
        let program_name = self.program_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| Error::launch(&program_name, format!("failed to spawn: {e}")))?;

        // On timeout the wait future is dropped together with the child, and
        // kill_on_drop terminates the process.
        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(ToolOutput {
                status: output.status,
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            }),
            Ok(Err(e)) => Err(Error::launch(
                &program_name,
                format!("I/O error waiting for process: {e}"),
            )),
            Err(_elapsed) => Err(Error::Timeout {
                program: program_name,
                timeout: self.timeout,
            }),
        }
    }
}

impl fmt::Display for ToolCommand {
    /// Shell-like rendering, for logs and dry runs only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) || arg.contains('\'') {
                write!(f, " '{}'", arg.replace('\'', r"'\''"))?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn output_echo() {
        let output = ToolCommand::new("echo").arg("hello").output().await;

        match output {
            Ok(out) => {
                assert!(out.success());
                assert!(out.stdout.trim().contains("hello"));
            }
            Err(_) => {
                // On some minimal environments echo may not exist; skip.
            }
        }
    }

    #[tokio::test]
    async fn output_nonexistent_tool() {
        let result = ToolCommand::new("nonexistent_tool_xyz_12345")
            .output()
            .await;
        assert!(matches!(result, Err(Error::Launch { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn output_keeps_stderr_on_failure() {
        let out = ToolCommand::new("sh")
            .args(["-c", "echo broken >&2; exit 3"])
            .output()
            .await
            .unwrap();

        assert!(!out.success());
        assert_eq!(out.code(), Some(3));
        assert_eq!(out.stderr.trim(), "broken");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_fires() {
        let result = ToolCommand::new("sleep")
            .arg("10")
            .timeout(Duration::from_millis(100))
            .output()
            .await;
        let err = result.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert!(err.to_string().contains("timed out"), "unexpected error: {err}");
    }

    #[test]
    fn display_quotes_whitespace() {
        let mut cmd = ToolCommand::new("ffmpeg");
        cmd.args(["-i", "/media/My Movie.mov", "-y", "out.mp4"]);
        assert_eq!(
            cmd.to_string(),
            "ffmpeg -i '/media/My Movie.mov' -y out.mp4"
        );
    }
}
