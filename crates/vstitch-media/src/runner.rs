//! External process invocation.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Captured result of one external tool invocation.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit code, `None` if the process was killed by a signal
    pub exit_code: Option<i32>,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
}

impl ProcessOutput {
    /// Whether the tool exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runner for external encoder commands.
///
/// Captures stdout/stderr and reports the raw exit status. A non-zero exit
/// is not an error at this layer; the caller interprets exit status. No
/// timeout is applied unless one is configured with [`with_timeout`].
///
/// [`with_timeout`]: ProcessRunner::with_timeout
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    /// Encoder program name or path
    program: String,
    /// Timeout in seconds, kills the process on expiry
    timeout_secs: Option<u64>,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner {
    /// Create a runner for the default `ffmpeg` binary.
    pub fn new() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            timeout_secs: None,
        }
    }

    /// Use a different program name or path.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// The configured program name.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run the program with the given arguments and capture its output.
    pub async fn run(&self, args: &[String]) -> MediaResult<ProcessOutput> {
        which::which(&self.program)
            .map_err(|_| MediaError::EncoderNotFound(self.program.clone()))?;

        debug!("Running {} {}", self.program, args.join(" "));

        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match self.timeout_secs {
            Some(secs) => {
                match tokio::time::timeout(Duration::from_secs(secs), child.wait_with_output()).await
                {
                    Ok(result) => result?,
                    Err(_) => {
                        // kill_on_drop reaps the child when the future is dropped
                        warn!("{} timed out after {} seconds, killing process", self.program, secs);
                        return Err(MediaError::Timeout(secs));
                    }
                }
            }
            None => child.wait_with_output().await?,
        };

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
