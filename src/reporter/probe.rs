//! Probe: one-shot diagnostic run against the DEP API
//!
//! The production probe shells out to `mdmclient dep nag`. The trait lets the
//! poll loop run against canned output in tests.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::ProbeError;

/// Default location of the macOS MDM client
pub const DEFAULT_MDMCLIENT: &str = "/usr/libexec/mdmclient";

/// Raw result of one probe run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutput {
    /// Combined output: all of stdout, then all of stderr
    ///
    /// Writes interleaved across the two streams are not preserved, so when
    /// several `Code=` markers appear the one printed to stdout decides.
    pub text: String,

    /// Whether the command exited with status zero
    pub success: bool,
}

impl ProbeOutput {
    pub fn new(text: impl Into<String>, success: bool) -> Self {
        Self {
            text: text.into(),
            success,
        }
    }
}

/// Source of raw diagnostic text
#[async_trait]
pub trait Probe: Send + Sync {
    /// Run the diagnostic once
    ///
    /// Fails only when the diagnostic could not be run to completion.
    async fn run(&self) -> Result<ProbeOutput, ProbeError>;
}

/// Runs an external command with a hard timeout
#[derive(Debug, Clone)]
pub struct CommandProbe {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandProbe {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout,
        }
    }

    /// `<program> dep nag`
    pub fn mdmclient(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self::new(program, ["dep", "nag"], timeout)
    }

    /// `mdmclient dep nag` at the default path with a two minute timeout
    pub fn with_defaults() -> Self {
        Self::mdmclient(DEFAULT_MDMCLIENT, Duration::from_secs(120))
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Probe for CommandProbe {
    async fn run(&self) -> Result<ProbeOutput, ProbeError> {
        let child = self.command().spawn().map_err(ProbeError::Launch)?;

        // Dropping the future on timeout kills the child.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ProbeError::Timeout(self.timeout))?
            .map_err(ProbeError::Launch)?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        log_exit(&self.program, output.status);

        Ok(ProbeOutput::new(text, output.status.success()))
    }
}

fn log_exit(program: &std::path::Path, status: ExitStatus) {
    if !status.success() {
        tracing::warn!(
            program = %program.display(),
            status = %status,
            "Probe exited with non-zero status"
        );
    }
}
