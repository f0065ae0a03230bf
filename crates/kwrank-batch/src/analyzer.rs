//! Boundary to the external keyword analysis tool.
//!
//! The tool is invoked as `<program> [base args...] analyze <term>
//! [--storefront <code>]` and writes its results into the shared store. A
//! nonzero exit or a timeout is an ordinary per-keyword outcome; only a
//! failure to start the process at all is an error.

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use kwrank_core::AppConfig;
use thiserror::Error;

/// What happened when the tool ran for one keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzeOutcome {
    /// Exit status 0.
    Succeeded { stdout: String },
    /// Nonzero exit. `exit_code` is `None` when the process was killed by a
    /// signal.
    Failed {
        exit_code: Option<i32>,
        stderr: String,
    },
    /// The process was still running after `after` and was killed.
    TimedOut { after: Duration },
}

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("analyzer command is empty")]
    EmptyCommand,

    #[error("failed to start analyzer '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for analyzer '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runs the analysis for one keyword.
pub trait Analyzer: Send + Sync {
    fn analyze(
        &self,
        term: &str,
        storefront: Option<&str>,
    ) -> impl Future<Output = Result<AnalyzeOutcome, AnalyzerError>> + Send;
}

/// [`Analyzer`] backed by a child process with a hard timeout.
#[derive(Debug, Clone)]
pub struct SubprocessAnalyzer {
    program: String,
    base_args: Vec<String>,
    timeout: Duration,
}

impl SubprocessAnalyzer {
    /// Builds an analyzer from a program followed by any leading arguments.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::EmptyCommand`] if `command` is empty.
    pub fn new(command: &[String], timeout: Duration) -> Result<Self, AnalyzerError> {
        let (program, base_args) = command.split_first().ok_or(AnalyzerError::EmptyCommand)?;
        Ok(Self {
            program: program.clone(),
            base_args: base_args.to_vec(),
            timeout,
        })
    }

    /// # Errors
    ///
    /// Returns [`AnalyzerError::EmptyCommand`] if the configured command is
    /// empty.
    pub fn from_config(config: &AppConfig) -> Result<Self, AnalyzerError> {
        Self::new(&config.analyzer_command, config.analyzer_timeout())
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Analyzer for SubprocessAnalyzer {
    async fn analyze(
        &self,
        term: &str,
        storefront: Option<&str>,
    ) -> Result<AnalyzeOutcome, AnalyzerError> {
        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(&self.base_args)
            .arg("analyze")
            .arg(term)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(code) = storefront {
            command.arg("--storefront").arg(code);
        }

        let child = command.spawn().map_err(|source| AnalyzerError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let Ok(waited) = tokio::time::timeout(self.timeout, child.wait_with_output()).await else {
            tracing::warn!(term, timeout_secs = self.timeout.as_secs(), "analyzer timed out");
            return Ok(AnalyzeOutcome::TimedOut {
                after: self.timeout,
            });
        };

        let output = waited.map_err(|source| AnalyzerError::Wait {
            program: self.program.clone(),
            source,
        })?;

        if output.status.success() {
            Ok(AnalyzeOutcome::Succeeded {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            })
        } else {
            Ok(AnalyzeOutcome::Failed {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}
