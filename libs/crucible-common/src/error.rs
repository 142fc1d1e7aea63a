//! Error taxonomy for the execution engine.
//!
//! Every failure mode a single request can hit has its own variant, so the
//! orchestrator can map it to a result status and the harness can fold it
//! into a failing test verdict without string matching.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    /// Requested language has no registered adapter. Raised before any
    /// filesystem or process activity.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Compiler produced diagnostics; the program was never run. Carries the
    /// raw compiler stderr.
    #[error("compilation failed: {0}")]
    Compile(String),

    /// OS could not launch the process (binary missing, permissions).
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Process exceeded its wall-clock budget and was killed.
    #[error("process exceeded {timeout_ms}ms time limit")]
    Timeout { timeout_ms: u64 },

    /// Process wrote more than the configured output cap on stdout or
    /// stderr. Reported as an error, never silently truncated.
    #[error("process output exceeded {limit_bytes} byte limit")]
    OutputLimit { limit_bytes: usize },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ExecError>;
