//! Sandbox lifecycle error types

use crate::action::Step;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while driving a sandbox through its lifecycle
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Sandbox not created: {0}. Run `sandbox create`")]
    NotFound(String),

    #[error("No source directory{}. Build your app and try again", format_dir(.0))]
    MissingLocalInput(PathBuf),

    #[error("{operation} failed: {message}")]
    Transport { operation: String, message: String },

    #[error("Sandbox {name} was only partially removed ({})", format_failed_steps(.failed))]
    PartialTeardown {
        name: String,
        failed: Vec<(Step, String)>,
    },

    #[error("Transfer failed for {failed} of {total} objects: {first_error}")]
    TransferFailed {
        failed: u64,
        total: u64,
        first_error: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SandboxError {
    /// Wrap a remote-service failure with the operation that produced it
    pub fn transport(operation: impl Into<String>, message: impl ToString) -> Self {
        SandboxError::Transport {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Validation failures are reported as-is and never retried
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SandboxError::NotFound(_) | SandboxError::MissingLocalInput(_)
        )
    }
}

fn format_dir(dir: &std::path::Path) -> String {
    if dir.as_os_str().is_empty() {
        String::new()
    } else {
        format!(": {}", dir.display())
    }
}

fn format_failed_steps(failed: &[(Step, String)]) -> String {
    failed
        .iter()
        .map(|(step, message)| format!("{}: {}", step, message))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, SandboxError>;
