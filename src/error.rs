//! Error taxonomy for module generation.
//!
//! Missing inputs, an unusable output directory and a missing tool binary are
//! not errors: the orchestrator reports them as a skipped module. Malformed
//! persisted source lists are logged and treated as empty.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("jfe option verification failed, check the jfe options (command `{command}`): {reason}")]
    Verification { command: String, reason: String },

    #[error("module {module} failed in jfe for inputs [{inputs}] (command `{command}`): {reason}")]
    ToolFailure {
        module: String,
        inputs: String,
        command: String,
        reason: String,
    },

    #[error("cannot read source list {}: {source}", path.display())]
    RecorderRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot delete source list {}: {source}", path.display())]
    RecorderDelete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot save source list {}: {source}", path.display())]
    RecorderWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("writing list file failed under {}: {source}", path.display())]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl GenError {
    /// Errors that invalidate every later invocation, not just the current module.
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, GenError::Verification { .. })
    }
}

pub type Result<T> = std::result::Result<T, GenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_verification_failures_abort_the_run() {
        let verify = GenError::Verification {
            command: "mapfej -h".to_string(),
            reason: "exit code 2".to_string(),
        };
        let tool = GenError::ToolFailure {
            module: "app".to_string(),
            inputs: "/m/classes".to_string(),
            command: "mapfej".to_string(),
            reason: "exit code 1".to_string(),
        };
        assert!(verify.is_run_fatal());
        assert!(!tool.is_run_fatal());
        assert!(!GenError::Configuration("x".to_string()).is_run_fatal());
        assert!(tool.to_string().contains("module app failed in jfe"));
    }
}
