use thiserror::Error;

use crate::capture::CaptureError;
use crate::config::ConfigError;

/// Top-level application error, mapped onto process exit codes.
#[derive(Debug, Error)]
pub enum EngineError {
    /// CLI/configuration misuse.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The input capture could not be opened or framed.
    #[error("input capture error: {0}")]
    Input(CaptureError),

    /// The output capture could not be created or written.
    #[error("output capture error: {0}")]
    Output(CaptureError),

    /// A pipeline stage died or failed to shut down.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn stage_panic(stage: &str) -> Self {
        Self::Internal(format!("pipeline stage '{stage}' panicked"))
    }

    pub fn spawn(e: std::io::Error) -> Self {
        Self::Internal(format!("failed to spawn pipeline thread: {e}"))
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Config(_) => 2,
            EngineError::Input(_) => 3,
            EngineError::Output(_) => 4,
            EngineError::Internal(_) => 5,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_the_contract() {
        let config = EngineError::Config(ConfigError::WorkerCount);
        assert_eq!(config.exit_code(), 2);

        let input = EngineError::Input(CaptureError::TruncatedHeader);
        assert_eq!(input.exit_code(), 3);

        let output = EngineError::Output(CaptureError::Io(std::io::Error::other("disk full")));
        assert_eq!(output.exit_code(), 4);

        assert_eq!(EngineError::stage_panic("worker").exit_code(), 5);
    }
}
