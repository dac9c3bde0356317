use crate::application::WorkflowError;
use crate::config::ConfigError;
use thiserror::Error;

/// Top-level failure of the command line tool.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
