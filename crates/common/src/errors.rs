pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// Failures that end the collector process.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("github client error: {0}")]
    Github(#[source] anyhow::Error),
    #[error("failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn github(err: impl Into<anyhow::Error>) -> Self {
        Self::Github(err.into())
    }
}
