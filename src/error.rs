use crate::types::Stage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QualityError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("all latency tests failed")]
    AllSamplesFailed,

    #[error("no upload servers configured")]
    NoUploadEndpoints,

    #[error("transfer worker crashed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("test cancelled")]
    Cancelled,

    #[error("failed to measure {stage}: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<QualityError>,
    },
}

impl QualityError {
    /// Wraps an error with the stage it came from.
    pub fn in_stage(self, stage: Stage) -> Self {
        QualityError::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// True if this error (or the cause it wraps) is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            QualityError::Cancelled => true,
            QualityError::Stage { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, QualityError>;
