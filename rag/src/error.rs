use thiserror::Error;

/// Errors that can occur during embedding and retrieval operations.
#[derive(Error, Debug)]
pub enum RagError {
    #[error("embedding provider error: {0}")]
    Embedding(String),

    #[error("embedding provider rate limited: {0}")]
    RateLimited(String),

    #[error("example store error: {0}")]
    Store(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("chat provider error: {0}")]
    Chat(String),

    #[error("no embedding provider configured")]
    NoProvider,

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl From<soqlforge_core::GraphError> for RagError {
    fn from(e: soqlforge_core::GraphError) -> Self {
        RagError::Store(e.to_string())
    }
}
