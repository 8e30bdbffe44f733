use thiserror::Error;

/// Top-level error type for the grounding crate.
///
/// Most pipeline paths deliberately swallow degraded-dependency failures
/// and fall back; this type is what the few hard-failure seams (and the
/// optional live-org collaborator) speak.
#[derive(Debug, Error)]
pub enum GroundingError {
    #[error("graph error: {0}")]
    Graph(#[from] soqlforge_core::GraphError),

    #[error("retrieval error: {0}")]
    Rag(#[from] soqlforge_rag::RagError),

    #[error("live org query failed: {0}")]
    LiveOrg(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
