//! Generative (chat) provider contract.
//!
//! Vendor adapters convert their own request/response shapes into this one
//! canonical form at the boundary; nothing downstream ever inspects a
//! provider-specific payload. Within the grounding pipeline the contract is
//! only exercised by draft-phase generation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RagError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message in a chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Message-history-in, text-out completion contract.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, RagError>;

    /// Model identifier, for logging only.
    fn model_name(&self) -> &str;
}
