pub mod http;

use async_trait::async_trait;
use log::info;
use std::error::Error;
use std::sync::Arc;
use thiserror::Error as ThisError;

use crate::cli::Args;
use crate::models::wire::{ HistoryEntry, QueryResponse };

/// Errors crossing the transport seam. Send failures are rendered into the
/// conversation as assistant text; session-load failures propagate.
#[derive(Debug, ThisError)]
pub enum BackendError {
    #[error("request failed: {0}")] Request(#[from] reqwest::Error),
    #[error("backend returned {status}: {body}")] Status {
        status: u16,
        body: String,
    },
    #[error("invalid backend configuration: {0}")] Config(String),
}

/// The Ask-AI backend as the conversation manager sees it.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// One retrieval-augmented chat turn. `conversation_id` is absent on the
    /// first turn; the backend assigns one and returns it.
    async fn query(
        &self,
        query: &str,
        conversation_id: Option<&str>
    ) -> Result<QueryResponse, BackendError>;

    /// Ordered message history of a stored conversation.
    async fn fetch_session(
        &self,
        conversation_id: &str
    ) -> Result<Vec<HistoryEntry>, BackendError>;
}

pub fn create_backend(args: &Args) -> Result<Arc<dyn ChatBackend>, Box<dyn Error + Send + Sync>> {
    info!("Ask-AI backend: {}", args.base_url);
    let backend = http::HttpBackend::from_args(args)?;
    Ok(Arc::new(backend))
}
