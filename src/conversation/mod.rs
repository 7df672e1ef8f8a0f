pub mod citation;

use chrono::Utc;
use log::{ info, warn };
use std::sync::Arc;

use crate::backend::{ BackendError, ChatBackend };
use crate::models::chat::{ Message, ROLE_ASSISTANT };

/// What became of a send attempt. Rejections leave the conversation
/// untouched; `Completed` covers both answers and rendered errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Completed,
    RejectedEmpty,
    RejectedBusy,
}

/// Owns the ordered message list and the backend-issued conversation id.
/// Messages are append-only in send/receive order; the id, once assigned,
/// never changes for the lifetime of the conversation.
pub struct ConversationManager {
    backend: Arc<dyn ChatBackend>,
    conversation_id: Option<String>,
    messages: Vec<Message>,
    pending: bool,
}

impl ConversationManager {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            conversation_id: None,
            messages: Vec::new(),
            pending: false,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Sends one user query. The user message is appended before the backend
    /// call so the conversation reflects it immediately; a failed call is
    /// appended as assistant-authored error text rather than returned.
    pub async fn send_query(&mut self, text: &str) -> SendOutcome {
        if self.pending {
            info!("Send ignored: a request is already in flight");
            return SendOutcome::RejectedBusy;
        }
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::RejectedEmpty;
        }

        self.messages.push(Message::user(text, Utc::now().timestamp()));
        self.pending = true;

        let result = self.backend.query(text, self.conversation_id.as_deref()).await;
        self.pending = false;

        match result {
            Ok(resp) => {
                let parsed = citation::reconcile(&resp.response, resp.sources.as_deref());
                match &self.conversation_id {
                    None => {
                        info!("Conversation started: {}", resp.conversation_id);
                        self.conversation_id = Some(resp.conversation_id);
                    }
                    Some(current) if *current != resp.conversation_id => {
                        warn!(
                            "Backend returned conversation id '{}' but '{}' is already assigned; keeping the original",
                            resp.conversation_id,
                            current
                        );
                    }
                    Some(_) => {}
                }
                self.messages.push(
                    Message::assistant(parsed.content, parsed.sources, Utc::now().timestamp())
                );
            }
            Err(e) => {
                warn!("Query failed: {}", e);
                self.messages.push(
                    Message::assistant(e.to_string(), Vec::new(), Utc::now().timestamp())
                );
            }
        }

        SendOutcome::Completed
    }

    /// Replaces the local conversation with the stored history of `id`,
    /// in backend order, under fresh local message ids. Stored assistant
    /// turns carry no structured citations, so the textual fallback runs on
    /// each of them.
    pub async fn load_session(&mut self, id: &str) -> Result<usize, BackendError> {
        let entries = self.backend.fetch_session(id).await?;

        self.messages = entries
            .into_iter()
            .map(|entry| {
                let timestamp = entry.timestamp();
                if entry.role == ROLE_ASSISTANT {
                    let parsed = citation::reconcile(&entry.content, None);
                    Message::assistant(parsed.content, parsed.sources, timestamp)
                } else {
                    let mut msg = Message::user(entry.content, timestamp);
                    msg.role = entry.role;
                    msg
                }
            })
            .collect();
        self.conversation_id = Some(id.to_string());

        Ok(self.messages.len())
    }

    /// Drops the conversation id and message list. Purely local; the stored
    /// session remains loadable.
    pub fn new_chat(&mut self) {
        self.conversation_id = None;
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use uuid::Uuid;

    use crate::models::chat::{ Source, ROLE_USER };
    use crate::models::wire::{ HistoryEntry, QueryResponse };

    #[derive(Debug)]
    enum Call {
        Query(String, Option<String>),
        FetchSession(String),
    }

    #[derive(Default)]
    struct FakeBackend {
        calls: Mutex<Vec<Call>>,
        query_results: Mutex<VecDeque<Result<QueryResponse, BackendError>>>,
        session: Mutex<Vec<HistoryEntry>>,
    }

    impl FakeBackend {
        fn answering(response: &str, sources: Option<Vec<Source>>, conversation_id: &str) -> Self {
            let backend = Self::default();
            backend.push_result(
                Ok(QueryResponse {
                    response: response.to_string(),
                    sources,
                    conversation_id: conversation_id.to_string(),
                })
            );
            backend
        }

        fn push_result(&self, result: Result<QueryResponse, BackendError>) {
            self.query_results.lock().unwrap().push_back(result);
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatBackend for FakeBackend {
        async fn query(
            &self,
            query: &str,
            conversation_id: Option<&str>
        ) -> Result<QueryResponse, BackendError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Query(query.to_string(), conversation_id.map(str::to_string)));
            self.query_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(||
                    Err(BackendError::Status { status: 500, body: "unscripted".to_string() })
                )
        }

        async fn fetch_session(
            &self,
            conversation_id: &str
        ) -> Result<Vec<HistoryEntry>, BackendError> {
            self.calls.lock().unwrap().push(Call::FetchSession(conversation_id.to_string()));
            Ok(std::mem::take(&mut *self.session.lock().unwrap()))
        }
    }

    fn manager(backend: &Arc<FakeBackend>) -> ConversationManager {
        ConversationManager::new(Arc::clone(backend) as Arc<dyn ChatBackend>)
    }

    #[tokio::test]
    async fn send_appends_user_then_assistant() {
        let backend = Arc::new(FakeBackend::answering("The answer.", None, "conv-1"));
        let mut mgr = manager(&backend);

        let outcome = mgr.send_query("What is the policy?").await;

        assert_eq!(outcome, SendOutcome::Completed);
        assert_eq!(mgr.messages().len(), 2);
        assert_eq!(mgr.messages()[0].role, ROLE_USER);
        assert_eq!(mgr.messages()[0].content, "What is the policy?");
        assert_eq!(mgr.messages()[1].role, ROLE_ASSISTANT);
        assert_eq!(mgr.messages()[1].content, "The answer.");
        assert_eq!(mgr.conversation_id(), Some("conv-1"));
        assert!(!mgr.is_pending());
    }

    #[tokio::test]
    async fn whitespace_only_input_is_rejected_without_backend_call() {
        let backend = Arc::new(FakeBackend::default());
        let mut mgr = manager(&backend);

        assert_eq!(mgr.send_query("   \n\t").await, SendOutcome::RejectedEmpty);
        assert!(mgr.messages().is_empty());
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn send_while_pending_is_a_no_op() {
        let backend = Arc::new(FakeBackend::default());
        let mut mgr = manager(&backend);
        mgr.pending = true;

        assert_eq!(mgr.send_query("second question").await, SendOutcome::RejectedBusy);
        assert!(mgr.messages().is_empty());
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn backend_failure_becomes_an_assistant_message() {
        let backend = Arc::new(FakeBackend::default());
        backend.push_result(Err(BackendError::Status { status: 502, body: "upstream down".to_string() }));
        let mut mgr = manager(&backend);

        assert_eq!(mgr.send_query("hello").await, SendOutcome::Completed);
        assert_eq!(mgr.messages().len(), 2);
        assert_eq!(mgr.messages()[1].role, ROLE_ASSISTANT);
        assert!(mgr.messages()[1].content.contains("upstream down"));
        assert_eq!(mgr.conversation_id(), None);
        assert!(!mgr.is_pending());
    }

    #[tokio::test]
    async fn conversation_id_is_adopted_once_and_kept() {
        let backend = Arc::new(FakeBackend::answering("first", None, "conv-1"));
        backend.push_result(
            Ok(QueryResponse {
                response: "second".to_string(),
                sources: None,
                conversation_id: "conv-2".to_string(),
            })
        );
        let mut mgr = manager(&backend);

        mgr.send_query("one").await;
        mgr.send_query("two").await;

        assert_eq!(mgr.conversation_id(), Some("conv-1"));
        let calls = backend.calls.lock().unwrap();
        match &calls[1] {
            Call::Query(_, conversation_id) => {
                assert_eq!(conversation_id.as_deref(), Some("conv-1"));
            }
            other => panic!("unexpected call: {:?}", other),
        }
    }

    #[tokio::test]
    async fn structured_sources_are_attached_to_the_assistant_message() {
        let sources = vec![Source {
            source: Some("handbook.pdf".to_string()),
            page: Some(4),
            score: Some(0.91),
        }];
        let backend = Arc::new(
            FakeBackend::answering("See the handbook.\nSources:\n- old", Some(sources.clone()), "c")
        );
        let mut mgr = manager(&backend);

        mgr.send_query("where?").await;

        assert_eq!(mgr.messages()[1].content, "See the handbook.");
        assert_eq!(mgr.messages()[1].sources, sources);
    }

    #[tokio::test]
    async fn new_chat_clears_everything_without_a_backend_call() {
        let backend = Arc::new(FakeBackend::answering("hi", None, "conv-1"));
        let mut mgr = manager(&backend);
        mgr.send_query("hello").await;
        let before = backend.call_count();

        mgr.new_chat();

        assert!(mgr.messages().is_empty());
        assert_eq!(mgr.conversation_id(), None);
        assert_eq!(backend.call_count(), before);
    }

    #[tokio::test]
    async fn load_session_replaces_messages_in_order_with_fresh_ids() {
        let backend = Arc::new(FakeBackend::default());
        *backend.session.lock().unwrap() = vec![
            HistoryEntry {
                role: "user".to_string(),
                content: "What changed?".to_string(),
                created_at: Some(json!("2024-05-01T12:00:00Z")),
            },
            HistoryEntry {
                role: "assistant".to_string(),
                content: "Policy update.\nSources:\n- policy.pdf (Page 2)".to_string(),
                created_at: Some(json!(1714564860_i64)),
            }
        ];
        let mut mgr = manager(&backend);
        mgr.send_query("stale local turn").await;

        let loaded = mgr.load_session("conv-9").await.unwrap();

        assert_eq!(loaded, 2);
        assert_eq!(mgr.messages().len(), 2);
        assert_eq!(mgr.conversation_id(), Some("conv-9"));
        assert_eq!(mgr.messages()[0].role, ROLE_USER);
        assert_eq!(mgr.messages()[0].timestamp, 1714564800);
        assert_eq!(mgr.messages()[1].content, "Policy update.");
        assert_eq!(mgr.messages()[1].sources, vec![Source::named("policy.pdf", Some(2))]);
        assert_ne!(mgr.messages()[0].id, Uuid::nil());
        assert_ne!(mgr.messages()[0].id, mgr.messages()[1].id);
    }

    #[tokio::test]
    async fn load_session_failure_propagates() {
        struct FailingBackend;

        #[async_trait]
        impl ChatBackend for FailingBackend {
            async fn query(
                &self,
                _query: &str,
                _conversation_id: Option<&str>
            ) -> Result<QueryResponse, BackendError> {
                unreachable!("not used in this test")
            }

            async fn fetch_session(
                &self,
                conversation_id: &str
            ) -> Result<Vec<HistoryEntry>, BackendError> {
                Err(BackendError::Status {
                    status: 404,
                    body: format!("conversation '{}' not found", conversation_id),
                })
            }
        }

        let mut mgr = ConversationManager::new(Arc::new(FailingBackend));
        let err = mgr.load_session("missing").await.unwrap_err();
        assert!(err.to_string().contains("missing"));
        assert!(mgr.messages().is_empty());
    }
}
