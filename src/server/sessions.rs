//! In-memory registry of inquiry sessions.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::{McpError, McpResult};
use crate::inquiry::ReasoningLog;
use crate::prompts::UserMode;

/// One user's inquiry: a root question and everything recorded about it.
#[derive(Debug, Clone)]
pub struct InquirySession {
    pub id: String,
    /// Mode used when a tool call does not name one.
    pub mode: UserMode,
    pub created_at: DateTime<Utc>,
    pub log: ReasoningLog,
}

impl InquirySession {
    /// Create a session with a fresh id
    pub fn new(root_question: impl Into<String>, mode: UserMode) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            mode,
            created_at: Utc::now(),
            log: ReasoningLog::new(root_question),
        }
    }
}

/// Handle to a session; the mutex serializes operations on it.
pub type SessionHandle = Arc<Mutex<InquirySession>>;

/// Sessions keyed by id.
///
/// The map lock is only held to insert or look up a handle, never while a
/// session is being worked on.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session and return its id and handle
    pub async fn create(
        &self,
        root_question: impl Into<String>,
        mode: UserMode,
    ) -> (String, SessionHandle) {
        let session = InquirySession::new(root_question, mode);
        let id = session.id.clone();
        let handle = Arc::new(Mutex::new(session));

        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::clone(&handle));

        debug!(session_id = %id, "Session created");
        (id, handle)
    }

    /// Look up a session
    pub async fn get(&self, session_id: &str) -> McpResult<SessionHandle> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| McpError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
