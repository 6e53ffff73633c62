use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::message::Message;

/// Session used when the caller does not name one
pub const DEFAULT_SESSION: &str = "default";

/// Sessions kept before the oldest one is evicted
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

#[derive(Default)]
struct Sessions {
    histories: HashMap<String, Vec<Message>>,
    // creation order, oldest first
    order: VecDeque<String>,
}

impl Sessions {
    fn entry(&mut self, session_id: &str, max_sessions: usize) -> &mut Vec<Message> {
        if !self.histories.contains_key(session_id) {
            while self.order.len() >= max_sessions {
                match self.order.pop_front() {
                    Some(oldest) => {
                        self.histories.remove(&oldest);
                        tracing::debug!("Evicted session {}", oldest);
                    }
                    None => break,
                }
            }
            self.order.push_back(session_id.to_string());
        }
        self.histories.entry(session_id.to_string()).or_default()
    }

    fn remove(&mut self, session_id: &str) -> bool {
        self.order.retain(|id| id != session_id);
        self.histories.remove(session_id).is_some()
    }
}

/// In-memory conversation history, one ordered message list per session id.
///
/// Callers pick session ids freely, so the number of sessions is capped: once
/// `max_sessions` exist, starting a new one evicts the oldest. Nothing is
/// persisted; everything is lost when the process exits.
#[derive(Clone)]
pub struct ConversationStore {
    sessions: Arc<Mutex<Sessions>>,
    max_sessions: usize,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::with_max_sessions(DEFAULT_MAX_SESSIONS)
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_sessions(max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(Sessions::default())),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Resolve an optional caller-supplied session id
    pub fn session_key(session_id: Option<&str>) -> &str {
        match session_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => DEFAULT_SESSION,
        }
    }

    /// Append the caller's prompt and return the history to send to the provider
    pub async fn append_user(&self, session_id: &str, prompt: &str) -> Vec<Message> {
        let mut sessions = self.sessions.lock().await;
        let history = sessions.entry(session_id, self.max_sessions);
        history.push(Message::user(prompt));
        history.clone()
    }

    /// Replace a session's history wholesale with the one returned by an exchange
    pub async fn replace(&self, session_id: &str, history: Vec<Message>) {
        let mut sessions = self.sessions.lock().await;
        *sessions.entry(session_id, self.max_sessions) = history;
    }

    pub async fn history(&self, session_id: &str) -> Vec<Message> {
        self.sessions
            .lock()
            .await
            .histories
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Forget a session; returns whether it existed
    pub async fn clear(&self, session_id: &str) -> bool {
        self.sessions.lock().await.remove(session_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.histories.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// The history after an exchange: what was sent plus the assistant's reply
pub fn with_reply(mut sent: Vec<Message>, reply: &str) -> Vec<Message> {
    sent.push(Message::assistant(reply));
    sent
}
