use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One completed question/answer exchange.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

/// In-memory chat transcripts, one per UI session.
///
/// Sessions never share history and nothing survives a process restart.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Vec<ChatTurn>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty session and return its id.
    pub fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.lock().unwrap().insert(id, Vec::new());
        id
    }

    /// Append a completed turn to a session's transcript.
    ///
    /// Unknown ids get a fresh transcript: a browser may keep an id from
    /// before a server restart, and the chat should keep working.
    pub fn append(&self, session: Uuid, question: String, answer: String) {
        let turn = ChatTurn {
            question,
            answer,
            asked_at: Utc::now(),
        };
        self.sessions
            .lock()
            .unwrap()
            .entry(session)
            .or_default()
            .push(turn);
    }

    /// Transcript in insertion order, or `None` for an unknown session.
    pub fn history(&self, session: Uuid) -> Option<Vec<ChatTurn>> {
        self.sessions.lock().unwrap().get(&session).cloned()
    }

    /// End a session, discarding its transcript. Returns whether it existed.
    pub fn end(&self, session: Uuid) -> bool {
        self.sessions.lock().unwrap().remove(&session).is_some()
    }
}
