use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::text;
use crate::session::message::{Message, Sender};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserContext {
    pub topics: Vec<String>,
    pub interests: Vec<String>,
    pub questions: Vec<String>,
    pub last_topic: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: Option<String>,
    /// ISO 639-1 code, set once detected or chosen.
    pub language: Option<String>,
    pub last_interaction: chrono::DateTime<Utc>,
    pub context: UserContext,
}

impl Default for UserInfo {
    fn default() -> Self {
        Self {
            name: None,
            language: None,
            last_interaction: Utc::now(),
            context: UserContext::default(),
        }
    }
}

/// Shallow patch applied over a session's user info: provided fields
/// overwrite, omitted fields are preserved.
#[derive(Debug, Clone, Default)]
pub struct UserInfoPatch {
    pub name: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub messages: Vec<Message>,
    pub user_info: UserInfo,
}

impl Session {
    fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            messages: vec![Message::bot(text::SEED_GREETING)],
            user_info: UserInfo::default(),
        }
    }

    /// Count of messages the user has sent (excludes seeded and bot turns).
    pub fn user_message_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.sender == Sender::User)
            .count()
    }
}

/// In-memory session map. Explicitly constructed and passed by reference to
/// the coordinator; tests create a fresh store each. Sessions live until an
/// explicit clear or process teardown.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh session seeded with the bot greeting.
    pub fn create_session(&mut self) -> &mut Session {
        let session = Session::new();
        let id = session.session_id.clone();
        self.sessions.insert(id.clone(), session);
        self.sessions.get_mut(&id).expect("just inserted")
    }

    pub fn get(&self, session_id: &str) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    /// Fetch the session for `session_id`, refreshing its interaction time.
    /// An unknown or absent id is not an error; it silently becomes a new
    /// conversation.
    pub fn get_or_create(&mut self, session_id: Option<&str>) -> &mut Session {
        match session_id {
            Some(id) if self.sessions.contains_key(id) => {
                let session = self.sessions.get_mut(id).expect("checked above");
                session.user_info.last_interaction = Utc::now();
                session
            }
            _ => self.create_session(),
        }
    }

    /// Append a message, assigning it to the session for `session_id`
    /// (created on demand). Returns a clone of the stored message.
    pub fn add_message(&mut self, session_id: Option<&str>, message: Message) -> Message {
        let session = self.get_or_create(session_id);
        session.messages.push(message.clone());
        session.user_info.last_interaction = Utc::now();
        message
    }

    /// Shallow-merge the patch into the session's user info.
    pub fn update_user_info(&mut self, session_id: Option<&str>, patch: UserInfoPatch) {
        let session = self.get_or_create(session_id);
        if let Some(name) = patch.name {
            session.user_info.name = Some(name);
        }
        if let Some(language) = patch.language {
            session.user_info.language = Some(language);
        }
        session.user_info.last_interaction = Utc::now();
    }

    /// Remove a session. Returns false when no such session existed; this is
    /// the only operation that reports a missing id.
    pub fn clear(&mut self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
