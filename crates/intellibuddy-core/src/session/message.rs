use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// Emoji reactions a user can attach to a bot message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Heart,
    Laugh,
    Wow,
    Smile,
    Sad,
    Angry,
}

impl ReactionKind {
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Heart => "\u{2764}\u{fe0f}",
            Self::Laugh => "\u{1f602}",
            Self::Wow => "\u{1f62e}",
            Self::Smile => "\u{1f60a}",
            Self::Sad => "\u{1f622}",
            Self::Angry => "\u{1f620}",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub kind: ReactionKind,
    pub count: u32,
    pub user_added: bool,
}

/// A canned response the UI offers below a bot message. Selecting one
/// dispatches `trigger_text` as if the user had typed it, flagged so
/// downstream logic does not mistake it for a self-introduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickReply {
    pub label: String,
    pub trigger_text: String,
}

impl QuickReply {
    pub fn new(label: impl Into<String>, trigger_text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            trigger_text: trigger_text.into(),
        }
    }

    /// A reply whose trigger is its own label.
    pub fn verbatim(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            label: text.clone(),
            trigger_text: text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    /// Set on user messages dispatched from a quick-reply button.
    #[serde(default)]
    pub is_quick_reply: bool,
    #[serde(default)]
    pub quick_replies: Vec<QuickReply>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    /// Synthesized acknowledgement of a user reaction, tied to its parent.
    #[serde(default)]
    pub is_reaction_ack: bool,
    #[serde(default)]
    pub parent_message_id: Option<String>,
    /// Recorded on seeded greetings so the UI can show a time indicator.
    #[serde(default)]
    pub time_of_day: Option<TimeOfDay>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Sender::User)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Bot)
    }

    fn new(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
            is_quick_reply: false,
            quick_replies: Vec::new(),
            reactions: Vec::new(),
            is_reaction_ack: false,
            parent_message_id: None,
            time_of_day: None,
        }
    }

    pub fn with_quick_replies(mut self, replies: Vec<QuickReply>) -> Self {
        self.quick_replies = replies;
        self
    }

    pub fn as_quick_reply(mut self) -> Self {
        self.is_quick_reply = true;
        self
    }

    pub fn with_time_of_day(mut self, time_of_day: TimeOfDay) -> Self {
        self.time_of_day = Some(time_of_day);
        self
    }

    /// The reaction the user has attached, if any. At most one exists;
    /// the coordinator enforces that on toggle.
    pub fn user_reaction(&self) -> Option<ReactionKind> {
        self.reactions.iter().find(|r| r.user_added).map(|r| r.kind)
    }
}
