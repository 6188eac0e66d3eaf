use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use regex::Regex;

use intellibuddy_core::constants::text as canned;
use intellibuddy_core::error::{BuddyError, Result};
use intellibuddy_core::relay::{
    translate_or_original, GenerateRequest, HealthStatus, RelayClient, RelayReply,
};
use intellibuddy_core::session::Sender;
use intellibuddy_core::{Coordinator, ReactionKind, Settings};

const DEFAULT_REPLY: &str = "This is a mock reply.";

/// Scripted outcomes for successive generate calls; after the script runs
/// dry every call answers with the default text.
#[derive(Clone)]
enum Scripted {
    Text(&'static str),
    RateLimited,
    Fail,
}

enum TranslateBehavior {
    /// Prefix the text with "[lang] " so tests can see what got translated.
    Tag,
    Fail,
}

struct MockRelay {
    script: Mutex<VecDeque<Scripted>>,
    suggestions: Option<Vec<String>>,
    translate: TranslateBehavior,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl MockRelay {
    fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            suggestions: None,
            translate: TranslateBehavior::Tag,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn with_script(self, outcomes: Vec<Scripted>) -> Self {
        *self.script.lock().unwrap() = outcomes.into();
        self
    }

    fn with_suggestions(mut self, suggestions: &[&str]) -> Self {
        self.suggestions = Some(suggestions.iter().map(|s| s.to_string()).collect());
        self
    }

    fn failing_translation(mut self) -> Self {
        self.translate = TranslateBehavior::Fail;
        self
    }

    fn generate_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_request(&self) -> Option<GenerateRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl RelayClient for MockRelay {
    async fn generate(&self, request: GenerateRequest) -> Result<RelayReply> {
        let session_id = request.session_id.clone();
        self.requests.lock().unwrap().push(request);

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Text(reply)) => Ok(RelayReply::Text {
                text: reply.to_string(),
                session_id,
            }),
            Some(Scripted::RateLimited) => Ok(RelayReply::RateLimited {
                message: "Rate limit exceeded. Please try again later.".to_string(),
                next_available_time: Utc::now() + Duration::seconds(60),
            }),
            Some(Scripted::Fail) => Err(BuddyError::Relay("mock transport failure".to_string())),
            None => Ok(RelayReply::Text {
                text: DEFAULT_REPLY.to_string(),
                session_id,
            }),
        }
    }

    async fn suggestions(
        &self,
        _last_message: &str,
        _session_id: &str,
        _language: &str,
    ) -> Result<Vec<String>> {
        match &self.suggestions {
            Some(suggestions) => Ok(suggestions.clone()),
            None => Err(BuddyError::Relay("no suggestions scripted".to_string())),
        }
    }

    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        match self.translate {
            TranslateBehavior::Tag => Ok(format!("[{target_language}] {text}")),
            TranslateBehavior::Fail => Err(BuddyError::Relay("mock translate failure".to_string())),
        }
    }

    async fn health(&self) -> Result<HealthStatus> {
        Ok(HealthStatus {
            status: "OK".to_string(),
            has_credentials: true,
        })
    }
}

#[tokio::test]
async fn name_introduction_is_fully_local() {
    let mock = Arc::new(MockRelay::new());
    let coordinator = Coordinator::new(mock.clone());
    coordinator.bootstrap().await;

    let messages = coordinator.handle_user_message("My name is Sam").await;

    let session = coordinator.session_snapshot().await.unwrap();
    assert_eq!(session.user_info.name.as_deref(), Some("Sam"));

    let last = messages.last().unwrap();
    assert_eq!(last.sender, Sender::Bot);
    let greeting = Regex::new(r"(?i)Nice to meet you,?\s*Sam").unwrap();
    assert!(greeting.is_match(&last.text), "got: {}", last.text);

    let labels: Vec<&str> = last.quick_replies.iter().map(|q| q.label.as_str()).collect();
    assert_eq!(
        labels,
        ["Tell me more about IntelliBuddy", "What can you help me with?"]
    );

    // The whole exchange spent zero model calls.
    assert_eq!(mock.generate_calls(), 0);
}

#[tokio::test]
async fn non_name_input_gets_a_clarifying_prompt() {
    let mock = Arc::new(MockRelay::new());
    let coordinator = Coordinator::new(mock.clone());

    let messages = coordinator.handle_user_message("What time is it?").await;

    let last = messages.last().unwrap();
    assert_eq!(last.text, canned::NOT_A_NAME);
    assert!(coordinator
        .session_snapshot()
        .await
        .unwrap()
        .user_info
        .name
        .is_none());
    assert_eq!(mock.generate_calls(), 0);
}

#[tokio::test]
async fn informational_quick_replies_are_answered_locally() {
    let mock = Arc::new(MockRelay::new());
    let coordinator = Coordinator::new(mock.clone());

    let messages = coordinator
        .handle_quick_reply("Tell me more about IntelliBuddy")
        .await;
    let last = messages.last().unwrap();
    assert!(last.text.contains("IntelliBuddy Features"));
    assert!(!last.quick_replies.is_empty());

    let messages = coordinator
        .handle_quick_reply("What can you help me with?")
        .await;
    let last = messages.last().unwrap();
    assert!(last.text.contains("I can assist you with a variety of tasks"));

    assert_eq!(mock.generate_calls(), 0);
}

#[tokio::test]
async fn local_rate_limit_blocks_before_dispatch() {
    let mut settings = Settings::default();
    settings.limits.max_requests_per_minute = 0;

    let mock = Arc::new(MockRelay::new());
    let coordinator = Coordinator::with_settings(mock.clone(), settings);

    let messages = coordinator.handle_quick_reply("Tell me more").await;
    let last = messages.last().unwrap();
    assert!(last.text.contains("Rate limit reached"));
    assert!(coordinator.rate_limit_notice().await.is_some());
    assert_eq!(mock.generate_calls(), 0);

    // A second tap under the active limit is acknowledged, never retried.
    let before = coordinator.messages().await.len();
    let messages = coordinator.handle_quick_reply("Thanks for the info").await;
    assert_eq!(messages.len(), before + 2); // user tap + notice ack
    assert_eq!(mock.generate_calls(), 0);
}

#[tokio::test]
async fn backend_rate_limit_surfaces_like_a_local_block() {
    let mock = Arc::new(MockRelay::new().with_script(vec![Scripted::RateLimited]));
    let coordinator = Coordinator::new(mock.clone());

    let messages = coordinator.handle_quick_reply("How does memory work?").await;

    assert_eq!(mock.generate_calls(), 1);
    let last = messages.last().unwrap();
    assert!(last.text.contains("Rate limit exceeded"));
    let notice = coordinator.rate_limit_notice().await.unwrap();
    assert!(notice.next_available_time > Utc::now());
}

#[tokio::test]
async fn quick_reply_response_scrubs_misattributed_greeting() {
    let mock = Arc::new(MockRelay::new().with_script(vec![Scripted::Text(
        "Nice to meet you, Tell me more! Here is additional detail.",
    )]));
    let coordinator = Coordinator::new(mock.clone());

    let messages = coordinator.handle_quick_reply("Tell me more").await;

    let last = messages.last().unwrap();
    assert_eq!(last.text, "About Tell me more: Here is additional detail.");

    let request = mock.last_request().unwrap();
    assert!(request.is_quick_reply);
    assert!(request.enhanced_prompt.contains("Quick Reply button click"));
}

#[tokio::test]
async fn relay_failure_becomes_an_apology_message() {
    let mock = Arc::new(MockRelay::new().with_script(vec![Scripted::Fail]));
    let coordinator = Coordinator::new(mock.clone());

    let messages = coordinator.handle_quick_reply("Explain something").await;

    let last = messages.last().unwrap();
    assert_eq!(last.text, canned::GENERIC_APOLOGY);
    assert_eq!(last.sender, Sender::Bot);
}

#[tokio::test]
async fn remote_replies_carry_contextual_suggestions() {
    let mock = Arc::new(
        MockRelay::new().with_suggestions(&["More about physics", "Switch topic"]),
    );
    let coordinator = Coordinator::new(mock.clone());

    coordinator.handle_user_message("My name is Sam").await;
    let messages = coordinator.handle_user_message("Tell me about physics").await;

    let last = messages.last().unwrap();
    assert_eq!(last.text, DEFAULT_REPLY);
    let labels: Vec<&str> = last.quick_replies.iter().map(|q| q.label.as_str()).collect();
    assert_eq!(labels, ["More about physics", "Switch topic"]);

    assert_eq!(mock.generate_calls(), 1);
    let request = mock.last_request().unwrap();
    assert_eq!(request.prompt, "Tell me about physics");
    assert!(!request.is_quick_reply);
    assert!(request.has_just_provided_name);
    assert!(request.context.contains("You are IntelliBuddy"));
    assert!(request.context.contains("physics"));
    assert!(request.context.ends_with("IntelliBuddy:"));
}

#[tokio::test]
async fn suggestion_failure_falls_back_to_the_default_pair() {
    let mock = Arc::new(MockRelay::new());
    let coordinator = Coordinator::new(mock.clone());

    coordinator.handle_user_message("My name is Sam").await;
    let messages = coordinator.handle_user_message("Tell me about space").await;

    let last = messages.last().unwrap();
    let labels: Vec<&str> = last.quick_replies.iter().map(|q| q.label.as_str()).collect();
    assert_eq!(labels, ["Tell me more", "Thanks for the info"]);
}

#[tokio::test]
async fn translation_failure_returns_the_original_text() {
    let mock = MockRelay::new().failing_translation();
    let text = translate_or_original(&mock, "Bonjour tout le monde", "en").await;
    assert_eq!(text, "Bonjour tout le monde");
}

#[tokio::test]
async fn language_switch_translates_bot_content_only() {
    let mock = Arc::new(MockRelay::new());
    let coordinator = Coordinator::new(mock.clone());

    coordinator.handle_user_message("My name is Sam").await;
    let messages = coordinator.switch_language("es").await;

    assert_eq!(coordinator.language().await, "es");
    let session = coordinator.session_snapshot().await.unwrap();
    assert_eq!(session.user_info.language.as_deref(), Some("es"));

    // Seed greeting and intro reply translated; the typed message untouched.
    assert!(messages[0].text.starts_with("[es] "));
    let typed = messages
        .iter()
        .find(|m| m.sender == Sender::User)
        .unwrap();
    assert_eq!(typed.text, "My name is Sam");

    let intro = messages
        .iter()
        .find(|m| m.text.contains("Nice to meet you"))
        .unwrap();
    assert!(intro.text.starts_with("[es] "));
    assert!(intro.quick_replies[0].label.starts_with("[es] "));
}

#[tokio::test]
async fn third_language_switch_in_a_minute_is_blocked() {
    let mock = Arc::new(MockRelay::new());
    let coordinator = Coordinator::new(mock.clone());
    coordinator.bootstrap().await;

    coordinator.switch_language("es").await;
    coordinator.switch_language("fr").await;
    assert_eq!(coordinator.language().await, "fr");

    coordinator.switch_language("de").await;
    assert_eq!(coordinator.language().await, "fr");

    let notice = coordinator.rate_limit_notice().await.unwrap();
    assert!(notice.message.contains("twice per minute"));
    assert!(notice.next_available_time > Utc::now());
}

#[tokio::test]
async fn reaction_toggle_is_idempotent_and_replaceable() {
    let mock = Arc::new(MockRelay::new());
    let coordinator = Coordinator::new(mock.clone());

    let messages = coordinator.bootstrap().await;
    let seed_id = messages[0].id.clone();

    // Add a reaction: one reaction, one acknowledgement tied to the parent.
    let after = coordinator.toggle_reaction(&seed_id, ReactionKind::Heart).await;
    let target = after.iter().find(|m| m.id == seed_id).unwrap();
    assert_eq!(target.user_reaction(), Some(ReactionKind::Heart));
    let acks: Vec<_> = after.iter().filter(|m| m.is_reaction_ack).collect();
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0].parent_message_id.as_deref(), Some(seed_id.as_str()));

    // Same reaction again: both the reaction and its ack are gone.
    let after = coordinator.toggle_reaction(&seed_id, ReactionKind::Heart).await;
    let target = after.iter().find(|m| m.id == seed_id).unwrap();
    assert!(target.reactions.is_empty());
    assert_eq!(after.iter().filter(|m| m.is_reaction_ack).count(), 0);

    // Heart then Wow: exactly one reaction (Wow) and one ack survive.
    coordinator.toggle_reaction(&seed_id, ReactionKind::Heart).await;
    let after = coordinator.toggle_reaction(&seed_id, ReactionKind::Wow).await;
    let target = after.iter().find(|m| m.id == seed_id).unwrap();
    assert_eq!(target.reactions.len(), 1);
    assert_eq!(target.user_reaction(), Some(ReactionKind::Wow));
    assert_eq!(after.iter().filter(|m| m.is_reaction_ack).count(), 1);
}

#[tokio::test]
async fn clear_chat_reseeds_a_single_greeting() {
    let mock = Arc::new(MockRelay::new());
    let coordinator = Coordinator::new(mock.clone());

    coordinator.handle_user_message("My name is Sam").await;
    let old_session = coordinator.session_id().await;

    let messages = coordinator.clear_chat().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender, Sender::Bot);
    assert_ne!(coordinator.session_id().await, old_session);
}

#[tokio::test]
async fn offline_blocks_dispatch_and_reconnect_notifies_once() {
    let mock = Arc::new(MockRelay::new());
    let coordinator = Coordinator::new(mock.clone());

    coordinator.set_online(false).await;
    let messages = coordinator.handle_user_message("Hello there").await;
    assert_eq!(messages.last().unwrap().text, canned::OFFLINE_NOTICE);
    assert_eq!(mock.generate_calls(), 0);

    coordinator.set_online(true).await;
    assert!(coordinator.take_reconnected_notice().await);
    assert!(!coordinator.take_reconnected_notice().await);
}
