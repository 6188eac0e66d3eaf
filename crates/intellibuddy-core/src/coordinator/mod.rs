pub mod greeting;
mod phases;
mod quirks;
mod replies;

pub use phases::{awaiting_name, evaluate_name_reply, NameAttempt};
pub use quirks::scrub_greeting_misattribution;

use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::config::Settings;
use crate::constants::{storage_keys, text};
use crate::context;
use crate::limiter::{LanguageThrottle, RateLimitNotice, RateLimiter, SwitchOutcome};
use crate::relay::{translate_or_original, GenerateRequest, RelayClient, RelayReply};
use crate::session::{
    Message, QuickReply, Reaction, ReactionKind, Sender, SessionStore, UserInfo, UserInfoPatch,
};
use crate::storage::Storage;

/// Everything mutable the coordinator owns, behind one lock so concurrent
/// callbacks serialize their read-modify-write cycles instead of racing over
/// the message list.
struct ChatState {
    store: SessionStore,
    session_id: Option<String>,
    language: String,
    online: bool,
    reconnected: bool,
    notice: Option<RateLimitNotice>,
    /// Bumped on clear; in-flight replies resolving against an older
    /// generation are discarded.
    generation: u64,
}

/// Orchestrates one conversation: session state, rate limiting, relay calls,
/// reply post-processing, reactions, and language switching. Constructed
/// explicitly with its collaborators; tests build one per case with a mock
/// relay and a fresh store.
pub struct Coordinator {
    relay: Arc<dyn RelayClient>,
    settings: Settings,
    storage: Option<Storage>,
    state: Mutex<ChatState>,
    limiter: StdMutex<RateLimiter>,
    throttle: StdMutex<LanguageThrottle>,
}

impl Coordinator {
    /// In-memory coordinator with default settings. Nothing survives drop.
    pub fn new(relay: Arc<dyn RelayClient>) -> Self {
        Self::with_settings(relay, Settings::default())
    }

    pub fn with_settings(relay: Arc<dyn RelayClient>, settings: Settings) -> Self {
        let limiter = RateLimiter::new(
            settings.limits.max_requests_per_minute,
            settings.limits.max_requests_per_day,
        );
        let throttle = LanguageThrottle::new(settings.limits.max_language_switches_per_minute);
        Self::build(relay, settings, None, limiter, throttle)
    }

    /// Coordinator whose counters, notice banner, and language selection
    /// survive restarts through the given storage.
    pub fn with_storage(relay: Arc<dyn RelayClient>, settings: Settings, storage: Storage) -> Self {
        let limiter = RateLimiter::with_storage(
            settings.limits.max_requests_per_minute,
            settings.limits.max_requests_per_day,
            storage.clone(),
        );
        let throttle = LanguageThrottle::with_storage(
            settings.limits.max_language_switches_per_minute,
            storage.clone(),
        );
        Self::build(relay, settings, Some(storage), limiter, throttle)
    }

    fn build(
        relay: Arc<dyn RelayClient>,
        settings: Settings,
        storage: Option<Storage>,
        limiter: RateLimiter,
        throttle: LanguageThrottle,
    ) -> Self {
        let language = storage
            .as_ref()
            .and_then(|s| s.get::<String>(storage_keys::LANGUAGE))
            .unwrap_or_else(|| settings.chat.default_language.clone());
        let notice = storage
            .as_ref()
            .and_then(|s| s.get::<RateLimitNotice>(storage_keys::RATE_LIMIT_NOTICE))
            .filter(|n| !n.expired());

        Self {
            relay,
            settings,
            storage,
            state: Mutex::new(ChatState {
                store: SessionStore::new(),
                session_id: None,
                language,
                online: true,
                reconnected: false,
                notice,
                generation: 0,
            }),
            limiter: StdMutex::new(limiter),
            throttle: StdMutex::new(throttle),
        }
    }

    /// Ensure the greeting is in place; translates it when a persisted
    /// non-default language selection was restored. Call once at startup.
    pub async fn bootstrap(&self) -> Vec<Message> {
        let (session_id, generation) = {
            let mut state = self.state.lock().await;
            let session_id = self.ensure_session(&mut state);
            (session_id, state.generation)
        };
        self.translate_seed_if_needed(&session_id, generation).await;
        self.messages().await
    }

    /// Snapshot of the current conversation, seed included.
    pub async fn messages(&self) -> Vec<Message> {
        let mut state = self.state.lock().await;
        self.snapshot(&mut state)
    }

    pub async fn session_id(&self) -> Option<String> {
        self.state.lock().await.session_id.clone()
    }

    /// Clone of the active session, including derived user facts.
    pub async fn session_snapshot(&self) -> Option<crate::session::Session> {
        let mut state = self.state.lock().await;
        let session_id = self.ensure_session(&mut state);
        state.store.get(&session_id).cloned()
    }

    pub async fn language(&self) -> String {
        self.state.lock().await.language.clone()
    }

    /// The active rate-limit banner, if its wait has not yet elapsed.
    /// Expiry is checked lazily here; no timer resets it.
    pub async fn rate_limit_notice(&self) -> Option<RateLimitNotice> {
        let mut state = self.state.lock().await;
        if state.notice.as_ref().is_some_and(|n| n.expired()) {
            state.notice = None;
            if let Some(ref storage) = self.storage {
                let _ = storage.remove(storage_keys::RATE_LIMIT_NOTICE);
            }
        }
        state.notice.clone()
    }

    /// Track the connectivity signal. Going offline blocks dispatch up
    /// front; coming back online arms a one-shot reconnected notice.
    pub async fn set_online(&self, online: bool) {
        let mut state = self.state.lock().await;
        if online && !state.online {
            state.reconnected = true;
        }
        if !online {
            state.reconnected = false;
        }
        state.online = online;
    }

    pub async fn is_online(&self) -> bool {
        self.state.lock().await.online
    }

    /// One-shot flag for the "connected again" banner.
    pub async fn take_reconnected_notice(&self) -> bool {
        std::mem::take(&mut self.state.lock().await.reconnected)
    }

    /// Free-text entry point.
    pub async fn handle_user_message(&self, input: &str) -> Vec<Message> {
        let message_text = input.trim().to_string();
        if message_text.is_empty() {
            return self.messages().await;
        }

        let awaiting = {
            let mut state = self.state.lock().await;
            let session_id = self.ensure_session(&mut state);

            if !state.online {
                state
                    .store
                    .add_message(Some(&session_id), Message::bot(text::OFFLINE_NOTICE));
                return self.snapshot(&mut state);
            }

            let awaiting = state
                .store
                .get(&session_id)
                .map(phases::awaiting_name)
                .unwrap_or(false);
            state
                .store
                .add_message(Some(&session_id), Message::user(message_text.as_str()));
            awaiting
        };

        if awaiting {
            self.process_name_reply(&message_text).await;
            return self.messages().await;
        }

        if self.handle_special_question(&message_text).await {
            return self.messages().await;
        }

        self.dispatch_remote(message_text, false).await;
        self.messages().await
    }

    /// Programmatic entry point for quick-reply buttons. Bypasses
    /// name-collection; two informational replies are answered locally
    /// without spending a model call.
    pub async fn handle_quick_reply(&self, trigger: &str) -> Vec<Message> {
        let trigger = trigger.trim().to_string();
        {
            let mut state = self.state.lock().await;
            let session_id = self.ensure_session(&mut state);

            if !state.online {
                state
                    .store
                    .add_message(Some(&session_id), Message::bot(text::OFFLINE_NOTICE));
                return self.snapshot(&mut state);
            }

            state.store.add_message(
                Some(&session_id),
                Message::user(trigger.as_str()).as_quick_reply(),
            );

            // An active banner acknowledges the tap with a notice instead of
            // queueing a retry.
            if let Some(notice) = state.notice.clone() {
                if !notice.expired() {
                    state
                        .store
                        .add_message(Some(&session_id), Message::bot(notice.message));
                    return self.snapshot(&mut state);
                }
            }

            if trigger == text::QR_ABOUT {
                state.store.add_message(
                    Some(&session_id),
                    Message::bot(replies::about_reply_text())
                        .with_quick_replies(replies::about_reply_quick_replies()),
                );
                return self.snapshot(&mut state);
            }

            if trigger == text::QR_SERVICES {
                state.store.add_message(
                    Some(&session_id),
                    Message::bot(replies::services_reply_text())
                        .with_quick_replies(replies::services_reply_quick_replies()),
                );
                return self.snapshot(&mut state);
            }
        }

        self.dispatch_remote(trigger, true).await;
        self.messages().await
    }

    /// Toggle a reaction on a bot message. Entirely local: same kind twice
    /// removes reaction and acknowledgement, a different kind replaces both.
    pub async fn toggle_reaction(&self, message_id: &str, kind: ReactionKind) -> Vec<Message> {
        let mut state = self.state.lock().await;
        let session_id = self.ensure_session(&mut state);

        {
            let session = state.store.get_or_create(Some(&session_id));
            let target = session
                .messages
                .iter()
                .position(|m| m.id == message_id)
                .filter(|&i| {
                    session.messages[i].sender == Sender::Bot
                        && !session.messages[i].is_reaction_ack
                });

            if let Some(index) = target {
                let previous = session.messages[index].user_reaction();
                session.messages[index].reactions.retain(|r| !r.user_added);
                if let Some(ack_index) = session.messages.iter().position(|m| {
                    m.is_reaction_ack && m.parent_message_id.as_deref() == Some(message_id)
                }) {
                    session.messages.remove(ack_index);
                }

                if previous != Some(kind) {
                    let index = session
                        .messages
                        .iter()
                        .position(|m| m.id == message_id)
                        .expect("reacted message still present");
                    session.messages[index].reactions.push(Reaction {
                        kind,
                        count: 1,
                        user_added: true,
                    });

                    let mut ack = Message::bot(replies::reaction_ack(kind));
                    ack.is_reaction_ack = true;
                    ack.parent_message_id = Some(message_id.to_string());
                    session.messages.push(ack);
                }
            }
        }

        self.snapshot(&mut state)
    }

    /// Switch the conversation language. Throttled to two switches per
    /// minute; an accepted switch retranslates every bot message and
    /// quick-reply label, leaving the user's own typed words untouched.
    pub async fn switch_language(&self, code: &str) -> Vec<Message> {
        let current = { self.state.lock().await.language.clone() };
        if code == current {
            return self.messages().await;
        }

        let outcome = self.throttle.lock().expect("throttle lock").try_switch();
        if let SwitchOutcome::Blocked {
            next_available_time,
            seconds_left,
        } = outcome
        {
            let message = format!(
                "You can only switch language twice per minute. Please wait {seconds_left} seconds."
            );
            let mut state = self.state.lock().await;
            self.set_notice(&mut state, message, next_available_time);
            return self.snapshot(&mut state);
        }

        let (targets, session_id, generation) = {
            let mut state = self.state.lock().await;
            state.language = code.to_string();
            if let Some(ref storage) = self.storage {
                let _ = storage.set(storage_keys::LANGUAGE, &code);
            }

            let session_id = self.ensure_session(&mut state);
            let generation = state.generation;
            state.store.update_user_info(
                Some(&session_id),
                UserInfoPatch {
                    language: Some(code.to_string()),
                    ..Default::default()
                },
            );
            self.persist_user_info(&mut state, &session_id);

            let session = state.store.get(&session_id).expect("session exists");
            let targets: Vec<(String, String, Vec<QuickReply>)> = session
                .messages
                .iter()
                .filter(|m| m.sender == Sender::Bot || m.is_quick_reply)
                .map(|m| (m.id.clone(), m.text.clone(), m.quick_replies.clone()))
                .collect();
            (targets, session_id, generation)
        };

        // Translate every target concurrently; each falls back to its
        // original text on failure.
        let translations = futures::future::join_all(targets.into_iter().map(
            |(id, message_text, quick_replies)| {
                let relay = self.relay.clone();
                let code = code.to_string();
                async move {
                    let translated =
                        translate_or_original(relay.as_ref(), &message_text, &code).await;
                    let mut translated_replies = Vec::with_capacity(quick_replies.len());
                    for reply in quick_replies {
                        let label = translate_or_original(relay.as_ref(), &reply.label, &code).await;
                        translated_replies.push(QuickReply::verbatim(label));
                    }
                    (id, translated, translated_replies)
                }
            },
        ))
        .await;

        let mut state = self.state.lock().await;
        if state.generation == generation {
            let session = state.store.get_or_create(Some(&session_id));
            for (id, translated, translated_replies) in translations {
                if let Some(message) = session.messages.iter_mut().find(|m| m.id == id) {
                    message.text = translated;
                    if !translated_replies.is_empty() {
                        message.quick_replies = translated_replies;
                    }
                }
            }
        }
        self.snapshot(&mut state)
    }

    /// Discard the conversation and reseed the greeting. A pending reply
    /// from the old conversation is dropped when it resolves.
    pub async fn clear_chat(&self) -> Vec<Message> {
        let (session_id, generation) = {
            let mut state = self.state.lock().await;
            if let Some(id) = state.session_id.take() {
                state.store.clear(&id);
            }
            state.generation += 1;
            let session_id = self.ensure_session(&mut state);
            (session_id, state.generation)
        };

        self.translate_seed_if_needed(&session_id, generation).await;
        self.messages().await
    }

    // ─── internals ───────────────────────────────────────────────────────────

    /// Bind (or create) the active session. A fresh session gets the
    /// time-of-day greeting as its seed, restored user facts from storage,
    /// and the currently selected language.
    fn ensure_session(&self, state: &mut ChatState) -> String {
        if let Some(ref id) = state.session_id {
            if state.store.get(id).is_some() {
                return id.clone();
            }
        }

        let restored: Option<UserInfo> = self
            .storage
            .as_ref()
            .and_then(|s| s.get(storage_keys::USER_INFO));
        let language = state.language.clone();
        let default_language = self.settings.chat.default_language.clone();

        let hour = greeting::local_hour();
        let session = state.store.create_session();
        if let Some(info) = restored {
            session.user_info = UserInfo {
                last_interaction: Utc::now(),
                ..info
            };
        }
        if language != default_language {
            session.user_info.language = Some(language);
        }

        let known_name = session.user_info.name.clone();
        if let Some(seed) = session.messages.first_mut() {
            seed.text = greeting::full_greeting(known_name.as_deref(), hour);
            seed.time_of_day = Some(greeting::time_of_day(hour));
        }

        let id = session.session_id.clone();
        state.session_id = Some(id.clone());
        id
    }

    fn snapshot(&self, state: &mut ChatState) -> Vec<Message> {
        let session_id = self.ensure_session(state);
        state
            .store
            .get(&session_id)
            .map(|s| s.messages.clone())
            .unwrap_or_default()
    }

    fn set_notice(&self, state: &mut ChatState, message: String, next: DateTime<Utc>) {
        let notice = RateLimitNotice::new(message, next);
        if let Some(ref storage) = self.storage {
            let _ = storage.set(storage_keys::RATE_LIMIT_NOTICE, &notice);
        }
        state.notice = Some(notice);
    }

    fn persist_user_info(&self, state: &mut ChatState, session_id: &str) {
        if let (Some(storage), Some(session)) = (&self.storage, state.store.get(session_id)) {
            let _ = storage.set(storage_keys::USER_INFO, &session.user_info);
        }
    }

    async fn translate_seed_if_needed(&self, session_id: &str, generation: u64) {
        let (seed_text, language) = {
            let state = self.state.lock().await;
            if state.language == self.settings.chat.default_language {
                return;
            }
            match state.store.get(session_id).and_then(|s| s.messages.first()) {
                Some(seed) => (seed.text.clone(), state.language.clone()),
                None => return,
            }
        };

        let translated = translate_or_original(self.relay.as_ref(), &seed_text, &language).await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            return;
        }
        let session = state.store.get_or_create(Some(session_id));
        if let Some(seed) = session.messages.first_mut() {
            seed.text = translated;
        }
    }

    async fn process_name_reply(&self, input: &str) {
        match phases::evaluate_name_reply(input) {
            NameAttempt::Rejected(reply)
            | NameAttempt::Invalid(reply)
            | NameAttempt::NotFound(reply) => {
                let mut state = self.state.lock().await;
                let session_id = self.ensure_session(&mut state);
                state
                    .store
                    .add_message(Some(&session_id), Message::bot(reply));
            }
            NameAttempt::Valid(name) => {
                let mut state = self.state.lock().await;
                let session_id = self.ensure_session(&mut state);
                state.store.update_user_info(
                    Some(&session_id),
                    UserInfoPatch {
                        name: Some(name.clone()),
                        ..Default::default()
                    },
                );
                self.persist_user_info(&mut state, &session_id);
                state.store.add_message(
                    Some(&session_id),
                    Message::bot(format!("Nice to meet you, {name}! How can I help you today?"))
                        .with_quick_replies(replies::post_introduction_quick_replies()),
                );
            }
        }
    }

    /// Identity questions answered without (or before) the general path.
    /// Returns true when the input was fully handled.
    async fn handle_special_question(&self, input: &str) -> bool {
        let lower = input.to_lowercase();

        if lower.contains("what") && (lower.contains("my name") || lower.contains("call me")) {
            let has_name = {
                let mut state = self.state.lock().await;
                let session_id = self.ensure_session(&mut state);
                state
                    .store
                    .get(&session_id)
                    .and_then(|s| s.user_info.name.clone())
                    .is_some()
            };

            if has_name {
                // Let the model answer from the transcript it already has.
                self.dispatch_remote(text::NAME_RECALL_PROMPT.to_string(), false)
                    .await;
            } else {
                let mut state = self.state.lock().await;
                let session_id = self.ensure_session(&mut state);
                state
                    .store
                    .add_message(Some(&session_id), Message::bot(text::NAME_UNKNOWN));
            }
            return true;
        }

        if lower.contains("who are you") || (lower.contains("what") && lower.contains("your name"))
        {
            let mut state = self.state.lock().await;
            let session_id = self.ensure_session(&mut state);
            state
                .store
                .add_message(Some(&session_id), Message::bot(text::IDENTITY_REPLY));
            return true;
        }

        if lower == text::QR_ABOUT.to_lowercase() {
            let mut state = self.state.lock().await;
            let session_id = self.ensure_session(&mut state);
            state.store.add_message(
                Some(&session_id),
                Message::bot(replies::about_reply_text())
                    .with_quick_replies(replies::about_reply_quick_replies()),
            );
            return true;
        }

        if lower == text::QR_SERVICES.to_lowercase() {
            let mut state = self.state.lock().await;
            let session_id = self.ensure_session(&mut state);
            state.store.add_message(
                Some(&session_id),
                Message::bot(replies::services_reply_text())
                    .with_quick_replies(replies::services_reply_quick_replies()),
            );
            return true;
        }

        false
    }

    /// The general remote-call path: local gate, counter, context build,
    /// relay call, post-processing, suggestions, publish. The user's message
    /// is already on the transcript when this runs.
    async fn dispatch_remote(&self, prompt: String, is_quick_reply: bool) {
        let status = self.limiter.lock().expect("limiter lock").check_limit();
        if !status.can_proceed {
            let message = status
                .message
                .unwrap_or_else(|| "Rate limit exceeded. Please try again later.".to_string());
            let next = status
                .next_available_time
                .unwrap_or_else(|| Utc::now() + Duration::seconds(60));

            let mut state = self.state.lock().await;
            self.set_notice(&mut state, message.clone(), next);
            let session_id = self.ensure_session(&mut state);
            state
                .store
                .add_message(Some(&session_id), Message::bot(message));
            return;
        }

        // Count the call before dispatch so concurrent in-flight calls are
        // already charged against the budget.
        self.limiter
            .lock()
            .expect("limiter lock")
            .increment_counter();

        let (request, session_id, generation) = {
            let mut state = self.state.lock().await;
            let session_id = self.ensure_session(&mut state);
            let selected_language = state.language.clone();
            let generation = state.generation;

            let default_language = self.settings.chat.default_language.clone();
            let max_context = self.settings.chat.max_context_messages;
            let session = state.store.get_or_create(Some(&session_id));

            if session.user_info.language.is_none() {
                if let Some(code) = context::detect_language(&prompt) {
                    session.user_info.language = Some(code.to_string());
                }
            }

            let is_first_interaction = session.messages.len() <= 2;
            let has_just_provided_name =
                session.messages.len() <= 4 && session.user_info.name.is_some();

            let enhanced_prompt = if is_quick_reply {
                format!(
                    "{prompt}\n(NOTE: This message is from a Quick Reply button click, not a new \
                     user introduction. Do NOT respond with 'Nice to meet you' or treat this text \
                     as the user's name. The user has already introduced themselves earlier in \
                     the conversation.)"
                )
            } else {
                prompt.clone()
            };

            let context_str = {
                let built = context::process_message(session, &enhanced_prompt, is_quick_reply);
                // process_message uses the default window; honor a custom
                // setting by rebuilding when it differs.
                if max_context == crate::constants::context::MAX_CONTEXT_MESSAGES {
                    built
                } else {
                    context::build_context_with_limit(
                        session,
                        &enhanced_prompt,
                        is_quick_reply,
                        max_context,
                    )
                }
            };

            let enhanced_context = if selected_language != default_language {
                format!(
                    "{context_str}\n\nImportant: Respond in {selected_language} language only, \
                     regardless of the language of the query."
                )
            } else {
                context_str.clone()
            };

            (
                GenerateRequest {
                    prompt: prompt.clone(),
                    session_id: session_id.clone(),
                    is_quick_reply,
                    language: selected_language,
                    context: context_str,
                    enhanced_prompt,
                    enhanced_context,
                    is_first_interaction,
                    has_just_provided_name,
                },
                session_id,
                generation,
            )
        };

        match self.relay.generate(request).await {
            Ok(RelayReply::Text { text: reply, .. }) => {
                let reply = if is_quick_reply {
                    quirks::scrub_greeting_misattribution(&reply, &prompt)
                } else {
                    reply
                };
                let quick_replies = self.fetch_quick_replies(&reply, &session_id).await;

                let mut state = self.state.lock().await;
                if state.generation != generation {
                    tracing::debug!("dropping reply for a cleared conversation");
                    return;
                }
                state.store.add_message(
                    Some(&session_id),
                    Message::bot(reply).with_quick_replies(quick_replies),
                );
                self.persist_user_info(&mut state, &session_id);
            }
            Ok(RelayReply::RateLimited {
                message,
                next_available_time,
            }) => {
                let mut state = self.state.lock().await;
                if state.generation != generation {
                    return;
                }
                self.set_notice(&mut state, message.clone(), next_available_time);
                state
                    .store
                    .add_message(Some(&session_id), Message::bot(message));
            }
            Err(e) => {
                tracing::warn!("relay generate failed: {}", e);
                let mut state = self.state.lock().await;
                if state.generation != generation {
                    return;
                }
                state
                    .store
                    .add_message(Some(&session_id), Message::bot(text::GENERIC_APOLOGY));
            }
        }
    }

    /// Quick replies to offer under a fresh bot message. Name prompts get
    /// none, the introduction greeting gets the canned pair, and anything
    /// under an active or would-be rate limit gets the defaults; only the
    /// remaining case spends a suggestions call.
    async fn fetch_quick_replies(&self, reply_text: &str, session_id: &str) -> Vec<QuickReply> {
        if reply_text.contains("What's your name")
            || reply_text.contains("Could you please tell me your name")
        {
            return Vec::new();
        }

        if reply_text.contains("Nice to meet you") && reply_text.contains("How can I help you today")
        {
            return replies::post_introduction_quick_replies();
        }

        {
            let state = self.state.lock().await;
            if state.notice.as_ref().is_some_and(|n| !n.expired()) {
                return replies::default_quick_replies();
            }
        }

        let status = self.limiter.lock().expect("limiter lock").check_limit();
        if !status.can_proceed {
            return replies::default_quick_replies();
        }
        self.limiter
            .lock()
            .expect("limiter lock")
            .increment_counter();

        let language = { self.state.lock().await.language.clone() };
        match self
            .relay
            .suggestions(reply_text, session_id, &language)
            .await
        {
            Ok(suggestions) if suggestions.len() >= 2 => suggestions
                .into_iter()
                .take(2)
                .map(QuickReply::verbatim)
                .collect(),
            Ok(_) => replies::default_quick_replies(),
            Err(e) => {
                tracing::warn!("suggestions fetch failed: {}", e);
                replies::default_quick_replies()
            }
        }
    }
}
