mod builder;
mod extract;

pub use builder::{build_context, build_context_with_limit};
pub use extract::{
    detect_language, extract_name, extract_topics, extract_user_facts, looks_like_question,
    ExtractedFacts,
};

use crate::session::Session;

/// Fold a user message into the session's derived facts (name, topics,
/// question log), then return the composed context string for the remote
/// call. Name commits are first-write-wins; quick replies never contribute
/// a name, since their text is UI-generated.
pub fn process_message(session: &mut Session, text: &str, is_quick_reply: bool) -> String {
    if !is_quick_reply {
        if session.user_info.name.is_none() {
            if let Some(name) = extract_name(text) {
                session.user_info.name = Some(name);
            }
        }
    }

    let topics = extract_topics(text);
    if let Some(first) = topics.first() {
        session.user_info.context.last_topic = Some(first.clone());
    }
    for topic in topics {
        if !session.user_info.context.topics.contains(&topic) {
            session.user_info.context.topics.push(topic);
        }
    }

    if looks_like_question(text) {
        session.user_info.context.questions.push(text.to_string());
    }

    build_context(session, text, is_quick_reply)
}
