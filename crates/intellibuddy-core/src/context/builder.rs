use crate::constants::context as limits;
use crate::constants::defaults;
use crate::session::{Sender, Session};

/// A session is considered brand new while its transcript is this short;
/// the greeting instruction differs for first-time versus returning users.
const FIRST_INTERACTION_MAX_MESSAGES: usize = 3;

/// Compose the full context string sent to the remote model: persona
/// instructions, personalization, topic memory, and the recent transcript
/// ending in an open continuation cue. Deterministic and side-effect free;
/// fact extraction and persistence happen in [`process_message`].
///
/// [`process_message`]: crate::context::process_message
pub fn build_context(session: &Session, current_text: &str, is_quick_reply: bool) -> String {
    build_context_with_limit(session, current_text, is_quick_reply, limits::MAX_CONTEXT_MESSAGES)
}

pub fn build_context_with_limit(
    session: &Session,
    current_text: &str,
    is_quick_reply: bool,
    max_messages: usize,
) -> String {
    let mut context = String::from(
        "You are IntelliBuddy, a helpful AI assistant. Provide friendly, concise responses.",
    );

    context.push_str(
        " You can and should use markdown formatting in your responses when appropriate, \
         including **bold** for emphasis, *italics*, `code`, bullet lists, numbered lists, \
         headings with #, ##, and tables. Format code blocks using triple backticks.",
    );

    if let Some(ref name) = session.user_info.name {
        let is_first_interaction = session.messages.len() <= FIRST_INTERACTION_MAX_MESSAGES;

        if is_quick_reply {
            context.push_str(&format!(
                " This message is from a quick reply button, NOT a new user introducing \
                 themselves. DO NOT respond with \"Nice to meet you\" phrases. The user's \
                 name is ONLY \"{name}\", not any part of their current message."
            ));
        }

        if is_first_interaction {
            context.push_str(&format!(
                " You're talking to {name}. This is your FIRST conversation with them. \
                 Use \"Nice to meet you\" instead of \"Nice to talk to you again\" when \
                 greeting them."
            ));
        } else {
            context.push_str(&format!(
                " You're talking to {name}. Address them by name occasionally."
            ));
        }
    }

    let user_context = &session.user_info.context;
    if !user_context.topics.is_empty() {
        context.push_str(&format!(
            " The user has previously asked about: {}.",
            user_context.topics.join(", ")
        ));
    }
    if let Some(ref last_topic) = user_context.last_topic {
        context.push_str(&format!(
            " Their most recent topic of interest was {last_topic}."
        ));
    }

    // Advisory only; the remote model enforces (or ignores) it.
    if let Some(ref language) = session.user_info.language {
        if language != defaults::LANGUAGE {
            context.push_str(&format!(" Respond in {language} language."));
        }
    }

    if session.messages.is_empty() {
        context.push_str(&format!("\n\nUser: {current_text}\nIntelliBuddy:"));
    } else {
        let start = session.messages.len().saturating_sub(max_messages);
        let recent: Vec<String> = session.messages[start..]
            .iter()
            .map(|msg| {
                let speaker = match msg.sender {
                    Sender::User => "User",
                    Sender::Bot => "IntelliBuddy",
                };
                format!("{}: {}", speaker, msg.text)
            })
            .collect();

        context.push_str(&format!(
            "\n\nConversation history:\n{}\n\nUser: {current_text}\nIntelliBuddy:",
            recent.join("\n")
        ));
    }

    context
}
