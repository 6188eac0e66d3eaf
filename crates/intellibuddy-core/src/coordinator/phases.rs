use regex::Regex;

use crate::constants::{context as limits, text};
use crate::context::extract_name;
use crate::session::Session;

/// How a free-text reply fared against the name-collection heuristics.
#[derive(Debug, Clone, PartialEq)]
pub enum NameAttempt {
    /// Reads like a question, greeting, or slang — ask again.
    Rejected(&'static str),
    /// A candidate was extracted but failed validation.
    Invalid(&'static str),
    /// Nothing name-shaped could be extracted.
    NotFound(&'static str),
    Valid(String),
}

/// The session is still collecting a name while none is known and the
/// conversation is within its first exchange (seed greeting plus at most one
/// turn). One failed attempt falls back to the general path, where the
/// extraction heuristics can still pick a name up later.
pub fn awaiting_name(session: &Session) -> bool {
    session.user_info.name.is_none() && session.messages.len() <= 2
}

/// Inputs that look like something other than a name answer.
fn non_name_patterns() -> Vec<Regex> {
    [
        r"(?i)^(what|who|how|when|where|why|can|do|is|are|will)",
        r"(?i)^(my|your|his|her|their|our)\s+(name|names)$",
        r"(?i)^(sup|wassup|yo|hey|hi|hello|whats|what's|whatsup|what's up)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
}

const SLANG_TERMS: &[&str] = &[
    "dawg", "bro", "dude", "homie", "fam", "bruh", "mate", "pal", "buddy",
];

/// Words that pass the extraction patterns but are never names.
const NAME_STOPLIST: &[&str] = &[
    "what", "who", "when", "where", "why", "how", "yes", "no", "maybe", "your", "you", "chatbot",
    "robot", "bot", "intellibuddy", "ok", "okay", "sure", "help", "hello", "hi", "hey", "thanks",
    "please", "question", "name", "about", "myself", "fine", "good", "my", "the", "this", "that",
    "these", "those", "a", "an", "sup", "wassup", "yo", "buddy", "man", "dude", "bro", "bruh",
    "dawg", "sir", "madam", "miss", "mr", "mrs", "ms",
];

pub fn evaluate_name_reply(input: &str) -> NameAttempt {
    let trimmed = input.trim();

    let is_question = trimmed.contains('?');
    let matches_non_name = non_name_patterns().iter().any(|p| p.is_match(trimmed));
    let lower = trimmed.to_lowercase();
    let contains_slang = SLANG_TERMS.iter().any(|term| lower.contains(term));

    if is_question || matches_non_name || contains_slang {
        return NameAttempt::Rejected(text::NOT_A_NAME);
    }

    let Some(name) = extract_name(trimmed) else {
        return NameAttempt::NotFound(text::NAME_NOT_CAUGHT);
    };

    let name_lower = name.to_lowercase();
    let is_stoplisted = NAME_STOPLIST.iter().any(|word| {
        name_lower == *word
            || name_lower.starts_with(&format!("{word} "))
            || name_lower.ends_with(&format!(" {word}"))
            || name_lower.contains(&format!(" {word} "))
    });

    if is_stoplisted || name.len() < limits::MIN_NAME_LEN {
        return NameAttempt::Invalid(text::INVALID_NAME);
    }

    NameAttempt::Valid(name)
}
