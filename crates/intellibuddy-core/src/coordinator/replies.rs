use rand::seq::SliceRandom;

use crate::constants::text;
use crate::session::{QuickReply, ReactionKind};

/// Fallback suggestion pair used whenever contextual suggestions cannot be
/// fetched (rate limited, offline, relay failure).
pub fn default_quick_replies() -> Vec<QuickReply> {
    text::DEFAULT_SUGGESTIONS
        .iter()
        .map(|s| QuickReply::verbatim(*s))
        .collect()
}

/// Offered right after a successful introduction.
pub fn post_introduction_quick_replies() -> Vec<QuickReply> {
    vec![
        QuickReply::verbatim(text::QR_ABOUT),
        QuickReply::verbatim(text::QR_SERVICES),
    ]
}

/// The "Tell me more about IntelliBuddy" feature rundown. Answered locally;
/// no model call is spent on it.
pub fn about_reply_text() -> String {
    "# IntelliBuddy Features\n\n\
     IntelliBuddy is a cutting-edge AI assistant powered by a hosted generative model. \
     It offers numerous advanced features:\n\n\
     * **Context-Aware Conversations**: I remember our conversation history\n\
     * **Time-Based Personalized Greetings** that adjust to your local time\n\
     * **Multi-Language Support** for communication in 10+ languages\n\
     * **Smart Suggestions** based on conversation context\n\
     * **Light & Dark Mode** for comfortable viewing\n\
     * **Message Reactions** for feedback (try the emoji reactions below!)\n\
     * **Rate-Limiting Awareness** for optimal experience\n\
     * **Offline Mode Detection** to maintain continuity\n\
     * **Personal Information Memory** across sessions\n\
     * **Markdown Rendering** for formatted responses\n\
     * **Message Copying** for easy sharing\n\
     * **Business Knowledge Integration** Tailors responses based on company data\n\n\
     ## How can I help you today?"
        .to_string()
}

pub fn about_reply_quick_replies() -> Vec<QuickReply> {
    vec![
        QuickReply::verbatim("How do you remember context?"),
        QuickReply::verbatim("Tell me about language support"),
    ]
}

/// The "What can you help me with?" capability rundown, also fully local.
pub fn services_reply_text() -> String {
    "## I can assist you with a variety of tasks:\n\n\
     * **Answering general knowledge questions**\n\
     * **Providing information on specific topics**\n\
     * **Explaining concepts and ideas**\n\
     * **Giving recommendations and suggestions**\n\
     * **Helping with creative tasks like writing and brainstorming**\n\
     * **Remembering our conversation context and your preferences**\n\
     * **Translating between languages**\n\
     * **Solving simple calculations and problems**\n\n\
     ## I also offer these special features:\n\n\
     * **Time-Based Greetings** - Personalized greetings based on your local time\n\
     * **Dark & Light Themes** - Comfortable viewing in any environment\n\
     * **Markdown Rendering** - Beautifully formatted responses with lists, headings, and code blocks\n\
     * **Message Reactions** - Express your feelings about responses with emoji reactions\n\
     * **Quick Reply Suggestions** - Smart contextual suggestions for faster interactions\n\
     * **Rate Limit Awareness** - Optimized experience that respects API usage limits\n\
     * **Offline Mode Detection** - Automatic notification when your connection is lost\n\
     * **Multi-Language Support** - Communication in 12 different languages\n\
     * **Context Menu** - Right-click to access reactions or copy message text\n\
     * **Business Knowledge Integration** - Tailors responses based on company data\n\n\
     ## What specific area would you like assistance with today?"
        .to_string()
}

pub fn services_reply_quick_replies() -> Vec<QuickReply> {
    vec![
        QuickReply::new("General knowledge question", "I have a general knowledge question"),
        QuickReply::new("Help with writing", "I need help with writing something"),
    ]
}

/// Acknowledgement lines per reaction kind; one is picked at random so
/// repeated reactions do not read canned.
fn ack_variants(kind: ReactionKind) -> &'static [&'static str] {
    match kind {
        ReactionKind::Heart => &[
            "I'm so glad you loved that! \u{1f970}",
            "Thank you for the love! \u{1f970} Is there anything else you'd like to explore?",
            "I'm happy my response was helpful! \u{2764}\u{fe0f}",
        ],
        ReactionKind::Laugh => &[
            "Glad I could bring a smile to your face! \u{1f92d}",
            "Happy to hear that was amusing! \u{1f606} Anything else you'd like to know?",
            "Always nice to share a laugh! \u{1f602}",
        ],
        ReactionKind::Smile => &[
            "Glad that was helpful! \u{1f60a}",
            "Thanks for the positive feedback! \u{1f60a}",
            "I'm happy that was useful for you! \u{1f60a}",
        ],
        ReactionKind::Angry => &[
            "I apologize if my response wasn't what you needed. How can I improve? \u{1f614}",
            "I'm sorry that wasn't helpful. Could you let me know what you're looking for? \u{1f614}",
            "I'll try to do better next time. What information would be more useful? \u{1f614}",
        ],
        ReactionKind::Sad => &[
            "I'm sorry if my answer wasn't what you expected. \u{1f622} How can I help better?",
            "Let me try to improve on that. \u{1f622} What specific information are you looking for?",
            "I apologize if that wasn't helpful. \u{1f622} Please let me know how I can assist you better.",
        ],
        ReactionKind::Wow => &[
            "I'm glad you found that impressive! \u{1f62e}",
            "Thank you! I aim to amaze! \u{1f62e}",
            "Wow indeed! \u{1f92f} If you have more questions, feel free to ask!",
        ],
    }
}

pub fn reaction_ack(kind: ReactionKind) -> String {
    let variants = ack_variants(kind);
    variants
        .choose(&mut rand::thread_rng())
        .unwrap_or(&variants[0])
        .to_string()
}
