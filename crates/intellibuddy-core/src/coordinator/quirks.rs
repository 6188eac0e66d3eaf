use regex::Regex;

use crate::constants::text;

/// The remote model sometimes mistakes a quick-reply's text for a user
/// introducing themselves and opens with "Nice to meet you, Tell me more!".
/// When a reply to a quick-reply echoes the trigger inside such a greeting,
/// rewrite it into a topical lead-in. Pattern-based and best-effort; this is
/// UX polish, not correctness.
pub fn scrub_greeting_misattribution(reply: &str, trigger: &str) -> String {
    if !reply.contains("Nice to meet you") || !reply.contains(trigger) {
        return reply.to_string();
    }

    let generic_trigger = text::DEFAULT_SUGGESTIONS.contains(&trigger);
    let replacement = if generic_trigger {
        "About $1:"
    } else {
        "I understand you're asking about $1."
    };

    let greeting = Regex::new(r"Nice to meet you,\s+([^!]+)!").unwrap();
    greeting.replace_all(reply, replacement).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_echoed_trigger_greetings() {
        let reply = "Nice to meet you, Tell me more! Here is what I know.";
        let scrubbed = scrub_greeting_misattribution(reply, "Tell me more");
        assert_eq!(scrubbed, "About Tell me more: Here is what I know.");

        let reply = "Nice to meet you, quantum physics! It is fascinating.";
        let scrubbed = scrub_greeting_misattribution(reply, "quantum physics");
        assert_eq!(
            scrubbed,
            "I understand you're asking about quantum physics. It is fascinating."
        );
    }

    #[test]
    fn leaves_genuine_greetings_alone() {
        // Trigger text absent from the reply: the greeting is legitimate.
        let reply = "Nice to meet you, Sam! How can I help?";
        assert_eq!(
            scrub_greeting_misattribution(reply, "Tell me more"),
            reply
        );
    }
}
