use regex::Regex;

use crate::constants::context as limits;

/// Facts gleaned from a single user message. Extraction is best-effort
/// pattern matching; false positives are an accepted limitation of the
/// heuristics, mitigated downstream by the name stoplist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFacts {
    pub name: Option<String>,
    pub topics: Vec<String>,
}

/// Subject vocabulary scanned for topic mentions.
const SUBJECTS: &[&str] = &[
    "math",
    "mathematics",
    "algebra",
    "geometry",
    "calculus",
    "science",
    "biology",
    "chemistry",
    "physics",
    "history",
    "geography",
    "literature",
    "english",
    "computer",
    "programming",
    "coding",
    "art",
    "music",
];

/// Ordered name patterns; the first capture wins.
fn name_patterns() -> Vec<Regex> {
    [
        r"(?i)my name is\s+([^.,!?]+)",
        r"(?i)i am\s+([^.,!?]+)",
        r"(?i)call me\s+([^.,!?]+)",
        r"(?i)i'm\s+([^.,!?]+)",
        r"(?i)name'?s\s+([^.,!?]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
}

/// Extract a name candidate from free text. Tries the pattern table first;
/// failing that, a short whitespace-free message is taken verbatim as a bare
/// name answer (trailing punctuation stripped).
pub fn extract_name(text: &str) -> Option<String> {
    for pattern in name_patterns() {
        if let Some(captures) = pattern.captures(text) {
            if let Some(m) = captures.get(1) {
                let candidate = m.as_str().trim();
                if !candidate.is_empty() {
                    return Some(candidate.to_string());
                }
            }
        }
    }

    let trimmed = text.trim().trim_end_matches(['.', ',', '!', '?']);
    if !trimmed.is_empty()
        && trimmed.len() < limits::SHORT_NAME_MAX_LEN
        && !trimmed.contains(char::is_whitespace)
    {
        return Some(trimmed.to_string());
    }

    None
}

/// Case-insensitive scan for subject-area mentions.
pub fn extract_topics(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    SUBJECTS
        .iter()
        .filter(|subject| lower.contains(*subject))
        .map(|s| s.to_string())
        .collect()
}

pub fn extract_user_facts(text: &str) -> ExtractedFacts {
    ExtractedFacts {
        name: extract_name(text),
        topics: extract_topics(text),
    }
}

/// Phrasebook language sniff for the first message of a conversation.
/// Returns an ISO 639-1 code, or None to stay with the default.
pub fn detect_language(text: &str) -> Option<&'static str> {
    let phrasebooks: [(&str, &str); 3] = [
        ("es", r"(?i)hola|cómo estás|buenos días|gracias|por favor"),
        ("fr", r"(?i)bonjour|salut|merci|s'il vous plaît|comment ça va"),
        ("de", r"(?i)hallo|guten tag|danke|bitte|wie geht es dir"),
    ];

    for (code, pattern) in phrasebooks {
        if Regex::new(pattern).unwrap().is_match(text) {
            return Some(code);
        }
    }
    None
}

/// Whether the message reads like a question worth remembering.
pub fn looks_like_question(text: &str) -> bool {
    let lower = text.to_lowercase();
    text.contains('?')
        || lower.starts_with("how")
        || lower.starts_with("what")
        || lower.starts_with("why")
}
