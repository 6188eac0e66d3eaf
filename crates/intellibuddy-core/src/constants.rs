/// IntelliBuddy — centralized constants.
/// All magic numbers, strings, and limits live here.
/// Never hardcode these values elsewhere.

// ─── Rate Limits ──────────────────────────────────────────────────────────────

pub mod limits {
    /// Per-minute request cap. The hosted model's free tier allows 15;
    /// 12 leaves a safety margin for calls from other tabs of the same user.
    pub const MAX_REQUESTS_PER_MINUTE: u32 = 12;
    /// Daily request cap (free tier allows 1500; margin as above).
    pub const MAX_REQUESTS_PER_DAY: u32 = 1400;

    pub const MINUTE_WINDOW_MS: i64 = 60_000;
    pub const DAY_WINDOW_MS: i64 = 86_400_000;

    /// Language switches permitted per rolling minute.
    pub const MAX_LANGUAGE_SWITCHES_PER_MINUTE: u32 = 2;
    pub const LANGUAGE_WINDOW_MS: i64 = 60_000;
}

// ─── Prompt Context ───────────────────────────────────────────────────────────

pub mod context {
    /// Most recent messages included in the prompt context.
    pub const MAX_CONTEXT_MESSAGES: usize = 50;

    /// A reply shorter than this with no whitespace is treated as a
    /// bare name answer during the name-collection phase.
    pub const SHORT_NAME_MAX_LEN: usize = 20;
    pub const MIN_NAME_LEN: usize = 2;
}

// ─── Relay Endpoints ──────────────────────────────────────────────────────────

pub mod relay {
    pub const DEFAULT_BASE_URL: &str = "http://localhost:3001/api/gemini";
    pub const GENERATE_PATH: &str = "/generate";
    pub const SUGGESTIONS_PATH: &str = "/suggestions";
    pub const TRANSLATE_PATH: &str = "/translate";
    pub const HEALTH_PATH: &str = "/health";

    /// Advisory request timeout; the relay is expected to answer well
    /// within this.
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Fallback wait applied when the backend reports a rate limit
    /// without a next-available time.
    pub const RATE_LIMIT_FALLBACK_MS: i64 = 60_000;
}

// ─── Durable Storage Keys ─────────────────────────────────────────────────────

pub mod storage_keys {
    pub const RATE_LIMITS: &str = "intellibuddy_rate_limits";
    pub const LANGUAGE_THROTTLE: &str = "intellibuddy_language_throttle";
    pub const RATE_LIMIT_NOTICE: &str = "intellibuddy_rate_limit_notice";
    pub const LANGUAGE: &str = "intellibuddy_language";
    pub const THEME: &str = "intellibuddy_theme";
    pub const USER_INFO: &str = "intellibuddy_user_info";
}

// ─── Canned Text ──────────────────────────────────────────────────────────────

pub mod text {
    pub const SEED_GREETING: &str = "Hi there! I'm IntelliBuddy. What's your name?";

    pub const OFFLINE_NOTICE: &str =
        "You're currently offline. Please check your internet connection and try again.";

    pub const GENERIC_APOLOGY: &str =
        "Sorry, I encountered an error. Please try again later.";

    pub const NOT_A_NAME: &str =
        "That doesn't seem like a name. Could you please tell me your actual name?";
    pub const INVALID_NAME: &str =
        "That doesn't look like a name. Please tell me your name so I can address you properly.";
    pub const NAME_NOT_CAUGHT: &str =
        "I didn't catch your name. Could you please tell me what I should call you?";
    pub const NAME_UNKNOWN: &str =
        "I don't believe you've told me your name yet. What should I call you?";

    pub const IDENTITY_REPLY: &str =
        "I'm IntelliBuddy, your AI assistant. How can I help you today?";

    /// Steering prompt sent in place of the user's text when they ask what
    /// their name is; lets the model answer from conversation context.
    pub const NAME_RECALL_PROMPT: &str =
        "The user is asking what their name is. If you know their name from previous context, \
         tell them their name politely. If not, tell them you don't know their name yet.";

    pub const DEFAULT_SUGGESTIONS: [&str; 2] = ["Tell me more", "Thanks for the info"];

    pub const QR_ABOUT: &str = "Tell me more about IntelliBuddy";
    pub const QR_SERVICES: &str = "What can you help me with?";
}

// ─── Defaults ─────────────────────────────────────────────────────────────────

pub mod defaults {
    pub const LANGUAGE: &str = "en";
    pub const THEME: &str = "light";
}

// ─── Config Paths ─────────────────────────────────────────────────────────────

pub mod paths {
    pub const CONFIG_DIR: &str = "intellibuddy";
    pub const CONFIG_FILE: &str = "config.toml";
    pub const STORAGE_DIR: &str = "intellibuddy";
}
