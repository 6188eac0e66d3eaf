mod language;
mod rate;

pub use language::{LanguageThrottle, SwitchOutcome};
pub use rate::{RateLimitStatus, RateLimiter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The user-facing rate-limit banner. Both the API limiter and the language
/// throttle surface through this one channel; the UI runs a cosmetic
/// countdown against `next_available_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitNotice {
    pub message: String,
    pub next_available_time: DateTime<Utc>,
}

impl RateLimitNotice {
    pub fn new(message: impl Into<String>, next_available_time: DateTime<Utc>) -> Self {
        Self {
            message: message.into(),
            next_available_time,
        }
    }

    /// Whether the wait has elapsed.
    pub fn expired(&self) -> bool {
        Utc::now() >= self.next_available_time
    }

    pub fn seconds_left(&self) -> i64 {
        ((self.next_available_time - Utc::now()).num_milliseconds().max(0) as f64 / 1000.0).ceil()
            as i64
    }
}
