use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{limits, storage_keys};
use crate::storage::Storage;

/// Verdict of a pre-dispatch limit check.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitStatus {
    pub can_proceed: bool,
    pub next_available_time: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

impl RateLimitStatus {
    fn proceed() -> Self {
        Self {
            can_proceed: true,
            next_available_time: None,
            message: None,
        }
    }

    fn blocked(next_available_time: DateTime<Utc>, message: String) -> Self {
        Self {
            can_proceed: false,
            next_available_time: Some(next_available_time),
            message: Some(message),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RateLimitState {
    minute_requests: u32,
    day_requests: u32,
    minute_window_start: DateTime<Utc>,
    day_window_start: DateTime<Utc>,
}

impl Default for RateLimitState {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            minute_requests: 0,
            day_requests: 0,
            minute_window_start: now,
            day_window_start: now,
        }
    }
}

/// Request budget over two rolling windows (per-minute and per-day).
/// Counters reset lazily when a window has elapsed; no background timers.
/// State is persisted after every mutation so a restart cannot launder the
/// budget; corrupt or missing persisted state loads as "no prior usage".
pub struct RateLimiter {
    state: RateLimitState,
    max_per_minute: u32,
    max_per_day: u32,
    storage: Option<Storage>,
}

impl RateLimiter {
    /// In-memory limiter (tests, ephemeral runs).
    pub fn new(max_per_minute: u32, max_per_day: u32) -> Self {
        Self {
            state: RateLimitState::default(),
            max_per_minute,
            max_per_day,
            storage: None,
        }
    }

    /// Limiter backed by durable storage; restores persisted counters.
    pub fn with_storage(max_per_minute: u32, max_per_day: u32, storage: Storage) -> Self {
        let state = storage
            .get::<RateLimitState>(storage_keys::RATE_LIMITS)
            .unwrap_or_default();
        Self {
            state,
            max_per_minute,
            max_per_day,
            storage: Some(storage),
        }
    }

    pub fn default_limits() -> Self {
        Self::new(limits::MAX_REQUESTS_PER_MINUTE, limits::MAX_REQUESTS_PER_DAY)
    }

    /// Gate an outbound call. The day limit is evaluated first: it is the
    /// outer bound, and when both windows are exhausted the caller must see
    /// the later recovery time.
    pub fn check_limit(&mut self) -> RateLimitStatus {
        self.check_limit_at(Utc::now())
    }

    pub fn check_limit_at(&mut self, now: DateTime<Utc>) -> RateLimitStatus {
        self.reset_elapsed_windows(now);

        if self.state.day_requests >= self.max_per_day {
            let reset_time = self.state.day_window_start + Duration::milliseconds(limits::DAY_WINDOW_MS);
            return RateLimitStatus::blocked(
                reset_time,
                "Daily request limit reached. Please try again tomorrow.".to_string(),
            );
        }

        if self.state.minute_requests >= self.max_per_minute {
            let reset_time =
                self.state.minute_window_start + Duration::milliseconds(limits::MINUTE_WINDOW_MS);
            let seconds_to_wait = (reset_time - now).num_milliseconds().max(0) as f64 / 1000.0;
            return RateLimitStatus::blocked(
                reset_time,
                format!(
                    "Rate limit reached. Please wait {} seconds before sending another message.",
                    seconds_to_wait.ceil() as i64
                ),
            );
        }

        RateLimitStatus::proceed()
    }

    /// Count one outbound call against both windows. Called exactly once per
    /// permitted call, immediately before dispatch, so in-flight calls are
    /// already on the books.
    pub fn increment_counter(&mut self) {
        self.increment_counter_at(Utc::now());
    }

    pub fn increment_counter_at(&mut self, now: DateTime<Utc>) {
        self.reset_elapsed_windows(now);
        self.state.minute_requests += 1;
        self.state.day_requests += 1;
        self.persist();
    }

    /// Current usage for display: (minute used, minute cap, day used, day cap).
    pub fn usage(&mut self) -> (u32, u32, u32, u32) {
        self.reset_elapsed_windows(Utc::now());
        (
            self.state.minute_requests,
            self.max_per_minute,
            self.state.day_requests,
            self.max_per_day,
        )
    }

    fn reset_elapsed_windows(&mut self, now: DateTime<Utc>) {
        let mut changed = false;

        if (now - self.state.minute_window_start).num_milliseconds() > limits::MINUTE_WINDOW_MS {
            self.state.minute_requests = 0;
            self.state.minute_window_start = now;
            changed = true;
        }

        if (now - self.state.day_window_start).num_milliseconds() > limits::DAY_WINDOW_MS {
            self.state.day_requests = 0;
            self.state.day_window_start = now;
            changed = true;
        }

        if changed {
            self.persist();
        }
    }

    fn persist(&self) {
        if let Some(ref storage) = self.storage {
            if let Err(e) = storage.set(storage_keys::RATE_LIMITS, &self.state) {
                tracing::warn!("failed to persist rate limit state: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minute_window_blocks_and_recovers() {
        let mut limiter = RateLimiter::new(12, 1400);
        let start = Utc::now();

        for _ in 0..12 {
            limiter.increment_counter_at(start);
        }

        let blocked = limiter.check_limit_at(start);
        assert!(!blocked.can_proceed);
        assert!(blocked.message.unwrap().contains("Rate limit reached"));

        let later = start + Duration::seconds(61);
        let recovered = limiter.check_limit_at(later);
        assert!(recovered.can_proceed);
        let (minute_used, _, _, _) = limiter.usage();
        assert_eq!(minute_used, 0);
    }

    #[test]
    fn day_limit_takes_precedence_over_minute() {
        let mut limiter = RateLimiter::new(1, 1);
        let start = Utc::now();
        limiter.increment_counter_at(start);

        let blocked = limiter.check_limit_at(start);
        assert!(!blocked.can_proceed);
        // Both windows are exhausted; the reported recovery time must be the
        // day window's, the later of the two.
        let next = blocked.next_available_time.unwrap();
        assert_eq!(next, start + Duration::milliseconds(limits::DAY_WINDOW_MS));
        assert!(blocked.message.unwrap().contains("Daily request limit"));
    }
}
