use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{limits, storage_keys};
use crate::storage::Storage;

/// Result of asking the throttle for one language switch.
#[derive(Debug, Clone, PartialEq)]
pub enum SwitchOutcome {
    Allowed,
    Blocked {
        next_available_time: DateTime<Utc>,
        seconds_left: i64,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LanguageThrottleState {
    switch_count: u32,
    window_start: Option<DateTime<Utc>>,
    limited: bool,
}

/// Throttle on conversation-wide retranslation: at most two language
/// switches per rolling minute, measured from the first switch in the
/// window. Independent of the API rate limiter, but surfaced through the
/// same user-facing notice.
pub struct LanguageThrottle {
    state: LanguageThrottleState,
    max_switches: u32,
    storage: Option<Storage>,
}

impl LanguageThrottle {
    pub fn new(max_switches: u32) -> Self {
        Self {
            state: LanguageThrottleState::default(),
            max_switches,
            storage: None,
        }
    }

    pub fn with_storage(max_switches: u32, storage: Storage) -> Self {
        let state = storage
            .get::<LanguageThrottleState>(storage_keys::LANGUAGE_THROTTLE)
            .unwrap_or_default();
        Self {
            state,
            max_switches,
            storage: Some(storage),
        }
    }

    pub fn default_limits() -> Self {
        Self::new(limits::MAX_LANGUAGE_SWITCHES_PER_MINUTE)
    }

    pub fn try_switch(&mut self) -> SwitchOutcome {
        self.try_switch_at(Utc::now())
    }

    pub fn try_switch_at(&mut self, now: DateTime<Utc>) -> SwitchOutcome {
        self.reset_if_elapsed(now);

        if self.state.switch_count >= self.max_switches {
            self.state.limited = true;
            let window_start = self.state.window_start.unwrap_or(now);
            let next_available_time =
                window_start + Duration::milliseconds(limits::LANGUAGE_WINDOW_MS);
            let seconds_left = ((next_available_time - now).num_milliseconds().max(0) as f64
                / 1000.0)
                .ceil() as i64;
            self.persist();
            return SwitchOutcome::Blocked {
                next_available_time,
                seconds_left,
            };
        }

        if self.state.switch_count == 0 {
            self.state.window_start = Some(now);
        }
        self.state.switch_count += 1;
        self.persist();
        SwitchOutcome::Allowed
    }

    pub fn is_limited(&self) -> bool {
        self.state.limited
    }

    fn reset_if_elapsed(&mut self, now: DateTime<Utc>) {
        if let Some(start) = self.state.window_start {
            if (now - start).num_milliseconds() > limits::LANGUAGE_WINDOW_MS {
                self.state = LanguageThrottleState::default();
                self.persist();
            }
        }
    }

    fn persist(&self) {
        if let Some(ref storage) = self.storage {
            if let Err(e) = storage.set(storage_keys::LANGUAGE_THROTTLE, &self.state) {
                tracing::warn!("failed to persist language throttle state: {}", e);
            }
        }
    }
}
