pub mod config;
pub mod constants;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod limiter;
pub mod relay;
pub mod session;
pub mod storage;

// Re-export key types
pub use config::Settings;
pub use coordinator::Coordinator;
pub use error::BuddyError;
pub use limiter::{LanguageThrottle, RateLimitNotice, RateLimiter, SwitchOutcome};
pub use relay::{GenerateRequest, HealthStatus, HttpRelay, RelayClient, RelayReply};
pub use session::{Message, QuickReply, ReactionKind, Sender, Session, SessionStore};
pub use storage::Storage;
