mod http;

pub use http::HttpRelay;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Everything the backend relay needs for one generate call. The phase flags
/// let the remote side bias its own post-processing (first-greeting wording,
/// name misattribution fixes).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: String,
    pub session_id: String,
    pub is_quick_reply: bool,
    pub language: String,
    pub context: String,
    pub enhanced_prompt: String,
    pub enhanced_context: String,
    pub is_first_interaction: bool,
    pub has_just_provided_name: bool,
}

/// Outcome of a generate call, discriminated explicitly so call sites have
/// to handle the rate-limited arm.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayReply {
    Text {
        text: String,
        session_id: String,
    },
    RateLimited {
        message: String,
        next_available_time: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    /// Whether the relay holds the model credentials it needs.
    #[serde(default)]
    pub has_credentials: bool,
}

/// The backend relay seam. The coordinator only ever talks to this trait;
/// tests drop in a mock, production wires an [`HttpRelay`].
#[async_trait::async_trait]
pub trait RelayClient: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<RelayReply>;

    /// Two short follow-up suggestions for the given bot message. The relay
    /// guarantees a well-formed pair, falling back server-side when the
    /// model's output cannot be parsed.
    async fn suggestions(
        &self,
        last_message: &str,
        session_id: &str,
        language: &str,
    ) -> Result<Vec<String>>;

    async fn translate(&self, text: &str, target_language: &str) -> Result<String>;

    async fn health(&self) -> Result<HealthStatus>;
}

/// Translate with a lossless fallback: any failure resolves to the original
/// text unchanged. Message translation must never make a conversation worse.
pub async fn translate_or_original(
    relay: &dyn RelayClient,
    text: &str,
    target_language: &str,
) -> String {
    match relay.translate(text, target_language).await {
        Ok(translated) => translated,
        Err(e) => {
            tracing::warn!("translation failed, keeping original text: {}", e);
            text.to_string()
        }
    }
}
