use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::constants::relay as endpoints;
use crate::error::{BuddyError, Result};
use crate::relay::{GenerateRequest, HealthStatus, RelayClient, RelayReply};

/// HTTP client for the backend relay.
pub struct HttpRelay {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRelay {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(endpoints::REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn fallback_next_available() -> DateTime<Utc> {
        Utc::now() + Duration::milliseconds(endpoints::RATE_LIMIT_FALLBACK_MS)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    is_rate_limit_error: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    next_available_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct SuggestionsResponse {
    suggestions: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: String,
}

#[async_trait::async_trait]
impl RelayClient for HttpRelay {
    async fn generate(&self, request: GenerateRequest) -> Result<RelayReply> {
        let response = self
            .client
            .post(self.url(endpoints::GENERATE_PATH))
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        if status.as_u16() == 429 {
            // The relay reports its own upstream limit; carry the payload
            // through when it parses, otherwise synthesize the default wait.
            let body: GenerateResponse = response.json().await.unwrap_or(GenerateResponse {
                text: None,
                session_id: None,
                is_rate_limit_error: true,
                message: None,
                next_available_time: None,
            });
            return Ok(RelayReply::RateLimited {
                message: body
                    .message
                    .unwrap_or_else(|| "Rate limit exceeded. Please try again later.".to_string()),
                next_available_time: body
                    .next_available_time
                    .unwrap_or_else(Self::fallback_next_available),
            });
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BuddyError::Relay(format!(
                "generate failed ({}): {}",
                status, text
            )));
        }

        let body: GenerateResponse = response.json().await?;

        if body.is_rate_limit_error {
            return Ok(RelayReply::RateLimited {
                message: body
                    .message
                    .unwrap_or_else(|| "Rate limit exceeded. Please try again later.".to_string()),
                next_available_time: body
                    .next_available_time
                    .unwrap_or_else(Self::fallback_next_available),
            });
        }

        Ok(RelayReply::Text {
            text: body
                .text
                .ok_or_else(|| BuddyError::Relay("generate reply missing text".to_string()))?,
            session_id: body.session_id.unwrap_or_default(),
        })
    }

    async fn suggestions(
        &self,
        last_message: &str,
        session_id: &str,
        language: &str,
    ) -> Result<Vec<String>> {
        let response = self
            .client
            .post(self.url(endpoints::SUGGESTIONS_PATH))
            .json(&serde_json::json!({
                "lastMessage": last_message,
                "sessionId": session_id,
                "language": language,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BuddyError::Relay(format!("suggestions failed ({})", status)));
        }

        let body: SuggestionsResponse = response.json().await?;
        Ok(body.suggestions)
    }

    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        let response = self
            .client
            .post(self.url(endpoints::TRANSLATE_PATH))
            .json(&serde_json::json!({
                "text": text,
                "targetLanguage": target_language,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BuddyError::Relay(format!("translate failed ({})", status)));
        }

        let body: TranslateResponse = response.json().await?;
        Ok(body.translated_text)
    }

    async fn health(&self) -> Result<HealthStatus> {
        let response = self
            .client
            .get(self.url(endpoints::HEALTH_PATH))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BuddyError::Relay(format!("health probe failed ({})", status)));
        }

        Ok(response.json().await?)
    }
}
