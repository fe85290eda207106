//! # Assist HTTP Client
//!
//! Calls an external suggestion service. The service receives
//! `{"field": ..., "context": {...}}` and answers with a [`Suggestion`].
//! Every call is bounded by the configured timeout.

use crate::config::AssistConfig;
use serde::Serialize;
use std::time::Duration;
use trr_core::{AssistContext, AssistField, AugmentationUnavailable, Suggestion};

/// Source label used when the service leaves `source` empty.
const DEFAULT_SOURCE: &str = "assist-service";

#[derive(Serialize)]
struct SuggestRequest<'a> {
    field: AssistField,
    context: &'a AssistContext,
}

/// HTTP client for the assist service.
#[derive(Debug, Clone)]
pub struct AssistClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl AssistClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
            timeout,
        }
    }

    /// Client for `config`, or `None` when no endpoint is configured.
    #[must_use]
    pub fn from_config(config: &AssistConfig) -> Option<Self> {
        let endpoint = config.endpoint.as_deref()?.trim();
        if endpoint.is_empty() {
            return None;
        }
        Some(Self::new(
            endpoint,
            config.api_key.clone().filter(|k| !k.is_empty()),
            Duration::from_millis(config.timeout_ms),
        ))
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Ask the service for a suggestion on `field`.
    pub async fn suggest(
        &self,
        field: AssistField,
        context: &AssistContext,
    ) -> Result<Suggestion, AugmentationUnavailable> {
        match tokio::time::timeout(self.timeout, self.request(field, context)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(AugmentationUnavailable::new(format!(
                "timed out after {} ms",
                self.timeout.as_millis()
            ))),
        }
    }

    async fn request(
        &self,
        field: AssistField,
        context: &AssistContext,
    ) -> Result<Suggestion, AugmentationUnavailable> {
        let mut req = self
            .http
            .post(&self.endpoint)
            .json(&SuggestRequest { field, context });
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| {
            AugmentationUnavailable::new(format!("cannot reach {}: {e}", self.endpoint))
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AugmentationUnavailable::new("unauthorized"));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AugmentationUnavailable::new("rate limited"));
        }
        if !status.is_success() {
            return Err(AugmentationUnavailable::new(format!(
                "service answered {}",
                status.as_u16()
            )));
        }

        let mut suggestion = resp
            .json::<Suggestion>()
            .await
            .map_err(|e| AugmentationUnavailable::new(format!("malformed answer: {e}")))?;

        if suggestion.field != field {
            return Err(AugmentationUnavailable::new(format!(
                "asked for {field}, got {}",
                suggestion.field
            )));
        }
        if suggestion.source.trim().is_empty() {
            suggestion.source = DEFAULT_SOURCE.to_string();
        }
        Ok(suggestion)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn disabled_without_endpoint() {
        assert!(AssistClient::from_config(&AssistConfig::default()).is_none());

        let blank = AssistConfig {
            endpoint: Some("  ".into()),
            ..AssistConfig::default()
        };
        assert!(AssistClient::from_config(&blank).is_none());
    }

    #[test]
    fn built_from_config() {
        let config = AssistConfig {
            endpoint: Some("http://localhost:9090/suggest".into()),
            timeout_ms: 150,
            api_key: Some(String::new()),
        };
        let client = AssistClient::from_config(&config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:9090/suggest");
        assert_eq!(client.timeout(), Duration::from_millis(150));
        assert!(client.api_key.is_none());
    }

    #[tokio::test]
    async fn unreachable_service_is_unavailable() {
        // Port 9 (discard) is not expected to host an HTTP service.
        let client = AssistClient::new(
            "http://127.0.0.1:9/suggest",
            None,
            Duration::from_millis(500),
        );
        let result = client
            .suggest(AssistField::Completeness, &AssistContext::default())
            .await;
        assert!(result.is_err());
    }
}
