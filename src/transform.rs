//! Client for the handwriting transform service.
//!
//! The service takes plain text and answers with notebook markup:
//!
//! ```text
//! POST /transform   {"text": "..."}
//! 200               {"formatted_text": "<span class=\"title\">...</span>"}
//! 4xx/5xx           {"error": "..."}
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Text known to be non-empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    pub fn new(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Error::Validation("text is empty".into()));
        }
        Ok(NonEmptyText(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Markup returned by the service, passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markup(pub String);

impl Markup {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Serialize)]
pub struct TransformRequest<'a> {
    pub text: &'a str,
}

/// Either payload shape the service may send back.
#[derive(Debug, Default, Deserialize)]
pub struct TransformResponse {
    #[serde(default)]
    pub formatted_text: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TransformResponse {
    /// Extract the markup, rejecting missing, non-string and empty values.
    pub fn into_markup(self) -> Result<Markup> {
        match self.formatted_text {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(Markup(s)),
            Some(serde_json::Value::String(_)) => {
                Err(Error::Protocol("formatted_text is empty".into()))
            }
            Some(other) => Err(Error::Protocol(format!(
                "formatted_text is not a string: {}",
                other
            ))),
            None => Err(Error::Protocol(
                self.error
                    .map(|e| format!("no formatted_text received ({})", e))
                    .unwrap_or_else(|| "no formatted_text received".into()),
            )),
        }
    }
}

/// Anything that can turn text into notebook markup.
#[async_trait]
pub trait TransformService: Send + Sync {
    async fn submit(&self, text: &NonEmptyText) -> Result<Markup>;
}

#[derive(Debug, Clone)]
pub struct TransformConfig {
    /// Base URL of the service; `/transform` and `/print` are resolved against it
    pub endpoint: String,
    pub timeout_ms: u64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5000".to_string(),
            timeout_ms: 30000,
        }
    }
}

impl TransformConfig {
    pub fn base_url(&self) -> Result<url::Url> {
        let mut base = url::Url::parse(&self.endpoint)
            .map_err(|e| Error::Config(format!("invalid endpoint '{}': {}", self.endpoint, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base)
    }

    pub fn route(&self, route: &str) -> Result<url::Url> {
        self.base_url()?
            .join(route.trim_start_matches('/'))
            .map_err(|e| Error::Config(format!("invalid route '{}': {}", route, e)))
    }
}

#[cfg(feature = "http")]
pub use http::HttpTransformClient;

#[cfg(feature = "http")]
mod http {
    use super::*;
    use std::time::Duration;

    /// `TransformService` over HTTP with reqwest.
    pub struct HttpTransformClient {
        client: reqwest::Client,
        url: url::Url,
    }

    impl HttpTransformClient {
        pub fn new(config: &TransformConfig) -> Result<Self> {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_millis(config.timeout_ms))
                .build()
                .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
            Ok(Self {
                client,
                url: config.route("transform")?,
            })
        }
    }

    #[async_trait]
    impl TransformService for HttpTransformClient {
        async fn submit(&self, text: &NonEmptyText) -> Result<Markup> {
            let resp = self
                .client
                .post(self.url.clone())
                .json(&TransformRequest { text: text.as_str() })
                .send()
                .await?;

            let status = resp.status();
            let body = resp.text().await?;

            if !status.is_success() {
                let detail = serde_json::from_str::<TransformResponse>(&body)
                    .ok()
                    .and_then(|r| r.error)
                    .unwrap_or_default();
                return Err(Error::Network(if detail.is_empty() {
                    format!("HTTP error! status: {}", status.as_u16())
                } else {
                    format!("HTTP error! status: {} ({})", status.as_u16(), detail)
                }));
            }

            let parsed: TransformResponse = serde_json::from_str(&body)
                .map_err(|e| Error::Protocol(format!("invalid JSON response: {}", e)))?;
            parsed.into_markup()
        }
    }
}
