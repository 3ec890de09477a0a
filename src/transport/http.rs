//! `reqwest` implementation of [`ChatTransport`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;

use super::{ChatRequest, ChatTransport, ExtractionSource};
use crate::character::ExtractedCharacter;
use crate::config::ClientConfig;
use crate::error::ChatError;

/// `{ "characters": [...] }` returned by the extraction service.
#[derive(Debug, Deserialize)]
struct ExtractionResponse {
    characters: Vec<ExtractedCharacter>,
}

/// HTTP client for the inference service.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ChatError> {
        Self::new(
            config.api_base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Read a JSON body.
    ///
    /// Non-2xx statuses are `TransportFailure`; a 2xx body that is not JSON
    /// is `UnrecognizedResponseShape`.
    async fn read_json(resp: reqwest::Response) -> Result<Value, ChatError> {
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ChatError::transport(format!(
                "server returned {}: {}",
                status, text
            )));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| ChatError::unrecognized(format!("body is not JSON: {}", e)))
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn chat(&self, request: &ChatRequest) -> Result<Value, ChatError> {
        log::info!(
            "POST /chat character={} history={}",
            request.character_id,
            request.history.len()
        );
        let resp = self
            .http
            .post(self.url("/chat"))
            .json(request)
            .send()
            .await?;
        Self::read_json(resp).await
    }

    async fn extract_characters(
        &self,
        source: &ExtractionSource,
    ) -> Result<Vec<ExtractedCharacter>, ChatError> {
        let builder = self.http.post(self.url("/extract_characters"));
        let builder = match source {
            ExtractionSource::Pdf {
                file_name,
                bytes,
                book_title,
            } => {
                let part = Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str("application/pdf")?;
                let form = Form::new()
                    .part("file", part)
                    .text("book_title", book_title.clone());
                builder.multipart(form)
            }
            ExtractionSource::Text { text, book_title } => builder.json(&serde_json::json!({
                "text": text,
                "book_title": book_title,
            })),
        };

        log::info!("POST /extract_characters title={}", source.book_title());
        let body = Self::read_json(builder.send().await?).await?;
        let parsed: ExtractionResponse = serde_json::from_value(body)
            .map_err(|e| ChatError::unrecognized(format!("extraction reply: {}", e)))?;
        Ok(parsed.characters)
    }
}
