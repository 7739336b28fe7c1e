//! Reqwest-based HTTP backend: the default `GenerationBackend` for talking
//! to a remote content-generation endpoint that accepts a prompt plus a
//! named schema hint and returns a JSON body.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::types::{GenerationBackend, GenerationOptions, GenerationResponse, LlmError};

pub struct HttpBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Serialize)]
struct RequestBody<'a> {
    prompt: &'a str,
    schema: &'a str,
    correlation_id: &'a str,
    attachment_id: Option<&'a str>,
}

impl HttpBackend {
    pub fn new(endpoint: String, api_key: String, timeout: std::time::Duration) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| LlmError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    async fn invoke(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, LlmError> {
        let body = RequestBody {
            prompt,
            schema: &options.schema,
            correlation_id: &options.correlation_id.0,
            attachment_id: options.attachment_id.as_deref(),
        };

        debug!(schema = %options.schema, "invoking generation backend");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    LlmError::Timeout(std::time::Duration::default())
                } else {
                    LlmError::Transport(err.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(LlmError::Provider(format!(
                "backend returned status {}",
                response.status()
            )));
        }

        let raw_text = response
            .text()
            .await
            .map_err(|err| LlmError::Transport(err.to_string()))?;

        let structured = serde_json::from_str(&raw_text).ok();

        Ok(GenerationResponse {
            structured,
            raw_text,
        })
    }
}
