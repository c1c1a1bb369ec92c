use std::time::Duration;

use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use tracing::*;

use super::ServiceError;
use crate::Config;

/// The one seam between this crate and the remote model: send a prompt, get text back.
///
/// Futures are local because the HTTP client is bound to its worker thread.
pub trait Transport {
    fn complete<'a>(&'a self, prompt: String) -> LocalBoxFuture<'a, Result<String, ServiceError>>;
}

/// Talks to an OpenAI compatible `/chat/completions` endpoint.
pub struct HttpTransport {
    client: awc::Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Largest response body accepted from the endpoint.
const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

impl HttpTransport {
    pub fn new(config: &Config) -> Self {
        Self {
            client: awc::Client::default(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout: config.timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, prompt: String) -> Result<String, ServiceError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            response_format: ResponseFormat { kind: "json_object" },
        };

        debug!("POST {} ({} prompt bytes)", self.endpoint, prompt.len());
        let mut response = self
            .client
            .post(self.endpoint.as_str())
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .send_json(&body)
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .body()
                .limit(MAX_RESPONSE_BYTES)
                .await
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .unwrap_or_default();
            return Err(ServiceError::Status(status.as_u16(), detail));
        }

        let reply: ChatResponse = response
            .json()
            .limit(MAX_RESPONSE_BYTES)
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ServiceError::EmptyResponse)
    }
}

impl Transport for HttpTransport {
    fn complete<'a>(&'a self, prompt: String) -> LocalBoxFuture<'a, Result<String, ServiceError>> {
        Box::pin(self.send(prompt))
    }
}
