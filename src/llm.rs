use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::config::{Config, resolve_api_key};
use crate::conversation::ChatMessage;

/// Something that turns a conversation into model output.
///
/// Fragments are handed to `on_fragment` as they arrive; the return value is
/// the complete accumulated text.
pub trait ChatBackend {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        on_fragment: &mut dyn FnMut(&str),
    ) -> Result<String>;
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
}

impl HttpBackend {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: cfg.base_url.clone(),
            model: cfg.model.clone(),
            api_key: resolve_api_key(cfg),
            max_tokens: cfg.max_tokens,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response> {
        let mut req = self.client.post(&self.base_url).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req
            .send()
            .await
            .with_context(|| format!("Request failed: {}", self.base_url))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.context("Failed to read response body")?;
            bail!("API error {}: {}", status, text);
        }
        Ok(resp)
    }

    /// One short non-streaming completion, used to check the endpoint.
    pub async fn ping(&self) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": "ping"}],
            "max_tokens": 8,
            "stream": false
        });
        let resp = self.send(&body).await?;
        let text = resp.text().await.context("Failed to read response body")?;
        let val: Value = serde_json::from_str(&text).context("Invalid JSON response")?;
        extract_content(&val, "message").context("Cannot parse response content")
    }
}

impl ChatBackend for HttpBackend {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        on_fragment: &mut dyn FnMut(&str),
    ) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": messages,
            "response_format": {"type": "json_object"},
            "max_tokens": self.max_tokens,
            "stream": true
        });
        debug!(
            model = %self.model,
            messages = messages.len(),
            "sending chat completion request"
        );
        let mut resp = self.send(&body).await?;

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !content_type.contains("text/event-stream") {
            let text = resp.text().await.context("Failed to read response body")?;
            let val: Value = serde_json::from_str(&text).context("Invalid JSON response")?;
            let out = extract_content(&val, "message").context("Cannot parse response content")?;
            on_fragment(&out);
            return Ok(out);
        }

        let mut decoder = SseDecoder::default();
        let mut full = String::new();
        while let Some(chunk) = resp.chunk().await.context("Failed to read stream chunk")? {
            for delta in decoder.push(&chunk) {
                on_fragment(&delta);
                full.push_str(&delta);
            }
            if decoder.is_done() {
                break;
            }
        }
        debug!(chars = full.len(), "stream finished");
        Ok(full)
    }
}

/// Incremental decoder for `data:` lines of a chat completion event stream.
///
/// Bytes are buffered until a full line is available, so multi-byte
/// characters and events split across network chunks decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut out = Vec::new();
        if self.done {
            return out;
        }
        self.buffer.extend_from_slice(chunk);

        while let Some(idx) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=idx).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();
            if data.is_empty() {
                continue;
            }
            if data == "[DONE]" {
                self.done = true;
                self.buffer.clear();
                break;
            }
            let Ok(val) = serde_json::from_str::<Value>(data) else {
                trace!(data, "skipping undecodable event");
                continue;
            };
            if let Some(delta) = extract_content(&val, "delta")
                && !delta.is_empty()
            {
                out.push(delta);
            }
        }
        out
    }
}

/// `choices[0].<field>.content`, as a plain string or an array of text parts.
fn extract_content(value: &Value, field: &str) -> Option<String> {
    let content = value.get("choices")?.get(0)?.get(field)?.get("content")?;
    match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let mut out = String::new();
            for item in items {
                if item.get("type").and_then(|t| t.as_str()) == Some("text")
                    && let Some(t) = item.get("text").and_then(|t| t.as_str())
                {
                    out.push_str(t);
                }
            }
            if out.is_empty() { None } else { Some(out) }
        }
        _ => None,
    }
}
