//! Streaming chat completions over an OpenAI-compatible API.
//!
//! [`OpenAiChatClient`] sends `POST {base_url}/chat/completions` with
//! `stream: true` and turns the server-sent event body into a stream of
//! text deltas. Any server speaking the OpenAI wire format works (vLLM,
//! Ollama's `/v1`, LM Studio, OpenAI itself).

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use serde_json::{json, Value};
use std::pin::Pin;
use std::time::Duration;

use docs_rag_core::prompt::ChatMessage;

use crate::config::ModelConfig;

/// A stream of completion text deltas.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A chat model that can stream its answer.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Start a streaming completion of `messages` with `model`.
    ///
    /// Errors returned here happen before any text is produced; errors
    /// during streaming arrive as `Err` items.
    async fn stream_chat(&self, model: &str, messages: &[ChatMessage]) -> Result<TextStream>;
}

pub struct OpenAiChatClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiChatClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        Self::new(
            &config.base_model_url,
            config.api_key(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl ChatCompletion for OpenAiChatClient {
    async fn stream_chat(&self, model: &str, messages: &[ChatMessage]) -> Result<TextStream> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": model,
            "messages": messages,
            "stream": true,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| anyhow!("chat completion request to {} failed: {}", url, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("chat completion error {}: {}", status, text);
        }

        let mut bytes = response.bytes_stream();

        let stream = async_stream::stream! {
            let mut parser = SseParser::default();
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(anyhow!("chat completion stream failed: {}", e));
                        return;
                    }
                };
                for event in parser.feed(&chunk) {
                    match event {
                        SseEvent::Delta(text) => yield Ok(text),
                        SseEvent::Done => return,
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// One meaningful event from a completion stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Delta(String),
    Done,
}

/// Incremental parser for `data:` lines of an OpenAI streaming response.
///
/// Network chunks may split a line anywhere; incomplete trailing bytes are
/// kept until the next [`feed`](SseParser::feed).
#[derive(Debug, Default)]
pub struct SseParser {
    pending: Vec<u8>,
}

impl SseParser {
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = parse_line(line.trim()) {
                let done = event == SseEvent::Done;
                events.push(event);
                if done {
                    self.pending.clear();
                    break;
                }
            }
        }
        events
    }
}

fn parse_line(line: &str) -> Option<SseEvent> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        return Some(SseEvent::Done);
    }
    let json: Value = serde_json::from_str(data).ok()?;
    let content = json["choices"][0]["delta"]["content"].as_str()?;
    if content.is_empty() {
        None
    } else {
        Some(SseEvent::Delta(content.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(text: &str) -> String {
        format!(
            "data: {}\n\n",
            json!({ "choices": [{ "delta": { "content": text } }] })
        )
    }

    #[test]
    fn test_parses_deltas_and_done() {
        let mut parser = SseParser::default();
        let body = format!("{}{}data: [DONE]\n\n", delta("Par"), delta("is."));
        assert_eq!(
            parser.feed(body.as_bytes()),
            vec![
                SseEvent::Delta("Par".to_string()),
                SseEvent::Delta("is.".to_string()),
                SseEvent::Done
            ]
        );
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut parser = SseParser::default();
        let body = delta("hello");
        let (a, b) = body.split_at(17);
        assert!(parser.feed(a.as_bytes()).is_empty());
        assert_eq!(
            parser.feed(b.as_bytes()),
            vec![SseEvent::Delta("hello".to_string())]
        );
    }

    #[test]
    fn test_ignores_role_only_and_comment_lines() {
        let mut parser = SseParser::default();
        let role_only = format!(
            "data: {}\n",
            json!({ "choices": [{ "delta": { "role": "assistant" } }] })
        );
        let body = format!(": keep-alive\n{}{}", role_only, delta(""));
        assert!(parser.feed(body.as_bytes()).is_empty());
    }

    #[test]
    fn test_nothing_after_done() {
        let mut parser = SseParser::default();
        let body = format!("data: [DONE]\n{}", delta("late"));
        assert_eq!(parser.feed(body.as_bytes()), vec![SseEvent::Done]);
    }

    #[test]
    fn test_crlf_lines() {
        let mut parser = SseParser::default();
        let body = delta("x").replace('\n', "\r\n");
        assert_eq!(parser.feed(body.as_bytes()), vec![SseEvent::Delta("x".to_string())]);
    }
}
