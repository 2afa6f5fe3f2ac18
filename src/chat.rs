//! Retrieval-augmented chat responder.
//!
//! [`Responder::respond`] retrieves the lines most similar to a query, wraps
//! them into a prompt and streams the model's answer. Every item of the
//! returned stream is the answer accumulated so far, so a consumer can
//! simply replace what it displays with the latest item.

use futures_util::{Stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

use docs_rag_core::prompt::{build_prompt, history_prompt, ChatMessage, Turn};
use docs_rag_core::store::DocumentStore;

use crate::history::{ChatLog, ChatRecord};
use crate::llm::ChatCompletion;

pub struct Responder {
    store: Arc<dyn DocumentStore>,
    llm: Arc<dyn ChatCompletion>,
    model: String,
    n_results: usize,
    log: Option<Arc<dyn ChatLog>>,
}

impl Responder {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        llm: Arc<dyn ChatCompletion>,
        model: impl Into<String>,
        n_results: usize,
    ) -> Self {
        Self {
            store,
            llm,
            model: model.into(),
            n_results,
            log: None,
        }
    }

    pub fn with_log(mut self, log: Arc<dyn ChatLog>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Answer `query` from the `n_results` most similar stored lines.
    ///
    /// Yields the cumulative answer after each delta. If retrieval or the
    /// completion fails, yields one `Error: ...` item and ends. A completed
    /// answer is written to the chat log on a background task, so the stream
    /// ends without waiting for the write.
    pub fn respond(&self, query: &str) -> impl Stream<Item = String> + Send + 'static {
        let store = Arc::clone(&self.store);
        let llm = Arc::clone(&self.llm);
        let model = self.model.clone();
        let n_results = self.n_results;
        let log = self.log.clone();
        let query = query.to_string();

        async_stream::stream! {
            let hits = match store.query(&query, n_results).await {
                Ok(hits) => hits,
                Err(e) => {
                    yield format!("Error: {}", e);
                    return;
                }
            };

            let sources: Vec<String> = hits.iter().map(|h| h.source_label()).collect();
            debug!(query = %query, sources = ?sources, "retrieved context");

            let context: Vec<String> = hits.into_iter().map(|h| h.record.text).collect();
            let messages = build_prompt(&query, &context);

            let mut answer = String::new();
            let mut upstream = Box::pin(stream_answer(llm, model, messages));
            while let Some(item) = upstream.next().await {
                match item {
                    Accumulated::Answer(text) => {
                        answer = text.clone();
                        yield text;
                    }
                    Accumulated::Failed(message) => {
                        yield message;
                        return;
                    }
                }
            }

            if let Some(log) = log {
                let record = ChatRecord::now(query, answer);
                tokio::spawn(async move {
                    if let Err(e) = log.record_chat(record).await {
                        warn!(error = %e, "failed to record chat history");
                    }
                });
            }
        }
    }

    /// Chat with the model directly, without retrieval or logging.
    ///
    /// Only the user side of `prior` is sent, followed by `message`.
    pub fn respond_without_context(
        &self,
        message: &str,
        prior: &[Turn],
    ) -> impl Stream<Item = String> + Send + 'static {
        let messages = history_prompt(message, prior);
        stream_answer(Arc::clone(&self.llm), self.model.clone(), messages).map(|item| match item {
            Accumulated::Answer(text) | Accumulated::Failed(text) => text,
        })
    }
}

enum Accumulated {
    Answer(String),
    Failed(String),
}

/// Run one completion, yielding the accumulated text after each non-empty
/// delta, or a single failure message.
fn stream_answer(
    llm: Arc<dyn ChatCompletion>,
    model: String,
    messages: Vec<ChatMessage>,
) -> impl Stream<Item = Accumulated> + Send + 'static {
    async_stream::stream! {
        let mut deltas = match llm.stream_chat(&model, &messages).await {
            Ok(deltas) => deltas,
            Err(e) => {
                yield Accumulated::Failed(format!("Error: {}", e));
                return;
            }
        };

        let mut buffer = String::new();
        while let Some(delta) = deltas.next().await {
            match delta {
                Ok(text) if text.is_empty() => {}
                Ok(text) => {
                    buffer.push_str(&text);
                    yield Accumulated::Answer(buffer.clone());
                }
                Err(e) => {
                    yield Accumulated::Failed(format!("Error: {}", e));
                    return;
                }
            }
        }
    }
}
