//! Chat front end over HTTP.
//!
//! Serves a small browser page and a JSON/SSE API on top of a
//! [`Responder`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Chat page |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/about` | Provider, model, repository and contacts |
//! | `POST` | `/api/chat` | Retrieval-augmented answer as SSE |
//! | `POST` | `/api/chat/plain` | Answer without documents as SSE |
//! | `POST` | `/api/feedback` | Record a thumbs up/down |
//!
//! Each SSE event carries `{"answer": "<accumulated answer>"}`.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "message must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `internal` (500).

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use docs_rag_core::prompt::Turn;
use docs_rag_core::store::DocumentStore;

use crate::chat::Responder;
use crate::config::Config;
use crate::db;
use crate::embedding::Embedder;
use crate::history::{ChatLog, CsvHistory, FeedbackRecord, Vote};
use crate::llm::OpenAiChatClient;
use crate::sqlite_store::SqliteStore;

const PAGE_TEMPLATE: &str = include_str!("../static/index.html");

/// Fields shown on the page's "About this service" panel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AboutInfo {
    pub title: String,
    pub description: String,
    pub service_provider: Option<String>,
    pub base_model_url: String,
    pub model_name: String,
    pub repo_url: Option<String>,
    pub contacts: Vec<String>,
}

impl AboutInfo {
    pub fn from_config(config: &Config) -> Self {
        Self {
            title: config.front_end.title.clone(),
            description: config.front_end.description.clone(),
            service_provider: config.model.service_provider.clone(),
            base_model_url: config.model.base_model_url.clone(),
            model_name: config.model.model_name.clone(),
            repo_url: config.general.repo_url.clone(),
            contacts: config.general.contacts.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    responder: Arc<Responder>,
    history: Arc<dyn ChatLog>,
    about: Arc<AboutInfo>,
    page: Arc<String>,
}

impl AppState {
    pub fn new(responder: Arc<Responder>, history: Arc<dyn ChatLog>, about: AboutInfo) -> Self {
        let page = render_page(&about);
        Self {
            responder,
            history,
            about: Arc::new(about),
            page: Arc::new(page),
        }
    }
}

/// Open the collection, build the responder and serve until terminated.
///
/// `bind` overrides `server.bind` from the config.
pub async fn run_server(config: &Config, bind: Option<String>) -> anyhow::Result<()> {
    let bind_addr = bind.unwrap_or_else(|| config.server.bind.clone());

    let embedder = Embedder::from_config(&config.embedding)?.map(Arc::new);
    let pool = db::connect(&config.chromadb.persist_directory).await?;
    let store: Arc<dyn DocumentStore> = Arc::new(
        SqliteStore::open_collection(pool, &config.chromadb.collection_name, embedder).await?,
    );

    let llm = Arc::new(OpenAiChatClient::from_config(&config.model)?);
    let history: Arc<dyn ChatLog> = Arc::new(CsvHistory::new(
        config.history.chat_log.clone(),
        config.history.feedback_log.clone(),
    ));

    let responder = Responder::new(
        store,
        llm,
        config.model.model_name.clone(),
        config.chromadb.n_results,
    )
    .with_log(history.clone());

    let state = AppState::new(Arc::new(responder), history, AboutInfo::from_config(config));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(bind = %bind_addr, model = %config.model.model_name, "chat server listening");
    println!("Chat server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_page))
        .route("/health", get(handle_health))
        .route("/about", get(handle_about))
        .route("/api/chat", post(handle_chat))
        .route("/api/chat/plain", post(handle_chat_plain))
        .route("/api/feedback", post(handle_feedback))
        .layer(cors)
        .with_state(state)
}

fn render_page(about: &AboutInfo) -> String {
    let none = || "-".to_string();
    PAGE_TEMPLATE
        .replace("{{TITLE}}", &escape_html(&about.title))
        .replace("{{DESCRIPTION}}", &escape_html(&about.description))
        .replace(
            "{{PROVIDER}}",
            &escape_html(&about.service_provider.clone().unwrap_or_else(none)),
        )
        .replace("{{BASE_URL}}", &escape_html(&about.base_model_url))
        .replace("{{MODEL}}", &escape_html(&about.model_name))
        .replace(
            "{{REPO_URL}}",
            &escape_html(&about.repo_url.clone().unwrap_or_else(none)),
        )
        .replace("{{CONTACTS}}", &escape_html(&about.contacts.join(", ")))
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Malformed bodies get the same error shape as failed validation.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

// ============ Handlers ============

async fn handle_page(State(state): State<AppState>) -> Html<String> {
    Html(state.page.as_ref().clone())
}

#[derive(Serialize, Deserialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_about(State(state): State<AppState>) -> Json<AboutInfo> {
    Json(state.about.as_ref().clone())
}

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Deserialize)]
struct PlainChatRequest {
    message: String,
    /// Earlier `[user, assistant]` pairs.
    #[serde(default)]
    history: Vec<(String, String)>,
}

#[derive(Serialize)]
struct AnswerEvent<'a> {
    answer: &'a str,
}

fn to_sse(
    answers: impl Stream<Item = String> + Send + 'static,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send> {
    let events = answers.map(|answer| {
        let data = serde_json::to_string(&AnswerEvent { answer: &answer }).unwrap_or_default();
        Ok(Event::default().data(data))
    });
    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

async fn handle_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let message = req.message.trim();
    if message.is_empty() {
        return Err(bad_request("message must not be empty"));
    }
    Ok(to_sse(state.responder.respond(message)))
}

async fn handle_chat_plain(
    State(state): State<AppState>,
    payload: Result<Json<PlainChatRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let message = req.message.trim();
    if message.is_empty() {
        return Err(bad_request("message must not be empty"));
    }
    let prior: Vec<Turn> = req
        .history
        .into_iter()
        .map(|(user, assistant)| Turn { user, assistant })
        .collect();
    Ok(to_sse(state.responder.respond_without_context(message, &prior)))
}

#[derive(Deserialize)]
struct FeedbackRequest {
    vote: String,
    answer: String,
}

async fn handle_feedback(
    State(state): State<AppState>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(req) = payload?;
    let vote = match req.vote.as_str() {
        "up" => Vote::Up,
        "down" => Vote::Down,
        other => return Err(bad_request(format!("vote must be up or down, got: {}", other))),
    };

    state
        .history
        .record_feedback(FeedbackRecord::now(vote, req.answer))
        .await
        .map_err(|e| {
            error!(error = %e, "failed to record feedback");
            internal(format!("failed to record feedback: {}", e))
        })?;

    Ok(Json(serde_json::json!({ "status": "recorded" })))
}
