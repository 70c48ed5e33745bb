use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use aircare_engine::NextAction;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::app::AppState;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub text: String,
}

#[derive(Serialize)]
pub struct Bubble {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub bubbles: Vec<Bubble>,
    pub next: &'static str,
    pub status: &'static str,
    pub meta: Value,
}

/// POST /chat — the single authoritative inbound chat operation.
pub async fn chat_handler(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Json<ChatResponse> {
    let start = Instant::now();
    let result = state.engine.handle(&req.user_id, &req.text).await;
    let took_ms = start.elapsed().as_millis() as u64;

    Json(ChatResponse {
        bubbles: result.bubbles.into_iter().map(|text| Bubble { kind: "text", text }).collect(),
        next: match result.next {
            NextAction::AwaitReply => "await_reply",
            NextAction::End => "end",
        },
        status: result.status.as_str(),
        meta: json!({ "took_ms": took_ms }),
    })
}

#[derive(Deserialize)]
pub struct FeedbackRequest {
    pub user_id: String,
    pub rating: u8,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Serialize)]
pub struct FeedbackResponse {
    pub ok: bool,
}

/// POST /feedback — appended as one JSONL line, grounded on the chat
/// logger's append-under-mutex idiom (a dedicated file rather than the
/// shared chat log, since feedback isn't a conversation turn).
pub async fn feedback_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, (StatusCode, Json<Value>)> {
    if !(1..=5).contains(&req.rating) {
        return Err((StatusCode::BAD_REQUEST, Json(json!({"error": "rating must be between 1 and 5"}))));
    }
    let record = json!({
        "ts": aircare_core::now_iso(),
        "user_id": req.user_id,
        "rating": req.rating,
        "note": req.note,
    });
    let write_result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&state.feedback_log_path)
        .and_then(|mut f| writeln!(f, "{record}"));
    if let Err(e) = write_result {
        tracing::warn!(error = %e, "failed to append feedback record");
    }
    Ok(Json(FeedbackResponse { ok: true }))
}

#[derive(Deserialize)]
pub struct AdminResetRequest {
    pub user_id: String,
    pub secret: String,
}

pub async fn admin_reset_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdminResetRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .config
        .check_admin_secret(&req.secret)
        .map_err(|_| (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid admin secret"}))))?;
    state.engine.memory.clear(&req.user_id);
    Ok(Json(json!({"ok": true})))
}

#[derive(Deserialize)]
pub struct AdminStatsQuery {
    pub secret: String,
}

pub async fn admin_stats_handler(
    State(state): State<Arc<AppState>>,
    axum::extract::Query(query): axum::extract::Query<AdminStatsQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .config
        .check_admin_secret(&query.secret)
        .map_err(|_| (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid admin secret"}))))?;
    Ok(Json(state.engine.memory.stats()))
}

/// GET /health — liveness probe, includes the Ollama provider's
/// best-effort health check.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let ollama_ok = state.engine.llm.health_check().await;
    Json(json!({
        "status": "ok",
        "ollama": ollama_ok,
    }))
}
