//! Chat API handlers
//!
//! `POST /chat` 跑完整的 tool-calling 循环并返回最终回复；
//! `POST /chat/stream` 做纯文本流式问答，把 gateway 的增量片段
//! 以 SSE 形式转发给浏览器。

use std::convert::Infallible;

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, Sse},
    Json,
};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;

use crate::api::state::SharedState;
use crate::chat::{self, SseAccumulator};
use crate::error::TaskFlowError;
use crate::model::ChatMessage;

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Chat request
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

/// Chat response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub content: String,
    #[serde(rename = "tasksCreated")]
    pub tasks_created: bool,
}

/// Chat error body
#[derive(Debug, Serialize)]
pub struct ChatErrorBody {
    pub error: String,
}

type ChatError = (StatusCode, Json<ChatErrorBody>);

fn error_response(e: TaskFlowError) -> ChatError {
    match e {
        TaskFlowError::RateLimited => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ChatErrorBody {
                error: "Rate limit exceeded. Please try again in a moment.".to_string(),
            }),
        ),
        TaskFlowError::Config(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ChatErrorBody {
                error: e.to_string(),
            }),
        ),
        other => {
            eprintln!("[chat] error: {other}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ChatErrorBody {
                    error: "AI service error".to_string(),
                }),
            )
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// POST /api/v1/chat
/// Run the bounded tool-calling loop and return the final reply
pub async fn chat(
    State(state): State<SharedState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ChatError> {
    let outcome = chat::run_chat(&state.gateway, &state.store, &req.messages)
        .await
        .map_err(error_response)?;

    Ok(Json(ChatResponse {
        content: outcome.content,
        tasks_created: outcome.tasks_created,
    }))
}

/// POST /api/v1/chat/stream
/// Relay a streamed (tool-free) completion as SSE
pub async fn chat_stream(
    State(state): State<SharedState>,
    Json(req): Json<ChatRequest>,
) -> Result<Sse<ReceiverStream<Result<Event, Infallible>>>, ChatError> {
    let conversation = chat::build_conversation(&req.messages);
    let response = state
        .gateway
        .stream(&conversation)
        .await
        .map_err(error_response)?;

    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Event, Infallible>>(32);

    tokio::spawn(async move {
        let mut acc = SseAccumulator::new();
        let mut bytes = response.bytes_stream();

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("[chat] stream read failed: {e}");
                    break;
                }
            };

            for fragment in acc.push(&chunk) {
                let payload =
                    serde_json::json!({ "choices": [{ "delta": { "content": fragment } }] });
                if tx.send(Ok(Event::default().data(payload.to_string()))).await.is_err() {
                    // 客户端断开
                    return;
                }
            }

            if acc.is_done() {
                break;
            }
        }

        let _ = tx.send(Ok(Event::default().data("[DONE]"))).await;
    });

    Ok(Sse::new(ReceiverStream::new(rx)))
}
