use axum::{Json, body::Bytes, extract::State};
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::{
    error::AppError,
    message::{ChatMeta, ChatResponse},
    services::validator::validate_chat_request,
    state::SharedState,
};

pub const GREETING: &str = "Hello, this is the chat relay backend!";

pub async fn index_handler() -> &'static str {
    GREETING
}

pub async fn chat_handler(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<ChatResponse>, AppError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("chat", %request_id);

    handle_chat(state, body).instrument(span).await
}

async fn handle_chat(state: SharedState, body: Bytes) -> Result<Json<ChatResponse>, AppError> {
    let messages = validate_chat_request(&body)?;
    info!(messages = messages.len(), "forwarding chat request");

    let reply = state.upstream.call_upstream(&messages).await?;

    Ok(Json(ChatResponse {
        reply,
        meta: ChatMeta {
            timeout: state.config.timeout.as_secs_f64(),
            max_retries: state.config.max_retries,
        },
    }))
}
