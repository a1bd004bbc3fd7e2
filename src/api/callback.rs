use crate::api::AppState;
use crate::error::{BotError, Result};
use axum::{body::Bytes, extract::State, http::HeaderMap};
use std::sync::Arc;
use tracing::info;

pub const SIGNATURE_HEADER: &str = "x-line-signature";

pub async fn callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str> {
    info!("Request body: {}", String::from_utf8_lossy(&body));

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| BotError::InvalidRequest {
            message: "Missing X-Line-Signature header".to_string(),
        })?;

    state.webhook.handle(&body, signature).await?;

    Ok("OK")
}
