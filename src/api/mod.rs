mod callback;
mod health;

pub use callback::{callback, SIGNATURE_HEADER};
pub use health::health_check;

use crate::line::WebhookHandler;
use crate::store::UserStore;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub webhook: WebhookHandler,
    pub store: Arc<dyn UserStore>,
    pub start_time: Instant,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/callback", post(callback))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
