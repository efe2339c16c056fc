use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::controller::discord::interaction::handle_interaction;
use crate::shared::structs::AppState;
use crate::shared::{HEALTH_ROUTE, INTERACTION_ROUTE};

pub mod discord;
pub mod lambda;

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route(INTERACTION_ROUTE, post(handle_interaction))
        .route(HEALTH_ROUTE, get(health))
        .with_state(app_state)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}
