use axum::{extract::State, response::IntoResponse, Json};
use ethers::utils::to_checksum;

use crate::AppState;

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "signer": to_checksum(&state.transfers.sender(), None),
    }))
}
