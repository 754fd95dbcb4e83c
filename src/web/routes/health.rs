use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::state::AppState;

pub const BUILD_ID: &str = env!("NEARBY_BUILD_ID");

pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let ping = tokio::time::timeout(
        state.config.query_timeout,
        sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&state.pool),
    )
    .await;

    match ping {
        Ok(Ok(_)) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "build_id": BUILD_ID, "database": "ok" })),
        ),
        Ok(Err(e)) => {
            warn!(error = %e, "health_database_failed");
            unavailable()
        }
        Err(_) => {
            warn!("health_database_timeout");
            unavailable()
        }
    }
}

fn unavailable() -> (StatusCode, Json<Value>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "status": "degraded", "build_id": BUILD_ID, "database": "unavailable" })),
    )
}
