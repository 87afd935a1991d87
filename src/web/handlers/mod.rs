//! Route handlers, one module per resource.

pub mod campaigns;
pub mod donations;
pub mod groups;
pub mod messages;
pub mod notifications;
pub mod users;

use axum::Json;
use serde_json::{Value, json};

/// Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
