use crate::error::ok;
use axum::response::Response;
use serde_json::json;

pub async fn health() -> Response {
    ok(json!({ "status": "ok" }))
}

pub async fn version() -> Response {
    ok(json!({
        "name": "grn-server",
        "version": grn_core::core_version(),
    }))
}
