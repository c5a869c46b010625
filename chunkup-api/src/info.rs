use std::sync::Arc;

use axum::{extract::State, Json};
use chunkup_core::runtime::Runtime;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceInfo {
    pub version: String,
    pub chunk_root: String,
    pub max_chunk_size: u64,
    pub cleanup_order: String,
}

#[tracing::instrument(level = "info", skip(state))]
#[utoipa::path(
    tag = "system",
    get,
    path = "/api/info",
    responses((status = 200, description = "Returns service version and upload settings", body = ServiceInfo))
)]
pub(crate) async fn service_info(State(state): State<Arc<Runtime>>) -> Json<ServiceInfo> {
    let settings = state.settings();
    Json(ServiceInfo {
        version: super::CHUNKUP_VERSION.to_string(),
        chunk_root: settings.chunk_root.display().to_string(),
        max_chunk_size: settings.max_chunk_size,
        cleanup_order: settings.cleanup_order.to_string(),
    })
}
