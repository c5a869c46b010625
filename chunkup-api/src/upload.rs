use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::StatusCode,
};
use chunkup_core::runtime::Runtime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Just a schema for axum native multipart. Parts must arrive in this order.
#[derive(Deserialize, ToSchema)]
#[allow(unused)]
struct UploadChunkMultipart {
    #[schema(example = "abc123")]
    upload_id: String,
    #[schema(example = 0)]
    chunk_number: i32,
    #[schema(example = 2)]
    total_chunks: i32,
    #[schema(example = 13)]
    total_file_size: i64,
    #[schema(example = "greeting.txt")]
    file_name: String,
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteUploadRequest {
    #[schema(example = "abc123")]
    pub upload_id: String,
    #[schema(example = "greeting.txt")]
    pub filename: String,
}

#[tracing::instrument(level = "info", skip_all)]
#[utoipa::path(
    tag = "upload",
    post,
    path = "/upload-chunk",
    request_body(content = UploadChunkMultipart, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Chunk stored", body = String),
        (status = 500, description = "Chunk could not be decoded or stored", body = String),
    )
)]
pub(crate) async fn upload_chunk(
    State(state): State<Arc<Runtime>>,
    mut multipart: Multipart,
) -> Result<&'static str, (StatusCode, String)> {
    let stored = state.process_chunk(&mut multipart).await.map_err(|err| {
        tracing::error!("Error processing chunk: {}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    })?;

    tracing::info!(
        path = %stored.path.display(),
        bytes = stored.bytes_written,
        truncated = stored.truncated,
        "chunk processed"
    );
    Ok("chunk processed")
}

#[tracing::instrument(level = "info", skip_all)]
#[utoipa::path(
    tag = "upload",
    post,
    path = "/completed-chunks",
    request_body(content = CompleteUploadRequest, content_type = "application/json"),
    responses(
        (status = 200, description = "File reassembled", body = String),
        (status = 400, description = "Malformed completion request", body = String),
        (status = 500, description = "File could not be reassembled", body = String),
    )
)]
pub(crate) async fn completed_chunks(
    State(state): State<Arc<Runtime>>,
    body: Bytes,
) -> Result<&'static str, (StatusCode, String)> {
    let request: CompleteUploadRequest = serde_json::from_slice(&body).map_err(|err| {
        tracing::warn!("Invalid completion request: {}", err);
        (StatusCode::BAD_REQUEST, err.to_string())
    })?;

    let report = state
        .complete_chunks(&request.upload_id, &request.filename)
        .await
        .map_err(|err| {
            if err.is_data_loss() {
                tracing::error!(
                    upload_id = %request.upload_id,
                    "Staged chunks were removed but the file was not written: {}",
                    err
                );
            } else {
                tracing::error!(upload_id = %request.upload_id, "Error rebuilding file: {}", err);
            }
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to rebuild file: {err}"),
            )
        })?;

    tracing::info!(
        upload_id = %request.upload_id,
        chunks = report.chunks,
        bytes = report.bytes,
        destination = %report.destination.display(),
        "file processed"
    );
    Ok("file processed")
}
