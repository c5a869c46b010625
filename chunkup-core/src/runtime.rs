use std::path::PathBuf;

use axum::extract::Multipart;

use crate::{
    chunk,
    error::{RebuildError, UploadError},
    rebuild::{RebuildReport, Rebuilder},
    settings::UploadSettings,
    store::{ChunkStore, StoredChunk},
};

/// Entry points for the HTTP layer: ingest one chunk, finalize one upload.
pub struct Runtime {
    settings: UploadSettings,
    store: ChunkStore,
    rebuilder: Rebuilder,
}

impl Runtime {
    pub fn new(settings: UploadSettings) -> Self {
        Self {
            store: ChunkStore::new(settings.clone()),
            rebuilder: Rebuilder::new(settings.clone()),
            settings,
        }
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    /// Decodes the chunk carried by `multipart` and persists it to its staging directory.
    pub async fn process_chunk(&self, multipart: &mut Multipart) -> Result<StoredChunk, UploadError> {
        let chunk = chunk::decode(multipart, &self.settings).await?;
        Ok(self.store.store_chunk(chunk).await?)
    }

    /// Rebuilds the upload into `filename`. Runs on the blocking pool.
    pub async fn complete_chunks(
        &self,
        upload_id: &str,
        filename: &str,
    ) -> Result<RebuildReport, RebuildError> {
        let rebuilder = self.rebuilder.clone();
        let upload_id = upload_id.to_string();
        let destination = PathBuf::from(filename);

        tokio::task::spawn_blocking(move || rebuilder.complete_upload(&upload_id, &destination))
            .await?
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::{
        error::DecodeError,
        test_util::{chunk_parts, multipart_from_parts},
    };

    async fn send(runtime: &Runtime, upload_id: &str, chunk_number: usize, payload: &[u8]) {
        let mut multipart = multipart_from_parts(&chunk_parts(
            upload_id,
            &chunk_number.to_string(),
            "0",
            "0",
            "ignored",
            payload,
        ))
        .await;
        runtime.process_chunk(&mut multipart).await.unwrap();
    }

    #[tokio::test]
    async fn test_round_trip_in_any_store_order() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let settings = UploadSettings {
            max_chunk_size: 64,
            ..UploadSettings::new(root.path())
        };
        let runtime = Runtime::new(settings);

        let original: Vec<u8> = (0..1000u32).map(|i| (i * 31 % 251) as u8).collect();
        let chunks: Vec<&[u8]> = original.chunks(64).collect();
        assert_eq!(chunks.len(), 16);

        // Reverse, then interleave, so neither lexical nor arrival order matches.
        let mut order: Vec<usize> = (0..chunks.len()).rev().collect();
        order.sort_by_key(|i| i % 3);
        for i in order {
            send(&runtime, "round-trip", i, chunks[i]).await;
        }

        let destination = out.path().join("original.bin");
        let report = runtime
            .complete_chunks("round-trip", destination.to_str().unwrap())
            .await
            .unwrap();

        assert_eq!(report.chunks, 16);
        assert_eq!(report.bytes, original.len() as u64);
        assert_eq!(fs::read(&destination).unwrap(), original);
        assert!(!root.path().join("round-trip").exists());
    }

    #[tokio::test]
    async fn test_decode_failure_is_prefixed() {
        let root = tempfile::tempdir().unwrap();
        let runtime = Runtime::new(UploadSettings::new(root.path()));
        let mut parts = chunk_parts("abc123", "0", "1", "1", "a.txt", b"x");
        parts.swap(0, 4);
        let mut multipart = multipart_from_parts(&parts).await;

        let err = runtime.process_chunk(&mut multipart).await.unwrap_err();
        assert!(matches!(
            err,
            UploadError::Decode(DecodeError::FieldMismatch { .. })
        ));
        assert!(err.to_string().starts_with("failed to parse chunk: "));
        assert!(!root.path().join("abc123").exists());
    }
}
