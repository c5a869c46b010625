use std::path::{Path, PathBuf};

use tokio::{fs, io::AsyncWriteExt};

use crate::{chunk::ChunkDescriptor, error::StoreError, settings::UploadSettings};

/// Mode of a freshly created staging directory: setgid, rwxr-x---.
#[cfg(unix)]
const STAGING_DIR_MODE: u32 = 0o2750;

/// Outcome of persisting one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredChunk {
    pub path: PathBuf,
    pub bytes_written: u64,
    /// The payload was longer than the maximum chunk size and the excess was dropped.
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct ChunkStore {
    settings: UploadSettings,
}

impl ChunkStore {
    pub fn new(settings: UploadSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    /// Writes the chunk payload to `<staging dir>/<chunk number>`, replacing any
    /// earlier file for the same index. At most `max_chunk_size` bytes are kept.
    pub async fn store_chunk(&self, chunk: ChunkDescriptor<'_>) -> Result<StoredChunk, StoreError> {
        create_staging_dir(&chunk.upload_dir).await?;

        let path = chunk.chunk_path();
        let mut file = fs::File::create(&path)
            .await
            .map_err(|source| StoreError::CreateFile {
                path: path.clone(),
                source,
            })?;

        let max_chunk_size = self.settings.max_chunk_size;
        let mut payload = chunk.payload;
        let mut bytes_written: u64 = 0;
        let mut truncated = false;

        while let Some(bytes) = payload
            .chunk()
            .await
            .map_err(|source| StoreError::ReadPayload {
                path: path.clone(),
                source,
            })?
        {
            let remaining = max_chunk_size - bytes_written;
            let take = if bytes.len() as u64 > remaining {
                truncated = true;
                remaining as usize
            } else {
                bytes.len()
            };

            file.write_all(&bytes[..take])
                .await
                .map_err(|source| StoreError::Write {
                    path: path.clone(),
                    source,
                })?;
            bytes_written += take as u64;

            if truncated {
                break;
            }
        }

        file.flush().await.map_err(|source| StoreError::Write {
            path: path.clone(),
            source,
        })?;

        if truncated {
            tracing::warn!(
                upload_id = %chunk.upload_id,
                chunk_number = chunk.chunk_number,
                max_chunk_size,
                "chunk payload exceeded the maximum chunk size and was truncated"
            );
        } else {
            tracing::debug!(
                upload_id = %chunk.upload_id,
                chunk_number = chunk.chunk_number,
                bytes_written,
                "stored chunk"
            );
        }

        Ok(StoredChunk {
            path,
            bytes_written,
            truncated,
        })
    }
}

async fn create_staging_dir(dir: &Path) -> Result<(), StoreError> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(STAGING_DIR_MODE);

    builder
        .create(dir)
        .await
        .map_err(|source| StoreError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })
}
