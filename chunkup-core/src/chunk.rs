//! Decoding of a single chunk upload request.
//!
//! A chunk request is a multipart body whose parts arrive in a fixed order:
//!
//! 1. `upload_id`
//! 2. `chunk_number`
//! 3. `total_chunks`
//! 4. `total_file_size`
//! 5. `file_name`
//! 6. the chunk data itself, under any name
//!
//! The first five parts are small text values and are read fully. The sixth is
//! handed back unread so the store can stream it to disk.

use std::{fmt, path::PathBuf, str::FromStr};

use axum::extract::multipart::{Field, Multipart};

use crate::{error::DecodeError, settings::UploadSettings};

pub const UPLOAD_ID_FIELD: &str = "upload_id";
pub const CHUNK_NUMBER_FIELD: &str = "chunk_number";
pub const TOTAL_CHUNKS_FIELD: &str = "total_chunks";
pub const TOTAL_FILE_SIZE_FIELD: &str = "total_file_size";
pub const FILE_NAME_FIELD: &str = "file_name";
const CHUNK_DATA_PART: &str = "chunk data";

pub struct ChunkDescriptor<'a> {
    pub upload_id: String,
    pub chunk_number: i32,
    /// Informational, never checked against the chunks actually received.
    pub total_chunks: i32,
    /// Informational, in bytes.
    pub total_file_size: i64,
    /// Name the client intends for the final file. Not sanitized.
    pub file_name: String,
    /// Staging directory for this upload, `<chunk root>/<upload id>`.
    pub upload_dir: PathBuf,
    pub payload: Field<'a>,
}

impl fmt::Debug for ChunkDescriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkDescriptor")
            .field("upload_id", &self.upload_id)
            .field("chunk_number", &self.chunk_number)
            .field("total_chunks", &self.total_chunks)
            .field("total_file_size", &self.total_file_size)
            .field("file_name", &self.file_name)
            .field("upload_dir", &self.upload_dir)
            .finish_non_exhaustive()
    }
}

impl ChunkDescriptor<'_> {
    /// Path of the file this chunk is persisted to.
    pub fn chunk_path(&self) -> PathBuf {
        self.upload_dir.join(self.chunk_number.to_string())
    }
}

pub async fn decode<'a>(
    multipart: &'a mut Multipart,
    settings: &UploadSettings,
) -> Result<ChunkDescriptor<'a>, DecodeError> {
    let upload_id = next_text(multipart, UPLOAD_ID_FIELD).await?;
    validate_upload_id(&upload_id)?;
    let upload_dir = settings.staging_dir(&upload_id);

    let chunk_number = next_integer::<i32>(multipart, CHUNK_NUMBER_FIELD).await?;
    let total_chunks = next_integer::<i32>(multipart, TOTAL_CHUNKS_FIELD).await?;
    let total_file_size = next_integer::<i64>(multipart, TOTAL_FILE_SIZE_FIELD).await?;
    let file_name = next_text(multipart, FILE_NAME_FIELD).await?;

    let payload = multipart
        .next_field()
        .await
        .map_err(|source| DecodeError::Multipart {
            field: CHUNK_DATA_PART,
            source,
        })?
        .ok_or(DecodeError::UnexpectedEnd {
            field: CHUNK_DATA_PART,
        })?;

    tracing::debug!(
        %upload_id,
        chunk_number,
        total_chunks,
        total_file_size,
        %file_name,
        "decoded chunk"
    );

    Ok(ChunkDescriptor {
        upload_id,
        chunk_number,
        total_chunks,
        total_file_size,
        file_name,
        upload_dir,
        payload,
    })
}

/// Upload ids become a single directory below the chunk root, so anything that
/// would resolve elsewhere is refused.
pub fn validate_upload_id(upload_id: &str) -> Result<(), DecodeError> {
    if upload_id.is_empty() {
        return Err(DecodeError::EmptyUploadId);
    }
    if upload_id == "."
        || upload_id == ".."
        || upload_id.contains(['/', '\\', '\0'])
    {
        return Err(DecodeError::InvalidUploadId(upload_id.to_string()));
    }
    Ok(())
}

async fn next_text(
    multipart: &mut Multipart,
    expected: &'static str,
) -> Result<String, DecodeError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|source| DecodeError::Multipart {
            field: expected,
            source,
        })?
        .ok_or(DecodeError::UnexpectedEnd { field: expected })?;

    let actual = field.name().unwrap_or_default();
    if actual != expected {
        return Err(DecodeError::FieldMismatch {
            expected,
            actual: actual.to_string(),
        });
    }

    field.text().await.map_err(|source| DecodeError::Multipart {
        field: expected,
        source,
    })
}

async fn next_integer<T>(multipart: &mut Multipart, expected: &'static str) -> Result<T, DecodeError>
where
    T: FromStr<Err = std::num::ParseIntError>,
{
    let value = next_text(multipart, expected).await?;
    value.parse::<T>().map_err(|source| DecodeError::InvalidInteger {
        field: expected,
        value,
        source,
    })
}
