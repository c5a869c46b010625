use std::{num::ParseIntError, path::PathBuf};

use axum::extract::multipart::MultipartError;

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("unknown cleanup order `{0}`, expected `before-write` or `after-write`")]
    InvalidCleanupOrder(String),
    #[error("max chunk size must be greater than zero")]
    ZeroMaxChunkSize,
}

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("failed reading {field} part: {source}")]
    Multipart {
        field: &'static str,
        source: MultipartError,
    },
    #[error("request body ended before the {field} part")]
    UnexpectedEnd { field: &'static str },
    #[error("invalid form name for part. Expected {expected} got {actual}")]
    FieldMismatch {
        expected: &'static str,
        actual: String,
    },
    #[error("invalid {field} value `{value}`: {source}")]
    InvalidInteger {
        field: &'static str,
        value: String,
        source: ParseIntError,
    },
    #[error("upload_id part is empty")]
    EmptyUploadId,
    #[error("upload_id `{0}` is not a valid staging directory name")]
    InvalidUploadId(String),
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("failed creating staging directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed creating chunk file {}: {source}", .path.display())]
    CreateFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed reading chunk payload for {}: {source}", .path.display())]
    ReadPayload {
        path: PathBuf,
        source: MultipartError,
    },
    #[error("failed writing chunk file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum RebuildError {
    #[error("upload id `{0}` is not a valid staging directory name")]
    InvalidUploadId(String),
    #[error("failed listing chunks in {}: {source}", .dir.display())]
    ListChunks {
        dir: PathBuf,
        source: std::io::Error,
    },
    #[error("staged file `{name}` in {} is not a chunk index", .dir.display())]
    MalformedChunkName { dir: PathBuf, name: String },
    #[error("failed creating temporary file: {0}")]
    TempFile(#[source] std::io::Error),
    #[error("failed copying chunk {}: {source}", .path.display())]
    ReadChunk {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The directory may be partially removed.
    #[error("failed removing staging directory {}: {source}", .dir.display())]
    Cleanup {
        dir: PathBuf,
        destination_written: bool,
        source: std::io::Error,
    },
    #[error("failed writing file {}: {source}", .destination.display())]
    Finalize {
        destination: PathBuf,
        source: std::io::Error,
    },
    #[error(
        "failed writing file {} after staging directory {} was removed, the upload is lost: {source}",
        .destination.display(),
        .staging_dir.display()
    )]
    FinalizeAfterCleanup {
        destination: PathBuf,
        staging_dir: PathBuf,
        source: std::io::Error,
    },
    #[error("rebuild task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl RebuildError {
    /// True when staged chunks may already be gone and the reassembled bytes
    /// never reached the destination file.
    pub fn is_data_loss(&self) -> bool {
        matches!(
            self,
            RebuildError::FinalizeAfterCleanup { .. }
                | RebuildError::Cleanup {
                    destination_written: false,
                    ..
                }
        )
    }
}

#[derive(thiserror::Error, Debug)]
pub enum UploadError {
    #[error("failed to parse chunk: {0}")]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
