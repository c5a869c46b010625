//! Reassembly of staged chunks into the final file.
//!
//! The staging directory of an upload holds one file per chunk, named after its
//! decimal index. Rebuilding concatenates them in ascending numeric order into a
//! temporary file, then copies that into the destination and drops the staging
//! directory. In which order the last two steps happen is set by
//! [`CleanupOrder`].
//!
//! All I/O here is blocking. A rebuild must not run while a chunk for the same
//! upload is still being stored; nothing here guards against that.

use std::{
    fs::{self, File},
    io::{self, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use crate::{
    chunk::validate_upload_id,
    error::RebuildError,
    settings::{CleanupOrder, UploadSettings},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildReport {
    pub chunks: usize,
    pub bytes: u64,
    pub destination: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkEntry {
    pub name: String,
    pub path: PathBuf,
}

impl ChunkEntry {
    fn index(&self) -> Option<i64> {
        self.name.parse().ok()
    }
}

#[derive(Debug, Clone)]
pub struct Rebuilder {
    settings: UploadSettings,
}

impl Rebuilder {
    pub fn new(settings: UploadSettings) -> Self {
        Self { settings }
    }

    pub fn complete_upload(
        &self,
        upload_id: &str,
        final_filename: impl AsRef<Path>,
    ) -> Result<RebuildReport, RebuildError> {
        validate_upload_id(upload_id)
            .map_err(|_| RebuildError::InvalidUploadId(upload_id.to_string()))?;

        let staging_dir = self.settings.staging_dir(upload_id);
        let destination = final_filename.as_ref().to_path_buf();

        let entries = list_chunks(&staging_dir)?;
        let entries = sort_chunk_entries(
            &staging_dir,
            entries,
            self.settings.reject_malformed_chunk_names,
        )?;

        let mut accumulator = tempfile::tempfile().map_err(RebuildError::TempFile)?;
        let mut bytes = 0;
        for entry in &entries {
            bytes += append_chunk(entry, &mut accumulator)?;
        }
        accumulator
            .seek(SeekFrom::Start(0))
            .map_err(RebuildError::TempFile)?;

        match self.settings.cleanup_order {
            CleanupOrder::BeforeWrite => {
                remove_staging_dir(&staging_dir, false)?;
                write_destination(&mut accumulator, &destination).map_err(|source| {
                    RebuildError::FinalizeAfterCleanup {
                        destination: destination.clone(),
                        staging_dir: staging_dir.clone(),
                        source,
                    }
                })?;
            }
            CleanupOrder::AfterWrite => {
                write_destination(&mut accumulator, &destination).map_err(|source| {
                    RebuildError::Finalize {
                        destination: destination.clone(),
                        source,
                    }
                })?;
                remove_staging_dir(&staging_dir, true)?;
            }
        }

        tracing::info!(
            upload_id,
            chunks = entries.len(),
            bytes,
            destination = %destination.display(),
            "rebuilt upload"
        );

        Ok(RebuildReport {
            chunks: entries.len(),
            bytes,
            destination,
        })
    }
}

fn list_chunks(staging_dir: &Path) -> Result<Vec<ChunkEntry>, RebuildError> {
    let list_err = |source: io::Error| RebuildError::ListChunks {
        dir: staging_dir.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();
    for entry in fs::read_dir(staging_dir).map_err(list_err)? {
        let entry = entry.map_err(list_err)?;
        entries.push(ChunkEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.path(),
        });
    }
    Ok(entries)
}

/// Orders staged chunk files by the decimal value of their names.
///
/// A name that is not an integer orders as index 0 unless `reject_malformed` is
/// set, in which case it fails the rebuild. Equal indices keep listing order.
pub fn sort_chunk_entries(
    staging_dir: &Path,
    mut entries: Vec<ChunkEntry>,
    reject_malformed: bool,
) -> Result<Vec<ChunkEntry>, RebuildError> {
    if reject_malformed {
        if let Some(bad) = entries.iter().find(|entry| entry.index().is_none()) {
            return Err(RebuildError::MalformedChunkName {
                dir: staging_dir.to_path_buf(),
                name: bad.name.clone(),
            });
        }
    }

    entries.sort_by_key(|entry| entry.index().unwrap_or(0));
    Ok(entries)
}

fn append_chunk(entry: &ChunkEntry, accumulator: &mut File) -> Result<u64, RebuildError> {
    let read_err = |source: io::Error| RebuildError::ReadChunk {
        path: entry.path.clone(),
        source,
    };

    let mut src = File::open(&entry.path).map_err(read_err)?;
    io::copy(&mut src, accumulator).map_err(read_err)
}

fn remove_staging_dir(staging_dir: &Path, destination_written: bool) -> Result<(), RebuildError> {
    fs::remove_dir_all(staging_dir).map_err(|source| RebuildError::Cleanup {
        dir: staging_dir.to_path_buf(),
        destination_written,
        source,
    })
}

fn write_destination(accumulator: &mut File, destination: &Path) -> io::Result<()> {
    let mut file = File::create(destination)?;
    io::copy(accumulator, &mut file)?;
    file.sync_all()
}
