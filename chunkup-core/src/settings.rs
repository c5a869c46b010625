use std::{fmt, path::PathBuf, str::FromStr};

use chunkup_config::Config;

use crate::error::SettingsError;

pub const DEFAULT_CHUNK_ROOT: &str = "./data/chunks";
pub const DEFAULT_MAX_CHUNK_SIZE: u64 = 5 << 20;

/// When the staging directory of an upload is removed relative to writing the
/// reassembled file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CleanupOrder {
    /// Remove the staged chunks first, then write the destination file. A failed
    /// destination write loses the upload.
    #[default]
    BeforeWrite,
    /// Write and sync the destination file first, then remove the staged chunks.
    AfterWrite,
}

impl FromStr for CleanupOrder {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "before-write" => Ok(CleanupOrder::BeforeWrite),
            "after-write" => Ok(CleanupOrder::AfterWrite),
            _ => Err(SettingsError::InvalidCleanupOrder(s.to_string())),
        }
    }
}

impl fmt::Display for CleanupOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupOrder::BeforeWrite => write!(f, "before-write"),
            CleanupOrder::AfterWrite => write!(f, "after-write"),
        }
    }
}

/// Settings shared by the chunk store and the rebuilder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSettings {
    pub chunk_root: PathBuf,
    pub max_chunk_size: u64,
    pub cleanup_order: CleanupOrder,
    /// Fail a rebuild on staged files whose name is not a decimal chunk index
    /// instead of ordering them as index 0.
    pub reject_malformed_chunk_names: bool,
}

impl UploadSettings {
    pub fn new(chunk_root: impl Into<PathBuf>) -> Self {
        Self {
            chunk_root: chunk_root.into(),
            ..Default::default()
        }
    }

    /// Directory holding the staged chunks of one upload.
    pub fn staging_dir(&self, upload_id: &str) -> PathBuf {
        self.chunk_root.join(upload_id)
    }
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            chunk_root: PathBuf::from(DEFAULT_CHUNK_ROOT),
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            cleanup_order: CleanupOrder::default(),
            reject_malformed_chunk_names: false,
        }
    }
}

impl TryFrom<&Config> for UploadSettings {
    type Error = SettingsError;

    fn try_from(config: &Config) -> Result<Self, Self::Error> {
        if config.max_chunk_size == 0 {
            return Err(SettingsError::ZeroMaxChunkSize);
        }
        Ok(Self {
            chunk_root: config.chunk_root.clone(),
            max_chunk_size: config.max_chunk_size,
            cleanup_order: config.cleanup_order.parse()?,
            reject_malformed_chunk_names: config.reject_malformed_chunk_names,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn test_cleanup_order_parse() {
        assert_eq!(
            "before-write".parse::<CleanupOrder>().unwrap(),
            CleanupOrder::BeforeWrite
        );
        assert_eq!(
            " After-Write ".parse::<CleanupOrder>().unwrap(),
            CleanupOrder::AfterWrite
        );
        assert!(matches!(
            "sometime".parse::<CleanupOrder>(),
            Err(SettingsError::InvalidCleanupOrder(_))
        ));
    }

    #[test]
    fn test_defaults() {
        let settings = UploadSettings::default();
        assert_eq!(settings.chunk_root, Path::new("./data/chunks"));
        assert_eq!(settings.max_chunk_size, 5 * 1024 * 1024);
        assert_eq!(settings.cleanup_order, CleanupOrder::BeforeWrite);
        assert!(!settings.reject_malformed_chunk_names);
    }

    #[test]
    fn test_staging_dir_is_namespaced_by_upload_id() {
        let settings = UploadSettings::new("/srv/chunks");
        assert_eq!(
            settings.staging_dir("abc123"),
            Path::new("/srv/chunks/abc123")
        );
        assert_ne!(settings.staging_dir("a"), settings.staging_dir("b"));
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            port: 8080,
            host: "0.0.0.0".to_string(),
            log_level: "info".to_string(),
            chunk_root: PathBuf::from("/tmp/chunks"),
            max_chunk_size: 16,
            cleanup_order: "after-write".to_string(),
            reject_malformed_chunk_names: true,
        };
        let settings = UploadSettings::try_from(&config).unwrap();
        assert_eq!(settings.chunk_root, Path::new("/tmp/chunks"));
        assert_eq!(settings.max_chunk_size, 16);
        assert_eq!(settings.cleanup_order, CleanupOrder::AfterWrite);
        assert!(settings.reject_malformed_chunk_names);

        let config = Config {
            max_chunk_size: 0,
            ..config
        };
        assert!(matches!(
            UploadSettings::try_from(&config),
            Err(SettingsError::ZeroMaxChunkSize)
        ));
    }
}
