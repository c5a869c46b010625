use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    str::FromStr,
};

use envconfig::Envconfig;

#[derive(Debug, Clone, Envconfig)]
pub struct Config {
    #[envconfig(from = "CHUNKUP_PORT", default = "8080")]
    pub port: u16,
    #[envconfig(from = "CHUNKUP_HOST", default = "0.0.0.0")]
    pub host: String,
    #[envconfig(from = "CHUNKUP_LOG_LEVEL", default = "info")]
    pub log_level: String,
    /// Root directory under which every upload gets its own staging directory.
    #[envconfig(from = "CHUNKUP_CHUNK_ROOT", default = "./data/chunks")]
    pub chunk_root: PathBuf,
    /// Maximum number of bytes persisted per chunk (5 MiB).
    #[envconfig(from = "CHUNKUP_MAX_CHUNK_SIZE", default = "5242880")]
    pub max_chunk_size: u64,
    /// `before-write` removes the staged chunks before the final file is written,
    /// `after-write` only once it is on disk.
    #[envconfig(from = "CHUNKUP_CLEANUP_ORDER", default = "before-write")]
    pub cleanup_order: String,
    #[envconfig(from = "CHUNKUP_REJECT_MALFORMED_CHUNK_NAMES", default = "false")]
    pub reject_malformed_chunk_names: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] envconfig::Error),
    #[error("Failed to parse IP address `{host}` from config: {source}")]
    InvalidHost {
        host: String,
        source: std::net::AddrParseError,
    },
}

impl Config {
    pub fn load() -> Result<Config, ConfigError> {
        Ok(Config::init_from_env()?)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = IpAddr::from_str(&self.host).map_err(|source| ConfigError::InvalidHost {
            host: self.host.clone(),
            source,
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, envconfig::Error> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::init_from_hashmap(&env)
    }

    #[test]
    fn test_defaults_match_reference_values() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.chunk_root, PathBuf::from("./data/chunks"));
        assert_eq!(config.max_chunk_size, 5 << 20);
        assert_eq!(config.cleanup_order, "before-write");
        assert!(!config.reject_malformed_chunk_names);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("CHUNKUP_PORT", "9000"),
            ("CHUNKUP_CHUNK_ROOT", "/var/lib/chunkup"),
            ("CHUNKUP_MAX_CHUNK_SIZE", "1024"),
            ("CHUNKUP_REJECT_MALFORMED_CHUNK_NAMES", "true"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.chunk_root, PathBuf::from("/var/lib/chunkup"));
        assert_eq!(config.max_chunk_size, 1024);
        assert!(config.reject_malformed_chunk_names);
    }

    #[test]
    fn test_invalid_port_fails() {
        assert!(config_from(&[("CHUNKUP_PORT", "not-a-port")]).is_err());
    }

    #[test]
    fn test_bind_addr() {
        let config = config_from(&[("CHUNKUP_HOST", "127.0.0.1"), ("CHUNKUP_PORT", "5001")]).unwrap();
        assert_eq!(config.bind_addr().unwrap(), "127.0.0.1:5001".parse().unwrap());

        let config = config_from(&[("CHUNKUP_HOST", "localhost")]).unwrap();
        assert!(matches!(
            config.bind_addr(),
            Err(ConfigError::InvalidHost { .. })
        ));
    }
}
