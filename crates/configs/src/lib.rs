use std::path::Path;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tracing::warn;

const DEV_JWT_SECRET: &str = "dev-secret-change-me";
const MIN_RECOMMENDED_SECRET_BYTES: usize = 32;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub hashing: HashingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4) }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
    #[serde(default = "default_max_password_length")]
    pub max_password_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_secs: default_token_ttl(),
            issuer: default_issuer(),
            min_password_length: default_min_password_length(),
            max_password_length: default_max_password_length(),
        }
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct HashingConfig {
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            other => Err(anyhow!("unknown storage backend `{other}` (expected memory or file)")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { backend: StorageBackend::default(), path: default_storage_path() }
    }
}

fn default_jwt_secret() -> String { DEV_JWT_SECRET.to_string() }
fn default_token_ttl() -> u64 { 3600 }
fn default_issuer() -> String { "authkit".to_string() }
fn default_min_password_length() -> usize { 8 }
fn default_max_password_length() -> usize { 128 }
// Mirrors argon2::Params::DEFAULT_{M,T,P}_COST.
fn default_memory_kib() -> u32 { 19 * 1024 }
fn default_iterations() -> u32 { 2 }
fn default_parallelism() -> u32 { 1 }
fn default_storage_path() -> String { "data/credentials.json".to_string() }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load from `CONFIG_PATH` (or `config.toml`), falling back to defaults
    /// when the file is absent, then apply env overrides and validate.
    pub fn load_and_validate() -> Result<Self> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        let mut cfg = if Path::new(&path).exists() {
            load_from_file(&path).map_err(|e| anyhow!("failed to load {path}: {e}"))?
        } else {
            AppConfig::default()
        };
        cfg.apply_env_overrides()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("SERVER_PORT") {
            self.server.port = port.trim().parse().map_err(|_| anyhow!("SERVER_PORT must be a port number"))?;
        }
        if let Ok(threads) = std::env::var("TOKIO_WORKER_THREADS") {
            self.server.worker_threads =
                Some(threads.trim().parse().map_err(|_| anyhow!("TOKIO_WORKER_THREADS must be a positive integer"))?);
        }
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(ttl) = std::env::var("TOKEN_TTL_SECS") {
            self.auth.token_ttl_secs = ttl.trim().parse().map_err(|_| anyhow!("TOKEN_TTL_SECS must be an integer"))?;
        }
        if let Ok(backend) = std::env::var("STORAGE_BACKEND") {
            self.storage.backend = backend.parse()?;
        }
        if let Ok(path) = std::env::var("STORAGE_PATH") {
            self.storage.path = path;
        }
        Ok(())
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.auth.validate()?;
        self.hashing.validate()?;
        self.storage.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AuthConfig {
    fn validate(&self) -> Result<()> {
        if self.jwt_secret.is_empty() {
            return Err(anyhow!("auth.jwt_secret must not be empty; set it in config.toml or JWT_SECRET"));
        }
        if self.jwt_secret == DEV_JWT_SECRET {
            warn!("auth.jwt_secret uses the built-in development value; set JWT_SECRET in production");
        } else if self.jwt_secret.len() < MIN_RECOMMENDED_SECRET_BYTES {
            warn!(len = self.jwt_secret.len(), "auth.jwt_secret is shorter than 32 bytes");
        }
        if self.token_ttl_secs == 0 {
            return Err(anyhow!("auth.token_ttl_secs must be > 0"));
        }
        if self.issuer.trim().is_empty() {
            return Err(anyhow!("auth.issuer must not be empty"));
        }
        if self.min_password_length == 0 {
            return Err(anyhow!("auth.min_password_length must be >= 1"));
        }
        if self.max_password_length < self.min_password_length {
            return Err(anyhow!("auth.max_password_length must be >= min_password_length"));
        }
        Ok(())
    }
}

impl HashingConfig {
    fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(anyhow!("hashing.iterations must be >= 1"));
        }
        if self.parallelism == 0 {
            return Err(anyhow!("hashing.parallelism must be >= 1"));
        }
        // argon2 requires at least 8 KiB per lane.
        if self.memory_kib < 8 * self.parallelism {
            return Err(anyhow!("hashing.memory_kib must be >= 8 * parallelism"));
        }
        Ok(())
    }
}

impl StorageConfig {
    fn validate(&self) -> Result<()> {
        if self.backend == StorageBackend::File && self.path.trim().is_empty() {
            return Err(anyhow!("storage.path is required for the file backend"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let mut cfg = parse("").unwrap();
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.auth.min_password_length, 8);
        assert_eq!(cfg.auth.token_ttl_secs, 3600);
        assert_eq!(cfg.storage.backend, StorageBackend::Memory);
        assert_eq!(cfg.hashing.memory_kib, 19 * 1024);
    }

    #[test]
    fn parses_full_document() {
        let cfg = parse(
            r#"
            [server]
            host = "0.0.0.0"
            port = 9000
            worker_threads = 2

            [auth]
            jwt_secret = "0123456789abcdef0123456789abcdef"
            token_ttl_secs = 600
            min_password_length = 10

            [hashing]
            memory_kib = 4096
            iterations = 3

            [storage]
            backend = "file"
            path = "/var/lib/authkit/credentials.json"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.bind_addr(), "0.0.0.0:9000");
        assert_eq!(cfg.auth.token_ttl_secs, 600);
        assert_eq!(cfg.auth.min_password_length, 10);
        assert_eq!(cfg.auth.max_password_length, 128);
        assert_eq!(cfg.hashing.iterations, 3);
        assert_eq!(cfg.hashing.parallelism, 1);
        assert_eq!(cfg.storage.backend, StorageBackend::File);
    }

    #[test]
    fn zero_worker_threads_normalized() {
        let mut cfg = AppConfig::default();
        cfg.server.worker_threads = Some(0);
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.server.worker_threads, Some(4));
    }

    #[test]
    fn rejects_inverted_password_bounds() {
        let mut cfg = AppConfig::default();
        cfg.auth.min_password_length = 20;
        cfg.auth.max_password_length = 10;
        assert!(cfg.normalize_and_validate().is_err());
    }

    #[test]
    fn rejects_zero_ttl_and_empty_secret() {
        let mut cfg = AppConfig::default();
        cfg.auth.token_ttl_secs = 0;
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.auth.jwt_secret.clear();
        assert!(cfg.normalize_and_validate().is_err());
    }

    #[test]
    fn rejects_argon2_memory_below_lane_minimum() {
        let mut cfg = AppConfig::default();
        cfg.hashing.parallelism = 4;
        cfg.hashing.memory_kib = 16;
        assert!(cfg.normalize_and_validate().is_err());
    }

    #[test]
    fn storage_backend_from_str() {
        assert_eq!("FILE".parse::<StorageBackend>().unwrap(), StorageBackend::File);
        assert_eq!(" memory ".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert!("postgres".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn file_backend_requires_path() {
        let mut cfg = AppConfig::default();
        cfg.storage.backend = StorageBackend::File;
        cfg.storage.path = "  ".into();
        assert!(cfg.normalize_and_validate().is_err());
    }
}
