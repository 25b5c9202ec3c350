//! Configuration types for photovault.
//!
//! This module provides the immutable [`Config`] built once at startup and
//! passed to every component. It includes:
//!
//! - [`ServerConfig`] - HTTP listener and cookie settings
//! - [`StorageConfig`] - Blob provider selection and provider options
//! - [`MetadataConfig`] - Metadata store location
//! - [`AuthConfig`] - Password, signing secret and token lifetimes
//! - [`LoggingConfig`] - Log format and filter
//!
//! Values are layered: defaults, then an optional TOML file, then
//! `PHOTOVAULT_*` environment variables. Secrets must come from outside
//! the binary; [`Config::validate`] refuses to start without them.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable naming an optional TOML config file.
pub const CONFIG_PATH_ENV: &str = "PHOTOVAULT_CONFIG";

/// Access tokens must live between 15 and 60 minutes.
pub const ACCESS_TTL_RANGE_SECS: std::ops::RangeInclusive<u64> = 900..=3600;

const MIN_TOKEN_SECRET_LEN: usize = 32;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A secret string whose `Debug` output is redacted.
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub metadata: MetadataConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    /// Mark auth cookies `Secure` (disable only for plain-HTTP development).
    pub cookie_secure: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8000)),
            cookie_secure: true,
        }
    }
}

/// Blob storage provider, selected once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Memory,
    Filesystem,
    Null,
    ObjectStore,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Filesystem => "filesystem",
            Self::Null => "null",
            Self::ObjectStore => "object_store",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "filesystem" | "fs" | "local" => Ok(Self::Filesystem),
            "null" | "none" => Ok(Self::Null),
            "object_store" | "s3" | "cloud" => Ok(Self::ObjectStore),
            other => bail!(
                "Unknown storage provider '{other}'. Valid providers: memory, filesystem, null, object_store"
            ),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub provider: ProviderKind,
    /// Root directory for the filesystem provider.
    pub root: Option<PathBuf>,
    /// URL for the object_store provider (e.g. `s3://bucket/photos`).
    pub url: Option<String>,
    /// Deadline for a single provider call.
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Memory,
            root: None,
            url: None,
            timeout_secs: 10,
        }
    }
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// redb file for photo records; `None` keeps records in memory.
    pub path: Option<PathBuf>,
}

/// Where refresh tokens are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStoreAddress {
    Memory,
    Redb(PathBuf),
}

impl FromStr for TokenStoreAddress {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("memory") {
            return Ok(Self::Memory);
        }
        if let Some(path) = s.strip_prefix("redb://") {
            if path.is_empty() {
                bail!("Token store address 'redb://' needs a file path");
            }
            return Ok(Self::Redb(PathBuf::from(path)));
        }
        bail!("Unknown token store address '{s}'. Use 'memory' or 'redb://<path>'")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub password: Secret,
    pub token_secret: Secret,
    /// Token store address: `memory` or `redb://<path>`.
    pub token_store: Option<String>,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    pub rotate_refresh_tokens: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            password: Secret::default(),
            token_secret: Secret::default(),
            token_store: None,
            access_ttl_secs: 1800,
            refresh_ttl_secs: 30 * 24 * 3600,
            rotate_refresh_tokens: true,
        }
    }
}

impl AuthConfig {
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs)
    }

    /// Parsed token store address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is missing or malformed.
    pub fn token_store_address(&self) -> Result<TokenStoreAddress> {
        self.token_store
            .as_deref()
            .context("PHOTOVAULT_TOKEN_STORE is not set")?
            .parse()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// Reads the TOML file named by `path` (or `PHOTOVAULT_CONFIG`) if any,
    /// then applies `PHOTOVAULT_*` overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an
    /// environment variable holds an invalid value.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let path = path.map(Path::to_path_buf).or(env_path);

        let mut config = match path {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Loads configuration from the specified TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - Fields have invalid types
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Applies `PHOTOVAULT_*` overrides using `lookup` to read variables.
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable whose value cannot be parsed.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("PHOTOVAULT_LISTEN") {
            self.server.listen = parse_var("PHOTOVAULT_LISTEN", &v)?;
        }
        if let Some(v) = get("PHOTOVAULT_COOKIE_SECURE") {
            self.server.cookie_secure = parse_bool("PHOTOVAULT_COOKIE_SECURE", &v)?;
        }
        if let Some(v) = get("PHOTOVAULT_STORAGE_PROVIDER") {
            self.storage.provider = parse_var("PHOTOVAULT_STORAGE_PROVIDER", &v)?;
        }
        if let Some(v) = get("PHOTOVAULT_STORAGE_ROOT") {
            self.storage.root = Some(PathBuf::from(v));
        }
        if let Some(v) = get("PHOTOVAULT_STORAGE_URL") {
            self.storage.url = Some(v);
        }
        if let Some(v) = get("PHOTOVAULT_STORAGE_TIMEOUT_SECS") {
            self.storage.timeout_secs = parse_var("PHOTOVAULT_STORAGE_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("PHOTOVAULT_METADATA_PATH") {
            self.metadata.path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("PHOTOVAULT_PASSWORD") {
            self.auth.password = Secret::new(v);
        }
        if let Some(v) = get("PHOTOVAULT_TOKEN_SECRET") {
            self.auth.token_secret = Secret::new(v);
        }
        if let Some(v) = get("PHOTOVAULT_TOKEN_STORE") {
            self.auth.token_store = Some(v);
        }
        if let Some(v) = get("PHOTOVAULT_ACCESS_TTL_SECS") {
            self.auth.access_ttl_secs = parse_var("PHOTOVAULT_ACCESS_TTL_SECS", &v)?;
        }
        if let Some(v) = get("PHOTOVAULT_REFRESH_TTL_SECS") {
            self.auth.refresh_ttl_secs = parse_var("PHOTOVAULT_REFRESH_TTL_SECS", &v)?;
        }
        if let Some(v) = get("PHOTOVAULT_ROTATE_REFRESH") {
            self.auth.rotate_refresh_tokens = parse_bool("PHOTOVAULT_ROTATE_REFRESH", &v)?;
        }
        if let Some(v) = get("PHOTOVAULT_LOG_FORMAT") {
            self.logging.format = match v.trim().to_ascii_lowercase().as_str() {
                "text" | "pretty" => LogFormat::Text,
                "json" => LogFormat::Json,
                other => bail!("PHOTOVAULT_LOG_FORMAT must be 'text' or 'json' (got: '{other}')"),
            };
        }
        if let Some(v) = get("PHOTOVAULT_LOG") {
            self.logging.filter = v;
        }

        Ok(())
    }

    /// Validate configuration with comprehensive checks.
    ///
    /// Returns a `ValidationResult` containing any non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns an error listing every problem found:
    /// - Missing password, token secret or token store address
    /// - Access token TTL outside 15..=60 minutes
    /// - Provider selected without its required options
    pub fn validate(&self) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // 1. Secrets must be supplied externally
        if self.auth.password.is_empty() {
            errors.push("PHOTOVAULT_PASSWORD must be set".to_string());
        }
        if self.auth.token_secret.is_empty() {
            errors.push("PHOTOVAULT_TOKEN_SECRET must be set".to_string());
        } else if self.auth.token_secret.expose().len() < MIN_TOKEN_SECRET_LEN {
            warnings.push(format!(
                "PHOTOVAULT_TOKEN_SECRET is shorter than {MIN_TOKEN_SECRET_LEN} bytes\n  \
                 Recommendation: use a random secret of at least {MIN_TOKEN_SECRET_LEN} bytes"
            ));
        }
        match self.auth.token_store_address() {
            Ok(TokenStoreAddress::Memory) => warnings.push(
                "Token store is in memory; refresh tokens are lost on restart".to_string(),
            ),
            Ok(TokenStoreAddress::Redb(_)) => {},
            Err(e) => errors.push(format!("{e:#}")),
        }

        // 2. Token lifetimes
        if !ACCESS_TTL_RANGE_SECS.contains(&self.auth.access_ttl_secs) {
            errors.push(format!(
                "Access token TTL must be between {} and {} seconds (got: {})",
                ACCESS_TTL_RANGE_SECS.start(),
                ACCESS_TTL_RANGE_SECS.end(),
                self.auth.access_ttl_secs
            ));
        }
        if self.auth.refresh_ttl_secs <= self.auth.access_ttl_secs {
            errors.push(format!(
                "Refresh token TTL ({}) must be longer than access token TTL ({})",
                self.auth.refresh_ttl_secs, self.auth.access_ttl_secs
            ));
        }

        // 3. Provider options
        match self.storage.provider {
            ProviderKind::Filesystem if self.storage.root.is_none() => {
                errors.push("PHOTOVAULT_STORAGE_ROOT is required for the filesystem provider".to_string());
            },
            ProviderKind::ObjectStore if self.storage.url.is_none() => {
                errors.push("PHOTOVAULT_STORAGE_URL is required for the object_store provider".to_string());
            },
            ProviderKind::Memory => warnings.push(
                "Blob storage is in memory; photos are lost on restart".to_string(),
            ),
            ProviderKind::Null => warnings.push(
                "Blob storage is the null provider; writes are discarded".to_string(),
            ),
            _ => {},
        }
        if self.storage.timeout_secs == 0 {
            errors.push("Storage timeout cannot be 0".to_string());
        }

        // 4. Metadata store
        if self.metadata.path.is_none() {
            warnings.push(
                "PHOTOVAULT_METADATA_PATH is not set; photo records are kept in memory".to_string(),
            );
        }

        // 5. Server
        if self.server.listen.port() == 0 {
            errors.push("Listen port cannot be 0".to_string());
        }
        if !self.server.cookie_secure {
            warnings.push("Auth cookies are not marked Secure".to_string());
        }

        if !errors.is_empty() {
            bail!("Invalid configuration:\n  - {}", errors.join("\n  - "));
        }

        Ok(ValidationResult { warnings })
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid value for {name}: {e}"))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("Invalid value for {name}: expected a boolean (got: '{other}')"),
    }
}
