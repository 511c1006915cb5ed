//! Transport configuration.
//!
//! Layered like the rest of the workspace's loaders: built-in defaults, then
//! an optional TOML file, then `RELAY_`-prefixed environment variables with
//! `__` as the nesting separator (`RELAY_RETRY__MAX_ATTEMPTS=5`).

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use config::Config;
use config::Environment;
use config::File;
use relay_diagnosis::Platform;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::tier::TierKind;

pub const DEFAULT_AUTH_HEADER: &str = "X-Auth-Token";
const ENV_PREFIX: &str = "RELAY";
const CONFIG_FILE_NAME: &str = "relay.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Configuration file not found at path: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// How the tiers of one request are driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One tier at a time, in plan order.
    #[default]
    Sequential,
    /// GET/HEAD/OPTIONS start every tier at once; first response wins.
    /// Other methods stay sequential.
    RaceIdempotent,
}

/// One entry of a tier plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSpec {
    pub kind: TierKind,
    /// Run this tier under the retry controller. Only the last tier may.
    #[serde(default)]
    pub retry: bool,
}

impl TierSpec {
    pub const fn once(kind: TierKind) -> Self {
        Self { kind, retry: false }
    }

    pub const fn retrying(kind: TierKind) -> Self {
        Self { kind, retry: true }
    }
}

/// Per-tier timeouts in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_native_ms")]
    pub native_ms: u64,
    #[serde(default = "default_http1_ms")]
    pub http1_ms: u64,
    #[serde(default = "default_direct_ms")]
    pub direct_ms: u64,
    #[serde(default = "default_fallback_ms")]
    pub fallback_ms: u64,
    #[serde(default = "default_connect_ms")]
    pub connect_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Wait per attempt number when the diagnosis gives no hint.
    #[serde(default = "default_linear_step_ms")]
    pub linear_step_ms: u64,
}

/// Identity of the keyring entry holding the session credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialConfig {
    #[serde(default = "default_service")]
    pub service: String,
    #[serde(default = "default_account")]
    pub account: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Defaults to the compile target's platform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,

    /// Relative request paths are joined onto this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_auth_header")]
    pub auth_header: String,

    /// Explicit tier plan; the platform default is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiers: Option<Vec<TierSpec>>,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Overall budget for one logical request across every tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_deadline_ms: Option<u64>,

    #[serde(default)]
    pub strategy: Strategy,

    #[serde(default)]
    pub credentials: CredentialConfig,
}

fn default_native_ms() -> u64 {
    15_000
}
fn default_http1_ms() -> u64 {
    20_000
}
fn default_direct_ms() -> u64 {
    20_000
}
fn default_fallback_ms() -> u64 {
    30_000
}
fn default_connect_ms() -> u64 {
    10_000
}
fn default_max_attempts() -> u32 {
    3
}
fn default_linear_step_ms() -> u64 {
    500
}
fn default_auth_header() -> String {
    DEFAULT_AUTH_HEADER.to_string()
}
fn default_service() -> String {
    relay_keyring_store::DEFAULT_SERVICE.to_string()
}
fn default_account() -> String {
    relay_keyring_store::DEFAULT_ACCOUNT.to_string()
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            native_ms: default_native_ms(),
            http1_ms: default_http1_ms(),
            direct_ms: default_direct_ms(),
            fallback_ms: default_fallback_ms(),
            connect_ms: default_connect_ms(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            linear_step_ms: default_linear_step_ms(),
        }
    }
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            service: default_service(),
            account: default_account(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            platform: None,
            base_url: None,
            auth_header: default_auth_header(),
            tiers: None,
            timeouts: TimeoutConfig::default(),
            retry: RetryConfig::default(),
            request_deadline_ms: None,
            strategy: Strategy::default(),
            credentials: CredentialConfig::default(),
        }
    }
}

impl TimeoutConfig {
    pub fn for_tier(&self, kind: TierKind) -> Duration {
        Duration::from_millis(match kind {
            TierKind::Native => self.native_ms,
            TierKind::Http1 => self.http1_ms,
            TierKind::Direct => self.direct_ms,
            TierKind::Fallback => self.fallback_ms,
        })
    }

    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }
}

impl TransportConfig {
    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::current)
    }

    /// The explicit plan, or the platform default: the full fallback ladder
    /// on iOS, a single library-client attempt everywhere else.
    pub fn tier_plan(&self) -> Vec<TierSpec> {
        if let Some(tiers) = &self.tiers {
            return tiers.clone();
        }
        match self.platform() {
            Platform::Ios => vec![
                TierSpec::once(TierKind::Native),
                TierSpec::once(TierKind::Http1),
                TierSpec::once(TierKind::Direct),
                TierSpec::retrying(TierKind::Fallback),
            ],
            Platform::Android | Platform::Web | Platform::Desktop => {
                vec![TierSpec::once(TierKind::Fallback)]
            }
        }
    }

    pub fn base_url(&self) -> Result<Option<Url>, ConfigError> {
        self.base_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|err| {
                    ConfigError::ValidationError(format!("base_url {raw:?}: {err}"))
                })
            })
            .transpose()
    }

    pub fn request_deadline(&self) -> Option<Duration> {
        self.request_deadline_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let timeouts = [
            ("timeouts.native_ms", self.timeouts.native_ms),
            ("timeouts.http1_ms", self.timeouts.http1_ms),
            ("timeouts.direct_ms", self.timeouts.direct_ms),
            ("timeouts.fallback_ms", self.timeouts.fallback_ms),
            ("timeouts.connect_ms", self.timeouts.connect_ms),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, ms)| *ms == 0) {
            return Err(ConfigError::ValidationError(format!("{name} must be greater than 0")));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.request_deadline_ms == Some(0) {
            return Err(ConfigError::ValidationError(
                "request_deadline_ms must be greater than 0".to_string(),
            ));
        }
        if self.auth_header.trim().is_empty() {
            return Err(ConfigError::ValidationError("auth_header must not be empty".to_string()));
        }
        if let Some(tiers) = &self.tiers {
            if tiers.is_empty() {
                return Err(ConfigError::ValidationError("tiers must not be empty".to_string()));
            }
            let last = tiers.len() - 1;
            if let Some((idx, spec)) = tiers
                .iter()
                .enumerate()
                .find(|(idx, spec)| spec.retry && *idx != last)
            {
                return Err(ConfigError::ValidationError(format!(
                    "tier {idx} ({}) retries but is not the last tier",
                    spec.kind
                )));
            }
        }
        self.base_url()?;
        Ok(())
    }
}

/// Configuration loader with layered merging support
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration with layered merging:
    /// 1. Start with defaults
    /// 2. Merge config file if provided
    /// 3. Override with environment variables (RELAY_ prefix)
    pub fn load(&self) -> Result<TransportConfig, ConfigError> {
        let defaults_json = serde_json::to_string(&TransportConfig::default())?;
        let mut builder = Config::builder().add_source(File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        if let Some(path) = &self.config_path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            builder = builder.add_source(File::from(path.as_path()));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: TransportConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Locate the default config file in standard locations:
    /// 1. Current directory: ./relay.toml
    /// 2. Config directory: <config_dir>/relay/config.toml
    /// 3. Home directory: ~/.relay.toml
    pub fn find_config_file() -> Option<PathBuf> {
        let cwd_config = PathBuf::from(".").join(CONFIG_FILE_NAME);
        if cwd_config.exists() {
            return Some(cwd_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let candidate = config_dir.join("relay").join("config.toml");
            if candidate.exists() {
                return Some(candidate);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(format!(".{CONFIG_FILE_NAME}")))
            .filter(|candidate| candidate.exists())
    }

    pub fn load_default() -> Result<TransportConfig, ConfigError> {
        match Self::find_config_file() {
            Some(path) => Self::new().with_file(path).load(),
            None => Self::new().load(),
        }
    }
}
