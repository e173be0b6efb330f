//! Layered service configuration
//!
//! Later sources win:
//!
//! | Source | Location |
//! |---|---|
//! | built-in defaults | [`Config::default`] |
//! | system file | `/etc/acton-resource/{service}/config.toml` |
//! | user file | `$XDG_CONFIG_HOME/acton-resource/{service}/config.toml` |
//! | working directory | `./config.toml` |
//! | environment | `ACTON_` prefix, `__` between section and key (`ACTON_RESOURCE__DEFAULT_LIMIT=25`) |

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::query::QueryOptions;

/// Service configuration root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Process identity and HTTP settings
    pub service: ServiceConfig,

    /// Resource endpoint configuration
    #[serde(default)]
    pub resource: ResourceConfig,

    /// tower-http layer settings
    #[serde(default)]
    pub middleware: MiddlewareConfig,
}

/// Process identity and HTTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Name used in logs and config paths
    pub name: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// `EnvFilter` directive for this crate
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds before a request is answered with 408
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Deployment label
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl ServiceConfig {
    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Defaults applied by resource handlers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Limit used when the request names none
    #[serde(default = "default_limit")]
    pub default_limit: u64,

    /// Offset used when the request names none
    #[serde(default)]
    pub default_offset: u64,

    /// Nearby pages listed in page-mode responses
    #[serde(default = "default_page_window")]
    pub page_window: u64,

    /// Route parameter identifying a single row
    #[serde(default = "default_id_param")]
    pub id_param: String,

    /// Ceiling on any requested limit
    #[serde(default)]
    pub max_limit: Option<u64>,
}

impl ResourceConfig {
    /// Composer defaults derived from this configuration
    ///
    /// # Example
    ///
    /// ```rust
    /// use acton_resource::config::ResourceConfig;
    ///
    /// let defaults = ResourceConfig::default().default_options();
    /// assert_eq!(defaults.limit, Some(50));
    /// assert_eq!(defaults.offset, Some(0));
    /// ```
    pub fn default_options(&self) -> QueryOptions {
        QueryOptions::new()
            .with_limit(self.default_limit)
            .with_offset(self.default_offset)
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            default_offset: 0,
            page_window: default_page_window(),
            id_param: default_id_param(),
            max_limit: None,
        }
    }
}

/// tower-http layer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Largest accepted request body, in MB
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,

    /// Turn handler panics into 500 responses
    #[serde(default = "default_true")]
    pub catch_panic: bool,

    /// gzip response bodies
    #[serde(default = "default_true")]
    pub compression: bool,

    /// CORS configuration (permissive, restrictive, disabled)
    #[serde(default = "default_cors_mode")]
    pub cors_mode: String,

    /// Header carrying the request ID
    #[serde(default = "default_request_id_header")]
    pub request_id_header: String,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            body_limit_mb: default_body_limit_mb(),
            catch_panic: true,
            compression: true,
            cors_mode: default_cors_mode(),
            request_id_header: default_request_id_header(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_true() -> bool {
    true
}

fn default_limit() -> u64 {
    50
}

fn default_page_window() -> u64 {
    crate::pagination::DEFAULT_PAGE_WINDOW
}

fn default_id_param() -> String {
    "id".to_string()
}

fn default_body_limit_mb() -> usize {
    10
}

fn default_cors_mode() -> String {
    "permissive".to_string()
}

fn default_request_id_header() -> String {
    "x-request-id".to_string()
}

impl Config {
    /// Load configuration for the service named after the running binary
    pub fn load() -> Result<Self> {
        let binary = std::env::current_exe().ok();
        let service_name = binary
            .as_deref()
            .and_then(Path::file_stem)
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "acton-resource".to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration for `service_name`
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let files = Self::find_config_paths(service_name)
            .into_iter()
            .rev()
            .filter(|path| path.exists())
            .fold(
                Figment::from(Serialized::defaults(Config::named(service_name))),
                |figment, path| {
                    tracing::info!(path = %path.display(), "Merging config file");
                    figment.merge(Toml::file(path))
                },
            );

        let config = files.merge(env_provider()).extract()?;
        tracing::debug!(service = service_name, "Configuration loaded");
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Bypasses the search path. Environment variables still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(env_provider())
            .extract()?;

        Ok(config)
    }

    /// Candidate config files, highest priority first
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let relative = Path::new(service_name).join("config.toml");
        let user = xdg::BaseDirectories::with_prefix("acton-resource").find_config_file(&relative);
        let system = Path::new("/etc/acton-resource").join(&relative);

        std::iter::once(PathBuf::from("config.toml"))
            .chain(user)
            .chain(std::iter::once(system))
            .collect()
    }

    fn named(service_name: &str) -> Self {
        let mut config = Self::default();
        config.service.name = service_name.to_string();
        config
    }
}

fn env_provider() -> Env {
    Env::prefixed("ACTON_").split("__")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "acton-resource".to_string(),
                port: default_port(),
                log_level: default_log_level(),
                timeout_secs: default_timeout(),
                environment: default_environment(),
            },
            resource: ResourceConfig::default(),
            middleware: MiddlewareConfig::default(),
        }
    }
}
