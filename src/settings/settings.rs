use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api: Api,
    pub auth: Auth,
    #[serde(default)]
    pub cookie: Cookie,
    pub storage: Storage,
    #[serde(default)]
    pub routes: Routes,
    pub log: Log,
    #[serde(default)]
    pub dev_server: DevServer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub backend: String, // "rest", "graphql" or "fake"
    pub base_url: String,
    pub timeout_ms: u64,
    #[serde(default = "default_graphql_path")]
    pub graphql_path: String,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_version: Option<String>,
}

fn default_graphql_path() -> String {
    "/graphql".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Auth {
    pub environment: String, // "production" or "development"
    #[serde(default = "default_refresh_token_max_age_secs")]
    pub refresh_token_max_age_secs: u64,
    #[serde(default = "default_expiry_skew_secs")]
    pub expiry_skew_secs: u64,
}

fn default_refresh_token_max_age_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_expiry_skew_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cookie {
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default = "default_cookie_path")]
    pub path: String,
}

impl Default for Cookie {
    fn default() -> Self {
        Self {
            domain: None,
            path: default_cookie_path(),
        }
    }
}

fn default_cookie_path() -> String {
    "/".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    pub backend: String, // "memory", "file" or "redis"
    pub encryption_key: String,
    #[serde(default)]
    pub file_dir: Option<String>,
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_redis_prefix")]
    pub redis_prefix: String,
}

fn default_redis_prefix() -> String {
    "authgate".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Routes {
    pub login: String,
    pub unauthorized: String,
    pub home: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            unauthorized: "/unauthorized".to_string(),
            home: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub filter: String,
}

/// Only read by the `dev_server` binary.
#[derive(Debug, Clone, Deserialize)]
pub struct DevServer {
    pub address: String,
    pub signing_key: String,
    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: i64,
}

impl Default for DevServer {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8787".to_string(),
            signing_key: "dev-signing-key".to_string(),
            access_ttl_secs: default_access_ttl_secs(),
        }
    }
}

fn default_access_ttl_secs() -> i64 {
    15 * 60
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub const ENV_PREFIX: &str = "AUTHGATE";

/// Loads the TOML file, then lets `AUTHGATE__SECTION__KEY` variables override it.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
