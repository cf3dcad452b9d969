use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::ConfigError;

pub const ENV_USER_ID: &str = "TADDY_USER_ID";
pub const ENV_API_KEY: &str = "TADDY_API_KEY";
pub const ENV_API_URL: &str = "PODCAST_API_URL";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_level: default_log_level(),
            request_timeout: default_request_timeout(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_request_timeout() -> String {
    "30s".to_string()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_db_path() -> String {
    "podcasts.db".to_string()
}
fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_url")]
    pub url: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_upstream_timeout")]
    pub timeout: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            user_id: None,
            api_key: None,
            timeout: default_upstream_timeout(),
        }
    }
}

fn default_upstream_url() -> String {
    "https://api.taddy.org".to_string()
}
fn default_upstream_timeout() -> String {
    "20s".to_string()
}

impl Config {
    /// Resolve the database path (relative to data_dir if not absolute).
    pub fn db_path(&self) -> PathBuf {
        let db_path = Path::new(&self.database.path);
        if db_path.is_absolute() {
            db_path.to_path_buf()
        } else {
            self.server.data_dir.join(db_path)
        }
    }

    pub fn request_timeout(&self) -> Result<Duration> {
        parse_duration("server.request_timeout", &self.server.request_timeout)
    }

    pub fn upstream_timeout(&self) -> Result<Duration> {
        parse_duration("upstream.timeout", &self.upstream.timeout)
    }
}

fn parse_duration(field: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value)
        .map_err(|e| ConfigError::Validation(format!("{field}: invalid duration '{value}': {e}")).into())
}

/// Load the config file if it exists; a missing file yields defaults.
/// Environment overrides are applied afterwards.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .map_err(ConfigError::ReadFile)
            .context("reading config file")?;
        toml::from_str(&content).map_err(ConfigError::Parse)?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Upstream credentials and endpoint come from the process environment.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(user_id) = non_empty(ENV_USER_ID) {
        config.upstream.user_id = Some(user_id);
    }
    if let Some(api_key) = non_empty(ENV_API_KEY) {
        config.upstream.api_key = Some(api_key);
    }
    if let Some(url) = non_empty(ENV_API_URL) {
        config.upstream.url = url;
    }
}

pub fn validate_config(config: &Config) -> Result<()> {
    config.request_timeout()?;
    config.upstream_timeout()?;

    if config.database.max_connections == 0 {
        return Err(ConfigError::Validation("database.max_connections must be at least 1".to_string()).into());
    }

    let url = config.upstream.url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::Validation(format!(
            "upstream.url '{url}' must be an http(s) URL (set {ENV_API_URL})"
        ))
        .into());
    }

    Ok(())
}

/// Credentials are only required by commands that talk to the upstream.
pub fn validate_credentials(config: &Config) -> Result<()> {
    if config.upstream.user_id.as_deref().is_none_or(|v| v.is_empty()) {
        return Err(ConfigError::Validation(format!("upstream user id missing (set {ENV_USER_ID})")).into());
    }
    if config.upstream.api_key.as_deref().is_none_or(|v| v.is_empty()) {
        return Err(ConfigError::Validation(format!("upstream api key missing (set {ENV_API_KEY})")).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:8080");
        assert_eq!(config.db_path(), PathBuf::from("./data").join("podcasts.db"));
        assert_eq!(config.request_timeout().unwrap(), Duration::from_secs(30));
    }

    #[test]
    fn parses_file_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
listen = "127.0.0.1:9000"
request_timeout = "5s"

[database]
path = "/var/lib/catalog.db"

[upstream]
url = "https://example.test/graphql"
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:9000");
        assert_eq!(config.db_path(), PathBuf::from("/var/lib/catalog.db"));
        assert_eq!(config.request_timeout().unwrap(), Duration::from_secs(5));
        validate_config(&config).unwrap();
    }

    #[test]
    fn env_overrides_upstream_settings() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_USER_ID, "1234"),
            (ENV_API_KEY, "secret"),
            (ENV_API_URL, "http://localhost:4000/graphql"),
        ]);
        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.upstream.user_id.as_deref(), Some("1234"));
        assert_eq!(config.upstream.api_key.as_deref(), Some("secret"));
        assert_eq!(config.upstream.url, "http://localhost:4000/graphql");
        validate_credentials(&config).unwrap();
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |_| Some("  ".to_string()));
        assert!(config.upstream.user_id.is_none());
        assert!(validate_credentials(&config).is_err());
    }

    #[test]
    fn rejects_bad_duration_and_url() {
        let mut config = Config::default();
        config.server.request_timeout = "soon".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.upstream.url = "ftp://example".to_string();
        assert!(validate_config(&config).is_err());
    }
}
