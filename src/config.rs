use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:4200";
pub const DEFAULT_BACKEND_URL: &str = "http://spring-app:8080/";

/// Matches the 100kb default of a JSON body parser.
pub const DEFAULT_BODY_LIMIT: usize = 100 * 1024;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub frontend_url: String,
    pub backend_url: String,
    /// Largest request body buffered before routing, in bytes.
    #[serde(alias = "json_body_limit")]
    pub body_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AppConfig {
    /// Apply `FRONTEND_URL` / `BACKEND_URL` overrides from the environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("FRONTEND_URL").filter(|v| !v.trim().is_empty()) {
            debug!(frontend_url = %url, "Frontend URL overridden from environment");
            self.frontend_url = url;
        }
        if let Some(url) = lookup("BACKEND_URL").filter(|v| !v.trim().is_empty()) {
            debug!(backend_url = %url, "Backend URL overridden from environment");
            self.backend_url = url;
        }
        self
    }
}

/// Load application configuration.
///
/// A missing file is not an error: the built-in defaults are used instead.
pub async fn load_app_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();

    let exists = tokio::fs::try_exists(path)
        .await
        .context("Failed to check app config file")?;

    if !exists {
        info!(path = ?path, "No config file found, using defaults");
        return Ok(AppConfig::default());
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .context("Failed to read app config file")?;

    parse_app_config(&content)
}

pub fn parse_app_config(content: &str) -> Result<AppConfig> {
    // An empty YAML document deserializes to unit, not a mapping.
    if content.trim().is_empty() {
        return Ok(AppConfig::default());
    }

    let config: AppConfig =
        serde_yaml::from_str(content).context("Failed to parse app config YAML")?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_deployment_constants() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.frontend_url, "http://localhost:4200");
        assert_eq!(config.backend_url, "http://spring-app:8080/");
        assert_eq!(config.server.bind_addr(), "0.0.0.0:4000");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = parse_app_config("backend_url: http://localhost:8080/\n").unwrap();
        assert_eq!(config.backend_url, "http://localhost:8080/");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.body_limit, DEFAULT_BODY_LIMIT);
    }

    #[test]
    fn test_nested_server_section() {
        let yaml = "server:\n  host: 127.0.0.1\n  port: 5000\n";
        let config = parse_app_config(yaml).unwrap();
        assert_eq!(config.server.bind_addr(), "127.0.0.1:5000");
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = parse_app_config("  \n").unwrap();
        assert_eq!(config.server.port, DEFAULT_PORT);
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        assert!(parse_app_config("server: [not, a, map]").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env = HashMap::from([
            ("BACKEND_URL", "http://backend:9090/".to_string()),
            ("FRONTEND_URL", "  ".to_string()),
        ]);
        let config = AppConfig::default().with_overrides(|k| env.get(k).cloned());
        assert_eq!(config.backend_url, "http://backend:9090/");
        assert_eq!(config.frontend_url, DEFAULT_FRONTEND_URL);
    }

    #[test]
    fn test_legacy_body_limit_key() {
        let config = parse_app_config("json_body_limit: 2048\n").unwrap();
        assert_eq!(config.body_limit, 2048);
    }

    #[tokio::test]
    async fn test_unreadable_config_path_is_error() {
        // A regular file used as a directory fails with ENOTDIR, not NotFound.
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml/config.yaml");
        let err = load_app_config(path).await.unwrap_err();
        assert!(err.to_string().contains("Failed to check app config file"));
    }

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let config = load_app_config("does/not/exist.yaml").await.unwrap();
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
    }
}
