use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::Deserialize;
use anyhow::{Context, Result};
use crate::probe::DEFAULT_PROBE_TIMEOUT;

/// Password the daemon ships with; starting with it logs a warning.
pub const DEFAULT_ADMIN_PASSWORD: &str = "adminpass";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Origin allowed to call the API with credentials
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
    /// Mark the session cookie `Secure`; enable behind TLS in production
    #[serde(default)]
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,
}

fn default_listen() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_frontend_url() -> String {
    "http://localhost:5173".to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from("/var/lib/servicedeck/services.json")
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_password() -> String {
    DEFAULT_ADMIN_PASSWORD.to_string()
}

fn default_session_ttl() -> u64 {
    24 * 60 * 60
}

fn default_probe_timeout() -> u64 {
    DEFAULT_PROBE_TIMEOUT.as_secs()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            frontend_url: default_frontend_url(),
            secure_cookies: false,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            password: default_password(),
            session_ttl_secs: default_session_ttl(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_probe_timeout(),
        }
    }
}

impl AuthConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse TOML and apply `SERVICEDECK_*` environment overrides
    pub fn parse(contents: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(contents)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(listen) = var("SERVICEDECK_LISTEN") {
            self.server.listen = listen;
        }
        if let Some(url) = var("SERVICEDECK_FRONTEND_URL") {
            self.server.frontend_url = url;
        }
        if let Some(secure) = var("SERVICEDECK_SECURE_COOKIES") {
            self.server.secure_cookies = secure
                .parse()
                .with_context(|| format!("SERVICEDECK_SECURE_COOKIES is not a bool: {}", secure))?;
        }
        if let Some(username) = var("SERVICEDECK_ADMIN_USERNAME") {
            self.auth.username = username;
        }
        if let Some(password) = var("SERVICEDECK_ADMIN_PASSWORD") {
            self.auth.password = password;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.auth.username.is_empty(), "auth.username must not be empty");
        anyhow::ensure!(!self.auth.password.is_empty(), "auth.password must not be empty");
        anyhow::ensure!(self.auth.session_ttl_secs > 0, "auth.session_ttl_secs must be positive");
        anyhow::ensure!(self.probe.timeout_secs > 0, "probe.timeout_secs must be positive");
        Ok(())
    }

    pub fn uses_default_password(&self) -> bool {
        self.auth.password == DEFAULT_ADMIN_PASSWORD
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:3001");
        assert_eq!(config.auth.username, "admin");
        assert_eq!(config.auth.session_ttl(), Duration::from_secs(86400));
        assert_eq!(config.probe.timeout(), Duration::from_secs(5));
        assert!(!config.server.secure_cookies);
        assert!(config.uses_default_password());
    }

    #[test]
    fn test_partial_sections() {
        let config: Config = toml::from_str(
            r#"
            [store]
            path = "/tmp/services.json"

            [auth]
            password = "hunter2"
            "#,
        )
        .unwrap();

        assert_eq!(config.store.path, PathBuf::from("/tmp/services.json"));
        assert_eq!(config.auth.username, "admin");
        assert_eq!(config.auth.password, "hunter2");
        assert!(!config.uses_default_password());
    }

    #[test]
    fn test_env_overrides() {
        let vars = HashMap::from([
            ("SERVICEDECK_ADMIN_USERNAME", "root"),
            ("SERVICEDECK_ADMIN_PASSWORD", "s3cret"),
            ("SERVICEDECK_SECURE_COOKIES", "true"),
        ]);

        let mut config = Config::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.auth.username, "root");
        assert_eq!(config.auth.password, "s3cret");
        assert!(config.server.secure_cookies);
        assert_eq!(config.server.listen, "0.0.0.0:3001");
    }

    #[test]
    fn test_bad_bool_override_rejected() {
        let mut config = Config::default();
        let result = config.apply_overrides(|key| {
            (key == "SERVICEDECK_SECURE_COOKIES").then(|| "yes please".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.probe.timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
